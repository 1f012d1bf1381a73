//! IO device interface
use std::{
    sync::{Arc, Condvar, Mutex, MutexGuard},
    thread,
    time::Duration,
};

use crate::constants::*;

/// Keyboard state consumed by the virtual machine.
///
/// The interpreter only ever reads it. Press and release events are owned by
/// whichever input adapter implements this trait.
pub trait Keyboard: Send + Sync {
    /// Checks immediately whether the given key is currently held down.
    fn is_held(&self, key: KeyCode) -> bool;

    /// The most recent key that was pressed, if any key was ever pressed.
    fn last_pressed(&self) -> Option<KeyCode>;

    /// Block until the keyboard state may have changed, or the timeout elapses.
    ///
    /// Used while the interpreter is waiting for a keypress. The default
    /// simply yields, which turns the wait into a polling loop.
    fn wait_for_change(&self, _timeout: Duration) {
        thread::yield_now();
    }
}

/// Shared keyboard state for in-process input adapters.
///
/// Cloning the keypad shares the underlying state, so an input thread can
/// hold one handle while the virtual machine holds another.
#[derive(Debug, Clone, Default)]
pub struct Keypad {
    inner: Arc<(Mutex<KeypadState>, Condvar)>,
}

#[derive(Debug, Default, Clone, Copy)]
struct KeypadState {
    /// Pressed is a 1 bit, released is a 0 bit.
    held: u16,
    last_pressed: Option<KeyCode>,
}

impl Keypad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&self, key: KeyCode) {
        self.update(|state| {
            state.held |= 1 << key.as_u8();
            state.last_pressed = Some(key);
        })
    }

    pub fn release(&self, key: KeyCode) {
        self.update(|state| state.held &= !(1 << key.as_u8()))
    }

    /// Set all keys to up. The last pressed key is remembered.
    pub fn release_all(&self) {
        self.update(|state| state.held = 0)
    }

    /// Check whether any key is pressed down.
    pub fn any_key(&self) -> bool {
        self.lock().held > 0
    }

    fn update(&self, f: impl FnOnce(&mut KeypadState)) {
        let (_, changed) = &*self.inner;
        f(&mut self.lock());
        changed.notify_all();
    }

    fn lock(&self) -> MutexGuard<'_, KeypadState> {
        let (state, _) = &*self.inner;
        // The state is plain data, so a poisoned lock is still consistent.
        state.lock().unwrap_or_else(|err| err.into_inner())
    }
}

impl Keyboard for Keypad {
    fn is_held(&self, key: KeyCode) -> bool {
        self.lock().held & (1 << key.as_u8()) != 0
    }

    fn last_pressed(&self) -> Option<KeyCode> {
        self.lock().last_pressed
    }

    fn wait_for_change(&self, timeout: Duration) {
        let (_, changed) = &*self.inner;
        let guard = self.lock();
        // Spurious wake-ups are fine, the caller checks the state again.
        let _ = changed.wait_timeout(guard, timeout);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum KeyCode {
    Key0 = 0,
    Key1,
    Key2,
    Key3,
    Key4,
    Key5,
    Key6,
    Key7,
    Key8,
    Key9,
    KeyA,
    KeyB,
    KeyC,
    KeyD,
    KeyE,
    KeyF = 0xF,
}

impl KeyCode {
    /// All 16 keys of the hexadecimal keypad, in numeric order.
    pub const ALL: [KeyCode; KEY_COUNT as usize] = [
        Self::Key0,
        Self::Key1,
        Self::Key2,
        Self::Key3,
        Self::Key4,
        Self::Key5,
        Self::Key6,
        Self::Key7,
        Self::Key8,
        Self::Key9,
        Self::KeyA,
        Self::KeyB,
        Self::KeyC,
        Self::KeyD,
        Self::KeyE,
        Self::KeyF,
    ];

    #[inline(always)]
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

impl std::fmt::Display for KeyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let key_id = self.as_u8();
        write!(f, "k{key_id:x}")
    }
}

impl From<KeyCode> for u8 {
    fn from(keycode: KeyCode) -> Self {
        keycode.as_u8()
    }
}

impl TryFrom<u8> for KeyCode {
    type Error = InvalidKeyCode;

    fn try_from(key_id: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(key_id as usize)
            .copied()
            .ok_or(InvalidKeyCode)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct InvalidKeyCode;

impl std::error::Error for InvalidKeyCode {}

impl std::fmt::Display for InvalidKeyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "keycode must be in range 0 <= keycode < 16")
    }
}

#[cfg(feature = "serde")]
mod de {
    use std::fmt::Display;

    use num_traits::AsPrimitive;
    use serde::de::{Deserialize, Error, Expected, Unexpected, Visitor};

    use super::*;

    impl Expected for InvalidKeyCode {
        fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            <Self as Display>::fmt(self, f)
        }
    }

    impl<'de> Deserialize<'de> for KeyCode {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: serde::Deserializer<'de>,
        {
            // YAML integer type
            deserializer.deserialize_i64(KeyCodeVisitor)
        }
    }

    struct KeyCodeVisitor;

    impl KeyCodeVisitor {
        #[inline]
        fn check_int<N, E>(val: N) -> Result<KeyCode, E>
        where
            N: AsPrimitive<i64>,
            E: Error,
        {
            let n = val.as_();
            if !(0..=u8::MAX as i64).contains(&n) {
                return Err(E::invalid_value(Unexpected::Signed(n), &InvalidKeyCode));
            }

            KeyCode::try_from(n as u8).map_err(|err| E::invalid_value(Unexpected::Signed(n), &err))
        }
    }

    impl<'de> Visitor<'de> for KeyCodeVisitor {
        type Value = KeyCode;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(f, "an 8-bit integer between 0 and 16")
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: Error,
        {
            Self::check_int(v)
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: Error,
        {
            if v > u8::MAX as u64 {
                return Err(E::invalid_value(Unexpected::Unsigned(v), &InvalidKeyCode));
            }
            Self::check_int(v)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_key_state() {
        let keypad = Keypad::new();
        assert!(!keypad.any_key());
        assert_eq!(keypad.last_pressed(), None);

        keypad.press(KeyCode::Key0);
        assert!(keypad.is_held(KeyCode::Key0));
        assert!(!keypad.is_held(KeyCode::Key1));
        assert!(!keypad.is_held(KeyCode::Key7));

        keypad.press(KeyCode::Key7);
        assert!(keypad.is_held(KeyCode::Key0));
        assert!(keypad.is_held(KeyCode::Key7));
        assert_eq!(keypad.last_pressed(), Some(KeyCode::Key7));

        keypad.release(KeyCode::Key0);
        assert!(!keypad.is_held(KeyCode::Key0));
        assert!(keypad.is_held(KeyCode::Key7));
        // releasing doesn't change the last pressed key
        assert_eq!(keypad.last_pressed(), Some(KeyCode::Key7));

        keypad.press(KeyCode::KeyF);
        assert!(keypad.is_held(KeyCode::KeyF));
        assert_eq!(keypad.last_pressed(), Some(KeyCode::KeyF));

        keypad.release_all();
        assert!(!keypad.any_key());
        assert_eq!(keypad.last_pressed(), Some(KeyCode::KeyF));
    }

    #[test]
    fn test_shared_state() {
        let keypad = Keypad::new();
        let other = keypad.clone();

        other.press(KeyCode::KeyA);
        assert!(keypad.is_held(KeyCode::KeyA));
    }

    #[test]
    fn test_wait_for_change_wakes() {
        let keypad = Keypad::new();
        let input = keypad.clone();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            input.press(KeyCode::Key3);
        });

        let start = std::time::Instant::now();
        while keypad.last_pressed().is_none() {
            keypad.wait_for_change(Duration::from_millis(100));
            assert!(start.elapsed() < Duration::from_secs(5));
        }
        handle.join().unwrap();
        assert_eq!(keypad.last_pressed(), Some(KeyCode::Key3));
    }

    #[test]
    fn test_keycode_conversion() {
        for id in 0..KEY_COUNT {
            let key = KeyCode::try_from(id).unwrap();
            assert_eq!(u8::from(key), id);
        }
        assert_eq!(KeyCode::try_from(16), Err(InvalidKeyCode));
        assert_eq!(KeyCode::KeyB.to_string(), "kb");
    }
}
