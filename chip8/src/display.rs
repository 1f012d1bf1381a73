//! Display buffer and the hand-off to presentation.
use std::{
    fmt::{self, Write},
    sync::{mpsc::RecvTimeoutError, Arc, Condvar, Mutex, MutexGuard},
    time::Duration,
};

use crate::constants::*;

/// Monochrome pixel state, row major.
pub type Frame = [bool; DISPLAY_BUFFER_SIZE];

/// Screen buffer that sprites are drawn to.
pub struct Display {
    pixels: Box<Frame>,
}

impl Default for Display {
    fn default() -> Self {
        Self {
            pixels: Box::new([false; DISPLAY_BUFFER_SIZE]),
        }
    }
}

impl Display {
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn every pixel off.
    pub fn clear(&mut self) {
        self.pixels.fill(false);
    }

    /// Toggle the pixel at the given coordinate.
    ///
    /// Returns the state of the pixel *before* it was flipped, so a `true`
    /// result means the pixel was turned off.
    ///
    /// # Panics
    ///
    /// When the coordinate is outside of the 64x32 display.
    #[inline]
    pub fn flip_pixel(&mut self, x: usize, y: usize) -> bool {
        let px = &mut self.pixels[offset(x, y)];
        let was_on = *px;
        *px = !was_on;
        was_on
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.pixels[offset(x, y)]
    }

    pub fn buffer(&self) -> &Frame {
        &self.pixels
    }
}

#[inline(always)]
fn offset(x: usize, y: usize) -> usize {
    assert!(
        x < DISPLAY_WIDTH && y < DISPLAY_HEIGHT,
        "pixel ({x}, {y}) out of display bounds"
    );
    x + y * DISPLAY_WIDTH
}

/// Presentation adapter that receives the display after it changes.
///
/// The frame is only borrowed for the duration of the call. Implementations
/// that present on another thread must copy it.
pub trait Screen: Send {
    fn render(&mut self, frame: &Frame);
}

/// Screen that discards every frame. Used for headless runs.
#[derive(Debug, Default)]
pub struct NullScreen;

impl Screen for NullScreen {
    fn render(&mut self, _frame: &Frame) {}
}

/// Sends snapshots of the display to a presentation thread.
///
/// The hand-off holds a single frame. When the presenter hasn't picked up the
/// previous frame yet it is replaced by the new one, so the presenter always
/// ends on the current display and the interpreter never waits on it.
pub struct FrameSender {
    slot: Arc<FrameSlot>,
    replaced: usize,
}

/// Presenter side of [`FrameSender`].
pub struct FrameReceiver {
    slot: Arc<FrameSlot>,
}

#[derive(Default)]
struct FrameSlot {
    state: Mutex<SlotState>,
    ready: Condvar,
}

#[derive(Default)]
struct SlotState {
    frame: Option<Box<Frame>>,
    /// Sender was dropped.
    closed: bool,
}

impl FrameSlot {
    fn lock(&self) -> MutexGuard<'_, SlotState> {
        // Plain data, a poisoned lock is still consistent.
        self.state.lock().unwrap_or_else(|err| err.into_inner())
    }
}

impl FrameSender {
    pub fn channel() -> (Self, FrameReceiver) {
        let slot = Arc::new(FrameSlot::default());
        (
            Self {
                slot: slot.clone(),
                replaced: 0,
            },
            FrameReceiver { slot },
        )
    }

    /// Number of frames overwritten before the presenter picked them up.
    pub fn replaced(&self) -> usize {
        self.replaced
    }
}

impl Screen for FrameSender {
    fn render(&mut self, frame: &Frame) {
        let mut state = self.slot.lock();
        if state.frame.replace(Box::new(*frame)).is_some() {
            self.replaced += 1;
        }
        self.slot.ready.notify_one();
    }
}

impl Drop for FrameSender {
    fn drop(&mut self) {
        self.slot.lock().closed = true;
        self.slot.ready.notify_all();
    }
}

impl FrameReceiver {
    /// Take the latest frame, if one arrived since the last call.
    pub fn try_recv(&self) -> Option<Box<Frame>> {
        self.slot.lock().frame.take()
    }

    /// Block until a frame arrives, the timeout elapses, or the sender is gone.
    ///
    /// A frame that was sent before the sender dropped is still delivered.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Box<Frame>, RecvTimeoutError> {
        let state = self.slot.lock();
        let (mut state, _) = self
            .slot
            .ready
            .wait_timeout_while(state, timeout, |state| {
                state.frame.is_none() && !state.closed
            })
            .unwrap_or_else(|err| err.into_inner());

        match state.frame.take() {
            Some(frame) => Ok(frame),
            None if state.closed => Err(RecvTimeoutError::Disconnected),
            None => Err(RecvTimeoutError::Timeout),
        }
    }
}

/// Text rendering of a frame, `#` for on and `.` for off.
pub fn dump(frame: &Frame) -> Result<String, fmt::Error> {
    let mut buf = String::with_capacity((DISPLAY_WIDTH + 1) * DISPLAY_HEIGHT);

    for row in frame.chunks(DISPLAY_WIDTH) {
        for px in row {
            buf.write_char(if *px { '#' } else { '.' })?;
        }
        writeln!(buf)?;
    }

    Ok(buf)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_flip_pixel() {
        let mut display = Display::new();

        assert!(!display.flip_pixel(3, 4));
        assert!(display.pixel(3, 4));
        assert!(display.buffer()[3 + 4 * DISPLAY_WIDTH]);

        // second flip turns the pixel off, and reports it was on
        assert!(display.flip_pixel(3, 4));
        assert!(!display.pixel(3, 4));
    }

    #[test]
    fn test_clear() {
        let mut display = Display::new();
        display.flip_pixel(0, 0);
        display.flip_pixel(63, 31);
        display.clear();
        assert!(display.buffer().iter().all(|px| !*px));
    }

    #[test]
    #[should_panic]
    fn test_out_of_bounds() {
        let mut display = Display::new();
        display.flip_pixel(DISPLAY_WIDTH, 0);
    }

    #[test]
    fn test_frame_sender_keeps_latest() {
        let (mut sender, receiver) = FrameSender::channel();
        let mut display = Display::new();

        display.flip_pixel(1, 1);
        sender.render(display.buffer());
        display.flip_pixel(2, 2);
        sender.render(display.buffer());
        assert_eq!(sender.replaced(), 1);

        // the presenter sees the newest snapshot, once
        let frame = receiver.try_recv().unwrap();
        assert!(frame[1 + DISPLAY_WIDTH]);
        assert!(frame[2 + 2 * DISPLAY_WIDTH]);
        assert!(receiver.try_recv().is_none());

        // snapshots are unaffected by later drawing
        sender.render(display.buffer());
        display.flip_pixel(3, 3);
        let frame = receiver.try_recv().unwrap();
        assert!(!frame[3 + 3 * DISPLAY_WIDTH]);
    }

    #[test]
    fn test_frame_receiver_wakes() {
        let (mut sender, receiver) = FrameSender::channel();

        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            let mut display = Display::new();
            display.flip_pixel(5, 5);
            sender.render(display.buffer());
        });

        let frame = receiver.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(frame[5 + 5 * DISPLAY_WIDTH]);
        handle.join().unwrap();

        // sender dropped with the thread
        assert_eq!(
            receiver.recv_timeout(Duration::from_millis(10)).unwrap_err(),
            RecvTimeoutError::Disconnected
        );
    }

    #[test]
    fn test_frame_receiver_timeout() {
        let (_sender, receiver) = FrameSender::channel();
        assert_eq!(
            receiver.recv_timeout(Duration::from_millis(10)).unwrap_err(),
            RecvTimeoutError::Timeout
        );
    }

    #[test]
    fn test_dump() {
        let mut display = Display::new();
        display.flip_pixel(0, 0);
        display.flip_pixel(2, 1);

        let text = dump(display.buffer()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), DISPLAY_HEIGHT);
        assert!(lines[0].starts_with("#..."));
        assert!(lines[1].starts_with("..#."));
        assert_eq!(lines[31].len(), DISPLAY_WIDTH);
    }
}
