//! Delay and sound countdown timers.
use std::{
    sync::{
        atomic::{AtomicBool, AtomicU8, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crate::constants::*;

/// Countdown timer that decrements at 60Hz on its own thread.
///
/// The interpreter reads and writes the value, while the background
/// thread counts it down towards zero. Both sides go through a single
/// atomic cell, so there is no torn state and no lock.
pub struct Timer {
    value: Arc<AtomicU8>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Timer {
    /// Start a timer counting down at [`DELAY_FREQUENCY`].
    pub fn spawn() -> Self {
        Self::with_interval(Duration::from_nanos(TIMER_TICK_TIME))
    }

    /// Start a timer that counts down once every `interval`.
    pub fn with_interval(interval: Duration) -> Self {
        let value = Arc::new(AtomicU8::new(0));
        let running = Arc::new(AtomicBool::new(true));

        let handle = {
            let value = value.clone();
            let running = running.clone();
            thread::spawn(move || countdown(value, running, interval))
        };

        Self {
            value,
            running,
            handle: Some(handle),
        }
    }

    #[inline]
    pub fn get(&self) -> u8 {
        self.value.load(Ordering::SeqCst)
    }

    #[inline]
    pub fn set(&self, value: u8) {
        self.value.store(value, Ordering::SeqCst)
    }

    /// The timer is still counting down.
    ///
    /// For the sound timer this means the buzzer should be on.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.get() > 0
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
            if handle.join().is_err() {
                log::error!("timer thread panicked");
            }
        }
    }
}

/// Background loop. Ticks are scheduled against a deadline so the
/// timer doesn't drift when the thread wakes up late.
fn countdown(value: Arc<AtomicU8>, running: Arc<AtomicBool>, interval: Duration) {
    let mut deadline = Instant::now() + interval;

    while running.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now < deadline {
            // Parking, rather than sleeping, so a drop can wake the thread.
            thread::park_timeout(deadline - now);
            continue;
        }

        // Never goes below zero. The closure returning None means the
        // value was already zero and is left alone.
        let _ = value.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |x| x.checked_sub(1));

        deadline += interval;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_countdown_to_zero() {
        let timer = Timer::spawn();
        timer.set(5);
        assert!(timer.is_active());

        thread::sleep(Duration::from_millis(5 * 1000 / 60 + 50));
        assert_eq!(timer.get(), 0);
        assert!(!timer.is_active());

        // stays at zero
        thread::sleep(Duration::from_millis(50));
        assert_eq!(timer.get(), 0);
    }

    #[test]
    fn test_counts_down_while_running() {
        let timer = Timer::spawn();
        timer.set(200);

        thread::sleep(Duration::from_millis(100));
        let value = timer.get();
        assert!(value < 200, "timer did not count down: {value}");
        assert!(value > 150, "timer counted down too fast: {value}");
    }

    #[test]
    fn test_set_overrides() {
        let timer = Timer::with_interval(Duration::from_secs(60));
        timer.set(42);
        assert_eq!(timer.get(), 42);
        timer.set(0);
        assert_eq!(timer.get(), 0);
    }

    #[test]
    fn test_drop_stops_thread() {
        let timer = Timer::with_interval(Duration::from_secs(60));
        let start = Instant::now();
        drop(timer);
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
