//! CPU Clock.
use std::{
    thread,
    time::{Duration, Instant},
};

use crate::constants::*;

/// CPU clock frequency, in hertz (per second)
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Hz(pub u64);

impl From<Hz> for Duration {
    fn from(freq: Hz) -> Self {
        if freq.0 == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(NANOS_IN_SECOND / freq.0)
        }
    }
}

/// Timer to synchronize thread with the software clock of the virtual CPU.
///
/// The interpreter calls [`Clock::wait`] once per instruction cycle. A
/// cycle time of zero turns pacing off and lets the interpreter run as
/// fast as possible.
pub(crate) struct Clock {
    start: Instant,
    cycle_time: Duration,
}

impl Clock {
    /// Creates a new clock with the current time as internal state.
    pub(crate) fn new(cycle_time: Duration) -> Self {
        Self {
            start: Instant::now(),
            cycle_time,
        }
    }

    /// Set the clock state back to zero.
    pub(crate) fn reset(&mut self) {
        self.start = Instant::now()
    }

    /// Block the current thread until the next clock cycle.
    pub(crate) fn wait(&mut self) {
        if self.cycle_time.is_zero() {
            return;
        }

        while self.start.elapsed() < self.cycle_time {
            // Sleep does not have enough resolution, and causes
            // the clock to run at 30 FPS.
            //
            // Spinning a loop causes high CPU usage and fan madness.
            //
            // Yielding in a loop is the best alternative.
            thread::yield_now();
        }

        // Reset back to zero, rather than trying to catch up.
        //
        // If the VM was paused waiting for a key, and a large
        // amount of time has elapsed until it is resumed,
        // it should simply continue at the next cycle running
        // at its usual speed.
        self.reset();
    }
}
