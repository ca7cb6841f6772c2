//! Fake platform implementation for testing.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::pal::abstractions::{Platform, Usage};

#[derive(Debug, Default)]
struct FakePlatformState {
    wall_time: Duration,
    thread_usage: Usage,
    process_usage: Usage,
}

/// Fake implementation of the platform abstraction for testing.
///
/// Multiple clones of the same `FakePlatform` share the same underlying state, so a test
/// can keep one clone and advance time while a timer owns another clone.
#[derive(Clone, Debug)]
pub(crate) struct FakePlatform {
    state: Arc<Mutex<FakePlatformState>>,
}

impl FakePlatform {
    /// Creates a new fake platform with all values at zero.
    pub(crate) fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakePlatformState::default())),
        }
    }

    pub(crate) fn set_wall_time(&self, time: Duration) {
        self.state
            .lock()
            .expect("FakePlatform state lock should not be poisoned")
            .wall_time = time;
    }

    /// Moves the wall clock and the thread processor time forward by the same amount.
    pub(crate) fn advance(&self, delta: Duration) {
        let mut state = self
            .state
            .lock()
            .expect("FakePlatform state lock should not be poisoned");

        state.wall_time = state
            .wall_time
            .checked_add(delta)
            .expect("fake time never approaches Duration::MAX");
        state.thread_usage.processor_time = state
            .thread_usage
            .processor_time
            .checked_add(delta)
            .expect("fake time never approaches Duration::MAX");
    }

    pub(crate) fn set_thread_usage(
        &self,
        processor_time: Duration,
        read_blocks: u64,
        write_blocks: u64,
    ) {
        self.state
            .lock()
            .expect("FakePlatform state lock should not be poisoned")
            .thread_usage = Usage {
            processor_time,
            read_blocks,
            write_blocks,
        };
    }

    pub(crate) fn set_process_usage(
        &self,
        processor_time: Duration,
        read_blocks: u64,
        write_blocks: u64,
    ) {
        self.state
            .lock()
            .expect("FakePlatform state lock should not be poisoned")
            .process_usage = Usage {
            processor_time,
            read_blocks,
            write_blocks,
        };
    }
}

impl Platform for FakePlatform {
    fn wall_time(&self) -> Duration {
        self.state
            .lock()
            .expect("FakePlatform state lock should not be poisoned")
            .wall_time
    }

    fn thread_usage(&self) -> Usage {
        self.state
            .lock()
            .expect("FakePlatform state lock should not be poisoned")
            .thread_usage
    }

    fn process_usage(&self) -> Usage {
        self.state
            .lock()
            .expect("FakePlatform state lock should not be poisoned")
            .process_usage
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn initializes_with_zero_values() {
        let platform = FakePlatform::new();
        assert_eq!(platform.wall_time(), Duration::ZERO);
        assert_eq!(platform.thread_usage(), Usage::default());
        assert_eq!(platform.process_usage(), Usage::default());
    }

    #[test]
    fn advance_moves_wall_and_thread_time() {
        let platform = FakePlatform::new();
        platform.advance(Duration::from_millis(150));
        platform.advance(Duration::from_millis(50));

        assert_eq!(platform.wall_time(), Duration::from_millis(200));
        assert_eq!(
            platform.thread_usage().processor_time,
            Duration::from_millis(200)
        );
        assert_eq!(platform.process_usage().processor_time, Duration::ZERO);
    }

    #[test]
    fn shared_state_between_clones() {
        let platform1 = FakePlatform::new();
        let platform2 = platform1.clone();

        platform1.set_wall_time(Duration::from_millis(100));
        assert_eq!(platform2.wall_time(), Duration::from_millis(100));

        platform2.set_thread_usage(Duration::ZERO, 7, 9);
        assert_eq!(platform1.thread_usage().write_blocks, 9);
    }
}
