//! The timer handed out when timing is disabled.

use std::time::Duration;

use crate::{Region, Timer, TimerReport};

/// A [`Timer`] that ignores every call.
///
/// It never allocates and never reads a clock. The registry hands it out when timing is
/// disabled for the process.
#[derive(Clone, Copy, Debug, Default)]
#[non_exhaustive]
pub struct NoopTimer;

impl Timer for NoopTimer {
    #[inline]
    fn enter(&mut self, _name: &str) {}

    #[inline]
    fn exit(&mut self, _name: &str) {}

    #[inline]
    fn change(&mut self, _name: &str) {}

    #[inline]
    fn add_wall_time(&mut self, _name: &str, _time: Duration) {}

    #[inline]
    fn add_processor_time(&mut self, _name: &str, _time: Duration) {}

    #[inline]
    fn add_count(&mut self, _name: &str, _count: u64) {}

    #[inline]
    fn add_read_blocks(&mut self, _name: &str, _blocks: u64) {}

    #[inline]
    fn add_write_blocks(&mut self, _name: &str, _blocks: u64) {}

    fn region(&self, _name: &str) -> Option<Region> {
        None
    }

    fn report(&mut self) -> Option<TimerReport> {
        None
    }
}
