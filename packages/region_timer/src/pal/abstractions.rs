//! Platform abstraction trait definitions.

use std::fmt::Debug;
use std::time::Duration;

/// Resource usage counters captured at a single point in time.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) struct Usage {
    /// User plus system processor time.
    pub(crate) processor_time: Duration,

    /// Number of block input operations.
    pub(crate) read_blocks: u64,

    /// Number of block output operations.
    pub(crate) write_blocks: u64,
}

/// Provides the time and resource usage samples that region timers are built on.
///
/// Every method must return values that never decrease between consecutive calls
/// made from the same thread.
pub(crate) trait Platform: Debug + Send + Sync + 'static {
    /// Gets the monotonic wall clock time, measured from an arbitrary process-wide origin.
    fn wall_time(&self) -> Duration;

    /// Gets the resource usage of the current thread.
    fn thread_usage(&self) -> Usage;

    /// Gets the resource usage of the entire process.
    fn process_usage(&self) -> Usage;
}
