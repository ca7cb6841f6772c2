//! Detached snapshots of a single region.

use std::time::Duration;

/// Detached copy of the metrics accumulated by one region of a [`RegionTimer`][1].
///
/// A `Region` has no links to its parent or children and does not change when the timer
/// continues to run. Metrics that the timer does not track are reported as zero.
///
/// # Examples
///
/// ```
/// use region_timer::RegionTimer;
///
/// let mut timer = RegionTimer::new();
/// timer.enter("load");
/// timer.exit("load");
///
/// let load = timer.region("load").expect("region was entered above");
/// assert_eq!(load.name(), "load");
/// assert_eq!(load.count(), 1);
/// ```
///
/// [1]: crate::RegionTimer
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Region {
    pub(crate) name: String,
    pub(crate) wall_time: Duration,
    pub(crate) processor_time: Duration,
    pub(crate) count: u64,
    pub(crate) read_blocks: u64,
    pub(crate) write_blocks: u64,
}

impl Region {
    /// The name of the region, unique among its siblings.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total wall clock time spent inside the region.
    #[must_use]
    pub fn wall_time(&self) -> Duration {
        self.wall_time
    }

    /// Total processor time (user plus system) spent inside the region.
    #[must_use]
    pub fn processor_time(&self) -> Duration {
        self.processor_time
    }

    /// How many times the region was entered, plus any counts added directly.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Block input operations performed inside the region.
    #[must_use]
    pub fn read_blocks(&self) -> u64 {
        self.read_blocks
    }

    /// Block output operations performed inside the region.
    #[must_use]
    pub fn write_blocks(&self) -> u64 {
        self.write_blocks
    }
}
