//! Builder for region timers.

use crate::RegionTimer;
use crate::pal::PlatformFacade;
use crate::region_node::TrackedMetrics;

/// Name of the top-level region when none is specified.
pub(crate) const DEFAULT_TOP_LEVEL_NAME: &str = "total";

/// Whose resource usage a timer attributes to its regions.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum UsageScope {
    /// Processor time and block counters of the thread that calls the timer.
    ///
    /// On platforms without per-thread block counters, process block counters are used.
    #[default]
    Thread,

    /// Processor time and block counters of the entire process.
    Process,
}

/// Creates instances of [`RegionTimer`].
///
/// All metrics are tracked by default. Use `RegionTimer::builder()` to create a new instance
/// of this builder.
///
/// # Example
///
/// ```
/// use region_timer::{RegionTimer, UsageScope};
///
/// let mut timer = RegionTimer::builder()
///     .name("compaction")
///     .track_processor_time(false)
///     .usage_scope(UsageScope::Process)
///     .build();
///
/// timer.enter("merge");
/// timer.exit("merge");
/// ```
#[derive(Debug)]
pub struct RegionTimerBuilder {
    name: String,
    metrics: TrackedMetrics,
    usage_scope: UsageScope,
    platform: PlatformFacade,
}

impl RegionTimerBuilder {
    pub(crate) fn new() -> Self {
        Self {
            name: DEFAULT_TOP_LEVEL_NAME.to_string(),
            metrics: TrackedMetrics {
                wall_time: true,
                processor_time: true,
                count: true,
            },
            usage_scope: UsageScope::default(),
            platform: PlatformFacade::real(),
        }
    }

    /// Sets the name of the top-level region. Defaults to `"total"`.
    #[must_use]
    pub fn name(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    /// Whether to track wall clock time.
    #[must_use]
    pub fn track_wall_time(mut self, enabled: bool) -> Self {
        self.metrics.wall_time = enabled;
        self
    }

    /// Whether to track processor time and block input/output counters.
    ///
    /// The counters are read together with processor time, so they share one switch.
    #[must_use]
    pub fn track_processor_time(mut self, enabled: bool) -> Self {
        self.metrics.processor_time = enabled;
        self
    }

    /// Whether to count how many times each region is entered.
    #[must_use]
    pub fn track_count(mut self, enabled: bool) -> Self {
        self.metrics.count = enabled;
        self
    }

    /// Sets whose resource usage is measured. Defaults to [`UsageScope::Thread`].
    #[must_use]
    pub fn usage_scope(self, usage_scope: UsageScope) -> Self {
        Self {
            usage_scope,
            ..self
        }
    }

    #[cfg(test)]
    pub(crate) fn platform(self, platform: PlatformFacade) -> Self {
        Self { platform, ..self }
    }

    /// Creates the timer. Its top-level region starts timing immediately.
    #[must_use]
    pub fn build(self) -> RegionTimer {
        RegionTimer::new_inner(&self.name, self.metrics, self.usage_scope, self.platform)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn defaults_track_everything() {
        let builder = RegionTimerBuilder::new();

        assert_eq!(builder.name, DEFAULT_TOP_LEVEL_NAME);
        assert!(builder.metrics.wall_time);
        assert!(builder.metrics.processor_time);
        assert!(builder.metrics.count);
        assert_eq!(builder.usage_scope, UsageScope::Thread);
    }

    #[test]
    fn setters_override_defaults() {
        let builder = RegionTimerBuilder::new()
            .name("session")
            .track_wall_time(false)
            .track_processor_time(false)
            .track_count(false)
            .usage_scope(UsageScope::Process);

        assert_eq!(builder.name, "session");
        assert!(!builder.metrics.wall_time);
        assert!(!builder.metrics.processor_time);
        assert!(!builder.metrics.count);
        assert_eq!(builder.usage_scope, UsageScope::Process);
    }
}
