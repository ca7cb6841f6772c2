//! The hierarchical region timer.

use std::iter;
use std::time::Duration;

use tracing::{error, warn};

use crate::error::Result;
use crate::pal::{Platform, PlatformFacade};
use crate::region_node::{RegionId, RegionNode, Sample, TrackedMetrics};
use crate::{Error, Region, RegionReport, RegionTimerBuilder, Timer, TimerReport, UsageScope};

/// Accumulates wall clock time, processor time, entry counts and block input/output counts
/// for a tree of named regions.
///
/// Code brackets a span of work with [`enter()`](Self::enter) and [`exit()`](Self::exit).
/// Entering a region moves the timer's cursor to a child of the current region (creating it
/// on first use), so the path from the top-level region to the cursor mirrors the nesting of
/// the spans that are currently open.
///
/// The top-level region is open from the moment the timer is created. Reports close it out
/// up to the moment of the query, so its totals always reflect the time elapsed so far.
///
/// # Unbalanced use
///
/// Misuse never panics:
///
/// * Exiting an ancestor of the current region first closes every region nested inside it.
/// * Exiting a region that is not open is logged and ignored.
/// * Exiting (or changing away from) the top-level region is logged and ignored.
///
/// Use [`try_exit()`](Self::try_exit) and [`try_change()`](Self::try_change) to receive
/// these conditions as errors instead.
///
/// # Direct additions
///
/// The `add_*` methods add a pre-measured value to the child region `name` of the current
/// region, located exactly like `enter()` would locate it. They are additive with the spans
/// of that same child and do not move the cursor.
///
/// # Thread safety
///
/// A timer is owned by one logical session and has no internal synchronization. Use a
/// [`TimerRegistry`][crate::TimerRegistry] to give each thread its own timer.
///
/// # Example
///
/// ```
/// use region_timer::RegionTimer;
///
/// let mut timer = RegionTimer::new();
///
/// for _ in 0..3 {
///     timer.enter("read");
///     // Read something.
///     timer.change("decode");
///     // Decode what was read.
///     timer.exit("decode");
/// }
///
/// assert_eq!(timer.region("read").unwrap().count(), 3);
/// assert_eq!(timer.region("decode").unwrap().count(), 3);
///
/// timer.print_to_stdout();
/// ```
#[derive(Debug)]
pub struct RegionTimer {
    // Arena of all regions. The top-level region is at `RegionId::ROOT`.
    regions: Vec<RegionNode>,
    current: RegionId,

    metrics: TrackedMetrics,
    usage_scope: UsageScope,
    platform: PlatformFacade,
}

impl RegionTimer {
    /// Creates a timer with a top-level region called `"total"` that tracks every metric.
    #[expect(
        clippy::new_without_default,
        reason = "creating a timer starts timing, which is not what a default value should do"
    )]
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a timer with a top-level region called `name` that tracks every metric.
    #[must_use]
    pub fn with_name(name: impl Into<String>) -> Self {
        Self::builder().name(name).build()
    }

    /// Creates a builder to customize the tracked metrics and the top-level region name.
    #[must_use]
    pub fn builder() -> RegionTimerBuilder {
        RegionTimerBuilder::new()
    }

    pub(crate) fn new_inner(
        name: &str,
        metrics: TrackedMetrics,
        usage_scope: UsageScope,
        platform: PlatformFacade,
    ) -> Self {
        let mut timer = Self {
            regions: vec![RegionNode::new(name, None)],
            current: RegionId::ROOT,
            metrics,
            usage_scope,
            platform,
        };

        let sample = timer.sample();
        timer.node_mut(RegionId::ROOT).open(&sample, metrics);

        timer
    }

    /// The name of the top-level region.
    #[must_use]
    pub fn name(&self) -> &str {
        self.node(RegionId::ROOT).name()
    }

    /// The name of the innermost open region.
    #[must_use]
    pub fn current(&self) -> &str {
        self.node(self.current).name()
    }

    /// Opens a span of the child region `name` under the current region.
    pub fn enter(&mut self, name: &str) {
        let id = self.child(self.current, name);
        self.current = id;

        let sample = self.sample();
        let metrics = self.metrics;
        self.node_mut(id).open(&sample, metrics);
    }

    /// Closes the span of region `name`.
    ///
    /// If `name` is an ancestor of the current region, the regions nested inside it are
    /// closed first. Any other mismatch, or an attempt to exit the top-level region, is logged
    /// and otherwise ignored.
    pub fn exit(&mut self, name: &str) {
        match self.try_exit(name) {
            Ok(()) => {}
            Err(Error::AtTopLevel { name: top_level }) => {
                warn!(
                    region = name,
                    top_level = %top_level,
                    "exit ignored, already at the top-level region"
                );
            }
            Err(e) => {
                error!(region = name, error = %e, "exit ignored, examine the use of timing calls");
            }
        }
    }

    /// Closes the span of region `name`, reporting unbalanced use as an error.
    ///
    /// The timer is left unchanged when an error is returned, with one exception: if `name`
    /// is the top-level region and the current region is nested inside it, the nested regions
    /// are closed before [`Error::AtTopLevel`] is returned.
    ///
    /// # Errors
    ///
    /// * [`Error::RegionNotOpen`] if `name` is neither the current region nor an ancestor.
    /// * [`Error::AtTopLevel`] if the exit would leave the top-level region.
    pub fn try_exit(&mut self, name: &str) -> Result<()> {
        if self.current() != name {
            let is_ancestor = self
                .ancestors(self.current)
                .skip(1)
                .any(|id| self.node(id).name() == name);

            if !is_ancestor {
                return Err(Error::RegionNotOpen {
                    name: name.to_string(),
                    current: self.current().to_string(),
                });
            }

            warn!(
                region = name,
                current = self.current(),
                "exit does not match the innermost open region, closing the regions nested in it"
            );

            while self.current() != name {
                self.exit_current()?;
            }
        }

        self.exit_current()
    }

    /// Closes the current region and opens its sibling `name`, using a single reading of the
    /// time sources for both transitions.
    ///
    /// Calling this while the top-level region is current is logged and otherwise ignored.
    pub fn change(&mut self, name: &str) {
        if let Err(e) = self.try_change(name) {
            warn!(region = name, error = %e, "change ignored");
        }
    }

    /// Closes the current region and opens its sibling `name`.
    ///
    /// # Errors
    ///
    /// [`Error::AtTopLevel`] if the top-level region is current, in which case the timer
    /// is left unchanged.
    pub fn try_change(&mut self, name: &str) -> Result<()> {
        let Some(parent) = self.node(self.current).parent() else {
            return Err(Error::AtTopLevel {
                name: self.current().to_string(),
            });
        };

        let sample = self.sample();
        let metrics = self.metrics;

        self.node_mut(self.current).close(&sample);

        let id = self.child(parent, name);
        self.current = id;
        self.node_mut(id).open(&sample, metrics);

        Ok(())
    }

    /// Adds externally measured wall clock time to the child region `name`.
    ///
    /// Ignored if the timer does not track wall clock time.
    pub fn add_wall_time(&mut self, name: &str, time: Duration) {
        if self.metrics.wall_time {
            let id = self.child(self.current, name);
            self.node_mut(id).add_wall_time(time);
        }
    }

    /// Adds externally measured processor time to the child region `name`.
    ///
    /// Ignored if the timer does not track processor time.
    pub fn add_processor_time(&mut self, name: &str, time: Duration) {
        if self.metrics.processor_time {
            let id = self.child(self.current, name);
            self.node_mut(id).add_processor_time(time);
        }
    }

    /// Adds to the entry count of the child region `name`.
    ///
    /// Ignored if the timer does not count entries.
    pub fn add_count(&mut self, name: &str, count: u64) {
        if self.metrics.count {
            let id = self.child(self.current, name);
            self.node_mut(id).add_count(count);
        }
    }

    /// Adds block input operations to the child region `name`.
    ///
    /// Ignored if the timer does not track processor time, which block counters belong to.
    pub fn add_read_blocks(&mut self, name: &str, blocks: u64) {
        if self.metrics.processor_time {
            let id = self.child(self.current, name);
            self.node_mut(id).add_read_blocks(blocks);
        }
    }

    /// Adds block output operations to the child region `name`.
    ///
    /// Ignored if the timer does not track processor time, which block counters belong to.
    pub fn add_write_blocks(&mut self, name: &str, blocks: u64) {
        if self.metrics.processor_time {
            let id = self.child(self.current, name);
            self.node_mut(id).add_write_blocks(blocks);
        }
    }

    /// Returns a snapshot of the first region called `name`.
    ///
    /// The search is depth-first from the top-level region, visiting children in name order.
    /// Returns `None` if no region has that name.
    #[must_use]
    pub fn region(&self, name: &str) -> Option<Region> {
        let mut pending = vec![RegionId::ROOT];

        while let Some(id) = pending.pop() {
            let node = self.node(id);
            if node.name() == name {
                return Some(node.snapshot());
            }

            // Reversed so that the first child is popped first.
            pending.extend(node.children().iter().rev());
        }

        None
    }

    /// Brings the top-level region up to date and returns a snapshot of the whole tree.
    #[must_use]
    pub fn report(&mut self) -> TimerReport {
        self.close_out_top_level();

        TimerReport::new(self.region_report(RegionId::ROOT), self.metrics)
    }

    /// Renders the region tree as JSON after bringing the top-level region up to date.
    ///
    /// See [`TimerReport::to_json()`] for the format.
    #[must_use]
    pub fn to_json(&mut self) -> String {
        self.report().to_json()
    }

    /// Prints the region tree as a text table to stdout after bringing the top-level region
    /// up to date.
    #[cfg_attr(test, mutants::skip)] // Too difficult to test stdout output reliably - manually tested.
    pub fn print_to_stdout(&mut self) {
        self.report().print_to_stdout();
    }

    /// Adds the time since the top-level region was entered (or last closed out) to its
    /// totals, leaving it open.
    fn close_out_top_level(&mut self) {
        let sample = self.sample();
        self.node_mut(RegionId::ROOT).close(&sample);
    }

    fn region_report(&self, id: RegionId) -> RegionReport {
        let node = self.node(id);

        RegionReport::new(
            node.snapshot(),
            node.children()
                .iter()
                .map(|child| self.region_report(*child))
                .collect(),
        )
    }

    /// Closes the current region and moves the cursor to its parent.
    fn exit_current(&mut self) -> Result<()> {
        let Some(parent) = self.node(self.current).parent() else {
            return Err(Error::AtTopLevel {
                name: self.current().to_string(),
            });
        };

        let sample = self.sample();
        self.node_mut(self.current).close(&sample);
        self.current = parent;

        Ok(())
    }

    /// Finds or creates the child `name` of `parent`, keeping the children sorted by name.
    fn child(&mut self, parent: RegionId, name: &str) -> RegionId {
        let position = match self.node(parent).locate_child(&self.regions, name) {
            Ok(position) => position,
            Err(position) => {
                let id = RegionId::new(self.regions.len());
                self.regions.push(RegionNode::new(name, Some(parent)));
                self.node_mut(parent).insert_child(position, id);
                position
            }
        };

        self.node_mut(parent).select_child(position)
    }

    /// Iterates from `id` up to the top-level region, starting with `id` itself.
    fn ancestors(&self, id: RegionId) -> impl Iterator<Item = RegionId> + '_ {
        iter::successors(Some(id), |id| self.node(*id).parent())
    }

    /// Reads every time source that the timer tracks.
    fn sample(&self) -> Sample {
        Sample {
            wall_time: self
                .metrics
                .wall_time
                .then(|| self.platform.wall_time()),
            usage: self
                .metrics
                .processor_time
                .then(|| match self.usage_scope {
                    UsageScope::Thread => self.platform.thread_usage(),
                    UsageScope::Process => self.platform.process_usage(),
                }),
        }
    }

    fn node(&self, id: RegionId) -> &RegionNode {
        self.regions
            .get(id.index())
            .expect("region ids are only created for existing arena slots")
    }

    fn node_mut(&mut self, id: RegionId) -> &mut RegionNode {
        self.regions
            .get_mut(id.index())
            .expect("region ids are only created for existing arena slots")
    }
}

impl Timer for RegionTimer {
    fn enter(&mut self, name: &str) {
        Self::enter(self, name);
    }

    fn exit(&mut self, name: &str) {
        Self::exit(self, name);
    }

    fn change(&mut self, name: &str) {
        Self::change(self, name);
    }

    fn add_wall_time(&mut self, name: &str, time: Duration) {
        Self::add_wall_time(self, name, time);
    }

    fn add_processor_time(&mut self, name: &str, time: Duration) {
        Self::add_processor_time(self, name, time);
    }

    fn add_count(&mut self, name: &str, count: u64) {
        Self::add_count(self, name, count);
    }

    fn add_read_blocks(&mut self, name: &str, blocks: u64) {
        Self::add_read_blocks(self, name, blocks);
    }

    fn add_write_blocks(&mut self, name: &str, blocks: u64) {
        Self::add_write_blocks(self, name, blocks);
    }

    fn region(&self, name: &str) -> Option<Region> {
        Self::region(self, name)
    }

    fn report(&mut self) -> Option<TimerReport> {
        Some(Self::report(self))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::pal::FakePlatform;

    fn create_test_timer() -> (RegionTimer, FakePlatform) {
        let platform = FakePlatform::new();
        let timer = RegionTimer::builder()
            .platform(PlatformFacade::fake(platform.clone()))
            .build();

        (timer, platform)
    }

    fn child_names(report: &TimerReport) -> Vec<String> {
        report
            .root()
            .children()
            .iter()
            .map(|child| child.region().name().to_string())
            .collect()
    }

    #[test]
    fn top_level_region_is_open_from_creation() {
        let (mut timer, platform) = create_test_timer();
        platform.advance(Duration::from_millis(40));

        let report = timer.report();
        let top = report.root().region();

        assert_eq!(top.name(), "total");
        assert_eq!(top.count(), 1);
        assert_eq!(top.wall_time(), Duration::from_millis(40));
        assert_eq!(top.processor_time(), Duration::from_millis(40));
    }

    #[test]
    fn repeated_reports_do_not_double_count_top_level() {
        let (mut timer, platform) = create_test_timer();

        platform.advance(Duration::from_millis(10));
        _ = timer.report();
        platform.advance(Duration::from_millis(5));
        _ = timer.report();

        assert_eq!(
            timer.region("total").unwrap().wall_time(),
            Duration::from_millis(15)
        );
    }

    #[test]
    fn children_are_sorted_by_name() {
        let (mut timer, _) = create_test_timer();

        for name in ["m", "c", "x", "a", "m", "q", "c", "b", "z", "a"] {
            timer.enter(name);
            timer.exit(name);
        }

        assert_eq!(
            child_names(&timer.report()),
            ["a", "b", "c", "m", "q", "x", "z"]
        );
        assert_eq!(timer.region("m").unwrap().count(), 2);
    }

    #[test]
    fn balanced_round_trip() {
        let (mut timer, platform) = create_test_timer();

        timer.enter("a");
        platform.advance(Duration::from_millis(10));
        timer.enter("b");
        platform.advance(Duration::from_millis(20));
        timer.exit("b");
        platform.advance(Duration::from_millis(5));
        timer.exit("a");

        assert_eq!(timer.current(), "total");

        let a = timer.region("a").unwrap();
        let b = timer.region("b").unwrap();
        assert_eq!(a.count(), 1);
        assert_eq!(b.count(), 1);
        assert_eq!(a.wall_time(), Duration::from_millis(35));
        assert_eq!(b.wall_time(), Duration::from_millis(20));
        assert_eq!(b.processor_time(), Duration::from_millis(20));
    }

    #[test]
    fn exit_of_ancestor_closes_nested_regions() {
        let (mut timer, platform) = create_test_timer();

        timer.enter("a");
        timer.enter("b");
        timer.enter("c");
        platform.advance(Duration::from_millis(7));
        timer.exit("a");

        assert_eq!(timer.current(), "total");

        for name in ["a", "b", "c"] {
            let region = timer.region(name).unwrap();
            assert_eq!(region.count(), 1, "{name}");
            assert_eq!(region.wall_time(), Duration::from_millis(7), "{name}");
        }
    }

    #[test]
    fn exit_of_unknown_region_changes_nothing() {
        let (mut timer, platform) = create_test_timer();

        timer.enter("good1");
        timer.enter("good2");
        platform.advance(Duration::from_millis(3));

        assert!(matches!(
            timer.try_exit("bad1"),
            Err(Error::RegionNotOpen { ref name, ref current }) if name == "bad1" && current == "good2"
        ));
        timer.exit("bad1");

        assert_eq!(timer.current(), "good2");
        assert_eq!(timer.region("good2").unwrap().wall_time(), Duration::ZERO);
        assert!(timer.region("bad1").is_none());

        // A later correct exit still cleans up.
        timer.exit("good1");
        assert_eq!(timer.current(), "total");
        assert_eq!(
            timer.region("good2").unwrap().wall_time(),
            Duration::from_millis(3)
        );
    }

    #[test]
    fn exit_past_top_level_is_ignored() {
        let (mut timer, platform) = create_test_timer();
        platform.advance(Duration::from_millis(9));

        assert!(matches!(
            timer.try_exit("total"),
            Err(Error::AtTopLevel { .. })
        ));
        timer.exit("total");
        timer.exit("total");

        assert_eq!(timer.current(), "total");
        // Nothing was accumulated by the ignored exits.
        assert_eq!(timer.region("total").unwrap().wall_time(), Duration::ZERO);
    }

    #[test]
    fn exit_after_full_unwind_is_ignored() {
        let (mut timer, _) = create_test_timer();

        timer.enter("a");
        timer.exit("a");
        timer.exit("a");

        assert_eq!(timer.current(), "total");
        assert_eq!(timer.region("a").unwrap().count(), 1);
    }

    #[test]
    fn exit_naming_top_level_from_nested_region_drains_then_stops() {
        let (mut timer, platform) = create_test_timer();

        timer.enter("a");
        platform.advance(Duration::from_millis(4));
        timer.exit("total");

        assert_eq!(timer.current(), "total");
        assert_eq!(
            timer.region("a").unwrap().wall_time(),
            Duration::from_millis(4)
        );
    }

    #[test]
    fn change_moves_to_sibling_with_one_sample() {
        let (mut timer, platform) = create_test_timer();

        timer.enter("read");
        platform.advance(Duration::from_millis(10));
        timer.change("decode");
        platform.advance(Duration::from_millis(30));
        timer.exit("decode");

        assert_eq!(timer.current(), "total");

        let read = timer.region("read").unwrap();
        let decode = timer.region("decode").unwrap();
        assert_eq!(read.wall_time(), Duration::from_millis(10));
        assert_eq!(decode.wall_time(), Duration::from_millis(30));
        assert_eq!(read.count(), 1);
        assert_eq!(decode.count(), 1);
        assert_eq!(child_names(&timer.report()), ["decode", "read"]);
    }

    #[test]
    fn change_at_top_level_is_ignored() {
        let (mut timer, _) = create_test_timer();

        assert!(matches!(
            timer.try_change("other"),
            Err(Error::AtTopLevel { .. })
        ));
        timer.change("other");

        assert_eq!(timer.current(), "total");
        assert!(timer.region("other").is_none());
    }

    #[test]
    fn add_count_is_additive_with_entries_of_the_same_child() {
        let (mut timer, _) = create_test_timer();

        timer.enter("load");
        timer.exit("load");
        timer.add_count("load", 5);

        assert_eq!(timer.region("load").unwrap().count(), 6);
        assert_eq!(timer.current(), "total");
    }

    #[test]
    fn add_inside_open_region_targets_nested_child() {
        let (mut timer, _) = create_test_timer();

        timer.enter("load");
        timer.add_count("load", 5);
        timer.exit("load");

        let report = timer.report();
        let load = &report.root().children()[0];
        assert_eq!(load.region().count(), 1);
        assert_eq!(load.children()[0].region().name(), "load");
        assert_eq!(load.children()[0].region().count(), 5);
    }

    #[test]
    fn direct_additions_accumulate_without_moving_cursor() {
        let (mut timer, _) = create_test_timer();

        timer.add_wall_time("inner", Duration::from_millis(5));
        timer.add_processor_time("inner", Duration::from_millis(3));
        timer.add_read_blocks("inner", 2);
        timer.add_write_blocks("inner", 4);

        assert_eq!(timer.current(), "total");

        let inner = timer.region("inner").unwrap();
        assert_eq!(inner.wall_time(), Duration::from_millis(5));
        assert_eq!(inner.processor_time(), Duration::from_millis(3));
        assert_eq!(inner.read_blocks(), 2);
        assert_eq!(inner.write_blocks(), 4);
        assert_eq!(inner.count(), 0);
    }

    #[test]
    fn additions_for_untracked_metrics_are_ignored() {
        let mut timer = RegionTimer::builder()
            .platform(PlatformFacade::fake(FakePlatform::new()))
            .track_wall_time(false)
            .track_processor_time(false)
            .track_count(false)
            .build();

        timer.add_wall_time("x", Duration::from_millis(5));
        timer.add_processor_time("x", Duration::from_millis(5));
        timer.add_count("x", 5);
        timer.add_read_blocks("x", 5);
        timer.add_write_blocks("x", 5);

        assert!(timer.region("x").is_none());
    }

    #[test]
    fn block_counters_follow_usage_scope() {
        let platform = FakePlatform::new();
        let mut timer = RegionTimer::builder()
            .platform(PlatformFacade::fake(platform.clone()))
            .usage_scope(UsageScope::Process)
            .build();

        timer.enter("io");
        platform.set_thread_usage(Duration::ZERO, 100, 100);
        platform.set_process_usage(Duration::from_millis(8), 3, 5);
        timer.exit("io");

        let io = timer.region("io").unwrap();
        assert_eq!(io.processor_time(), Duration::from_millis(8));
        assert_eq!(io.read_blocks(), 3);
        assert_eq!(io.write_blocks(), 5);
    }

    #[test]
    fn region_lookup_is_depth_first_in_name_order() {
        let (mut timer, _) = create_test_timer();

        timer.enter("b");
        timer.enter("dup");
        timer.add_count("marker", 1);
        timer.exit("dup");
        timer.exit("b");
        timer.enter("a");
        timer.enter("x");
        timer.enter("dup");
        timer.add_count("marker", 2);
        timer.exit("dup");
        timer.exit("x");
        timer.exit("a");

        // "a" sorts first, so its deeper "dup" is found before the one under "b".
        assert_eq!(timer.region("marker").unwrap().count(), 2);
        assert_eq!(timer.region("total").unwrap().name(), "total");
        assert!(timer.region("missing").is_none());
    }

    #[test]
    fn json_and_text_counts_agree() {
        let (mut timer, _) = create_test_timer();

        for _ in 0..3 {
            timer.enter("outer");
            timer.enter("inner");
            timer.exit("inner");
            timer.exit("outer");
        }
        timer.add_count("extra", 7);

        let report = timer.report();
        let json: serde_json::Value = serde_json::from_str(&report.to_json()).unwrap();
        let text = report.to_string();

        let text_count = |name: &str| -> u64 {
            text.lines()
                .find(|line| line.trim_start().starts_with(&format!("{name}:")))
                .and_then(|line| line.split_whitespace().last())
                .and_then(|count| count.parse().ok())
                .unwrap()
        };

        assert_eq!(json["count"], text_count("total"));
        assert_eq!(json["subRegions"][0]["name"], "extra");
        assert_eq!(json["subRegions"][0]["count"], text_count("extra"));
        assert_eq!(json["subRegions"][1]["name"], "outer");
        assert_eq!(json["subRegions"][1]["count"], text_count("outer"));
        assert_eq!(
            json["subRegions"][1]["subRegions"][0]["count"],
            text_count("inner")
        );
        assert_eq!(text_count("inner"), 3);
    }

    #[test]
    fn write_report_renders_text_table() {
        let (mut timer, _) = create_test_timer();
        timer.enter("load");
        timer.exit("load");

        let mut output = Vec::new();
        Timer::write_report(&mut timer, &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();

        assert!(text.lines().any(|line| line.starts_with("total:")));
        assert!(text.lines().any(|line| line.starts_with("  load:")));
    }

    #[test]
    fn custom_top_level_name() {
        let timer = RegionTimer::builder()
            .platform(PlatformFacade::fake(FakePlatform::new()))
            .name("worker-7")
            .build();

        assert_eq!(timer.name(), "worker-7");
        assert_eq!(timer.current(), "worker-7");
    }

    static_assertions::assert_impl_all!(RegionTimer: Send);
}
