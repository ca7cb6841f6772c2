//! The timer capability shared by real and no-op timers.

use std::fmt::Debug;
use std::io;
use std::time::Duration;

use crate::{Region, TimerReport};

/// The operations shared by every timer implementation.
///
/// [`RegionTimer`][crate::RegionTimer] is the real implementation.
/// [`NoopTimer`][crate::NoopTimer] accepts the same calls and does nothing, which is what
/// callers get when timing is switched off. Call sites that hold a `dyn Timer` (or a
/// [`ThreadTimer`][crate::ThreadTimer]) do not need to know which one they have.
///
/// None of the operations fail or panic on unbalanced use. Problems are logged and ignored.
pub trait Timer: Debug + Send {
    /// Opens a span of the child region `name` under the current region.
    fn enter(&mut self, name: &str);

    /// Closes the span of region `name`, which should be the current region.
    fn exit(&mut self, name: &str);

    /// Closes the current region and opens its sibling `name`.
    fn change(&mut self, name: &str);

    /// Adds externally measured wall clock time to the child region `name`.
    fn add_wall_time(&mut self, name: &str, time: Duration);

    /// Adds externally measured processor time to the child region `name`.
    fn add_processor_time(&mut self, name: &str, time: Duration);

    /// Adds to the entry count of the child region `name`.
    fn add_count(&mut self, name: &str, count: u64);

    /// Adds block input operations to the child region `name`.
    fn add_read_blocks(&mut self, name: &str, blocks: u64);

    /// Adds block output operations to the child region `name`.
    fn add_write_blocks(&mut self, name: &str, blocks: u64);

    /// Returns a snapshot of the first region called `name`, searching depth-first.
    fn region(&self, name: &str) -> Option<Region>;

    /// Brings the top-level region up to date and returns a snapshot of the whole tree.
    ///
    /// Returns `None` if the timer does not collect anything.
    fn report(&mut self) -> Option<TimerReport>;

    /// Renders the region tree as JSON, or an empty string if the timer collects nothing.
    fn to_json(&mut self) -> String {
        self.report()
            .map_or_else(String::new, |report| report.to_json())
    }

    /// Writes the region tree as a text table. Writes nothing if the timer collects nothing.
    ///
    /// # Errors
    ///
    /// Returns any error reported by `sink`.
    fn write_report(&mut self, sink: &mut dyn io::Write) -> io::Result<()> {
        match self.report() {
            Some(report) => write!(sink, "{report}"),
            None => Ok(()),
        }
    }

    /// Prints the region tree as a text table to stdout.
    #[cfg_attr(test, mutants::skip)] // Too difficult to test stdout output reliably - manually tested.
    fn print_to_stdout(&mut self) {
        if let Some(report) = self.report() {
            report.print_to_stdout();
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::RegionTimer;

    static_assertions::assert_obj_safe!(Timer);

    #[test]
    fn default_rendering_uses_report() {
        let mut timer = RegionTimer::with_name("outer");
        let timer: &mut dyn Timer = &mut timer;

        let mut output = Vec::new();
        timer.write_report(&mut output).unwrap();
        let text = String::from_utf8(output).unwrap();

        assert!(text.lines().nth(1).unwrap().starts_with("outer:"));
        assert!(timer.to_json().starts_with(r#"{"name":"outer""#));
    }
}
