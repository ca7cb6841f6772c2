//! Histogram reports produced by an execution sampler.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// The call-site histogram collected by an [`ExecutionSampler`][crate::ExecutionSampler].
///
/// Entries are sorted by descending count. Entries with the same count are sorted by label.
///
/// The `Display` implementation renders the report as text:
///
/// ```text
/// samples for compaction
///   execution time 1520 ms
/// Compactor.merge: 120
/// Block.checksum: 31
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SampleReport {
    name: String,
    elapsed: Duration,
    entries: Vec<(String, u64)>,
}

impl SampleReport {
    pub(crate) fn new(name: &str, elapsed: Duration, samples: &HashMap<String, u64>) -> Self {
        let mut entries: Vec<_> = samples
            .iter()
            .map(|(label, count)| (label.clone(), *count))
            .collect();

        entries.sort_by(|(a_label, a_count), (b_label, b_count)| {
            b_count.cmp(a_count).then_with(|| a_label.cmp(b_label))
        });

        Self {
            name: name.to_string(),
            elapsed,
            entries,
        }
    }

    /// The name of the sampler that produced the report.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wall clock time between starting and stopping the sampler.
    ///
    /// Zero if the sampler was never started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Call-site labels and their sample counts, most frequent first.
    #[must_use]
    pub fn entries(&self) -> &[(String, u64)] {
        &self.entries
    }

    /// The number of samples taken for `label`, zero if it was never observed.
    #[must_use]
    pub fn count(&self, label: &str) -> u64 {
        self.entries
            .iter()
            .find(|(candidate, _)| candidate == label)
            .map_or(0, |(_, count)| *count)
    }

    /// The number of samples over all labels.
    #[must_use]
    pub fn total_samples(&self) -> u64 {
        self.entries
            .iter()
            .fold(0_u64, |total, (_, count)| total.saturating_add(*count))
    }

    /// Prints the report to stdout.
    #[cfg_attr(test, mutants::skip)] // Too difficult to test stdout output reliably - manually tested.
    pub fn print_to_stdout(&self) {
        print!("{self}");
    }
}

impl fmt::Display for SampleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "samples for {}", self.name)?;
        writeln!(f, "  execution time {} ms", self.elapsed.as_millis())?;

        for (label, count) in &self.entries {
            writeln!(f, "{label}: {count}")?;
        }

        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn samples(entries: &[(&str, u64)]) -> HashMap<String, u64> {
        entries
            .iter()
            .map(|(label, count)| ((*label).to_string(), *count))
            .collect()
    }

    #[test]
    fn entries_sorted_by_descending_count_then_label() {
        let report = SampleReport::new(
            "scan",
            Duration::from_millis(50),
            &samples(&[("B.b", 3), ("A.a", 3), ("C.c", 10), ("D.d", 1)]),
        );

        let labels: Vec<_> = report.entries().iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(labels, ["C.c", "A.a", "B.b", "D.d"]);
        assert_eq!(report.total_samples(), 17);
        assert_eq!(report.count("A.a"), 3);
        assert_eq!(report.count("missing"), 0);
    }

    #[test]
    fn text_format() {
        let report = SampleReport::new(
            "compaction",
            Duration::from_micros(1_520_700),
            &samples(&[("Compactor.merge", 120), ("Block.checksum", 31)]),
        );

        assert_eq!(
            report.to_string(),
            "samples for compaction\n  execution time 1520 ms\nCompactor.merge: 120\nBlock.checksum: 31\n"
        );
    }

    #[test]
    fn empty_report() {
        let report = SampleReport::new("idle", Duration::ZERO, &HashMap::new());

        assert_eq!(report.name(), "idle");
        assert_eq!(report.elapsed(), Duration::ZERO);
        assert!(report.entries().is_empty());
        assert_eq!(report.total_samples(), 0);
        assert_eq!(report.to_string(), "samples for idle\n  execution time 0 ms\n");
    }
}
