//! Detached reports of a region tree.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::Region;
use crate::region_node::TrackedMetrics;

/// Snapshot of the whole region tree of a [`RegionTimer`][crate::RegionTimer].
///
/// The `Display` implementation renders the tree as an indented, column-aligned text
/// table. [`to_json()`](Self::to_json) renders it as nested JSON objects.
///
/// # Examples
///
/// ```
/// use region_timer::RegionTimer;
///
/// let mut timer = RegionTimer::with_name("request");
/// timer.enter("parse");
/// timer.exit("parse");
///
/// let report = timer.report();
/// let names: Vec<_> = report.regions().map(|(_, region)| region.name()).collect();
/// assert_eq!(names, ["request", "parse"]);
///
/// println!("{report}");
/// ```
#[derive(Clone, Debug)]
pub struct TimerReport {
    root: RegionReport,
    metrics: TrackedMetrics,
}

/// One region of a [`TimerReport`] together with its children, in name order.
#[derive(Clone, Debug)]
pub struct RegionReport {
    region: Region,
    children: Vec<RegionReport>,
}

impl RegionReport {
    pub(crate) fn new(region: Region, children: Vec<Self>) -> Self {
        Self { region, children }
    }

    /// The metrics of this region.
    #[must_use]
    pub fn region(&self) -> &Region {
        &self.region
    }

    /// The child regions, sorted by name.
    #[must_use]
    pub fn children(&self) -> &[Self] {
        &self.children
    }

    fn collect_pre_order<'a>(&'a self, depth: usize, into: &mut Vec<(usize, &'a Region)>) {
        into.push((depth, &self.region));

        for child in &self.children {
            child.collect_pre_order(depth.saturating_add(1), into);
        }
    }

    fn to_json_region(&self, metrics: TrackedMetrics) -> JsonRegion<'_> {
        JsonRegion {
            name: &self.region.name,
            count: self.region.count,
            wall: metrics
                .wall_time
                .then(|| self.region.wall_time.as_secs_f64()),
            cpu: metrics
                .processor_time
                .then(|| self.region.processor_time.as_secs_f64()),
            sub_regions: self
                .children
                .iter()
                .map(|child| child.to_json_region(metrics))
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct JsonRegion<'a> {
    name: &'a str,
    count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    wall: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cpu: Option<f64>,
    #[serde(rename = "subRegions", skip_serializing_if = "Vec::is_empty")]
    sub_regions: Vec<JsonRegion<'a>>,
}

impl TimerReport {
    pub(crate) fn new(root: RegionReport, metrics: TrackedMetrics) -> Self {
        Self { root, metrics }
    }

    /// The top-level region and, through it, the whole tree.
    #[must_use]
    pub fn root(&self) -> &RegionReport {
        &self.root
    }

    /// Iterates over all regions in depth-first pre-order, children in name order.
    ///
    /// Each item is the depth of the region (the top-level region has depth 0) and the region.
    pub fn regions(&self) -> impl Iterator<Item = (usize, &Region)> {
        let mut regions = Vec::new();
        self.root.collect_pre_order(0, &mut regions);
        regions.into_iter()
    }

    /// Renders the tree as nested JSON objects.
    ///
    /// Every object has `name` and `count`. `wall` and `cpu` (in seconds) are present when
    /// the timer tracks that metric. `subRegions` is present when the region has children.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.root.to_json_region(self.metrics))
            .expect("a region tree only contains strings and numbers, which always serialize")
    }

    /// Prints the text table to stdout.
    #[cfg_attr(test, mutants::skip)] // Too difficult to test stdout output reliably - manually tested.
    pub fn print_to_stdout(&self) {
        print!("{self}");
    }

    fn columns(&self, rows: &[(usize, &Region)]) -> Vec<Column> {
        let mut columns = Vec::new();

        if self.metrics.processor_time {
            columns.push(Column::new("CPU", rows, |r| seconds(r.processor_time)));
        }

        if self.metrics.wall_time {
            columns.push(Column::new("Wall", rows, |r| seconds(r.wall_time)));
        }

        if self.metrics.processor_time {
            columns.push(Column::new("Rd Blks", rows, |r| r.read_blocks.to_string()));
            columns.push(Column::new("Wrt Blks", rows, |r| r.write_blocks.to_string()));
        }

        if self.metrics.count {
            columns.push(Column::new("Count", rows, |r| r.count.to_string()));
        }

        columns
    }
}

fn seconds(duration: Duration) -> String {
    format!("{:.2}", duration.as_secs_f64())
}

/// One right-aligned column of the text table.
struct Column {
    header: &'static str,
    values: Vec<String>,
    width: usize,
}

impl Column {
    fn new(
        header: &'static str,
        rows: &[(usize, &Region)],
        format_value: impl Fn(&Region) -> String,
    ) -> Self {
        let values: Vec<String> = rows.iter().map(|(_, region)| format_value(region)).collect();

        let width = values
            .iter()
            .map(String::len)
            .chain([header.len()])
            .max()
            .unwrap_or_default();

        Self {
            header,
            values,
            width,
        }
    }
}

/// Width of the indented `name: ` label of one row.
fn label_width(depth: usize, name: &str) -> usize {
    depth
        .saturating_mul(2)
        .saturating_add(name.chars().count())
        .saturating_add(2)
}

impl fmt::Display for TimerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows: Vec<_> = self.regions().collect();
        let columns = self.columns(&rows);

        let max_label_width = rows
            .iter()
            .map(|(depth, region)| label_width(*depth, region.name()))
            .max()
            .unwrap_or_default();

        write!(f, "{:max_label_width$}", "")?;
        for column in &columns {
            write!(f, " {:>width$}", column.header, width = column.width)?;
        }
        writeln!(f)?;

        for (row_index, (depth, region)) in rows.iter().enumerate() {
            let indent = depth.saturating_mul(2);
            let padding = max_label_width.saturating_sub(label_width(*depth, region.name()));

            write!(f, "{:indent$}{}: {:padding$}", "", region.name(), "")?;

            for column in &columns {
                let value = column
                    .values
                    .get(row_index)
                    .expect("every column has one value per row");
                write!(f, " {value:>width$}", width = column.width)?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}
