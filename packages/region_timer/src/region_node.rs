//! Arena nodes that make up the region tree of a [`RegionTimer`][crate::RegionTimer].

use std::cmp::Ordering;
use std::time::Duration;

use crate::Region;
use crate::pal::Usage;

/// Index of a region in the arena of its timer.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub(crate) struct RegionId(usize);

impl RegionId {
    /// The top-level region always occupies the first arena slot.
    pub(crate) const ROOT: Self = Self(0);

    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    pub(crate) fn index(self) -> usize {
        self.0
    }
}

/// Which metrics a timer collects. Fixed when the timer is created.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct TrackedMetrics {
    pub(crate) wall_time: bool,
    pub(crate) processor_time: bool,
    pub(crate) count: bool,
}

/// One reading of every enabled time source, shared by all regions it is applied to.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Sample {
    pub(crate) wall_time: Option<Duration>,
    pub(crate) usage: Option<Usage>,
}

/// Values captured when a region was last opened (or last closed out).
///
/// Only meaningful while the region is on the path from the root to the cursor.
#[derive(Clone, Copy, Debug, Default)]
struct EntryMarks {
    wall_time: Duration,
    usage: Usage,
}

#[derive(Debug)]
pub(crate) struct RegionNode {
    name: String,
    parent: Option<RegionId>,

    // Sorted by region name. The cursor is the index of the most recently used child,
    // which is where the next lookup starts.
    children: Vec<RegionId>,
    cursor: usize,

    wall_time: Duration,
    processor_time: Duration,
    count: u64,
    read_blocks: u64,
    write_blocks: u64,

    marks: EntryMarks,
}

impl RegionNode {
    pub(crate) fn new(name: &str, parent: Option<RegionId>) -> Self {
        Self {
            name: name.to_string(),
            parent,
            children: Vec::new(),
            cursor: 0,
            wall_time: Duration::ZERO,
            processor_time: Duration::ZERO,
            count: 0,
            read_blocks: 0,
            write_blocks: 0,
            marks: EntryMarks::default(),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn parent(&self) -> Option<RegionId> {
        self.parent
    }

    pub(crate) fn children(&self) -> &[RegionId] {
        &self.children
    }

    /// Records the entry marks for a new span of this region.
    pub(crate) fn open(&mut self, sample: &Sample, metrics: TrackedMetrics) {
        if metrics.count {
            self.count = self.count.saturating_add(1);
        }

        if let Some(wall_time) = sample.wall_time {
            self.marks.wall_time = wall_time;
        }

        if let Some(usage) = sample.usage {
            self.marks.usage = usage;
        }
    }

    /// Adds everything since the entry marks to the totals and moves the marks up to `sample`.
    ///
    /// Moving the marks makes it safe to close out a region that stays open, which is how
    /// the top-level region reports its running totals.
    pub(crate) fn close(&mut self, sample: &Sample) {
        if let Some(wall_time) = sample.wall_time {
            self.wall_time = self
                .wall_time
                .saturating_add(wall_time.saturating_sub(self.marks.wall_time));
            self.marks.wall_time = wall_time;
        }

        if let Some(usage) = sample.usage {
            let marks = self.marks.usage;

            self.processor_time = self
                .processor_time
                .saturating_add(usage.processor_time.saturating_sub(marks.processor_time));
            self.read_blocks = self
                .read_blocks
                .saturating_add(usage.read_blocks.saturating_sub(marks.read_blocks));
            self.write_blocks = self
                .write_blocks
                .saturating_add(usage.write_blocks.saturating_sub(marks.write_blocks));

            self.marks.usage = usage;
        }
    }

    pub(crate) fn add_wall_time(&mut self, time: Duration) {
        self.wall_time = self.wall_time.saturating_add(time);
    }

    pub(crate) fn add_processor_time(&mut self, time: Duration) {
        self.processor_time = self.processor_time.saturating_add(time);
    }

    pub(crate) fn add_count(&mut self, count: u64) {
        self.count = self.count.saturating_add(count);
    }

    pub(crate) fn add_read_blocks(&mut self, blocks: u64) {
        self.read_blocks = self.read_blocks.saturating_add(blocks);
    }

    pub(crate) fn add_write_blocks(&mut self, blocks: u64) {
        self.write_blocks = self.write_blocks.saturating_add(blocks);
    }

    pub(crate) fn snapshot(&self) -> Region {
        Region {
            name: self.name.clone(),
            wall_time: self.wall_time,
            processor_time: self.processor_time,
            count: self.count,
            read_blocks: self.read_blocks,
            write_blocks: self.write_blocks,
        }
    }

    /// Finds the child called `name`, starting the search at the cursor.
    ///
    /// Returns `Ok(position)` if the child exists, otherwise `Err(position)` with the
    /// position at which it must be inserted to keep the children sorted.
    ///
    /// Callers typically enter and exit the same few regions in a loop, so starting at the
    /// most recently used child usually finds the target in one comparison. Worst case
    /// (round-robin over many siblings) is a linear walk.
    #[expect(
        clippy::arithmetic_side_effects,
        reason = "positions are bounded by the sibling list length, which is at least 1"
    )]
    pub(crate) fn locate_child(&self, regions: &[RegionNode], name: &str) -> Result<usize, usize> {
        let len = self.children.len();
        if len == 0 {
            return Err(0);
        }

        let name_at = |position: usize| child_name(regions, &self.children, position);

        let mut position = self.cursor.min(len - 1);

        match name_at(position).cmp(name) {
            Ordering::Equal => Ok(position),
            Ordering::Less => {
                position += 1;
                while position < len && name_at(position) < name {
                    position += 1;
                }

                if position < len && name_at(position) == name {
                    Ok(position)
                } else {
                    Err(position)
                }
            }
            Ordering::Greater => {
                while position > 0 && name_at(position - 1) > name {
                    position -= 1;
                }

                if position > 0 && name_at(position - 1) == name {
                    Ok(position - 1)
                } else {
                    Err(position)
                }
            }
        }
    }

    pub(crate) fn insert_child(&mut self, position: usize, child: RegionId) {
        self.children.insert(position, child);
    }

    /// Moves the cursor to `position` and returns the child found there.
    pub(crate) fn select_child(&mut self, position: usize) -> RegionId {
        self.cursor = position;

        *self
            .children
            .get(position)
            .expect("positions come from locate_child or insert_child on this node")
    }
}

fn child_name<'a>(regions: &'a [RegionNode], children: &[RegionId], position: usize) -> &'a str {
    let id = children
        .get(position)
        .expect("position is kept within the sibling list");

    regions
        .get(id.index())
        .expect("child ids always refer to arena slots")
        .name()
}
