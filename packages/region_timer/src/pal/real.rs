//! Real platform implementation using operating system time sources.

use std::sync::LazyLock;
use std::time::{Duration, Instant};

use cpu_time::{ProcessTime, ThreadTime};

use crate::pal::abstractions::{Platform, Usage};

/// Origin of the monotonic wall clock. Captured on first use.
static WALL_CLOCK_ORIGIN: LazyLock<Instant> = LazyLock::new(Instant::now);

/// Real implementation of the platform abstraction.
///
/// Processor time comes from the `cpu_time` package. Block counters come from
/// `getrusage()` on Unix and are always zero on other platforms.
#[derive(Clone, Debug)]
pub(crate) struct RealPlatform;

impl Platform for RealPlatform {
    fn wall_time(&self) -> Duration {
        WALL_CLOCK_ORIGIN.elapsed()
    }

    fn thread_usage(&self) -> Usage {
        let (read_blocks, write_blocks) = block_counters(BlockScope::Thread);

        Usage {
            processor_time: ThreadTime::now().as_duration(),
            read_blocks,
            write_blocks,
        }
    }

    fn process_usage(&self) -> Usage {
        let (read_blocks, write_blocks) = block_counters(BlockScope::Process);

        Usage {
            processor_time: ProcessTime::now().as_duration(),
            read_blocks,
            write_blocks,
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum BlockScope {
    Thread,
    Process,
}

#[cfg(unix)]
fn block_counters(scope: BlockScope) -> (u64, u64) {
    use std::mem;

    // Per-thread counters are a Linux extension. Elsewhere we fall back to process counters.
    #[cfg(target_os = "linux")]
    let who = match scope {
        BlockScope::Thread => libc::RUSAGE_THREAD,
        BlockScope::Process => libc::RUSAGE_SELF,
    };
    #[cfg(not(target_os = "linux"))]
    let who = {
        _ = scope;
        libc::RUSAGE_SELF
    };

    // SAFETY: All-zero is a valid initial value for this type.
    let mut usage: libc::rusage = unsafe { mem::zeroed() };

    // SAFETY: We are passing valid arguments, no other safety requirements.
    let result = unsafe { libc::getrusage(who, &raw mut usage) };

    if result != 0 {
        return (0, 0);
    }

    (
        u64::try_from(usage.ru_inblock).unwrap_or_default(),
        u64::try_from(usage.ru_oublock).unwrap_or_default(),
    )
}

#[cfg(not(unix))]
fn block_counters(_scope: BlockScope) -> (u64, u64) {
    (0, 0)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::hint::black_box;

    use super::*;

    #[cfg_attr(miri, ignore)] // Miri cannot talk to the real platform.
    #[test]
    fn wall_time_does_not_decrease() {
        let first = RealPlatform.wall_time();
        let second = RealPlatform.wall_time();

        assert!(second >= first);
    }

    #[cfg_attr(miri, ignore)] // Miri cannot talk to the real platform.
    #[test]
    fn thread_processor_time_advances_with_work() {
        let before = RealPlatform.thread_usage();

        let mut sum = 0_u64;
        for i in 0..2_000_000_u64 {
            sum = sum.wrapping_add(black_box(i));
        }
        black_box(sum);

        let after = RealPlatform.thread_usage();

        assert!(after.processor_time >= before.processor_time);
        assert!(after.read_blocks >= before.read_blocks);
        assert!(after.write_blocks >= before.write_blocks);
    }

    #[cfg_attr(miri, ignore)] // Miri cannot talk to the real platform.
    #[test]
    fn process_time_covers_thread_time() {
        let thread = RealPlatform.thread_usage();
        let process = RealPlatform.process_usage();

        assert!(process.processor_time >= thread.processor_time);
    }
}
