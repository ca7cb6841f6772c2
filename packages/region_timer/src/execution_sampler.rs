//! Statistical profiling of one thread through its call stack.

use std::collections::HashMap;
use std::panic;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::Result;
use crate::sampler_builder::DEFAULT_INTERVAL;
use crate::{Error, SampleReport, SampledThread, SamplerBuilder, Switches};

/// Lifecycle of an [`ExecutionSampler`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum SamplerState {
    /// Constructed but not sampling. Disabled samplers stay in this state.
    Created,

    /// The background thread is taking samples.
    Running,

    /// The background thread has exited and the samples can be read.
    Stopped,
}

/// Periodically records the innermost [`call_stack`][crate::call_stack] frame of a target
/// thread on a background thread, building a histogram of where the target spends its time.
///
/// Only frames pushed with [`call_stack::frame()`][crate::call_stack::frame] are visible to
/// the sampler. Samples taken while the target has no frames are not counted.
///
/// The sample counts belong to the background thread until [`stop()`](Self::stop) joins it,
/// so [`dump_samples()`](Self::dump_samples) fails while the sampler is running.
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use region_timer::{ExecutionSampler, call_stack};
///
/// fn busy_work() -> u64 {
///     let _frame = call_stack::frame("Example", "busy_work");
///     (0..100_000_u64).fold(0, |acc, x| acc.wrapping_add(x * x))
/// }
///
/// // Starts only if sampling is switched on for the process.
/// let mut sampler = ExecutionSampler::sample("example", Duration::from_millis(1));
///
/// for _ in 0..10 {
///     std::hint::black_box(busy_work());
/// }
///
/// sampler.stop();
/// println!("{}", sampler.dump_samples().unwrap());
/// ```
#[derive(Debug)]
pub struct ExecutionSampler {
    name: String,
    interval: Duration,
    target: SampledThread,
    enabled: bool,

    state: SamplerState,
    stop_requested: Arc<AtomicBool>,
    worker: Option<JoinHandle<HashMap<String, u64>>>,
    samples: HashMap<String, u64>,

    started_at: Option<Instant>,
    elapsed: Duration,
}

impl ExecutionSampler {
    /// Creates a sampler for the calling thread and starts it if sampling is switched on for
    /// the process (see [`Switches`]).
    ///
    /// The sampler is returned either way. A sampler that did not start reports no samples.
    #[must_use]
    pub fn sample(name: impl Into<String>, interval: Duration) -> Self {
        let mut sampler = Self::new_inner(
            name.into(),
            interval,
            SampledThread::current(),
            Switches::global().sampling(),
        );
        sampler.start();
        sampler
    }

    /// Like [`sample()`](Self::sample) with an interval of 10 milliseconds.
    #[must_use]
    pub fn sample_default(name: impl Into<String>) -> Self {
        Self::sample(name, DEFAULT_INTERVAL)
    }

    /// Creates a builder for configuring a sampler.
    #[must_use]
    pub fn builder() -> SamplerBuilder {
        SamplerBuilder::new()
    }

    pub(crate) fn new_inner(
        name: String,
        interval: Duration,
        target: SampledThread,
        enabled: bool,
    ) -> Self {
        Self {
            name,
            interval,
            target,
            enabled,
            state: SamplerState::Created,
            stop_requested: Arc::new(AtomicBool::new(false)),
            worker: None,
            samples: HashMap::new(),
            started_at: None,
            elapsed: Duration::ZERO,
        }
    }

    /// The name that appears in the sample report.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The time between two samples.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// The thread being observed.
    #[must_use]
    pub fn target(&self) -> &SampledThread {
        &self.target
    }

    /// Whether the sampler is allowed to start.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The lifecycle state of the sampler.
    #[must_use]
    pub fn state(&self) -> SamplerState {
        self.state
    }

    /// Starts the background thread.
    ///
    /// Does nothing if the sampler is disabled or has already been started. A stopped sampler
    /// cannot be restarted.
    pub fn start(&mut self) {
        if !self.enabled || self.state != SamplerState::Created {
            return;
        }

        let target = self.target.clone();
        let interval = self.interval;
        let stop_requested = Arc::clone(&self.stop_requested);
        let name = self.name.clone();

        let worker = thread::Builder::new()
            .name(format!("sampler-{}", self.name))
            .spawn(move || {
                debug!(sampler = %name, target = target.name(), "sampler thread started");
                let samples = sample_loop(&target, interval, &stop_requested);
                debug!(sampler = %name, labels = samples.len(), "sampler thread exiting");
                samples
            })
            .expect("failed to spawn sampler thread: thread spawning failure is not supported");

        self.started_at = Some(Instant::now());
        self.worker = Some(worker);
        self.state = SamplerState::Running;
    }

    /// Stops the background thread and waits for it to exit.
    ///
    /// Blocks for at most about one sampling interval. Calling this on a sampler that is not
    /// running does nothing.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        // Release pairs with the Acquire load in the sampling loop.
        self.stop_requested.store(true, Ordering::Release);

        match worker.join() {
            Ok(samples) => self.samples = samples,
            Err(payload) => panic::resume_unwind(payload),
        }

        self.elapsed = self
            .started_at
            .map_or(Duration::ZERO, |started_at| started_at.elapsed());
        self.state = SamplerState::Stopped;
    }

    /// Returns the samples collected between start and stop.
    ///
    /// A sampler that was never started returns an empty report with zero elapsed time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SamplerRunning`] if the sampler has not been stopped yet.
    pub fn dump_samples(&self) -> Result<SampleReport> {
        if self.state == SamplerState::Running {
            warn!(sampler = %self.name, "cannot dump samples while the sampler is running");

            return Err(Error::SamplerRunning {
                name: self.name.clone(),
            });
        }

        Ok(SampleReport::new(&self.name, self.elapsed, &self.samples))
    }
}

impl Drop for ExecutionSampler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn sample_loop(
    target: &SampledThread,
    interval: Duration,
    stop_requested: &AtomicBool,
) -> HashMap<String, u64> {
    let mut samples: HashMap<String, u64> = HashMap::new();

    while !stop_requested.load(Ordering::Acquire) {
        if let Some(site) = target.top() {
            let count = samples.entry(site.label()).or_default();
            *count = count.saturating_add(1);
        }

        // Always sleep, even when the target has exited, so an idle sampler does not spin.
        thread::sleep(interval);
    }

    samples
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::call_stack;

    static_assertions::assert_impl_all!(ExecutionSampler: Send);

    #[test]
    fn disabled_sampler_stays_created() {
        let mut sampler = ExecutionSampler::builder()
            .name("off")
            .enabled(false)
            .start();

        sampler.stop();
        assert_eq!(sampler.state(), SamplerState::Created);

        let report = sampler.dump_samples().unwrap();
        assert_eq!(report.elapsed(), Duration::ZERO);
        assert_eq!(report.total_samples(), 0);
    }

    #[test]
    #[cfg_attr(miri, ignore)] // Real threads and sleeps are slow under Miri.
    fn running_sampler_refuses_dump_then_reports_after_stop() {
        let _frame = call_stack::frame("Test", "hot_loop");

        let mut sampler = ExecutionSampler::builder()
            .name("hot")
            .interval(Duration::from_millis(1))
            .enabled(true)
            .start();

        assert_eq!(sampler.state(), SamplerState::Running);
        assert!(matches!(
            sampler.dump_samples(),
            Err(Error::SamplerRunning { .. })
        ));

        thread::sleep(Duration::from_millis(30));

        sampler.stop();
        assert_eq!(sampler.state(), SamplerState::Stopped);

        let report = sampler.dump_samples().unwrap();
        assert!(report.count("Test.hot_loop") > 0);
        assert!(report.elapsed() >= Duration::from_millis(30));

        // Stopping again is harmless and keeps the samples.
        sampler.stop();
        assert_eq!(sampler.dump_samples().unwrap(), report);
    }

    #[test]
    #[cfg_attr(miri, ignore)] // Real threads and sleeps are slow under Miri.
    fn start_is_ignored_after_stop() {
        let mut sampler = ExecutionSampler::builder()
            .interval(Duration::from_millis(1))
            .enabled(true)
            .start();

        sampler.stop();
        sampler.start();

        assert_eq!(sampler.state(), SamplerState::Stopped);
    }

    #[test]
    fn sample_loop_exits_when_stop_already_requested() {
        let stop_requested = AtomicBool::new(true);

        let samples = sample_loop(
            &SampledThread::current(),
            Duration::from_secs(3600),
            &stop_requested,
        );

        assert!(samples.is_empty());
    }
}
