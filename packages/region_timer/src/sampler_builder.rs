//! Builder for execution samplers.

use std::time::Duration;

use crate::{ExecutionSampler, SampledThread, Switches};

/// Interval between samples when none is specified.
pub(crate) const DEFAULT_INTERVAL: Duration = Duration::from_millis(10);

/// Creates instances of [`ExecutionSampler`].
///
/// By default the sampler observes the thread that calls [`build()`](Self::build) or
/// [`start()`](Self::start), samples every 10 milliseconds and is enabled according to
/// [`Switches::global()`]. Use `ExecutionSampler::builder()` to create a new instance of this
/// builder.
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use region_timer::{ExecutionSampler, call_stack};
///
/// let mut sampler = ExecutionSampler::builder()
///     .name("startup")
///     .interval(Duration::from_millis(1))
///     .enabled(true)
///     .start();
///
/// {
///     let _frame = call_stack::frame("Startup", "load_config");
///     std::thread::sleep(Duration::from_millis(20));
/// }
///
/// sampler.stop();
/// sampler.dump_samples().unwrap().print_to_stdout();
/// ```
#[derive(Debug)]
pub struct SamplerBuilder {
    name: String,
    interval: Duration,
    target: Option<SampledThread>,
    enabled: Option<bool>,
}

impl SamplerBuilder {
    pub(crate) fn new() -> Self {
        Self {
            name: String::new(),
            interval: DEFAULT_INTERVAL,
            target: None,
            enabled: None,
        }
    }

    /// Sets the name that appears in the sample report.
    #[must_use]
    pub fn name(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    /// Sets the time between two samples. Defaults to 10 milliseconds.
    #[must_use]
    pub fn interval(self, interval: Duration) -> Self {
        Self { interval, ..self }
    }

    /// Sets the thread to observe. Defaults to the thread that creates the sampler.
    #[must_use]
    pub fn target(self, target: SampledThread) -> Self {
        Self {
            target: Some(target),
            ..self
        }
    }

    /// Whether the sampler may start its background thread.
    ///
    /// Defaults to the sampling switch of [`Switches::global()`]. A disabled sampler never
    /// starts and reports no samples.
    #[must_use]
    pub fn enabled(self, enabled: bool) -> Self {
        Self {
            enabled: Some(enabled),
            ..self
        }
    }

    /// Creates the sampler without starting it.
    #[must_use]
    pub fn build(self) -> ExecutionSampler {
        ExecutionSampler::new_inner(
            self.name,
            self.interval,
            self.target.unwrap_or_else(SampledThread::current),
            self.enabled.unwrap_or_else(|| Switches::global().sampling()),
        )
    }

    /// Creates the sampler and starts it if it is enabled.
    #[must_use]
    pub fn start(self) -> ExecutionSampler {
        let mut sampler = self.build();
        sampler.start();
        sampler
    }
}
