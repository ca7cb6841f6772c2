//! Process-wide instrumentation switches read from the environment.

use std::env;
use std::sync::LazyLock;

/// Environment variable that enables region timing for the process.
pub const TIMING_ENV_VAR: &str = "REGION_TIMER_TIMING";

/// Environment variable that enables execution sampling for the process.
pub const SAMPLING_ENV_VAR: &str = "REGION_TIMER_SAMPLING";

static GLOBAL: LazyLock<Switches> = LazyLock::new(Switches::from_env);

/// Process-wide switches that decide whether instrumentation does any work.
///
/// Both switches are off unless the corresponding environment variable is set to `true`
/// (case-insensitive, surrounding whitespace ignored):
///
/// * [`TIMING_ENV_VAR`] (`REGION_TIMER_TIMING`) enables the global [`TimerRegistry`][1].
///   When off, every thread receives a no-op timer.
/// * [`SAMPLING_ENV_VAR`] (`REGION_TIMER_SAMPLING`) allows
///   [`ExecutionSampler::sample()`][2] to start its background thread.
///
/// The global switches are read once, on first use, and never change afterwards.
///
/// # Example
///
/// ```
/// use region_timer::Switches;
///
/// let switches = Switches::global();
/// if switches.timing() {
///     println!("region timing is enabled");
/// }
/// ```
///
/// [1]: crate::TimerRegistry
/// [2]: crate::ExecutionSampler::sample
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Switches {
    timing: bool,
    sampling: bool,
}

impl Switches {
    /// Creates a set of switches with explicit values.
    #[must_use]
    pub fn new(timing: bool, sampling: bool) -> Self {
        Self { timing, sampling }
    }

    /// The switches of this process, read from the environment on first use.
    #[must_use]
    pub fn global() -> Self {
        *GLOBAL
    }

    /// Reads the switches from the environment right now.
    ///
    /// Prefer [`global()`](Self::global), which reads the environment only once.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            timing: is_enabled(env::var(TIMING_ENV_VAR).ok().as_deref()),
            sampling: is_enabled(env::var(SAMPLING_ENV_VAR).ok().as_deref()),
        }
    }

    /// Whether region timing is enabled.
    #[must_use]
    pub fn timing(&self) -> bool {
        self.timing
    }

    /// Whether execution sampling is enabled.
    #[must_use]
    pub fn sampling(&self) -> bool {
        self.sampling
    }
}

fn is_enabled(value: Option<&str>) -> bool {
    value.is_some_and(|value| value.trim().eq_ignore_ascii_case("true"))
}
