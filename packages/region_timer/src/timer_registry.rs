//! Per-thread timer registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};
use std::thread::{self, ThreadId};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

use crate::{NoopTimer, Region, RegionTimer, Switches, Timer, TimerReport};

/// A timer that can be stored in a [`TimerRegistry`] and shared through [`ThreadTimer`]
/// handles.
pub type SharedTimer = Arc<Mutex<dyn Timer>>;

static GLOBAL: LazyLock<TimerRegistry> =
    LazyLock::new(|| TimerRegistry::new(Switches::global().timing()));

/// Returns the timer of the calling thread from the [global registry][TimerRegistry::global].
///
/// This is the entry point for code that instruments itself:
///
/// ```
/// use region_timer::timer_for_thread;
///
/// fn flush(buffer: &mut Vec<u8>) {
///     let timer = timer_for_thread();
///     let _span = timer.span("flush");
///
///     buffer.clear();
/// }
/// # flush(&mut Vec::new());
/// ```
///
/// Obtain the handle once and keep it, rather than calling this function in a tight loop.
#[must_use]
pub fn timer_for_thread() -> ThreadTimer {
    TimerRegistry::global().timer_for_thread()
}

/// Maps threads to their [`RegionTimer`]s, creating each timer on first use.
///
/// A registry is either enabled or disabled for its whole lifetime. A disabled registry hands
/// out handles to a [`NoopTimer`]: no timer is ever created, no lock is taken and every
/// operation on the handle returns immediately.
///
/// Most code uses the process-wide registry through [`timer_for_thread()`], which is enabled
/// by the [`TIMING_ENV_VAR`][crate::TIMING_ENV_VAR] switch. Independent registries can be
/// created for tests or for subsystems that want their own set of timers.
///
/// # Lifetime of timers
///
/// A thread's timer is created by its first call to
/// [`timer_for_thread()`](Self::timer_for_thread) and stays in the registry until the thread
/// calls [`remove_timer_for_thread()`](Self::remove_timer_for_thread) or the registry is
/// dropped. Threads that finish without removing their timer leave it behind, so its data
/// can still be reported.
///
/// # Example
///
/// ```
/// use region_timer::TimerRegistry;
///
/// let registry = TimerRegistry::new(true);
///
/// let timer = registry.timer_for_thread();
/// timer.enter("work");
/// timer.exit("work");
///
/// let report = timer.report().expect("registry is enabled");
/// assert_eq!(report.root().children().len(), 1);
/// ```
pub struct TimerRegistry {
    enabled: bool,
    timers: Mutex<HashMap<ThreadId, SharedTimer>>,
}

impl TimerRegistry {
    /// Creates an empty registry.
    ///
    /// If `enabled` is false, every thread receives a no-op timer.
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            timers: Mutex::new(HashMap::new()),
        }
    }

    /// Creates an empty registry that is enabled if the timing switch is set in the
    /// environment right now.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(Switches::from_env().timing())
    }

    /// The process-wide registry, enabled according to [`Switches::global()`].
    #[must_use]
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    /// Whether this registry creates real timers.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the timer of the calling thread, creating it if the thread has none.
    ///
    /// New timers are named after the thread, falling back to its `ThreadId` for unnamed
    /// threads. Repeated calls from the same thread return handles to the same timer.
    #[must_use]
    pub fn timer_for_thread(&self) -> ThreadTimer {
        if !self.enabled {
            return ThreadTimer::noop();
        }

        let thread = thread::current();

        let timer = {
            let mut timers = self.timers.lock();

            Arc::clone(timers.entry(thread.id()).or_insert_with(|| {
                let name = thread
                    .name()
                    .map_or_else(|| format!("{:?}", thread.id()), ToString::to_string);

                debug!(thread = %name, "creating region timer for thread");

                Arc::new(Mutex::new(RegionTimer::with_name(name)))
            }))
        };

        ThreadTimer::shared(timer)
    }

    /// Installs `timer` as the timer of the calling thread, returning the timer it replaces.
    ///
    /// A disabled registry ignores the call and returns `None`.
    pub fn set_timer_for_thread(&self, timer: impl Timer + 'static) -> Option<SharedTimer> {
        if !self.enabled {
            return None;
        }

        let timer: SharedTimer = Arc::new(Mutex::new(timer));

        self.timers.lock().insert(thread::current().id(), timer)
    }

    /// Removes the timer of the calling thread from the registry and returns it.
    ///
    /// Returns `None` if the thread has no timer or the registry is disabled. Handles that
    /// were obtained earlier remain valid but are no longer connected to the registry.
    pub fn remove_timer_for_thread(&self) -> Option<SharedTimer> {
        if !self.enabled {
            return None;
        }

        let removed = self.timers.lock().remove(&thread::current().id());

        if removed.is_some() {
            debug!("removed region timer for thread");
        }

        removed
    }

    /// The number of threads that currently have a timer in this registry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.timers.lock().len()
    }

    /// Whether no thread currently has a timer in this registry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timers.lock().is_empty()
    }
}

impl fmt::Debug for TimerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerRegistry")
            .field("enabled", &self.enabled)
            .field("thread_count", &self.len())
            .finish()
    }
}

#[derive(Clone, Debug)]
enum Slot {
    Shared(SharedTimer),
    Noop,
}

/// Handle to the timer of one thread, as returned by a [`TimerRegistry`].
///
/// The handle forwards every operation to either a real timer or a no-op timer. Callers do
/// not need to know which one they hold. Cloning the handle is cheap and the clones refer to
/// the same timer.
///
/// The handle can be sent to other threads, but a timer models the nesting of spans on one
/// thread. Interleaving calls from several threads produces meaningless (though memory-safe)
/// results.
#[derive(Clone, Debug)]
pub struct ThreadTimer {
    slot: Slot,
}

impl ThreadTimer {
    /// A handle to a no-op timer.
    #[must_use]
    pub fn noop() -> Self {
        Self { slot: Slot::Noop }
    }

    /// A handle to an existing shared timer.
    #[must_use]
    pub fn shared(timer: SharedTimer) -> Self {
        Self {
            slot: Slot::Shared(timer),
        }
    }

    /// Whether the handle refers to a real timer rather than a no-op timer.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        matches!(self.slot, Slot::Shared(_))
    }

    /// Whether two handles refer to the same timer.
    ///
    /// All no-op handles are considered the same timer.
    #[must_use]
    pub fn same_timer(a: &Self, b: &Self) -> bool {
        match (&a.slot, &b.slot) {
            (Slot::Shared(a), Slot::Shared(b)) => Arc::ptr_eq(a, b),
            (Slot::Noop, Slot::Noop) => true,
            _ => false,
        }
    }

    /// Calls `f` with exclusive access to the timer behind the handle.
    pub fn with<R>(&self, f: impl FnOnce(&mut dyn Timer) -> R) -> R {
        match &self.slot {
            Slot::Shared(timer) => f(&mut *timer.lock()),
            Slot::Noop => f(&mut NoopTimer),
        }
    }

    /// Opens a span of the child region `name` under the current region.
    pub fn enter(&self, name: &str) {
        self.with(|timer| timer.enter(name));
    }

    /// Closes the span of region `name`. See [`RegionTimer::exit()`].
    pub fn exit(&self, name: &str) {
        self.with(|timer| timer.exit(name));
    }

    /// Closes the current region and opens its sibling `name`.
    pub fn change(&self, name: &str) {
        self.with(|timer| timer.change(name));
    }

    /// Adds externally measured wall clock time to the child region `name`.
    pub fn add_wall_time(&self, name: &str, time: Duration) {
        self.with(|timer| timer.add_wall_time(name, time));
    }

    /// Adds externally measured processor time to the child region `name`.
    pub fn add_processor_time(&self, name: &str, time: Duration) {
        self.with(|timer| timer.add_processor_time(name, time));
    }

    /// Adds to the entry count of the child region `name`.
    pub fn add_count(&self, name: &str, count: u64) {
        self.with(|timer| timer.add_count(name, count));
    }

    /// Adds block input operations to the child region `name`.
    pub fn add_read_blocks(&self, name: &str, blocks: u64) {
        self.with(|timer| timer.add_read_blocks(name, blocks));
    }

    /// Adds block output operations to the child region `name`.
    pub fn add_write_blocks(&self, name: &str, blocks: u64) {
        self.with(|timer| timer.add_write_blocks(name, blocks));
    }

    /// Returns a snapshot of the first region called `name`.
    #[must_use]
    pub fn region(&self, name: &str) -> Option<Region> {
        self.with(|timer| timer.region(name))
    }

    /// Returns a snapshot of the whole tree, or `None` for a no-op timer.
    #[must_use]
    pub fn report(&self) -> Option<TimerReport> {
        self.with(|timer| timer.report())
    }

    /// Renders the region tree as JSON, or an empty string for a no-op timer.
    #[must_use]
    pub fn to_json(&self) -> String {
        self.with(|timer| timer.to_json())
    }

    /// Prints the region tree as a text table to stdout. Prints nothing for a no-op timer.
    #[cfg_attr(test, mutants::skip)] // Too difficult to test stdout output reliably - manually tested.
    pub fn print_to_stdout(&self) {
        self.with(|timer| timer.print_to_stdout());
    }

    /// Enters region `name` and returns a guard that exits it when dropped.
    ///
    /// The region is exited on every path out of the enclosing scope, including early
    /// returns and panics.
    ///
    /// # Example
    ///
    /// ```
    /// use region_timer::TimerRegistry;
    ///
    /// let registry = TimerRegistry::new(true);
    /// let timer = registry.timer_for_thread();
    ///
    /// {
    ///     let _span = timer.span("compress");
    ///     // Compress something.
    /// }
    ///
    /// assert_eq!(timer.region("compress").unwrap().count(), 1);
    /// ```
    pub fn span<'a>(&'a self, name: &'a str) -> RegionSpan<'a> {
        self.enter(name);

        RegionSpan { timer: self, name }
    }
}

/// Exits a region of a [`ThreadTimer`] when dropped.
///
/// Created by [`ThreadTimer::span()`].
#[derive(Debug)]
#[must_use = "the region is exited as soon as the span is dropped"]
pub struct RegionSpan<'a> {
    timer: &'a ThreadTimer,
    name: &'a str,
}

impl Drop for RegionSpan<'_> {
    fn drop(&mut self) {
        self.timer.exit(self.name);
    }
}
