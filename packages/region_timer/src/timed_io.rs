//! `std::io` adapters that time every operation as a region of a [`ThreadTimer`].

use std::io::{self, Read, Write};

use crate::{ThreadTimer, TimerRegistry};

/// Where an adapter gets the timer for each operation.
#[derive(Debug)]
enum TimerSource {
    /// The timer of whichever thread performs the operation, looked up on every call.
    PerThread(&'static TimerRegistry),

    /// One timer for every operation, regardless of the calling thread.
    Pinned(ThreadTimer),
}

impl TimerSource {
    fn timed<T>(&self, region: &str, op: impl FnOnce() -> T) -> T {
        match self {
            Self::PerThread(registry) => {
                let timer = registry.timer_for_thread();
                let _span = timer.span(region);
                op()
            }
            Self::Pinned(timer) => {
                let _span = timer.span(region);
                op()
            }
        }
    }
}

/// Times every `read` of the wrapped reader as the region `region`.
///
/// The region is a child of whatever region is current when the read happens, so the same
/// reader shows up under different parents depending on where it is used.
///
/// # Example
///
/// ```
/// use std::io::Read;
///
/// use region_timer::{TimedRead, TimerRegistry};
///
/// let registry = TimerRegistry::new(true);
/// let timer = registry.timer_for_thread();
///
/// let mut reader = TimedRead::with_timer(&b"hello"[..], timer.clone(), "read_input");
/// let mut text = String::new();
/// reader.read_to_string(&mut text).unwrap();
///
/// assert_eq!(text, "hello");
/// assert!(timer.region("read_input").unwrap().count() >= 1);
/// ```
#[derive(Debug)]
pub struct TimedRead<R> {
    inner: R,
    source: TimerSource,
    region: String,
}

impl<R: Read> TimedRead<R> {
    /// Wraps `inner`, timing reads with the timer of whichever thread performs them.
    ///
    /// The timer is looked up in [`TimerRegistry::global()`] on every call, so the reader
    /// can move between threads.
    #[must_use]
    pub fn new(inner: R, region: impl Into<String>) -> Self {
        Self::with_registry(inner, TimerRegistry::global(), region)
    }

    /// Wraps `inner`, timing reads with the timer that `registry` holds for whichever
    /// thread performs them.
    #[must_use]
    pub fn with_registry(
        inner: R,
        registry: &'static TimerRegistry,
        region: impl Into<String>,
    ) -> Self {
        Self {
            inner,
            source: TimerSource::PerThread(registry),
            region: region.into(),
        }
    }

    /// Wraps `inner`, timing reads with `timer` no matter which thread performs them.
    #[must_use]
    pub fn with_timer(inner: R, timer: ThreadTimer, region: impl Into<String>) -> Self {
        Self {
            inner,
            source: TimerSource::Pinned(timer),
            region: region.into(),
        }
    }
}

impl<R> TimedRead<R> {
    /// The wrapped reader.
    #[must_use]
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// The wrapped reader.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Unwraps the reader.
    #[must_use]
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for TimedRead<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.source.timed(&self.region, || self.inner.read(buf))
    }
}

/// Times every `write` and `flush` of the wrapped writer as the region `region`.
///
/// # Example
///
/// ```
/// use std::io::Write;
///
/// use region_timer::{TimedWrite, TimerRegistry};
///
/// let registry = TimerRegistry::new(true);
/// let timer = registry.timer_for_thread();
///
/// let mut writer = TimedWrite::with_timer(Vec::new(), timer.clone(), "write_output");
/// writer.write_all(b"hello").unwrap();
/// writer.flush().unwrap();
///
/// assert_eq!(writer.into_inner(), b"hello");
/// assert!(timer.region("write_output").unwrap().count() >= 2);
/// ```
#[derive(Debug)]
pub struct TimedWrite<W> {
    inner: W,
    source: TimerSource,
    region: String,
}

impl<W: Write> TimedWrite<W> {
    /// Wraps `inner`, timing writes with the timer of whichever thread performs them.
    ///
    /// The timer is looked up in [`TimerRegistry::global()`] on every call, so the writer
    /// can move between threads.
    #[must_use]
    pub fn new(inner: W, region: impl Into<String>) -> Self {
        Self::with_registry(inner, TimerRegistry::global(), region)
    }

    /// Wraps `inner`, timing writes with the timer that `registry` holds for whichever
    /// thread performs them.
    #[must_use]
    pub fn with_registry(
        inner: W,
        registry: &'static TimerRegistry,
        region: impl Into<String>,
    ) -> Self {
        Self {
            inner,
            source: TimerSource::PerThread(registry),
            region: region.into(),
        }
    }

    /// Wraps `inner`, timing writes with `timer` no matter which thread performs them.
    #[must_use]
    pub fn with_timer(inner: W, timer: ThreadTimer, region: impl Into<String>) -> Self {
        Self {
            inner,
            source: TimerSource::Pinned(timer),
            region: region.into(),
        }
    }
}

impl<W> TimedWrite<W> {
    /// The wrapped writer.
    #[must_use]
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// The wrapped writer.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    /// Unwraps the writer.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for TimedWrite<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.source.timed(&self.region, || self.inner.write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.source.timed(&self.region, || self.inner.flush())
    }
}
