//! Per-thread call stacks that code maintains explicitly and the
//! [`ExecutionSampler`][crate::ExecutionSampler] observes from another thread.
//!
//! A thread pushes a frame with [`frame()`] when it enters a function it wants to show up in
//! sample reports. The frame is popped when the returned guard is dropped.
//!
//! ```
//! use region_timer::call_stack;
//!
//! fn checksum(data: &[u8]) -> u32 {
//!     let _frame = call_stack::frame("Block", "checksum");
//!
//!     data.iter().map(|b| u32::from(*b)).sum()
//! }
//!
//! assert_eq!(checksum(&[1, 2, 3]), 6);
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};
use std::thread;

use parking_lot::Mutex;

thread_local! {
    static CURRENT: Arc<CallStack> = Arc::new(CallStack::new());
}

/// One frame of a [`CallStack`]: the type and method that pushed it.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct CallSite {
    declaring_type: &'static str,
    method: &'static str,
}

impl CallSite {
    /// Creates a call site for `method` of `declaring_type`.
    #[must_use]
    pub const fn new(declaring_type: &'static str, method: &'static str) -> Self {
        Self {
            declaring_type,
            method,
        }
    }

    /// The type (or module) that declares the method.
    #[must_use]
    pub fn declaring_type(&self) -> &'static str {
        self.declaring_type
    }

    /// The method name.
    #[must_use]
    pub fn method(&self) -> &'static str {
        self.method
    }

    /// The label under which samples of this call site are counted: `declaring_type.method`.
    #[must_use]
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.declaring_type, self.method)
    }
}

/// The frames pushed by one thread, innermost last.
///
/// Every thread gets its own stack on first use. Other threads read it through a
/// [`SampledThread`].
#[derive(Debug)]
pub struct CallStack {
    frames: Mutex<Vec<CallSite>>,
}

impl CallStack {
    fn new() -> Self {
        Self {
            frames: Mutex::new(Vec::new()),
        }
    }

    /// The innermost frame, if any.
    #[must_use]
    pub fn top(&self) -> Option<CallSite> {
        self.frames.lock().last().copied()
    }

    /// The number of frames on the stack.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.lock().len()
    }

    /// A copy of all frames, outermost first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<CallSite> {
        self.frames.lock().clone()
    }

    /// Pushes `site` and returns the depth it was pushed at.
    fn push(&self, site: CallSite) -> usize {
        let mut frames = self.frames.lock();
        frames.push(site);
        frames.len().saturating_sub(1)
    }

    /// Removes the frame at `depth` and every frame pushed after it.
    fn truncate(&self, depth: usize) {
        self.frames.lock().truncate(depth);
    }
}

/// Pushes a frame for `declaring_type.method` onto the call stack of the current thread.
///
/// The frame stays on the stack until the returned guard is dropped.
pub fn frame(declaring_type: &'static str, method: &'static str) -> FrameGuard {
    let stack = CURRENT.with(Arc::clone);
    let depth = stack.push(CallSite::new(declaring_type, method));

    FrameGuard {
        stack,
        depth,
        _not_send: PhantomData,
    }
}

/// Pops its frame from the call stack of the thread that created it when dropped.
///
/// Frames pushed after this one are popped with it, so dropping guards out of order never
/// leaves a frame on the stack whose guard is gone.
///
/// Created by [`frame()`]. The guard cannot leave the thread that created it.
#[derive(Debug)]
#[must_use = "the frame is popped as soon as the guard is dropped"]
pub struct FrameGuard {
    stack: Arc<CallStack>,
    depth: usize,

    _not_send: PhantomData<*const ()>,
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        self.stack.truncate(self.depth);
    }
}

/// A thread whose call stack can be observed from other threads.
///
/// The observer does not keep the thread's stack alive. Once the thread has exited,
/// [`is_alive()`](Self::is_alive) returns `false` and [`top()`](Self::top) returns `None`.
#[derive(Clone, Debug)]
pub struct SampledThread {
    name: String,
    stack: Weak<CallStack>,
}

impl SampledThread {
    /// The calling thread.
    #[must_use]
    pub fn current() -> Self {
        let thread = thread::current();

        Self {
            name: thread
                .name()
                .map_or_else(|| format!("{:?}", thread.id()), ToString::to_string),
            stack: CURRENT.with(Arc::downgrade),
        }
    }

    /// The name of the thread, or its `ThreadId` debug text if it is unnamed.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the thread still exists.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.stack.strong_count() > 0
    }

    /// The innermost frame of the thread, or `None` if it has no frames or has exited.
    ///
    /// The thread keeps running while it is observed, so the result may already be stale when
    /// it is returned.
    #[must_use]
    pub fn top(&self) -> Option<CallSite> {
        self.stack.upgrade().and_then(|stack| stack.top())
    }
}
