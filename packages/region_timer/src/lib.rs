#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Hierarchical region timing and call stack sampling for instrumenting code in place.
//!
//! This package provides two independent instruments:
//!
//! - [`RegionTimer`] - accumulates wall clock time, processor time, entry counts and block
//!   input/output counters for named regions of code, organized as a tree that mirrors how
//!   the regions nest at runtime.
//! - [`ExecutionSampler`] - periodically observes the [`call_stack`] of a thread from a
//!   background thread and reports how often each frame was on top.
//!
//! The core functionality includes:
//! - [`TimerRegistry`] / [`timer_for_thread()`] - one timer per thread, created on first use
//! - [`ThreadTimer`] - handle to a thread's timer, with [`span()`](ThreadTimer::span) guards
//! - [`Timer`] / [`NoopTimer`] - the timer capability and its inert implementation
//! - [`TimerReport`] - text table and JSON rendering of a region tree
//! - [`TimedRead`] / [`TimedWrite`] - `std::io` adapters that time each operation
//! - [`Switches`] - process-wide switches read from the environment
//!
//! Both instruments are off unless switched on for the process. When timing is off,
//! [`timer_for_thread()`] returns handles to a no-op timer and instrumented code pays for a
//! single branch per call.
//!
//! # Timing regions
//!
//! ```
//! use region_timer::RegionTimer;
//!
//! let mut timer = RegionTimer::new();
//!
//! for _ in 0..3 {
//!     timer.enter("load");
//!     timer.enter("decompress");
//!     timer.exit("decompress");
//!     timer.exit("load");
//! }
//!
//! timer.enter("parse");
//! timer.exit("parse");
//!
//! assert_eq!(timer.region("load").unwrap().count(), 3);
//! assert_eq!(timer.region("decompress").unwrap().count(), 3);
//!
//! // Prints an indented table with CPU, Wall, Rd Blks, Wrt Blks and Count columns.
//! timer.print_to_stdout();
//! ```
//!
//! # Per-thread timers
//!
//! Instrumented code usually does not own its timer. It asks the registry for the timer of
//! the current thread and brackets its work with a span:
//!
//! ```
//! use region_timer::timer_for_thread;
//!
//! fn load_block() {
//!     let timer = timer_for_thread();
//!     let _span = timer.span("load_block");
//!
//!     // Load the block.
//! }
//!
//! load_block();
//!
//! // Empty unless REGION_TIMER_TIMING=true was set for the process.
//! println!("{}", timer_for_thread().to_json());
//! ```
//!
//! # Sampling
//!
//! ```
//! use std::time::Duration;
//!
//! use region_timer::{ExecutionSampler, call_stack};
//!
//! let mut sampler = ExecutionSampler::builder()
//!     .name("scan")
//!     .interval(Duration::from_millis(1))
//!     .enabled(true)
//!     .start();
//!
//! {
//!     let _frame = call_stack::frame("Scanner", "next_row");
//!     std::thread::sleep(Duration::from_millis(10));
//! }
//!
//! sampler.stop();
//!
//! let report = sampler.dump_samples().unwrap();
//! println!("{report}");
//! ```
//!
//! # Threading
//!
//! A [`RegionTimer`] belongs to one thread at a time and has no internal synchronization.
//! The registry keeps each thread's timer behind an uncontended lock so handles can be
//! stored in a shared map. Each [`ExecutionSampler`] runs one background thread.
//!
//! # Logging
//!
//! Problems such as unbalanced exits are reported through `tracing` rather than returned.
//! The `try_*` methods of [`RegionTimer`] return them as [`Error`] instead.

pub mod call_stack;
mod error;
mod execution_sampler;
mod noop_timer;
mod pal;
mod region;
mod region_node;
mod region_timer;
mod region_timer_builder;
mod sample_report;
mod sampler_builder;
mod switches;
mod timed_io;
mod timer;
mod timer_registry;
mod timer_report;

pub use call_stack::{CallSite, CallStack, FrameGuard, SampledThread};
pub use error::Error;
pub use execution_sampler::{ExecutionSampler, SamplerState};
pub use noop_timer::NoopTimer;
pub use region::Region;
pub use region_timer::RegionTimer;
pub use region_timer_builder::{RegionTimerBuilder, UsageScope};
pub use sample_report::SampleReport;
pub use sampler_builder::SamplerBuilder;
pub use switches::{SAMPLING_ENV_VAR, Switches, TIMING_ENV_VAR};
pub use timed_io::{TimedRead, TimedWrite};
pub use timer::Timer;
pub use timer_registry::{RegionSpan, SharedTimer, ThreadTimer, TimerRegistry, timer_for_thread};
pub use timer_report::{RegionReport, TimerReport};
