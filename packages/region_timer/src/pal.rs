//! Platform abstraction layer for wall clock and resource usage sampling.
//!
//! This module provides a platform abstraction that allows switching between
//! the real operating system time sources and fake implementations for testing purposes.

mod abstractions;
mod facade;
#[cfg(test)]
mod fake;
mod real;

pub(crate) use abstractions::{Platform, Usage};
pub(crate) use facade::PlatformFacade;
#[cfg(test)]
pub(crate) use fake::FakePlatform;
