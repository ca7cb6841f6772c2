//! Platform facade for switching between real and fake implementations.

use std::time::Duration;

use crate::pal::abstractions::{Platform, Usage};
#[cfg(test)]
use crate::pal::fake::FakePlatform;
use crate::pal::real::RealPlatform;

/// Facade that allows switching between real and fake platform implementations.
#[derive(Clone, Debug)]
pub(crate) enum PlatformFacade {
    /// Real platform implementation using system calls.
    Real(RealPlatform),

    /// Fake platform implementation for testing.
    #[cfg(test)]
    Fake(FakePlatform),
}

impl PlatformFacade {
    /// Creates a new platform facade using the real implementation.
    pub(crate) fn real() -> Self {
        Self::Real(RealPlatform)
    }

    /// Creates a new platform facade using the fake implementation.
    #[cfg(test)]
    pub(crate) fn fake(fake_platform: FakePlatform) -> Self {
        Self::Fake(fake_platform)
    }
}

impl Platform for PlatformFacade {
    fn wall_time(&self) -> Duration {
        match self {
            Self::Real(platform) => platform.wall_time(),
            #[cfg(test)]
            Self::Fake(platform) => platform.wall_time(),
        }
    }

    fn thread_usage(&self) -> Usage {
        match self {
            Self::Real(platform) => platform.thread_usage(),
            #[cfg(test)]
            Self::Fake(platform) => platform.thread_usage(),
        }
    }

    fn process_usage(&self) -> Usage {
        match self {
            Self::Real(platform) => platform.process_usage(),
            #[cfg(test)]
            Self::Fake(platform) => platform.process_usage(),
        }
    }
}
