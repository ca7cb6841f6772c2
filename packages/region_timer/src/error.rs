//! Error types for region timing and sampling.

use thiserror::Error;

/// Errors reported by the fallible variants of the instrumentation API.
///
/// The infallible operations (`enter`, `exit`, `change` and friends) never surface these.
/// They log the problem and carry on. An unbalanced exit changes nothing, except that an
/// exit naming the top-level region from inside a nested region closes the nested regions
/// before it is refused.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// An exit named a region that is neither the current region nor one of its ancestors.
    #[error("cannot exit region '{name}': it is not open (innermost open region is '{current}')")]
    RegionNotOpen {
        /// The region name passed to the exit.
        name: String,

        /// The name of the innermost open region at the time of the call.
        current: String,
    },

    /// The operation would move the timer above its top-level region.
    #[error("cannot leave region '{name}': it is the top-level region")]
    AtTopLevel {
        /// The name of the top-level region.
        name: String,
    },

    /// Samples were requested while the background sampling thread was still running.
    #[error("sampler '{name}' is still running, stop it before reading its samples")]
    SamplerRunning {
        /// The name of the sampler.
        name: String,
    },
}

/// A specialized `Result` type for instrumentation operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;
