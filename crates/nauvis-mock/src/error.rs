//! Error types for the mock emitter binary.
//!
//! [`MockError`] is the top-level error type that wraps all possible
//! failure modes during startup and emission.

/// Top-level error for the mock emitter binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum MockError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: nauvis_core::config::ConfigError,
    },

    /// No random source could be initialized.
    #[error("random source error: {source}")]
    Random {
        /// The underlying random source error.
        #[from]
        source: nauvis_core::random::RandomError,
    },

    /// The output could not be resolved or opened.
    #[error("transport error: {source}")]
    Transport {
        /// The underlying transport error.
        #[from]
        source: nauvis_core::transport::TransportError,
    },

    /// The emission loop failed.
    #[error("emitter error: {source}")]
    Emit {
        /// The underlying emitter error.
        #[from]
        source: nauvis_core::emitter::EmitError,
    },
}
