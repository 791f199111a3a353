//! Errors raised while configuring and starting the core.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A configuration value is out of range or inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A host bridge the core cannot run without was not supplied.
    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Logging error: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, Error>;
