//! Error type shared by every host bridge.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    /// The host cannot serve this request at all (unsupported locator,
    /// missing permission, no such capability).
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    /// The engine or effect was released and can no longer be driven.
    #[error("Bridge resource already released: {0}")]
    Released(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// True when retrying the same call cannot succeed.
    pub fn is_permanent(&self) -> bool {
        matches!(self, BridgeError::NotAvailable(_) | BridgeError::Released(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
