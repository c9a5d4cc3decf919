//! Error types for bucketctl

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // === I/O Errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Network Errors ===
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Operation timeout: {0}")]
    Timeout(String),

    // === Protocol Errors ===
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Bucket not found: {0}")]
    BucketNotFound(String),

    #[error("Daemon rejected request (status 0x{status:04x}): {message}")]
    Daemon { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Protocol(String),

    // === Config Errors ===
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // === Ops Errors ===
    #[error("Provisioning failed after {attempts} attempts: {last}")]
    ProvisioningFailed { attempts: usize, last: String },

    #[error("Activation of vbucket {vbucket} failed: {source}")]
    ActivationFailed { vbucket: u16, source: Box<Error> },

    // === Generic ===
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Is this a retryable error?
    ///
    /// Transient transport failures are worth another attempt. Everything the
    /// daemon answered deliberately (auth rejection, config rejection, missing
    /// bucket) is not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Timeout(_) | Error::ConnectionFailed(_) | Error::Io(_)
        )
    }

    /// Does this error mean the named bucket does not exist on the daemon?
    pub fn is_bucket_missing(&self) -> bool {
        matches!(self, Error::BucketNotFound(_))
    }
}

// Implement From for common error types
impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Other(e.to_string())
    }
}
