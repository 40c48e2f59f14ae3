use crate::config::ConfigError;
use thiserror::Error;

/// Every way an operation can be rejected or fail.
///
/// The first seven variants are business rejections: the operation was
/// refused and nothing was written. The rest are infrastructure failures.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),
    #[error("invalid currency: {0}")]
    InvalidCurrency(String),
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("unclaimable: {0}")]
    Unclaimable(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Internal error: {0}")]
    Internal(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl LedgerError {
    /// True for rejections caused by the request rather than the environment.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized(_)
                | Self::NotFound(_)
                | Self::AlreadyExists(_)
                | Self::PreconditionFailed(_)
                | Self::InvalidCurrency(_)
                | Self::InsufficientFunds(_)
                | Self::Unclaimable(_)
        )
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for LedgerError {
    fn from(err: rocksdb::Error) -> Self {
        Self::Internal(Box::new(err))
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
