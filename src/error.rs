// Typed error kinds shared across the pipeline, store, and decoders.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed traffic payload. The offending item is skipped and
    /// proxying of unrelated traffic continues.
    #[error("parse failure: {0}")]
    ParseFailure(String),

    /// Lookup miss in the tracking map or cache store. Never fatal.
    #[error("not found: {0}")]
    NotFound(String),

    /// Derived-format resolution failed. The raw asset remains cached.
    #[error("conversion failure: {0}")]
    ConversionFailure(String),

    /// Binary payload fails structural validation; the source asset is
    /// cached but unpreviewable.
    #[error("malformed asset: {0}")]
    MalformedAsset(String),

    /// Disk write or rename failed. The index stays in its last
    /// known-good state because the rename is atomic.
    #[error("storage failure: {0}")]
    StorageFailure(#[from] std::io::Error),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
