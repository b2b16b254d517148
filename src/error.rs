//! Error taxonomy for the posting-store, the storage layer and the engine
//! facade. Mirrors the input/capacity/I-O/state split in the design doc:
//! each layer wraps the one below it with `#[from]` rather than re-stating
//! its variants.

use std::path::PathBuf;

/// Errors raised by a [`crate::posting_store::PostingStore`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("key {0:?} exceeds the configured key_size")]
    KeyTooLong(Vec<u8>),

    #[error("payload of {len} bytes exceeds node_size_payload ({max})")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("no free bucket slot for key {0:?} after probing every row")]
    BucketFull(Vec<u8>),

    #[error("operation requires key {0:?} to already exist")]
    KeyMissing(Vec<u8>),

    #[error("corrupt posting-store file: {0}")]
    Corrupt(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by a [`crate::storage::Storage`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("url already mapped to a document")]
    DuplicateUrl,

    #[error("rank exhausted: no free doc-id at or below the proposed rank")]
    RankExhausted,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to (de)serialize a forward record: {0}")]
    Codec(#[from] bincode::Error),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Top-level error returned by [`crate::engine::Engine`] operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("url already indexed")]
    DuplicateUrl,

    #[error("rank exhausted for this document")]
    RankExhausted,

    #[error(transparent)]
    Storage(StorageError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<StorageError> for EngineError {
    /// `DuplicateUrl`/`RankExhausted` are promoted to their own variant so
    /// callers can match on them without reaching into `Storage`; every
    /// other storage failure is passed through unchanged.
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::DuplicateUrl => EngineError::DuplicateUrl,
            StorageError::RankExhausted => EngineError::RankExhausted,
            other => EngineError::Storage(other),
        }
    }
}
