use search_core::extract::ExtractError;
use search_core::store::IndexError;
use search_core::{ArchiveError, DocId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("DB_PASS environment variable is required when DB_CONN_STR is not set")]
    MissingPassword,
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue connection error: {0}")]
    Connection(String),
    /// The queue will never yield another item.
    #[error("queue closed")]
    Closed,
}

impl From<redis::RedisError> for QueueError {
    fn from(e: redis::RedisError) -> Self {
        QueueError::Connection(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("no document with id {0}")]
    NotFound(DocId),
    #[error("metadata store error: {0}")]
    Store(String),
}

impl From<postgres::Error> for MetadataError {
    fn from(e: postgres::Error) -> Self {
        MetadataError::Store(e.to_string())
    }
}

/// Why one queue item was not indexed. None of these stop the worker loop.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("malformed queue payload: {0}")]
    MalformedQueuePayload(String),
    #[error("metadata not found for document {0}")]
    MetadataNotFound(DocId),
    #[error("metadata store error: {0}")]
    MetadataStore(String),
    #[error("archive read error: {0}")]
    ArchiveRead(String),
    #[error("decompression error: {0}")]
    Decompression(String),
    #[error("malformed record: {0}")]
    MalformedRecord(String),
    #[error("compressed record of {0} bytes is too large")]
    InputTooLarge(u64),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("index update failed: {0}")]
    Index(String),
}

impl From<MetadataError> for ItemError {
    fn from(e: MetadataError) -> Self {
        match e {
            MetadataError::NotFound(id) => ItemError::MetadataNotFound(id),
            MetadataError::Store(msg) => ItemError::MetadataStore(msg),
        }
    }
}

impl From<ArchiveError> for ItemError {
    fn from(e: ArchiveError) -> Self {
        match e {
            ArchiveError::InputTooLarge(n) => ItemError::InputTooLarge(n),
            ArchiveError::Decompression(msg) => ItemError::Decompression(msg),
            ArchiveError::MalformedRecord(msg) => ItemError::MalformedRecord(msg),
            ArchiveError::Read(msg) => ItemError::ArchiveRead(msg),
            ArchiveError::Io(e) => ItemError::ArchiveRead(e.to_string()),
        }
    }
}

impl From<ExtractError> for ItemError {
    fn from(e: ExtractError) -> Self {
        ItemError::Parse(e.to_string())
    }
}

impl From<IndexError> for ItemError {
    fn from(e: IndexError) -> Self {
        ItemError::Index(e.to_string())
    }
}

/// Fatal errors raised before the worker loop starts.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("could not connect to {service} after {attempts} attempts: {last}")]
    Connection { service: &'static str, attempts: u32, last: String },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("could not open index: {0}")]
    Index(#[from] IndexError),
}
