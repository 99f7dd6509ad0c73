pub mod archive;
pub mod extract;
pub mod gzip;
pub mod store;
pub mod tokenizer;
pub mod warc;

pub use archive::{ArchiveWriter, RecordLocation};
pub use extract::Extracted;
pub use store::{PostingList, PostingStore};
pub use warc::{ArchiveError, ArchiveRecord};

/// Document identifier as assigned by the metadata store.
pub type DocId = i64;
