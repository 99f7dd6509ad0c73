use postgres::{Client, NoTls};
use search_core::{DocId, RecordLocation};

use crate::error::MetadataError;

/// Where a document's archive record lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentLocation {
    pub file_path: String,
    pub location: RecordLocation,
}

/// The slice of the document table the indexer touches. Each call is its own
/// transaction.
pub trait MetadataStore {
    fn locate(&mut self, doc_id: DocId) -> Result<DocumentLocation, MetadataError>;
    fn set_doc_length(&mut self, doc_id: DocId, doc_length: usize) -> Result<(), MetadataError>;
}

pub struct PgMetadataStore {
    client: Client,
}

impl PgMetadataStore {
    pub fn connect(conn_str: &str) -> Result<Self, MetadataError> {
        let client = Client::connect(conn_str, NoTls)?;
        Ok(Self { client })
    }
}

impl MetadataStore for PgMetadataStore {
    fn locate(&mut self, doc_id: DocId) -> Result<DocumentLocation, MetadataError> {
        let row = self
            .client
            .query_opt(
                "SELECT file_path::text, \"offset\"::bigint, length::bigint FROM documents WHERE id = $1::bigint",
                &[&doc_id],
            )?
            .ok_or(MetadataError::NotFound(doc_id))?;
        let file_path: String = row.try_get(0)?;
        let offset: i64 = row.try_get(1)?;
        let length: i64 = row.try_get(2)?;
        let offset = u64::try_from(offset)
            .map_err(|_| MetadataError::Store(format!("negative offset {offset} for document {doc_id}")))?;
        let length = u64::try_from(length)
            .map_err(|_| MetadataError::Store(format!("negative length {length} for document {doc_id}")))?;
        Ok(DocumentLocation { file_path, location: RecordLocation { offset, length } })
    }

    fn set_doc_length(&mut self, doc_id: DocId, doc_length: usize) -> Result<(), MetadataError> {
        let doc_length = i64::try_from(doc_length)
            .map_err(|_| MetadataError::Store(format!("doc length {doc_length} out of range")))?;
        let updated = self.client.execute(
            "UPDATE documents SET doc_length = $1::bigint WHERE id = $2::bigint",
            &[&doc_length, &doc_id],
        )?;
        if updated == 0 {
            return Err(MetadataError::NotFound(doc_id));
        }
        Ok(())
    }
}
