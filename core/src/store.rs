//! Persistent inverted index: token -> posting list of document ids.
//!
//! Values are the sorted, de-duplicated document ids joined with
//! [`DELIMITER`], e.g. `"12,7,9"` (lexicographic order).

use sled::{CompareAndSwapError, Db, IVec};
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;

pub const DELIMITER: char = ',';

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index store error: {0}")]
    Db(#[from] sled::Error),
    #[error("invalid document id {0:?}")]
    InvalidDocId(String),
    #[error("posting list for {0:?} is not valid UTF-8")]
    CorruptPostings(String),
}

/// The set of documents containing one token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostingList {
    docs: BTreeSet<String>,
}

impl PostingList {
    pub fn parse(raw: &str) -> Self {
        let docs = raw
            .split(DELIMITER)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect();
        Self { docs }
    }

    pub fn encode(&self) -> String {
        let mut out = String::new();
        for (i, id) in self.docs.iter().enumerate() {
            if i > 0 {
                out.push(DELIMITER);
            }
            out.push_str(id);
        }
        out
    }

    /// Returns `false` if the document was already present.
    pub fn insert(&mut self, doc_id: &str) -> bool {
        if self.contains(doc_id) {
            return false;
        }
        self.docs.insert(doc_id.to_string())
    }

    pub fn contains(&self, doc_id: &str) -> bool { self.docs.contains(doc_id) }
    pub fn len(&self) -> usize { self.docs.len() }
    pub fn is_empty(&self) -> bool { self.docs.is_empty() }
    pub fn iter(&self) -> impl Iterator<Item = &str> { self.docs.iter().map(String::as_str) }
}

/// sled-backed posting store. Cloning shares the same underlying tree.
#[derive(Clone)]
pub struct PostingStore {
    db: Db,
}

impl PostingStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, IndexError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    pub fn from_db(db: Db) -> Self { Self { db } }

    /// Add `doc_id` to the posting list of `token`. Returns `true` when the
    /// list changed; a document already present causes no write.
    ///
    /// The read-modify-write is a compare-and-swap loop, so concurrent adds on
    /// the same key through this store never lose an update.
    pub fn add_document(&self, token: &str, doc_id: &str) -> Result<bool, IndexError> {
        if doc_id.is_empty() || doc_id.contains(DELIMITER) {
            return Err(IndexError::InvalidDocId(doc_id.to_string()));
        }
        let key = token.as_bytes();
        let mut current: Option<IVec> = self.db.get(key)?;
        loop {
            let mut list = match &current {
                Some(raw) => decode(token, raw)?,
                None => PostingList::default(),
            };
            if !list.insert(doc_id) {
                return Ok(false);
            }
            let proposed = list.encode().into_bytes();
            match self.db.compare_and_swap(key, current.as_ref(), Some(proposed))? {
                Ok(()) => return Ok(true),
                Err(CompareAndSwapError { current: actual, .. }) => {
                    tracing::debug!(token, doc_id, "posting list changed underneath, retrying");
                    current = actual;
                }
            }
        }
    }

    /// Raw stored bytes for `token`, or `None` if the token was never indexed.
    pub fn get(&self, token: &str) -> Result<Option<Vec<u8>>, IndexError> {
        Ok(self.db.get(token.as_bytes())?.map(|v| v.to_vec()))
    }

    /// Parsed posting list; empty if absent.
    pub fn postings(&self, token: &str) -> Result<PostingList, IndexError> {
        match self.db.get(token.as_bytes())? {
            Some(raw) => decode(token, &raw),
            None => Ok(PostingList::default()),
        }
    }

    pub fn term_count(&self) -> usize { self.db.len() }

    pub fn flush(&self) -> Result<(), IndexError> {
        self.db.flush()?;
        Ok(())
    }
}

fn decode(token: &str, raw: &[u8]) -> Result<PostingList, IndexError> {
    let s = std::str::from_utf8(raw).map_err(|_| IndexError::CorruptPostings(token.to_string()))?;
    Ok(PostingList::parse(s))
}
