//! The indexing loop.
//!
//! Each queue item runs through
//! `Dequeued -> MetadataResolved -> RecordRead -> Decoded -> Parsed ->
//! Tokenized -> IndexUpdated -> MetadataWritten -> Done`; a failure at any
//! step ends that item only and the loop moves on. Items are never requeued.

use search_core::extract::extract_html;
use search_core::tokenizer::tokenize;
use search_core::{archive, warc, DocId, PostingStore};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use crate::config::resolve_archive_path;
use crate::error::{ItemError, QueueError};
use crate::metadata::MetadataStore;
use crate::queue::{parse_doc_id, WorkQueue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Dequeued,
    MetadataResolved,
    RecordRead,
    Decoded,
    Parsed,
    Tokenized,
    IndexUpdated,
    MetadataWritten,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Dequeued => "dequeued",
            Stage::MetadataResolved => "metadata_resolved",
            Stage::RecordRead => "record_read",
            Stage::Decoded => "decoded",
            Stage::Parsed => "parsed",
            Stage::Tokenized => "tokenized",
            Stage::IndexUpdated => "index_updated",
            Stage::MetadataWritten => "metadata_written",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedDocument {
    pub doc_id: DocId,
    pub url: String,
    pub title: String,
    /// Total token count, duplicates included.
    pub doc_length: usize,
    pub unique_tokens: usize,
    /// Posting lists that gained this document.
    pub new_postings: usize,
}

#[derive(Debug)]
pub enum ProcessOutcome {
    Done(IndexedDocument),
    /// The payload never named a document.
    Skipped(ItemError),
    /// `stage` is the last step that completed.
    Failed { doc_id: DocId, stage: Stage, error: ItemError },
}

impl ProcessOutcome {
    pub fn stage(&self) -> Stage {
        match self {
            ProcessOutcome::Done(_) => Stage::Done,
            ProcessOutcome::Skipped(_) => Stage::Dequeued,
            ProcessOutcome::Failed { stage, .. } => *stage,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub done: u64,
    pub skipped: u64,
    pub failed: u64,
}

pub struct Worker<Q, M> {
    queue: Q,
    metadata: M,
    index: PostingStore,
    archive_base: PathBuf,
    stats: WorkerStats,
}

impl<Q: WorkQueue, M: MetadataStore> Worker<Q, M> {
    pub fn new(queue: Q, metadata: M, index: PostingStore, archive_base: impl Into<PathBuf>) -> Self {
        Self { queue, metadata, index, archive_base: archive_base.into(), stats: WorkerStats::default() }
    }

    pub fn stats(&self) -> WorkerStats { self.stats }

    pub fn index(&self) -> &PostingStore { &self.index }

    pub fn metadata(&self) -> &M { &self.metadata }

    /// Process queue items until the queue closes or fails. Per-item errors
    /// never end the loop.
    pub fn run(&mut self) -> Result<WorkerStats, QueueError> {
        loop {
            match self.queue.pop() {
                Ok(Some(payload)) => {
                    let outcome = self.process_payload(&payload);
                    self.record(&outcome);
                }
                Ok(None) => continue,
                Err(QueueError::Closed) => {
                    let stats = self.stats();
                    tracing::info!(done = stats.done, skipped = stats.skipped, failed = stats.failed, "queue closed, stopping");
                    if let Err(e) = self.index.flush() {
                        tracing::warn!(error = %e, "index flush on shutdown failed");
                    }
                    return Ok(stats);
                }
                Err(e) => {
                    tracing::error!(error = %e, "queue unavailable, stopping worker");
                    return Err(e);
                }
            }
        }
    }

    pub fn process_payload(&mut self, payload: &[u8]) -> ProcessOutcome {
        match parse_doc_id(payload) {
            Ok(doc_id) => self.process_document(doc_id),
            Err(e) => ProcessOutcome::Skipped(e),
        }
    }

    pub fn process_document(&mut self, doc_id: DocId) -> ProcessOutcome {
        let mut stage = Stage::Dequeued;
        match self.index_document(doc_id, &mut stage) {
            Ok(doc) => ProcessOutcome::Done(doc),
            Err(error) => ProcessOutcome::Failed { doc_id, stage, error },
        }
    }

    fn index_document(&mut self, doc_id: DocId, stage: &mut Stage) -> Result<IndexedDocument, ItemError> {
        tracing::debug!(doc_id, "indexing document");

        let located = self.metadata.locate(doc_id)?;
        *stage = Stage::MetadataResolved;

        let path = resolve_archive_path(&self.archive_base, &located.file_path);
        let bytes = archive::read_record_bytes(&path, located.location)?;
        *stage = Stage::RecordRead;

        let record = warc::decode(&bytes)?;
        *stage = Stage::Decoded;

        let html = String::from_utf8_lossy(&record.content);
        let extracted = extract_html(&html)?;
        *stage = Stage::Parsed;

        let tokens = tokenize(&extracted.text);
        *stage = Stage::Tokenized;

        // Boolean index: one posting per document per token.
        let unique: BTreeSet<&str> = tokens.iter().map(String::as_str).collect();
        let id = doc_id.to_string();
        let mut new_postings = 0;
        for token in &unique {
            if self.index.add_document(token, &id)? {
                new_postings += 1;
            }
        }
        *stage = Stage::IndexUpdated;

        self.metadata.set_doc_length(doc_id, tokens.len())?;
        *stage = Stage::MetadataWritten;

        Ok(IndexedDocument {
            doc_id,
            url: record.target_uri,
            title: extracted.title,
            doc_length: tokens.len(),
            unique_tokens: unique.len(),
            new_postings,
        })
    }

    fn record(&mut self, outcome: &ProcessOutcome) {
        match outcome {
            ProcessOutcome::Done(doc) => {
                self.stats.done += 1;
                tracing::info!(doc_id = doc.doc_id, url = %doc.url, tokens = doc.doc_length, unique = doc.unique_tokens, "indexed document");
            }
            ProcessOutcome::Skipped(error) => {
                self.stats.skipped += 1;
                tracing::warn!(%error, skipped = self.stats.skipped, "dropping queue item");
            }
            ProcessOutcome::Failed { doc_id, stage, error } => {
                self.stats.failed += 1;
                tracing::error!(doc_id, %stage, %error, failed = self.stats.failed, "error indexing document");
            }
        }
    }
}
