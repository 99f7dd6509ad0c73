use search_core::DocId;

use crate::error::{ItemError, QueueError};

/// Source of document ids to index.
pub trait WorkQueue {
    /// Block until an item is available. `Ok(None)` means the wait timed out.
    fn pop(&mut self) -> Result<Option<Vec<u8>>, QueueError>;
}

/// Redis list consumed with `BLPOP`. Popped items are gone whether or not
/// they are indexed successfully.
pub struct RedisQueue {
    conn: redis::Connection,
    name: String,
    timeout_secs: u64,
}

impl RedisQueue {
    pub fn connect(url: &str, name: &str, timeout_secs: u64) -> Result<Self, QueueError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection()?;
        Ok(Self { conn, name: name.to_string(), timeout_secs })
    }
}

impl WorkQueue for RedisQueue {
    fn pop(&mut self) -> Result<Option<Vec<u8>>, QueueError> {
        let reply: Option<(String, Vec<u8>)> = redis::cmd("BLPOP")
            .arg(&self.name)
            .arg(self.timeout_secs)
            .query(&mut self.conn)?;
        Ok(reply.map(|(_, payload)| payload))
    }
}

/// Queue payloads are decimal document ids.
pub fn parse_doc_id(payload: &[u8]) -> Result<DocId, ItemError> {
    let text = std::str::from_utf8(payload)
        .map_err(|_| ItemError::MalformedQueuePayload(format!("{} non-UTF-8 bytes", payload.len())))?;
    text.trim()
        .parse::<DocId>()
        .map_err(|_| ItemError::MalformedQueuePayload(format!("{text:?} is not a document id")))
}
