pub mod config;
pub mod error;
pub mod metadata;
pub mod queue;
pub mod worker;

use search_core::PostingStore;
use std::fmt::Display;
use std::time::Duration;

use config::IndexerConfig;
use error::StartupError;
use metadata::PgMetadataStore;
use queue::RedisQueue;
use worker::Worker;

const MAX_CONNECT_DELAY: Duration = Duration::from_secs(60);

/// Call `connect` up to `attempts` times, sleeping between failures with a
/// doubling delay capped at one minute.
pub fn connect_with_retry<T, E, F>(
    service: &'static str,
    attempts: u32,
    initial_delay: Duration,
    mut connect: F,
) -> Result<T, StartupError>
where
    E: Display,
    F: FnMut() -> Result<T, E>,
{
    let attempts = attempts.max(1);
    let mut delay = initial_delay;
    let mut last = String::new();
    for attempt in 1..=attempts {
        match connect() {
            Ok(conn) => {
                tracing::info!(service, attempt, "connected");
                return Ok(conn);
            }
            Err(e) => {
                last = e.to_string();
                tracing::warn!(service, attempt, attempts, error = %last, "connection attempt failed");
                if attempt < attempts {
                    std::thread::sleep(delay);
                    delay = (delay * 2).min(MAX_CONNECT_DELAY);
                }
            }
        }
    }
    Err(StartupError::Connection { service, attempts, last })
}

/// Connect every long-lived dependency and build the worker. Any failure
/// here is fatal.
pub fn start(config: &IndexerConfig) -> Result<Worker<RedisQueue, PgMetadataStore>, StartupError> {
    let conn_str = config.db.connection_string()?;
    let queue = connect_with_retry("queue", config.connect_attempts, config.connect_delay(), || {
        RedisQueue::connect(&config.redis_url, &config.queue_name, config.pop_timeout_secs)
    })?;
    let metadata = connect_with_retry("metadata store", config.connect_attempts, config.connect_delay(), || {
        PgMetadataStore::connect(&conn_str)
    })?;
    let index = PostingStore::open(&config.index_path)?;
    tracing::info!(index = %config.index_path.display(), terms = index.term_count(), "index opened");
    Ok(Worker::new(queue, metadata, index, config.warc_base_path.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retries_until_success() {
        let mut calls = 0;
        let got = connect_with_retry("test", 5, Duration::ZERO, || {
            calls += 1;
            if calls < 3 { Err("refused") } else { Ok(calls) }
        });
        assert_eq!(got.unwrap(), 3);
    }

    #[test]
    fn gives_up_after_bounded_attempts() {
        let mut calls = 0;
        let got: Result<(), _> = connect_with_retry("test", 4, Duration::ZERO, || {
            calls += 1;
            Err("refused")
        });
        assert_eq!(calls, 4);
        assert!(matches!(got, Err(StartupError::Connection { attempts: 4, .. })));
    }
}
