//! Long-polling update acquisition.
//!
//! A single background task fetches update batches, advances a local offset
//! cursor past the highest `update_id` seen, and feeds a bounded queue that
//! the dispatch loop consumes. Transport failures are retried forever with a
//! fixed delay; shutdown is cooperative and checked between iterations, so
//! an in-flight fetch always completes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::api::Api;
use crate::error::ApiError;
use crate::update::Update;

/// Fixed delay between retries after a failed fetch. Constant, not
/// exponential.
const RETRY_DELAY: Duration = Duration::from_secs(3);

/// Default capacity of the update queue.
const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Default batch size requested per fetch.
const DEFAULT_FETCH_LIMIT: i64 = 100;

/// A source of raw updates, usually the `getUpdates` long-poll endpoint.
#[async_trait]
pub trait UpdateSource: Send + Sync + 'static {
    /// Fetch the next batch of updates at or after `offset`.
    async fn fetch(&self, offset: i64, limit: i64) -> Result<Vec<Update>, ApiError>;

    /// Record `offset` as processed. The default does nothing - the
    /// platform acknowledges implicitly through the next fetch's offset.
    async fn acknowledge(&self, _offset: i64) {}
}

/// [`UpdateSource`] over the live API.
pub struct ApiSource {
    api: Arc<Api>,
    poll_timeout: u64,
}

impl ApiSource {
    pub fn new(api: Arc<Api>, poll_timeout: u64) -> Self {
        Self { api, poll_timeout }
    }
}

#[async_trait]
impl UpdateSource for ApiSource {
    async fn fetch(&self, offset: i64, limit: i64) -> Result<Vec<Update>, ApiError> {
        self.api.get_updates(offset, limit, self.poll_timeout).await
    }
}

/// Long-poll driver over an [`UpdateSource`].
pub struct Poller<S> {
    source: S,
    queue_capacity: usize,
    fetch_limit: i64,
    retry_delay: Duration,
    offset: i64,
}

impl<S: UpdateSource> Poller<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            fetch_limit: DEFAULT_FETCH_LIMIT,
            retry_delay: RETRY_DELAY,
            offset: 0,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Resume from a previously acknowledged offset.
    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }

    /// Spawn the polling task and return the update queue.
    ///
    /// The task runs until `shutdown` flips to true; the flag is checked at
    /// the top of each iteration only, so an in-flight fetch completes
    /// before the loop stops. The queue closes when the task exits.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> mpsc::Receiver<Update> {
        let (queue, updates) = mpsc::channel(self.queue_capacity);
        tokio::spawn(self.run(queue, shutdown));
        updates
    }

    async fn run(mut self, queue: mpsc::Sender<Update>, shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                debug!("poller shutting down");
                return;
            }

            let batch = match self.source.fetch(self.offset, self.fetch_limit).await {
                Ok(batch) => batch,
                Err(err) => {
                    warn!(
                        "update fetch failed: {err}; retrying in {:?}",
                        self.retry_delay
                    );
                    tokio::time::sleep(self.retry_delay).await;
                    continue;
                }
            };

            for update in batch {
                let id = update.update_id();
                if id < self.offset {
                    // Stale replay from a previous poll window.
                    continue;
                }
                self.offset = id + 1;
                if queue.send(update).await.is_err() {
                    debug!("update queue dropped; stopping poller");
                    return;
                }
            }
            self.source.acknowledge(self.offset).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Scripted source: pops one result per fetch, records offsets, and
    /// flips the shutdown flag once the script runs dry.
    struct ScriptedSource {
        script: Mutex<VecDeque<Result<Vec<Update>, ApiError>>>,
        offsets: Arc<Mutex<Vec<i64>>>,
        acknowledged: Arc<Mutex<Vec<i64>>>,
        shutdown: watch::Sender<bool>,
    }

    #[async_trait]
    impl UpdateSource for ScriptedSource {
        async fn fetch(&self, offset: i64, _limit: i64) -> Result<Vec<Update>, ApiError> {
            self.offsets.lock().unwrap().push(offset);
            match self.script.lock().unwrap().pop_front() {
                Some(result) => result,
                None => {
                    let _ = self.shutdown.send(true);
                    Ok(Vec::new())
                }
            }
        }

        async fn acknowledge(&self, offset: i64) {
            self.acknowledged.lock().unwrap().push(offset);
        }
    }

    fn raw(id: i64) -> Update {
        Update::from(json!({"update_id": id, "message": {"text": "x"}}))
    }

    fn transport_error() -> ApiError {
        ApiError::Telegram {
            code: 502,
            description: "bad gateway".to_string(),
            parameters: Value::Null,
        }
    }

    #[tokio::test]
    async fn test_poller_advances_offset_and_survives_failure() {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let offsets = Arc::new(Mutex::new(Vec::new()));
        let acknowledged = Arc::new(Mutex::new(Vec::new()));
        let source = ScriptedSource {
            script: Mutex::new(VecDeque::from([
                Ok(vec![raw(1), raw(2)]),
                Err(transport_error()),
                Ok(vec![raw(3)]),
            ])),
            offsets: offsets.clone(),
            acknowledged: acknowledged.clone(),
            shutdown: shutdown_tx,
        };

        let mut updates = Poller::new(source)
            .with_retry_delay(Duration::from_millis(1))
            .spawn(shutdown_rx);

        let mut received = Vec::new();
        while let Some(update) = updates.recv().await {
            received.push(update.update_id());
        }

        assert_eq!(received, vec![1, 2, 3]);
        // Cursor always one past the highest id seen; the failed fetch
        // retried at the same offset.
        assert_eq!(*offsets.lock().unwrap(), vec![0, 3, 3, 4]);
        assert_eq!(*acknowledged.lock().unwrap(), vec![3, 4, 4]);
    }

    #[tokio::test]
    async fn test_poller_skips_stale_updates() {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let source = ScriptedSource {
            script: Mutex::new(VecDeque::from([Ok(vec![raw(5), raw(4), raw(6)])])),
            offsets: Arc::new(Mutex::new(Vec::new())),
            acknowledged: Arc::new(Mutex::new(Vec::new())),
            shutdown: shutdown_tx,
        };

        let mut updates = Poller::new(source).spawn(shutdown_rx);

        let mut received = Vec::new();
        while let Some(update) = updates.recv().await {
            received.push(update.update_id());
        }

        // 4 arrived after the cursor had already passed it.
        assert_eq!(received, vec![5, 6]);
    }

    #[tokio::test]
    async fn test_shutdown_before_first_fetch() {
        let (shutdown_tx, shutdown_rx) = watch::channel(true);
        let offsets = Arc::new(Mutex::new(Vec::new()));
        let source = ScriptedSource {
            script: Mutex::new(VecDeque::from([Ok(vec![raw(1)])])),
            offsets: offsets.clone(),
            acknowledged: Arc::new(Mutex::new(Vec::new())),
            shutdown: shutdown_tx,
        };

        let mut updates = Poller::new(source).spawn(shutdown_rx);

        assert!(updates.recv().await.is_none());
        assert!(offsets.lock().unwrap().is_empty());
    }
}
