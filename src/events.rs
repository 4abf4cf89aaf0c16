//! Asynchronous notifications for tweet activity.
//!
//! The tweet service publishes a [`TweetEvent`] after every successful
//! mutation. Events go onto a bounded channel and a background task logs them
//! as JSON lines. Publishing never waits: when the buffer is full the event is
//! dropped with a warning.

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TweetEventKind {
    Posted,
    Updated,
    Deleted,
    Liked,
    Replied,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TweetEvent {
    pub kind: TweetEventKind,
    pub tweet_id: String,
    /// The user who performed the action
    pub username: String,
    pub at: DateTime<Utc>,
}

impl TweetEvent {
    pub fn new(kind: TweetEventKind, tweet_id: &str, username: &str) -> Self {
        TweetEvent {
            kind,
            tweet_id: tweet_id.to_string(),
            username: username.to_string(),
            at: Utc::now(),
        }
    }
}

/// Sending half of the notification channel.
#[derive(Debug, Clone)]
pub struct EventProducer {
    tx: mpsc::Sender<TweetEvent>,
}

impl EventProducer {
    /// Creates a producer and the receiving half of its channel.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<TweetEvent>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (EventProducer { tx }, rx)
    }

    /// Creates a producer whose events are logged by a spawned task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_logging(buffer: usize) -> (Self, JoinHandle<()>) {
        let (producer, rx) = Self::channel(buffer);
        let handle = tokio::spawn(log_events(rx));
        (producer, handle)
    }

    pub fn publish(&self, event: TweetEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(
                    "Event buffer full, dropping {:?} event for tweet {}",
                    event.kind, event.tweet_id
                );
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                warn!(
                    "Event consumer stopped, dropping {:?} event for tweet {}",
                    event.kind, event.tweet_id
                );
            }
        }
    }
}

/// Drains `rx`, logging each event until every producer is dropped.
pub async fn log_events(mut rx: mpsc::Receiver<TweetEvent>) {
    while let Some(event) = rx.recv().await {
        match serde_json::to_string(&event) {
            Ok(line) => info!("tweet event: {}", line),
            Err(e) => warn!("Failed to encode tweet event: {}", e),
        }
    }
    info!("Tweet event consumer finished");
}
