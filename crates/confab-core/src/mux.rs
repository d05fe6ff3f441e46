use std::sync::atomic::{AtomicU64, Ordering};

use confab_models::ServerEvent;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Events queued per connection before a slow consumer starts losing them.
pub const CONNECTION_QUEUE_DEPTH: usize = 256;

struct ConnectionHandle {
    conn_id: u64,
    tx: mpsc::Sender<ServerEvent>,
}

/// Maps a user to the senders of every live connection they own. Each
/// connection's queue is drained by its own websocket writer task, which
/// keeps delivery FIFO per connection while fan-out stays non-blocking:
/// `try_send` either queues the event or drops it for that one target.
#[derive(Default)]
pub struct ConnectionMux {
    connections: DashMap<i64, Vec<ConnectionHandle>>,
    next_conn_id: AtomicU64,
}

impl ConnectionMux {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a connection id and outbound queue for a new connection.
    pub fn register(&self, user_id: i64) -> (u64, mpsc::Receiver<ServerEvent>) {
        let (tx, rx) = mpsc::channel(CONNECTION_QUEUE_DEPTH);
        let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        self.connections
            .entry(user_id)
            .or_default()
            .push(ConnectionHandle { conn_id, tx });
        (conn_id, rx)
    }

    /// Idempotent, safe to race with an in-flight send: a sender that loses
    /// the race observes a closed queue and skips the target.
    pub fn unregister(&self, user_id: i64, conn_id: u64) {
        if let Some(mut handles) = self.connections.get_mut(&user_id) {
            handles.retain(|h| h.conn_id != conn_id);
        }
        self.connections
            .remove_if(&user_id, |_, handles| handles.is_empty());
    }

    /// Queue `event` on every live connection of `user_id`. A user with no
    /// connections is a silent no-op (history fetch is the catch-up path).
    /// Returns how many connections accepted the event.
    pub fn send(&self, user_id: i64, event: &ServerEvent) -> usize {
        let Some(mut handles) = self.connections.get_mut(&user_id) else {
            return 0;
        };

        let mut delivered = 0;
        let mut closed: Vec<u64> = Vec::new();
        for handle in handles.iter() {
            match handle.tx.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        user_id,
                        conn_id = handle.conn_id,
                        "connection queue full, dropping event"
                    );
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(
                        user_id,
                        conn_id = handle.conn_id,
                        "connection closed mid-send"
                    );
                    closed.push(handle.conn_id);
                }
            }
        }
        if !closed.is_empty() {
            handles.retain(|h| !closed.contains(&h.conn_id));
        }
        delivered
    }

    /// Fan out to each user independently; a broken target never aborts
    /// delivery to the rest.
    pub fn send_many<I>(&self, users: I, event: &ServerEvent)
    where
        I: IntoIterator<Item = i64>,
    {
        for user_id in users {
            self.send(user_id, event);
        }
    }

    /// Deliver to every live connection of every user, except `skip_conn`
    /// when set. Used for presence transitions.
    pub fn broadcast(&self, event: &ServerEvent, skip_conn: Option<u64>) {
        for entry in self.connections.iter() {
            for handle in entry.value() {
                if Some(handle.conn_id) == skip_conn {
                    continue;
                }
                if let Err(err) = handle.tx.try_send(event.clone()) {
                    let dropped = matches!(err, TrySendError::Full(_));
                    tracing::debug!(
                        user_id = entry.key(),
                        conn_id = handle.conn_id,
                        dropped,
                        "broadcast skipped connection"
                    );
                }
            }
        }
    }

    pub fn connection_count(&self, user_id: i64) -> usize {
        self.connections
            .get(&user_id)
            .map(|handles| handles.len())
            .unwrap_or(0)
    }
}
