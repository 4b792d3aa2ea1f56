//! A single live websocket connection as seen by its hub.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

/// Serialized JSON text queued for a connection's writer task.
pub type Payload = Arc<str>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a connection. Transitions only move forward:
/// `Connecting -> Open -> Closing -> Closed`, with `Closing` skipped on errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

impl ConnectionState {
    /// Live connections may be registered and receive messages.
    pub fn is_live(self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Open)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closing => "closing",
            ConnectionState::Closed => "closed",
        };
        f.write_str(label)
    }
}

/// Why a message could not be queued for a connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendFailure {
    #[error("connection is {0}")]
    NotOpen(ConnectionState),

    #[error("outbound queue is full")]
    QueueFull,

    #[error("writer task has gone away")]
    WriterGone,
}

/// Hub-side half of a websocket: an id, a state, and the outbound queue the
/// transport's writer task drains.
///
/// Dropping the `Connection` drops the queue sender, which ends the writer
/// and closes the socket.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    state: ConnectionState,
    opened_at: DateTime<Utc>,
    last_error: Option<String>,
    outbound: mpsc::Sender<Payload>,
}

impl Connection {
    pub fn new(outbound: mpsc::Sender<Payload>) -> Self {
        Self::with_id(ConnectionId::new(), outbound)
    }

    pub fn with_id(id: ConnectionId, outbound: mpsc::Sender<Payload>) -> Self {
        Self {
            id,
            state: ConnectionState::Connecting,
            opened_at: Utc::now(),
            last_error: None,
            outbound,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn mark_open(&mut self) {
        if self.state == ConnectionState::Connecting {
            self.state = ConnectionState::Open;
        }
    }

    /// The peer asked to close; no further sends are attempted.
    pub fn begin_close(&mut self) {
        if self.state.is_live() {
            self.state = ConnectionState::Closing;
        }
    }

    /// Move to `Closed`, recording the cause if one is given.
    /// Returns `false` if the connection was already closed.
    pub fn close(&mut self, cause: Option<String>) -> bool {
        if self.state == ConnectionState::Closed {
            return false;
        }
        self.state = ConnectionState::Closed;
        if cause.is_some() {
            self.last_error = cause;
        }
        true
    }

    /// Queue a payload without waiting. A full queue means the peer is not
    /// keeping up and is reported as a failure, like a closed one.
    pub fn send(&self, payload: Payload) -> Result<(), SendFailure> {
        if self.state != ConnectionState::Open {
            return Err(SendFailure::NotOpen(self.state));
        }
        self.outbound.try_send(payload).map_err(|err| match err {
            TrySendError::Full(_) => SendFailure::QueueFull,
            TrySendError::Closed(_) => SendFailure::WriterGone,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_connection(buffer: usize) -> (Connection, mpsc::Receiver<Payload>) {
        let (tx, rx) = mpsc::channel(buffer);
        let mut conn = Connection::new(tx);
        conn.mark_open();
        (conn, rx)
    }

    #[test]
    fn sends_only_while_open() {
        let (tx, _rx) = mpsc::channel(4);
        let mut conn = Connection::new(tx);
        assert_eq!(
            conn.send("x".into()),
            Err(SendFailure::NotOpen(ConnectionState::Connecting))
        );

        conn.mark_open();
        assert!(conn.send("x".into()).is_ok());

        conn.begin_close();
        assert_eq!(
            conn.send("x".into()),
            Err(SendFailure::NotOpen(ConnectionState::Closing))
        );
    }

    #[test]
    fn full_and_closed_queues_fail() {
        let (conn, mut rx) = open_connection(1);
        conn.send("first".into()).unwrap();
        assert_eq!(conn.send("second".into()), Err(SendFailure::QueueFull));
        assert_eq!(rx.try_recv().unwrap().as_ref(), "first");

        drop(rx);
        assert_eq!(conn.send("third".into()), Err(SendFailure::WriterGone));
    }

    #[test]
    fn close_is_idempotent() {
        let (mut conn, _rx) = open_connection(1);
        assert!(conn.close(Some("reset by peer".into())));
        assert!(!conn.close(None));
        assert_eq!(conn.state(), ConnectionState::Closed);
        assert_eq!(conn.last_error(), Some("reset by peer"));

        conn.mark_open();
        assert_eq!(conn.state(), ConnectionState::Closed);
    }
}
