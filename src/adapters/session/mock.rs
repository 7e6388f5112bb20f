//! Scriptable in-memory session for tests and local development.
//!
//! # Example
//!
//! ```ignore
//! let connector = MockSessionConnector::new();
//! connector.on_open(vec![SessionEvent::Challenge("qr".into()), SessionEvent::Opened]);
//!
//! let session = connector.open(&auth).await?;
//! connector.emit(SessionEvent::Closed(DisconnectReason::LoggedOut));
//! ```

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

use crate::domain::messaging::RecipientAddress;
use crate::ports::{
    AuthStore, DisconnectReason, OpenedSession, SessionClient, SessionConnector, SessionError,
    SessionEvent,
};

const EVENT_BUFFER: usize = 32;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Records every send and fails the ones it was told to.
#[derive(Debug, Default)]
pub struct MockSessionClient {
    /// 1-based attempt number to the error returned for it.
    failures: Mutex<HashMap<usize, SessionError>>,
    sent: Mutex<Vec<(String, String)>>,
    attempts: AtomicUsize,
    logged_out: Mutex<bool>,
    closed: Mutex<bool>,
    events: Mutex<Option<mpsc::Sender<SessionEvent>>>,
}

impl MockSessionClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the `attempt`-th send (1-based) with `error`.
    pub fn fail_on(self, attempt: usize, error: SessionError) -> Self {
        lock(&self.failures).insert(attempt, error);
        self
    }

    /// Successful sends as `(routable address, body)`.
    pub fn sent(&self) -> Vec<(String, String)> {
        lock(&self.sent).clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn was_logged_out(&self) -> bool {
        *lock(&self.logged_out)
    }

    pub fn was_closed(&self) -> bool {
        *lock(&self.closed)
    }

    fn attach(&self, events: mpsc::Sender<SessionEvent>) {
        *lock(&self.events) = Some(events);
        *lock(&self.closed) = false;
    }

    fn emit(&self, event: SessionEvent) -> bool {
        match lock(&self.events).as_ref() {
            Some(events) => events.try_send(event).is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl SessionClient for MockSessionClient {
    async fn send(&self, to: &RecipientAddress, body: &str) -> Result<(), SessionError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(error) = lock(&self.failures).remove(&attempt) {
            return Err(error);
        }
        lock(&self.sent).push((to.routable(), body.to_string()));
        Ok(())
    }

    async fn logout(&self) -> Result<(), SessionError> {
        *lock(&self.logged_out) = true;
        self.emit(SessionEvent::Closed(DisconnectReason::LoggedOut));
        Ok(())
    }

    async fn close(&self) -> Result<(), SessionError> {
        *lock(&self.closed) = true;
        *lock(&self.events) = None;
        Ok(())
    }
}

/// Hands out one shared [`MockSessionClient`] per open.
#[derive(Debug, Default)]
pub struct MockSessionConnector {
    client: Arc<MockSessionClient>,
    scripts: Mutex<VecDeque<Vec<SessionEvent>>>,
    open_failures: Mutex<VecDeque<SessionError>>,
    opens: AtomicUsize,
}

impl MockSessionConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `client` for every session this connector opens.
    pub fn with_client(client: MockSessionClient) -> Self {
        Self {
            client: Arc::new(client),
            ..Self::default()
        }
    }

    /// Queues events to be delivered right after the next open.
    pub fn on_open(&self, events: Vec<SessionEvent>) {
        lock(&self.scripts).push_back(events);
    }

    /// Makes the next open fail with `error`.
    pub fn fail_next_open(&self, error: SessionError) {
        lock(&self.open_failures).push_back(error);
    }

    /// Pushes an event into the most recently opened session.
    pub fn emit(&self, event: SessionEvent) -> bool {
        self.client.emit(event)
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn client(&self) -> Arc<MockSessionClient> {
        self.client.clone()
    }
}

#[async_trait]
impl SessionConnector for MockSessionConnector {
    async fn open(&self, auth: &AuthStore) -> Result<OpenedSession, SessionError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(auth_dir = %auth.dir.display(), "Mock session opening");

        if let Some(error) = lock(&self.open_failures).pop_front() {
            return Err(error);
        }

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let script = lock(&self.scripts).pop_front().unwrap_or_default();
        for event in script {
            let _ = tx.try_send(event);
        }
        self.client.attach(tx);

        Ok(OpenedSession {
            client: self.client.clone(),
            events: rx,
        })
    }
}
