//! Connection lifecycle: opening sessions, reacting to their events and
//! retrying after unexpected closes.
//!
//! The controller is owned by the session manager task and is never shared.
//! Everything that has to wait (opening a session, the retry timer, the demo
//! challenge, logging out) runs in a spawned task that reports back through
//! a [`ConnectionSignal`]. Each open attempt gets a new generation number
//! and signals from older generations are dropped, so a stale session can
//! never move the state machine.
//!
//! Retry policy: after any close other than a logout, exactly one retry is
//! scheduled after a fixed delay. There is no cap and no backoff. A failure
//! to open the session at all is reported and not retried.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::domain::foundation::StateMachine;
use crate::domain::messaging::{ConnectionState, DispatchError, ObserverEvent};
use crate::ports::{
    AuthStore, ChallengeRenderer, DisconnectReason, OpenedSession, SessionClient,
    SessionConnector, SessionError, SessionEvent,
};

use super::broadcast_hub::BroadcastHub;
use super::demo_simulator::{DemoSimulator, DEMO_CHALLENGE};
use super::dispatch_guard::{DispatchGuard, GuardFlag, GuardPermit};

pub const CONNECTED_MESSAGE: &str = "WhatsApp connected successfully";
pub const DEMO_CONNECTED_MESSAGE: &str = "DEMO: WhatsApp connected successfully";
pub const LOGGED_OUT_MESSAGE: &str = "You have been logged out";
pub const OPEN_FAILED_MESSAGE: &str = "Failed to connect to WhatsApp";
pub const RENDER_FAILED_MESSAGE: &str = "Failed to generate QR code";

/// Results of background work, fed back into the controller.
#[derive(Debug)]
pub(crate) enum ConnectionSignal {
    RetryDue,
    Attached {
        generation: u64,
        session: OpenedSession,
    },
    OpenFailed {
        generation: u64,
        error: SessionError,
    },
    Session {
        generation: u64,
        event: SessionEvent,
    },
    DemoChallenge {
        generation: u64,
    },
    LogoutFinished {
        result: Result<(), SessionError>,
        reply: oneshot::Sender<Result<(), DispatchError>>,
    },
}

#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub auth: AuthStore,
    pub reconnect_delay: Duration,
}

pub struct ConnectionController {
    state: ConnectionState,
    challenge: Option<String>,
    settings: ConnectionSettings,
    connector: Arc<dyn SessionConnector>,
    renderer: Arc<dyn ChallengeRenderer>,
    hub: Arc<BroadcastHub>,
    guard: Arc<DispatchGuard>,
    demo: Option<Arc<DemoSimulator>>,
    signals: mpsc::UnboundedSender<ConnectionSignal>,
    reconnect_permit: Option<GuardPermit>,
    client: Option<Arc<dyn SessionClient>>,
    generation: u64,
    open_task: Option<JoinHandle<()>>,
    event_task: Option<JoinHandle<()>>,
    retry_task: Option<JoinHandle<()>>,
}

impl ConnectionController {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        settings: ConnectionSettings,
        connector: Arc<dyn SessionConnector>,
        renderer: Arc<dyn ChallengeRenderer>,
        hub: Arc<BroadcastHub>,
        guard: Arc<DispatchGuard>,
        demo: Option<Arc<DemoSimulator>>,
        signals: mpsc::UnboundedSender<ConnectionSignal>,
    ) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            challenge: None,
            settings,
            connector,
            renderer,
            hub,
            guard,
            demo,
            signals,
            reconnect_permit: None,
            client: None,
            generation: 0,
            open_task: None,
            event_task: None,
            retry_task: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn challenge(&self) -> Option<&str> {
        self.challenge.as_deref()
    }

    /// The live session client, if one is attached.
    pub fn client(&self) -> Option<Arc<dyn SessionClient>> {
        self.client.clone()
    }

    pub fn retry_pending(&self) -> bool {
        self.retry_task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Starts a connection attempt.
    ///
    /// Rejected with `AlreadyReconnecting` while another attempt is in flight.
    pub fn connect(&mut self) -> Result<(), DispatchError> {
        if self.state.is_connected() {
            tracing::debug!("Connect requested while already connected");
            return Ok(());
        }

        let Some(permit) = self.guard.acquire(GuardFlag::Reconnecting) else {
            tracing::debug!("Already reconnecting, ignoring connect request");
            return Err(DispatchError::AlreadyReconnecting);
        };
        self.reconnect_permit = Some(permit);
        self.cancel_retry();
        self.detach_session();

        self.generation += 1;
        let generation = self.generation;

        if let Some(demo) = &self.demo {
            tracing::info!(generation, "Running in DEMO MODE");
            self.open_task = Some(demo.schedule_challenge(generation, self.signals.clone()));
            return Ok(());
        }

        tracing::info!(generation, "Opening session");
        let connector = Arc::clone(&self.connector);
        let auth = self.settings.auth.clone();
        let signals = self.signals.clone();
        self.open_task = Some(tokio::spawn(async move {
            let signal = match connector.open(&auth).await {
                Ok(session) => ConnectionSignal::Attached {
                    generation,
                    session,
                },
                Err(error) => ConnectionSignal::OpenFailed { generation, error },
            };
            let _ = signals.send(signal);
        }));
        Ok(())
    }

    pub(crate) async fn handle_signal(&mut self, signal: ConnectionSignal) {
        match signal {
            ConnectionSignal::RetryDue => {
                tracing::info!("Retrying connection");
                if let Err(e) = self.connect() {
                    tracing::debug!(error = %e, "Scheduled retry skipped");
                }
            }
            ConnectionSignal::Attached {
                generation,
                session,
            } => self.on_attached(generation, session),
            ConnectionSignal::OpenFailed { generation, error } => {
                if self.is_current(generation) {
                    self.on_open_failed(error).await;
                }
            }
            ConnectionSignal::Session { generation, event } => {
                if self.is_current(generation) {
                    self.on_session_event(event).await;
                } else {
                    tracing::debug!(generation, ?event, "Dropping event from stale session");
                }
            }
            ConnectionSignal::DemoChallenge { generation } => {
                if self.is_current(generation) {
                    self.on_challenge(DEMO_CHALLENGE).await;
                }
            }
            ConnectionSignal::LogoutFinished { result, reply } => {
                self.on_logout_finished(result, reply).await;
            }
        }
    }

    /// Moves straight to `Connected` in demo mode. Ignored otherwise.
    pub async fn demo_connect(&mut self) -> bool {
        if self.demo.is_none() {
            tracing::debug!("demo-connect ignored outside demo mode");
            return false;
        }
        if let Some(task) = self.open_task.take() {
            task.abort();
        }
        self.reconnect_permit = None;

        tracing::info!("DEMO: simulating session connection");
        self.transition(
            ConnectionState::Connected,
            None,
            vec![ObserverEvent::connected(DEMO_CONNECTED_MESSAGE)],
        )
        .await
    }

    /// Logs the session out in the background; `reply` gets the result.
    pub(crate) fn logout(&mut self, reply: oneshot::Sender<Result<(), DispatchError>>) {
        let signals = self.signals.clone();
        match self.client.clone() {
            Some(client) => {
                tokio::spawn(async move {
                    let result = client.logout().await;
                    let _ = signals.send(ConnectionSignal::LogoutFinished { result, reply });
                });
            }
            None => {
                let _ = signals.send(ConnectionSignal::LogoutFinished {
                    result: Ok(()),
                    reply,
                });
            }
        }
    }

    /// Cancels timers and closes the session.
    pub async fn shutdown(&mut self) {
        self.cancel_retry();
        if let Some(task) = self.open_task.take() {
            task.abort();
        }
        if let Some(task) = self.event_task.take() {
            task.abort();
        }
        self.reconnect_permit = None;

        if let Some(client) = self.client.take() {
            match client.close().await {
                Ok(()) => tracing::info!("Session closed"),
                Err(e) => tracing::warn!(error = %e, "Failed to close session cleanly"),
            }
        }
    }

    fn on_attached(&mut self, generation: u64, session: OpenedSession) {
        if !self.is_current(generation) {
            tracing::debug!(generation, "Closing session from superseded attempt");
            tokio::spawn(async move {
                let _ = session.client.close().await;
            });
            return;
        }

        let OpenedSession { client, mut events } = session;
        self.client = Some(client);

        let signals = self.signals.clone();
        self.event_task = Some(tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if signals
                    .send(ConnectionSignal::Session { generation, event })
                    .is_err()
                {
                    break;
                }
            }
        }));
    }

    async fn on_open_failed(&mut self, error: SessionError) {
        let error = DispatchError::SessionOpenFailure(error.to_string());
        tracing::error!(error = %error, "Error connecting to messaging network");
        self.reconnect_permit = None;
        self.transition(ConnectionState::Error, None, Vec::new()).await;
        self.hub.publish(ObserverEvent::error(OPEN_FAILED_MESSAGE));
    }

    async fn on_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Challenge(payload) => self.on_challenge(&payload).await,
            SessionEvent::Opened => self.on_opened().await,
            SessionEvent::Closed(reason) => self.on_closed(reason).await,
        }
    }

    async fn on_challenge(&mut self, payload: &str) {
        self.reconnect_permit = None;

        match self.renderer.render(payload) {
            Ok(encoded) => {
                if self
                    .transition(
                        ConnectionState::AwaitingScan,
                        Some(encoded.clone()),
                        vec![ObserverEvent::qr(encoded)],
                    )
                    .await
                {
                    tracing::info!("Challenge generated and sent to observers");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Error generating challenge");
                self.hub.publish(ObserverEvent::error(RENDER_FAILED_MESSAGE));
            }
        }
    }

    async fn on_opened(&mut self) {
        self.reconnect_permit = None;
        if self
            .transition(
                ConnectionState::Connected,
                None,
                vec![ObserverEvent::connected(CONNECTED_MESSAGE)],
            )
            .await
        {
            tracing::info!("Session connected");
        }
    }

    async fn on_closed(&mut self, reason: DisconnectReason) {
        self.reconnect_permit = None;
        self.client = None;

        let retry = !reason.is_logged_out();
        tracing::info!(reason = %reason, retry, "Connection closed");

        self.transition(ConnectionState::Disconnected, None, Vec::new())
            .await;

        if retry {
            let error = DispatchError::SessionClosedUnexpectedly(reason.to_string());
            tracing::warn!(error = %error, delay = ?self.settings.reconnect_delay, "Scheduling reconnect");
            self.schedule_retry();
        } else {
            self.cancel_retry();
            self.hub.publish(ObserverEvent::logged_out(LOGGED_OUT_MESSAGE));
        }
    }

    async fn on_logout_finished(
        &mut self,
        result: Result<(), SessionError>,
        reply: oneshot::Sender<Result<(), DispatchError>>,
    ) {
        let response = match result {
            Ok(()) => {
                self.cancel_retry();
                self.transition(ConnectionState::Disconnected, None, Vec::new())
                    .await;
                tracing::info!("Logged out");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Error logging out");
                Err(DispatchError::LogoutFailed(e.to_string()))
            }
        };
        let _ = reply.send(response);
    }

    /// Applies a validated transition and broadcasts it.
    async fn transition(
        &mut self,
        target: ConnectionState,
        challenge: Option<String>,
        leading: Vec<ObserverEvent>,
    ) -> bool {
        match self.state.transition_to(target) {
            Ok(next) => {
                tracing::debug!(from = %self.state, to = %next, "Connection state changed");
                let challenge = challenge.filter(|_| next.holds_challenge());
                self.state = next;
                self.challenge = challenge.clone();
                self.hub.publish_state(next, challenge, leading).await;
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring invalid connection transition");
                false
            }
        }
    }

    fn schedule_retry(&mut self) {
        self.cancel_retry();
        let delay = self.settings.reconnect_delay;
        let signals = self.signals.clone();
        self.retry_task = Some(tokio::spawn(async move {
            sleep(delay).await;
            let _ = signals.send(ConnectionSignal::RetryDue);
        }));
    }

    fn cancel_retry(&mut self) {
        if let Some(task) = self.retry_task.take() {
            task.abort();
        }
    }

    fn detach_session(&mut self) {
        if let Some(task) = self.event_task.take() {
            task.abort();
        }
        self.client = None;
    }

    fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::session::MockSessionConnector;
    use crate::ports::PassthroughRenderer;

    struct Fixture {
        controller: ConnectionController,
        signals: mpsc::UnboundedReceiver<ConnectionSignal>,
        connector: Arc<MockSessionConnector>,
        guard: Arc<DispatchGuard>,
        hub: Arc<BroadcastHub>,
    }

    fn fixture() -> Fixture {
        let connector = Arc::new(MockSessionConnector::new());
        let hub = Arc::new(BroadcastHub::default());
        let guard = Arc::new(DispatchGuard::new());
        let (tx, rx) = mpsc::unbounded_channel();
        let controller = ConnectionController::new(
            ConnectionSettings {
                auth: AuthStore::new("auth"),
                reconnect_delay: Duration::from_secs(5),
            },
            connector.clone(),
            Arc::new(PassthroughRenderer),
            hub.clone(),
            guard.clone(),
            None,
            tx,
        );
        Fixture {
            controller,
            signals: rx,
            connector,
            guard,
            hub,
        }
    }

    impl Fixture {
        async fn pump(&mut self) {
            let signal = self.signals.recv().await.unwrap();
            self.controller.handle_signal(signal).await;
        }
    }

    #[tokio::test]
    async fn connect_holds_reconnect_flag_until_challenge() {
        let mut fx = fixture();
        fx.connector.on_open(vec![SessionEvent::Challenge("abc".into())]);

        fx.controller.connect().unwrap();
        assert!(fx.guard.is_held(GuardFlag::Reconnecting));

        fx.pump().await; // attached
        fx.pump().await; // challenge
        assert_eq!(fx.controller.state(), ConnectionState::AwaitingScan);
        assert_eq!(fx.controller.challenge(), Some("abc"));
        assert!(!fx.guard.is_held(GuardFlag::Reconnecting));
    }

    #[tokio::test]
    async fn second_connect_is_rejected_without_opening() {
        let mut fx = fixture();
        fx.controller.connect().unwrap();
        assert_eq!(
            fx.controller.connect(),
            Err(DispatchError::AlreadyReconnecting)
        );
        fx.pump().await;
        assert_eq!(fx.connector.open_count(), 1);
    }

    #[tokio::test]
    async fn open_failure_sets_error_without_retry() {
        let mut fx = fixture();
        let mut rx = fx.hub.subscribe().await.receiver;
        fx.connector.fail_next_open(SessionError::Open("no auth dir".into()));

        fx.controller.connect().unwrap();
        fx.pump().await;

        assert_eq!(fx.controller.state(), ConnectionState::Error);
        assert!(!fx.guard.is_held(GuardFlag::Reconnecting));
        assert!(!fx.controller.retry_pending());
        assert_eq!(
            rx.recv().await.unwrap(),
            ObserverEvent::connection_state(ConnectionState::Error, false)
        );
        assert_eq!(rx.recv().await.unwrap(), ObserverEvent::error(OPEN_FAILED_MESSAGE));
    }

    #[tokio::test]
    async fn challenge_while_connected_is_ignored() {
        let mut fx = fixture();
        fx.connector.on_open(vec![
            SessionEvent::Opened,
            SessionEvent::Challenge("late".into()),
        ]);
        fx.controller.connect().unwrap();
        fx.pump().await;
        fx.pump().await;
        fx.pump().await;

        assert_eq!(fx.controller.state(), ConnectionState::Connected);
        assert_eq!(fx.controller.challenge(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn unexpected_close_schedules_one_retry() {
        let mut fx = fixture();
        fx.connector.on_open(vec![
            SessionEvent::Opened,
            SessionEvent::Closed(DisconnectReason::from_status(Some(428), "closed")),
        ]);
        fx.controller.connect().unwrap();
        fx.pump().await;
        fx.pump().await;
        fx.pump().await;

        assert_eq!(fx.controller.state(), ConnectionState::Disconnected);
        assert!(fx.controller.retry_pending());
        assert!(fx.controller.client().is_none());

        fx.pump().await; // retry fires after the delay
        fx.pump().await; // attached again
        assert_eq!(fx.connector.open_count(), 2);
    }

    #[tokio::test]
    async fn logged_out_close_never_retries() {
        let mut fx = fixture();
        let mut rx = fx.hub.subscribe().await.receiver;
        fx.connector.on_open(vec![
            SessionEvent::Opened,
            SessionEvent::Closed(DisconnectReason::LoggedOut),
        ]);
        fx.controller.connect().unwrap();
        fx.pump().await;
        fx.pump().await;
        fx.pump().await;

        assert_eq!(fx.controller.state(), ConnectionState::Disconnected);
        assert!(!fx.controller.retry_pending());

        let mut names = Vec::new();
        while let Ok(event) = rx.try_recv() {
            names.push(event.name());
        }
        assert_eq!(
            names,
            vec!["connected", "connection-state", "connection-state", "logged-out"]
        );
    }

    #[tokio::test]
    async fn stale_generation_events_are_dropped() {
        let mut fx = fixture();
        fx.controller.connect().unwrap();
        fx.pump().await;

        fx.controller
            .handle_signal(ConnectionSignal::Session {
                generation: 0,
                event: SessionEvent::Opened,
            })
            .await;
        assert_eq!(fx.controller.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn shutdown_closes_client() {
        let mut fx = fixture();
        fx.connector.on_open(vec![SessionEvent::Opened]);
        fx.controller.connect().unwrap();
        fx.pump().await;
        fx.pump().await;

        fx.controller.shutdown().await;
        assert!(fx.connector.client().was_closed());
        assert!(fx.controller.client().is_none());
    }
}
