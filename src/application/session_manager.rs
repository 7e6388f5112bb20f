//! Session manager - the single owner of connection state.
//!
//! ```text
//!   SessionHandle ──commands──▶ ┌────────────────────────┐
//!   (cloned per observer)       │ SessionManager task    │──▶ BroadcastHub
//!                               │  ConnectionController  │
//!   spawned work ───signals───▶ │  dispatch task         │
//!                               └────────────────────────┘
//! ```
//!
//! All state transitions happen on the manager task, one command or signal
//! at a time. Long-running work (a send job, opening a session) is spawned
//! and reports back, so the loop itself never waits on the network.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::domain::messaging::{
    ConnectionState, DispatchError, SendJob, SendOutcome, SendRequest,
};
use crate::ports::{AuthStore, ChallengeRenderer, SessionConnector};

use super::broadcast_hub::BroadcastHub;
use super::connection_controller::{ConnectionController, ConnectionSettings, ConnectionSignal};
use super::demo_simulator::{DemoSettings, DemoSimulator};
use super::dispatch_guard::{DispatchGuard, GuardFlag, GuardPermit};
use super::message_dispatcher::MessageDispatcher;

const COMMAND_BUFFER: usize = 64;

// ════════════════════════════════════════════════════════════════════════════
// Settings and status
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Name used in the message body template.
    pub sender_name: String,
    pub auth: AuthStore,
    pub reconnect_delay: Duration,
    /// Present when running without a real session.
    pub demo: Option<DemoSettings>,
}

/// Point-in-time view for health reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub state: ConnectionState,
    pub connected: bool,
    pub demo_mode: bool,
    pub sending: bool,
    pub observers: usize,
}

// ════════════════════════════════════════════════════════════════════════════
// Commands
// ════════════════════════════════════════════════════════════════════════════

enum ManagerCommand {
    Connect {
        reply: oneshot::Sender<Result<(), DispatchError>>,
    },
    DemoConnect,
    SendMessages {
        request: SendRequest,
        reply: oneshot::Sender<Result<SendOutcome, DispatchError>>,
    },
    Logout {
        reply: oneshot::Sender<Result<(), DispatchError>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// How an accepted job gets delivered.
enum Delivery {
    Live(MessageDispatcher),
    Demo(Arc<DemoSimulator>),
}

impl Delivery {
    async fn run(self, job: SendJob, permit: GuardPermit) -> SendOutcome {
        match self {
            Delivery::Live(dispatcher) => dispatcher.dispatch(job, permit).await,
            Delivery::Demo(simulator) => simulator.simulate_dispatch(job, permit).await,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Manager task
// ════════════════════════════════════════════════════════════════════════════

pub struct SessionManager {
    controller: ConnectionController,
    hub: Arc<BroadcastHub>,
    guard: Arc<DispatchGuard>,
    demo: Option<Arc<DemoSimulator>>,
    sender_name: String,
    commands: mpsc::Receiver<ManagerCommand>,
    signals: mpsc::UnboundedReceiver<ConnectionSignal>,
    dispatch_task: Option<JoinHandle<()>>,
}

impl SessionManager {
    /// Starts the manager task and returns a handle to it.
    pub fn spawn(
        settings: SessionSettings,
        connector: Arc<dyn SessionConnector>,
        renderer: Arc<dyn ChallengeRenderer>,
        hub: Arc<BroadcastHub>,
    ) -> SessionHandle {
        let guard = Arc::new(DispatchGuard::new());
        let demo = settings
            .demo
            .map(|demo| Arc::new(DemoSimulator::new(demo, hub.clone())));
        let demo_mode = demo.is_some();

        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let controller = ConnectionController::new(
            ConnectionSettings {
                auth: settings.auth,
                reconnect_delay: settings.reconnect_delay,
            },
            connector,
            renderer,
            hub.clone(),
            guard.clone(),
            demo.clone(),
            signal_tx,
        );

        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let manager = Self {
            controller,
            hub: hub.clone(),
            guard: guard.clone(),
            demo,
            sender_name: settings.sender_name,
            commands: command_rx,
            signals: signal_rx,
            dispatch_task: None,
        };
        tokio::spawn(manager.run());

        SessionHandle {
            commands: command_tx,
            hub,
            guard,
            demo_mode,
        }
    }

    async fn run(mut self) {
        tracing::info!(demo_mode = self.demo.is_some(), "Session manager started");

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(ManagerCommand::Shutdown { reply }) => {
                        self.shutdown().await;
                        let _ = reply.send(());
                        break;
                    }
                    Some(command) => self.handle_command(command).await,
                    None => {
                        self.shutdown().await;
                        break;
                    }
                },
                Some(signal) = self.signals.recv() => {
                    self.controller.handle_signal(signal).await;
                }
            }
        }

        tracing::info!("Session manager stopped");
    }

    async fn handle_command(&mut self, command: ManagerCommand) {
        match command {
            ManagerCommand::Connect { reply } => {
                let _ = reply.send(self.controller.connect());
            }
            ManagerCommand::DemoConnect => {
                self.controller.demo_connect().await;
            }
            ManagerCommand::SendMessages { request, reply } => {
                self.start_dispatch(request, reply);
            }
            ManagerCommand::Logout { reply } => self.controller.logout(reply),
            ManagerCommand::Shutdown { .. } => {}
        }
    }

    fn start_dispatch(
        &mut self,
        request: SendRequest,
        reply: oneshot::Sender<Result<SendOutcome, DispatchError>>,
    ) {
        let (delivery, job, permit) = match self.admit(request) {
            Ok(accepted) => accepted,
            Err(e) => {
                let code = e.code();
                if e.is_benign_race() {
                    tracing::debug!(%code, error = %e, "Send request rejected");
                } else {
                    tracing::warn!(%code, error = %e, "Send request rejected");
                }
                let _ = reply.send(Err(e));
                return;
            }
        };

        self.dispatch_task = Some(tokio::spawn(async move {
            let outcome = delivery.run(job, permit).await;
            let _ = reply.send(Ok(outcome));
        }));
    }

    /// Validation order: ranges, connection, guard, recipient.
    ///
    /// A recipient failure drops the permit and so clears the send flag.
    fn admit(
        &self,
        request: SendRequest,
    ) -> Result<(Delivery, SendJob, GuardPermit), DispatchError> {
        request.validate_ranges()?;

        if !self.controller.state().is_connected() {
            return Err(DispatchError::NotConnected);
        }
        let delivery = match &self.demo {
            Some(simulator) => Delivery::Demo(simulator.clone()),
            None => {
                let client = self.controller.client().ok_or(DispatchError::NotConnected)?;
                Delivery::Live(MessageDispatcher::new(
                    client,
                    self.hub.clone(),
                    self.sender_name.clone(),
                ))
            }
        };

        let permit = self
            .guard
            .acquire(GuardFlag::Sending)
            .ok_or(DispatchError::AlreadySending)?;
        let job = request.into_job()?;

        Ok((delivery, job, permit))
    }

    async fn shutdown(&mut self) {
        tracing::info!("Shutting down session manager");
        if let Some(task) = self.dispatch_task.take() {
            task.abort();
        }
        self.controller.shutdown().await;
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Handle
// ════════════════════════════════════════════════════════════════════════════

/// Cheap, cloneable front door to the manager task.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<ManagerCommand>,
    hub: Arc<BroadcastHub>,
    guard: Arc<DispatchGuard>,
    demo_mode: bool,
}

impl SessionHandle {
    /// Starts a connection attempt.
    pub async fn connect(&self) -> Result<(), DispatchError> {
        self.request(|reply| ManagerCommand::Connect { reply })
            .await?
    }

    /// Completes the demo login. No-op outside demo mode.
    pub async fn demo_connect(&self) -> Result<(), DispatchError> {
        self.commands
            .send(ManagerCommand::DemoConnect)
            .await
            .map_err(|_| DispatchError::ManagerUnavailable)
    }

    /// Runs a send job to completion and returns its totals.
    pub async fn send_messages(&self, request: SendRequest) -> Result<SendOutcome, DispatchError> {
        self.request(|reply| ManagerCommand::SendMessages { request, reply })
            .await?
    }

    pub async fn logout(&self) -> Result<(), DispatchError> {
        self.request(|reply| ManagerCommand::Logout { reply })
            .await?
    }

    /// Stops the manager and closes the session. Safe to call twice.
    pub async fn shutdown(&self) {
        if self
            .request(|reply| ManagerCommand::Shutdown { reply })
            .await
            .is_err()
        {
            tracing::debug!("Session manager already stopped");
        }
    }

    pub fn hub(&self) -> &Arc<BroadcastHub> {
        &self.hub
    }

    pub fn demo_mode(&self) -> bool {
        self.demo_mode
    }

    pub async fn status(&self) -> SessionStatus {
        let snapshot = self.hub.snapshot().await;
        SessionStatus {
            state: snapshot.state,
            connected: snapshot.state.is_connected(),
            demo_mode: self.demo_mode,
            sending: self.guard.is_held(GuardFlag::Sending),
            observers: self.hub.observer_count(),
        }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> ManagerCommand,
    ) -> Result<T, DispatchError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(build(tx))
            .await
            .map_err(|_| DispatchError::ManagerUnavailable)?;
        rx.await.map_err(|_| DispatchError::ManagerUnavailable)
    }
}
