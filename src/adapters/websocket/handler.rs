//! WebSocket upgrade handler for observers.
//!
//! Connection lifecycle:
//! 1. Subscribe to the broadcast hub and replay the connection snapshot
//! 2. Forward hub events and direct replies to the client
//! 3. Run client commands against the session handle
//! 4. Drop the subscription on disconnect

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};

use crate::application::SessionHandle;
use crate::domain::messaging::{ObserverEvent, SendOutcome};

use super::messages::{ClientId, ClientMessage};

pub const LOGOUT_REPLY: &str = "Logged out successfully";
pub const MALFORMED_FRAME: &str = "Unrecognized message";

/// State required for WebSocket handling.
#[derive(Clone)]
pub struct WebSocketState {
    pub session: SessionHandle,
}

impl WebSocketState {
    pub fn new(session: SessionHandle) -> Self {
        Self { session }
    }
}

/// Route: `GET /ws`
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<WebSocketState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: WebSocketState) {
    let (mut sender, mut receiver) = socket.split();
    let client_id = ClientId::new();
    let subscription = state.session.hub().subscribe().await;

    tracing::info!(client_id = %client_id, "Observer connected");

    for event in &subscription.initial {
        if let Err(e) = send_event(&mut sender, event).await {
            tracing::debug!(client_id = %client_id, error = %e, "Observer left during snapshot");
            return;
        }
    }

    // Replies meant for this observer only.
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<ObserverEvent>();

    let mut send_task = {
        let client_id = client_id.clone();
        let mut events = subscription.receiver;
        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    received = events.recv() => match received {
                        Ok(event) => event,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(client_id = %client_id, skipped, "Observer lagging, events dropped");
                            continue;
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    Some(reply) = reply_rx.recv() => reply,
                };

                if let Err(e) = send_event(&mut sender, &event).await {
                    tracing::debug!(client_id = %client_id, error = %e, "Send error, closing connection");
                    break;
                }
            }
        })
    };

    let mut recv_task = {
        let client_id = client_id.clone();
        let session = state.session.clone();
        tokio::spawn(async move {
            while let Some(result) = receiver.next().await {
                match result {
                    Ok(Message::Text(text)) => match ClientMessage::parse(&text) {
                        Ok(message) => {
                            tracing::debug!(client_id = %client_id, ?message, "Observer command");
                            let session = session.clone();
                            let replies = reply_tx.clone();
                            tokio::spawn(async move {
                                if let Some(reply) = respond(&session, message).await {
                                    let _ = replies.send(reply);
                                }
                            });
                        }
                        Err(e) => {
                            tracing::warn!(client_id = %client_id, error = %e, "Malformed observer frame");
                            let _ = reply_tx.send(ObserverEvent::error(MALFORMED_FRAME));
                        }
                    },
                    Ok(Message::Binary(_)) => {
                        tracing::warn!(client_id = %client_id, "Received unsupported binary message");
                    }
                    Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                    Ok(Message::Close(_)) => {
                        tracing::debug!(client_id = %client_id, "Client sent close frame");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(client_id = %client_id, error = %e, "Receive error");
                        break;
                    }
                }
            }
        })
    };

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    tracing::info!(client_id = %client_id, "Observer disconnected");
}

/// Runs one command. Returns the reply meant for the requester, if any.
///
/// Broadcast side effects (progress, state changes) reach every observer
/// through the hub; only completion and failure notices come back here.
pub async fn respond(session: &SessionHandle, message: ClientMessage) -> Option<ObserverEvent> {
    match message {
        ClientMessage::SendMessages(payload) => {
            let result = match payload.into_request() {
                Ok(request) => session.send_messages(request).await,
                Err(e) => Err(e),
            };
            Some(match result {
                Ok(outcome) => send_complete(outcome),
                Err(e) => ObserverEvent::send_error(e.to_string()),
            })
        }
        ClientMessage::Logout => Some(match session.logout().await {
            Ok(()) => ObserverEvent::logged_out(LOGOUT_REPLY),
            Err(e) => ObserverEvent::error(e.to_string()),
        }),
        ClientMessage::DemoConnect => {
            if let Err(e) = session.demo_connect().await {
                tracing::warn!(error = %e, "demo-connect not delivered");
            }
            None
        }
    }
}

fn send_complete(outcome: SendOutcome) -> ObserverEvent {
    tracing::info!(success = outcome.success, errors = outcome.errors, "Send job complete");
    ObserverEvent::SendComplete(outcome)
}

async fn send_event(
    sender: &mut SplitSink<WebSocket, Message>,
    event: &ObserverEvent,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(event).map_err(axum::Error::new)?;
    sender.send(Message::Text(json)).await
}

/// Create axum router for the observer endpoint.
pub fn websocket_router() -> axum::Router<WebSocketState> {
    use axum::routing::get;

    axum::Router::new().route("/ws", get(ws_handler))
}
