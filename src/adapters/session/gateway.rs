//! HTTP gateway session - talks to a sidecar that holds the real
//! messaging-network connection.
//!
//! # Protocol
//!
//! | Call                          | Purpose                                  |
//! |-------------------------------|------------------------------------------|
//! | `POST /session/open`          | open a session with `{"authDir": ...}`   |
//! | `GET  /session/events`        | SSE stream of lifecycle events           |
//! | `POST /messages`              | send `{"to": ..., "text": ...}`          |
//! | `POST /session/logout`        | log the account out                      |
//! | `POST /session/close`         | drop the connection, keep credentials    |
//!
//! Event lines look like `data: {"type":"qr","payload":"..."}`, with
//! `open` and `close` (`statusCode`, `reason`) as the other types.
//! A bearer token is sent on every call when configured.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::domain::messaging::RecipientAddress;
use crate::ports::{
    AuthStore, DisconnectReason, OpenedSession, SessionClient, SessionConnector, SessionError,
    SessionEvent,
};

const EVENT_BUFFER: usize = 32;

/// Gateway connection settings.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    api_token: Option<Secret<String>>,
    /// Timeout for request/response calls. The event stream has none.
    pub timeout: Duration,
}

impl GatewayConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token: None,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_api_token(mut self, token: Secret<String>) -> Self {
        self.api_token = Some(token);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Wire types
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OpenRequest<'a> {
    auth_dir: &'a str,
}

#[derive(Debug, Serialize)]
struct SendBody<'a> {
    to: String,
    text: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum GatewayEvent {
    Qr {
        payload: String,
    },
    Open,
    Close {
        #[serde(rename = "statusCode", default)]
        status_code: Option<u16>,
        #[serde(default)]
        reason: Option<String>,
    },
}

impl From<GatewayEvent> for SessionEvent {
    fn from(event: GatewayEvent) -> Self {
        match event {
            GatewayEvent::Qr { payload } => SessionEvent::Challenge(payload),
            GatewayEvent::Open => SessionEvent::Opened,
            GatewayEvent::Close {
                status_code,
                reason,
            } => SessionEvent::Closed(DisconnectReason::from_status(
                status_code,
                reason.unwrap_or_else(|| "connection closed".to_string()),
            )),
        }
    }
}

/// Splits an SSE byte stream into `data:` payloads.
///
/// Chunks may end mid-line or mid-character; raw bytes are kept until a
/// full line arrives and only complete lines are decoded.
#[derive(Debug, Default)]
struct SseLineBuffer {
    pending: Vec<u8>,
}

impl SseLineBuffer {
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some(end) = self.pending.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=end).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\r', '\n']);
            if let Some(data) = line.strip_prefix("data:") {
                let data = data.trim_start();
                if !data.is_empty() {
                    payloads.push(data.to_string());
                }
            }
        }
        payloads
    }
}

fn transport(e: reqwest::Error) -> SessionError {
    if e.is_timeout() {
        SessionError::Transport("request timed out".to_string())
    } else if e.is_connect() {
        SessionError::Transport(format!("Connection failed: {}", e))
    } else {
        SessionError::Transport(e.to_string())
    }
}

async fn describe_failure(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if body.is_empty() {
        format!("status {}", status)
    } else {
        format!("status {}: {}", status, body)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Connector
// ════════════════════════════════════════════════════════════════════════════

pub struct GatewayConnector {
    config: Arc<GatewayConfig>,
    http: Client,
    stream_http: Client,
}

impl GatewayConnector {
    pub fn new(config: GatewayConfig) -> Result<Self, SessionError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(transport)?;
        let stream_http = Client::builder()
            .connect_timeout(config.timeout)
            .build()
            .map_err(transport)?;

        Ok(Self {
            config: Arc::new(config),
            http,
            stream_http,
        })
    }

    async fn open_events(&self) -> Result<Response, SessionError> {
        let response = self
            .config
            .authorize(self.stream_http.get(self.config.url("/session/events")))
            .header("Accept", "text/event-stream")
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            return Err(SessionError::Open(describe_failure(response).await));
        }
        Ok(response)
    }
}

#[async_trait]
impl SessionConnector for GatewayConnector {
    async fn open(&self, auth: &AuthStore) -> Result<OpenedSession, SessionError> {
        let auth_dir = auth.dir.to_string_lossy();
        tracing::debug!(url = %self.config.base_url, auth_dir = %auth_dir, "Opening gateway session");

        let response = self
            .config
            .authorize(self.http.post(self.config.url("/session/open")))
            .json(&OpenRequest {
                auth_dir: &auth_dir,
            })
            .send()
            .await
            .map_err(|e| SessionError::Open(transport(e).to_string()))?;

        if !response.status().is_success() {
            return Err(SessionError::Open(describe_failure(response).await));
        }

        let events = self.open_events().await?;
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let reader = tokio::spawn(read_events(events, tx));

        let client = GatewayClient {
            config: self.config.clone(),
            http: self.http.clone(),
            reader: Mutex::new(Some(reader)),
        };
        Ok(OpenedSession {
            client: Arc::new(client),
            events: rx,
        })
    }
}

/// Pumps SSE lines into session events until the stream or receiver ends.
async fn read_events(response: Response, events: mpsc::Sender<SessionEvent>) {
    let mut stream = response.bytes_stream();
    let mut buffer = SseLineBuffer::default();

    while let Some(chunk) = stream.next().await {
        let bytes = match chunk {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "Gateway event stream failed");
                let _ = events
                    .send(SessionEvent::Closed(DisconnectReason::from_status(
                        None,
                        format!("Stream error: {}", e),
                    )))
                    .await;
                return;
            }
        };

        for data in buffer.push(&bytes) {
            match serde_json::from_str::<GatewayEvent>(&data) {
                Ok(event) => {
                    let closes = matches!(event, GatewayEvent::Close { .. });
                    if events.send(event.into()).await.is_err() || closes {
                        return;
                    }
                }
                Err(e) => tracing::warn!(error = %e, data = %data, "Ignoring malformed gateway event"),
            }
        }
    }

    let _ = events
        .send(SessionEvent::Closed(DisconnectReason::from_status(
            None,
            "event stream ended",
        )))
        .await;
}

// ════════════════════════════════════════════════════════════════════════════
// Client
// ════════════════════════════════════════════════════════════════════════════

pub struct GatewayClient {
    config: Arc<GatewayConfig>,
    http: Client,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl GatewayClient {
    async fn post(&self, path: &str) -> Result<Response, SessionError> {
        self.config
            .authorize(self.http.post(self.config.url(path)))
            .send()
            .await
            .map_err(transport)
    }

    fn stop_reader(&self) {
        let reader = self
            .reader
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(reader) = reader {
            reader.abort();
        }
    }
}

#[async_trait]
impl SessionClient for GatewayClient {
    async fn send(&self, to: &RecipientAddress, body: &str) -> Result<(), SessionError> {
        let response = self
            .config
            .authorize(self.http.post(self.config.url("/messages")))
            .json(&SendBody {
                to: to.routable(),
                text: body,
            })
            .send()
            .await
            .map_err(|e| SessionError::Send(transport(e).to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(SessionError::Send(describe_failure(response).await))
        }
    }

    async fn logout(&self) -> Result<(), SessionError> {
        let response = self
            .post("/session/logout")
            .await
            .map_err(|e| SessionError::Logout(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(SessionError::Logout(describe_failure(response).await))
        }
    }

    async fn close(&self) -> Result<(), SessionError> {
        self.stop_reader();
        let response = self.post("/session/close").await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(SessionError::Transport(describe_failure(response).await))
        }
    }
}

impl Drop for GatewayClient {
    fn drop(&mut self) {
        self.stop_reader();
    }
}
