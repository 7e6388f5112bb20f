//! Paced delivery of one send job.
//!
//! The caller validates the request and acquires the send guard; the
//! dispatcher owns the permit for the lifetime of the loop and drops it on
//! every exit path. A failed message is counted and reported, then the
//! loop moves on. Progress is reported after every attempt, so `current`
//! walks 1..=total exactly once.

use std::sync::Arc;
use tokio::time::sleep;

use crate::domain::messaging::{ObserverEvent, SendJob, SendOutcome};
use crate::ports::SessionClient;

use super::broadcast_hub::BroadcastHub;
use super::dispatch_guard::GuardPermit;

pub struct MessageDispatcher {
    client: Arc<dyn SessionClient>,
    hub: Arc<BroadcastHub>,
    sender_name: String,
}

impl MessageDispatcher {
    pub fn new(
        client: Arc<dyn SessionClient>,
        hub: Arc<BroadcastHub>,
        sender_name: impl Into<String>,
    ) -> Self {
        Self {
            client,
            hub,
            sender_name: sender_name.into(),
        }
    }

    /// Sends every message of `job`, pausing `job.delay()` between sends.
    pub async fn dispatch(&self, job: SendJob, permit: GuardPermit) -> SendOutcome {
        let _permit = permit;
        let total = job.total();
        let mut outcome = SendOutcome::default();

        tracing::info!(
            recipient = %job.recipient(),
            total,
            delay_ms = job.delay().as_millis() as u64,
            "Starting send job"
        );

        for index in job.indices() {
            let body = job.body(index, &self.sender_name);

            match self.client.send(job.recipient(), &body).await {
                Ok(()) => {
                    outcome.record_success();
                    tracing::debug!(index, total, "Message sent");
                }
                Err(e) => {
                    outcome.record_error();
                    tracing::warn!(index, total, error = %e, "Message failed");
                    self.hub.publish(ObserverEvent::message_error(index, e.to_string()));
                }
            }

            self.hub.publish(ObserverEvent::progress(index, total, outcome));

            if !job.is_last(index) {
                sleep(job.delay()).await;
            }
        }

        tracing::info!(
            success = outcome.success,
            errors = outcome.errors,
            "Send job finished"
        );
        outcome
    }
}
