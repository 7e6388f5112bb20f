//! Stand-in for a real session, for demos and UI work.
//!
//! Produces the same event shapes as the live path: a challenge after a
//! short delay, then per-message progress with randomly injected failures.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::domain::messaging::{ObserverEvent, SendJob, SendOutcome};

use super::broadcast_hub::BroadcastHub;
use super::connection_controller::ConnectionSignal;
use super::dispatch_guard::GuardPermit;

/// Challenge content shown in demo mode.
pub const DEMO_CHALLENGE: &str = "Demo QR Code - In production, scan this with WhatsApp";

/// Error detail reported for injected failures.
pub const DEMO_FAILURE: &str = "Demo: Simulated error";

#[derive(Debug, Clone)]
pub struct DemoSettings {
    /// Delay before the synthetic challenge appears.
    pub challenge_delay: Duration,
    /// Probability in [0, 1] that a message fails.
    pub failure_rate: f64,
    /// Upper bound on the per-message pause.
    pub send_delay_cap: Duration,
    /// Fixed RNG seed; entropy-seeded when absent.
    pub seed: Option<u64>,
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            challenge_delay: Duration::from_secs(2),
            failure_rate: 0.10,
            send_delay_cap: Duration::from_millis(500),
            seed: None,
        }
    }
}

pub struct DemoSimulator {
    settings: DemoSettings,
    hub: Arc<BroadcastHub>,
    rng: Mutex<StdRng>,
}

impl DemoSimulator {
    pub fn new(settings: DemoSettings, hub: Arc<BroadcastHub>) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            settings,
            hub,
            rng: Mutex::new(rng),
        }
    }

    /// Fires a synthetic challenge for `generation` after the configured delay.
    pub(crate) fn schedule_challenge(
        &self,
        generation: u64,
        signals: mpsc::UnboundedSender<ConnectionSignal>,
    ) -> JoinHandle<()> {
        let delay = self.settings.challenge_delay;
        tokio::spawn(async move {
            sleep(delay).await;
            tracing::info!("DEMO: issuing challenge");
            let _ = signals.send(ConnectionSignal::DemoChallenge { generation });
        })
    }

    /// Simulated counterpart of `MessageDispatcher::dispatch`.
    pub async fn simulate_dispatch(&self, job: SendJob, permit: GuardPermit) -> SendOutcome {
        let _permit = permit;
        let total = job.total();
        let pause = job.delay().min(self.settings.send_delay_cap);
        let mut outcome = SendOutcome::default();

        tracing::info!(total, "DEMO: simulating send job");

        for index in job.indices() {
            sleep(pause).await;

            if self.roll_failure() {
                outcome.record_error();
                tracing::debug!(index, total, "DEMO: injected failure");
                self.hub.publish(ObserverEvent::message_error(index, DEMO_FAILURE));
            } else {
                outcome.record_success();
                tracing::debug!(index, total, "DEMO: message sent");
            }

            self.hub.publish(ObserverEvent::progress(index, total, outcome));
        }

        outcome
    }

    fn roll_failure(&self) -> bool {
        let p = self.settings.failure_rate.clamp(0.0, 1.0);
        let mut rng = self
            .rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.gen_bool(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dispatch_guard::{DispatchGuard, GuardFlag};
    use crate::domain::messaging::SendRequest;
    use tokio::time::Instant;

    fn simulator(failure_rate: f64, seed: u64) -> (DemoSimulator, Arc<BroadcastHub>) {
        let hub = Arc::new(BroadcastHub::with_default_capacity(true));
        let settings = DemoSettings {
            failure_rate,
            seed: Some(seed),
            ..DemoSettings::default()
        };
        (DemoSimulator::new(settings, hub.clone()), hub)
    }

    fn job(count: i64, delay_ms: i64) -> SendJob {
        SendRequest::new("+90 555 123 4567", count, delay_ms)
            .into_job()
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn pause_is_capped_and_applied_before_each_message() {
        let (sim, _hub) = simulator(0.0, 1);
        let guard = Arc::new(DispatchGuard::new());

        let start = Instant::now();
        let permit = guard.acquire(GuardFlag::Sending).unwrap();
        let outcome = sim.simulate_dispatch(job(3, 5_000), permit).await;

        assert_eq!(outcome, SendOutcome { success: 3, errors: 0 });
        assert_eq!(start.elapsed(), Duration::from_millis(1_500));
        assert!(!guard.is_held(GuardFlag::Sending));
    }

    #[tokio::test(start_paused = true)]
    async fn certain_failure_still_advances_progress() {
        let (sim, hub) = simulator(1.0, 7);
        let mut rx = hub.subscribe().await.receiver;
        let guard = Arc::new(DispatchGuard::new());

        let permit = guard.acquire(GuardFlag::Sending).unwrap();
        let outcome = sim.simulate_dispatch(job(2, 1_000), permit).await;
        assert_eq!(outcome, SendOutcome { success: 0, errors: 2 });

        let mut names = Vec::new();
        while let Ok(event) = rx.try_recv() {
            names.push(event.name());
        }
        assert_eq!(
            names,
            vec![
                "message-error",
                "message-progress",
                "message-error",
                "message-progress"
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failure_rate_matches_configured_probability() {
        let (sim, _hub) = simulator(0.10, 42);
        let guard = Arc::new(DispatchGuard::new());

        let permit = guard.acquire(GuardFlag::Sending).unwrap();
        let outcome = sim.simulate_dispatch(job(1_000, 1_000), permit).await;

        assert_eq!(outcome.attempted(), 1_000);
        // Binomial(1000, 0.1): sd ~ 9.5, so +/- 50 is over five sigma.
        assert!(
            (50..=150).contains(&outcome.errors),
            "errors = {}",
            outcome.errors
        );
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_challenge_carries_generation() {
        let (sim, _hub) = simulator(0.1, 3);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let start = Instant::now();
        let _task = sim.schedule_challenge(9, tx);
        let signal = rx.recv().await.unwrap();

        assert!(matches!(signal, ConnectionSignal::DemoChallenge { generation: 9 }));
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }
}
