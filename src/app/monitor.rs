use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::adapters::apns::NotificationDispatcher;
use crate::adapters::apns_credentials::CredentialIssuer;
use crate::adapters::availability_log::AvailabilityLog;
use crate::adapters::device_registry::DeviceRegistry;
use crate::adapters::places::AvailabilityProbe;
use crate::domain::models::{AvailabilityLogEntry, StationStatus};
use crate::domain::status_tracker::StatusTracker;

/// Fans one alert out to every registered device with a freshly minted
/// provider token.
pub struct Notifier {
    issuer: Box<dyn CredentialIssuer>,
    dispatcher: Box<dyn NotificationDispatcher>,
    registry: Arc<DeviceRegistry>,
    message: String,
}

impl Notifier {
    pub fn new(
        issuer: Box<dyn CredentialIssuer>,
        dispatcher: Box<dyn NotificationDispatcher>,
        registry: Arc<DeviceRegistry>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            issuer,
            dispatcher,
            registry,
            message: message.into(),
        }
    }

    /// Returns how many devices accepted the alert.
    pub fn notify_all(&self) -> usize {
        let tokens = match self.registry.tokens() {
            Ok(tokens) => tokens,
            Err(error) => {
                tracing::warn!(error = %error, "failed to load device tokens; notification skipped");
                return 0;
            }
        };
        if tokens.is_empty() {
            tracing::info!("station became available but no devices are registered");
            return 0;
        }

        let credential = match self.issuer.issue() {
            Ok(credential) => credential,
            Err(error) => {
                tracing::warn!(error = %error, "failed to issue apns credential; notification skipped");
                return 0;
            }
        };

        let mut delivered = 0;
        for token in &tokens {
            match self
                .dispatcher
                .send(token, &self.message, &credential, None)
            {
                Ok(receipt) if (200..300).contains(&receipt.status_code) => delivered += 1,
                Ok(receipt) => {
                    tracing::warn!(
                        device_token = %token,
                        status_code = receipt.status_code,
                        notification_id = %receipt.notification_id,
                        "notification not accepted"
                    );
                }
                Err(error) => {
                    tracing::warn!(device_token = %token, error = %error, "notification delivery failed");
                }
            }
        }

        tracing::info!(delivered, devices = tokens.len(), "availability notification sent");
        delivered
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub status: StationStatus,
    pub notified: bool,
    pub delivered: usize,
}

/// One polling cycle: probe, record, notify on a rising edge, append history.
/// Scheduled and on-demand checks share this entry point.
pub struct StationMonitor {
    probe: AvailabilityProbe,
    tracker: Arc<StatusTracker>,
    log: Arc<AvailabilityLog>,
    notifier: Option<Notifier>,
}

impl StationMonitor {
    pub fn new(
        probe: AvailabilityProbe,
        tracker: Arc<StatusTracker>,
        log: Arc<AvailabilityLog>,
    ) -> Self {
        Self {
            probe,
            tracker,
            log,
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn tracker(&self) -> &StatusTracker {
        &self.tracker
    }

    pub fn run_cycle(&self) -> CycleReport {
        let verdict = self.probe.probe();
        let decision = self.tracker.apply_verdict(&verdict);

        tracing::info!(
            place_id = %self.probe.place_id(),
            available = verdict.available,
            available_count = verdict.available_count,
            total_count = verdict.total_count,
            error = verdict.error.as_deref().unwrap_or(""),
            "station availability checked"
        );

        let notified = decision.should_notify && self.notifier.is_some();
        let delivered = match (&self.notifier, decision.should_notify) {
            (Some(notifier), true) => notifier.notify_all(),
            _ => 0,
        };

        let checked_at = decision.status.last_check.unwrap_or_else(chrono::Utc::now);
        if let Err(error) = self
            .log
            .append(&AvailabilityLogEntry::from_verdict(&verdict, checked_at))
        {
            tracing::warn!(error = %error, "failed to append availability log entry");
        }

        CycleReport {
            status: decision.status,
            notified,
            delivered,
        }
    }
}

pub struct PollerHandle {
    stop: Sender<()>,
    join: JoinHandle<()>,
}

impl PollerHandle {
    pub fn stop(self) -> std::thread::Result<()> {
        let _ = self.stop.send(());
        self.join.join()
    }
}

/// Runs a cycle every `poll_interval`, measured from the end of the previous
/// cycle. The first scheduled cycle starts one interval after the call.
pub fn start_poller(
    monitor: Arc<StationMonitor>,
    poll_interval: Duration,
) -> std::io::Result<PollerHandle> {
    let (stop, stop_rx) = mpsc::channel::<()>();

    let join = std::thread::Builder::new()
        .name("availability-poller".to_string())
        .spawn(move || {
            loop {
                match stop_rx.recv_timeout(poll_interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        monitor.run_cycle();
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            tracing::info!("poller stopped");
        })?;

    Ok(PollerHandle { stop, join })
}
