//! Hand-off between the reset workflow and message delivery.
//!
//! The request path only enqueues. A [`DeliveryWorker`], driven by the
//! embedding process, performs each send under the configured timeout
//! and records failures, so a slow or hung transport never shows up in
//! the latency of a reset request.

use std::time::Duration;

use serde_json::json;
use tessera_core::collaborators::{MessageDispatcher, OutboundMessage, SecurityEventRecorder};
use tessera_core::models::security_event::{SecurityEvent, SecurityEventType, Severity};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::AuthConfig;

/// A rendered message waiting for the worker.
#[derive(Debug, Clone)]
pub struct PendingDelivery {
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub message: OutboundMessage,
}

/// Sending half of the delivery queue.
#[derive(Debug, Clone)]
pub struct DeliveryOutbox {
    tx: mpsc::Sender<PendingDelivery>,
}

impl DeliveryOutbox {
    /// Queue a message without waiting. A full queue or a stopped worker
    /// is reported at once.
    pub fn enqueue(&self, pending: PendingDelivery) -> Result<(), String> {
        self.tx.try_send(pending).map_err(|e| match e {
            TrySendError::Full(_) => "delivery queue is full".to_string(),
            TrySendError::Closed(_) => "delivery worker is not running".to_string(),
        })
    }
}

/// Receiving half of the delivery queue. Sends are attempted once, in
/// order, each bounded by the delivery timeout.
pub struct DeliveryWorker<D, R>
where
    D: MessageDispatcher,
    R: SecurityEventRecorder,
{
    rx: mpsc::Receiver<PendingDelivery>,
    dispatcher: D,
    events: R,
    timeout: Duration,
}

/// Build a delivery queue sized by `delivery_queue_capacity`.
pub fn delivery_queue<D, R>(
    dispatcher: D,
    events: R,
    config: &AuthConfig,
) -> (DeliveryOutbox, DeliveryWorker<D, R>)
where
    D: MessageDispatcher,
    R: SecurityEventRecorder,
{
    let (tx, rx) = mpsc::channel(config.delivery_queue_capacity.max(1));
    (
        DeliveryOutbox { tx },
        DeliveryWorker {
            rx,
            dispatcher,
            events,
            timeout: Duration::from_secs(config.delivery_timeout_secs),
        },
    )
}

impl<D, R> DeliveryWorker<D, R>
where
    D: MessageDispatcher,
    R: SecurityEventRecorder,
{
    /// Drain the queue until every [`DeliveryOutbox`] has been dropped.
    pub async fn run(mut self) {
        while let Some(pending) = self.rx.recv().await {
            self.deliver(pending).await;
        }
        debug!("Delivery queue closed");
    }

    async fn deliver(&self, pending: PendingDelivery) {
        let PendingDelivery {
            tenant_id,
            user_id,
            message,
        } = pending;

        let cause = match tokio::time::timeout(self.timeout, self.dispatcher.send(message)).await {
            Ok(Ok(())) => {
                debug!(user_id = %user_id, "Message delivered");
                return;
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("delivery timed out after {}s", self.timeout.as_secs()),
        };

        warn!(user_id = %user_id, cause = %cause, "Message delivery failed");
        self.events
            .record(SecurityEvent::new(
                SecurityEventType::PasswordResetDeliveryFailed,
                user_id.to_string(),
                json!({ "tenant_id": tenant_id, "cause": cause }),
                Severity::Warning,
            ))
            .await;
    }
}
