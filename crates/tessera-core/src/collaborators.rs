//! Interfaces to collaborators outside the credential engine: message
//! delivery, signed-link construction and security-event recording.
//!
//! The engine only calls these; concrete transports live elsewhere.

use std::sync::Arc;

use chrono::Duration;
use thiserror::Error;

use crate::error::TesseraResult;
use crate::models::security_event::SecurityEvent;

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub recipient: String,
    pub subject: String,
    pub html_body: String,
    pub plain_body: String,
}

#[derive(Debug, Error)]
#[error("message delivery failed: {0}")]
pub struct DeliveryError(pub String);

pub trait MessageDispatcher: Send + Sync {
    fn send(
        &self,
        message: OutboundMessage,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}

/// Builds tamper-evident, time-bounded URLs.
pub trait UrlSigner: Send + Sync {
    fn sign(&self, base_url: &str, params: &[(&str, &str)], ttl: Duration)
    -> TesseraResult<String>;
}

/// Sink for security audit events. Recording never fails from the
/// caller's point of view.
pub trait SecurityEventRecorder: Send + Sync {
    fn record(&self, event: SecurityEvent) -> impl Future<Output = ()> + Send;
}

impl<T: MessageDispatcher> MessageDispatcher for Arc<T> {
    fn send(
        &self,
        message: OutboundMessage,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send {
        (**self).send(message)
    }
}

impl<T: UrlSigner> UrlSigner for Arc<T> {
    fn sign(
        &self,
        base_url: &str,
        params: &[(&str, &str)],
        ttl: Duration,
    ) -> TesseraResult<String> {
        (**self).sign(base_url, params, ttl)
    }
}

impl<T: SecurityEventRecorder> SecurityEventRecorder for Arc<T> {
    fn record(&self, event: SecurityEvent) -> impl Future<Output = ()> + Send {
        (**self).record(event)
    }
}
