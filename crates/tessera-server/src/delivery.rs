//! Message dispatcher used when no mail transport is configured.

use tessera_core::collaborators::{DeliveryError, MessageDispatcher, OutboundMessage};
use tracing::info;

/// Accepts every message and logs its envelope. Bodies carry reset links
/// and are never logged.
#[derive(Debug, Clone, Default)]
pub struct LogDispatcher;

impl MessageDispatcher for LogDispatcher {
    async fn send(&self, message: OutboundMessage) -> Result<(), DeliveryError> {
        info!(
            recipient = %message.recipient,
            subject = %message.subject,
            "Outbound message accepted (no transport configured)"
        );
        Ok(())
    }
}
