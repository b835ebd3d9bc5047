//! Security event sink that writes to `tracing`.

use tessera_core::collaborators::SecurityEventRecorder;
use tessera_core::models::security_event::{SecurityEvent, Severity};
use tracing::{error, info, warn};

/// Emits every security event as a structured log record under the
/// `tessera::security` target.
#[derive(Debug, Clone, Default)]
pub struct TracingEventRecorder;

impl SecurityEventRecorder for TracingEventRecorder {
    async fn record(&self, event: SecurityEvent) {
        let event_type = event.event_type.as_str();
        let subject_id = event.subject_id.as_str();
        let detail = event.detail.to_string();
        let timestamp = event.timestamp.to_rfc3339();

        match event.severity {
            Severity::Info => {
                info!(target: "tessera::security", event_type, subject_id, %detail, %timestamp, "security event")
            }
            Severity::Warning => {
                warn!(target: "tessera::security", event_type, subject_id, %detail, %timestamp, "security event")
            }
            Severity::Critical => {
                error!(target: "tessera::security", event_type, subject_id, %detail, %timestamp, "security event")
            }
        }
    }
}
