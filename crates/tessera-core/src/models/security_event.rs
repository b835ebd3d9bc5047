//! Security audit events emitted by the credential engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SecurityEventType {
    UserRegistered,
    LoginSucceeded,
    LoginFailed,
    PasswordResetRequested,
    PasswordResetRequestIgnored,
    PasswordResetDeliveryFailed,
    PasswordResetCompleted,
    PasswordResetFailed,
    AccessDenied,
}

impl SecurityEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityEventType::UserRegistered => "user_registered",
            SecurityEventType::LoginSucceeded => "login_succeeded",
            SecurityEventType::LoginFailed => "login_failed",
            SecurityEventType::PasswordResetRequested => "password_reset_requested",
            SecurityEventType::PasswordResetRequestIgnored => "password_reset_request_ignored",
            SecurityEventType::PasswordResetDeliveryFailed => "password_reset_delivery_failed",
            SecurityEventType::PasswordResetCompleted => "password_reset_completed",
            SecurityEventType::PasswordResetFailed => "password_reset_failed",
            SecurityEventType::AccessDenied => "access_denied",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub event_type: SecurityEventType,
    /// User id, identifier or token fingerprint the event is about.
    pub subject_id: String,
    pub detail: serde_json::Value,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
}

impl SecurityEvent {
    pub fn new(
        event_type: SecurityEventType,
        subject_id: impl Into<String>,
        detail: serde_json::Value,
        severity: Severity,
    ) -> Self {
        Self {
            event_type,
            subject_id: subject_id.into(),
            detail,
            severity,
            timestamp: Utc::now(),
        }
    }
}
