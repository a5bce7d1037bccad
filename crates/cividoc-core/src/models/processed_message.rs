use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Idempotency ledger entry.
///
/// One entry is written per successfully processed inbound event; entries
/// are never updated and age out of the store after their TTL. The ledger
/// makes at-least-once broker delivery safe to apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedMessage {
    pub message_id: String,
    pub processed_at: DateTime<Utc>,
    pub document_id: Option<Uuid>,
    pub handler_name: String,
    pub expires_at: DateTime<Utc>,
}

impl ProcessedMessage {
    pub fn new(
        message_id: impl Into<String>,
        document_id: Option<Uuid>,
        handler_name: impl Into<String>,
        ttl_days: i64,
    ) -> Self {
        let processed_at = Utc::now();
        Self {
            message_id: message_id.into(),
            processed_at,
            document_id,
            handler_name: handler_name.into(),
            expires_at: processed_at + Duration::days(ttl_days),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_is_processed_at_plus_ttl() {
        let entry = ProcessedMessage::new("msg-1", None, "authentication_completed", 7);
        assert_eq!(entry.expires_at, entry.processed_at + Duration::days(7));
        assert_eq!(entry.handler_name, "authentication_completed");
    }
}
