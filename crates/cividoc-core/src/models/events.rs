//! Broker event payloads.
//!
//! The field sets and their semantics are part of the engine contract; the
//! broker adapter only moves the serialized bytes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outbound: a document owner requested authentication of a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticationRequested {
    pub owner_id: i64,
    pub signed_url: String,
    pub document_title: String,
    pub document_id: Uuid,
}

/// Inbound: the authentication authority finished checking a document.
///
/// `authenticated: false` intentionally returns the document to
/// `unauthenticated` so it can be resubmitted rather than getting stuck.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticationCompleted {
    pub document_id: Uuid,
    pub owner_id: i64,
    pub authenticated: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub authenticated_at: Option<DateTime<Utc>>,
}

/// Inbound: a citizen moved to another operator; their documents are purged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserTransferred {
    pub owner_id: i64,
}

/// Delivery outcome reported in [`DocumentsReady`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Success,
    Failure,
}

/// Outbound: result notification after a bulk document operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentsReady {
    pub owner_id: i64,
    pub status: DeliveryStatus,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_completed_tolerates_missing_optional_fields() {
        let doc_id = Uuid::new_v4();
        let json = format!(r#"{{"document_id":"{}","owner_id":42,"authenticated":true}}"#, doc_id);
        let event: AuthenticationCompleted = serde_json::from_str(&json).unwrap();
        assert_eq!(event.document_id, doc_id);
        assert_eq!(event.owner_id, 42);
        assert!(event.authenticated);
        assert!(event.message.is_none());
        assert!(event.authenticated_at.is_none());
    }

    #[test]
    fn documents_ready_status_serializes_lowercase() {
        let event = DocumentsReady {
            owner_id: 7,
            status: DeliveryStatus::Failure,
            message: Some("bulk delete failed".to_string()),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""status":"failure""#));
    }

    #[test]
    fn authentication_requested_round_trips() {
        let event = AuthenticationRequested {
            owner_id: 42,
            signed_url: "https://example.com/signed".to_string(),
            document_title: "invoice.pdf".to_string(),
            document_id: Uuid::new_v4(),
        };
        let bytes = serde_json::to_vec(&event).unwrap();
        let parsed: AuthenticationRequested = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed.document_id, event.document_id);
        assert_eq!(parsed.document_title, "invoice.pdf");
    }

    #[test]
    fn malformed_payload_is_rejected() {
        let result = serde_json::from_slice::<UserTransferred>(b"not json");
        assert!(result.is_err());
    }
}
