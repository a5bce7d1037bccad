use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Authentication workflow state of a document.
///
/// The state machine is:
///
/// ```text
/// unauthenticated --(request)--> authenticating --(event: true)--> authenticated
///                                      |--(event: false)--> unauthenticated
/// ```
///
/// An explicit enum (rather than a free-form string field) keeps illegal
/// states out of the store entirely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthenticationStatus {
    #[default]
    Unauthenticated,
    Authenticating,
    Authenticated,
}

impl AuthenticationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthenticationStatus::Unauthenticated => "unauthenticated",
            AuthenticationStatus::Authenticating => "authenticating",
            AuthenticationStatus::Authenticated => "authenticated",
        }
    }

    /// Whether the state machine permits moving to `next` from here.
    ///
    /// Re-requesting authentication while already authenticating is allowed
    /// (the outbound request is simply re-sent), and a failed authentication
    /// returns the document to `unauthenticated` so it can be resubmitted.
    pub fn can_transition_to(&self, next: AuthenticationStatus) -> bool {
        use AuthenticationStatus::*;
        matches!(
            (self, next),
            (Unauthenticated, Authenticating)
                | (Authenticating, Authenticating)
                | (Authenticating, Authenticated)
                | (Authenticating, Unauthenticated)
        )
    }

    /// Terminal status for an authentication-completed event.
    pub fn from_completion(authenticated: bool) -> Self {
        if authenticated {
            AuthenticationStatus::Authenticated
        } else {
            AuthenticationStatus::Unauthenticated
        }
    }
}

impl fmt::Display for AuthenticationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthenticationStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unauthenticated" => Ok(AuthenticationStatus::Unauthenticated),
            "authenticating" => Ok(AuthenticationStatus::Authenticating),
            "authenticated" => Ok(AuthenticationStatus::Authenticated),
            other => Err(AppError::Validation(format!(
                "invalid authentication status: {}",
                other
            ))),
        }
    }
}

/// An uploaded citizen document.
///
/// Created by the upload engine after a successful blob write; mutated only
/// through the authentication state transition; destroyed by the retention
/// engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub filename: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub hash_sha256: String,
    pub bucket: String,
    pub storage_key: String,
    pub public_url: Option<String>,
    pub owner_id: i64,
    pub status: AuthenticationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Enforce the record invariants before persistence.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.filename.trim().is_empty() {
            return Err(AppError::Validation(
                "filename must not be blank".to_string(),
            ));
        }
        if self.size_bytes <= 0 {
            return Err(AppError::Validation(
                "size_bytes must be greater than zero".to_string(),
            ));
        }
        if self.hash_sha256.len() != 64
            || !self
                .hash_sha256
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        {
            return Err(AppError::Validation(
                "hash_sha256 must be exactly 64 lowercase hex characters".to_string(),
            ));
        }
        if self.owner_id <= 0 {
            return Err(AppError::Validation(
                "owner_id must be greater than zero".to_string(),
            ));
        }
        if self.storage_key.trim().is_empty() {
            return Err(AppError::Validation(
                "storage_key must not be blank".to_string(),
            ));
        }
        if self.bucket.trim().is_empty() {
            return Err(AppError::Validation("bucket must not be blank".to_string()));
        }
        Ok(())
    }
}
