//! Configuration module
//!
//! Environment-driven configuration for the document lifecycle engine and
//! its adapters: database, object storage, broker, and the signed-URL and
//! batching knobs of the engine itself.

use std::env;

// Common defaults
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const NATS_CONNECT_TIMEOUT_SECS: u64 = 10;
const AUTH_URL_TTL_HOURS: i64 = 24;
const TRANSFER_URL_TTL_MINUTES: i64 = 15;
const TRANSFER_BATCH_LIMIT: i64 = 1000;
const PROCESSED_MESSAGE_TTL_DAYS: i64 = 7;

/// Storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    S3,
    Local,
}

/// Application configuration (document service).
#[derive(Clone, Debug)]
pub struct Config {
    pub environment: String,
    // Database
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    // Storage
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO etc.)
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    // Broker
    pub nats_url: String,
    pub nats_connect_timeout_seconds: u64,
    pub authentication_request_queue: String,
    pub authentication_completed_queue: String,
    pub user_transferred_queue: String,
    pub documents_ready_queue: String,
    // Engine knobs
    pub auth_url_ttl_hours: i64,
    pub transfer_url_ttl_minutes: i64,
    pub transfer_batch_limit: i64,
    pub processed_message_ttl_days: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let storage_backend = match env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "s3".to_string())
            .to_lowercase()
            .as_str()
        {
            "local" => StorageBackend::Local,
            _ => StorageBackend::S3,
        };

        let config = Config {
            environment,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            storage_backend,
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION").ok().or_else(|| env::var("AWS_REGION").ok()),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL").ok(),
            nats_url: env::var("NATS_URL").unwrap_or_else(|_| "nats://localhost:4222".to_string()),
            nats_connect_timeout_seconds: env::var("NATS_CONNECT_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| NATS_CONNECT_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(NATS_CONNECT_TIMEOUT_SECS),
            authentication_request_queue: env::var("AUTHENTICATION_REQUEST_QUEUE")
                .unwrap_or_else(|_| "documents.authentication.request".to_string()),
            authentication_completed_queue: env::var("AUTHENTICATION_COMPLETED_QUEUE")
                .unwrap_or_else(|_| "documents.authentication.completed".to_string()),
            user_transferred_queue: env::var("USER_TRANSFERRED_QUEUE")
                .unwrap_or_else(|_| "documents.user.transferred".to_string()),
            documents_ready_queue: env::var("DOCUMENTS_READY_QUEUE")
                .unwrap_or_else(|_| "documents.ready".to_string()),
            auth_url_ttl_hours: env::var("AUTH_URL_TTL_HOURS")
                .unwrap_or_else(|_| AUTH_URL_TTL_HOURS.to_string())
                .parse()
                .unwrap_or(AUTH_URL_TTL_HOURS),
            transfer_url_ttl_minutes: env::var("TRANSFER_URL_TTL_MINUTES")
                .unwrap_or_else(|_| TRANSFER_URL_TTL_MINUTES.to_string())
                .parse()
                .unwrap_or(TRANSFER_URL_TTL_MINUTES),
            transfer_batch_limit: env::var("TRANSFER_BATCH_LIMIT")
                .unwrap_or_else(|_| TRANSFER_BATCH_LIMIT.to_string())
                .parse()
                .unwrap_or(TRANSFER_BATCH_LIMIT),
            processed_message_ttl_days: env::var("PROCESSED_MESSAGE_TTL_DAYS")
                .unwrap_or_else(|_| PROCESSED_MESSAGE_TTL_DAYS.to_string())
                .parse()
                .unwrap_or(PROCESSED_MESSAGE_TTL_DAYS),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.database_url.starts_with("postgresql://")
            && !self.database_url.starts_with("postgres://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                if self.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
            }
        }

        if self.transfer_batch_limit <= 0 {
            return Err(anyhow::anyhow!("TRANSFER_BATCH_LIMIT must be positive"));
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            environment: "test".to_string(),
            database_url: "postgresql://localhost/cividoc".to_string(),
            db_max_connections: MAX_CONNECTIONS,
            db_timeout_seconds: CONNECTION_TIMEOUT_SECS,
            storage_backend: StorageBackend::S3,
            s3_bucket: Some("cividoc-documents".to_string()),
            s3_region: Some("eu-west-1".to_string()),
            s3_endpoint: None,
            local_storage_path: None,
            local_storage_base_url: None,
            nats_url: "nats://localhost:4222".to_string(),
            nats_connect_timeout_seconds: NATS_CONNECT_TIMEOUT_SECS,
            authentication_request_queue: "documents.authentication.request".to_string(),
            authentication_completed_queue: "documents.authentication.completed".to_string(),
            user_transferred_queue: "documents.user.transferred".to_string(),
            documents_ready_queue: "documents.ready".to_string(),
            auth_url_ttl_hours: AUTH_URL_TTL_HOURS,
            transfer_url_ttl_minutes: TRANSFER_URL_TTL_MINUTES,
            transfer_batch_limit: TRANSFER_BATCH_LIMIT,
            processed_message_ttl_days: PROCESSED_MESSAGE_TTL_DAYS,
        }
    }

    #[test]
    fn valid_s3_config_passes() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn s3_backend_requires_bucket_and_region() {
        let mut config = base_config();
        config.s3_bucket = None;
        assert!(config.validate().is_err());

        let mut config = base_config();
        config.s3_region = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn local_backend_requires_path_and_base_url() {
        let mut config = base_config();
        config.storage_backend = StorageBackend::Local;
        assert!(config.validate().is_err());

        config.local_storage_path = Some("/var/lib/cividoc".to_string());
        config.local_storage_base_url = Some("http://localhost:4000/files".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_non_postgres_database_url() {
        let mut config = base_config();
        config.database_url = "mysql://localhost/cividoc".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn engine_knob_defaults() {
        let config = base_config();
        assert_eq!(config.auth_url_ttl_hours, 24);
        assert_eq!(config.transfer_url_ttl_minutes, 15);
        assert_eq!(config.transfer_batch_limit, 1000);
        assert_eq!(config.processed_message_ttl_days, 7);
    }
}
