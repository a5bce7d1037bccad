//! CiviDoc Broker Library
//!
//! NATS JetStream adapter: a shared connection owner ([`BrokerClient`]),
//! the [`MessagePublisher`] capability trait with its JetStream
//! implementation, and a durable pull-consumer loop ([`QueueConsumer`]).
//! Business logic lives behind [`MessageHandler`] implementations in
//! `cividoc-engine`; this crate only moves bytes and acknowledgments.

pub mod client;
pub mod consumer;
pub mod publisher;

pub use client::BrokerClient;
pub use consumer::{MessageHandler, QueueConsumer};
pub use publisher::{JetStreamPublisher, MessagePublisher};
