//! # mqpub
//!
//! `mqpub` is the publish side of a message-queue client. It validates
//! application messages against registered schemas, sends them to a broker
//! queue, and keeps the broker connection alive across transient outages.
//!
//! ## Core Modules
//!
//! - `publisher`: the publish path, send-failure classification and
//!   background reconnection.
//! - `connection`: bounded, linearly backed-off connection establishment.
//! - `schema`: the schema contract and the registry keyed by message type.
//! - `transport`: broker connector/connection/channel traits and an
//!   in-process broker.
//! - `payload`: the payload store used to keep large bodies off the broker.
//! - `config`: connection and publisher settings, loaded from file and env.
//! - `utils`: error types and logging initialization.

pub mod config;
pub mod connection;
pub mod payload;
pub mod publisher;
pub mod schema;
pub mod transport;
pub mod utils;

pub use publisher::{AmqpPublisher, PublisherBuilder, SyncPublisher};
pub use utils::error::PublishError;

#[cfg(test)]
mod tests;
