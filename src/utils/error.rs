//! The `error` module defines the error types used across `mqpub`.
//!
//! Every failure the publish path or the connection protocol can surface is
//! represented here. `PublishError` is the union returned to callers of
//! `publish`; the narrower types are returned by the components that produce
//! them and convert into it with `?`.

use thiserror::Error;

/// The message's discriminator value could not be mapped to a schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaResolutionError {
    #[error("Message is missing the '{field}' type field")]
    MissingMessageType { field: String },

    #[error("Unsupported message type: {message_type} (field '{field}')")]
    UnsupportedMessageType { field: String, message_type: String },
}

/// The message did not satisfy its schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Message validation failed: {reason}")]
pub struct ValidationError {
    pub reason: String,
}

impl ValidationError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// A channel refused to send. Carries the broker client's message verbatim,
/// since that message is what closed-channel detection matches on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct SendError {
    message: String,
}

impl SendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The failure a broker client reports once a channel is no longer usable.
    pub fn channel_closed() -> Self {
        Self::new(crate::publisher::classifier::CLOSED_CHANNEL_SIGNATURE)
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Failures while opening a connection or a channel on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Channel creation failed: {0}")]
    Channel(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("Failed to resolve AMQP connection after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

#[derive(Error, Debug)]
pub enum PayloadStoreError {
    #[error("Payload store error: {0}")]
    Storage(#[from] sled::Error),
}

/// Everything `publish` (and publisher construction) can fail with.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error(transparent)]
    SchemaResolution(#[from] SchemaResolutionError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Failed to serialize message: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Send(#[from] SendError),

    #[error(transparent)]
    PayloadStore(#[from] PayloadStoreError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("Publisher must be built inside a tokio runtime: {0}")]
    Runtime(#[from] tokio::runtime::TryCurrentError),
}
