//! The `transport` module defines the seams between `mqpub` and a broker
//! client library.
//!
//! A [`BrokerConnector`] opens a [`Connection`] from a URI, a connection opens
//! [`Channel`]s, and a channel sends bytes to a named queue. The publish path
//! only ever talks to these traits. [`memory::MemoryBroker`] implements all
//! three in-process.

pub mod memory;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::utils::error::{SendError, TransportError};

pub type ConnectionPtr = Arc<dyn Connection>;
pub type ChannelPtr = Arc<dyn Channel>;

#[async_trait]
pub trait BrokerConnector: Send + Sync {
    async fn connect(&self, uri: &str) -> Result<ConnectionPtr, TransportError>;
}

#[async_trait]
pub trait Connection: Send + Sync + fmt::Debug {
    async fn create_channel(&self) -> Result<ChannelPtr, TransportError>;
}

/// A session handle used to send messages.
///
/// `send_to_queue` is synchronous: broker clients buffer the write and report
/// only immediate failures, such as the channel already being closed.
pub trait Channel: Send + Sync + fmt::Debug {
    fn send_to_queue(&self, queue: &str, content: Vec<u8>) -> Result<(), SendError>;
}

#[cfg(test)]
mod tests;
