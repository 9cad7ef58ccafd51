//! The `publisher` module turns application messages into queue sends.
//!
//! [`SyncPublisher`] is the whole publishing capability. There is no
//! consuming counterpart on the same type: a publisher cannot be asked to
//! consume, acknowledge or dead-letter.

pub mod classifier;
#[allow(clippy::module_inception)]
pub mod publisher;
pub mod reconnect;

use crate::utils::error::PublishError;

pub use classifier::{CLOSED_CHANNEL_SIGNATURE, ChannelFailure};
pub use publisher::{AmqpPublisher, MessageLogFn, PayloadOffload, PublisherBuilder};
pub use reconnect::{ChannelSlot, Reconnector};

pub trait SyncPublisher<M> {
    /// Validates and sends `message`.
    ///
    /// Returns without waiting for delivery confirmation. When the channel
    /// turns out to be closed the message is dropped, reconnection starts in
    /// the background and the call still succeeds.
    fn publish(&self, message: &M) -> Result<(), PublishError>;
}
