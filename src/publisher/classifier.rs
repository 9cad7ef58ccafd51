//! Send-failure classification.
//!
//! Only one failure is recoverable: the broker client's report that the
//! channel object can no longer be used. It is recognized by exact message
//! match. Disconnects that surface with any other wording (transport resets,
//! broker-initiated closes) classify as [`ChannelFailure::Other`] and reach
//! the caller as errors. Add signatures here only once a client is known to
//! emit them for the same condition.

use crate::utils::error::SendError;

pub const CLOSED_CHANNEL_SIGNATURE: &str = "Channel closed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelFailure {
    ClosedChannel,
    Other,
}

impl ChannelFailure {
    pub fn classify(err: &SendError) -> Self {
        if err.message() == CLOSED_CHANNEL_SIGNATURE {
            Self::ClosedChannel
        } else {
            Self::Other
        }
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::ClosedChannel)
    }
}
