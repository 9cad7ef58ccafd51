//! In-process broker
//!
//! `MemoryBroker` implements the transport traits against a queue map held
//! in memory. It exists so the publisher and the connection protocol can be
//! driven without a network, and it can be told to misbehave:
//! - refuse the next `n` connection attempts
//! - close every open channel (sends on them fail with the closed-channel
//!   signature until a new channel is opened)
//! - fail every send with an arbitrary message
//!
//! Handles are cheap clones sharing the same state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::{BrokerConnector, Channel, ChannelPtr, Connection, ConnectionPtr};
use crate::utils::error::{SendError, TransportError};

#[derive(Debug, Default)]
struct BrokerState {
    queues: HashMap<String, Vec<Vec<u8>>>,
    refuse_connections: usize,
    connect_attempts: usize,
    connected_uris: Vec<String>,
    channel_generation: u64,
    send_failure: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The next `count` connection attempts fail.
    pub fn refuse_next_connections(&self, count: usize) {
        self.state().refuse_connections = count;
    }

    /// Total connection attempts seen, successful or not.
    pub fn connect_attempts(&self) -> usize {
        self.state().connect_attempts
    }

    /// URIs of the connections that were accepted, in order.
    pub fn connected_uris(&self) -> Vec<String> {
        self.state().connected_uris.clone()
    }

    /// Invalidates every channel opened so far.
    pub fn close_channels(&self) {
        self.state().channel_generation += 1;
    }

    /// Makes every send fail with `message`; `None` restores normal sends.
    pub fn fail_sends_with(&self, message: Option<&str>) {
        self.state().send_failure = message.map(str::to_string);
    }

    /// Messages delivered to `queue`, oldest first.
    pub fn messages(&self, queue: &str) -> Vec<Vec<u8>> {
        self.state().queues.get(queue).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl BrokerConnector for MemoryBroker {
    async fn connect(&self, uri: &str) -> Result<ConnectionPtr, TransportError> {
        let mut state = self.state();
        state.connect_attempts += 1;

        if !(uri.starts_with("amqp://") || uri.starts_with("amqps://")) {
            return Err(TransportError::Connection(format!(
                "unsupported URI scheme in {uri}"
            )));
        }

        if state.refuse_connections > 0 {
            state.refuse_connections -= 1;
            return Err(TransportError::Connection(
                "connect ECONNREFUSED".to_string(),
            ));
        }

        state.connected_uris.push(uri.to_string());
        Ok(Arc::new(MemoryConnection {
            broker: self.clone(),
        }))
    }
}

#[derive(Debug)]
pub struct MemoryConnection {
    broker: MemoryBroker,
}

#[async_trait]
impl Connection for MemoryConnection {
    async fn create_channel(&self) -> Result<ChannelPtr, TransportError> {
        let generation = self.broker.state().channel_generation;
        Ok(Arc::new(MemoryChannel {
            broker: self.broker.clone(),
            generation,
        }))
    }
}

#[derive(Debug)]
pub struct MemoryChannel {
    broker: MemoryBroker,
    generation: u64,
}

impl Channel for MemoryChannel {
    fn send_to_queue(&self, queue: &str, content: Vec<u8>) -> Result<(), SendError> {
        let mut state = self.broker.state();

        if state.channel_generation != self.generation {
            return Err(SendError::channel_closed());
        }
        if let Some(message) = &state.send_failure {
            return Err(SendError::new(message.clone()));
        }

        state
            .queues
            .entry(queue.to_string())
            .or_default()
            .push(content);
        Ok(())
    }
}
