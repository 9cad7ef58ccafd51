//! AMQP queue publisher
//!
//! `publish` runs, in order:
//! 1. schema resolution by the message's type field
//! 2. validation against the resolved schema
//! 3. optional message logging
//! 4. serialization, with optional offload of large bodies to a payload store
//! 5. `send_to_queue` on the current channel
//!
//! Steps 1, 2 and 4 fail the call before anything reaches the wire. A send
//! that fails because the channel was closed is logged, kicks off a
//! background reconnection and is reported as success: the message itself
//! is not retried. Any other send failure is returned unchanged.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Value, json};
use tokio::runtime::Handle;
use tracing::{debug, error, warn};

use super::SyncPublisher;
use super::classifier::ChannelFailure;
use super::reconnect::{ChannelSlot, Reconnector};
use crate::config::{ConnectionConfig, Settings};
use crate::connection::{ConnectionResolver, RetryPolicy, Sleeper};
use crate::payload::{OffloadedPayloadPointer, PayloadStore, SledPayloadStore};
use crate::schema::{Schema, SchemaRegistry, SchemaRegistryBuilder};
use crate::transport::BrokerConnector;
use crate::utils::error::{ConnectionError, PublishError};

/// Builds the loggable projection of a message from the message and its
/// type.
pub type MessageLogFn<M> = Arc<dyn Fn(&M, &str) -> Value + Send + Sync>;

#[derive(Clone)]
pub struct PayloadOffload {
    store: Arc<dyn PayloadStore>,
    threshold_bytes: usize,
}

impl PayloadOffload {
    /// Bodies strictly larger than `threshold_bytes` go to `store`.
    pub fn new(store: Arc<dyn PayloadStore>, threshold_bytes: usize) -> Self {
        Self {
            store,
            threshold_bytes,
        }
    }
}

pub struct AmqpPublisher<M> {
    queue_name: String,
    registry: SchemaRegistry<M>,
    slot: Arc<ChannelSlot>,
    reconnector: Arc<Reconnector>,
    log_messages: bool,
    message_log: Option<MessageLogFn<M>>,
    offload: Option<PayloadOffload>,
}

impl<M> AmqpPublisher<M> {
    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    pub fn registry(&self) -> &SchemaRegistry<M> {
        &self.registry
    }

    pub fn reconnector(&self) -> &Arc<Reconnector> {
        &self.reconnector
    }

    pub(super) fn resolve_message_log(
        &self,
        message: &M,
        value: &Value,
        message_type: &str,
    ) -> Value {
        match &self.message_log {
            Some(project) => project(message, message_type),
            None => json!({ "messageType": message_type, "message": value }),
        }
    }

    /// Replaces an oversized body with a pointer to its stored copy.
    /// Returns the bytes to send and, when offloaded, the payload key.
    fn offload_if_needed(
        &self,
        content: Vec<u8>,
        message_type: &str,
    ) -> Result<(Vec<u8>, Option<String>), PublishError> {
        let Some(offload) = &self.offload else {
            return Ok((content, None));
        };
        if content.len() <= offload.threshold_bytes {
            return Ok((content, None));
        }

        let key = offload.store.store_payload(&content)?;
        let pointer = OffloadedPayloadPointer {
            offloaded_payload_pointer: key.clone(),
            offloaded_payload_size: content.len(),
        };

        let mut pointer_message = serde_json::to_value(&pointer)?;
        if let Value::Object(fields) = &mut pointer_message {
            fields.insert(
                self.registry.type_field().to_string(),
                Value::String(message_type.to_string()),
            );
        }

        Ok((serde_json::to_vec(&pointer_message)?, Some(key)))
    }

    fn discard_offloaded(&self, key: Option<String>) {
        if let (Some(offload), Some(key)) = (&self.offload, key) {
            if let Err(e) = offload.store.delete_payload(&key) {
                warn!("Failed to delete undelivered payload {}: {}", key, e);
            }
        }
    }

    fn send(&self, content: Vec<u8>, offloaded_key: Option<String>) -> Result<(), PublishError> {
        let channel = self.slot.current();

        let Err(err) = channel.send_to_queue(&self.queue_name, content) else {
            return Ok(());
        };
        self.discard_offloaded(offloaded_key);

        match ChannelFailure::classify(&err) {
            ChannelFailure::ClosedChannel => {
                error!("AMQP channel closed");
                self.reconnector.trigger(&channel);
                Ok(())
            }
            ChannelFailure::Other => Err(err.into()),
        }
    }
}

impl<M: Serialize> SyncPublisher<M> for AmqpPublisher<M> {
    fn publish(&self, message: &M) -> Result<(), PublishError> {
        let value = serde_json::to_value(message)?;

        let schema = self.registry.resolve(&value)?;
        schema.validate(message)?;
        let message_type = self.registry.message_type(&value).unwrap_or_default();

        if self.log_messages {
            let log = self.resolve_message_log(message, &value, message_type);
            debug!("Publishing to {}: {}", self.queue_name, log);
        }

        let content = serde_json::to_vec(message)?;
        let (content, offloaded_key) = self.offload_if_needed(content, message_type)?;

        self.send(content, offloaded_key)
    }
}

impl<M> fmt::Debug for AmqpPublisher<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AmqpPublisher")
            .field("queue_name", &self.queue_name)
            .field("registry", &self.registry)
            .field("reconnector", &self.reconnector)
            .field("log_messages", &self.log_messages)
            .field("offload", &self.offload.as_ref().map(|o| o.threshold_bytes))
            .finish()
    }
}

pub struct PublisherBuilder<M> {
    connection: ConnectionConfig,
    queue_name: String,
    registry: SchemaRegistryBuilder<M>,
    log_messages: bool,
    message_log: Option<MessageLogFn<M>>,
    offload: Option<PayloadOffload>,
    policy: RetryPolicy,
    sleeper: Option<Arc<dyn Sleeper>>,
}

impl<M> PublisherBuilder<M> {
    pub fn new(connection: ConnectionConfig, queue_name: impl Into<String>) -> Self {
        Self {
            connection,
            queue_name: queue_name.into(),
            registry: SchemaRegistry::builder("type"),
            log_messages: false,
            message_log: None,
            offload: None,
            policy: RetryPolicy::default(),
            sleeper: None,
        }
    }

    /// Applies the connection and publisher sections of `settings`, opening
    /// the sled payload store when offload is configured.
    pub fn from_settings(settings: &Settings) -> Result<Self, PublishError> {
        let publisher = &settings.publisher;
        let mut builder = Self::new(settings.amqp.clone(), publisher.queue_name.clone())
            .message_type_field(publisher.message_type_field.clone())
            .log_messages(publisher.log_messages);

        if let (Some(threshold), Some(path)) = (
            publisher.offload_threshold_bytes,
            publisher.payload_store_path.as_deref(),
        ) {
            let store = SledPayloadStore::open(path, publisher.payload_key_prefix.clone())?;
            builder = builder.payload_offload(Arc::new(store), threshold);
        }

        Ok(builder)
    }

    pub fn message_type_field(mut self, field: impl Into<String>) -> Self {
        self.registry = self.registry.type_field(field);
        self
    }

    pub fn schema<S>(mut self, message_type: impl Into<String>, schema: S) -> Self
    where
        S: Schema<M> + 'static,
    {
        self.registry = self.registry.register(message_type, schema);
        self
    }

    pub fn log_messages(mut self, enabled: bool) -> Self {
        self.log_messages = enabled;
        self
    }

    pub fn message_log<F>(mut self, project: F) -> Self
    where
        F: Fn(&M, &str) -> Value + Send + Sync + 'static,
    {
        self.message_log = Some(Arc::new(project));
        self
    }

    pub fn payload_offload(mut self, store: Arc<dyn PayloadStore>, threshold_bytes: usize) -> Self {
        self.offload = Some(PayloadOffload::new(store, threshold_bytes));
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = Some(sleeper);
        self
    }

    /// Resolves the initial connection and opens the publishing channel.
    ///
    /// Must run inside a tokio runtime; background reconnections are spawned
    /// onto that runtime.
    pub async fn build(
        self,
        connector: Arc<dyn BrokerConnector>,
    ) -> Result<AmqpPublisher<M>, PublishError> {
        let runtime = Handle::try_current()?;

        let mut resolver = ConnectionResolver::new(connector).with_policy(self.policy);
        if let Some(sleeper) = self.sleeper {
            resolver = resolver.with_sleeper(sleeper);
        }

        let connection = resolver.resolve(&self.connection).await?;
        let channel = connection
            .create_channel()
            .await
            .map_err(ConnectionError::from)?;

        let slot = Arc::new(ChannelSlot::new(channel));
        let reconnector = Arc::new(Reconnector::new(
            resolver,
            self.connection,
            slot.clone(),
            runtime,
        ));

        Ok(AmqpPublisher {
            queue_name: self.queue_name,
            registry: self.registry.build(),
            slot,
            reconnector,
            log_messages: self.log_messages,
            message_log: self.message_log,
            offload: self.offload,
        })
    }
}
