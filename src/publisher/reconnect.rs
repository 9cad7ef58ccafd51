//! Channel ownership and background reconnection.
//!
//! The publisher reads its channel through a [`ChannelSlot`]; the
//! [`Reconnector`] is the only writer. Handles are swapped whole under a
//! write lock, so a publish sees either the old channel or the new one.
//!
//! Reconnection is single-flight: while one cycle runs, further triggers are
//! dropped. Every publish that hits the closed channel in the meantime is
//! still answered immediately. A failure reported against a handle that is no
//! longer in the slot starts nothing, since a newer channel is already there.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::config::ConnectionConfig;
use crate::connection::ConnectionResolver;
use crate::transport::ChannelPtr;
use crate::utils::error::ConnectionError;

#[derive(Debug)]
pub struct ChannelSlot {
    current: RwLock<ChannelPtr>,
}

impl ChannelSlot {
    pub fn new(channel: ChannelPtr) -> Self {
        Self {
            current: RwLock::new(channel),
        }
    }

    pub fn current(&self) -> ChannelPtr {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn replace(&self, channel: ChannelPtr) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = channel;
    }
}

/// Clears the in-flight flag when a cycle ends, including by panic.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct Reconnector {
    resolver: ConnectionResolver,
    config: ConnectionConfig,
    slot: Arc<ChannelSlot>,
    runtime: Handle,
    in_flight: AtomicBool,
    cycles_started: AtomicU64,
}

impl Reconnector {
    pub fn new(
        resolver: ConnectionResolver,
        config: ConnectionConfig,
        slot: Arc<ChannelSlot>,
        runtime: Handle,
    ) -> Self {
        Self {
            resolver,
            config,
            slot,
            runtime,
            in_flight: AtomicBool::new(false),
            cycles_started: AtomicU64::new(0),
        }
    }

    /// Starts a reconnection cycle in the background and returns at once.
    ///
    /// `failed` is the handle the send failed on. Returns `false` when a cycle
    /// is already running or when `failed` has already been replaced.
    pub fn trigger(self: &Arc<Self>, failed: &ChannelPtr) -> bool {
        if self.is_stale(failed) {
            debug!("Ignoring failure on a replaced AMQP channel");
            return false;
        }
        if self.in_flight.swap(true, Ordering::SeqCst) {
            debug!("Reconnection to {} already in progress", self.config.redacted_uri());
            return false;
        }
        // a cycle may have finished between the check and the swap
        if self.is_stale(failed) {
            self.in_flight.store(false, Ordering::SeqCst);
            debug!("Ignoring failure on a replaced AMQP channel");
            return false;
        }
        self.cycles_started.fetch_add(1, Ordering::SeqCst);

        let this = Arc::clone(self);
        self.runtime.spawn(async move {
            let _in_flight = InFlight(&this.in_flight);
            match this.reconnect().await {
                Ok(()) => info!("AMQP channel re-established"),
                Err(e) => warn!("AMQP reconnection failed: {}", e),
            }
        });
        true
    }

    fn is_stale(&self, failed: &ChannelPtr) -> bool {
        !Arc::ptr_eq(failed, &self.slot.current())
    }

    /// Runs one cycle inline: resolve a connection, open a channel, swap it in.
    pub async fn reconnect(&self) -> Result<(), ConnectionError> {
        let connection = self.resolver.resolve(&self.config).await?;
        let channel = connection.create_channel().await?;
        self.slot.replace(channel);
        Ok(())
    }

    pub fn is_reconnecting(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Number of background cycles started so far.
    pub fn cycles_started(&self) -> u64 {
        self.cycles_started.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for Reconnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconnector")
            .field("uri", &self.config.redacted_uri())
            .field("policy", &self.resolver.policy())
            .field("in_flight", &self.is_reconnecting())
            .field("cycles_started", &self.cycles_started())
            .finish()
    }
}
