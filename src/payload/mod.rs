//! The `payload` module keeps large message bodies out of the broker.
//!
//! A [`PayloadStore`] saves bytes and hands back a key; the publisher then
//! sends a small pointer message carrying that key instead of the body.
//! `sled` backs the bundled implementation.

pub mod sled_store;

use serde::{Deserialize, Serialize};

use crate::utils::error::PayloadStoreError;

pub use sled_store::SledPayloadStore;

pub trait PayloadStore: Send + Sync {
    fn store_payload(&self, payload: &[u8]) -> Result<String, PayloadStoreError>;

    /// `None` when nothing is stored under `key`.
    fn retrieve_payload(&self, key: &str) -> Result<Option<Vec<u8>>, PayloadStoreError>;

    /// Deleting a key that does not exist is not an error.
    fn delete_payload(&self, key: &str) -> Result<(), PayloadStoreError>;
}

/// Fields added to the pointer message sent in place of an offloaded body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OffloadedPayloadPointer {
    pub offloaded_payload_pointer: String,
    pub offloaded_payload_size: usize,
}
