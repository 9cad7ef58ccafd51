//! Payload store backed by `sled`
//!
//! Payloads live in a dedicated `payloads` tree. Keys are
//! `[<prefix>/]<millis, zero-padded to 20>_<uuid>`, so a plain scan returns
//! payloads in the order they were stored.

use chrono::Utc;
use sled::{Db, Tree};
use uuid::Uuid;

use super::PayloadStore;
use crate::utils::error::PayloadStoreError;

const PAYLOAD_TREE: &str = "payloads";

#[derive(Clone)]
pub struct SledPayloadStore {
    payloads: Tree,
    key_prefix: Option<String>,
}

impl SledPayloadStore {
    /// Open or create a sled database at `path`.
    pub fn open(path: &str, key_prefix: Option<String>) -> Result<Self, PayloadStoreError> {
        let db = sled::open(path)?;
        Self::with_db(db, key_prefix)
    }

    pub fn with_db(db: Db, key_prefix: Option<String>) -> Result<Self, PayloadStoreError> {
        let payloads = db.open_tree(PAYLOAD_TREE)?;
        Ok(Self {
            payloads,
            key_prefix,
        })
    }

    fn next_key(&self) -> String {
        let key = format!("{:020}_{}", Utc::now().timestamp_millis(), Uuid::new_v4());
        match &self.key_prefix {
            Some(prefix) => format!("{prefix}/{key}"),
            None => key,
        }
    }

    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }
}

impl PayloadStore for SledPayloadStore {
    fn store_payload(&self, payload: &[u8]) -> Result<String, PayloadStoreError> {
        let key = self.next_key();
        self.payloads.insert(key.as_bytes(), payload)?;
        Ok(key)
    }

    fn retrieve_payload(&self, key: &str) -> Result<Option<Vec<u8>>, PayloadStoreError> {
        Ok(self.payloads.get(key.as_bytes())?.map(|value| value.to_vec()))
    }

    fn delete_payload(&self, key: &str) -> Result<(), PayloadStoreError> {
        self.payloads.remove(key.as_bytes())?;
        Ok(())
    }
}

impl std::fmt::Debug for SledPayloadStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledPayloadStore")
            .field("payloads", &PAYLOAD_TREE)
            .field("key_prefix", &self.key_prefix)
            .finish()
    }
}
