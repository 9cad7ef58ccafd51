//! Message schemas
//!
//! A schema is anything that can accept or reject a message. Schemas are
//! supplied by the application; this module only defines the contract, a
//! field-presence schema, and the registry that picks a schema by the
//! message's discriminator field.

pub mod registry;

use serde::Serialize;
use serde_json::Value;

use crate::utils::error::ValidationError;

pub use registry::{SchemaRegistry, SchemaRegistryBuilder};

pub trait Schema<M>: Send + Sync {
    fn validate(&self, message: &M) -> Result<(), ValidationError>;
}

impl<M, F> Schema<M> for F
where
    F: Fn(&M) -> Result<(), ValidationError> + Send + Sync,
{
    fn validate(&self, message: &M) -> Result<(), ValidationError> {
        self(message)
    }
}

/// Accepts a message when every listed field is present and not `null` in
/// its serialized form.
#[derive(Debug, Clone, Default)]
pub struct RequiredFields {
    fields: Vec<String>,
}

impl RequiredFields {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

impl<M: Serialize> Schema<M> for RequiredFields {
    fn validate(&self, message: &M) -> Result<(), ValidationError> {
        let value = serde_json::to_value(message)
            .map_err(|e| ValidationError::new(format!("message is not serializable: {e}")))?;

        let Value::Object(object) = value else {
            return Err(ValidationError::new("message must be an object"));
        };

        let missing: Vec<&str> = self
            .fields
            .iter()
            .filter(|field| object.get(field.as_str()).is_none_or(Value::is_null))
            .map(String::as_str)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(format!(
                "missing required fields: {}",
                missing.join(", ")
            )))
        }
    }
}
