use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::Schema;
use crate::utils::error::SchemaResolutionError;

/// Maps a message's discriminator value to the schema that validates it.
///
/// Built once and never modified afterwards. Lookups take `&self`, so one
/// registry serves any number of concurrent publishes.
pub struct SchemaRegistry<M> {
    type_field: String,
    schemas: HashMap<String, Arc<dyn Schema<M>>>,
}

impl<M> SchemaRegistry<M> {
    pub fn builder(type_field: impl Into<String>) -> SchemaRegistryBuilder<M> {
        SchemaRegistryBuilder {
            type_field: type_field.into(),
            schemas: HashMap::new(),
        }
    }

    pub fn type_field(&self) -> &str {
        &self.type_field
    }

    pub fn contains(&self, message_type: &str) -> bool {
        self.schemas.contains_key(message_type)
    }

    /// Reads the discriminator from a serialized message. Only string values
    /// count.
    pub fn message_type<'a>(&self, message: &'a Value) -> Option<&'a str> {
        message.get(&self.type_field).and_then(Value::as_str)
    }

    pub fn resolve(&self, message: &Value) -> Result<&dyn Schema<M>, SchemaResolutionError> {
        let message_type =
            self.message_type(message)
                .ok_or_else(|| SchemaResolutionError::MissingMessageType {
                    field: self.type_field.clone(),
                })?;

        self.schemas
            .get(message_type)
            .map(|schema| schema.as_ref())
            .ok_or_else(|| SchemaResolutionError::UnsupportedMessageType {
                field: self.type_field.clone(),
                message_type: message_type.to_string(),
            })
    }
}

impl<M> fmt::Debug for SchemaRegistry<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<_> = self.schemas.keys().collect();
        types.sort();
        f.debug_struct("SchemaRegistry")
            .field("type_field", &self.type_field)
            .field("message_types", &types)
            .finish()
    }
}

pub struct SchemaRegistryBuilder<M> {
    type_field: String,
    schemas: HashMap<String, Arc<dyn Schema<M>>>,
}

impl<M> SchemaRegistryBuilder<M> {
    /// Registers `schema` for `message_type`. A later registration for the
    /// same type replaces the earlier one.
    pub fn register<S>(mut self, message_type: impl Into<String>, schema: S) -> Self
    where
        S: Schema<M> + 'static,
    {
        self.schemas.insert(message_type.into(), Arc::new(schema));
        self
    }

    pub fn type_field(mut self, type_field: impl Into<String>) -> Self {
        self.type_field = type_field.into();
        self
    }

    pub fn build(self) -> SchemaRegistry<M> {
        SchemaRegistry {
            type_field: self.type_field,
            schemas: self.schemas,
        }
    }
}
