pub mod forge;

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EntitySchema {
    pub name: String,
    pub description: String,
    pub fields: Vec<FieldSchema>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FieldSchema {
    pub name: String,
    pub description: String,
}

impl EntitySchema {
    pub fn get_field(&self, name: &str) -> Result<&FieldSchema, SchemaError> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| SchemaError::UnknownField {
                entity: self.name.clone(),
                field: name.to_string(),
            })
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    #[error("Unknown field {field} for entity {entity}")]
    UnknownField { entity: String, field: String },

    #[error("Duplicate entity: {0}")]
    DuplicateEntity(String),

    #[error("Duplicate field {field} for entity {entity}")]
    DuplicateField { entity: String, field: String },

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid JSON format: {0}")]
    InvalidJsonFormat(String),
}

/// Read-only registry of the entity types a subgraph exposes.
///
/// Entities keep the order they were declared in. The registry is fixed once
/// constructed and cheap to clone, so a single instance can back any number
/// of builders.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    entities: Arc<Vec<EntitySchema>>,
}

impl SchemaRegistry {
    pub fn new(entities: Vec<EntitySchema>) -> Result<Self, SchemaError> {
        let mut entity_names = HashSet::new();
        for entity in &entities {
            if !entity_names.insert(entity.name.as_str()) {
                return Err(SchemaError::DuplicateEntity(entity.name.clone()));
            }
            let mut field_names = HashSet::new();
            for field in &entity.fields {
                if !field_names.insert(field.name.as_str()) {
                    return Err(SchemaError::DuplicateField {
                        entity: entity.name.clone(),
                        field: field.name.clone(),
                    });
                }
            }
        }

        Ok(Self {
            entities: Arc::new(entities),
        })
    }

    /// Loads a registry from a JSON array of [`EntitySchema`] objects.
    pub fn from_json_str(json: &str) -> Result<Self, SchemaError> {
        let entities: Vec<EntitySchema> = serde_json::from_str(json)
            .map_err(|e| SchemaError::InvalidJsonFormat(e.to_string()))?;
        Self::new(entities)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|_| SchemaError::FileNotFound(path.display().to_string()))?;
        let registry = Self::from_json_str(&json)?;
        debug!(
            "Schema loaded from {}: {} entities",
            path.display(),
            registry.entities.len()
        );
        Ok(registry)
    }

    pub fn entities(&self) -> Vec<&str> {
        self.entities.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn entity(&self, name: &str) -> Result<&EntitySchema, SchemaError> {
        self.entities
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| SchemaError::UnknownEntity(name.to_string()))
    }

    pub fn fields(&self, entity: &str) -> Result<Vec<&str>, SchemaError> {
        Ok(self.entity(entity)?.field_names())
    }

    pub fn description(&self, entity: &str, field: &str) -> Result<&str, SchemaError> {
        Ok(self.entity(entity)?.get_field(field)?.description.as_str())
    }
}
