//! Entity mappings: type name to bean-style fields, used to flatten bound models.
//!
//! Loaded from a JSON/TOML table or built from Java bean classes
//! (see `frameworks::spring::entities`).

use std::collections::BTreeMap;
use std::path::Path;

use routemap_core::errors::MappingError;
use routemap_core::types::collections::FxHashMap;
use serde::{Deserialize, Serialize};

use super::model_field::ModelField;
use super::parameter::{Parameter, ParameterSource};

#[derive(Debug, Clone, Default)]
pub struct EntityMappings {
    entities: FxHashMap<String, Vec<ModelField>>,
}

/// One field as written in a mapping file. `name` may be an accessor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(rename = "type")]
    pub field_type: String,
    pub name: String,
    #[serde(default)]
    pub optional: bool,
}

type MappingTable = BTreeMap<String, Vec<FieldSpec>>;

impl EntityMappings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, MappingError> {
        let table: MappingTable = serde_json::from_str(json)?;
        Ok(Self::from_table(table))
    }

    pub fn from_toml(toml_str: &str) -> Result<Self, MappingError> {
        let table: MappingTable = toml::from_str(toml_str)?;
        Ok(Self::from_table(table))
    }

    /// Load a `.json` or `.toml` mapping file (decided by extension, JSON otherwise).
    pub fn load(path: &Path) -> Result<Self, MappingError> {
        let content = std::fs::read_to_string(path).map_err(|source| MappingError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml(&content),
            _ => Self::from_json(&content),
        }
    }

    fn from_table(table: MappingTable) -> Self {
        let mut mappings = Self::new();
        for (entity, fields) in table {
            for field in fields {
                mappings.add_field(&entity, ModelField::new(field.field_type, &field.name, field.optional));
            }
        }
        mappings
    }

    /// Record a field, ignoring duplicates.
    pub fn add_field(&mut self, entity: &str, field: ModelField) {
        let fields = self.entities.entry(entity.to_string()).or_default();
        if !fields.contains(&field) {
            fields.push(field);
        }
    }

    pub fn merge(&mut self, other: EntityMappings) {
        for (entity, fields) in other.entities {
            for field in fields {
                self.add_field(&entity, field);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Fields of `type_name`, also trying its unqualified, non-generic form.
    pub fn fields_for(&self, type_name: &str) -> Option<&[ModelField]> {
        if let Some(fields) = self.entities.get(type_name) {
            return Some(fields);
        }
        let simple = simple_type_name(type_name);
        self.entities.get(simple).map(Vec::as_slice)
    }

    /// Flatten `model` into field-level parameters (`address.city`, ...).
    ///
    /// Returns nothing when the type is unmapped, leaving the model opaque.
    pub fn expand(&self, model: &ModelField, source: ParameterSource, max_depth: usize) -> Vec<Parameter> {
        let mut out = Vec::new();
        let mut visiting = Vec::new();
        self.expand_into(&model.field_type, "", 0, max_depth, source, &mut visiting, &mut out);
        out
    }

    #[allow(clippy::too_many_arguments)]
    fn expand_into(
        &self,
        type_name: &str,
        prefix: &str,
        depth: usize,
        max_depth: usize,
        source: ParameterSource,
        visiting: &mut Vec<String>,
        out: &mut Vec<Parameter>,
    ) {
        let Some(fields) = self.fields_for(type_name) else {
            return;
        };
        visiting.push(simple_type_name(type_name).to_string());
        for field in fields {
            let key = if prefix.is_empty() {
                field.parameter_key.clone()
            } else {
                format!("{prefix}.{}", field.parameter_key)
            };
            let nested = simple_type_name(&field.field_type);
            let can_recurse = !field.is_primitive_type()
                && depth + 1 < max_depth
                && !visiting.iter().any(|v| v == nested)
                && self.fields_for(&field.field_type).is_some();
            if can_recurse {
                self.expand_into(&field.field_type, &key, depth + 1, max_depth, source, visiting, out);
            } else {
                out.push(Parameter::new(key, source).with_data_type(field.field_type.clone()));
            }
        }
        visiting.pop();
    }
}

/// `com.acme.Address` -> `Address`, `List<Address>` -> `List`.
fn simple_type_name(type_name: &str) -> &str {
    let base = type_name.split('<').next().unwrap_or(type_name);
    base.rsplit('.').next().unwrap_or(base).trim()
}
