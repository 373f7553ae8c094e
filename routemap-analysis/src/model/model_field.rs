use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// A bound request/body object, or one field of an entity.
///
/// Equality and hashing cover `(field_type, parameter_key)` only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelField {
    #[serde(rename = "type")]
    pub field_type: String,
    pub parameter_key: String,
    #[serde(default)]
    pub is_optional: bool,
}

impl ModelField {
    /// `name` may be a bean accessor (`getFirstName`) or a plain name.
    pub fn new(field_type: impl Into<String>, name: &str, is_optional: bool) -> Self {
        Self {
            field_type: field_type.into(),
            parameter_key: parameter_key(name),
            is_optional,
        }
    }

    pub fn is_primitive_type(&self) -> bool {
        is_primitive_type_name(&self.field_type)
    }
}

impl PartialEq for ModelField {
    fn eq(&self, other: &Self) -> bool {
        self.field_type == other.field_type && self.parameter_key == other.parameter_key
    }
}

impl Eq for ModelField {}

impl Hash for ModelField {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.field_type.hash(state);
        self.parameter_key.hash(state);
    }
}

impl fmt::Display for ModelField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.parameter_key, self.field_type)?;
        if self.is_optional {
            f.write_str("?")?;
        }
        Ok(())
    }
}

/// Strip a `get` accessor prefix and lower-case the next character.
pub fn parameter_key(name: &str) -> String {
    match name.strip_prefix("get") {
        Some(rest) if !rest.is_empty() => {
            let mut chars = rest.chars();
            let first = chars.next().map(|c| c.to_lowercase().to_string()).unwrap_or_default();
            first + chars.as_str()
        }
        _ => name.to_string(),
    }
}

/// Scalar types that are never expanded through entity mappings.
pub fn is_primitive_type_name(name: &str) -> bool {
    let name = name.trim_end_matches('?');
    matches!(
        name,
        "int" | "Integer" | "long" | "Long" | "short" | "Short" | "byte" | "Byte"
            | "boolean" | "Boolean" | "bool" | "char" | "Character" | "double" | "Double"
            | "float" | "Float" | "decimal" | "BigDecimal" | "BigInteger" | "String" | "string"
            | "Date" | "LocalDate" | "LocalDateTime" | "DateTime" | "DateTimeOffset" | "Guid"
            | "UUID" | "Int32" | "Int64" | "uint" | "ulong" | "object" | "Object"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_parameter_key_from_accessor() {
        assert_eq!(parameter_key("getFirstName"), "firstName");
        assert_eq!(parameter_key("getURL"), "uRL");
        assert_eq!(parameter_key("get"), "get");
        assert_eq!(parameter_key("name"), "name");
    }

    #[test]
    fn test_equality_ignores_optionality() {
        let a = ModelField::new("String", "getName", false);
        let b = ModelField::new("String", "name", true);
        assert_eq!(a, b);
        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_display() {
        assert_eq!(ModelField::new("int", "getAge", true).to_string(), "age:int?");
    }
}
