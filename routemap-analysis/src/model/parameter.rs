use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a parameter's value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ParameterSource {
    Query,
    Path,
    Body,
    Cookie,
    Session,
    #[default]
    Unknown,
}

impl fmt::Display for ParameterSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Query => "QUERY",
            Self::Path => "PATH",
            Self::Body => "BODY",
            Self::Cookie => "COOKIE",
            Self::Session => "SESSION",
            Self::Unknown => "UNKNOWN",
        })
    }
}

/// A declared request parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub data_type: Option<String>,
    pub source: ParameterSource,
    pub default_value: Option<String>,
    pub explicit_value: Option<String>,
}

/// Parameters keyed by name; keys are unique per endpoint.
pub type ParameterMap = BTreeMap<String, Parameter>;

impl Parameter {
    pub fn new(name: impl Into<String>, source: ParameterSource) -> Self {
        Self {
            name: name.into(),
            data_type: None,
            source,
            default_value: None,
            explicit_value: None,
        }
    }

    pub fn with_data_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = Some(data_type.into());
        self
    }

    pub fn with_default(mut self, default_value: impl Into<String>) -> Self {
        self.default_value = Some(default_value.into());
        self
    }

    /// Set the source only while it is still unknown. Returns whether it changed.
    pub fn narrow_source(&mut self, source: ParameterSource) -> bool {
        if self.source == ParameterSource::Unknown && source != ParameterSource::Unknown {
            self.source = source;
            true
        } else {
            false
        }
    }

    /// Fill the data type if none was recorded yet.
    pub fn fill_data_type(&mut self, data_type: &str) {
        if self.data_type.is_none() && !data_type.is_empty() {
            self.data_type = Some(data_type.to_string());
        }
    }
}

/// Insert `param`, merging into an existing entry without overwriting its
/// source or any value already set.
pub fn merge_parameter(map: &mut ParameterMap, param: Parameter) {
    match map.get_mut(&param.name) {
        Some(existing) => {
            existing.narrow_source(param.source);
            if let Some(dt) = &param.data_type {
                existing.fill_data_type(dt);
            }
            if existing.default_value.is_none() {
                existing.default_value = param.default_value;
            }
            if existing.explicit_value.is_none() {
                existing.explicit_value = param.explicit_value;
            }
        }
        None => {
            map.insert(param.name.clone(), param);
        }
    }
}
