use std::path::PathBuf;

use routemap_core::types::Framework;
use serde::{Deserialize, Serialize};

use super::http_method::HttpMethod;
use super::model_field::ModelField;
use super::parameter::ParameterMap;
use super::path;

/// One HTTP-reachable route recovered from source.
///
/// `variants` share this endpoint's declaration site but differ in method
/// and/or path; the primary is the first combination built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub framework: Framework,
    pub file_path: PathBuf,
    pub relative_file_path: String,
    pub http_method: HttpMethod,
    pub path_template: String,
    pub start_line: u32,
    pub end_line: u32,
    pub parameters: ParameterMap,
    pub bound_model: Option<ModelField>,
    pub authorization: Option<String>,
    /// Controller/class/view the route dispatches to.
    pub controller: Option<String>,
    /// Method or action name within the controller.
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub consumes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub produces: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<Endpoint>,
}

/// De-duplication identity: `(relative file, path, method)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointKey {
    pub relative_file_path: String,
    pub path_template: String,
    pub http_method: HttpMethod,
}

impl Endpoint {
    pub fn key(&self) -> EndpointKey {
        EndpointKey {
            relative_file_path: self.relative_file_path.clone(),
            path_template: self.path_template.clone(),
            http_method: self.http_method,
        }
    }

    pub fn add_variant(&mut self, variant: Endpoint) {
        self.variants.push(variant);
    }

    /// This endpoint followed by its variants.
    pub fn all_variants(&self) -> impl Iterator<Item = &Endpoint> {
        std::iter::once(self).chain(self.variants.iter())
    }

    /// Distinct methods across this endpoint and its variants, in order.
    pub fn http_methods(&self) -> Vec<HttpMethod> {
        let mut methods = Vec::new();
        for e in self.all_variants() {
            if !methods.contains(&e.http_method) {
                methods.push(e.http_method);
            }
        }
        methods
    }

    pub fn matches_path(&self, url: &str) -> bool {
        path::template_matches(&self.path_template, url)
    }

    /// Whether `line` falls inside the declaration's line range.
    pub fn contains_line(&self, line: u32) -> bool {
        line >= self.start_line && line <= self.end_line
    }
}

#[cfg(test)]
pub(crate) fn test_endpoint(path: &str, method: HttpMethod) -> Endpoint {
    Endpoint {
        framework: Framework::Spring,
        file_path: PathBuf::from("/src/UserController.java"),
        relative_file_path: "UserController.java".to_string(),
        http_method: method,
        path_template: path.to_string(),
        start_line: 10,
        end_line: 20,
        parameters: ParameterMap::new(),
        bound_model: None,
        authorization: None,
        controller: None,
        action: None,
        consumes: Vec::new(),
        produces: Vec::new(),
        headers: Vec::new(),
        variants: Vec::new(),
    }
}
