//! ASP.NET MVC / Core routing over parsed classes.
//!
//! Attribute routes (`[Route]`, `[RoutePrefix]`, `[HttpGet("...")]`) win;
//! actions without any template fall back to the conventional
//! `/{area}/{controller}/{action}` route.

use routemap_core::types::Framework;

use super::attributes::Attribute;
use super::classes::{DotNetClass, DotNetMethod};
use super::parameters::DotNetParameter;
use super::syntax::{base_type_name, element_type_name};
use crate::aggregate::EndpointCandidate;
use crate::frameworks::ExtractionContext;
use crate::model::model_field::is_primitive_type_name;
use crate::model::path::{normalize_path, path_parameters};
use crate::model::{HttpMethod, ModelField, Parameter, ParameterSource};
use crate::scanner::types::SourceFile;

const VERB_ATTRIBUTES: &[(&str, HttpMethod)] = &[
    ("HttpGet", HttpMethod::Get),
    ("HttpPost", HttpMethod::Post),
    ("HttpPut", HttpMethod::Put),
    ("HttpDelete", HttpMethod::Delete),
    ("HttpPatch", HttpMethod::Patch),
    ("HttpHead", HttpMethod::Head),
    ("HttpOptions", HttpMethod::Options),
];

/// Types the framework injects rather than binds from the request.
const INJECTED_TYPES: &[&str] = &["CancellationToken", "HttpContext", "HttpRequest", "ClaimsPrincipal"];

const FILE_TYPES: &[&str] = &["IFormFile", "IFormFileCollection", "HttpPostedFileBase"];

pub fn is_controller(class: &DotNetClass) -> bool {
    if class.is_abstract || class.is_static || class.attribute("NonController").is_some() {
        return false;
    }
    class.name.ends_with("Controller")
        || class.attribute("ApiController").is_some()
        || class.attribute("Controller").is_some()
        || class
            .base_types
            .iter()
            .any(|b| base_type_name(b).contains("Controller"))
}

fn is_action(class: &DotNetClass, method: &DotNetMethod) -> bool {
    method.is_public
        && !method.is_static
        && method.name != class.name
        && !method.is_extension_method()
        && method.attribute("NonAction").is_none()
}

/// `Authorize`, `Authorize(Roles=Admin)`.
fn authorization_text(attribute: &Attribute) -> String {
    let named: Vec<String> = attribute
        .args
        .iter()
        .filter_map(|a| {
            let name = a.name.as_deref()?;
            Some(format!("{name}={}", a.literal().or(a.value.as_deref()).or(a.default_value.as_deref())?))
        })
        .chain(attribute.first_literal().map(|policy| format!("Policy={policy}")))
        .collect();
    if named.is_empty() {
        attribute.name.clone()
    } else {
        format!("{}({})", attribute.name, named.join(", "))
    }
}

fn authorization(attributes: &[Attribute]) -> Option<String> {
    let parts: Vec<String> = attributes
        .iter()
        .filter(|a| a.name == "Authorize")
        .map(authorization_text)
        .collect();
    (!parts.is_empty()).then(|| parts.join(" and "))
}

/// Replace `[controller]`, `[action]` and `[area]` route tokens.
fn replace_tokens(template: &str, controller: &str, action: &str, area: Option<&str>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('[') {
        out.push_str(&rest[..open]);
        let Some(len) = rest[open..].find(']') else {
            rest = &rest[open..];
            break;
        };
        let token = &rest[open + 1..open + len];
        match token.to_ascii_lowercase().as_str() {
            "controller" => out.push_str(controller),
            "action" => out.push_str(action),
            "area" => out.push_str(area.unwrap_or_default()),
            _ => out.push_str(&rest[open..=open + len]),
        }
        rest = &rest[open + len + 1..];
    }
    out.push_str(rest);
    out
}

fn is_absolute(template: &str) -> bool {
    template.starts_with('/') || template.starts_with("~/")
}

struct ClassRoutes<'c> {
    controller: &'c str,
    area: Option<&'c str>,
    prefixes: Vec<String>,
    route_prefix: Option<String>,
    authorization: Option<String>,
}

impl<'c> ClassRoutes<'c> {
    fn new(class: &'c DotNetClass, file: &SourceFile, ctx: &ExtractionContext<'_>) -> Self {
        let controller = class.name.strip_suffix("Controller").filter(|c| !c.is_empty()).unwrap_or(&class.name);
        let area = class
            .attribute("Area")
            .or_else(|| class.attribute("RouteArea"))
            .and_then(Attribute::first_literal);
        Self {
            controller,
            area,
            prefixes: literal_templates(class.attributes_named("Route"), file, ctx),
            route_prefix: class.attribute("RoutePrefix").and_then(Attribute::first_literal).map(str::to_string),
            authorization: authorization(&class.attributes),
        }
    }
}

/// Route templates of `attributes`; non-literal ones are reported and skipped.
fn literal_templates<'a>(
    attributes: impl Iterator<Item = &'a Attribute>,
    file: &SourceFile,
    ctx: &ExtractionContext<'_>,
) -> Vec<String> {
    let mut templates = Vec::new();
    for attribute in attributes {
        match attribute.first_literal().or_else(|| attribute.named("Template")) {
            Some(template) => templates.push(template.to_string()),
            None => {
                if let Some(raw) = attribute.raw_values().next() {
                    ctx.report_partial(
                        file,
                        attribute.line,
                        Framework::DotNet,
                        format!("non-literal route template `{raw}`"),
                    );
                }
            }
        }
    }
    templates
}

/// `[Route(...)]`, or a verb attribute given a template (`[HttpGet("{id}")]`).
fn carries_template(attribute: &Attribute) -> bool {
    if attribute.name == "Route" {
        return true;
    }
    VERB_ATTRIBUTES.iter().any(|(name, _)| *name == attribute.name)
        && (attribute.positional().next().is_some() || attribute.named_arg("Template").is_some())
}

fn verb_methods(method: &DotNetMethod) -> Vec<HttpMethod> {
    let mut methods = Vec::new();
    for attribute in &method.attributes {
        if let Some((_, verb)) = VERB_ATTRIBUTES.iter().find(|(name, _)| *name == attribute.name) {
            methods.push(*verb);
        } else if attribute.name == "AcceptVerbs" {
            for raw in attribute.raw_values() {
                for part in raw.split(['|', ',']) {
                    if let Some(verb) = HttpMethod::from_source(part) {
                        methods.push(verb);
                    }
                }
            }
        }
    }
    methods
}

/// Build candidates for every action of every controller in `classes`.
pub fn controller_candidates(
    file: &SourceFile,
    classes: &[DotNetClass],
    ctx: &ExtractionContext<'_>,
) -> Vec<EndpointCandidate> {
    let mut out = Vec::new();
    for class in classes.iter().filter(|c| is_controller(c)) {
        let routes = ClassRoutes::new(class, file, ctx);
        for method in class.methods.iter().filter(|m| is_action(class, m)) {
            out.push(action_candidate(file, class, method, &routes, ctx));
        }
    }
    out
}

fn action_candidate(
    file: &SourceFile,
    class: &DotNetClass,
    method: &DotNetMethod,
    routes: &ClassRoutes<'_>,
    ctx: &ExtractionContext<'_>,
) -> EndpointCandidate {
    let action = method
        .attribute("ActionName")
        .and_then(Attribute::first_literal)
        .unwrap_or_else(|| match method.name.strip_suffix("Async") {
            Some(stripped) if !stripped.is_empty() => stripped,
            _ => method.name.as_str(),
        });

    let templates = literal_templates(method.attributes.iter().filter(|a| carries_template(a)), file, ctx);

    let mut paths = Vec::new();
    if templates.is_empty() && !routes.prefixes.is_empty() {
        paths.extend(routes.prefixes.iter().cloned());
    } else if templates.is_empty() {
        // conventional routing
        let area = routes.area.map(|a| format!("{a}/")).unwrap_or_default();
        paths.push(format!("{area}{}/{action}", routes.controller));
    } else {
        let prefixes: Vec<&str> = if !routes.prefixes.is_empty() {
            routes.prefixes.iter().map(String::as_str).collect()
        } else {
            vec![routes.route_prefix.as_deref().unwrap_or("")]
        };
        for template in &templates {
            if is_absolute(template) {
                paths.push(template.trim_start_matches('~').to_string());
                continue;
            }
            for prefix in &prefixes {
                paths.push(format!("{prefix}/{template}"));
            }
        }
    }

    let mut candidate = EndpointCandidate::new(Framework::DotNet, file.path.clone(), file.relative_path.clone());
    for path in &paths {
        let path = normalize_path(&replace_tokens(path, routes.controller, action, routes.area));
        if !candidate.base_paths.contains(&path) {
            candidate.base_paths.push(path);
        }
    }
    candidate.methods = verb_methods(method);
    candidate.controller = Some(class.name.clone());
    candidate.action = Some(method.name.clone());
    candidate.start_line = method.start_line;
    candidate.end_line = method.end_line;
    if method.attribute("AllowAnonymous").is_none() {
        candidate.class_authorization = routes.authorization.clone();
        candidate.authorization = authorization(&method.attributes);
    }
    for attribute in &method.attributes {
        let list = match attribute.name.as_str() {
            "Consumes" => &mut candidate.consumes,
            "Produces" => &mut candidate.produces,
            _ => continue,
        };
        list.extend(attribute.positional().filter_map(DotNetParameter::literal).map(str::to_string));
    }

    let placeholders: Vec<String> = candidate
        .base_paths
        .iter()
        .flat_map(|p| path_parameters(p.as_str()))
        .map(|p| p.to_ascii_lowercase())
        .collect();
    for param in &method.parameters {
        bind_parameter(&mut candidate, param, &placeholders);
    }
    candidate
}

fn bind_parameter(candidate: &mut EndpointCandidate, param: &DotNetParameter, placeholders: &[String]) {
    let (Some(name), Some(type_name)) = (param.name.as_deref(), param.type_name.as_deref()) else {
        return;
    };
    if param.attribute("FromServices").is_some() || INJECTED_TYPES.contains(&base_type_name(type_name)) {
        return;
    }

    let binding = param.attributes.iter().find(|a| a.name.starts_with("From"));
    let name = binding.and_then(|a| a.named("Name")).unwrap_or(name);
    let is_simple = is_simple_type(type_name);

    let source = match binding.map(|a| a.name.as_str()) {
        Some("FromQuery" | "FromUri") => ParameterSource::Query,
        Some("FromRoute") => ParameterSource::Path,
        Some("FromHeader") => {
            candidate.headers.push(name.to_string());
            return;
        }
        Some("FromBody" | "FromForm") if is_simple || FILE_TYPES.contains(&base_type_name(type_name)) => {
            ParameterSource::Body
        }
        Some("FromBody" | "FromForm") => {
            bind_model(candidate, type_name, name, param);
            return;
        }
        _ if placeholders.contains(&name.to_ascii_lowercase()) => ParameterSource::Path,
        _ if is_simple => ParameterSource::Query,
        _ if FILE_TYPES.contains(&base_type_name(type_name)) => ParameterSource::Body,
        _ => {
            bind_model(candidate, type_name, name, param);
            return;
        }
    };

    let mut parameter = Parameter::new(name, source).with_data_type(type_name.trim_end_matches('?'));
    if let Some(default) = &param.default_value {
        parameter = parameter.with_default(default.trim_matches('"'));
    }
    candidate.add_parameter(parameter);
}

fn bind_model(candidate: &mut EndpointCandidate, type_name: &str, name: &str, param: &DotNetParameter) {
    if candidate.bound_model.is_some() {
        candidate.add_parameter(Parameter::new(name, ParameterSource::Body).with_data_type(type_name));
        return;
    }
    candidate.bound_model = Some(ModelField {
        field_type: type_name.to_string(),
        parameter_key: name.to_string(),
        is_optional: param.default_value.is_some() || type_name.ends_with('?'),
    });
}

fn is_simple_type(type_name: &str) -> bool {
    let element = element_type_name(type_name).unwrap_or(type_name);
    let name = base_type_name(element);
    is_primitive_type_name(name) || matches!(name, "TimeSpan" | "Uri" | "sbyte" | "ushort")
}
