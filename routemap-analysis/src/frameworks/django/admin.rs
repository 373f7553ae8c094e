//! Django admin registrations.
//!
//! A deliberately tiny evaluator: it knows variables, string and list
//! literals, `ModelAdmin` subclasses with attribute assignments, member
//! assignment (`Admin.search_fields = [...]`) and exactly two calls,
//! `admin.site.register(...)` and the `@admin.register(...)` decorator.
//! Anything else evaluates to `Unknown` and is ignored.

use routemap_core::types::collections::FxHashMap;
use routemap_core::types::Framework;

use super::python::{line_indents, statements, Imports};
use crate::aggregate::EndpointCandidate;
use crate::model::path::join_paths;
use crate::model::{HttpMethod, ModelField, Parameter, ParameterSource};
use crate::scanner::types::SourceFile;
use crate::scope::{matching_close, split_args};
use crate::tokenizer::Token;

const STAFF_ONLY: &str = "is_staff";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Value {
    AdminSite,
    AdminClass(String),
    Model(String),
    Str(String),
    List(Vec<Value>),
    Unknown,
}

#[derive(Debug, Default)]
struct AdminClass {
    members: FxHashMap<String, Value>,
}

/// One `Model` registered with the default admin site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub model: String,
    pub admin_class: Option<String>,
    pub search_fields: Vec<String>,
    pub list_filter: Vec<String>,
    pub line: u32,
}

#[derive(Default)]
struct Evaluator {
    imports: Imports,
    variables: FxHashMap<String, Value>,
    classes: FxHashMap<String, AdminClass>,
    /// (model, admin class, line) in registration order.
    registered: Vec<(String, Option<String>, u32)>,
    decorator_models: Vec<Value>,
    /// Admin class whose body is being read, with its indent.
    open_class: Option<(String, usize)>,
}

/// Evaluate an `admin.py` module.
pub fn evaluate(source: &str, tokens: &[Token]) -> Vec<Registration> {
    let indents = line_indents(source);
    let mut eval = Evaluator::default();
    for stmt in statements(tokens) {
        let Some(first) = stmt.first() else { continue };
        let indent = indents
            .get((first.line as usize).saturating_sub(1))
            .copied()
            .unwrap_or(0);
        eval.statement(stmt, indent);
    }
    eval.finish()
}

impl Evaluator {
    fn statement(&mut self, stmt: &[Token], indent: usize) {
        if let Some((_, class_indent)) = &self.open_class {
            if indent <= *class_indent {
                self.open_class = None;
            }
        }
        if self.imports.record(stmt) {
            return;
        }
        match stmt {
            [at, rest @ ..] if at.is_punct('@') => {
                if let Some((callee, args)) = call(rest) {
                    if self.is_register(callee, true) {
                        let models: Vec<Value> = args.iter().map(|arg| self.eval(arg)).collect();
                        self.decorator_models.extend(models);
                    }
                }
            }
            [kw, name, ..] if kw.is_word("class") => {
                let Some(name) = name.word() else { return };
                let models = std::mem::take(&mut self.decorator_models);
                if !stmt.iter().any(|t| t.word().is_some_and(|w| w.ends_with("ModelAdmin"))) {
                    return;
                }
                self.classes.entry(name.to_string()).or_default();
                self.open_class = Some((name.to_string(), indent));
                for model in models {
                    self.register(&model, Some(name), stmt[0].line);
                }
            }
            [target, eq, value @ ..] if eq.is_punct('=') && !value.first().is_some_and(|t| t.is_punct('=')) => {
                let Some(target) = target.word() else { return };
                let value = self.eval(value);
                self.assign(target, value);
            }
            _ => {
                if let Some((callee, args)) = call(stmt) {
                    if self.is_register(callee, false) {
                        let model = args.first().map(|a| self.eval(a)).unwrap_or(Value::Unknown);
                        let admin = match args.get(1).map(|a| self.eval(a)) {
                            Some(Value::AdminClass(name)) => Some(name),
                            _ => None,
                        };
                        self.register(&model, admin.as_deref(), stmt[0].line);
                    }
                }
            }
        }
    }

    /// `admin.site.register` for calls, `admin.register` for decorators.
    fn is_register(&self, callee: &str, decorator: bool) -> bool {
        let Some(receiver) = callee.strip_suffix(".register").or_else(|| (callee == "register").then_some("")) else {
            return false;
        };
        if decorator {
            let qualified = self.imports.resolve(if receiver.is_empty() { "register" } else { receiver });
            return receiver == "admin" || qualified.starts_with("django.contrib.admin");
        }
        self.lookup(receiver) == Value::AdminSite
    }

    fn assign(&mut self, target: &str, value: Value) {
        if let Some((class, _)) = &self.open_class {
            if let Some(admin) = self.classes.get_mut(class) {
                admin.members.insert(target.to_string(), value);
            }
            return;
        }
        if let Some((owner, member)) = target.rsplit_once('.') {
            if let Some(admin) = self.classes.get_mut(owner) {
                admin.members.insert(member.to_string(), value);
            }
            return;
        }
        self.variables.insert(target.to_string(), value);
    }

    fn register(&mut self, model: &Value, admin: Option<&str>, line: u32) {
        match model {
            Value::Model(name) => self.registered.push((name.clone(), admin.map(str::to_string), line)),
            Value::List(items) => {
                for item in items {
                    self.register(item, admin, line);
                }
            }
            _ => {}
        }
    }

    fn lookup(&self, name: &str) -> Value {
        if let Some(value) = self.variables.get(name) {
            return value.clone();
        }
        if self.classes.contains_key(name) {
            return Value::AdminClass(name.to_string());
        }
        let qualified = self.imports.resolve(name);
        if name == "admin.site" || name == "site" || qualified == "django.contrib.admin.site" {
            return Value::AdminSite;
        }
        Value::Unknown
    }

    fn eval(&self, tokens: &[Token]) -> Value {
        match tokens {
            [] => Value::Unknown,
            [single] => {
                if let Some(text) = single.quoted() {
                    return Value::Str(text.to_string());
                }
                let Some(name) = single.word() else {
                    return Value::Unknown;
                };
                match self.lookup(name) {
                    Value::Unknown if is_model_name(name) => {
                        Value::Model(name.rsplit('.').next().unwrap_or(name).to_string())
                    }
                    value => value,
                }
            }
            [open, ..] if open.is_punct('[') || open.is_punct('(') => {
                let close = matching_close(tokens, 0).unwrap_or(tokens.len());
                Value::List(
                    split_args(&tokens[1..close])
                        .into_iter()
                        .filter(|arg| !arg.is_empty())
                        .map(|arg| self.eval(arg))
                        .collect(),
                )
            }
            _ => Value::Unknown,
        }
    }

    fn finish(self) -> Vec<Registration> {
        self.registered
            .iter()
            .map(|(model, admin_class, line)| {
                let members = admin_class.as_ref().and_then(|c| self.classes.get(c)).map(|c| &c.members);
                let member = |name: &str| members.and_then(|m| m.get(name));
                Registration {
                    model: model.clone(),
                    admin_class: admin_class.clone(),
                    search_fields: strings(member("search_fields")),
                    list_filter: strings(member("list_filter")),
                    line: *line,
                }
            })
            .collect()
    }
}

/// `callee(args)` spanning the whole of `tokens`.
fn call(tokens: &[Token]) -> Option<(&str, Vec<&[Token]>)> {
    let callee = tokens.first()?.word()?;
    if !tokens.get(1)?.is_punct('(') {
        return None;
    }
    let close = matching_close(tokens, 1)?;
    Some((callee, split_args(&tokens[2..close])))
}

/// Class names start upper-case: `Article`, `blog.models.Article`.
fn is_model_name(name: &str) -> bool {
    name.rsplit('.')
        .next()
        .and_then(|last| last.chars().next())
        .is_some_and(char::is_uppercase)
}

/// String entries; for tuples such as `('author', AuthorFilter)` the first string.
fn strings(value: Option<&Value>) -> Vec<String> {
    let Some(Value::List(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::Str(s) => Some(s.clone()),
            Value::List(inner) => inner.iter().find_map(|v| match v {
                Value::Str(s) => Some(s.clone()),
                _ => None,
            }),
            _ => None,
        })
        .collect()
}

/// Changelist, add, change, delete and history endpoints for every
/// registration, mounted under `prefix` (where `admin.site.urls` is routed).
pub fn admin_candidates(file: &SourceFile, prefix: &str, registrations: &[Registration]) -> Vec<EndpointCandidate> {
    let app = file.relative_dir().rsplit('/').next().unwrap_or_default();
    let mut out = Vec::new();
    for registration in registrations {
        let model = registration.model.to_lowercase();
        let base = join_paths(prefix, &format!("{app}/{model}"));
        let controller = registration
            .admin_class
            .clone()
            .unwrap_or_else(|| "ModelAdmin".to_string());
        let bound = ModelField {
            field_type: registration.model.clone(),
            parameter_key: model.clone(),
            is_optional: false,
        };

        let route = |sub: &str, action: &str, methods: &[HttpMethod]| {
            let mut candidate = EndpointCandidate::new(Framework::Django, file.path.clone(), file.relative_path.clone());
            candidate.base_paths.push(base.clone());
            candidate.sub_paths.push(sub.to_string());
            candidate.methods.extend_from_slice(methods);
            candidate.controller = Some(controller.clone());
            candidate.action = Some(action.to_string());
            candidate.authorization = Some(STAFF_ONLY.to_string());
            candidate.start_line = registration.line;
            candidate.end_line = registration.line;
            candidate
        };

        let mut changelist = route("", "changelist_view", &[HttpMethod::Get]);
        if !registration.search_fields.is_empty() {
            changelist.add_parameter(Parameter::new("q", ParameterSource::Query));
        }
        for filter in &registration.list_filter {
            changelist.add_parameter(Parameter::new(filter.as_str(), ParameterSource::Query));
        }
        changelist.add_parameter(Parameter::new("o", ParameterSource::Query));
        changelist.add_parameter(Parameter::new("p", ParameterSource::Query).with_data_type("int"));
        out.push(changelist);

        let mut add = route("add", "add_view", &[HttpMethod::Get, HttpMethod::Post]);
        add.bound_model = Some(bound.clone());
        out.push(add);

        let mut change = route("{object_id}/change", "change_view", &[HttpMethod::Get, HttpMethod::Post]);
        change.bound_model = Some(bound);
        out.push(change);

        out.push(route("{object_id}/delete", "delete_view", &[HttpMethod::Get, HttpMethod::Post]));
        out.push(route("{object_id}/history", "history_view", &[HttpMethod::Get]));
    }
    out
}
