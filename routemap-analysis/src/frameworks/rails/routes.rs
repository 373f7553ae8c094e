//! Arena tree of routing scopes.
//!
//! Nodes refer to their parent by index. Paths, controllers and modules are
//! never stored resolved: they are computed by walking parent indices when
//! endpoints are emitted, so a subtree can be cloned under a new parent
//! (`concerns`) and pick up the new ancestry for free.

use smallvec::{smallvec, SmallVec};

use routemap_core::types::collections::FxHashMap;
use routemap_core::types::Framework;

use crate::aggregate::EndpointCandidate;
use crate::model::path::join_paths;
use crate::model::HttpMethod;
use crate::scanner::types::SourceFile;

pub type Methods = SmallVec<[HttpMethod; 2]>;

pub const ROOT: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    /// Transparent block: `draw do`, `constraints do`, `if`, and friends.
    Block,
    Namespace,
    Scope,
    Controller,
    Resources,
    Resource,
    Member,
    Collection,
    Concern,
    Verb,
    RootRoute,
}

#[derive(Debug, Clone)]
pub struct RouteNode {
    pub kind: NodeKind,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub line: u32,
    pub name: String,
    /// Path fragment this node contributes, when it differs from `name`.
    pub path: Option<String>,
    pub controller: Option<String>,
    pub module: Option<String>,
    pub action: Option<String>,
    /// Identifier placeholder name for resources (`param:`), default `id`.
    pub param: Option<String>,
    /// Default actions a resource keeps after `only`/`except`.
    pub actions: Vec<&'static str>,
    pub methods: Methods,
}

impl RouteNode {
    pub fn new(kind: NodeKind, name: impl Into<String>, line: u32) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            line,
            name: name.into(),
            path: None,
            controller: None,
            module: None,
            action: None,
            param: None,
            actions: Vec::new(),
            methods: SmallVec::new(),
        }
    }

    fn id_param(&self) -> &str {
        self.param.as_deref().unwrap_or("id")
    }
}

/// Plural resource actions: (action, sub path, methods).
const PLURAL_ACTIONS: &[(&str, &str, &[HttpMethod])] = &[
    ("index", "", &[HttpMethod::Get]),
    ("create", "", &[HttpMethod::Post]),
    ("new", "new", &[HttpMethod::Get]),
    ("edit", ":id/edit", &[HttpMethod::Get]),
    ("show", ":id", &[HttpMethod::Get]),
    ("update", ":id", &[HttpMethod::Patch, HttpMethod::Put]),
    ("destroy", ":id", &[HttpMethod::Delete]),
];

const SINGULAR_ACTIONS: &[(&str, &str, &[HttpMethod])] = &[
    ("create", "", &[HttpMethod::Post]),
    ("new", "new", &[HttpMethod::Get]),
    ("edit", "edit", &[HttpMethod::Get]),
    ("show", "", &[HttpMethod::Get]),
    ("update", "", &[HttpMethod::Patch, HttpMethod::Put]),
    ("destroy", "", &[HttpMethod::Delete]),
];

pub fn default_actions(kind: NodeKind) -> &'static [(&'static str, &'static str, &'static [HttpMethod])] {
    match kind {
        NodeKind::Resources => PLURAL_ACTIONS,
        NodeKind::Resource => SINGULAR_ACTIONS,
        _ => &[],
    }
}

/// Methods accepted by `match ..., via: :all`.
pub fn all_methods() -> Methods {
    smallvec![
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
    ]
}

#[derive(Debug, Clone)]
pub struct RouteTree {
    nodes: Vec<RouteNode>,
    concerns: FxHashMap<String, usize>,
}

impl Default for RouteTree {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![RouteNode::new(NodeKind::Root, "", 0)],
            concerns: FxHashMap::default(),
        }
    }

    pub fn node(&self, idx: usize) -> &RouteNode {
        &self.nodes[idx]
    }

    pub fn node_mut(&mut self, idx: usize) -> &mut RouteNode {
        &mut self.nodes[idx]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Attach `node` under `parent` and return its index.
    pub fn add(&mut self, parent: usize, mut node: RouteNode) -> usize {
        let idx = self.nodes.len();
        node.parent = Some(parent);
        node.children.clear();
        if node.kind == NodeKind::Concern {
            self.concerns.insert(node.name.clone(), idx);
        }
        self.nodes.push(node);
        self.nodes[parent].children.push(idx);
        idx
    }

    pub fn concern(&self, name: &str) -> Option<usize> {
        self.concerns.get(name).copied()
    }

    /// Copy the children of `source` (recursively) under `target`.
    pub fn clone_children(&mut self, source: usize, target: usize) {
        // Snapshot first: cloning into a descendant of `source` must not loop.
        let children = self.nodes[source].children.clone();
        for child in children {
            let mut copy = self.nodes[child].clone();
            // A cloned concern definition is not a new definition.
            if copy.kind == NodeKind::Concern {
                copy.kind = NodeKind::Block;
            }
            let new_idx = self.add(target, copy);
            self.clone_children(child, new_idx);
        }
    }

    /// Indices from `idx` up to the root, `idx` first.
    pub fn ancestors(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(Some(idx), move |&i| self.nodes[i].parent)
    }

    /// Path of a resource itself (`/photos`), excluding any identifier.
    pub fn resource_path(&self, idx: usize) -> String {
        let node = &self.nodes[idx];
        let fragment = node.path.as_deref().unwrap_or(&node.name);
        let parent = node.parent.map(|p| self.child_prefix(p)).unwrap_or_default();
        join_paths(&parent, fragment)
    }

    /// Path under which the children of `idx` are declared.
    pub fn child_prefix(&self, idx: usize) -> String {
        let node = &self.nodes[idx];
        let parent = || node.parent.map(|p| self.child_prefix(p)).unwrap_or_default();
        match node.kind {
            NodeKind::Root => String::new(),
            NodeKind::Resources => {
                let nested = format!(":{}_{}", singularize(&node.name), node.id_param());
                join_paths(&self.resource_path(idx), &nested)
            }
            NodeKind::Resource => self.resource_path(idx),
            NodeKind::Member => match node.parent.map(|p| (p, self.nodes[p].kind)) {
                Some((p, NodeKind::Resources)) => {
                    join_paths(&self.resource_path(p), &format!(":{}", self.nodes[p].id_param()))
                }
                Some((p, NodeKind::Resource)) => self.resource_path(p),
                _ => parent(),
            },
            NodeKind::Collection => match node.parent {
                Some(p) if matches!(self.nodes[p].kind, NodeKind::Resources | NodeKind::Resource) => {
                    self.resource_path(p)
                }
                _ => parent(),
            },
            NodeKind::Namespace => join_paths(&parent(), node.path.as_deref().unwrap_or(&node.name)),
            NodeKind::Scope => join_paths(&parent(), node.path.as_deref().unwrap_or("")),
            _ => parent(),
        }
    }

    /// Controller modules from the root down to `idx`, `/`-joined.
    pub fn module_chain(&self, idx: usize) -> Option<String> {
        let mut modules: Vec<&str> = self
            .ancestors(idx)
            .filter_map(|i| self.nodes[i].module.as_deref())
            .flat_map(|m| m.split('/').rev())
            .filter(|m| !m.is_empty())
            .collect();
        if modules.is_empty() {
            return None;
        }
        modules.reverse();
        Some(modules.join("/"))
    }

    /// Nearest controller declared at or above `idx`.
    pub fn scope_controller(&self, idx: usize) -> Option<&str> {
        self.ancestors(idx).find_map(|i| self.nodes[i].controller.as_deref())
    }

    fn qualified_controller(&self, idx: usize, controller: &str) -> String {
        match self.module_chain(idx) {
            Some(modules) => format!("{modules}/{controller}"),
            None => controller.to_string(),
        }
    }

    /// Emit one candidate per routable node, in declaration order.
    pub fn candidates(&self, file: &SourceFile) -> Vec<EndpointCandidate> {
        let mut out = Vec::new();
        let mut stack = vec![ROOT];
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];
            if node.kind == NodeKind::Concern {
                continue;
            }
            self.emit(idx, file, &mut out);
            stack.extend(node.children.iter().rev());
        }
        out
    }

    fn emit(&self, idx: usize, file: &SourceFile, out: &mut Vec<EndpointCandidate>) {
        let node = &self.nodes[idx];
        let candidate = |base: String, sub: &str, methods: &[HttpMethod], controller: Option<&str>, action: Option<&str>| {
            let mut candidate = EndpointCandidate::new(Framework::Rails, file.path.clone(), file.relative_path.clone());
            candidate.base_paths.push(base);
            candidate.sub_paths.push(sub.to_string());
            candidate.methods.extend_from_slice(methods);
            candidate.controller = controller.map(|c| self.qualified_controller(idx, c));
            candidate.action = action.map(str::to_string);
            candidate.start_line = node.line;
            candidate.end_line = node.line;
            candidate
        };
        match node.kind {
            NodeKind::Resources | NodeKind::Resource => {
                let base = self.resource_path(idx);
                let id = format!(":{}", node.id_param());
                for (action, sub, methods) in default_actions(node.kind) {
                    if !node.actions.contains(action) {
                        continue;
                    }
                    let sub = sub.replacen(":id", &id, 1);
                    out.push(candidate(base.clone(), &sub, methods, node.controller.as_deref(), Some(*action)));
                }
            }
            NodeKind::Verb => {
                let base = node.parent.map(|p| self.child_prefix(p)).unwrap_or_default();
                let controller = node.controller.as_deref().or_else(|| self.scope_controller(idx));
                out.push(candidate(
                    base,
                    node.path.as_deref().unwrap_or(""),
                    &node.methods,
                    controller,
                    node.action.as_deref(),
                ));
            }
            NodeKind::RootRoute => {
                let base = node.parent.map(|p| self.child_prefix(p)).unwrap_or_default();
                let controller = node.controller.as_deref().or_else(|| self.scope_controller(idx));
                out.push(candidate(base, "", &[HttpMethod::Get], controller, node.action.as_deref()));
            }
            _ => {}
        }
    }
}

/// `photo` -> `photos`, `category` -> `categories`, `box` -> `boxes`.
pub fn pluralize(word: &str) -> String {
    if word.ends_with('s') {
        return word.to_string();
    }
    if let Some(stem) = word.strip_suffix('y') {
        if !stem.ends_with(['a', 'e', 'i', 'o', 'u']) {
            return format!("{stem}ies");
        }
    }
    if word.ends_with(['x', 'z']) || word.ends_with("ch") || word.ends_with("sh") {
        return format!("{word}es");
    }
    format!("{word}s")
}

/// Inverse of [`pluralize`] for the regular cases.
pub fn singularize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("ies") {
        return format!("{stem}y");
    }
    for suffix in ["xes", "zes", "ches", "shes", "sses"] {
        if word.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }
    match word.strip_suffix('s') {
        Some(stem) if !stem.ends_with('s') => stem.to_string(),
        _ => word.to_string(),
    }
}
