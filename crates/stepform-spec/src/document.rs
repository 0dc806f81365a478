use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validity::ValidityReport;

/// Handle to an element inside a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Serializable description of an element subtree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeSpec {
    pub tag: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default)]
    pub checked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSpec>,
}

impl NodeSpec {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn checked(mut self) -> Self {
        self.checked = true;
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn child(mut self, child: NodeSpec) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = NodeSpec>) -> Self {
        self.children.extend(children);
        self
    }
}

/// Live state of a single element.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attrs: BTreeMap<String, String>,
    pub value: String,
    pub checked: bool,
    pub text: String,
    pub style: BTreeMap<String, String>,
}

impl Element {
    fn from_spec(spec: &NodeSpec) -> Self {
        let tag = spec.tag.to_ascii_lowercase();
        let kind = spec
            .attrs
            .get("type")
            .map(|kind| kind.to_ascii_lowercase())
            .unwrap_or_default();
        let value = spec
            .value
            .clone()
            .or_else(|| spec.attrs.get("value").cloned())
            .unwrap_or_else(|| {
                if tag == "input" && (kind == "checkbox" || kind == "radio") {
                    "on".to_string()
                } else {
                    String::new()
                }
            });
        Self {
            tag,
            attrs: spec.attrs.clone(),
            value,
            checked: spec.checked || spec.attrs.contains_key("checked"),
            text: spec.text.clone().unwrap_or_default(),
            style: BTreeMap::new(),
        }
    }

    /// Lower-cased `type` attribute, empty when absent.
    pub fn input_type(&self) -> String {
        self.attrs
            .get("type")
            .map(|kind| kind.to_ascii_lowercase())
            .unwrap_or_default()
    }

    pub fn is_control(&self) -> bool {
        matches!(self.tag.as_str(), "input" | "select" | "textarea")
    }

    pub fn name(&self) -> Option<&str> {
        self.attrs.get("name").map(String::as_str)
    }
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    element: Element,
}

/// What changed in a host-side mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    Value,
    Checked,
    ChildList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MutationRecord {
    pub target: NodeId,
    pub kind: MutationKind,
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("document json parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("node {0:?} does not belong to this document")]
    UnknownNode(NodeId),
    #[error("the document root cannot be detached")]
    DetachRoot,
    #[error("node {0:?} cannot be attached inside its own subtree")]
    CyclicAttach(NodeId),
}

/// In-memory element tree the engine observes and mutates.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    focused: Option<NodeId>,
    last_report: Option<ValidityReport>,
    mutations: Vec<MutationRecord>,
}

impl Document {
    pub fn new(root: &NodeSpec) -> Self {
        let mut document = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            focused: None,
            last_report: None,
            mutations: Vec::new(),
        };
        document.root = document.build(None, root);
        document
    }

    pub fn from_json(raw: &str) -> Result<Self, DocumentError> {
        let spec: NodeSpec = serde_json::from_str(raw)?;
        Ok(Self::new(&spec))
    }

    fn build(&mut self, parent: Option<NodeId>, spec: &NodeSpec) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            element: Element::from_spec(spec),
        });
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }
        for child in &spec.children {
            self.build(Some(id), child);
        }
        id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.nodes.get(id.0).map(|node| &node.element)
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        self.nodes.get_mut(id.0).map(|node| &mut node.element)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|node| node.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
    }

    /// Descendants of `scope` (excluding it) in document order.
    pub fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(scope).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    pub fn query_all<F>(&self, scope: NodeId, predicate: F) -> Vec<NodeId>
    where
        F: Fn(&Element) -> bool,
    {
        self.descendants(scope)
            .into_iter()
            .filter(|id| self.element(*id).is_some_and(&predicate))
            .collect()
    }

    pub fn query_first<F>(&self, scope: NodeId, predicate: F) -> Option<NodeId>
    where
        F: Fn(&Element) -> bool,
    {
        self.query_all(scope, predicate).into_iter().next()
    }

    /// First descendant carrying `name`, optionally with an exact value.
    pub fn query_attr(&self, scope: NodeId, name: &str, value: Option<&str>) -> Option<NodeId> {
        self.query_first(scope, |element| match (element.attrs.get(name), value) {
            (Some(actual), Some(expected)) => actual == expected,
            (Some(_), None) => true,
            (None, _) => false,
        })
    }

    pub fn query_all_with_attr(&self, scope: NodeId, name: &str) -> Vec<NodeId> {
        self.query_all(scope, |element| element.attrs.contains_key(name))
    }

    /// Form controls (`input`, `select`, `textarea`) below `scope`.
    pub fn controls(&self, scope: NodeId) -> Vec<NodeId> {
        self.query_all(scope, Element::is_control)
    }

    pub fn controls_named(&self, scope: NodeId, name: &str) -> Vec<NodeId> {
        self.query_all(scope, |element| {
            element.is_control() && element.name() == Some(name)
        })
    }

    pub fn is_control(&self, id: NodeId) -> bool {
        self.element(id).is_some_and(Element::is_control)
    }

    /// Inclusive ancestor check.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    /// Nearest inclusive ancestor matching `predicate`.
    pub fn closest<F>(&self, node: NodeId, predicate: F) -> Option<NodeId>
    where
        F: Fn(&Element) -> bool,
    {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if self.element(current).is_some_and(&predicate) {
                return Some(current);
            }
            cursor = self.parent(current);
        }
        None
    }

    pub fn is_connected(&self, node: NodeId) -> bool {
        self.contains(self.root, node)
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)
            .and_then(|element| element.attrs.get(name))
            .map(String::as_str)
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.element(id)
            .is_some_and(|element| element.attrs.contains_key(name))
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let Some(element) = self.element_mut(id) {
            element.attrs.insert(name.to_string(), value.into());
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let Some(element) = self.element_mut(id) {
            element.attrs.remove(name);
        }
    }

    pub fn style(&self, id: NodeId, property: &str) -> Option<&str> {
        self.element(id)
            .and_then(|element| element.style.get(property))
            .map(String::as_str)
    }

    pub fn set_style(&mut self, id: NodeId, property: &str, value: impl Into<String>) {
        if let Some(element) = self.element_mut(id) {
            element.style.insert(property.to_string(), value.into());
        }
    }

    pub fn set_display(&mut self, id: NodeId, display: &str) {
        self.set_style(id, "display", display);
    }

    pub fn text(&self, id: NodeId) -> &str {
        self.element(id)
            .map(|element| element.text.as_str())
            .unwrap_or_default()
    }

    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        if let Some(element) = self.element_mut(id) {
            element.text = text.into();
        }
    }

    pub fn value(&self, id: NodeId) -> &str {
        self.element(id)
            .map(|element| element.value.as_str())
            .unwrap_or_default()
    }

    pub fn set_value(&mut self, id: NodeId, value: impl Into<String>) {
        if let Some(element) = self.element_mut(id) {
            element.value = value.into();
            self.mutations.push(MutationRecord {
                target: id,
                kind: MutationKind::Value,
            });
        }
    }

    pub fn is_checked(&self, id: NodeId) -> bool {
        self.element(id).is_some_and(|element| element.checked)
    }

    /// Sets the checked state; checking a radio unchecks the rest of its group.
    pub fn set_checked(&mut self, id: NodeId, checked: bool) {
        let Some(element) = self.element(id) else {
            return;
        };
        if checked && element.input_type() == "radio" {
            for other in self.radio_group(id) {
                if other != id
                    && let Some(peer) = self.element_mut(other)
                {
                    peer.checked = false;
                }
            }
        }
        if let Some(element) = self.element_mut(id) {
            element.checked = checked;
            self.mutations.push(MutationRecord {
                target: id,
                kind: MutationKind::Checked,
            });
        }
    }

    /// Radios sharing the name of `id` within the same form (or the whole document).
    pub fn radio_group(&self, id: NodeId) -> Vec<NodeId> {
        let Some(name) = self.element(id).and_then(Element::name) else {
            return vec![id];
        };
        let owner = self
            .closest(id, |element| element.tag == "form")
            .unwrap_or(self.root);
        self.query_all(owner, |element| {
            element.tag == "input" && element.input_type() == "radio" && element.name() == Some(name)
        })
    }

    /// True when the element itself hides its subtree.
    pub fn hides_itself(&self, id: NodeId) -> bool {
        self.element(id).is_none_or(|element| {
            element.style.get("display").is_some_and(|display| display == "none")
                || element.attrs.contains_key("hidden")
                || (element.tag == "input" && element.input_type() == "hidden")
        })
    }

    /// Whether the element would occupy layout: connected and no hidden ancestor.
    pub fn is_rendered(&self, id: NodeId) -> bool {
        if !self.is_connected(id) {
            return false;
        }
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if self.hides_itself(current) {
                return false;
            }
            cursor = self.parent(current);
        }
        true
    }

    /// Whether `id` is shown relative to `boundary`: no hidden element on the path
    /// from `id` up to, but excluding, `boundary`.
    pub fn is_rendered_within(&self, id: NodeId, boundary: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == boundary {
                return true;
            }
            if self.hides_itself(current) {
                return false;
            }
            cursor = self.parent(current);
        }
        false
    }

    pub fn append_child(&mut self, parent: NodeId, spec: &NodeSpec) -> Result<NodeId, DocumentError> {
        if self.element(parent).is_none() {
            return Err(DocumentError::UnknownNode(parent));
        }
        let id = self.build(Some(parent), spec);
        self.mutations.push(MutationRecord {
            target: parent,
            kind: MutationKind::ChildList,
        });
        Ok(id)
    }

    /// Detaches `id` from its parent. The node stays addressable but disconnected.
    pub fn remove(&mut self, id: NodeId) -> Result<(), DocumentError> {
        if id == self.root {
            return Err(DocumentError::DetachRoot);
        }
        let parent = self
            .nodes
            .get(id.0)
            .ok_or(DocumentError::UnknownNode(id))?
            .parent;
        if let Some(parent) = parent {
            self.nodes[parent.0].children.retain(|child| *child != id);
            self.nodes[id.0].parent = None;
            self.mutations.push(MutationRecord {
                target: parent,
                kind: MutationKind::ChildList,
            });
        }
        if self.focused.is_some_and(|focused| !self.is_connected(focused)) {
            self.focused = None;
        }
        Ok(())
    }

    /// Moves `id` (with its subtree) to the end of `parent`'s children. Works for
    /// detached nodes, which is how callers recycle nodes they removed earlier.
    pub fn reattach(&mut self, parent: NodeId, id: NodeId) -> Result<(), DocumentError> {
        if self.element(parent).is_none() {
            return Err(DocumentError::UnknownNode(parent));
        }
        if self.element(id).is_none() {
            return Err(DocumentError::UnknownNode(id));
        }
        if self.contains(id, parent) {
            return Err(DocumentError::CyclicAttach(id));
        }
        if self.parent(id).is_some() {
            self.remove(id)?;
        }
        self.nodes[parent.0].children.push(id);
        self.nodes[id.0].parent = Some(parent);
        self.mutations.push(MutationRecord {
            target: parent,
            kind: MutationKind::ChildList,
        });
        Ok(())
    }

    /// Nodes allocated in the arena, attached or not. Removal never frees a slot.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn find_by_id(&self, id_attr: &str) -> Option<NodeId> {
        if self.attr(self.root, "id") == Some(id_attr) {
            return Some(self.root);
        }
        self.query_attr(self.root, "id", Some(id_attr))
    }

    pub fn focus(&mut self, id: NodeId) {
        if self.element(id).is_some() {
            self.focused = Some(id);
        }
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    pub fn record_report(&mut self, report: ValidityReport) {
        self.last_report = Some(report);
    }

    pub fn last_report(&self) -> Option<&ValidityReport> {
        self.last_report.as_ref()
    }

    pub fn clear_report(&mut self) {
        self.last_report = None;
    }

    /// Drains the host-side mutation log.
    pub fn take_mutations(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.mutations)
    }
}
