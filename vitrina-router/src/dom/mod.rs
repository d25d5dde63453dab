//! Minimal document model the router, annotator and widgets operate on.
//!
//! Nodes live in an arena owned by [`Document`] and are addressed by
//! [`NodeId`]. [`Document::remove`] frees a subtree and its slots are reused;
//! each slot carries a generation, so an id kept past removal resolves to
//! nothing instead of to whatever took its place.

mod parse;

pub use parse::{parse_document, parse_fragment, parse_template};

use std::collections::BTreeMap;
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    slot: u32,
    generation: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    tag: String,
    attrs: BTreeMap<String, String>,
    styles: BTreeMap<String, String>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            ..Self::default()
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.contains_key(name)
    }

    pub fn attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or_default().split_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    pub fn style(&self, prop: &str) -> Option<&str> {
        self.styles.get(prop).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// The page document: `<html>` with a `<head>` and a `<body>`.
#[derive(Debug)]
pub struct Document {
    slots: Vec<Slot>,
    free: Vec<u32>,
    html: NodeId,
    head: NodeId,
    body: NodeId,
    focused: Option<NodeId>,
    mutations: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

const VOID_TAGS: &[&str] = &["area", "br", "hr", "img", "input", "link", "meta", "source"];

impl Document {
    pub fn new() -> Self {
        let root = NodeId {
            slot: 0,
            generation: 0,
        };
        let mut doc = Self {
            slots: Vec::new(),
            free: Vec::new(),
            html: root,
            head: root,
            body: root,
            focused: None,
            mutations: 0,
        };
        doc.html = doc.create_element("html");
        doc.head = doc.create_element("head");
        doc.body = doc.create_element("body");
        doc.append_child(doc.html, doc.head);
        doc.append_child(doc.html, doc.body);
        doc.mutations = 0;
        doc
    }

    pub fn html(&self) -> NodeId {
        self.html
    }

    pub fn head(&self) -> NodeId {
        self.head
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    /// Number of observable changes applied so far.
    pub fn mutations(&self) -> u64 {
        self.mutations
    }

    /// Nodes currently allocated, attached or not.
    pub fn live_nodes(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let node = Node {
            data,
            parent: None,
            children: Vec::new(),
        };
        if let Some(slot) = self.free.pop() {
            let entry = &mut self.slots[slot as usize];
            entry.node = Some(node);
            return NodeId {
                slot,
                generation: entry.generation,
            };
        }
        let slot = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId { slot, generation: 0 }
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        let entry = self.slots.get(id.slot as usize)?;
        if entry.generation != id.generation {
            return None;
        }
        entry.node.as_ref()
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let entry = self.slots.get_mut(id.slot as usize)?;
        if entry.generation != id.generation {
            return None;
        }
        entry.node.as_mut()
    }

    /// Whether `node` still refers to an allocated node.
    pub fn is_alive(&self, node: NodeId) -> bool {
        self.node(node).is_some()
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeData::Element(Element::new(tag)))
    }

    pub(crate) fn create_from(&mut self, element: Element) -> NodeId {
        self.push(NodeData::Element(element))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    pub fn element(&self, node: NodeId) -> Option<&Element> {
        match &self.node(node)?.data {
            NodeData::Element(el) => Some(el),
            NodeData::Text(_) => None,
        }
    }

    fn element_mut(&mut self, node: NodeId) -> Option<&mut Element> {
        match &mut self.node_mut(node)?.data {
            NodeData::Element(el) => Some(el),
            NodeData::Text(_) => None,
        }
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(Element::tag)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)?.parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.node(node)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if !self.is_alive(parent) || !self.is_alive(child) {
            return;
        }
        self.detach(child);
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.node_mut(parent) {
            node.children.push(child);
        }
        self.mutations += 1;
    }

    /// Remove `node` from its parent. The subtree stays usable.
    pub fn detach(&mut self, node: NodeId) {
        let Some(parent) = self.parent(node) else {
            return;
        };
        if let Some(p) = self.node_mut(parent) {
            p.children.retain(|c| *c != node);
        }
        if let Some(n) = self.node_mut(node) {
            n.parent = None;
        }
        if self.focused.is_some_and(|f| self.contains(node, f)) {
            self.focused = None;
        }
        self.mutations += 1;
    }

    /// Detach `node` and free its whole subtree.
    pub fn remove(&mut self, node: NodeId) {
        if !self.is_alive(node) {
            return;
        }
        self.detach(node);
        if self.focused.is_some_and(|f| self.contains(node, f)) {
            self.focused = None;
        }
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            let entry = &mut self.slots[id.slot as usize];
            if entry.generation != id.generation {
                continue;
            }
            if let Some(freed) = entry.node.take() {
                entry.generation = entry.generation.wrapping_add(1);
                stack.extend(freed.children);
                self.free.push(id.slot);
            }
        }
    }

    /// Remove and free every child of `node`.
    pub fn clear_children(&mut self, node: NodeId) {
        for child in self.children(node).to_vec() {
            self.remove(child);
        }
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node)?.attr(name)
    }

    /// Returns whether the attribute actually changed.
    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) -> bool {
        let Some(el) = self.element_mut(node) else {
            return false;
        };
        if el.attr(name) == Some(value) {
            return false;
        }
        el.attrs.insert(name.to_string(), value.to_string());
        self.mutations += 1;
        true
    }

    pub fn remove_attr(&mut self, node: NodeId, name: &str) -> bool {
        let removed = self
            .element_mut(node)
            .is_some_and(|el| el.attrs.remove(name).is_some());
        if removed {
            self.mutations += 1;
        }
        removed
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.element(node).is_some_and(|el| el.has_class(class))
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) -> bool {
        let Some(el) = self.element(node) else {
            return false;
        };
        if el.has_class(class) {
            return false;
        }
        let mut classes: Vec<&str> = el.classes().collect();
        classes.push(class);
        let joined = classes.join(" ");
        self.set_attr(node, "class", &joined)
    }

    pub fn remove_class(&mut self, node: NodeId, class: &str) -> bool {
        let Some(el) = self.element(node) else {
            return false;
        };
        if !el.has_class(class) {
            return false;
        }
        let joined = el
            .classes()
            .filter(|c| *c != class)
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attr(node, "class", &joined)
    }

    pub fn style(&self, node: NodeId, prop: &str) -> Option<&str> {
        self.element(node)?.style(prop)
    }

    /// Set an inline style property; an empty value removes it.
    pub fn set_style(&mut self, node: NodeId, prop: &str, value: &str) -> bool {
        let Some(el) = self.element_mut(node) else {
            return false;
        };
        let changed = if value.is_empty() {
            el.styles.remove(prop).is_some()
        } else if el.style(prop) == Some(value) {
            false
        } else {
            el.styles.insert(prop.to_string(), value.to_string());
            true
        };
        if changed {
            self.mutations += 1;
        }
        changed
    }

    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        match self.node(node).map(|n| &n.data) {
            None => {}
            Some(NodeData::Text(t)) => out.push_str(t),
            Some(NodeData::Element(_)) => {
                for child in self.children(node) {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    /// Replace all children with a single text node. No-op when the element
    /// already holds exactly that text.
    pub fn set_text_content(&mut self, node: NodeId, text: &str) -> bool {
        let children = self.children(node);
        let unchanged = match children {
            [] => text.is_empty(),
            [only] => matches!(self.node(*only).map(|n| &n.data), Some(NodeData::Text(t)) if t == text),
            _ => false,
        };
        if unchanged || self.element(node).is_none() {
            return false;
        }
        self.clear_children(node);
        if !text.is_empty() {
            let text_node = self.create_text(text);
            self.append_child(node, text_node);
        }
        true
    }

    /// Pre-order element descendants of `scope`, excluding `scope` itself and
    /// the inert content of `<template>` elements.
    pub fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(scope).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            let Some(el) = self.element(node) else {
                continue;
            };
            out.push(node);
            if el.tag() != "template" {
                stack.extend(self.children(node).iter().rev());
            }
        }
        out
    }

    pub fn query_all(&self, scope: NodeId, pred: impl Fn(&Element) -> bool) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|n| self.element(*n).is_some_and(&pred))
            .collect()
    }

    pub fn query_first(&self, scope: NodeId, pred: impl Fn(&Element) -> bool) -> Option<NodeId> {
        self.descendants(scope)
            .into_iter()
            .find(|n| self.element(*n).is_some_and(&pred))
    }

    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.query_first(self.html, |el| el.id() == Some(id))
    }

    /// Nearest inclusive ancestor matching `pred`.
    pub fn closest(&self, node: NodeId, pred: impl Fn(&Element) -> bool) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(n) = current {
            if self.element(n).is_some_and(&pred) {
                return Some(n);
            }
            current = self.parent(n);
        }
        None
    }

    /// Whether `node` is `ancestor` or lies beneath it.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    pub fn is_connected(&self, node: NodeId) -> bool {
        self.contains(self.html, node)
    }

    /// Deep copy of a subtree, returned detached. `None` for a freed node.
    pub fn deep_clone(&mut self, node: NodeId) -> Option<NodeId> {
        let data = self.node(node)?.data.clone();
        let copy = self.push(data);
        for child in self.children(node).to_vec() {
            let Some(child_copy) = self.deep_clone(child) else {
                continue;
            };
            if let Some(n) = self.node_mut(child_copy) {
                n.parent = Some(copy);
            }
            if let Some(n) = self.node_mut(copy) {
                n.children.push(child_copy);
            }
        }
        Some(copy)
    }

    /// Append copies of every child of `source` to `target`.
    pub fn clone_children_into(&mut self, source: NodeId, target: NodeId) {
        for child in self.children(source).to_vec() {
            if let Some(copy) = self.deep_clone(child) {
                self.append_child(target, copy);
            }
        }
    }

    pub fn focus(&mut self, node: NodeId) {
        self.focused = Some(node);
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    pub fn lang(&self) -> Option<&str> {
        self.attr(self.html, "lang")
    }

    pub fn set_lang(&mut self, lang: &str) -> bool {
        self.set_attr(self.html, "lang", lang)
    }

    pub fn title(&self) -> String {
        self.query_first(self.head, |el| el.tag() == "title")
            .map(|t| self.text_content(t))
            .unwrap_or_default()
    }

    pub fn set_title(&mut self, title: &str) -> bool {
        let node = match self.query_first(self.head, |el| el.tag() == "title") {
            Some(node) => node,
            None => {
                let node = self.create_element("title");
                self.append_child(self.head, node);
                node
            }
        };
        self.set_text_content(node, title)
    }

    pub fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(node) {
            self.write_html(*child, &mut out);
        }
        out
    }

    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        let Some(data) = self.node(node).map(|n| &n.data) else {
            return;
        };
        match data {
            NodeData::Text(t) => out.push_str(&escape(t, false)),
            NodeData::Element(el) => {
                let _ = write!(out, "<{}", el.tag);
                for (name, value) in &el.attrs {
                    let _ = write!(out, " {}=\"{}\"", name, escape(value, true));
                }
                if !el.styles.is_empty() {
                    let style = el
                        .styles
                        .iter()
                        .map(|(k, v)| format!("{k}: {v}"))
                        .collect::<Vec<_>>()
                        .join("; ");
                    let _ = write!(out, " style=\"{}\"", escape(&style, true));
                }
                out.push('>');
                if VOID_TAGS.contains(&el.tag.as_str()) {
                    return;
                }
                for child in self.children(node) {
                    self.write_html(*child, out);
                }
                let _ = write!(out, "</{}>", el.tag);
            }
        }
    }
}

fn escape(text: &str, attr: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attr => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Document, NodeId, NodeId) {
        let mut doc = Document::new();
        let app = doc.create_element("main");
        doc.set_attr(app, "id", "app");
        doc.append_child(doc.body(), app);
        let p = doc.create_element("p");
        doc.set_attr(p, "data-i18n", "home.title");
        doc.append_child(app, p);
        (doc, app, p)
    }

    #[test]
    fn query_and_lookup() {
        let (doc, app, p) = sample();
        assert_eq!(doc.element_by_id("app"), Some(app));
        assert_eq!(doc.query_all(doc.html(), |el| el.has_attr("data-i18n")), vec![p]);
        assert_eq!(doc.closest(p, |el| el.id() == Some("app")), Some(app));
        assert!(doc.is_connected(p));
    }

    #[test]
    fn template_content_is_inert() {
        let (mut doc, _, _) = sample();
        let template = doc.create_element("template");
        doc.set_attr(template, "id", "view-home");
        let inner = doc.create_element("span");
        doc.set_attr(inner, "id", "inside");
        doc.append_child(template, inner);
        doc.append_child(doc.body(), template);

        assert_eq!(doc.element_by_id("view-home"), Some(template));
        assert_eq!(doc.element_by_id("inside"), None);
    }

    #[test]
    fn writes_are_counted_only_when_they_change_something() {
        let (mut doc, _, p) = sample();
        let before = doc.mutations();
        assert!(doc.set_text_content(p, "Hola"));
        assert!(doc.add_class(p, "active"));
        let after = doc.mutations();
        assert!(after > before);

        assert!(!doc.set_text_content(p, "Hola"));
        assert!(!doc.add_class(p, "active"));
        assert!(!doc.set_attr(p, "data-i18n", "home.title"));
        assert_eq!(doc.mutations(), after);
    }

    #[test]
    fn classes_and_styles() {
        let (mut doc, _, p) = sample();
        doc.add_class(p, "a");
        doc.add_class(p, "b");
        doc.remove_class(p, "a");
        assert_eq!(doc.attr(p, "class"), Some("b"));

        doc.set_style(p, "position", "fixed");
        assert_eq!(doc.style(p, "position"), Some("fixed"));
        doc.set_style(p, "position", "");
        assert_eq!(doc.style(p, "position"), None);
    }

    #[test]
    fn clone_and_serialize() {
        let (mut doc, app, p) = sample();
        doc.set_text_content(p, "a < b");
        let target = doc.create_element("div");
        doc.clone_children_into(app, target);
        assert_eq!(
            doc.inner_html(target),
            "<p data-i18n=\"home.title\">a &lt; b</p>"
        );
        // The original is untouched by edits to the copy.
        let copy = doc.children(target)[0];
        doc.set_text_content(copy, "changed");
        assert_eq!(doc.text_content(p), "a < b");
    }

    #[test]
    fn removed_slots_are_reused_and_old_ids_go_dead() {
        let (mut doc, app, p) = sample();
        let live = doc.live_nodes();
        doc.remove(app);
        assert_eq!(doc.live_nodes(), live - 2);
        assert!(!doc.is_alive(p));
        assert_eq!(doc.parent(p), None);
        assert_eq!(doc.element_by_id("app"), None);

        let fresh = doc.create_element("div");
        assert_eq!(doc.live_nodes(), live - 1);
        assert_ne!(fresh, p);
        assert_ne!(fresh, app);
        assert_eq!(doc.tag(p), None);
        assert_eq!(doc.tag(fresh), Some("div"));
    }

    #[test]
    fn clearing_children_frees_them() {
        let (mut doc, app, _) = sample();
        let remount = |doc: &mut Document| {
            doc.clear_children(app);
            let copy = doc.create_element("p");
            doc.set_text_content(copy, "x");
            doc.append_child(app, copy);
        };
        remount(&mut doc);
        let live = doc.live_nodes();
        for _ in 0..50 {
            remount(&mut doc);
        }
        assert_eq!(doc.live_nodes(), live);
    }

    #[test]
    fn detach_clears_focus_inside_subtree() {
        let (mut doc, app, p) = sample();
        doc.focus(p);
        doc.detach(app);
        assert_eq!(doc.focused(), None);
        assert!(!doc.is_connected(p));
    }
}
