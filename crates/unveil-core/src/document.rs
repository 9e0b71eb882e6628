//! In-memory document: an arena of element nodes plus the viewport.
//!
//! Nodes live in a [`SlotMap`] keyed by [`NodeId`]. Removing a node removes
//! its whole subtree; stale ids simply stop resolving, so every lookup is
//! `Option`-returning and missing nodes are a silent no-op at the call site.

use crate::id::NodeId;
use crate::visual::{self, Accent, Reveal, Style, VisualState};
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// Vertical layout box of an element in document coordinates (pixels).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub top: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(top: f64, height: f64) -> Self {
        Self { top, height }
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

/// The visible window onto the document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub scroll_top: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(height: f64) -> Self {
        Self {
            scroll_top: 0.0,
            height,
        }
    }

    pub fn bottom(&self) -> f64 {
        self.scroll_top + self.height
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(800.0)
    }
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// A single element.
#[derive(Debug, Clone)]
pub struct Node {
    tag: String,
    classes: Vec<String>,
    attributes: BTreeMap<String, String>,
    text: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    rect: Rect,
    revealed: bool,
    visual: VisualState,
    style: Style,
}

impl Node {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            classes: Vec::new(),
            attributes: BTreeMap::new(),
            text: String::new(),
            parent: None,
            children: Vec::new(),
            rect: Rect::default(),
            revealed: false,
            visual: VisualState::default(),
            style: Style::default(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    pub fn visual(&self) -> VisualState {
        self.visual
    }

    pub fn style(&self) -> &Style {
        &self.style
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// The element tree, viewport, and current location of one page.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: SlotMap<NodeId, Node>,
    body: NodeId,
    viewport: Viewport,
    location: String,
}

impl Document {
    /// Create an empty document with a `body` root.
    pub fn new(viewport: Viewport) -> Self {
        let mut nodes = SlotMap::with_key();
        let body = nodes.insert(Node::new("body"));
        Self {
            nodes,
            body,
            viewport,
            location: String::new(),
        }
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Number of nodes in the arena, attached or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // -----------------------------------------------------------------------
    // Tree construction
    // -----------------------------------------------------------------------

    /// Create a node that is not yet attached to the tree.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.nodes.insert(Node::new(tag))
    }

    /// Create a node and append it to `parent`. If `parent` does not exist
    /// the node is created detached.
    pub fn append(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let id = self.create_element(tag);
        self.append_child(parent, id);
        id
    }

    /// Attach an existing detached node under `parent`. Returns `false` if
    /// either node is missing, `child` already has a parent, or `child` is
    /// an ancestor of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if parent == child || !self.nodes.contains_key(parent) {
            return false;
        }
        match self.nodes.get(child) {
            Some(node) if node.parent.is_none() && child != self.body => {}
            _ => return false,
        }
        if self.ancestors(parent).contains(&child) {
            return false;
        }
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.push(child);
        }
        true
    }

    /// Remove `id` and its whole subtree from the arena. Returns the removed
    /// ids (pre-order). The body cannot be removed.
    pub fn remove(&mut self, id: NodeId) -> Vec<NodeId> {
        if id == self.body || !self.nodes.contains_key(id) {
            return Vec::new();
        }

        if let Some(parent) = self.nodes.get(id).and_then(|n| n.parent)
            && let Some(parent_node) = self.nodes.get_mut(parent)
        {
            parent_node.children.retain(|&c| c != id);
        }

        let mut removed = vec![id];
        removed.extend(self.descendants(id));
        for &node in &removed {
            self.nodes.remove(node);
        }
        removed
    }

    /// Remove every child subtree of `id`.
    pub fn clear_children(&mut self, id: NodeId) -> Vec<NodeId> {
        let children = self.children(id).to_vec();
        children
            .into_iter()
            .flat_map(|child| self.remove(child))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Tree navigation
    // -----------------------------------------------------------------------

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(node) = current {
            out.push(node);
            current = self.parent(node);
        }
        out
    }

    /// Descendants of `id` in document (pre-)order, excluding `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// Whether `id` exists and is attached under the body.
    pub fn contains(&self, id: NodeId) -> bool {
        if id == self.body {
            return true;
        }
        if !self.nodes.contains_key(id) {
            return false;
        }
        self.ancestors(id).last() == Some(&self.body)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Attached nodes carrying any of `classes`, in document order.
    pub fn query_by_classes<S: AsRef<str>>(&self, classes: &[S]) -> Vec<NodeId> {
        self.descendants(self.body)
            .into_iter()
            .filter(|&id| {
                self.nodes
                    .get(id)
                    .is_some_and(|n| classes.iter().any(|c| n.has_class(c.as_ref())))
            })
            .collect()
    }

    /// First descendant of `id` carrying `class`.
    pub fn query_descendant(&self, id: NodeId, class: &str) -> Option<NodeId> {
        self.descendants(id)
            .into_iter()
            .find(|&d| self.has_class(d, class))
    }

    /// `id` itself or its nearest ancestor carrying attribute `name`.
    pub fn closest_with_attribute(&self, id: NodeId, name: &str) -> Option<NodeId> {
        if !self.nodes.contains_key(id) {
            return None;
        }
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|&n| self.attribute(n, name).is_some())
    }

    /// First attached node whose `id` attribute equals `id`.
    pub fn find_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.body)
            .into_iter()
            .find(|&n| self.attribute(n, "id") == Some(id))
    }

    /// First attached link whose `href` contains `fragment`.
    pub fn find_link_containing(&self, fragment: &str) -> Option<NodeId> {
        self.descendants(self.body).into_iter().find(|&n| {
            self.tag(n) == Some("a")
                && self.attribute(n, "href").is_some_and(|h| h.contains(fragment))
        })
    }

    // -----------------------------------------------------------------------
    // Node properties
    // -----------------------------------------------------------------------

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(id).map(|n| n.tag.as_str())
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.nodes.get(id).is_some_and(|n| n.has_class(class))
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if let Some(node) = self.nodes.get_mut(id)
            && !node.has_class(class)
        {
            node.classes.push(class.to_string());
        }
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.classes.retain(|c| c != class);
        }
    }

    /// Toggle `class` on `id`. Returns whether the class is now present, or
    /// `None` if the node is missing.
    pub fn toggle_class(&mut self, id: NodeId, class: &str) -> Option<bool> {
        let node = self.nodes.get_mut(id)?;
        if node.has_class(class) {
            node.classes.retain(|c| c != class);
            Some(false)
        } else {
            node.classes.push(class.to_string());
            Some(true)
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.nodes.get(id).and_then(|n| n.attribute(name))
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.attributes.insert(name.to_string(), value.to_string());
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(id).map(|n| n.text.as_str())
    }

    pub fn set_text(&mut self, id: NodeId, text: &str) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.text.clear();
            node.text.push_str(text);
        }
    }

    pub fn rect(&self, id: NodeId) -> Option<Rect> {
        self.nodes.get(id).map(|n| n.rect)
    }

    pub fn set_rect(&mut self, id: NodeId, rect: Rect) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.rect = rect;
        }
    }

    // -----------------------------------------------------------------------
    // Reveal flag
    // -----------------------------------------------------------------------

    pub fn is_revealed(&self, id: NodeId) -> bool {
        self.nodes.get(id).is_some_and(|n| n.revealed)
    }

    /// Flip the revealed flag. Returns `true` only on the first false→true
    /// transition; the flag is never cleared.
    pub fn mark_revealed(&mut self, id: NodeId) -> bool {
        match self.nodes.get_mut(id) {
            Some(node) if !node.revealed => {
                node.revealed = true;
                true
            }
            _ => false,
        }
    }

    // -----------------------------------------------------------------------
    // Visual state
    // -----------------------------------------------------------------------

    pub fn visual(&self, id: NodeId) -> Option<VisualState> {
        self.nodes.get(id).map(|n| n.visual)
    }

    pub fn style(&self, id: NodeId) -> Option<&Style> {
        self.nodes.get(id).map(|n| &n.style)
    }

    pub fn set_reveal(&mut self, id: NodeId, reveal: Reveal) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.visual.reveal = reveal;
            node.style = visual::render(&node.visual);
        }
    }

    pub fn set_accent(&mut self, id: NodeId, accent: Accent) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.visual.accent = accent;
            node.style = visual::render(&node.visual);
        }
    }

    // -----------------------------------------------------------------------
    // Viewport & location
    // -----------------------------------------------------------------------

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Scroll to `top`, clamped at 0.
    pub fn set_scroll_top(&mut self, top: f64) {
        self.viewport.scroll_top = if top.is_finite() { top.max(0.0) } else { 0.0 };
    }

    pub fn set_viewport_height(&mut self, height: f64) {
        if height.is_finite() && height >= 0.0 {
            self.viewport.height = height;
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn navigate(&mut self, href: &str) {
        self.location = href.to_string();
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new(Viewport::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::default();
        let body = doc.body();
        let item = doc.append(body, "div");
        doc.add_class(item, "timeline-item");
        let content = doc.append(item, "div");
        doc.add_class(content, "timeline-content");
        let marker = doc.append(item, "div");
        doc.add_class(marker, "timeline-marker");
        (doc, item, content, marker)
    }

    #[test]
    fn append_builds_tree_in_order() {
        let (doc, item, content, marker) = sample();
        assert_eq!(doc.children(item), &[content, marker]);
        assert_eq!(doc.parent(content), Some(item));
        assert!(doc.contains(marker));
    }

    #[test]
    fn detached_nodes_are_not_contained() {
        let mut doc = Document::default();
        let loose = doc.create_element("div");
        assert!(!doc.contains(loose));
        assert!(doc.append_child(doc.body(), loose));
        assert!(doc.contains(loose));
        // A second attach is rejected.
        assert!(!doc.append_child(doc.body(), loose));
    }

    #[test]
    fn append_child_rejects_cycles() {
        let (mut doc, item, content, _) = sample();
        let loose = doc.create_element("div");
        assert!(!doc.append_child(loose, doc.body()));
        assert!(!doc.append_child(content, item));
    }

    #[test]
    fn remove_drops_subtree() {
        let (mut doc, item, content, marker) = sample();
        let removed = doc.remove(item);
        assert_eq!(removed, vec![item, content, marker]);
        assert!(doc.node(content).is_none());
        assert!(doc.children(doc.body()).is_empty());
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn body_cannot_be_removed() {
        let mut doc = Document::default();
        assert!(doc.remove(doc.body()).is_empty());
        assert!(doc.contains(doc.body()));
    }

    #[test]
    fn query_by_classes_is_document_order() {
        let mut doc = Document::default();
        let body = doc.body();
        let a = doc.append(body, "div");
        doc.add_class(a, "stat-card");
        let b = doc.append(body, "div");
        doc.add_class(b, "timeline-item");
        let c = doc.append(a, "span");
        doc.add_class(c, "message-card");

        let found = doc.query_by_classes(&["timeline-item", "stat-card", "message-card"]);
        assert_eq!(found, vec![a, c, b]);
    }

    #[test]
    fn query_descendant_finds_nested() {
        let (doc, item, content, _) = sample();
        assert_eq!(doc.query_descendant(item, "timeline-content"), Some(content));
        assert_eq!(doc.query_descendant(item, "missing"), None);
    }

    #[test]
    fn closest_with_attribute_walks_up() {
        let (mut doc, item, content, _) = sample();
        doc.set_attribute(item, "data-toggle", "details-1");
        assert_eq!(doc.closest_with_attribute(content, "data-toggle"), Some(item));
        assert_eq!(doc.closest_with_attribute(item, "data-toggle"), Some(item));
        assert_eq!(doc.closest_with_attribute(content, "href"), None);
    }

    #[test]
    fn toggle_class_flips() {
        let (mut doc, item, _, _) = sample();
        assert_eq!(doc.toggle_class(item, "open"), Some(true));
        assert!(doc.has_class(item, "open"));
        assert_eq!(doc.toggle_class(item, "open"), Some(false));
        assert!(!doc.has_class(item, "open"));
    }

    #[test]
    fn mark_revealed_only_once() {
        let (mut doc, item, _, _) = sample();
        assert!(!doc.is_revealed(item));
        assert!(doc.mark_revealed(item));
        assert!(!doc.mark_revealed(item));
        assert!(doc.is_revealed(item));
    }

    #[test]
    fn visual_changes_rerender_style() {
        let (mut doc, _, content, _) = sample();
        doc.set_reveal(content, Reveal::Shown);
        assert_eq!(doc.style(content).and_then(|s| s.get("opacity")), Some("1"));
        doc.set_reveal(content, Reveal::Hidden);
        assert_eq!(doc.style(content).and_then(|s| s.get("opacity")), Some("0"));
    }

    #[test]
    fn missing_nodes_are_silent() {
        let (mut doc, item, _, _) = sample();
        doc.remove(item);
        doc.set_text(item, "ignored");
        doc.set_reveal(item, Reveal::Shown);
        doc.add_class(item, "x");
        assert_eq!(doc.text(item), None);
        assert_eq!(doc.toggle_class(item, "x"), None);
    }

    #[test]
    fn scroll_top_is_clamped() {
        let mut doc = Document::default();
        doc.set_scroll_top(-40.0);
        assert_eq!(doc.viewport().scroll_top, 0.0);
        doc.set_scroll_top(f64::NAN);
        assert_eq!(doc.viewport().scroll_top, 0.0);
        doc.set_scroll_top(250.0);
        assert_eq!(doc.viewport().bottom(), 1050.0);
    }

    #[test]
    fn find_helpers() {
        let mut doc = Document::default();
        let body = doc.body();
        let link = doc.append(body, "a");
        doc.set_attribute(link, "href", "../index.html");
        let section = doc.append(body, "section");
        doc.set_attribute(section, "id", "history");

        assert_eq!(doc.find_link_containing("index.html"), Some(link));
        assert_eq!(doc.find_by_id("history"), Some(section));
        assert_eq!(doc.find_by_id("nope"), None);
    }
}
