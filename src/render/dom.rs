//! In-memory document the console renders into
//!
//! An arena of element and text nodes with an `id` index, mirroring the small
//! slice of the browser DOM the renderers need: append, prepend, clear, and
//! lookup by id. Output is HTML for the web console or plain text for the CLI.
//!
//! Cleared and removed subtrees go back to a free list, so a long-running
//! console that rewrites the same elements keeps a bounded arena. A handle to
//! a released node must not be used again.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

pub type NodeId = usize;

/// Document shared between the poller, tab loaders and the web server
pub type SharedDocument = Arc<Mutex<Document>>;

const VOID_TAGS: &[&str] = &["br", "hr", "input", "img", "meta"];
const BLOCK_TAGS: &[&str] = &[
    "div", "p", "pre", "table", "thead", "tbody", "tr", "ul", "li", "form", "h1", "h2", "h3",
];

#[derive(Debug, Clone)]
enum NodeKind {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
        children: Vec<NodeId>,
    },
    Text(String),
    Vacant,
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    free: Vec<NodeId>,
    ids: HashMap<String, NodeId>,
    root: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            free: Vec::new(),
            ids: HashMap::new(),
            root: 0,
        };
        doc.root = doc.create_element("body");
        doc
    }

    pub fn shared(self) -> SharedDocument {
        Arc::new(Mutex::new(self))
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeKind::Element {
            tag: tag.to_string(),
            attrs: Vec::new(),
            children: Vec::new(),
        })
    }

    /// Create an element and append it to `parent`
    pub fn append_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let node = self.create_element(tag);
        self.append(parent, node);
        node
    }

    pub fn append_text(&mut self, parent: NodeId, text: impl Into<String>) -> NodeId {
        let node = self.alloc(NodeKind::Text(text.into()));
        self.append(parent, node);
        node
    }

    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        if let NodeKind::Element { children, .. } = &mut self.nodes[parent].kind {
            children.push(child);
            self.nodes[child].parent = Some(parent);
            self.register_subtree(child);
        }
    }

    pub fn prepend(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        if let NodeKind::Element { children, .. } = &mut self.nodes[parent].kind {
            children.insert(0, child);
            self.nodes[child].parent = Some(parent);
            self.register_subtree(child);
        }
    }

    /// Element registered under a DOM id, if it is attached to the document
    pub fn by_id(&self, id: &str) -> Option<NodeId> {
        self.ids.get(id).copied()
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.ids.contains_key(id)
    }

    pub fn set_attr(&mut self, node: NodeId, name: &str, value: impl Into<String>) {
        let value = value.into();
        if name == "id" {
            if let Some(old) = self.attr(node, "id").map(str::to_string) {
                self.ids.remove(&old);
            }
            if self.is_attached(node) {
                self.ids.insert(value.clone(), node);
            }
        }
        if let NodeKind::Element { attrs, .. } = &mut self.nodes[node].kind {
            match attrs.iter_mut().find(|(k, _)| k == name) {
                Some(slot) => slot.1 = value,
                None => attrs.push((name.to_string(), value)),
            }
        }
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[node].kind {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str()),
            NodeKind::Text(_) | NodeKind::Vacant => None,
        }
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node].kind {
            NodeKind::Element { tag, .. } => Some(tag),
            NodeKind::Text(_) | NodeKind::Vacant => None,
        }
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        match &self.nodes[node].kind {
            NodeKind::Element { children, .. } => children,
            NodeKind::Text(_) | NodeKind::Vacant => &[],
        }
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node].parent
    }

    /// Text of a text node
    pub fn text(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node].kind {
            NodeKind::Text(text) => Some(text),
            NodeKind::Element { .. } | NodeKind::Vacant => None,
        }
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attr(node, "class")
            .map(|c| c.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) {
        if self.has_class(node, class) {
            return;
        }
        let classes = match self.attr(node, "class") {
            Some(existing) if !existing.is_empty() => format!("{} {}", existing, class),
            _ => class.to_string(),
        };
        self.set_attr(node, "class", classes);
    }

    pub fn remove_class(&mut self, node: NodeId, class: &str) {
        if let Some(existing) = self.attr(node, "class") {
            let classes: Vec<&str> = existing.split_whitespace().filter(|c| *c != class).collect();
            let joined = classes.join(" ");
            self.set_attr(node, "class", joined);
        }
    }

    /// Remove and release all children of `node`
    pub fn clear(&mut self, node: NodeId) {
        let children = match &mut self.nodes[node].kind {
            NodeKind::Element { children, .. } => std::mem::take(children),
            NodeKind::Text(_) | NodeKind::Vacant => return,
        };
        for child in children {
            self.nodes[child].parent = None;
            self.unregister_subtree(child);
            self.release(child);
        }
    }

    /// Replace the content of `node` with a single text node
    pub fn set_text(&mut self, node: NodeId, text: impl Into<String>) {
        // Rewrite a lone text child in place
        let lone = match self.children(node) {
            [child] => Some(*child),
            _ => None,
        };
        if let Some(child) = lone {
            if let NodeKind::Text(current) = &mut self.nodes[child].kind {
                *current = text.into();
                return;
            }
        }
        self.clear(node);
        self.append_text(node, text);
    }

    /// Detach `node` from its parent and release its subtree
    pub fn remove(&mut self, node: NodeId) {
        if node == self.root {
            return;
        }
        self.detach(node);
        self.release(node);
    }

    /// Slots currently holding a node
    pub fn live_nodes(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// Concatenated text of a subtree
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            match &self.nodes[current].kind {
                NodeKind::Text(text) => out.push_str(text),
                NodeKind::Element { children, .. } => stack.extend(children.iter().rev()),
                NodeKind::Vacant => {}
            }
        }
        out
    }

    /// Serialise `node` and its subtree as HTML
    pub fn to_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    /// Serialise only the children of `node`
    pub fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(node) {
            self.write_html(*child, &mut out);
        }
        out
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        enum Step {
            Open(NodeId),
            Close(NodeId),
        }

        let mut stack = vec![Step::Open(node)];
        while let Some(step) = stack.pop() {
            match step {
                Step::Open(id) => match &self.nodes[id].kind {
                    NodeKind::Text(text) => out.push_str(&escape_html(text)),
                    NodeKind::Vacant => {}
                    NodeKind::Element {
                        tag,
                        attrs,
                        children,
                    } => {
                        out.push('<');
                        out.push_str(tag);
                        for (name, value) in attrs {
                            out.push_str(&format!(" {}=\"{}\"", name, escape_html(value)));
                        }
                        out.push('>');
                        if VOID_TAGS.contains(&tag.as_str()) {
                            continue;
                        }
                        stack.push(Step::Close(id));
                        stack.extend(children.iter().rev().map(|c| Step::Open(*c)));
                    }
                },
                Step::Close(id) => {
                    if let Some(tag) = self.tag(id) {
                        out.push_str(&format!("</{}>", tag));
                    }
                }
            }
        }
    }

    /// Plain-text rendering for terminals: line breaks and block elements end
    /// a line, table cells are separated by ` | `.
    pub fn to_text(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_text(node, &mut out);
        let trimmed: Vec<&str> = out.lines().map(str::trim_end).collect();
        let mut text = trimmed.join("\n");
        while text.ends_with('\n') {
            text.pop();
        }
        text
    }

    fn write_text(&self, node: NodeId, out: &mut String) {
        enum Step {
            Open(NodeId),
            Close(NodeId),
        }

        let mut stack = vec![Step::Open(node)];
        while let Some(step) = stack.pop() {
            match step {
                Step::Open(id) => match &self.nodes[id].kind {
                    NodeKind::Text(text) => out.push_str(text),
                    NodeKind::Vacant => {}
                    NodeKind::Element { tag, children, .. } => {
                        if tag == "br" {
                            out.push('\n');
                            continue;
                        }
                        stack.push(Step::Close(id));
                        stack.extend(children.iter().rev().map(|c| Step::Open(*c)));
                    }
                },
                Step::Close(id) => match self.tag(id) {
                    Some("th") | Some("td") => out.push_str(" | "),
                    Some(tag) if BLOCK_TAGS.contains(&tag) => {
                        if !out.ends_with('\n') {
                            out.push('\n');
                        }
                    }
                    _ => {}
                },
            }
        }
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let node = Node { kind, parent: None };
        match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = node;
                slot
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn release(&mut self, node: NodeId) {
        for id in self.subtree(node) {
            if matches!(self.nodes[id].kind, NodeKind::Vacant) {
                continue;
            }
            self.nodes[id] = Node {
                kind: NodeKind::Vacant,
                parent: None,
            };
            self.free.push(id);
        }
    }

    fn is_attached(&self, node: NodeId) -> bool {
        let mut current = node;
        loop {
            if current == self.root {
                return true;
            }
            match self.nodes[current].parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node].parent.take() {
            if let NodeKind::Element { children, .. } = &mut self.nodes[parent].kind {
                children.retain(|c| *c != node);
            }
            self.unregister_subtree(node);
        }
    }

    fn subtree(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().copied());
        }
        out
    }

    fn register_subtree(&mut self, node: NodeId) {
        if !self.is_attached(node) {
            return;
        }
        for id in self.subtree(node) {
            if let Some(dom_id) = self.attr(id, "id").map(str::to_string) {
                self.ids.insert(dom_id, id);
            }
        }
    }

    fn unregister_subtree(&mut self, node: NodeId) {
        for id in self.subtree(node) {
            if let Some(dom_id) = self.attr(id, "id") {
                if self.ids.get(dom_id) == Some(&id) {
                    let dom_id = dom_id.to_string();
                    self.ids.remove(&dom_id);
                }
            }
        }
    }
}

/// Escape text for HTML output
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '/' => out.push_str("&#x2F;"),
            '`' => out.push_str("&#x60;"),
            '=' => out.push_str("&#x3D;"),
            other => out.push(other),
        }
    }
    out
}
