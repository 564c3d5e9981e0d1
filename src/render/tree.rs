//! Recursive payload renderer
//!
//! Turns a [`ResourceNode`] into key/value rows. Rendering only ever appends;
//! callers that want a fresh pane clear it first. A target id that no longer
//! exists is a silent no-op, since late responses can outlive their pane.

use tracing::trace;

use super::dom::{Document, NodeId};
use super::node::ResourceNode;

enum Step<'a> {
    Node(&'a ResourceNode),
    Key(&'a str),
    Break,
}

/// Render `node` into the element with DOM id `target`.
///
/// Returns `false` when the target is gone.
pub fn render(node: &ResourceNode, doc: &mut Document, target: &str) -> bool {
    match doc.by_id(target) {
        Some(parent) => {
            render_into(node, doc, parent);
            true
        }
        None => {
            trace!(target, "Render target missing, dropping output");
            false
        }
    }
}

/// Render `node` into an element handle.
///
/// Sequences flatten into the same parent; mappings emit `<b>key:</b>`, a space, the
/// value, then `<br>`; scalars emit their display form and a space. Uses an
/// explicit work stack, so nesting depth is limited only by memory.
pub fn render_into(node: &ResourceNode, doc: &mut Document, parent: NodeId) {
    let mut stack = vec![Step::Node(node)];

    while let Some(step) = stack.pop() {
        match step {
            Step::Node(ResourceNode::Scalar(value)) => {
                doc.append_text(parent, format!("{} ", value));
            }
            Step::Node(ResourceNode::Sequence(items)) => {
                stack.extend(items.iter().rev().map(Step::Node));
            }
            Step::Node(ResourceNode::Mapping(entries)) => {
                for (key, value) in entries.iter().rev() {
                    stack.push(Step::Break);
                    stack.push(Step::Node(value));
                    stack.push(Step::Key(key));
                }
            }
            Step::Key(key) => {
                let label = doc.append_element(parent, "b");
                doc.append_text(label, format!("{}:", key));
                doc.append_text(parent, " ");
            }
            Step::Break => {
                doc.append_element(parent, "br");
            }
        }
    }
}

/// Render preformatted text (model dumps, logs) one escaped row per line.
///
/// Blank lines are kept so the dump keeps its shape.
pub fn render_text_lines(text: &str, doc: &mut Document, target: &str) -> bool {
    let Some(parent) = doc.by_id(target) else {
        trace!(target, "Text target missing, dropping output");
        return false;
    };
    render_text_lines_into(text, doc, parent);
    true
}

/// Element-handle form of [`render_text_lines`]
pub fn render_text_lines_into(text: &str, doc: &mut Document, parent: NodeId) {
    let code = doc.append_element(parent, "code");
    let pre = doc.append_element(code, "pre");
    for line in text.split('\n') {
        let row = doc.append_element(pre, "div");
        doc.set_attr(row, "class", "row model-row");
        doc.append_text(row, line);
    }
}

/// Render a mapping as a `Parameter | Value` table, one row per key.
///
/// Keys listed in `skip_keys` are left out. Returns the table element, or
/// `None` when `node` is not a mapping.
pub fn render_config_table(
    node: &ResourceNode,
    doc: &mut Document,
    parent: NodeId,
    table_id: Option<&str>,
    skip_keys: &[&str],
) -> Option<NodeId> {
    let entries = node.as_mapping()?;

    let table = doc.append_element(parent, "table");
    doc.set_attr(table, "class", "table");
    if let Some(id) = table_id {
        doc.set_attr(table, "id", id);
    }

    let thead = doc.append_element(table, "thead");
    doc.set_attr(thead, "class", "thead-dark");
    let head_row = doc.append_element(thead, "tr");
    for title in ["Parameter", "Value"] {
        let th = doc.append_element(head_row, "th");
        doc.set_attr(th, "scope", "col");
        doc.append_text(th, title);
    }

    for (key, value) in entries {
        if skip_keys.contains(&key.as_str()) {
            continue;
        }
        let row = doc.append_element(table, "tr");
        let th = doc.append_element(row, "th");
        doc.set_attr(th, "scope", "row");
        doc.append_text(th, key.clone());
        let cell = doc.append_element(row, "td");
        render_into(value, doc, cell);
    }

    Some(table)
}
