//! Document model and renderers for status/config payloads

pub mod alerts;
pub mod dom;
pub mod node;
pub mod tree;

pub use dom::{escape_html, Document, NodeId, SharedDocument};
pub use node::{ResourceNode, Scalar};
pub use tree::{
    render, render_config_table, render_into, render_text_lines, render_text_lines_into,
};
