//! Dismissible alert banners

use super::dom::{Document, NodeId};

/// Container that receives page-level warnings
pub const MAIN_CONTAINER_ID: &str = "maindiv";

/// Prepend a warning banner to the main container.
///
/// Used for transport and server failures that should not take the page down.
pub fn show_warning(doc: &mut Document, message: &str, details: Option<&str>) -> Option<NodeId> {
    let main = doc.by_id(MAIN_CONTAINER_ID)?;

    let alert = doc.create_element("div");
    doc.set_attr(alert, "class", "alert alert-warning alert-dismissible fade show");
    doc.set_attr(alert, "role", "alert");
    let strong = doc.append_element(alert, "strong");
    doc.append_text(strong, "Warning:");
    doc.append_text(alert, format!(" {}", message));
    if let Some(details) = details.filter(|d| !d.is_empty()) {
        let small = doc.append_element(alert, "div");
        doc.set_attr(small, "class", "small text-muted mt-1");
        doc.append_text(small, details);
    }
    append_close_button(doc, alert);

    doc.prepend(main, alert);
    Some(alert)
}

/// Details line for a failed request, `HTTP <status> – <error>`
pub fn http_details(status: Option<u16>, error: &str) -> String {
    match status {
        Some(status) => format!("HTTP {} – {}", status, error),
        None => format!("HTTP 0 – {}", error),
    }
}

/// Append a success alert to the `alerts<key>` region of a host pane
pub fn new_alert(doc: &mut Document, key: &str, message: &str) -> Option<NodeId> {
    push_alert(doc, key, message, "alert-success")
}

/// Append an alert with an explicit bootstrap type class
pub fn push_alert(doc: &mut Document, key: &str, message: &str, alert_type: &str) -> Option<NodeId> {
    let region = doc.by_id(&format!("alerts{}", key))?;

    let alert = doc.append_element(region, "div");
    doc.set_attr(
        alert,
        "class",
        format!("alert {} alert-dismissible fade show", alert_type),
    );
    doc.set_attr(alert, "role", "alert");
    doc.append_text(alert, message);
    append_close_button(doc, alert);
    Some(alert)
}

fn append_close_button(doc: &mut Document, alert: NodeId) {
    let button = doc.append_element(alert, "button");
    doc.set_attr(button, "type", "button");
    doc.set_attr(button, "class", "close");
    doc.set_attr(button, "data-dismiss", "alert");
    doc.set_attr(button, "aria-label", "Close");
    doc.append_text(button, "×");
}
