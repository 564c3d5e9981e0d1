//! Console page layout
//!
//! The page is one [`Document`] shared by every writer: the status poller
//! fills the indicator spans, the explorer fills the site containers and the
//! server mirrors the login overlay into it before each render.

use crate::auth::OverlaySnapshot;
use crate::explorer::{SITES_CONTENT_PARENT, SITES_NAV_PARENT};
use crate::render::alerts::MAIN_CONTAINER_ID;
use crate::render::{escape_html, Document};
use crate::status::default_probes;

pub const OVERLAY_ID: &str = "login-overlay";
pub const OVERLAY_ERROR_ID: &str = "login-error";
pub const LOGIN_ACTION: &str = "/console/login";
pub const LOGOUT_ACTION: &str = "/console/logout";

const BOOTSTRAP_CSS: &str =
    "https://cdn.jsdelivr.net/npm/bootstrap@4.6.2/dist/css/bootstrap.min.css";
const JQUERY_JS: &str = "https://cdn.jsdelivr.net/npm/jquery@3.7.1/dist/jquery.min.js";
const BOOTSTRAP_JS: &str =
    "https://cdn.jsdelivr.net/npm/bootstrap@4.6.2/dist/js/bootstrap.bundle.min.js";

/// Build the empty console layout: overlay, status bar and site containers
pub fn skeleton() -> Document {
    let mut doc = Document::new();
    let root = doc.root();

    let overlay = doc.append_element(root, "div");
    doc.set_attr(overlay, "id", OVERLAY_ID);
    doc.set_attr(overlay, "class", "login-overlay");
    let dialog = doc.append_element(overlay, "div");
    doc.set_attr(dialog, "class", "login-box card p-4");
    let title = doc.append_element(dialog, "h5");
    doc.append_text(title, "SiteRM Login");

    let form = doc.append_element(dialog, "form");
    doc.set_attr(form, "id", "login-form");
    doc.set_attr(form, "method", "post");
    doc.set_attr(form, "action", LOGIN_ACTION);
    for (name, kind, placeholder) in [
        ("username", "text", "Username"),
        ("password", "password", "Password"),
    ] {
        let input = doc.append_element(form, "input");
        doc.set_attr(input, "class", "form-control mb-2");
        doc.set_attr(input, "name", name);
        doc.set_attr(input, "type", kind);
        doc.set_attr(input, "placeholder", placeholder);
    }
    let submit = doc.append_element(form, "input");
    doc.set_attr(submit, "type", "submit");
    doc.set_attr(submit, "class", "btn btn-primary");
    doc.set_attr(submit, "value", "Login");
    let error = doc.append_element(dialog, "div");
    doc.set_attr(error, "id", OVERLAY_ERROR_ID);
    doc.set_attr(error, "class", "text-danger mt-2");

    let bar = doc.append_element(root, "nav");
    doc.set_attr(bar, "class", "navbar navbar-light bg-light");
    let indicators = doc.append_element(bar, "div");
    doc.set_attr(indicators, "id", "status-bar");
    for probe in default_probes() {
        let span = doc.append_element(indicators, "span");
        doc.set_attr(span, "id", probe.element_id);
        doc.set_attr(span, "class", "text-muted mr-3");
        doc.append_text(span, format!("{}: ...", probe.label));
    }
    let logout = doc.append_element(bar, "form");
    doc.set_attr(logout, "method", "post");
    doc.set_attr(logout, "action", LOGOUT_ACTION);
    let button = doc.append_element(logout, "input");
    doc.set_attr(button, "type", "submit");
    doc.set_attr(button, "class", "btn btn-outline-secondary btn-sm");
    doc.set_attr(button, "value", "Logout");

    let main = doc.append_element(root, "div");
    doc.set_attr(main, "id", MAIN_CONTAINER_ID);
    doc.set_attr(main, "class", "container-fluid mt-3");
    for id in [SITES_NAV_PARENT, SITES_CONTENT_PARENT] {
        let div = doc.append_element(main, "div");
        doc.set_attr(div, "id", id);
    }

    doc
}

/// Copy the overlay state into the page
pub fn sync_overlay(doc: &mut Document, snapshot: &OverlaySnapshot) {
    if let Some(overlay) = doc.by_id(OVERLAY_ID) {
        let display = if snapshot.visible { "display:flex" } else { "display:none" };
        doc.set_attr(overlay, "style", display);
    }
    if let Some(error) = doc.by_id(OVERLAY_ERROR_ID) {
        match &snapshot.error {
            Some(message) => doc.set_text(error, message.clone()),
            None => doc.clear(error),
        }
    }
}

/// Empty the site containers, dropping any rendered tabs
pub fn clear_sites(doc: &mut Document) {
    for id in [SITES_NAV_PARENT, SITES_CONTENT_PARENT] {
        if let Some(node) = doc.by_id(id) {
            doc.clear(node);
        }
    }
}

/// Wrap the document body in a complete HTML page
pub fn render_html(doc: &Document, title: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<link rel="stylesheet" href="{css}">
<link rel="stylesheet" href="/static/console.css">
</head>
{body}
<script src="{jquery}"></script>
<script src="{bootstrap}"></script>
<script src="/static/console.js"></script>
</html>
"#,
        title = escape_html(title),
        css = BOOTSTRAP_CSS,
        body = doc.to_html(doc.root()),
        jquery = JQUERY_JS,
        bootstrap = BOOTSTRAP_JS,
    )
}
