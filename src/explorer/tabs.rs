//! Tab sets whose panes load on first activation
//!
//! The entry state machine is `Pending -> Loading -> Loaded | Failed`. The
//! `Pending -> Loading` step is taken under the entry lock before the loader
//! future is awaited, so a second activation while the first fetch is in
//! flight sees `Loading` and does nothing.

use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::core::error::Result;
use crate::render::alerts::{http_details, show_warning};
use crate::render::{
    render_config_table, render_into, render_text_lines_into, Document, NodeId, ResourceNode,
    SharedDocument,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TabState {
    Pending,
    Loading,
    Loaded,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct TabEntry {
    pub id: String,
    pub label: String,
    pub pane_id: String,
    /// Value handed to the loader, e.g. a hostname
    pub key: String,
    pub lazy: bool,
    pub state: TabState,
}

impl TabEntry {
    /// An entry whose pane is filled by the caller at build time
    pub fn eager(id: impl Into<String>, label: impl Into<String>, pane_id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            key: id.clone(),
            id,
            label: label.into(),
            pane_id: pane_id.into(),
            lazy: false,
            state: TabState::Loaded,
        }
    }

    /// An entry whose pane is fetched on first activation
    pub fn lazy(
        id: impl Into<String>,
        label: impl Into<String>,
        pane_id: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            pane_id: pane_id.into(),
            key: key.into(),
            lazy: true,
            state: TabState::Pending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavStyle {
    Tabs,
    Pills,
    VerticalPills,
}

impl NavStyle {
    pub fn nav_class(&self) -> &'static str {
        match self {
            NavStyle::Tabs => "nav nav-tabs",
            NavStyle::Pills => "nav nav-pills",
            NavStyle::VerticalPills => "nav flex-column nav-pills",
        }
    }

    fn toggle(&self) -> &'static str {
        match self {
            NavStyle::Tabs => "tab",
            NavStyle::Pills | NavStyle::VerticalPills => "pill",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TabOptions {
    pub nav_id: String,
    pub content_id: String,
    pub style: NavStyle,
    pub pane_class: String,
    /// Refetch a `Failed` entry when it is activated again
    pub retry_failed_on_activate: bool,
    /// Text shown in a pane whose load failed
    pub failure_message: String,
}

impl Default for TabOptions {
    fn default() -> Self {
        Self {
            nav_id: "myTab".to_string(),
            content_id: "sites".to_string(),
            style: NavStyle::Pills,
            pane_class: "tab-pane fade".to_string(),
            retry_failed_on_activate: false,
            failure_message: "Failed to load details".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TabLayout {
    pub nav_id: String,
    pub content_id: String,
    pub nav: NodeId,
    pub content: NodeId,
}

/// What a loader hands back for a pane
pub enum PaneContent {
    /// Key/value rows
    Tree(ResourceNode),
    /// `Parameter | Value` table, falling back to rows for non-mappings
    Table(ResourceNode),
    /// Preformatted text, one row per line
    Text(String),
    /// A single `text-warning` line, e.g. "No data returned"
    Notice(String),
    Custom(Box<dyn FnOnce(&mut Document, NodeId) + Send>),
}

impl std::fmt::Debug for PaneContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaneContent::Tree(_) => f.write_str("PaneContent::Tree"),
            PaneContent::Table(_) => f.write_str("PaneContent::Table"),
            PaneContent::Text(_) => f.write_str("PaneContent::Text"),
            PaneContent::Notice(n) => write!(f, "PaneContent::Notice({:?})", n),
            PaneContent::Custom(_) => f.write_str("PaneContent::Custom"),
        }
    }
}

impl PaneContent {
    pub fn render(self, doc: &mut Document, pane: NodeId) {
        match self {
            PaneContent::Tree(node) => render_into(&node, doc, pane),
            PaneContent::Table(node) => {
                if render_config_table(&node, doc, pane, None, &[]).is_none() {
                    render_into(&node, doc, pane);
                }
            }
            PaneContent::Text(text) => render_text_lines_into(&text, doc, pane),
            PaneContent::Notice(message) => {
                let div = doc.append_element(pane, "div");
                doc.set_attr(div, "class", "col-12 text-warning");
                doc.append_text(div, message);
            }
            PaneContent::Custom(build) => build(doc, pane),
        }
    }
}

pub type TabLoader =
    Arc<dyn Fn(TabEntry) -> BoxFuture<'static, Result<PaneContent>> + Send + Sync>;

/// Result of [`TabExplorer::activate`] / [`TabExplorer::reload`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// No entry with that id
    Unknown,
    /// Made visible without fetching
    Shown,
    /// A reload was refused because a fetch is already in flight
    Busy,
    Loaded,
    Failed(String),
}

/// Append the nav and content containers plus one link and one empty pane per
/// entry. Pure DOM work; returns the handles of the two containers.
pub fn build_layout(
    doc: &mut Document,
    nav_parent: NodeId,
    content_parent: NodeId,
    entries: &[TabEntry],
    options: &TabOptions,
) -> TabLayout {
    let vertical = options.style == NavStyle::VerticalPills;

    let nav = doc.append_element(nav_parent, if vertical { "div" } else { "ul" });
    doc.set_attr(nav, "class", options.style.nav_class());
    doc.set_attr(nav, "id", options.nav_id.as_str());
    doc.set_attr(nav, "role", "tablist");
    if vertical {
        doc.set_attr(nav, "aria-orientation", "vertical");
    }

    let content = doc.append_element(content_parent, "div");
    doc.set_attr(content, "class", "tab-content");
    doc.set_attr(content, "id", options.content_id.as_str());

    for entry in entries {
        let holder = if vertical {
            nav
        } else {
            let li = doc.append_element(nav, "li");
            doc.set_attr(li, "class", "nav-item");
            doc.set_attr(li, "role", "presentation");
            li
        };

        let link = doc.append_element(holder, "a");
        doc.set_attr(link, "class", "nav-link");
        doc.set_attr(link, "data-toggle", options.style.toggle());
        doc.set_attr(link, "aria-controls", entry.pane_id.as_str());
        doc.set_attr(link, "aria-selected", "false");
        doc.set_attr(link, "id", entry.id.as_str());
        doc.set_attr(link, "href", format!("#{}", entry.pane_id));
        if entry.lazy {
            doc.set_attr(link, "data-lazy", "true");
        }
        doc.append_text(link, entry.label.as_str());

        let pane = doc.append_element(content, "div");
        doc.set_attr(pane, "class", options.pane_class.as_str());
        doc.set_attr(pane, "role", "tabpanel");
        doc.set_attr(pane, "aria-labelledby", entry.id.as_str());
        doc.set_attr(pane, "id", entry.pane_id.as_str());
    }

    TabLayout {
        nav_id: options.nav_id.clone(),
        content_id: options.content_id.clone(),
        nav,
        content,
    }
}

pub struct TabExplorer {
    document: SharedDocument,
    entries: Mutex<Vec<TabEntry>>,
    options: TabOptions,
    layout: TabLayout,
    loader: Option<TabLoader>,
}

impl TabExplorer {
    /// Lay out `entries` under the elements with ids `nav_parent` and
    /// `content_parent`. `None` when either parent is missing.
    pub fn build(
        document: SharedDocument,
        nav_parent: &str,
        content_parent: &str,
        entries: Vec<TabEntry>,
        options: TabOptions,
        loader: Option<TabLoader>,
    ) -> Option<Self> {
        let layout = {
            let mut doc = document.lock();
            let nav_parent = doc.by_id(nav_parent)?;
            let content_parent = doc.by_id(content_parent)?;
            build_layout(&mut doc, nav_parent, content_parent, &entries, &options)
        };
        debug!(nav = %layout.nav_id, tabs = entries.len(), "Built tab set");

        Some(Self {
            document,
            entries: Mutex::new(entries),
            options,
            layout,
            loader,
        })
    }

    pub fn layout(&self) -> &TabLayout {
        &self.layout
    }

    pub fn entries(&self) -> Vec<TabEntry> {
        self.entries.lock().clone()
    }

    pub fn entry(&self, id: &str) -> Option<TabEntry> {
        self.entries.lock().iter().find(|e| e.id == id).cloned()
    }

    pub fn state(&self, id: &str) -> Option<TabState> {
        self.entries.lock().iter().find(|e| e.id == id).map(|e| e.state)
    }

    /// Show a tab and, for a lazy entry seen for the first time, load its pane.
    pub async fn activate(&self, id: &str) -> Activation {
        let claimed = {
            let mut entries = self.entries.lock();
            let Some(index) = entries.iter().position(|e| e.id == id) else {
                return Activation::Unknown;
            };
            self.show(&entries, index);

            let entry = &mut entries[index];
            let should_fetch = entry.lazy
                && match entry.state {
                    TabState::Pending => true,
                    TabState::Failed => self.options.retry_failed_on_activate,
                    TabState::Loading | TabState::Loaded => false,
                };
            if !should_fetch {
                trace!(tab = id, state = ?entry.state, "Tab shown without fetch");
                return Activation::Shown;
            }
            entry.state = TabState::Loading;
            entry.clone()
        };

        self.load(claimed).await
    }

    /// Refetch a lazy pane regardless of its state, unless a fetch is in
    /// flight. Eager panes have nothing to fetch and are left untouched.
    pub async fn reload(&self, id: &str) -> Activation {
        let claimed = {
            let mut entries = self.entries.lock();
            let Some(entry) = entries.iter_mut().find(|e| e.id == id) else {
                return Activation::Unknown;
            };
            if !entry.lazy {
                trace!(tab = id, "Eager tab, nothing to reload");
                return Activation::Shown;
            }
            if entry.state == TabState::Loading {
                return Activation::Busy;
            }
            entry.state = TabState::Loading;
            entry.clone()
        };

        {
            let mut doc = self.document.lock();
            if let Some(pane) = doc.by_id(&claimed.pane_id) {
                doc.clear(pane);
            }
        }
        self.load(claimed).await
    }

    async fn load(&self, entry: TabEntry) -> Activation {
        let Some(loader) = self.loader.clone() else {
            self.set_state(&entry.id, TabState::Loaded);
            return Activation::Shown;
        };

        debug!(tab = %entry.id, key = %entry.key, "Loading tab");
        match loader(entry.clone()).await {
            Ok(content) => {
                {
                    let mut doc = self.document.lock();
                    match doc.by_id(&entry.pane_id) {
                        Some(pane) => {
                            doc.clear(pane);
                            content.render(&mut doc, pane);
                        }
                        None => trace!(pane = %entry.pane_id, "Pane gone, dropping content"),
                    }
                }
                self.set_state(&entry.id, TabState::Loaded);
                Activation::Loaded
            }
            Err(e) => {
                let message = e.user_message();
                warn!(tab = %entry.id, error = %message, "Tab load failed");
                {
                    let mut doc = self.document.lock();
                    if let Some(pane) = doc.by_id(&entry.pane_id) {
                        doc.clear(pane);
                        let div = doc.append_element(pane, "div");
                        doc.set_attr(div, "class", "col-12 text-danger");
                        doc.append_text(
                            div,
                            format!("{}: {}", self.options.failure_message, message),
                        );
                    }
                    show_warning(
                        &mut doc,
                        &self.options.failure_message,
                        Some(http_details(e.status(), &message).as_str()),
                    );
                }
                self.set_state(&entry.id, TabState::Failed);
                Activation::Failed(message)
            }
        }
    }

    fn set_state(&self, id: &str, state: TabState) {
        if let Some(entry) = self.entries.lock().iter_mut().find(|e| e.id == id) {
            entry.state = state;
        }
    }

    /// Exclusive `active` marking of one link and its pane
    fn show(&self, entries: &[TabEntry], index: usize) {
        let mut doc = self.document.lock();
        for (i, entry) in entries.iter().enumerate() {
            let selected = i == index;
            if let Some(link) = doc.by_id(&entry.id) {
                if selected {
                    doc.add_class(link, "active");
                } else {
                    doc.remove_class(link, "active");
                }
                doc.set_attr(link, "aria-selected", if selected { "true" } else { "false" });
            }
            if let Some(pane) = doc.by_id(&entry.pane_id) {
                if selected {
                    doc.add_class(pane, "show");
                    doc.add_class(pane, "active");
                } else {
                    doc.remove_class(pane, "show");
                    doc.remove_class(pane, "active");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::Error;
    use crate::render::alerts::MAIN_CONTAINER_ID;
    use futures::FutureExt;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn page() -> SharedDocument {
        let mut doc = Document::new();
        let root = doc.root();
        for id in [MAIN_CONTAINER_ID, "nav", "content"] {
            let div = doc.append_element(root, "div");
            doc.set_attr(div, "id", id);
        }
        doc.shared()
    }

    fn entries() -> Vec<TabEntry> {
        vec![
            TabEntry::eager("tab_fe", "FE", "view_fe"),
            TabEntry::lazy("tab_a", "a.example", "view_a", "a.example"),
            TabEntry::lazy("tab_b", "b.example", "view_b", "b.example"),
        ]
    }

    fn counting_loader(calls: Arc<AtomicUsize>, fail_first: usize) -> TabLoader {
        Arc::new(move |entry: TabEntry| {
            let calls = calls.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(30)).await;
                if n < fail_first {
                    return Err(Error::Server {
                        status: 502,
                        message: "bad gateway".to_string(),
                    });
                }
                Ok(PaneContent::Tree(ResourceNode::from(json!({"host": entry.key}))))
            }
            .boxed()
        })
    }

    fn explorer(doc: &SharedDocument, loader: TabLoader, options: TabOptions) -> TabExplorer {
        TabExplorer::build(doc.clone(), "nav", "content", entries(), options, Some(loader)).unwrap()
    }

    #[tokio::test]
    async fn test_build_layout() {
        let doc = page();
        let calls = Arc::new(AtomicUsize::new(0));
        let tabs = explorer(&doc, counting_loader(calls.clone(), 0), TabOptions::default());

        let d = doc.lock();
        let nav = d.by_id("myTab").unwrap();
        assert_eq!(d.attr(nav, "class"), Some("nav nav-pills"));
        assert_eq!(d.children(nav).len(), 3);
        let link = d.by_id("tab_a").unwrap();
        assert_eq!(d.attr(link, "href"), Some("#view_a"));
        assert!(d.children(d.by_id("view_a").unwrap()).is_empty());
        assert_eq!(tabs.state("tab_a"), Some(TabState::Pending));
        assert_eq!(tabs.state("tab_fe"), Some(TabState::Loaded));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_activate_twice_fetches_once() {
        let doc = page();
        let calls = Arc::new(AtomicUsize::new(0));
        let tabs = explorer(&doc, counting_loader(calls.clone(), 0), TabOptions::default());

        let (first, second) = tokio::join!(tabs.activate("tab_a"), tabs.activate("tab_a"));
        assert_eq!(first, Activation::Loaded);
        assert_eq!(second, Activation::Shown);
        assert_eq!(tabs.activate("tab_a").await, Activation::Shown);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(tabs.state("tab_a"), Some(TabState::Loaded));

        let d = doc.lock();
        let pane = d.by_id("view_a").unwrap();
        assert_eq!(d.inner_html(pane), "<b>host:</b> a.example <br>");
    }

    #[tokio::test]
    async fn test_activation_is_exclusive() {
        let doc = page();
        let tabs = explorer(&doc, counting_loader(Arc::new(AtomicUsize::new(0)), 0), TabOptions::default());

        tabs.activate("tab_fe").await;
        tabs.activate("tab_b").await;

        let d = doc.lock();
        assert!(d.has_class(d.by_id("tab_b").unwrap(), "active"));
        assert!(d.has_class(d.by_id("view_b").unwrap(), "active"));
        assert!(!d.has_class(d.by_id("tab_fe").unwrap(), "active"));
        assert!(!d.has_class(d.by_id("view_fe").unwrap(), "show"));
        assert_eq!(d.attr(d.by_id("tab_fe").unwrap(), "aria-selected"), Some("false"));
    }

    #[tokio::test]
    async fn test_failure_marks_pane_and_stays_failed() {
        let doc = page();
        let calls = Arc::new(AtomicUsize::new(0));
        let tabs = explorer(&doc, counting_loader(calls.clone(), 1), TabOptions::default());

        let outcome = tabs.activate("tab_a").await;
        assert_eq!(outcome, Activation::Failed("bad gateway".to_string()));
        assert_eq!(tabs.state("tab_a"), Some(TabState::Failed));

        {
            let d = doc.lock();
            let pane = d.by_id("view_a").unwrap();
            let error = d.children(pane)[0];
            assert_eq!(d.attr(error, "class"), Some("col-12 text-danger"));
            assert!(d.text_content(error).contains("bad gateway"));

            let main = d.by_id(MAIN_CONTAINER_ID).unwrap();
            let banner = d.children(main)[0];
            assert!(d.text_content(banner).contains("HTTP 502 – bad gateway"));
        }

        // Without the retry option a failed pane is left alone
        assert_eq!(tabs.activate("tab_a").await, Activation::Shown);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_failed_on_activate() {
        let doc = page();
        let calls = Arc::new(AtomicUsize::new(0));
        let options = TabOptions {
            retry_failed_on_activate: true,
            ..TabOptions::default()
        };
        let tabs = explorer(&doc, counting_loader(calls.clone(), 1), options);

        assert!(matches!(tabs.activate("tab_a").await, Activation::Failed(_)));
        assert_eq!(tabs.activate("tab_a").await, Activation::Loaded);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let d = doc.lock();
        let pane = d.by_id("view_a").unwrap();
        assert!(!d.text_content(pane).contains("bad gateway"));
    }

    #[tokio::test]
    async fn test_reload_refetches() {
        let doc = page();
        let calls = Arc::new(AtomicUsize::new(0));
        let tabs = explorer(&doc, counting_loader(calls.clone(), 0), TabOptions::default());

        tabs.activate("tab_a").await;
        assert_eq!(tabs.reload("tab_a").await, Activation::Loaded);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // Pane holds one copy, not two
        let d = doc.lock();
        let pane = d.by_id("view_a").unwrap();
        assert_eq!(d.children(pane).len(), 4);
    }

    #[tokio::test]
    async fn test_reload_leaves_eager_pane_alone() {
        let doc = page();
        let calls = Arc::new(AtomicUsize::new(0));
        let tabs = explorer(&doc, counting_loader(calls.clone(), 0), TabOptions::default());
        {
            let mut d = doc.lock();
            let pane = d.by_id("view_fe").unwrap();
            let table = d.append_element(pane, "table");
            d.set_attr(table, "id", "viewtb_fe");
        }

        assert_eq!(tabs.reload("tab_fe").await, Activation::Shown);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(tabs.state("tab_fe"), Some(TabState::Loaded));
        assert!(doc.lock().contains_id("viewtb_fe"));
    }

    #[tokio::test]
    async fn test_reload_while_loading_is_busy() {
        let doc = page();
        let calls = Arc::new(AtomicUsize::new(0));
        let tabs = explorer(&doc, counting_loader(calls.clone(), 0), TabOptions::default());

        let (first, second) = tokio::join!(tabs.activate("tab_b"), async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            tabs.reload("tab_b").await
        });
        assert_eq!(first, Activation::Loaded);
        assert_eq!(second, Activation::Busy);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_pane_is_harmless() {
        let doc = page();
        let calls = Arc::new(AtomicUsize::new(0));
        let tabs = explorer(&doc, counting_loader(calls.clone(), 0), TabOptions::default());

        {
            let mut d = doc.lock();
            let pane = d.by_id("view_b").unwrap();
            d.remove(pane);
        }
        assert_eq!(tabs.activate("tab_b").await, Activation::Loaded);
        assert_eq!(tabs.activate("nope").await, Activation::Unknown);
    }

    #[test]
    fn test_missing_parent_builds_nothing() {
        let doc = Document::new().shared();
        assert!(TabExplorer::build(doc, "nav", "content", entries(), TabOptions::default(), None).is_none());
    }

    #[test]
    fn test_notice_content() {
        let mut doc = Document::new();
        let root = doc.root();
        let pane = doc.append_element(root, "div");
        PaneContent::Notice("No data returned".into()).render(&mut doc, pane);
        assert_eq!(
            doc.inner_html(pane),
            "<div class=\"col-12 text-warning\">No data returned</div>"
        );
    }
}
