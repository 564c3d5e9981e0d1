//! Two-level site explorer: one frontend tab plus one lazy tab per host
//!
//! Host tabs fetch their detail record on first activation and lay it out as a
//! vertical pill set, one pill per `hostinfo` category.

use futures::FutureExt;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use super::tabs::{
    build_layout, Activation, NavStyle, PaneContent, TabEntry, TabExplorer, TabLoader, TabOptions,
};
use crate::api::{html_hostname, DeleteHostRequest, HostQuery, HostRecord, SiteApi, DEFAULT_HOST};
use crate::core::error::{Error, Result};
use crate::render::alerts::{http_details, new_alert, show_warning};
use crate::render::{render_config_table, Document, NodeId, ResourceNode, SharedDocument};

/// Element receiving the site nav
pub const SITES_NAV_PARENT: &str = "sites_tab";

/// Element receiving the site panes
pub const SITES_CONTENT_PARENT: &str = "main_tab";

/// Form action for the Delete Host button
pub const DELETE_HOST_ACTION: &str = "/console/hosts/delete";

/// Form action for the Reload Config button
pub const RELOAD_CONFIG_ACTION: &str = "/console/hosts/reload";

const SUMMARY_KEY: &str = "Summary";

pub struct SiteExplorer {
    api: SiteApi,
    document: SharedDocument,
    sitename: String,
    tabs: TabExplorer,
}

impl SiteExplorer {
    /// Read the frontend configuration and host listing and lay out the tabs.
    ///
    /// A failed host listing raises a warning banner; the frontend tab is
    /// still built.
    pub async fn load(api: SiteApi, document: SharedDocument) -> Result<Self> {
        let config = api.frontend_configuration().await?;
        let sitename = SiteApi::sitename(&config)?;

        let hosts = match api.hosts(&sitename, &HostQuery::listing()).await {
            Ok(hosts) => hosts,
            Err(e) => {
                warn!(site = %sitename, error = %e, "Failed to load hosts");
                let details = http_details(e.status(), &e.user_message());
                show_warning(&mut document.lock(), "Failed to load hosts", Some(details.as_str()));
                Vec::new()
            }
        };

        let mut entries = vec![TabEntry::eager(
            format!("tab_fe_{}", sitename),
            format!("{} FE", sitename),
            format!("view_fe_{}", sitename),
        )];
        entries.extend(hosts.iter().map(|host| {
            let name = format!("{}_{}", sitename, host.html_name());
            TabEntry::lazy(
                format!("tab_{}", name),
                host.hostname.as_str(),
                format!("view_{}", name),
                host.hostname.as_str(),
            )
        }));

        let options = TabOptions {
            nav_id: "myTab".to_string(),
            content_id: "sites".to_string(),
            style: NavStyle::Pills,
            failure_message: "Failed to load host details".to_string(),
            ..TabOptions::default()
        };
        let loader = host_loader(api.clone(), sitename.clone());
        let tabs = TabExplorer::build(
            document.clone(),
            SITES_NAV_PARENT,
            SITES_CONTENT_PARENT,
            entries,
            options,
            Some(loader),
        )
        .ok_or_else(|| Error::InvalidPayload {
            message: format!(
                "page has no #{} / #{} containers",
                SITES_NAV_PARENT, SITES_CONTENT_PARENT
            ),
        })?;

        {
            let mut doc = document.lock();
            if let Some(pane) = doc.by_id(&format!("view_fe_{}", sitename)) {
                let ip = config.get("ip").and_then(ResourceNode::as_str).unwrap_or("");
                append_alert_region(&mut doc, pane, DEFAULT_HOST);
                append_host_buttons(&mut doc, pane, &sitename, DEFAULT_HOST, ip);
                render_config_table(
                    &config,
                    &mut doc,
                    pane,
                    Some(format!("viewtb_{}", sitename).as_str()),
                    &["hostinfo"],
                );
            }
        }

        info!(site = %sitename, hosts = hosts.len(), "Site explorer ready");
        Ok(Self {
            api,
            document,
            sitename,
            tabs,
        })
    }

    pub fn sitename(&self) -> &str {
        &self.sitename
    }

    pub fn tabs(&self) -> &TabExplorer {
        &self.tabs
    }

    pub async fn activate(&self, id: &str) -> Activation {
        self.tabs.activate(id).await
    }

    pub async fn reload(&self, id: &str) -> Activation {
        self.tabs.reload(id).await
    }

    /// Delete a host and report the server's answer in its alert region
    pub async fn delete_host(&self, hostname: &str, ip: &str) -> Result<Value> {
        let request = DeleteHostRequest {
            hostname: hostname.to_string(),
            ip: ip.to_string(),
            sitename: self.sitename.clone(),
        };
        let result = self.api.delete_host(&request).await;
        self.report(hostname, "Host delete sent: ", "Failed to delete host", result)
    }

    /// Ask every service on a host to reload its configuration
    pub async fn reload_config(&self, hostname: &str) -> Result<Value> {
        let result = self.api.reload_config(&self.sitename, hostname).await;
        self.report(
            hostname,
            "Service action submitted:",
            "Failed to submit service action",
            result,
        )
    }

    fn report(
        &self,
        hostname: &str,
        prefix: &str,
        failure: &str,
        result: Result<Value>,
    ) -> Result<Value> {
        let mut doc = self.document.lock();
        match &result {
            Ok(answer) => {
                new_alert(&mut doc, &html_hostname(hostname), &format!("{}{}", prefix, answer));
            }
            Err(e) => {
                let details = http_details(e.status(), &e.user_message());
                show_warning(&mut doc, failure, Some(details.as_str()));
            }
        }
        result
    }
}

fn host_loader(api: SiteApi, sitename: String) -> TabLoader {
    Arc::new(move |entry: TabEntry| {
        let api = api.clone();
        let sitename = sitename.clone();
        async move {
            let detail = api.host_detail(&sitename, &entry.key).await?;
            let content = match detail {
                None => PaneContent::Notice("No data returned".to_string()),
                Some(host) => PaneContent::Custom(Box::new(move |doc: &mut Document, pane: NodeId| {
                    build_host_pane(doc, pane, &sitename, &host)
                })),
            };
            Ok(content)
        }
        .boxed()
    })
}

/// Alerts region, host buttons, and one vertical pill per mapping-valued
/// `hostinfo` category
pub fn build_host_pane(doc: &mut Document, pane: NodeId, sitename: &str, host: &HostRecord) {
    let html_name = host.html_name();
    append_alert_region(doc, pane, &host.hostname);
    append_host_buttons(doc, pane, sitename, &host.hostname, host.ip.as_deref().unwrap_or(""));

    let categories: Vec<(&str, &ResourceNode)> = host
        .hostinfo
        .as_mapping()
        .unwrap_or_default()
        .iter()
        .filter(|(key, value)| key != SUMMARY_KEY && value.is_mapping())
        .map(|(key, value)| (key.as_str(), value))
        .collect();

    let entries: Vec<TabEntry> = categories
        .iter()
        .map(|(key, _)| {
            let pane_id = format!("v-pills-{}_{}", html_name, key);
            TabEntry::eager(format!("{}-tab", pane_id), *key, pane_id)
        })
        .collect();

    let row = doc.append_element(pane, "div");
    doc.set_attr(row, "class", "row");
    let menu = doc.append_element(row, "div");
    doc.set_attr(menu, "class", "col-3");
    let body = doc.append_element(row, "div");
    doc.set_attr(body, "class", "col-9");

    let options = TabOptions {
        nav_id: format!("v-pills-tab-{}", html_name),
        content_id: format!("v-pills-tabContent-{}", html_name),
        style: NavStyle::VerticalPills,
        ..TabOptions::default()
    };
    build_layout(doc, menu, body, &entries, &options);

    for (entry, (key, value)) in entries.iter().zip(&categories) {
        if let Some(category_pane) = doc.by_id(&entry.pane_id) {
            let table_id = format!("agent_{}_{}", html_name, key);
            render_config_table(value, doc, category_pane, Some(table_id.as_str()), &[]);
        }
    }

    if let Some(first) = entries.first() {
        if let (Some(link), Some(first_pane)) = (doc.by_id(&first.id), doc.by_id(&first.pane_id)) {
            doc.add_class(link, "active");
            doc.set_attr(link, "aria-selected", "true");
            doc.add_class(first_pane, "show");
            doc.add_class(first_pane, "active");
        }
    }
}

fn append_alert_region(doc: &mut Document, pane: NodeId, hostname: &str) {
    let alerts = doc.append_element(pane, "div");
    doc.set_attr(alerts, "class", "col-md-12");
    doc.set_attr(alerts, "id", format!("alerts{}", html_hostname(hostname)));
}

/// Delete Host (never for the default host) and Reload Config forms
fn append_host_buttons(doc: &mut Document, pane: NodeId, sitename: &str, hostname: &str, ip: &str) {
    let html_name = html_hostname(hostname);
    let row = doc.append_element(pane, "div");
    doc.set_attr(row, "class", "row");

    if hostname != DEFAULT_HOST {
        let form = append_form(doc, row, &format!("del-{}", html_name), DELETE_HOST_ACTION);
        append_hidden(doc, form, "hostname", hostname);
        append_hidden(doc, form, "ip", ip);
        append_hidden(doc, form, "sitename", sitename);
        append_submit(doc, form, "Delete Host", "btn btn-danger");
    }

    let form = append_form(doc, row, &format!("rel-{}", html_name), RELOAD_CONFIG_ACTION);
    append_hidden(doc, form, "hostname", hostname);
    append_hidden(doc, form, "servicename", "ALL");
    append_hidden(doc, form, "action", "reload");
    append_hidden(doc, form, "sitename", sitename);
    append_submit(doc, form, "Reload Config", "btn btn-info");
}

fn append_form(doc: &mut Document, row: NodeId, id: &str, action: &str) -> NodeId {
    let wrapper = doc.append_element(row, "div");
    doc.set_attr(wrapper, "class", "px-1 py-1");
    let form = doc.append_element(wrapper, "form");
    doc.set_attr(form, "id", id);
    doc.set_attr(form, "name", id);
    doc.set_attr(form, "method", "post");
    doc.set_attr(form, "action", action);
    form
}

fn append_hidden(doc: &mut Document, form: NodeId, name: &str, value: &str) {
    let input = doc.append_element(form, "input");
    doc.set_attr(input, "name", name);
    doc.set_attr(input, "type", "hidden");
    doc.set_attr(input, "value", value);
}

fn append_submit(doc: &mut Document, form: NodeId, label: &str, class: &str) {
    let input = doc.append_element(form, "input");
    doc.set_attr(input, "value", label);
    doc.set_attr(input, "type", "submit");
    doc.set_attr(input, "class", class);
}
