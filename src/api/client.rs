//! Typed calls against the SiteRM frontend REST API
//!
//! Every call goes through the [`AuthGateway`], so the bearer token is attached
//! and a 401 anywhere ends the session.

use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::types::{DeleteHostRequest, HostQuery, HostRecord, ServiceAction};
use crate::auth::AuthGateway;
use crate::core::error::{Error, Result};
use crate::render::ResourceNode;

/// Frontend configuration endpoint
pub const FRONTEND_CONFIG_PATH: &str = "/api/frontend/configuration";

/// Site-scoped resources readable as JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteResource {
    Debug,
    Deltas,
    Models,
    ServiceStates,
    ActiveDeltas,
}

impl SiteResource {
    pub fn segment(&self) -> &'static str {
        match self {
            SiteResource::Debug => "debug",
            SiteResource::Deltas => "deltas",
            SiteResource::Models => "models",
            SiteResource::ServiceStates => "servicestates",
            SiteResource::ActiveDeltas => "frontend/activedeltas",
        }
    }

    /// Parse a resource name as typed on the command line
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "debug" => Some(SiteResource::Debug),
            "deltas" => Some(SiteResource::Deltas),
            "models" => Some(SiteResource::Models),
            "servicestates" => Some(SiteResource::ServiceStates),
            "activedeltas" => Some(SiteResource::ActiveDeltas),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct SiteApi {
    gateway: Arc<AuthGateway>,
}

impl SiteApi {
    pub fn new(gateway: Arc<AuthGateway>) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &Arc<AuthGateway> {
        &self.gateway
    }

    /// Frontend configuration, keys in server order
    pub async fn frontend_configuration(&self) -> Result<ResourceNode> {
        let value = self.gateway.get_json(FRONTEND_CONFIG_PATH, &[]).await?;
        Ok(ResourceNode::from(value))
    }

    /// `general.sitename` of a frontend configuration
    pub fn sitename(config: &ResourceNode) -> Result<String> {
        config
            .get("general")
            .and_then(|g| g.get("sitename"))
            .and_then(ResourceNode::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::InvalidPayload {
                message: "configuration has no general.sitename".to_string(),
            })
    }

    pub async fn hosts(&self, site: &str, query: &HostQuery) -> Result<Vec<HostRecord>> {
        let path = format!("/api/{}/hosts", site);
        let value = self.gateway.get_json(&path, &query.params()).await?;

        let items = match value {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => {
                return Err(Error::InvalidPayload {
                    message: format!("expected a host list, got {}", kind_of(&other)),
                })
            }
        };
        debug!(site, count = items.len(), "Fetched hosts");
        let hosts = items
            .into_iter()
            .filter_map(|item| match HostRecord::from_value(item) {
                Ok(host) => Some(host),
                Err(e) => {
                    warn!(site, error = %e, "Skipping host record");
                    None
                }
            })
            .collect();
        Ok(hosts)
    }

    /// Full record of one host, `None` when the server returns nothing
    pub async fn host_detail(&self, site: &str, hostname: &str) -> Result<Option<HostRecord>> {
        let mut hosts = self.hosts(site, &HostQuery::detail(hostname)).await?;
        Ok(if hosts.is_empty() {
            None
        } else {
            Some(hosts.swap_remove(0))
        })
    }

    pub async fn delete_host(&self, request: &DeleteHostRequest) -> Result<Value> {
        let path = format!("/api/{}/hosts", request.sitename);
        info!(site = %request.sitename, host = %request.hostname, "Deleting host");
        self.gateway.send_json(Method::DELETE, &path, request).await
    }

    pub async fn service_action(&self, action: &ServiceAction) -> Result<Value> {
        let path = format!("/api/{}/serviceaction", action.sitename);
        info!(
            site = %action.sitename,
            host = %action.hostname,
            action = %action.action,
            "Submitting service action"
        );
        self.gateway.send_json(Method::POST, &path, action).await
    }

    pub async fn reload_config(&self, site: &str, hostname: &str) -> Result<Value> {
        self.service_action(&ServiceAction::reload_all(site, hostname))
            .await
    }

    /// List a site resource
    pub async fn resource(
        &self,
        site: &str,
        resource: SiteResource,
        query: &[(&str, String)],
    ) -> Result<ResourceNode> {
        let path = format!("/api/{}/{}", site, resource.segment());
        self.get(&path, query).await
    }

    /// One item of a site resource, e.g. a single delta or debug request
    pub async fn resource_item(
        &self,
        site: &str,
        resource: SiteResource,
        id: &str,
        query: &[(&str, String)],
    ) -> Result<ResourceNode> {
        let path = format!("/api/{}/{}/{}", site, resource.segment(), id);
        self.get(&path, query).await
    }

    /// Raw Prometheus exposition text
    pub async fn prometheus_metrics(&self, site: &str) -> Result<String> {
        let path = format!("/api/{}/monitoring/prometheus/metrics", site);
        self.gateway.get_text(&path).await
    }

    /// GET any JSON path
    pub async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<ResourceNode> {
        let value = self.gateway.get_json(path, query).await?;
        Ok(ResourceNode::from(value))
    }

    /// GET any path as text
    pub async fn get_text(&self, path: &str) -> Result<String> {
        self.gateway.get_text(path).await
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
