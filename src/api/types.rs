//! Request and response shapes for the site endpoints

use serde::Serialize;
use serde_json::Value;

use crate::core::error::{Error, Result};
use crate::render::ResourceNode;

/// Hostname of the pseudo-host that stands for the frontend itself
pub const DEFAULT_HOST: &str = "default";

/// Query for `GET /api/<site>/hosts`
#[derive(Debug, Clone)]
pub struct HostQuery {
    pub details: bool,
    pub limit: usize,
    pub hostname: Option<String>,
}

impl HostQuery {
    /// Summary listing, as used to build the host tabs
    pub fn listing() -> Self {
        Self {
            details: false,
            limit: 100,
            hostname: None,
        }
    }

    /// Full record for a single host
    pub fn detail(hostname: &str) -> Self {
        Self {
            details: true,
            limit: 1,
            hostname: Some(hostname.to_string()),
        }
    }

    pub(crate) fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("details", self.details.to_string()),
            ("limit", self.limit.to_string()),
        ];
        if let Some(hostname) = &self.hostname {
            params.push(("hostname", hostname.clone()));
        }
        params
    }
}

/// One entry of a hosts listing
#[derive(Debug, Clone)]
pub struct HostRecord {
    pub hostname: String,
    pub ip: Option<String>,
    /// Per-category host information, empty for summary listings
    pub hostinfo: ResourceNode,
    /// The whole record as received
    pub raw: ResourceNode,
}

impl HostRecord {
    /// Build from one element of the hosts array.
    ///
    /// Older agents report `hostinfo` as a JSON-encoded string; it is decoded
    /// when possible and kept as text otherwise.
    pub fn from_value(value: Value) -> Result<Self> {
        let hostname = value
            .get("hostname")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::InvalidPayload {
                message: "host entry without hostname".to_string(),
            })?
            .to_string();
        let ip = value.get("ip").and_then(Value::as_str).map(str::to_string);

        let hostinfo = match value.get("hostinfo") {
            None | Some(Value::Null) => ResourceNode::Mapping(Vec::new()),
            Some(Value::String(text)) => {
                ResourceNode::parse(text).unwrap_or_else(|_| ResourceNode::string(text.clone()))
            }
            Some(other) => ResourceNode::from(other.clone()),
        };

        Ok(Self {
            hostname,
            ip,
            hostinfo,
            raw: ResourceNode::from(value),
        })
    }

    /// Hostname with dots replaced, safe to embed in element ids
    pub fn html_name(&self) -> String {
        html_hostname(&self.hostname)
    }
}

/// `host.example.org` becomes `host_example_org`
pub fn html_hostname(hostname: &str) -> String {
    hostname.replace('.', "_")
}

/// Body of `DELETE /api/<site>/hosts`
#[derive(Debug, Clone, Serialize)]
pub struct DeleteHostRequest {
    pub hostname: String,
    pub ip: String,
    pub sitename: String,
}

/// Body of `POST /api/<site>/serviceaction`
#[derive(Debug, Clone, Serialize)]
pub struct ServiceAction {
    pub hostname: String,
    pub servicename: String,
    pub action: String,
    pub sitename: String,
}

impl ServiceAction {
    /// Ask every service on `hostname` to reload its configuration
    pub fn reload_all(sitename: &str, hostname: &str) -> Self {
        Self {
            hostname: hostname.to_string(),
            servicename: "ALL".to_string(),
            action: "reload".to_string(),
            sitename: sitename.to_string(),
        }
    }
}
