//! SiteRM frontend REST API

mod client;
mod types;

pub use client::{SiteApi, SiteResource, FRONTEND_CONFIG_PATH};
pub use types::{
    html_hostname, DeleteHostRequest, HostQuery, HostRecord, ServiceAction, DEFAULT_HOST,
};
