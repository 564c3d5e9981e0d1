//! CLI command definitions and handlers

pub mod get;
pub mod hosts;
pub mod login;
pub mod logout;
pub mod status;
pub mod web;
pub mod whoami;

use clap::{Parser, Subcommand};
use std::sync::Arc;

use crate::auth::AuthGateway;
use crate::core::config::Config;
use crate::core::error::Result;
use crate::render::{render_into, Document, ResourceNode};

const LONG_ABOUT: &str = r#"
Operations console for a SiteRM frontend.

QUICK START:
    1. siterm-console login           Authenticate against the frontend
    2. siterm-console status          Check liveness and readiness
    3. siterm-console web --open      Browse sites and hosts in the browser

INSPECTION:
    siterm-console whoami             Show the logged-in identity
    siterm-console hosts              List hosts of the site
    siterm-console hosts --host dtn1  Show a host's details by category
    siterm-console get deltas         Dump a site resource
    siterm-console get prometheus     Raw Prometheus metrics

CONFIGURATION:
    The API address comes from --api-url, then SITERM_API_URL, then
    api.base_url in config.toml under the console home
    (SITERM_CONSOLE_HOME overrides its location).
"#;

/// Operations console for a SiteRM frontend
#[derive(Parser, Debug)]
#[command(name = "siterm-console")]
#[command(author, version)]
#[command(about = "Operations console for a SiteRM frontend")]
#[command(long_about = LONG_ABOUT)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Frontend base URL (overrides config and SITERM_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in and store the access token
    Login(login::LoginArgs),

    /// Forget the stored access token
    Logout,

    /// Show who the stored token belongs to
    Whoami(whoami::WhoamiArgs),

    /// Probe liveness, readiness and session health
    #[command(visible_alias = "st")]
    Status(status::StatusArgs),

    /// List hosts, or show one host's details
    Hosts(hosts::HostsArgs),

    /// Fetch a site resource or any API path
    Get(get::GetArgs),

    /// Serve the console in the browser
    #[command(visible_alias = "w")]
    Web(web::WebArgs),
}

impl Cli {
    /// Configuration with the command-line override applied
    pub fn config(&self) -> Result<Config> {
        let mut config = Config::load()?;
        if let Some(url) = &self.api_url {
            config.api.base_url = url.clone();
        }
        Ok(config)
    }
}

pub(crate) fn connect(config: &Config) -> Result<Arc<AuthGateway>> {
    Ok(Arc::new(AuthGateway::from_config(config)?))
}

/// Terminal rendering of a payload, one `key: value` per line
pub fn node_text(node: &ResourceNode) -> String {
    let mut doc = Document::new();
    let root = doc.root();
    render_into(node, &mut doc, root);
    doc.to_text(root)
}
