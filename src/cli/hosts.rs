use clap::Args;

use super::connect;
use crate::api::{HostQuery, SiteApi};
use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::explorer::build_host_pane;
use crate::render::Document;

/// Arguments for the hosts command
#[derive(Args, Debug)]
#[command(after_help = "EXAMPLES:
    siterm-console hosts                        List hosts of the site
    siterm-console hosts --host dtn1.site.org   Show one host by category")]
pub struct HostsArgs {
    /// Show details for this host
    #[arg(long)]
    pub host: Option<String>,

    /// Site name (default: general.sitename of the frontend configuration)
    #[arg(long)]
    pub site: Option<String>,

    /// JSON output for scripting
    #[arg(long)]
    pub json: bool,
}

pub async fn run(config: &Config, args: HostsArgs) -> Result<()> {
    let api = SiteApi::new(connect(config)?);
    let site = match args.site {
        Some(site) => site,
        None => SiteApi::sitename(&api.frontend_configuration().await?)?,
    };

    let Some(hostname) = args.host else {
        let hosts = api.hosts(&site, &HostQuery::listing()).await?;
        if args.json {
            let names: Vec<&str> = hosts.iter().map(|h| h.hostname.as_str()).collect();
            println!("{}", serde_json::to_string_pretty(&names)?);
        } else if hosts.is_empty() {
            println!("No hosts registered for {}.", site);
        } else {
            println!("Hosts of {}:", site);
            for host in &hosts {
                println!("  {}", host.hostname);
            }
        }
        return Ok(());
    };

    let host = api
        .host_detail(&site, &hostname)
        .await?
        .ok_or_else(|| Error::InvalidPayload {
            message: format!("No data returned for {}", hostname),
        })?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&host.raw.to_value())?);
        return Ok(());
    }

    let mut doc = Document::new();
    let root = doc.root();
    build_host_pane(&mut doc, root, &site, &host);
    // Forms and the empty alert region carry no text worth printing
    println!("{} ({})", host.hostname, host.ip.as_deref().unwrap_or("no ip"));
    for (category, _) in host.hostinfo.as_mapping().unwrap_or_default() {
        let table_id = format!("agent_{}_{}", host.html_name(), category);
        if let Some(table) = doc.by_id(&table_id) {
            println!("\n[{}]\n{}", category, doc.to_text(table));
        }
    }
    Ok(())
}
