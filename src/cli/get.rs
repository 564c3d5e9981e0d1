use clap::Args;

use super::{connect, node_text};
use crate::api::{SiteApi, SiteResource};
use crate::core::config::Config;
use crate::core::error::{Error, Result};

/// Arguments for the get command
#[derive(Args, Debug)]
#[command(after_help = "EXAMPLES:
    siterm-console get deltas                   List deltas of the site
    siterm-console get deltas 3f2a...           One delta
    siterm-console get models -q limit=10       Query parameters
    siterm-console get prometheus               Raw metrics text
    siterm-console get /api/frontend/sites      Any API path")]
pub struct GetArgs {
    /// debug, deltas, models, servicestates, activedeltas, prometheus, or a path starting with '/'
    pub target: String,

    /// Item id within the resource
    pub id: Option<String>,

    /// Site name (default: general.sitename of the frontend configuration)
    #[arg(long)]
    pub site: Option<String>,

    /// Query parameter, repeatable
    #[arg(short, long = "query", value_parser = parse_query)]
    pub query: Vec<(String, String)>,

    /// Print the body as raw text
    #[arg(long, conflicts_with = "json")]
    pub text: bool,

    /// Print the body as JSON
    #[arg(long)]
    pub json: bool,
}

fn parse_query(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))
}

pub async fn run(config: &Config, args: GetArgs) -> Result<()> {
    let api = SiteApi::new(connect(config)?);
    let query: Vec<(&str, String)> = args
        .query
        .iter()
        .map(|(k, v)| (k.as_str(), v.clone()))
        .collect();

    if args.target.starts_with('/') {
        if args.text {
            println!("{}", api.get_text(&args.target).await?);
            return Ok(());
        }
        let node = api.get(&args.target, &query).await?;
        return print(&node, args.json);
    }

    let site = match &args.site {
        Some(site) => site.clone(),
        None => SiteApi::sitename(&api.frontend_configuration().await?)?,
    };

    if args.target == "prometheus" {
        print!("{}", api.prometheus_metrics(&site).await?);
        return Ok(());
    }

    let resource = SiteResource::from_name(&args.target).ok_or_else(|| Error::ConfigError {
        message: format!("unknown resource '{}'", args.target),
    })?;
    let node = match &args.id {
        Some(id) => api.resource_item(&site, resource, id, &query).await?,
        None => api.resource(&site, resource, &query).await?,
    };
    print(&node, args.json)
}

fn print(node: &crate::render::ResourceNode, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&node.to_value())?);
    } else {
        println!("{}", node_text(node));
    }
    Ok(())
}
