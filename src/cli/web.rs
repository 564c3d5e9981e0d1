//! Web command implementation
//!
//! Launches the console web UI on localhost.

use clap::Args;

use crate::core::config::Config;
use crate::core::error::Result;

/// Arguments for the web command
#[derive(Args, Debug)]
#[command(after_help = "EXAMPLES:
    siterm-console web                Start web UI on the configured port
    siterm-console web --port 8081    Use custom port
    siterm-console web --open         Auto-open browser")]
pub struct WebArgs {
    /// Port to serve on (default: web.port from config, 3000)
    #[arg(long)]
    pub port: Option<u16>,

    /// Auto-open browser
    #[arg(long)]
    pub open: bool,
}

pub async fn run(config: &Config, args: WebArgs) -> Result<()> {
    let port = args.port.unwrap_or(config.web.port);
    crate::web::run(config, port, args.open).await
}
