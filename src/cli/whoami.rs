use clap::Args;

use super::connect;
use crate::core::config::Config;
use crate::core::error::{Error, Result};

/// Arguments for the whoami command
#[derive(Args, Debug)]
pub struct WhoamiArgs {
    /// Print the full identity document as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(config: &Config, args: WhoamiArgs) -> Result<()> {
    let gateway = connect(config)?;
    if gateway.tokens().get().is_none() {
        return Err(Error::Unauthorized);
    }

    // A rejected token is cleared by whoami itself
    let identity = gateway.whoami().await.ok_or(Error::Unauthorized)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&identity)?);
    } else {
        println!("{}", identity.user.as_deref().unwrap_or("Unknown Username"));
    }
    Ok(())
}
