use clap::Args;
use std::sync::Arc;

use super::connect;
use crate::auth::SessionController;
use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::status::{HealthIndicator, IndicatorStatus, LayoutGate, StatusPoller};

/// Arguments for the status command
#[derive(Args, Debug)]
#[command(after_help = "EXAMPLES:
    siterm-console status             Probe once
    siterm-console status --watch     Re-probe every poll interval until Ctrl+C
    siterm-console status --json      Indicator state as JSON")]
pub struct StatusArgs {
    /// Keep polling at the configured interval
    #[arg(short, long)]
    pub watch: bool,

    /// JSON output for scripting
    #[arg(long)]
    pub json: bool,
}

pub async fn run(config: &Config, args: StatusArgs) -> Result<()> {
    let gateway = connect(config)?;
    if !SessionController::new(gateway.clone()).boot().await.is_authenticated() {
        return Err(Error::Unauthorized);
    }

    let poller = Arc::new(StatusPoller::new(
        gateway.clone(),
        config.poll_interval(),
        LayoutGate::open(),
    ));

    if !args.watch {
        poller.tick().await;
        return print(&poller.indicators(), args.json);
    }

    let mut ticker = tokio::time::interval(config.poll_interval());
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                poller.tick().await;
                print(&poller.indicators(), args.json)?;
                if !gateway.session_state().is_authenticated() {
                    return Err(Error::Unauthorized);
                }
            }
            _ = tokio::signal::ctrl_c() => return Ok(()),
        }
    }
}

fn print(indicators: &[HealthIndicator], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(indicators)?);
        return Ok(());
    }

    let line: Vec<String> = indicators.iter().map(colorize).collect();
    println!("{}", line.join("  "));
    Ok(())
}

fn colorize(indicator: &HealthIndicator) -> String {
    let color = match indicator.status {
        IndicatorStatus::Ok => "32",
        IndicatorStatus::Fail => "31",
        IndicatorStatus::Error => "33",
    };
    format!("\x1b[{}m{}\x1b[0m", color, indicator.text)
}
