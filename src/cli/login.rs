use clap::Args;
use dialoguer::{theme::ColorfulTheme, Input, Password};

use super::connect;
use crate::core::config::Config;
use crate::core::error::Result;

/// Arguments for the login command
#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Username (prompted when omitted)
    #[arg(short, long)]
    pub username: Option<String>,
}

pub async fn run(config: &Config, args: LoginArgs) -> Result<()> {
    let gateway = connect(config)?;
    let theme = ColorfulTheme::default();

    let username = match args.username {
        Some(username) => username,
        None => Input::<String>::with_theme(&theme)
            .with_prompt("Username")
            .interact_text()?,
    };
    let password = Password::with_theme(&theme)
        .with_prompt("Password")
        .interact()?;

    gateway.login(&username, &password).await?;
    println!("\n✓ Logged in to {} as {}", gateway.base_url(), username);
    Ok(())
}
