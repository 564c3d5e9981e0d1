use super::connect;
use crate::core::config::Config;
use crate::core::error::Result;

pub fn run(config: &Config) -> Result<()> {
    let gateway = connect(config)?;
    let had_token = gateway.tokens().get().is_some();
    gateway.logout()?;

    if had_token {
        println!("✓ Logged out");
    } else {
        println!("Not logged in.");
    }
    Ok(())
}
