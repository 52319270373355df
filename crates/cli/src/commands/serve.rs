//! `banter serve` - Start the HTTP API server.

use std::path::Path;

pub async fn run(
    config_path: Option<&Path>,
    port_override: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config(config_path)?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("💬 Banter");
    println!("   Listening:   {}", config.bind_addr());
    println!("   Database:    {}", config.database.path);
    println!("   Token limit: {}", config.token_limit);

    banter_gateway::start(config).await?;

    Ok(())
}
