//! `banter init` - Write a starter config file.

use banter_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::default_path();

    if config_path.exists() {
        println!("⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run init.");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("✅ Created {}", config_path.display());
    println!("\n📝 Next steps:");
    println!("   1. Set nlp.api_key in {} (or NLP_API_KEY in .env)", config_path.display());
    println!("   2. Run: banter doctor");
    println!("   3. Run: banter serve\n");

    Ok(())
}
