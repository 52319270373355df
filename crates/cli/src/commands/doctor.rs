//! `banter doctor` - Diagnose configuration and storage.

use std::path::Path;

use banter_config::AppConfig;
use banter_core::store::SessionStore;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 Banter Doctor");
    println!("================\n");

    let mut issues = 0;

    let config = match AppConfig::load(config_path) {
        Ok(config) => {
            println!("  ✅ Configuration valid");
            config
        }
        Err(e) => {
            println!("  ❌ Configuration invalid: {e}");
            println!("\n  ⚠️  Fix the configuration before running other checks.");
            return Ok(());
        }
    };

    match config.nlp.require_credentials() {
        Ok((_, model)) => println!("  ✅ NLP engine configured (model: {model})"),
        Err(e) => {
            println!("  ❌ {e}");
            issues += 1;
        }
    }

    match super::open_store(&config).await {
        Ok(store) => match store.list_latest_per_session().await {
            Ok(sessions) => println!(
                "  ✅ Database ready at {} ({} sessions with messages)",
                config.database.path,
                sessions.len()
            ),
            Err(e) => {
                println!("  ❌ Database query failed: {e}");
                issues += 1;
            }
        },
        Err(e) => {
            println!("  ❌ Cannot open database {}: {e}", config.database.path);
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
