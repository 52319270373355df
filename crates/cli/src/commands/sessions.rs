//! `banter sessions`, `banter history`, `banter delete` - Inspect stored chats.

use std::path::Path;

use banter_core::store::SessionStore;

/// Width of the input preview in session listings.
const PREVIEW_CHARS: usize = 60;

pub async fn list(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let store = super::open_store(&config).await?;

    let sessions = store.list_latest_per_session().await?;
    if sessions.is_empty() {
        println!("No chat sessions yet.");
        return Ok(());
    }

    println!("💬 {} session(s)\n", sessions.len());
    for summary in &sessions {
        println!("  {}  {}", summary.session_id, summary.title);
        println!(
            "      last: {}  \"{}\"",
            summary.timestamp,
            preview(&summary.input)
        );
    }

    Ok(())
}

pub async fn history(
    config_path: Option<&Path>,
    session_id: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let store = super::open_store(&config).await?;

    let messages = store.get_history(session_id).await?;
    if messages.is_empty() {
        println!("No messages for session {session_id}.");
        return Ok(());
    }

    for message in &messages {
        println!("[{}]", message.timestamp);
        println!("  you: {}", message.input);
        println!("  bot: {}\n", message.response);
    }

    Ok(())
}

pub async fn delete(
    config_path: Option<&Path>,
    session_id: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let store = super::open_store(&config).await?;

    let removed = store.delete_session(session_id).await?;
    println!("🗑️  Deleted session {session_id} ({removed} message(s))");

    Ok(())
}

fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().count() > PREVIEW_CHARS {
        out.push('…');
    }
    out
}
