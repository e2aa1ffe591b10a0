use std::fmt::Write as _;

use anyhow::{Context, Result};
use chat::{ChatError, MarketDeskClient, MessageSource};
use chrono::DateTime;
use shared::{config::Config, models::ConversationSummary};

/// Prints the conversations of the configured operator.
///
/// # Errors
/// Returns an error when the operator id is missing or the list cannot be fetched.
pub async fn list_conversations(config: &Config, json: bool) -> Result<()> {
    let user = config.user_id.as_ref().ok_or(ChatError::MissingUserId)?;
    let client = MarketDeskClient::from_config(config).context("failed to build API client")?;
    let conversations = client
        .chat_list(user)
        .await
        .context("failed to fetch conversation list")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&conversations)?);
    } else {
        print!("{}", render_table(&conversations));
    }
    Ok(())
}

fn render_table(conversations: &[ConversationSummary]) -> String {
    if conversations.is_empty() {
        return "No conversations.\n".to_string();
    }
    let mut out = String::new();
    for summary in conversations {
        let name = summary.name.as_deref().unwrap_or("-");
        let when = summary
            .updated_at
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map_or_else(|| "-".to_string(), |at| at.format("%Y-%m-%d %H:%M").to_string());
        let last = summary.last_message.as_deref().unwrap_or("");
        let _ = writeln!(out, "{:<16} {:<24} {:<16} {last}", summary.peer_id, name, when);
    }
    out
}
