use std::sync::Arc;

use anyhow::{Context, Result};
use chat::{
    ChatController, ChatEntry, ChatHandle, ChatSettings, MarketDeskClient, PushSettings,
    ViewEffect, ViewUpdate,
};
use chrono::DateTime;
use shared::{config::Config, models::UserId};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

/// A line typed by the operator.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Older,
    Open(UserId),
    Retry,
    Quit,
    Send(String),
    Help,
    Nothing,
}

fn parse_input(line: &str) -> Result<Input, String> {
    let line = line.trim();
    let Some(command) = line.strip_prefix('/') else {
        return Ok(if line.is_empty() {
            Input::Nothing
        } else {
            Input::Send(line.to_string())
        });
    };
    let (name, rest) = command.split_once(' ').unwrap_or((command, ""));
    match name {
        "older" => Ok(Input::Older),
        "retry" => Ok(Input::Retry),
        "quit" | "exit" => Ok(Input::Quit),
        "help" => Ok(Input::Help),
        "open" => rest
            .parse()
            .map(Input::Open)
            .map_err(|_| "usage: /open <peer-id>".to_string()),
        other => Err(format!("unknown command /{other}; type /help")),
    }
}

const HELP: &str = "\
/older        load earlier messages
/open <peer>  switch to another conversation
/retry        retry the last failed load
/quit         leave the chat
anything else is sent to the open conversation";

/// Turns view updates into printable transcript lines.
struct Transcript {
    self_id: UserId,
    peer: Option<UserId>,
    shown: Vec<ChatEntry>,
    exhausted: bool,
    last_error: Option<String>,
}

impl Transcript {
    fn new(self_id: UserId) -> Self {
        Self {
            self_id,
            peer: None,
            shown: Vec::new(),
            exhausted: false,
            last_error: None,
        }
    }

    fn line(&self, entry: &ChatEntry) -> String {
        let message = &entry.message;
        let when = DateTime::from_timestamp(message.updated_at, 0)
            .map_or_else(|| message.updated_at.to_string(), |at| at.format("%Y-%m-%d %H:%M").to_string());
        let who = if message.sender_id == self.self_id {
            "you".to_string()
        } else {
            message.sender_id.to_string()
        };
        let marker = if entry.is_pending() { " (sending)" } else { "" };
        format!("[{when}] {who}: {}{marker}", message.body)
    }

    fn render(&mut self, update: &ViewUpdate) -> Vec<String> {
        let mut lines = Vec::new();

        if update.peer != self.peer {
            self.peer.clone_from(&update.peer);
            self.shown.clear();
            self.exhausted = false;
            self.last_error = None;
            if let Some(peer) = &update.peer {
                lines.push(format!("── conversation with {peer} ──"));
            }
        }

        let mut delivered: Vec<ChatEntry> = self
            .shown
            .iter()
            .filter(|entry| entry.is_pending() && !update.entries.contains(entry))
            .cloned()
            .collect();
        let fresh: Vec<&ChatEntry> = update
            .entries
            .iter()
            .filter(|entry| !self.shown.contains(entry))
            .collect();

        if update.effect == ViewEffect::PreserveAnchor && !fresh.is_empty() {
            lines.push("── earlier messages ──".to_string());
        }
        for entry in fresh {
            let echo = (!entry.is_pending())
                .then(|| {
                    delivered.iter().position(|pending| {
                        pending.message.sender_id == entry.message.sender_id
                            && pending.message.body == entry.message.body
                    })
                })
                .flatten();
            match echo {
                Some(position) => {
                    delivered.remove(position);
                    lines.push(format!("  ✓ delivered: {}", entry.message.body));
                }
                None => lines.push(self.line(entry)),
            }
        }

        if update.exhausted && !self.exhausted && !update.loading {
            lines.push("── beginning of conversation ──".to_string());
        }
        self.exhausted = update.exhausted;

        if update.last_error != self.last_error {
            if let Some(error) = &update.last_error {
                lines.push(format!("! could not load messages: {error} (type /retry)"));
            }
            self.last_error.clone_from(&update.last_error);
        }
        if let Some(notice) = &update.notice {
            lines.push(format!("! {notice}"));
        }

        self.shown.clone_from(&update.entries);
        lines
    }
}

/// Runs an interactive chat with `peer` until `/quit` or end of input.
///
/// # Errors
/// Returns an error when the operator id is missing, the HTTP client cannot
/// be built, or the push channel cannot be opened.
pub async fn run_chat(config: Config, peer: UserId) -> Result<()> {
    let settings = ChatSettings::from_config(&config)?;
    let source = MarketDeskClient::from_config(&config).context("failed to build API client")?;
    let connection = chat::connect(PushSettings::from(&config))
        .await
        .with_context(|| format!("failed to connect push channel at {}", config.push_url))?;

    let mut transcript = Transcript::new(settings.self_id.clone());
    let (controller, mut views) =
        ChatController::new(settings, Arc::new(source), connection.handle.clone());
    let (handle, controller_task) = controller.spawn(connection.events);

    let renderer = tokio::spawn(async move {
        while let Some(update) = views.recv().await {
            for line in transcript.render(&update) {
                println!("{line}");
            }
        }
    });

    handle.open(peer).await?;
    println!("Type /help for commands.");
    read_commands(&handle).await?;

    if handle.shutdown().await.is_err() {
        warn!("chat controller already stopped");
    }
    let _ = controller_task.await;
    let _ = renderer.await;
    connection.task.abort();
    info!("chat session closed");
    Ok(())
}

async fn read_commands(handle: &ChatHandle) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_input(&line) {
            Ok(Input::Older) => handle.load_older().await?,
            Ok(Input::Open(peer)) => handle.open(peer).await?,
            Ok(Input::Retry) => handle.retry().await?,
            Ok(Input::Send(body)) => handle.send(body).await?,
            Ok(Input::Help) => println!("{HELP}"),
            Ok(Input::Nothing) => {}
            Ok(Input::Quit) => break,
            Err(usage) => eprintln!("{usage}"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::Message;

    fn entry(from: &str, to: &str, at: i64, body: &str) -> ChatEntry {
        ChatEntry::confirmed(Message {
            sender_id: UserId::from(from),
            receiver_id: UserId::from(to),
            body: body.into(),
            created_at: at,
            updated_at: at,
        })
    }

    fn update(entries: Vec<ChatEntry>, effect: ViewEffect) -> ViewUpdate {
        ViewUpdate {
            peer: Some(UserId::from("seller-1")),
            effect,
            entries,
            exhausted: false,
            loading: false,
            last_error: None,
            notice: None,
        }
    }

    #[test]
    fn parses_operator_input() {
        assert_eq!(parse_input("/older"), Ok(Input::Older));
        assert_eq!(parse_input(" /open buyer-2 "), Ok(Input::Open(UserId::from("buyer-2"))));
        assert_eq!(parse_input("/retry"), Ok(Input::Retry));
        assert_eq!(parse_input("/quit"), Ok(Input::Quit));
        assert_eq!(parse_input("   "), Ok(Input::Nothing));
        assert_eq!(parse_input("hello there"), Ok(Input::Send("hello there".into())));
        assert!(parse_input("/open").is_err());
        assert!(parse_input("/dance").is_err());
    }

    #[test]
    fn prints_only_new_entries() {
        let mut transcript = Transcript::new(UserId::from("op-1"));
        let first = vec![entry("seller-1", "op-1", 10, "hi")];
        let lines = transcript.render(&update(first.clone(), ViewEffect::ScrollToBottom));
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("conversation with seller-1"));
        assert!(lines[1].ends_with("seller-1: hi"));

        let mut second = first;
        second.push(entry("op-1", "seller-1", 20, "hello"));
        let lines = transcript.render(&update(second, ViewEffect::Refresh));
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("you: hello"));
    }

    #[test]
    fn reconciled_echo_is_reported_once() {
        let mut transcript = Transcript::new(UserId::from("op-1"));
        let pending = ChatEntry::pending(entry("op-1", "seller-1", 20, "on it").message);
        let lines = transcript.render(&update(vec![pending], ViewEffect::Refresh));
        assert!(lines[1].ends_with("you: on it (sending)"));

        let lines = transcript.render(&update(
            vec![entry("op-1", "seller-1", 21, "on it")],
            ViewEffect::Refresh,
        ));
        assert_eq!(lines, vec!["  ✓ delivered: on it".to_string()]);
    }

    #[test]
    fn failures_and_notices_are_surfaced() {
        let mut transcript = Transcript::new(UserId::from("op-1"));
        let mut failed = update(Vec::new(), ViewEffect::Refresh);
        failed.last_error = Some("request failed".into());
        failed.notice = Some("broadcast: maintenance".into());
        let lines = transcript.render(&failed);
        assert!(lines.iter().any(|line| line.contains("type /retry")));
        assert!(lines.iter().any(|line| line == "! broadcast: maintenance"));

        failed.notice = None;
        assert!(transcript.render(&failed).is_empty());
    }
}
