//! # Chat controller
//!
//! Drives one operator's chat session on a single task. User commands,
//! inbound push events, and page completions are all handled on that task,
//! so store mutations never race. Page fetches run on spawned tasks and
//! report back through a channel, tagged with the conversation generation
//! they were issued under.

use std::sync::Arc;

use chrono::Utc;
use shared::{
    config::Config,
    models::{Message, OutboundPrivateMessage, PushCommand, PushEvent, UserId},
};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    api::MessageSource,
    cursor::PageKind,
    entry::ChatEntry,
    error::{ChatError, ChatResult},
    listener::ListenerRegistry,
    push::PushSink,
    store::{ChatSessionStore, Generation, LiveOutcome, PageOutcome, PageTicket, ViewEffect},
};

const COMMAND_BUFFER: usize = 32;

/// Session parameters resolved from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSettings {
    /// The signed-in operator.
    pub self_id: UserId,
    /// Messages per page.
    pub page_size: usize,
    /// Echo reconciliation window in seconds.
    pub echo_window_secs: i64,
    /// `sentBy` label for outbound messages.
    pub sent_by: String,
}

impl ChatSettings {
    /// Resolve settings from the configuration.
    ///
    /// # Errors
    /// Returns [`ChatError::MissingUserId`] when no operator id is configured.
    pub fn from_config(config: &Config) -> ChatResult<Self> {
        Ok(Self {
            self_id: config.user_id.clone().ok_or(ChatError::MissingUserId)?,
            page_size: config.page_size,
            echo_window_secs: config.echo_window_secs,
            sent_by: config.sent_by.clone(),
        })
    }
}

/// A user action fed to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Open (or switch to) the conversation with a peer.
    Open(UserId),
    /// The viewport reached the top; load an older page.
    LoadOlder,
    /// Send a message in the open conversation.
    Send(String),
    /// Retry the fetch that last failed.
    Retry,
    /// Stop the controller.
    Shutdown,
}

/// Completion of a page fetch.
#[derive(Debug)]
pub struct PageCompletion {
    /// Generation the fetch was issued under.
    pub generation: Generation,
    /// Initial or older page.
    pub kind: PageKind,
    /// Fetched messages or the failure.
    pub result: ChatResult<Vec<Message>>,
}

/// State published to the view after every change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewUpdate {
    /// Peer of the open conversation.
    pub peer: Option<UserId>,
    /// Viewport action to take.
    pub effect: ViewEffect,
    /// Displayed messages, oldest first.
    pub entries: Vec<ChatEntry>,
    /// No older history remains.
    pub exhausted: bool,
    /// A page fetch is in flight.
    pub loading: bool,
    /// Last fetch failure, shown with a retry affordance.
    pub last_error: Option<String>,
    /// Out-of-band notice such as a broadcast.
    pub notice: Option<String>,
}

/// Owns the chat session state and reacts to commands, pushes, and fetches.
pub struct ChatController<S, P> {
    store: ChatSessionStore,
    listeners: ListenerRegistry,
    source: Arc<S>,
    push: P,
    sent_by: String,
    completions_tx: mpsc::UnboundedSender<PageCompletion>,
    completions_rx: mpsc::UnboundedReceiver<PageCompletion>,
    view_tx: mpsc::UnboundedSender<ViewUpdate>,
}

impl<S, P> std::fmt::Debug for ChatController<S, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatController")
            .field("store", &self.store)
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}

impl<S, P> ChatController<S, P>
where
    S: MessageSource + 'static,
    P: PushSink + 'static,
{
    /// Create a controller and the receiver of its view updates.
    pub fn new(
        settings: ChatSettings,
        source: Arc<S>,
        push: P,
    ) -> (Self, mpsc::UnboundedReceiver<ViewUpdate>) {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = mpsc::unbounded_channel();
        let controller = Self {
            store: ChatSessionStore::new(
                settings.self_id,
                settings.page_size,
                settings.echo_window_secs,
            ),
            listeners: ListenerRegistry::default(),
            source,
            push,
            sent_by: settings.sent_by,
            completions_tx,
            completions_rx,
            view_tx,
        };
        (controller, view_rx)
    }

    /// The session store.
    #[must_use]
    pub const fn store(&self) -> &ChatSessionStore {
        &self.store
    }

    /// The live listener registry.
    #[must_use]
    pub const fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }

    /// Apply one user command. Returns `false` once the controller should stop.
    pub async fn handle_command(&mut self, command: ChatCommand) -> bool {
        match command {
            ChatCommand::Open(peer) => self.open(peer).await,
            ChatCommand::LoadOlder => {
                if let Some(ticket) = self.store.request_older() {
                    self.spawn_fetch(ticket);
                    self.publish(ViewEffect::Refresh, None);
                }
            }
            ChatCommand::Retry => {
                if let Some(ticket) = self.store.retry() {
                    info!(start = ticket.request.start, "retrying message fetch");
                    self.spawn_fetch(ticket);
                    self.publish(ViewEffect::Refresh, None);
                }
            }
            ChatCommand::Send(body) => self.send(body).await,
            ChatCommand::Shutdown => {
                self.listeners.deregister();
                return false;
            }
        }
        true
    }

    async fn open(&mut self, peer: UserId) {
        let ticket = self.store.initialize(peer.clone());
        self.listeners.register(ticket.generation, peer.clone());
        self.publish(ViewEffect::Refresh, None);

        if let Err(err) = self.push.emit(PushCommand::JoinPrivateRoom(peer.clone())).await {
            warn!(error = %err, peer = %peer, "failed to join private room");
        }
        self.spawn_fetch(ticket);
    }

    async fn send(&mut self, body: String) {
        let message = match self.store.append_local(body, Utc::now().timestamp()) {
            Ok(message) => message,
            Err(err) => {
                warn!(error = %err, "message not sent");
                self.publish(ViewEffect::Refresh, Some(err.to_string()));
                return;
            }
        };
        self.publish(ViewEffect::Refresh, None);

        let outbound = OutboundPrivateMessage {
            content: message.body,
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            sent_by: self.sent_by.clone(),
        };
        if let Err(err) = self.push.emit(PushCommand::PrivateMessage(outbound)).await {
            warn!(error = %err, "failed to emit private message");
            self.publish(ViewEffect::Refresh, Some(format!("message not delivered: {err}")));
        }
    }

    /// Route one inbound push event.
    pub fn handle_push(&mut self, event: PushEvent) {
        match event {
            PushEvent::NewPrivateMessage(message) => {
                let Some(generation) = self.listeners.route(&message) else {
                    debug!(sender = %message.sender_id, "no listener for live message");
                    return;
                };
                if generation != self.store.generation() {
                    debug!(%generation, "live message for a replaced listener");
                    return;
                }
                match self.store.append_live(message) {
                    LiveOutcome::Appended | LiveOutcome::Reconciled => {
                        self.publish(ViewEffect::Refresh, None);
                    }
                    LiveOutcome::Rejected => {}
                }
            }
            PushEvent::Broadcast(broadcast) => {
                let text = broadcast.content.unwrap_or_default();
                info!(content = %text, "broadcast received");
                self.publish(ViewEffect::Refresh, Some(format!("broadcast: {text}")));
            }
            PushEvent::Other { event } => debug!(%event, "ignoring push event"),
        }
    }

    /// Apply a page completion.
    pub fn handle_completion(&mut self, completion: PageCompletion) {
        match self
            .store
            .complete_page(completion.generation, completion.kind, completion.result)
        {
            PageOutcome::Applied(effect) => self.publish(effect, None),
            PageOutcome::Failed => self.publish(ViewEffect::Refresh, None),
            PageOutcome::Stale => {}
        }
    }

    /// Wait for the next page completion.
    pub async fn next_completion(&mut self) -> Option<PageCompletion> {
        self.completions_rx.recv().await
    }

    fn spawn_fetch(&self, ticket: PageTicket) {
        let source = Arc::clone(&self.source);
        let completions = self.completions_tx.clone();
        let user = self.store.self_id().clone();
        debug!(
            peer = %ticket.peer,
            generation = %ticket.generation,
            start = ticket.request.start,
            count = ticket.request.count,
            "requesting message page"
        );
        tokio::spawn(async move {
            let result = source
                .fetch_page(&user, &ticket.peer, ticket.request.start, ticket.request.count)
                .await;
            let _ = completions.send(PageCompletion {
                generation: ticket.generation,
                kind: ticket.request.kind,
                result,
            });
        });
    }

    fn publish(&self, effect: ViewEffect, notice: Option<String>) {
        let cursor = self.store.cursor();
        let update = ViewUpdate {
            peer: self.store.peer().cloned(),
            effect,
            entries: self.store.entries().to_vec(),
            exhausted: cursor.is_exhausted(),
            loading: cursor.is_loading(),
            last_error: self.store.last_error().map(str::to_string),
            notice,
        };
        if self.view_tx.send(update).is_err() {
            debug!("view receiver dropped");
        }
    }

    /// Run the event loop until shutdown or until the command side is dropped.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<ChatCommand>,
        mut events: mpsc::Receiver<PushEvent>,
    ) {
        let mut events_open = true;
        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    if !self.handle_command(command).await {
                        break;
                    }
                }
                event = events.recv(), if events_open => match event {
                    Some(event) => self.handle_push(event),
                    None => {
                        warn!("push channel closed; live delivery stopped");
                        events_open = false;
                        self.publish(ViewEffect::Refresh, Some("live delivery disconnected".into()));
                    }
                },
                Some(completion) = self.completions_rx.recv() => self.handle_completion(completion),
            }
        }
        info!("chat controller stopped");
    }

    /// Spawn the event loop and return the command handle.
    pub fn spawn(self, events: mpsc::Receiver<PushEvent>) -> (ChatHandle, JoinHandle<()>) {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let task = tokio::spawn(self.run(commands_rx, events));
        (
            ChatHandle {
                commands: commands_tx,
            },
            task,
        )
    }
}

/// Cloneable command-side handle of a running controller.
#[derive(Clone, Debug)]
pub struct ChatHandle {
    commands: mpsc::Sender<ChatCommand>,
}

impl ChatHandle {
    async fn submit(&self, command: ChatCommand) -> ChatResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ChatError::ChannelClosed)
    }

    /// Open or switch to the conversation with `peer`.
    ///
    /// # Errors
    /// Fails when the controller has stopped.
    pub async fn open(&self, peer: UserId) -> ChatResult<()> {
        self.submit(ChatCommand::Open(peer)).await
    }

    /// Request an older page.
    ///
    /// # Errors
    /// Fails when the controller has stopped.
    pub async fn load_older(&self) -> ChatResult<()> {
        self.submit(ChatCommand::LoadOlder).await
    }

    /// Send a message.
    ///
    /// # Errors
    /// Fails when the controller has stopped.
    pub async fn send(&self, body: impl Into<String>) -> ChatResult<()> {
        self.submit(ChatCommand::Send(body.into())).await
    }

    /// Retry the last failed fetch.
    ///
    /// # Errors
    /// Fails when the controller has stopped.
    pub async fn retry(&self) -> ChatResult<()> {
        self.submit(ChatCommand::Retry).await
    }

    /// Stop the controller.
    ///
    /// # Errors
    /// Fails when the controller has already stopped.
    pub async fn shutdown(&self) -> ChatResult<()> {
        self.submit(ChatCommand::Shutdown).await
    }
}
