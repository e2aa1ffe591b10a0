//! End-to-end controller tests with a gated message source.
//!
//! Every page fetch is parked until the test answers it, which makes
//! in-flight windows and late completions reproducible.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use chat::{
    ChatController, ChatError, ChatHandle, ChatResult, ChatSettings, MessageSource, PushSink,
    ViewEffect, ViewUpdate,
};
use chrono::Utc;
use shared::models::{ConversationSummary, Message, PushCommand, PushEvent, UserId};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time::{sleep, timeout},
};

const OPERATOR: &str = "op-1";

struct FetchCall {
    peer: UserId,
    start: usize,
    count: usize,
    reply: oneshot::Sender<ChatResult<Vec<Message>>>,
}

struct GatedSource {
    calls: mpsc::UnboundedSender<FetchCall>,
}

#[async_trait]
impl MessageSource for GatedSource {
    async fn fetch_page(
        &self,
        _user: &UserId,
        peer: &UserId,
        start: usize,
        count: usize,
    ) -> ChatResult<Vec<Message>> {
        let (reply, answer) = oneshot::channel();
        self.calls
            .send(FetchCall {
                peer: peer.clone(),
                start,
                count,
                reply,
            })
            .map_err(|_| ChatError::ChannelClosed)?;
        answer.await.map_err(|_| ChatError::ChannelClosed)?
    }

    async fn chat_list(&self, _user: &UserId) -> ChatResult<Vec<ConversationSummary>> {
        Ok(Vec::new())
    }
}

#[derive(Clone, Default)]
struct RecordingPush {
    emitted: Arc<Mutex<Vec<PushCommand>>>,
}

#[async_trait]
impl PushSink for RecordingPush {
    async fn emit(&self, command: PushCommand) -> ChatResult<()> {
        self.emitted.lock().unwrap().push(command);
        Ok(())
    }
}

struct Harness {
    handle: ChatHandle,
    task: JoinHandle<()>,
    calls: mpsc::UnboundedReceiver<FetchCall>,
    views: mpsc::UnboundedReceiver<ViewUpdate>,
    pushes: mpsc::Sender<PushEvent>,
    emitted: Arc<Mutex<Vec<PushCommand>>>,
}

impl Harness {
    fn start() -> Self {
        let (calls_tx, calls) = mpsc::unbounded_channel();
        let push = RecordingPush::default();
        let emitted = Arc::clone(&push.emitted);
        let settings = ChatSettings {
            self_id: UserId::from(OPERATOR),
            page_size: 10,
            echo_window_secs: 5,
            sent_by: "admin".into(),
        };
        let (controller, views) =
            ChatController::new(settings, Arc::new(GatedSource { calls: calls_tx }), push);
        let (pushes, events) = mpsc::channel(16);
        let (handle, task) = controller.spawn(events);
        Self {
            handle,
            task,
            calls,
            views,
            pushes,
            emitted,
        }
    }

    async fn next_call(&mut self) -> FetchCall {
        timeout(Duration::from_secs(5), self.calls.recv())
            .await
            .expect("no fetch was issued")
            .expect("source dropped")
    }

    async fn view_where(&mut self, predicate: impl Fn(&ViewUpdate) -> bool) -> ViewUpdate {
        timeout(Duration::from_secs(5), async {
            loop {
                let update = self.views.recv().await.expect("controller stopped");
                if predicate(&update) {
                    return update;
                }
            }
        })
        .await
        .expect("view update timed out")
    }

    async fn stop(self) {
        self.handle.shutdown().await.unwrap();
        timeout(Duration::from_secs(5), self.task)
            .await
            .unwrap()
            .unwrap();
    }
}

fn from_peer(peer: &str, at: i64) -> Message {
    Message {
        sender_id: UserId::from(peer),
        receiver_id: UserId::from(OPERATOR),
        body: format!("{peer} at {at}"),
        created_at: at,
        updated_at: at,
    }
}

fn page(peer: &str, stamps: impl IntoIterator<Item = i64>) -> Vec<Message> {
    stamps.into_iter().map(|at| from_peer(peer, at)).collect()
}

fn stamps(update: &ViewUpdate) -> Vec<i64> {
    update.entries.iter().map(chat::ChatEntry::updated_at).collect()
}

#[tokio::test]
async fn one_backward_fetch_at_a_time() {
    let mut harness = Harness::start();
    harness.handle.open(UserId::from("seller-1")).await.unwrap();

    let first = harness.next_call().await;
    assert_eq!((first.start, first.count), (0, 10));
    first.reply.send(Ok(page("seller-1", 100..110))).unwrap();
    let loaded = harness
        .view_where(|update| update.effect == ViewEffect::ScrollToBottom)
        .await;
    assert_eq!(stamps(&loaded), (100..110).collect::<Vec<_>>());
    assert!(!loaded.exhausted);

    harness.handle.load_older().await.unwrap();
    let older = harness.next_call().await;
    assert_eq!((older.start, older.count), (10, 10));

    harness.handle.load_older().await.unwrap();
    harness.handle.load_older().await.unwrap();
    harness.handle.send("checking now").await.unwrap();
    let sent = harness
        .view_where(|update| update.entries.iter().any(chat::ChatEntry::is_pending))
        .await;
    assert!(sent.loading);
    assert!(harness.calls.try_recv().is_err());

    older.reply.send(Ok(page("seller-1", [1, 2, 3]))).unwrap();
    let merged = harness
        .view_where(|update| update.effect == ViewEffect::PreserveAnchor)
        .await;
    assert!(merged.exhausted);
    assert_eq!(merged.entries.len(), 14);
    assert!(chat::is_chronological(&merged.entries));

    harness.handle.load_older().await.unwrap();
    harness.handle.send("anything else?").await.unwrap();
    harness
        .view_where(|update| update.entries.len() == 15)
        .await;
    assert!(harness.calls.try_recv().is_err());

    harness.stop().await;
}

#[tokio::test]
async fn switch_clears_list_and_drops_late_pages() {
    let mut harness = Harness::start();
    harness.handle.open(UserId::from("seller-1")).await.unwrap();
    let stale = harness.next_call().await;
    assert_eq!(stale.peer, UserId::from("seller-1"));

    harness.handle.open(UserId::from("buyer-2")).await.unwrap();
    let cleared = harness
        .view_where(|update| update.peer == Some(UserId::from("buyer-2")))
        .await;
    assert!(cleared.entries.is_empty());
    assert!(cleared.loading);

    let fresh = harness.next_call().await;
    assert_eq!(fresh.peer, UserId::from("buyer-2"));
    assert_eq!(fresh.start, 0);
    fresh.reply.send(Ok(page("buyer-2", [7, 8]))).unwrap();
    let loaded = harness
        .view_where(|update| update.effect == ViewEffect::ScrollToBottom)
        .await;
    assert_eq!(stamps(&loaded), vec![7, 8]);

    stale.reply.send(Ok(page("seller-1", [1, 2, 3]))).unwrap();
    sleep(Duration::from_millis(100)).await;
    harness.handle.send("hello").await.unwrap();
    let after = harness
        .view_where(|update| update.entries.len() == 3)
        .await;
    assert!(
        after
            .entries
            .iter()
            .all(|entry| entry.message.involves(&UserId::from("buyer-2")))
    );

    let emitted = harness.emitted.lock().unwrap().clone();
    assert_eq!(
        emitted[..2],
        [
            PushCommand::JoinPrivateRoom(UserId::from("seller-1")),
            PushCommand::JoinPrivateRoom(UserId::from("buyer-2")),
        ]
    );

    harness.stop().await;
}

#[tokio::test]
async fn live_messages_merge_and_echoes_reconcile() {
    let mut harness = Harness::start();
    harness.handle.open(UserId::from("seller-1")).await.unwrap();
    harness
        .next_call()
        .await
        .reply
        .send(Ok(page("seller-1", [10, 20])))
        .unwrap();
    harness
        .view_where(|update| update.effect == ViewEffect::ScrollToBottom)
        .await;

    harness
        .pushes
        .send(PushEvent::NewPrivateMessage(from_peer("buyer-2", 30)))
        .await
        .unwrap();
    harness
        .pushes
        .send(PushEvent::NewPrivateMessage(from_peer("seller-1", 15)))
        .await
        .unwrap();
    let live = harness
        .view_where(|update| update.entries.len() == 3)
        .await;
    assert_eq!(stamps(&live), vec![10, 15, 20]);

    harness.handle.send("shipping today").await.unwrap();
    harness
        .view_where(|update| update.entries.iter().any(chat::ChatEntry::is_pending))
        .await;

    let now = Utc::now().timestamp();
    harness
        .pushes
        .send(PushEvent::NewPrivateMessage(Message {
            sender_id: UserId::from(OPERATOR),
            receiver_id: UserId::from("seller-1"),
            body: "shipping today".into(),
            created_at: now,
            updated_at: now,
        }))
        .await
        .unwrap();
    let echoed = harness
        .view_where(|update| {
            update.entries.len() == 4 && !update.entries.iter().any(chat::ChatEntry::is_pending)
        })
        .await;
    assert!(chat::is_chronological(&echoed.entries));

    harness.stop().await;
}

#[tokio::test]
async fn failed_page_offers_retry() {
    let mut harness = Harness::start();
    harness.handle.open(UserId::from("seller-1")).await.unwrap();
    harness
        .next_call()
        .await
        .reply
        .send(Err(ChatError::ChannelClosed))
        .unwrap();
    let failed = harness
        .view_where(|update| update.last_error.is_some())
        .await;
    assert!(failed.entries.is_empty());
    assert!(!failed.loading);

    harness.handle.retry().await.unwrap();
    let again = harness.next_call().await;
    assert_eq!(again.start, 0);
    again.reply.send(Ok(page("seller-1", [5]))).unwrap();
    let recovered = harness
        .view_where(|update| update.effect == ViewEffect::ScrollToBottom)
        .await;
    assert_eq!(stamps(&recovered), vec![5]);
    assert!(recovered.last_error.is_none());

    harness.stop().await;
}
