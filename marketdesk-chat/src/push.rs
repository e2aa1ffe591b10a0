//! Process-wide push channel over a WebSocket.
//!
//! One connection is opened per session. A background task owns the socket:
//! it answers the Engine.IO handshake and heartbeat, decodes inbound frames
//! into [`PushEvent`]s, and writes outbound [`PushCommand`]s. Commands
//! issued before the Socket.IO namespace is connected are queued and flushed
//! once the server accepts the connection.

use std::collections::VecDeque;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use shared::{
    codec::{self, Frame, Framing},
    config::Config,
    models::{PushCommand, PushEvent},
};
use tokio::{net::TcpStream, sync::mpsc, task::JoinHandle};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{
        Message as WsMessage,
        client::IntoClientRequest,
        http::{HeaderValue, header::AUTHORIZATION},
    },
};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::error::{ChatError, ChatResult};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;
type SocketSink = SplitSink<Socket, WsMessage>;

const OUTBOUND_BUFFER: usize = 64;
const INBOUND_BUFFER: usize = 256;

/// Outbound side of the push channel.
#[async_trait]
pub trait PushSink: Send + Sync {
    /// Emit a command on the channel.
    async fn emit(&self, command: PushCommand) -> ChatResult<()>;
}

/// Connection settings for the push channel.
#[derive(Debug, Clone)]
pub struct PushSettings {
    /// WebSocket endpoint.
    pub url: Url,
    /// Framing spoken by the endpoint.
    pub framing: Framing,
    /// Bearer token presented on connect.
    pub auth_token: Option<String>,
}

impl From<&Config> for PushSettings {
    fn from(config: &Config) -> Self {
        Self {
            url: config.push_url.clone(),
            framing: config.push_framing,
            auth_token: config.auth_token.clone(),
        }
    }
}

/// Cloneable handle used to emit commands on the connection.
#[derive(Clone, Debug)]
pub struct PushHandle {
    outbound: mpsc::Sender<PushCommand>,
}

#[async_trait]
impl PushSink for PushHandle {
    async fn emit(&self, command: PushCommand) -> ChatResult<()> {
        self.outbound
            .send(command)
            .await
            .map_err(|_| ChatError::ChannelClosed)
    }
}

/// An open push connection.
#[derive(Debug)]
pub struct PushConnection {
    /// Emits commands.
    pub handle: PushHandle,
    /// Receives inbound events; closes when the socket does.
    pub events: mpsc::Receiver<PushEvent>,
    /// The socket task; finishes when the connection ends.
    pub task: JoinHandle<()>,
}

/// Open the push channel.
///
/// # Errors
/// Fails when the WebSocket handshake fails or the token is not a valid
/// header value.
pub async fn connect(settings: PushSettings) -> ChatResult<PushConnection> {
    let mut request = settings.url.as_str().into_client_request()?;
    if let Some(token) = &settings.auth_token {
        let value =
            HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| ChatError::InvalidToken)?;
        request.headers_mut().insert(AUTHORIZATION, value);
    }

    let (stream, _response) = connect_async(request).await?;
    info!(url = %settings.url, framing = %settings.framing, "push channel connected");

    let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_BUFFER);
    let (events_tx, events_rx) = mpsc::channel(INBOUND_BUFFER);
    let task = tokio::spawn(run_socket(stream, settings, outbound_rx, events_tx));

    Ok(PushConnection {
        handle: PushHandle {
            outbound: outbound_tx,
        },
        events: events_rx,
        task,
    })
}

async fn run_socket(
    stream: Socket,
    settings: PushSettings,
    mut outbound: mpsc::Receiver<PushCommand>,
    events: mpsc::Sender<PushEvent>,
) {
    let (mut sink, mut source) = stream.split();
    let framing = settings.framing;
    let mut connected = framing == Framing::Json;
    let mut queued: VecDeque<PushCommand> = VecDeque::new();

    loop {
        tokio::select! {
            frame = source.next() => {
                let text = match frame {
                    Some(Ok(WsMessage::Text(text))) => text,
                    Some(Ok(WsMessage::Close(_))) | None => {
                        info!("push channel closed by server");
                        break;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(err)) => {
                        warn!(error = %err, "push channel read failed");
                        break;
                    }
                };

                let reply = match codec::decode(text.as_str(), framing) {
                    Ok(Frame::Open) => Some(codec::connect_packet(settings.auth_token.as_deref())),
                    Ok(Frame::Ping) => Some(codec::PONG.to_string()),
                    Ok(Frame::Connected) => {
                        debug!(queued = queued.len(), "push namespace connected");
                        connected = true;
                        None
                    }
                    Ok(Frame::Event(event)) => {
                        if events.send(event).await.is_err() {
                            debug!("push event receiver dropped");
                            break;
                        }
                        None
                    }
                    Ok(Frame::ConnectError(reason)) => {
                        error!(%reason, "push connection refused");
                        break;
                    }
                    Ok(Frame::Disconnect) => {
                        info!("push session ended by server");
                        break;
                    }
                    Ok(Frame::Pong | Frame::Ignored) => None,
                    Err(err) => {
                        warn!(error = %err, "dropping malformed push frame");
                        None
                    }
                };

                if let Some(reply) = reply
                    && let Err(err) = sink.send(WsMessage::Text(reply.into())).await
                {
                    warn!(error = %err, "push channel write failed");
                    break;
                }

                if connected {
                    while let Some(command) = queued.pop_front() {
                        if !write_command(&mut sink, &command, framing).await {
                            return;
                        }
                    }
                }
            }
            command = outbound.recv() => {
                let Some(command) = command else {
                    let _ = sink.send(WsMessage::Close(None)).await;
                    break;
                };
                if connected {
                    if !write_command(&mut sink, &command, framing).await {
                        break;
                    }
                } else {
                    queued.push_back(command);
                }
            }
        }
    }

    debug!("push channel task finished");
}

/// Encode and write one command; `false` when the socket is unusable.
async fn write_command(sink: &mut SocketSink, command: &PushCommand, framing: Framing) -> bool {
    let text = match codec::encode(command, framing) {
        Ok(text) => text,
        Err(err) => {
            warn!(error = %err, event = command.event_name(), "could not encode push command");
            return true;
        }
    };
    debug!(event = command.event_name(), "emitting push command");
    match sink.send(WsMessage::Text(text.into())).await {
        Ok(()) => true,
        Err(err) => {
            warn!(error = %err, "push channel write failed");
            false
        }
    }
}
