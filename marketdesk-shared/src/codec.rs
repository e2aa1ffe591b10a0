//! # Push frame codec
//!
//! Text-frame encoding for the push channel. Two framings are supported:
//! Socket.IO v5 over Engine.IO v4 (`0{..}` open, `40` connect, `2`/`3`
//! heartbeat, `42["event", payload]`), and a plain JSON envelope
//! (`{"event": .., "data": ..}`) for gateways that bridge the room server.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

use crate::models::{PushCommand, PushEvent};

/// Engine.IO pong packet, sent in answer to a server ping.
pub const PONG: &str = "3";

/// Errors raised while encoding or decoding push frames.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The frame body was not valid JSON or had the wrong shape.
    #[error("invalid frame payload: {0}")]
    Json(#[from] serde_json::Error),

    /// The frame did not follow the expected packet grammar.
    #[error("malformed frame `{frame}`: {reason}")]
    Malformed {
        /// Offending frame, truncated for logging.
        frame: String,
        /// What was wrong with it.
        reason: &'static str,
    },
}

impl CodecError {
    fn malformed(frame: &str, reason: &'static str) -> Self {
        Self::Malformed {
            frame: frame.chars().take(64).collect(),
            reason,
        }
    }
}

/// Wire framing spoken by the push endpoint.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Framing {
    /// Socket.IO v5 packets inside Engine.IO v4 text frames.
    #[default]
    SocketIo,
    /// `{"event": .., "data": ..}` JSON envelopes.
    Json,
}

impl fmt::Display for Framing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SocketIo => "socket_io",
            Self::Json => "json",
        })
    }
}

impl FromStr for Framing {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "socket_io" | "socketio" => Ok(Self::SocketIo),
            "json" => Ok(Self::Json),
            _ => Err("unknown push framing; use `socket_io` or `json`"),
        }
    }
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Engine.IO handshake; the client must answer with a connect packet.
    Open,
    /// The namespace connection was accepted.
    Connected,
    /// The server refused the namespace connection.
    ConnectError(String),
    /// Server heartbeat ping; answer with [`PONG`].
    Ping,
    /// Heartbeat pong.
    Pong,
    /// An application event.
    Event(PushEvent),
    /// The server closed the session.
    Disconnect,
    /// Anything the client has no use for (acks, noops, upgrades).
    Ignored,
}

#[derive(Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: Value,
}

/// Decode one inbound text frame.
///
/// # Errors
/// Returns [`CodecError`] when the frame cannot be parsed.
pub fn decode(text: &str, framing: Framing) -> Result<Frame, CodecError> {
    match framing {
        Framing::Json => {
            let envelope: Envelope = serde_json::from_str(text)?;
            Ok(Frame::Event(PushEvent::from_parts(
                &envelope.event,
                envelope.data,
            )?))
        }
        Framing::SocketIo => decode_socket_io(text),
    }
}

fn decode_socket_io(text: &str) -> Result<Frame, CodecError> {
    let mut chars = text.chars();
    match chars.next() {
        Some('0') => Ok(Frame::Open),
        Some('1') => Ok(Frame::Disconnect),
        Some('2') => Ok(Frame::Ping),
        Some('3') => Ok(Frame::Pong),
        Some('4') => decode_socket_packet(text, chars.as_str()),
        Some('5' | '6') => Ok(Frame::Ignored),
        _ => Err(CodecError::malformed(text, "unknown engine packet type")),
    }
}

fn decode_socket_packet(frame: &str, packet: &str) -> Result<Frame, CodecError> {
    let mut chars = packet.chars();
    let kind = chars.next();
    let body = strip_namespace_and_ack(chars.as_str());
    match kind {
        Some('0') => Ok(Frame::Connected),
        Some('1') => Ok(Frame::Disconnect),
        Some('2') => {
            let mut args: Vec<Value> = serde_json::from_str(body)?;
            if args.is_empty() {
                return Err(CodecError::malformed(frame, "event packet without a name"));
            }
            let data = if args.len() > 1 {
                args.swap_remove(1)
            } else {
                Value::Null
            };
            let Value::String(name) = args.swap_remove(0) else {
                return Err(CodecError::malformed(frame, "event name is not a string"));
            };
            Ok(Frame::Event(PushEvent::from_parts(&name, data)?))
        }
        Some('4') => {
            let reason = serde_json::from_str::<Value>(body)
                .ok()
                .and_then(|value| value.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| body.to_string());
            Ok(Frame::ConnectError(reason))
        }
        Some('3' | '5' | '6') => Ok(Frame::Ignored),
        _ => Err(CodecError::malformed(frame, "unknown socket packet type")),
    }
}

/// Skip an optional `/namespace,` prefix and a numeric ack id.
fn strip_namespace_and_ack(body: &str) -> &str {
    let body = if body.starts_with('/') {
        body.find(',').map_or("", |comma| &body[comma + 1..])
    } else {
        body
    };
    body.trim_start_matches(|c: char| c.is_ascii_digit())
}

/// Encode an outbound command as a text frame.
///
/// # Errors
/// Propagates payload serialization failures.
pub fn encode(command: &PushCommand, framing: Framing) -> Result<String, CodecError> {
    let payload = command.payload()?;
    let text = match framing {
        Framing::SocketIo => format!(
            "42{}",
            serde_json::to_string(&json!([command.event_name(), payload]))?
        ),
        Framing::Json => serde_json::to_string(&json!({
            "event": command.event_name(),
            "data": payload,
        }))?,
    };
    Ok(text)
}

/// Socket.IO namespace connect packet, carrying the bearer token as auth data.
#[must_use]
pub fn connect_packet(token: Option<&str>) -> String {
    match token {
        Some(token) => format!("40{}", json!({ "token": token })),
        None => "40".to_string(),
    }
}
