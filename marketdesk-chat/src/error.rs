//! # Chat error types

use reqwest::StatusCode;
use shared::codec::CodecError;
use thiserror::Error;

/// Result alias for chat operations.
pub type ChatResult<T> = Result<T, ChatError>;

/// Errors raised by the chat core and its transports.
#[derive(Error, Debug)]
pub enum ChatError {
    /// The HTTP request could not be sent or its body could not be decoded.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("request rejected with {status}: {message}")]
    Status {
        /// Status returned by the API.
        status: StatusCode,
        /// Error message extracted from the response body.
        message: String,
    },

    /// An endpoint URL could not be built.
    #[error("invalid endpoint: {0}")]
    Url(#[from] url::ParseError),

    /// The WebSocket transport failed.
    #[error("push channel error: {0}")]
    Push(#[from] tokio_tungstenite::tungstenite::Error),

    /// A push frame could not be encoded or decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The bearer token contains characters not allowed in a header.
    #[error("auth token is not a valid header value")]
    InvalidToken,

    /// The push channel or the controller task is gone.
    #[error("push channel closed")]
    ChannelClosed,

    /// An operation needed an open conversation.
    #[error("no conversation is open")]
    NoActiveConversation,

    /// The operator identifier is missing from the configuration.
    #[error("operator user id is not configured; set `user_id` or MARKETDESK_USER_ID")]
    MissingUserId,
}
