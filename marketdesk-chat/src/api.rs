//! REST access to message history and the conversation list.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use shared::{
    config::Config,
    models::{ConversationList, ConversationSummary, ErrorResponse, Message, MessagePage, UserId},
};
use tracing::debug;
use url::Url;

use crate::error::{ChatError, ChatResult};

/// Source of message history for the chat controller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Fetch up to `count` messages of the conversation between `user` and
    /// `peer`, skipping the `start` most recent ones.
    async fn fetch_page(
        &self,
        user: &UserId,
        peer: &UserId,
        start: usize,
        count: usize,
    ) -> ChatResult<Vec<Message>>;

    /// List the conversations of `user`.
    async fn chat_list(&self, user: &UserId) -> ChatResult<Vec<ConversationSummary>>;
}

/// HTTP client for the marketplace message API.
#[derive(Clone, Debug)]
pub struct MarketDeskClient {
    base_url: Url,
    client: Client,
    auth_token: Option<String>,
}

impl MarketDeskClient {
    /// Create a client rooted at `base_url`.
    ///
    /// # Arguments
    /// * `base_url` - API root; endpoint paths are joined onto it, so it should end with `/`
    /// * `auth_token` - Bearer token attached to every request, if any
    /// * `timeout` - Per-request timeout
    ///
    /// # Returns
    /// A client implementing [`MessageSource`].
    ///
    /// # Errors
    /// Fails when the underlying HTTP client cannot be built.
    pub fn new(base_url: Url, auth_token: Option<String>, timeout: Duration) -> ChatResult<Self> {
        let client = Client::builder()
            .user_agent("marketdesk-chat")
            .timeout(timeout)
            .build()?;
        Ok(Self {
            base_url,
            client,
            auth_token,
        })
    }

    /// Create a client from the resolved configuration.
    ///
    /// # Errors
    /// Fails when the underlying HTTP client cannot be built.
    pub fn from_config(config: &Config) -> ChatResult<Self> {
        Self::new(
            config.api_base_url.clone(),
            config.auth_token.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    fn endpoint(&self, path: &str) -> ChatResult<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn checked(response: Response) -> ChatResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = ErrorResponse::describe(&body);
        Err(ChatError::Status {
            status,
            message: if message.is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                message
            },
        })
    }
}

#[async_trait]
impl MessageSource for MarketDeskClient {
    async fn fetch_page(
        &self,
        user: &UserId,
        peer: &UserId,
        start: usize,
        count: usize,
    ) -> ChatResult<Vec<Message>> {
        let url = self.endpoint(&format!("message/getMessages/{user}/{peer}"))?;
        debug!(%url, start, count, "fetching message page");
        let response = self
            .authorize(self.client.get(url))
            .query(&[("startMessage", start), ("count", count)])
            .send()
            .await?;
        let page: MessagePage = Self::checked(response).await?.json().await?;
        Ok(page.into_messages())
    }

    async fn chat_list(&self, user: &UserId) -> ChatResult<Vec<ConversationSummary>> {
        let url = self.endpoint(&format!("message/chatList/{user}"))?;
        debug!(%url, "fetching conversation list");
        let response = self.authorize(self.client.get(url)).send().await?;
        let list: ConversationList = Self::checked(response).await?.json().await?;
        Ok(list.into_summaries())
    }
}
