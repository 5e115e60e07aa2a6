use super::DeliveryChannel;
use crate::config::Destination;
use crate::error::{DeliveryError, Result};
use crate::formatter::{OutboundMessage, ReplyKeyboard};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<&'a ReplyKeyboard>,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub error_code: Option<u16>,
    pub description: Option<String>,
    pub parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseParameters {
    pub retry_after: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<IncomingMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// Bot API client over reqwest. Every request is bounded by the client timeout.
#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    api_url: String,
    timeout: Duration,
}

impl TelegramClient {
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn method_url(&self, destination: &Destination, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, destination.token(), method)
    }

    /// Long-polls for new updates. The request timeout is stretched past the
    /// poll window so an idle poll is not reported as a timeout.
    pub async fn get_updates(
        &self,
        destination: &Destination,
        offset: Option<i64>,
        poll_timeout_secs: u64,
    ) -> std::result::Result<Vec<Update>, DeliveryError> {
        let mut query = vec![("timeout", poll_timeout_secs.to_string())];
        if let Some(offset) = offset {
            query.push(("offset", offset.to_string()));
        }

        let response = self
            .client
            .get(self.method_url(destination, "getUpdates"))
            .query(&query)
            .timeout(self.timeout + Duration::from_secs(poll_timeout_secs))
            .send()
            .await?;

        let updates: Vec<Update> = Self::read_result(response).await?;
        debug!("Received {} updates", updates.len());
        Ok(updates)
    }

    async fn read_result<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> std::result::Result<T, DeliveryError> {
        let status = response.status().as_u16();
        let text = response.text().await?;
        let body: Option<ApiResponse<T>> = serde_json::from_str(&text).ok();

        match body {
            Some(ApiResponse { ok: true, result: Some(result), .. }) if status < 300 => Ok(result),
            body => Err(classify_failure(status, body)),
        }
    }
}

#[async_trait]
impl DeliveryChannel for TelegramClient {
    async fn send(
        &self,
        destination: &Destination,
        message: &OutboundMessage,
    ) -> std::result::Result<(), DeliveryError> {
        let payload = SendMessageRequest {
            chat_id: destination.chat_id,
            text: &message.text,
            reply_markup: message.keyboard.as_ref(),
            disable_web_page_preview: true,
        };

        let response = self
            .client
            .post(self.method_url(destination, "sendMessage"))
            .json(&payload)
            .send()
            .await?;

        let _: serde_json::Value = Self::read_result(response).await?;
        Ok(())
    }
}

/// Maps a failed Bot API call to the delivery taxonomy.
pub(crate) fn classify_failure<T>(status: u16, body: Option<ApiResponse<T>>) -> DeliveryError {
    let (error_code, description, retry_after) = match body {
        Some(body) => (
            body.error_code.unwrap_or(status),
            body.description.unwrap_or_default(),
            body.parameters.and_then(|p| p.retry_after),
        ),
        None => (status, String::new(), None),
    };

    let code = if status >= 400 { status } else { error_code };
    match code {
        401 => DeliveryError::Unauthorized,
        403 => DeliveryError::ChatNotFound,
        400 if description.to_lowercase().contains("chat not found") => DeliveryError::ChatNotFound,
        429 => DeliveryError::RateLimited {
            retry_after: retry_after.unwrap_or(1),
        },
        _ => DeliveryError::Api {
            status: code,
            description: if description.is_empty() {
                "Unknown error".to_string()
            } else {
                description
            },
        },
    }
}
