use super::{TelegramClient, Update};
use crate::config::Destination;
use crate::dispatcher::CommandDispatcher;
use crate::error::DeliveryError;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{error, info, warn};

/// Long-polls `getUpdates` and feeds commands from the configured chat to the
/// dispatcher, one at a time.
pub struct UpdatePoller {
    client: TelegramClient,
    destination: Destination,
    dispatcher: Arc<CommandDispatcher>,
    poll_timeout_secs: u64,
}

impl UpdatePoller {
    pub fn new(
        client: TelegramClient,
        destination: Destination,
        dispatcher: Arc<CommandDispatcher>,
        poll_timeout_secs: u64,
    ) -> Self {
        Self {
            client,
            destination,
            dispatcher,
            poll_timeout_secs,
        }
    }

    pub async fn run(self) {
        let mut offset = self.drop_pending().await;
        info!("Telegram polling started");

        loop {
            match self
                .client
                .get_updates(&self.destination, offset, self.poll_timeout_secs)
                .await
            {
                Ok(updates) => {
                    for update in updates {
                        offset = Some(update.update_id + 1);
                        if let Some(text) = command_text(&update, self.destination.chat_id) {
                            self.dispatcher.handle_text(text).await;
                        }
                    }
                }
                Err(e) => {
                    let delay = poll_backoff(&e);
                    error!("Telegram polling failed: {}, retrying in {:?}", e, delay);
                    time::sleep(delay).await;
                }
            }
        }
    }

    /// Skips whatever queued up while the bot was offline.
    async fn drop_pending(&self) -> Option<i64> {
        match self.client.get_updates(&self.destination, Some(-1), 0).await {
            Ok(updates) => updates.last().map(|u| u.update_id + 1),
            Err(e) => {
                warn!("Could not drop pending updates: {}", e);
                None
            }
        }
    }
}

/// Text of an update worth dispatching: a text message from the configured chat.
pub fn command_text(update: &Update, chat_id: i64) -> Option<&str> {
    let message = update.message.as_ref()?;
    let text = message.text.as_deref()?;

    if message.chat.id != chat_id {
        warn!("Ignoring message from unauthorized chat {}", message.chat.id);
        return None;
    }
    Some(text)
}

fn poll_backoff(err: &DeliveryError) -> Duration {
    match err {
        DeliveryError::RateLimited { retry_after } => Duration::from_secs(*retry_after),
        DeliveryError::Unauthorized => Duration::from_secs(30),
        _ => Duration::from_secs(5),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telegram::{Chat, IncomingMessage};

    fn update(chat_id: i64, text: Option<&str>) -> Update {
        Update {
            update_id: 1,
            message: Some(IncomingMessage {
                chat: Chat { id: chat_id },
                text: text.map(str::to_string),
            }),
        }
    }

    #[test]
    fn test_command_text_from_configured_chat() {
        assert_eq!(command_text(&update(42, Some("/status")), 42), Some("/status"));
    }

    #[test]
    fn test_command_text_ignores_other_chats() {
        assert_eq!(command_text(&update(7, Some("/status")), 42), None);
    }

    #[test]
    fn test_command_text_ignores_non_text() {
        assert_eq!(command_text(&update(42, None), 42), None);
        let empty = Update { update_id: 2, message: None };
        assert_eq!(command_text(&empty, 42), None);
    }

    #[test]
    fn test_poll_backoff() {
        assert_eq!(poll_backoff(&DeliveryError::RateLimited { retry_after: 9 }), Duration::from_secs(9));
        assert_eq!(poll_backoff(&DeliveryError::Unauthorized), Duration::from_secs(30));
        assert_eq!(poll_backoff(&DeliveryError::Timeout), Duration::from_secs(5));
    }
}
