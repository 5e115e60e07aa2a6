mod client;
pub mod updates;

pub use client::{Chat, IncomingMessage, TelegramClient, Update};
pub use updates::UpdatePoller;

use crate::config::Destination;
use crate::error::DeliveryError;
use crate::formatter::OutboundMessage;
use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

/// Upper bound on a single server-requested backoff.
pub const MAX_RETRY_AFTER_SECS: u64 = 60;

/// Something that can put a message in front of the configured chat.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    async fn send(
        &self,
        destination: &Destination,
        message: &OutboundMessage,
    ) -> std::result::Result<(), DeliveryError>;
}

/// Sends with bounded retry. Only transient failures are retried; backoff is
/// exponential unless the API names its own `retry_after`.
pub async fn send_with_retry(
    channel: &dyn DeliveryChannel,
    destination: &Destination,
    message: &OutboundMessage,
    max_attempts: u32,
) -> std::result::Result<(), DeliveryError> {
    let max_attempts = max_attempts.max(1);
    let mut attempts = 0;

    loop {
        attempts += 1;
        match channel.send(destination, message).await {
            Ok(()) => return Ok(()),
            Err(e) if e.is_transient() && attempts < max_attempts => {
                let delay = match &e {
                    DeliveryError::RateLimited { retry_after } => {
                        Duration::from_secs((*retry_after).min(MAX_RETRY_AFTER_SECS))
                    }
                    _ => Duration::from_secs(2u64.pow(attempts)),
                };
                warn!(
                    "Delivery failed (attempt {}/{}): {}, retrying in {:?}",
                    attempts, max_attempts, e, delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    struct ScriptedChannel {
        outcomes: Mutex<Vec<std::result::Result<(), DeliveryError>>>,
        calls: AtomicU32,
    }

    impl ScriptedChannel {
        fn new(mut outcomes: Vec<std::result::Result<(), DeliveryError>>) -> Self {
            outcomes.reverse();
            Self {
                outcomes: Mutex::new(outcomes),
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl DeliveryChannel for ScriptedChannel {
        async fn send(
            &self,
            _destination: &Destination,
            _message: &OutboundMessage,
        ) -> std::result::Result<(), DeliveryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcomes.lock().unwrap().pop().unwrap_or(Ok(()))
        }
    }

    fn destination() -> Destination {
        Destination::new(42, "1:secret".to_string()).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_failures() {
        let channel = ScriptedChannel::new(vec![
            Err(DeliveryError::Timeout),
            Err(DeliveryError::RateLimited { retry_after: 3 }),
            Ok(()),
        ]);
        let message = OutboundMessage::plain("hello".to_string());

        let result = send_with_retry(&channel, &destination(), &message, 3).await;
        assert!(result.is_ok());
        assert_eq!(channel.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let channel = ScriptedChannel::new(vec![
            Err(DeliveryError::Timeout),
            Err(DeliveryError::Timeout),
        ]);
        let message = OutboundMessage::plain("hello".to_string());

        let result = send_with_retry(&channel, &destination(), &message, 2).await;
        assert_eq!(result, Err(DeliveryError::Timeout));
        assert_eq!(channel.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_caps_server_retry_after() {
        let channel = ScriptedChannel::new(vec![
            Err(DeliveryError::RateLimited { retry_after: 86_400 }),
            Ok(()),
        ]);
        let message = OutboundMessage::plain("hello".to_string());

        let started = tokio::time::Instant::now();
        let result = send_with_retry(&channel, &destination(), &message, 2).await;
        assert!(result.is_ok());
        assert_eq!(channel.calls.load(Ordering::SeqCst), 2);
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(MAX_RETRY_AFTER_SECS));
        assert!(waited < Duration::from_secs(MAX_RETRY_AFTER_SECS + 1));
    }

    #[tokio::test]
    async fn test_does_not_retry_permanent_failures() {
        let channel = ScriptedChannel::new(vec![Err(DeliveryError::Unauthorized)]);
        let message = OutboundMessage::plain("hello".to_string());

        let result = send_with_retry(&channel, &destination(), &message, 5).await;
        assert_eq!(result, Err(DeliveryError::Unauthorized));
        assert_eq!(channel.calls.load(Ordering::SeqCst), 1);
    }
}
