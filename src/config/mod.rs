use crate::error::{BotError, Result};
use crate::registry::Registry;
use std::env;
use std::fmt;
use std::time::Duration;

/// The single chat all outbound messages go to, plus the bot credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Destination {
    pub chat_id: i64,
    token: String,
}

impl Destination {
    pub fn new(chat_id: i64, token: String) -> Result<Self> {
        validate_token(&token)?;
        Ok(Self { chat_id, token })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Token with the secret half hidden, safe for logs.
    pub fn masked_token(&self) -> String {
        match self.token.split_once(':') {
            Some((bot_id, _)) => format!("{}:***", bot_id),
            None => "***".to_string(),
        }
    }
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Destination")
            .field("chat_id", &self.chat_id)
            .field("token", &self.masked_token())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub destination: Destination,
    pub telegram_api_url: String,
    pub port: u16,
    pub check_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub delivery_max_attempts: u32,
    pub poll_timeout_secs: u64,
    pub registry: Registry,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup("TELEGRAM_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| BotError::Config("TELEGRAM_TOKEN not set".to_string()))?;

        let chat_id = lookup("TELEGRAM_CHAT_ID")
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| BotError::Config("TELEGRAM_CHAT_ID not set".to_string()))?
            .trim()
            .parse::<i64>()
            .map_err(|_| BotError::Config("Invalid TELEGRAM_CHAT_ID".to_string()))?;

        if chat_id == 0 {
            return Err(BotError::Config("Invalid TELEGRAM_CHAT_ID".to_string()));
        }

        let destination = Destination::new(chat_id, token.trim().to_string())?;

        let telegram_api_url = lookup("TELEGRAM_API_URL")
            .unwrap_or_else(|| "https://api.telegram.org".to_string())
            .trim_end_matches('/')
            .to_string();

        let port = lookup("PORT")
            .unwrap_or_else(|| "10000".to_string())
            .parse::<u16>()
            .map_err(|_| BotError::Config("Invalid PORT".to_string()))?;

        let check_interval_secs = lookup("CHECK_INTERVAL_SECS")
            .unwrap_or_else(|| "60".to_string())
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or_else(|| BotError::Config("Invalid CHECK_INTERVAL_SECS".to_string()))?;

        let request_timeout_secs = lookup("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|| "10".to_string())
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or_else(|| BotError::Config("Invalid REQUEST_TIMEOUT_SECS".to_string()))?;

        let delivery_max_attempts = lookup("DELIVERY_MAX_ATTEMPTS")
            .unwrap_or_else(|| "1".to_string())
            .parse::<u32>()
            .ok()
            .filter(|n| (1..=5).contains(n))
            .ok_or_else(|| BotError::Config("Invalid DELIVERY_MAX_ATTEMPTS (1-5)".to_string()))?;

        let poll_timeout_secs = lookup("POLL_TIMEOUT_SECS")
            .unwrap_or_else(|| "30".to_string())
            .parse::<u64>()
            .map_err(|_| BotError::Config("Invalid POLL_TIMEOUT_SECS".to_string()))?;

        let registry = match lookup("SIGNAL_INSTRUMENTS") {
            Some(list) => Registry::parse_list(&list)
                .map_err(|e| BotError::Config(format!("Invalid SIGNAL_INSTRUMENTS: {}", e)))?,
            None => Registry::default(),
        };

        Ok(Self {
            destination,
            telegram_api_url,
            port,
            check_interval_secs,
            request_timeout_secs,
            delivery_max_attempts,
            poll_timeout_secs,
            registry,
        })
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn validate_token(token: &str) -> Result<()> {
    let (bot_id, secret) = token
        .split_once(':')
        .ok_or_else(|| BotError::Config("Malformed TELEGRAM_TOKEN".to_string()))?;

    if bot_id.is_empty() || !bot_id.chars().all(|c| c.is_ascii_digit()) {
        return Err(BotError::Config("Malformed TELEGRAM_TOKEN".to_string()));
    }
    if secret.is_empty() || secret.chars().any(char::is_whitespace) {
        return Err(BotError::Config("Malformed TELEGRAM_TOKEN".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Instrument;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const TOKEN: &str = "123456:ABC-secret";

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("TELEGRAM_TOKEN", TOKEN),
            ("TELEGRAM_CHAT_ID", "1037258513"),
        ]))
        .unwrap();

        assert_eq!(config.destination.chat_id, 1037258513);
        assert_eq!(config.port, 10000);
        assert_eq!(config.check_interval_secs, 60);
        assert_eq!(config.request_timeout_secs, 10);
        assert_eq!(config.delivery_max_attempts, 1);
        assert_eq!(config.telegram_api_url, "https://api.telegram.org");
        assert_eq!(config.registry.len(), 3);
    }

    #[test]
    fn test_missing_token_is_fatal() {
        let err = Config::from_lookup(lookup_from(&[("TELEGRAM_CHAT_ID", "42")])).unwrap_err();
        assert!(matches!(err, BotError::Config(msg) if msg.contains("TELEGRAM_TOKEN")));
    }

    #[test]
    fn test_missing_chat_id_is_fatal() {
        let err = Config::from_lookup(lookup_from(&[("TELEGRAM_TOKEN", TOKEN)])).unwrap_err();
        assert!(matches!(err, BotError::Config(msg) if msg.contains("TELEGRAM_CHAT_ID")));
    }

    #[test]
    fn test_malformed_values_are_fatal() {
        let cases = [
            [("TELEGRAM_TOKEN", "not-a-token"), ("TELEGRAM_CHAT_ID", "42")],
            [("TELEGRAM_TOKEN", "abc:def"), ("TELEGRAM_CHAT_ID", "42")],
            [("TELEGRAM_TOKEN", TOKEN), ("TELEGRAM_CHAT_ID", "chat")],
            [("TELEGRAM_TOKEN", TOKEN), ("TELEGRAM_CHAT_ID", "0")],
        ];

        for pairs in cases.iter() {
            let result = Config::from_lookup(lookup_from(pairs));
            assert!(matches!(result, Err(BotError::Config(_))), "accepted {:?}", pairs);
        }
    }

    #[test]
    fn test_rejects_zero_interval_and_bad_attempts() {
        let zero_interval = Config::from_lookup(lookup_from(&[
            ("TELEGRAM_TOKEN", TOKEN),
            ("TELEGRAM_CHAT_ID", "42"),
            ("CHECK_INTERVAL_SECS", "0"),
        ]));
        assert!(zero_interval.is_err());

        let too_many = Config::from_lookup(lookup_from(&[
            ("TELEGRAM_TOKEN", TOKEN),
            ("TELEGRAM_CHAT_ID", "42"),
            ("DELIVERY_MAX_ATTEMPTS", "9"),
        ]));
        assert!(too_many.is_err());
    }

    #[test]
    fn test_instrument_subset_and_api_url() {
        let config = Config::from_lookup(lookup_from(&[
            ("TELEGRAM_TOKEN", TOKEN),
            ("TELEGRAM_CHAT_ID", "-100200300"),
            ("SIGNAL_INSTRUMENTS", "EURUSD,XAUUSD"),
            ("TELEGRAM_API_URL", "http://localhost:8081/"),
        ]))
        .unwrap();

        assert_eq!(config.destination.chat_id, -100200300);
        assert_eq!(config.registry.instruments(), &[Instrument::Eurusd, Instrument::Xauusd]);
        assert_eq!(config.telegram_api_url, "http://localhost:8081");
    }

    #[test]
    fn test_debug_masks_token() {
        let destination = Destination::new(42, TOKEN.to_string()).unwrap();
        let printed = format!("{:?}", destination);
        assert!(printed.contains("123456:***"));
        assert!(!printed.contains("secret"));
    }
}
