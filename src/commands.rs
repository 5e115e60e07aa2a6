use crate::error::{BotError, Result};
use crate::formatter::{HELP_BUTTON, SIGNAL_BUTTON, STATUS_BUTTON, TEST_BUTTON};
use crate::models::Instrument;

/// Everything a user can ask the bot to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Status,
    Test,
    Signal,
    Help,
    Instrument(Instrument),
}

impl Command {
    /// Parses a slash command (`/status`, `/status@my_bot`) or a keyboard
    /// button label. Anything else is an `UnexpectedCommand`.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();

        if let Some(command) = Self::from_button(text) {
            return Ok(command);
        }

        let unexpected = || BotError::UnexpectedCommand(text.to_string());
        let word = text
            .strip_prefix('/')
            .and_then(|rest| rest.split_whitespace().next())
            .ok_or_else(unexpected)?;
        let name = word.split('@').next().unwrap_or(word).to_ascii_lowercase();

        match name.as_str() {
            "start" => Ok(Command::Start),
            "status" => Ok(Command::Status),
            "test" => Ok(Command::Test),
            "signal" => Ok(Command::Signal),
            "help" => Ok(Command::Help),
            other => Instrument::ALL
                .iter()
                .find(|i| i.symbol().eq_ignore_ascii_case(other))
                .map(|&i| Command::Instrument(i))
                .ok_or_else(unexpected),
        }
    }

    fn from_button(text: &str) -> Option<Self> {
        match text {
            STATUS_BUTTON => Some(Command::Status),
            SIGNAL_BUTTON => Some(Command::Signal),
            TEST_BUTTON => Some(Command::Test),
            HELP_BUTTON => Some(Command::Help),
            _ => Instrument::ALL
                .iter()
                .find(|i| i.keyboard_label() == text)
                .map(|&i| Command::Instrument(i)),
        }
    }
}
