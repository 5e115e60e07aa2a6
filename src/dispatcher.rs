use crate::commands::Command;
use crate::error::{BotError, Result};
use crate::formatter;
use crate::models::Instrument;
use crate::pipeline::SignalPipeline;
use tracing::{debug, error, info};

/// Instrument used by `/test` and by the signal sent right after `/start`.
pub const DEFAULT_TEST_INSTRUMENT: Instrument = Instrument::Xauusd;

pub struct CommandDispatcher {
    pipeline: SignalPipeline,
}

impl CommandDispatcher {
    pub fn new(pipeline: SignalPipeline) -> Self {
        Self { pipeline }
    }

    /// Entry point for raw chat text. Never fails: unknown input is answered
    /// with the help text and handler errors are logged.
    pub async fn handle_text(&self, text: &str) {
        let result = match Command::parse(text) {
            Ok(command) => {
                info!("Command received: {:?}", command);
                self.dispatch(command).await
            }
            Err(BotError::UnexpectedCommand(input)) => {
                debug!("Unexpected command {:?}, answering with help", input);
                self.help().await
            }
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            error!("Command handling failed: {}", e);
        }
    }

    pub async fn dispatch(&self, command: Command) -> Result<()> {
        match command {
            Command::Start => self.start().await,
            Command::Status => self.status().await,
            Command::Test => self.test().await,
            Command::Signal => self.signal().await,
            Command::Help => self.help().await,
            Command::Instrument(instrument) => self.instrument(instrument).await,
        }
    }

    async fn start(&self) -> Result<()> {
        let state = self.pipeline.state();
        if state.activate() {
            info!("Bot activated in chat");
        }

        self.pipeline
            .reply(formatter::format_welcome(state.instruments(), state.interval()))
            .await?;
        self.test().await
    }

    async fn status(&self) -> Result<()> {
        let snapshot = self.pipeline.state().snapshot();
        self.pipeline.reply(formatter::format_status(&snapshot)).await
    }

    async fn test(&self) -> Result<()> {
        self.pipeline
            .emit_rendered(self.test_instrument(), formatter::format_test_banner)
            .await
    }

    async fn signal(&self) -> Result<()> {
        let report = self.pipeline.emit_all().await;
        info!(
            "Manual signal run: {}/{} delivered",
            report.delivered, report.attempted
        );
        Ok(())
    }

    async fn help(&self) -> Result<()> {
        let state = self.pipeline.state();
        self.pipeline
            .reply(formatter::format_help(state.instruments(), state.interval()))
            .await
    }

    async fn instrument(&self, instrument: Instrument) -> Result<()> {
        match self.pipeline.emit(instrument).await {
            Err(BotError::InvalidInstrument(symbol)) => {
                self.pipeline
                    .reply(format!("❌ Symbol {} is not supported", symbol))
                    .await
            }
            other => other,
        }
    }

    fn test_instrument(&self) -> Instrument {
        let registry = self.pipeline.generator().registry();
        if registry.contains(DEFAULT_TEST_INSTRUMENT) {
            DEFAULT_TEST_INSTRUMENT
        } else {
            registry
                .instruments()
                .first()
                .copied()
                .unwrap_or(DEFAULT_TEST_INSTRUMENT)
        }
    }
}
