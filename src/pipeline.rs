use crate::config::Destination;
use crate::error::{BotError, Result};
use crate::formatter::{self, OutboundMessage};
use crate::models::{Instrument, Signal};
use crate::signal_generator::SignalGenerator;
use crate::state::BotState;
use crate::telegram::{send_with_retry, DeliveryChannel};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Outcome of running every registry instrument through the pipeline once.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: Vec<(Instrument, String)>,
}

/// Generator -> formatter -> delivery channel, shared by the scheduler and the
/// command dispatcher.
#[derive(Clone)]
pub struct SignalPipeline {
    generator: SignalGenerator,
    channel: Arc<dyn DeliveryChannel>,
    destination: Destination,
    state: Arc<BotState>,
    max_attempts: u32,
}

impl SignalPipeline {
    pub fn new(
        generator: SignalGenerator,
        channel: Arc<dyn DeliveryChannel>,
        destination: Destination,
        state: Arc<BotState>,
        max_attempts: u32,
    ) -> Self {
        Self {
            generator,
            channel,
            destination,
            state,
            max_attempts,
        }
    }

    pub fn generator(&self) -> &SignalGenerator {
        &self.generator
    }

    pub fn state(&self) -> &Arc<BotState> {
        &self.state
    }

    pub async fn emit(&self, instrument: Instrument) -> Result<()> {
        self.emit_rendered(instrument, formatter::format_signal).await
    }

    /// Same as [`emit`](Self::emit) but with a caller-chosen template.
    pub async fn emit_rendered(
        &self,
        instrument: Instrument,
        render: fn(&Signal) -> String,
    ) -> Result<()> {
        let signal = self.generator.generate_for(instrument)?;
        let message = OutboundMessage::with_keyboard(render(&signal));

        match send_with_retry(self.channel.as_ref(), &self.destination, &message, self.max_attempts).await {
            Ok(()) => {
                self.state.record_delivery();
                info!(
                    "Signal sent: {} {} ({}%) [{}]",
                    signal.instrument, signal.direction, signal.confidence, signal.id
                );
                Ok(())
            }
            Err(e) => {
                self.state.record_failure(format!("{}: {}", instrument, e));
                error!("Failed to deliver {} signal [{}]: {}", instrument, signal.id, e);
                Err(BotError::Delivery(e))
            }
        }
    }

    /// One signal per registry instrument, in registry order. A failed
    /// instrument never stops the rest of the batch.
    pub async fn emit_all(&self) -> CycleReport {
        let mut report = CycleReport::default();

        for &instrument in self.generator.registry().instruments() {
            report.attempted += 1;
            match self.emit(instrument).await {
                Ok(()) => report.delivered += 1,
                Err(e) => report.failed.push((instrument, e.to_string())),
            }
        }

        if report.failed.is_empty() {
            info!("Cycle complete: {}/{} signals delivered", report.delivered, report.attempted);
        } else {
            warn!(
                "Cycle complete with failures: {}/{} signals delivered",
                report.delivered, report.attempted
            );
        }
        report
    }

    /// Best-effort reply to the configured chat with the command keyboard.
    pub async fn reply(&self, text: String) -> Result<()> {
        let message = OutboundMessage::with_keyboard(text);
        send_with_retry(self.channel.as_ref(), &self.destination, &message, self.max_attempts)
            .await
            .map_err(|e| {
                self.state.record_failure(format!("reply: {}", e));
                warn!("Failed to send reply: {}", e);
                BotError::Delivery(e)
            })
    }
}
