use crate::models::{Direction, Instrument, Signal, StatusSnapshot};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write;
use std::time::Duration;

/// Telegram rejects message texts longer than this many characters.
pub const MAX_MESSAGE_CHARS: usize = 4096;

pub const STATUS_BUTTON: &str = "📊 Status";
pub const SIGNAL_BUTTON: &str = "🚨 Signal";
pub const TEST_BUTTON: &str = "🧪 Test";
pub const HELP_BUTTON: &str = "ℹ️ Help";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyboardButton {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplyKeyboard {
    pub keyboard: Vec<Vec<KeyboardButton>>,
    pub resize_keyboard: bool,
    pub is_persistent: bool,
}

/// A text body plus the optional keyboard shown under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub text: String,
    pub keyboard: Option<ReplyKeyboard>,
}

impl OutboundMessage {
    pub fn plain(text: String) -> Self {
        Self {
            text: truncate(text),
            keyboard: None,
        }
    }

    pub fn with_keyboard(text: String) -> Self {
        Self {
            text: truncate(text),
            keyboard: Some(keyboard()),
        }
    }
}

pub fn keyboard() -> ReplyKeyboard {
    let row = |labels: Vec<String>| {
        labels
            .into_iter()
            .map(|text| KeyboardButton { text })
            .collect::<Vec<_>>()
    };

    ReplyKeyboard {
        keyboard: vec![
            row(vec![
                STATUS_BUTTON.to_string(),
                SIGNAL_BUTTON.to_string(),
                TEST_BUTTON.to_string(),
            ]),
            row(Instrument::ALL.iter().map(Instrument::keyboard_label).collect()),
            row(vec![HELP_BUTTON.to_string()]),
        ],
        resize_keyboard: true,
        is_persistent: true,
    }
}

pub fn format_signal(signal: &Signal) -> String {
    let instrument = signal.instrument;
    let (emoji, action) = match signal.direction {
        Direction::Buy => ("🟢", "BUY"),
        Direction::Sell => ("🔴", "SELL"),
    };

    let mut text = format!(
        "{emoji} {action} {symbol} {emoji}\n\n\
         💰 Entry: {price}\n\
         🛡 Stop loss: {sl}\n\
         🎯 Take profit: {tp}\n\
         ✅ Confidence: {confidence}%\n\
         📊 Risk level: {risk}\n",
        emoji = emoji,
        action = action,
        symbol = instrument.symbol(),
        price = instrument.format_price(signal.price),
        sl = instrument.format_price(signal.stop_loss),
        tp = instrument.format_price(signal.take_profit),
        confidence = signal.confidence,
        risk = signal.risk_level,
    );

    if !signal.reasons.is_empty() {
        text.push_str("\n📈 Reasons:\n");
        for (i, reason) in signal.reasons.iter().take(3).enumerate() {
            let _ = writeln!(text, "{}. {}", i + 1, reason);
        }
    }

    let _ = write!(
        text,
        "\n⏰ {}\n⚠️ Demo signal. Not investment advice.",
        format_time(&signal.timestamp)
    );

    truncate(text)
}

pub fn format_test_banner(signal: &Signal) -> String {
    truncate(format!(
        "🧪 TEST SIGNAL\n\n{}\n\n✅ Delivery pipeline is working.",
        format_signal(signal)
    ))
}

pub fn format_status(snapshot: &StatusSnapshot) -> String {
    let instruments: Vec<&str> = snapshot.instruments.iter().map(|i| i.symbol()).collect();

    let mut text = format!(
        "🤖 System status\n\n\
         🟢 Bot: running\n\
         📱 Chat activated: {}\n\
         ⏳ Uptime: {}\n\
         🔄 Scheduler: {}\n\
         ⏱ Interval: {}\n\
         🕒 Last tick: {}\n\
         ⏭ Next tick: {}\n\
         📊 Instruments: {}\n\
         🔁 Cycles completed: {}\n\
         📨 Signals delivered: {}\n\
         ❌ Delivery failures: {}\n",
        if snapshot.active { "yes" } else { "no" },
        format_duration(snapshot.uptime),
        snapshot.phase,
        format_duration(snapshot.interval),
        snapshot.last_tick.as_ref().map(format_time).unwrap_or_else(|| "never".to_string()),
        snapshot.next_tick.as_ref().map(format_time).unwrap_or_else(|| "pending".to_string()),
        instruments.join(", "),
        snapshot.cycles_completed,
        snapshot.signals_delivered,
        snapshot.delivery_failures,
    );

    if let Some(err) = &snapshot.last_delivery_error {
        let _ = writeln!(text, "⚠️ Last delivery error: {}", err);
    }
    let _ = write!(text, "\n⏰ {}", format_time(&snapshot.taken_at));

    truncate(text)
}

pub fn format_welcome(instruments: &[Instrument], interval: Duration) -> String {
    let symbols: Vec<&str> = instruments.iter().map(|i| i.symbol()).collect();
    truncate(format!(
        "🤖 Demo Signal Bot\n\n\
         📈 Instruments: {}\n\
         ⏱ Signal interval: {}\n\n\
         Signals are synthetic and for demonstration only.\n\
         Use the keyboard below or /help for commands.",
        symbols.join(", "),
        format_duration(interval),
    ))
}

pub fn format_help(instruments: &[Instrument], interval: Duration) -> String {
    let mut text = String::from(
        "🤖 Demo Signal Bot - commands\n\n\
         /start - activate the bot in this chat\n\
         /status - scheduler and delivery status\n\
         /test - send one test signal\n\
         /signal - send a signal for every instrument\n\
         /help - this message\n\n\
         📱 Instrument buttons:\n",
    );

    for instrument in instruments {
        let _ = writeln!(
            text,
            "• {} - {}",
            instrument.keyboard_label(),
            instrument.description()
        );
    }

    let _ = write!(
        text,
        "\n🚀 Automatic signals every {}.",
        format_duration(interval)
    );

    truncate(text)
}

fn format_time(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

fn truncate(text: String) -> String {
    if text.chars().count() <= MAX_MESSAGE_CHARS {
        return text;
    }
    let mut cut: String = text.chars().take(MAX_MESSAGE_CHARS - 1).collect();
    cut.push('…');
    cut
}
