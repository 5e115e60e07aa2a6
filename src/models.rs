use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Instrument {
    #[serde(rename = "XAUUSD")]
    Xauusd,
    #[serde(rename = "EURUSD")]
    Eurusd,
    #[serde(rename = "GBPUSD")]
    Gbpusd,
}

impl Instrument {
    pub const ALL: [Instrument; 3] = [Instrument::Xauusd, Instrument::Eurusd, Instrument::Gbpusd];

    pub fn symbol(&self) -> &'static str {
        match self {
            Instrument::Xauusd => "XAUUSD",
            Instrument::Eurusd => "EURUSD",
            Instrument::Gbpusd => "GBPUSD",
        }
    }

    pub fn precision(&self) -> u32 {
        match self {
            Instrument::Xauusd => 2,
            Instrument::Eurusd | Instrument::Gbpusd => 5,
        }
    }

    pub fn pip_size(&self) -> f64 {
        match self {
            Instrument::Xauusd => 0.1,
            Instrument::Eurusd | Instrument::Gbpusd => 0.0001,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Instrument::Xauusd => "🟡",
            Instrument::Eurusd => "💶",
            Instrument::Gbpusd => "💷",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Instrument::Xauusd => "gold",
            Instrument::Eurusd => "euro / US dollar",
            Instrument::Gbpusd => "pound / US dollar",
        }
    }

    /// Anchor around which synthetic prices are drawn.
    pub fn reference_price(&self) -> f64 {
        match self {
            Instrument::Xauusd => 2350.0,
            Instrument::Eurusd => 1.0850,
            Instrument::Gbpusd => 1.2650,
        }
    }

    /// Typical hourly range, in pips. Drives stop loss / take profit distance.
    pub fn typical_range_pips(&self) -> f64 {
        match self {
            Instrument::Xauusd => 150.0,
            Instrument::Eurusd => 12.0,
            Instrument::Gbpusd => 15.0,
        }
    }

    pub fn keyboard_label(&self) -> String {
        format!("{} {}", self.emoji(), self.symbol())
    }

    /// Round a price to this instrument's display precision.
    pub fn round_price(&self, price: f64) -> f64 {
        let factor = 10_f64.powi(self.precision() as i32);
        (price * factor).round() / factor
    }

    pub fn format_price(&self, price: f64) -> String {
        format!("{:.*}", self.precision() as usize, price)
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Buy,
    Sell,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Buy => f.write_str("BUY"),
            Direction::Sell => f.write_str("SELL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_confidence(confidence: u8) -> Self {
        match confidence {
            80..=u8::MAX => RiskLevel::Low,
            65..=79 => RiskLevel::Medium,
            _ => RiskLevel::High,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => f.write_str("LOW"),
            RiskLevel::Medium => f.write_str("MEDIUM"),
            RiskLevel::High => f.write_str("HIGH"),
        }
    }
}

pub const MAX_CONFIDENCE: u8 = 100;

/// A synthetic, non-predictive directional suggestion for one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub id: Uuid,
    pub instrument: Instrument,
    pub direction: Direction,
    pub confidence: u8,
    pub price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub risk_level: RiskLevel,
    pub reasons: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SchedulerPhase {
    #[serde(rename = "IDLE")]
    Idle,
    #[serde(rename = "EMITTING")]
    Emitting,
}

impl fmt::Display for SchedulerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerPhase::Idle => f.write_str("IDLE"),
            SchedulerPhase::Emitting => f.write_str("EMITTING"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub uptime: Duration,
    pub phase: SchedulerPhase,
    pub active: bool,
    pub interval: Duration,
    pub last_tick: Option<DateTime<Utc>>,
    pub next_tick: Option<DateTime<Utc>>,
    pub instruments: Vec<Instrument>,
    pub cycles_completed: u64,
    pub signals_delivered: u64,
    pub delivery_failures: u64,
    pub last_delivery_error: Option<String>,
    pub taken_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_price_respects_precision() {
        assert_eq!(Instrument::Xauusd.round_price(2350.456), 2350.46);
        assert_eq!(Instrument::Eurusd.round_price(1.085_014_9), 1.08501);
        assert_eq!(Instrument::Gbpusd.format_price(1.265), "1.26500");
    }

    #[test]
    fn test_risk_level_bands() {
        assert_eq!(RiskLevel::from_confidence(95), RiskLevel::Low);
        assert_eq!(RiskLevel::from_confidence(80), RiskLevel::Low);
        assert_eq!(RiskLevel::from_confidence(79), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_confidence(65), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_confidence(64), RiskLevel::High);
        assert_eq!(RiskLevel::from_confidence(0), RiskLevel::High);
    }
}
