use crate::error::Result;
use crate::models::{Direction, Instrument, RiskLevel, Signal, MAX_CONFIDENCE};
use crate::registry::Registry;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};
use tracing::debug;
use uuid::Uuid;

/// Raw output of a strategy before the generator derives levels from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub direction: Direction,
    pub confidence: u8,
    pub price: f64,
}

/// Rule deciding direction, confidence and price. Demo strategies carry no
/// predictive value.
pub trait SignalStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn decide(&self, instrument: Instrument) -> Decision;
}

const STOP_LOSS_RANGES: f64 = 1.5;
const TAKE_PROFIT_RANGES: f64 = 2.5;
const PRICE_JITTER: f64 = 0.005;

pub struct RandomStrategy {
    rng: Mutex<StdRng>,
}

impl RandomStrategy {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalStrategy for RandomStrategy {
    fn name(&self) -> &'static str {
        "random-demo"
    }

    fn decide(&self, instrument: Instrument) -> Decision {
        // A poisoned lock only means another caller panicked mid-draw; the rng is still usable.
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());

        let direction = if rng.gen_bool(0.5) { Direction::Buy } else { Direction::Sell };
        let confidence = rng.gen_range(60..=95);
        let jitter = rng.gen_range(-PRICE_JITTER..=PRICE_JITTER);
        let price = instrument.reference_price() * (1.0 + jitter);

        Decision {
            direction,
            confidence,
            price,
        }
    }
}

#[derive(Clone)]
pub struct SignalGenerator {
    registry: Registry,
    strategy: Arc<dyn SignalStrategy>,
}

impl SignalGenerator {
    pub fn new(registry: Registry, strategy: Arc<dyn SignalStrategy>) -> Self {
        Self { registry, strategy }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Generates a signal for a registry symbol such as `"XAUUSD"`.
    pub fn generate(&self, symbol: &str) -> Result<Signal> {
        let instrument = self.registry.resolve(symbol)?;
        Ok(self.build(instrument))
    }

    pub fn generate_for(&self, instrument: Instrument) -> Result<Signal> {
        self.generate(instrument.symbol())
    }

    fn build(&self, instrument: Instrument) -> Signal {
        let decision = self.strategy.decide(instrument);
        let confidence = decision.confidence.min(MAX_CONFIDENCE);
        let price = instrument.round_price(decision.price);
        let range = instrument.typical_range_pips() * instrument.pip_size();

        let (stop_loss, take_profit) = match decision.direction {
            Direction::Buy => (
                price - range * STOP_LOSS_RANGES,
                price + range * TAKE_PROFIT_RANGES,
            ),
            Direction::Sell => (
                price + range * STOP_LOSS_RANGES,
                price - range * TAKE_PROFIT_RANGES,
            ),
        };

        let signal = Signal {
            id: Uuid::new_v4(),
            instrument,
            direction: decision.direction,
            confidence,
            price,
            stop_loss: instrument.round_price(stop_loss),
            take_profit: instrument.round_price(take_profit),
            risk_level: RiskLevel::from_confidence(confidence),
            reasons: vec![
                format!("Demo strategy: {}", self.strategy.name()),
                "Synthetic price, not live market data".to_string(),
            ],
            timestamp: Utc::now(),
        };

        debug!(
            "Generated {} {} signal {} ({}%)",
            signal.instrument, signal.direction, signal.id, signal.confidence
        );
        signal
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::BotError;

    /// Always answers the same decision; lets tests pin direction and price.
    pub(crate) struct FixedStrategy(pub Decision);

    impl SignalStrategy for FixedStrategy {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn decide(&self, _instrument: Instrument) -> Decision {
            self.0
        }
    }

    fn generator(strategy: impl SignalStrategy + 'static) -> SignalGenerator {
        SignalGenerator::new(Registry::default(), Arc::new(strategy))
    }

    #[test]
    fn test_generate_every_registry_instrument() {
        let generator = generator(RandomStrategy::seeded(7));

        for _ in 0..50 {
            for instrument in Instrument::ALL {
                let signal = generator.generate(instrument.symbol()).unwrap();
                assert_eq!(signal.instrument, instrument);
                assert!(signal.confidence <= MAX_CONFIDENCE);
                assert!((60..=95).contains(&signal.confidence));

                let drift = (signal.price / instrument.reference_price() - 1.0).abs();
                assert!(drift <= PRICE_JITTER + 1e-6, "price drifted {}", drift);
            }
        }
    }

    #[test]
    fn test_generate_rejects_unknown_instrument() {
        let generator = generator(RandomStrategy::seeded(1));
        let err = generator.generate("XAGUSD").unwrap_err();
        assert!(matches!(err, BotError::InvalidInstrument(s) if s == "XAGUSD"));
    }

    #[test]
    fn test_generate_rejects_instrument_outside_subset() {
        let registry = Registry::parse_list("GBPUSD").unwrap();
        let generator = SignalGenerator::new(registry, Arc::new(RandomStrategy::seeded(1)));

        assert!(generator.generate_for(Instrument::Gbpusd).is_ok());
        assert!(matches!(
            generator.generate_for(Instrument::Xauusd),
            Err(BotError::InvalidInstrument(_))
        ));
    }

    #[test]
    fn test_buy_levels_bracket_price() {
        let generator = generator(FixedStrategy(Decision {
            direction: Direction::Buy,
            confidence: 82,
            price: 1.08504,
        }));

        let signal = generator.generate("EURUSD").unwrap();
        assert_eq!(signal.price, 1.08504);
        assert_eq!(signal.stop_loss, 1.08324);
        assert_eq!(signal.take_profit, 1.08804);
        assert_eq!(signal.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_sell_levels_bracket_price() {
        let generator = generator(FixedStrategy(Decision {
            direction: Direction::Sell,
            confidence: 70,
            price: 2350.0,
        }));

        let signal = generator.generate("XAUUSD").unwrap();
        assert_eq!(signal.stop_loss, 2372.5);
        assert_eq!(signal.take_profit, 2312.5);
        assert_eq!(signal.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn test_confidence_is_clamped() {
        let generator = generator(FixedStrategy(Decision {
            direction: Direction::Buy,
            confidence: 250,
            price: 1.2650,
        }));

        assert_eq!(generator.generate("GBPUSD").unwrap().confidence, MAX_CONFIDENCE);
    }
}
