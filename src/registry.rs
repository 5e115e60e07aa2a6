use crate::error::{BotError, Result};
use crate::models::Instrument;

/// Ordered, immutable set of instruments the bot emits signals for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    instruments: Vec<Instrument>,
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            instruments: Instrument::ALL.to_vec(),
        }
    }
}

impl Registry {
    /// Builds a registry from a comma separated list such as `"XAUUSD,GBPUSD"`.
    /// Order is preserved and duplicates are collapsed.
    pub fn parse_list(list: &str) -> Result<Self> {
        let mut instruments = Vec::new();
        for symbol in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let instrument = Self::lookup_symbol(symbol)?;
            if !instruments.contains(&instrument) {
                instruments.push(instrument);
            }
        }

        if instruments.is_empty() {
            return Err(BotError::Config("Instrument list is empty".to_string()));
        }

        Ok(Self { instruments })
    }

    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    pub fn contains(&self, instrument: Instrument) -> bool {
        self.instruments.contains(&instrument)
    }

    /// Resolves an identifier against this registry.
    pub fn resolve(&self, symbol: &str) -> Result<Instrument> {
        let instrument = Self::lookup_symbol(symbol)?;
        if self.contains(instrument) {
            Ok(instrument)
        } else {
            Err(BotError::InvalidInstrument(instrument.symbol().to_string()))
        }
    }

    pub fn symbols(&self) -> Vec<&'static str> {
        self.instruments.iter().map(|i| i.symbol()).collect()
    }

    fn lookup_symbol(symbol: &str) -> Result<Instrument> {
        let wanted = symbol.trim();
        Instrument::ALL
            .iter()
            .copied()
            .find(|i| i.symbol().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| BotError::InvalidInstrument(wanted.to_string()))
    }
}
