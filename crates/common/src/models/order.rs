use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;

use super::signal::TradeSignal;

/// Exchange-assigned order identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct OrderId(pub String);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for OrderId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// Trading rules the exchange publishes for one instrument.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SymbolRules {
    pub tradable: bool,
    pub lot_step: Option<Decimal>,
    pub min_qty: Option<Decimal>,
    /// Price increment from `PRICE_FILTER`.
    pub tick_size: Option<Decimal>,
    pub max_leverage: Option<u32>,
}

/// Account state sampled right before validation. `rules` is `None` when the
/// exchange does not list the symbol at all.
#[derive(Debug, Clone)]
pub struct AccountSnapshot {
    pub available_balance: Decimal,
    pub rules: Option<SymbolRules>,
}

/// A signal that passed every risk check, sized for the exchange.
#[derive(Debug, Clone)]
pub struct ValidatedOrder {
    pub signal: TradeSignal,
    pub notional_usd: Decimal,
    pub quantity: Decimal,
    pub lot_step: Decimal,
    /// Set when the lot step was not published and the fallback step was used.
    pub precision_risk: bool,
}

impl ValidatedOrder {
    pub fn symbol(&self) -> &str {
        &self.signal.symbol
    }
}
