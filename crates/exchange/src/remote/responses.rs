use rust_decimal::Decimal;
use serde::Deserialize;

use common::models::SymbolRules;

/// Error body Binance returns with non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct ApiError {
    pub code: i64,
    pub msg: String,
}

#[derive(Debug, Deserialize)]
pub struct FuturesAccount {
    #[serde(rename = "availableBalance")]
    pub available_balance: Decimal,
    #[serde(rename = "totalWalletBalance")]
    pub total_wallet_balance: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct OrderResponse {
    #[serde(rename = "orderId")]
    pub order_id: u64,
    pub symbol: String,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct ExchangeInfo {
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
pub struct SymbolInfo {
    pub symbol: String,
    pub status: String,
    #[serde(default)]
    pub filters: Vec<SymbolFilter>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "filterType")]
pub enum SymbolFilter {
    #[serde(rename = "PRICE_FILTER")]
    PriceFilter {
        #[serde(rename = "tickSize")]
        tick_size: Decimal,
    },
    #[serde(rename = "LOT_SIZE")]
    LotSize {
        #[serde(rename = "stepSize")]
        step_size: Decimal,
        #[serde(rename = "minQty")]
        min_qty: Decimal,
    },
    #[serde(rename = "MARKET_LOT_SIZE")]
    MarketLotSize {
        #[serde(rename = "stepSize")]
        step_size: Decimal,
        #[serde(rename = "minQty")]
        min_qty: Decimal,
    },
    #[serde(other)]
    Other,
}

impl SymbolInfo {
    /// Both entry (market) and take-profit (limit) must be valid, so the coarser
    /// of the two lot filters wins.
    pub fn to_rules(&self, max_leverage: Option<u32>) -> SymbolRules {
        let mut lot_step: Option<Decimal> = None;
        let mut min_qty: Option<Decimal> = None;
        let mut tick_size: Option<Decimal> = None;

        for filter in &self.filters {
            let (step, min) = match filter {
                SymbolFilter::PriceFilter { tick_size: tick } => {
                    tick_size = Some(*tick).filter(|t| *t > Decimal::ZERO);
                    continue;
                }
                SymbolFilter::LotSize { step_size, min_qty } => (*step_size, *min_qty),
                SymbolFilter::MarketLotSize { step_size, min_qty } => (*step_size, *min_qty),
                SymbolFilter::Other => continue,
            };
            if step > Decimal::ZERO {
                lot_step = Some(lot_step.map_or(step, |s| s.max(step)));
            }
            if min > Decimal::ZERO {
                min_qty = Some(min_qty.map_or(min, |m| m.max(min)));
            }
        }

        SymbolRules {
            tradable: self.status == "TRADING",
            lot_step,
            min_qty,
            tick_size,
            max_leverage,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LeverageBracket {
    #[serde(rename = "initialLeverage")]
    pub initial_leverage: u32,
}

#[derive(Debug, Deserialize)]
pub struct SymbolBrackets {
    pub symbol: String,
    pub brackets: Vec<LeverageBracket>,
}

/// `/fapi/v1/leverageBracket` answers with an object or a one-element list
/// depending on the account type.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum LeverageBracketResponse {
    One(SymbolBrackets),
    Many(Vec<SymbolBrackets>),
}

impl LeverageBracketResponse {
    pub fn max_leverage(&self, symbol: &str) -> Option<u32> {
        let entry = match self {
            LeverageBracketResponse::One(b) => Some(b),
            LeverageBracketResponse::Many(list) => list.iter().find(|b| b.symbol == symbol),
        }?;
        entry.brackets.iter().map(|b| b.initial_leverage).max()
    }
}
