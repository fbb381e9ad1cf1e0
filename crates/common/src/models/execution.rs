use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use super::order::OrderId;

/// Why a signal ended without capital being committed.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum RejectReason {
    #[error("MarginLimitExceeded: margin ${margin} above limit ${limit}")]
    MarginLimitExceeded { margin: Decimal, limit: Decimal },

    #[error("LeverageOutOfBounds: {leverage}x above symbol maximum {max}x")]
    LeverageOutOfBounds { leverage: u32, max: u32 },

    #[error("InsufficientBalance: notional ${notional} above allowed ${allowed}")]
    InsufficientBalance { notional: Decimal, allowed: Decimal },

    #[error("SymbolNotTradable: {symbol}")]
    SymbolNotTradable { symbol: String },

    #[error("QuantityBelowMinimum: {quantity} below {minimum}")]
    QuantityBelowMinimum { quantity: Decimal, minimum: Decimal },

    #[error("QuantityOutOfRange: sizing {symbol} overflows at entry {entry_price}")]
    QuantityOutOfRange { symbol: String, entry_price: Decimal },

    #[error("TakeProfitOffTick: {price} is not a multiple of tick size {tick_size}")]
    TakeProfitOffTick { price: Decimal, tick_size: Decimal },

    #[error("TransientError: {message}")]
    TransientError { message: String },

    #[error("SymbolBusy: {symbol} already has an execution in flight")]
    SymbolBusy { symbol: String },

    #[error("LeverageError: {message}")]
    LeverageError { message: String },
}

/// Terminal outcome of one validated order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum ExecutionResult {
    FullSuccess {
        entry_order_id: OrderId,
        tp_order_id: OrderId,
    },
    /// Entry is filled but the take-profit leg was not placed.
    PartialSuccess {
        entry_order_id: OrderId,
        reason: String,
    },
    Rejected(RejectReason),
    Failed(String),
}

impl ExecutionResult {
    pub fn label(&self) -> &'static str {
        match self {
            ExecutionResult::FullSuccess { .. } => "FullSuccess",
            ExecutionResult::PartialSuccess { .. } => "PartialSuccess",
            ExecutionResult::Rejected(_) => "Rejected",
            ExecutionResult::Failed(_) => "Failed",
        }
    }

    /// True when a position may be open on the exchange.
    pub fn opened_position(&self) -> bool {
        matches!(
            self,
            ExecutionResult::FullSuccess { .. } | ExecutionResult::PartialSuccess { .. }
        )
    }
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionResult::FullSuccess {
                entry_order_id,
                tp_order_id,
            } => write!(f, "FullSuccess(entry={}, tp={})", entry_order_id, tp_order_id),
            ExecutionResult::PartialSuccess {
                entry_order_id,
                reason,
            } => write!(
                f,
                "PartialSuccess(entry={}, TakeProfitError: {})",
                entry_order_id, reason
            ),
            ExecutionResult::Rejected(reason) => write!(f, "Rejected({})", reason),
            ExecutionResult::Failed(reason) => write!(f, "Failed(EntryError: {})", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn outcomes_serialize_with_tag_and_detail() {
        let busy = ExecutionResult::Rejected(RejectReason::SymbolBusy {
            symbol: "SOLUSDT".to_string(),
        });
        assert_eq!(
            serde_json::to_value(&busy).unwrap(),
            json!({
                "outcome": "rejected",
                "detail": {"check": "symbol_busy", "symbol": "SOLUSDT"}
            })
        );

        let full = ExecutionResult::FullSuccess {
            entry_order_id: OrderId::from(11),
            tp_order_id: OrderId::from(12),
        };
        assert_eq!(
            serde_json::to_value(&full).unwrap(),
            json!({
                "outcome": "full_success",
                "detail": {"entry_order_id": "11", "tp_order_id": "12"}
            })
        );

        let failed = ExecutionResult::Failed("timeout".to_string());
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            json!({"outcome": "failed", "detail": "timeout"})
        );
    }

    #[test]
    fn summary_names_the_failed_check() {
        let result = ExecutionResult::Rejected(RejectReason::MarginLimitExceeded {
            margin: dec!(5),
            limit: dec!(1),
        });
        assert_eq!(
            result.to_string(),
            "Rejected(MarginLimitExceeded: margin $5 above limit $1)"
        );
        assert!(!result.opened_position());
    }
}
