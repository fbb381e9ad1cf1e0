use async_trait::async_trait;
use common::models::{OrderId, Side, SymbolRules};
use rust_decimal::Decimal;

use crate::error::GatewayError;

/// Account operations the execution pipeline needs from a futures venue.
///
/// Implementations may retry the read-only calls (`get_balance`, `get_symbol_rules`)
/// on transient failures. Leverage and order calls are attempted exactly once.
#[async_trait]
pub trait AccountGateway: Send + Sync {
    /// Quote-currency balance available for new positions.
    async fn get_balance(&self) -> Result<Decimal, GatewayError>;

    /// `Ok(None)` when the venue does not list the symbol.
    async fn get_symbol_rules(&self, symbol: &str) -> Result<Option<SymbolRules>, GatewayError>;

    async fn set_leverage(
        &self,
        symbol: &str,
        leverage: u32,
        isolated: bool,
    ) -> Result<(), GatewayError>;

    async fn place_market_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: Decimal,
    ) -> Result<OrderId, GatewayError>;

    async fn place_limit_order(
        &self,
        symbol: &str,
        side: Side,
        price: Decimal,
        quantity: Decimal,
        reduce_only: bool,
    ) -> Result<OrderId, GatewayError>;
}
