use std::sync::Arc;

use common::models::{ExecutionResult, OrderId, RejectReason, ValidatedOrder};
use exchange::AccountGateway;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Steps of one execution. Failure states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    Idle,
    LeverageSet,
    EntryPlaced,
    Complete,
    LeverageFailed,
    EntryFailed,
    TakeProfitFailed,
}

/// Drives leverage → market entry → reduce-only take-profit for one order.
///
/// No step is retried. The stop-loss carried on the signal is never submitted.
pub struct ExecutionService<G: AccountGateway> {
    gateway: Arc<G>,
}

impl<G: AccountGateway> ExecutionService<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self { gateway }
    }

    pub async fn execute(&self, signal_id: Uuid, order: &ValidatedOrder) -> ExecutionResult {
        let signal = &order.signal;
        let symbol = order.symbol();
        let mut state = ExecutionState::Idle;

        if let Err(e) = self.gateway.set_leverage(symbol, signal.leverage, true).await {
            advance(signal_id, symbol, &mut state, ExecutionState::LeverageFailed);
            error!(
                signal_id = %signal_id,
                symbol,
                stage = "leverage_failed",
                "Failed to set {}x isolated leverage on {}: {}",
                signal.leverage, symbol, e
            );
            return ExecutionResult::Rejected(RejectReason::LeverageError {
                message: e.to_string(),
            });
        }
        advance(signal_id, symbol, &mut state, ExecutionState::LeverageSet);
        info!(
            signal_id = %signal_id,
            symbol,
            stage = "leverage_set",
            leverage = signal.leverage,
            "Leverage set to {}x isolated",
            signal.leverage
        );

        let entry_side = signal.direction.entry_side();
        let entry_order_id = match self
            .gateway
            .place_market_order(symbol, entry_side, order.quantity)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                advance(signal_id, symbol, &mut state, ExecutionState::EntryFailed);
                error!(
                    signal_id = %signal_id,
                    symbol,
                    stage = "entry_failed",
                    side = %entry_side,
                    quantity = %order.quantity,
                    "Market entry failed: {}",
                    e
                );
                warn!(
                    signal_id = %signal_id,
                    symbol,
                    "Leverage {}x stays applied on {}, no position was opened",
                    signal.leverage, symbol
                );
                return ExecutionResult::Failed(e.to_string());
            }
        };
        advance(signal_id, symbol, &mut state, ExecutionState::EntryPlaced);
        info!(
            signal_id = %signal_id,
            symbol,
            stage = "entry_placed",
            side = %entry_side,
            quantity = %order.quantity,
            entry_order_id = %entry_order_id,
            "Market entry placed"
        );

        self.place_take_profit(signal_id, order, entry_order_id, &mut state)
            .await
    }

    async fn place_take_profit(
        &self,
        signal_id: Uuid,
        order: &ValidatedOrder,
        entry_order_id: OrderId,
        state: &mut ExecutionState,
    ) -> ExecutionResult {
        let signal = &order.signal;
        let symbol = order.symbol();
        let exit_side = signal.direction.exit_side();

        let result = self
            .gateway
            .place_limit_order(symbol, exit_side, signal.take_profit_price, order.quantity, true)
            .await;

        match result {
            Ok(tp_order_id) => {
                advance(signal_id, symbol, state, ExecutionState::Complete);
                info!(
                    signal_id = %signal_id,
                    symbol,
                    stage = "tp_placed",
                    side = %exit_side,
                    price = %signal.take_profit_price,
                    tp_order_id = %tp_order_id,
                    "Take profit placed"
                );
                warn!(
                    signal_id = %signal_id,
                    symbol,
                    "NO STOP LOSS ORDER - {} is only protected by its take profit",
                    symbol
                );
                ExecutionResult::FullSuccess {
                    entry_order_id,
                    tp_order_id,
                }
            }
            Err(e) => {
                advance(signal_id, symbol, state, ExecutionState::TakeProfitFailed);
                error!(
                    signal_id = %signal_id,
                    symbol,
                    stage = "tp_failed",
                    side = %exit_side,
                    price = %signal.take_profit_price,
                    entry_order_id = %entry_order_id,
                    "Take profit failed after entry: {}",
                    e
                );
                ExecutionResult::PartialSuccess {
                    entry_order_id,
                    reason: e.to_string(),
                }
            }
        }
    }
}

fn advance(signal_id: Uuid, symbol: &str, state: &mut ExecutionState, next: ExecutionState) {
    tracing::debug!(
        signal_id = %signal_id,
        symbol,
        from = ?state,
        to = ?next,
        "Execution state change"
    );
    *state = next;
}
