use std::sync::Arc;

use common::config::RiskLimits;
use common::models::{AccountSnapshot, ExecutionResult, InboundMessage, RejectReason, TradeSignal};
use serde::Serialize;
use exchange::{AccountGateway, GatewayError};
use signals::{Extraction, check_margin_limit, extract_signal, validate};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::services::execution_service::ExecutionService;
use crate::services::notifier::Notifier;
use crate::services::symbol_guard::InFlightSymbols;

/// Runs each chat message through extraction, validation and execution.
///
/// Messages are handled on separate tasks. A symbol that already has an execution
/// in flight rejects new signals with `SymbolBusy`. There is no dedup: the same
/// message delivered twice trades twice.
pub struct SignalPipeline<G: AccountGateway> {
    gateway: Arc<G>,
    executor: ExecutionService<G>,
    limits: RiskLimits,
    chat_id: i64,
    in_flight: InFlightSymbols,
    notifier: Notifier,
}

impl<G: AccountGateway + 'static> SignalPipeline<G> {
    pub fn new(gateway: Arc<G>, limits: RiskLimits, chat_id: i64, notifier: Notifier) -> Self {
        Self {
            executor: ExecutionService::new(Arc::clone(&gateway)),
            gateway,
            limits,
            chat_id,
            in_flight: InFlightSymbols::new(),
            notifier,
        }
    }

    /// Consumes messages until the source closes, then waits for every in-flight
    /// execution to reach its terminal state.
    pub async fn start(self: Arc<Self>, mut rx: mpsc::Receiver<InboundMessage>) {
        info!("Starting signal pipeline for chat {}", self.chat_id);
        let mut tasks = JoinSet::new();

        while let Some(msg) = rx.recv().await {
            let pipeline = Arc::clone(&self);
            tasks.spawn(async move {
                pipeline.handle(msg).await;
            });

            while let Some(done) = tasks.try_join_next() {
                if let Err(e) = done {
                    error!("Signal task crashed: {}", e);
                }
            }
        }

        if !tasks.is_empty() {
            info!(
                "Message source closed, waiting for {} in-flight signal(s)",
                tasks.len()
            );
        }
        while let Some(done) = tasks.join_next().await {
            if let Err(e) = done {
                error!("Signal task crashed: {}", e);
            }
        }
        info!("Signal pipeline stopped.");
    }

    /// `None` when the message is ignored (other chat or not a signal).
    pub async fn handle(&self, msg: InboundMessage) -> Option<ExecutionResult> {
        if msg.group_id != self.chat_id {
            debug!("Ignoring message from chat {}", msg.group_id);
            return None;
        }

        let signal = match extract_signal(&msg.text) {
            Extraction::Signal(signal) => signal,
            Extraction::NotASignal => {
                debug!("Message is not a trading signal");
                return None;
            }
            Extraction::Malformed { symbol, reason } => {
                warn!(symbol = %symbol, "Malformed {} signal ignored: {}", symbol, reason);
                return None;
            }
        };

        let signal_id = Uuid::new_v4();
        info!(
            signal_id = %signal_id,
            symbol = %signal.symbol,
            stage = "signal_detected",
            received_at = %msg.timestamp,
            detail = %to_json(&signal),
            "Signal detected: {}",
            signal
        );

        let result = self.process(signal_id, &signal).await;
        self.report(signal_id, &signal, &result);
        Some(result)
    }

    async fn process(&self, signal_id: Uuid, signal: &TradeSignal) -> ExecutionResult {
        if let Err(reason) = check_margin_limit(signal, &self.limits) {
            return self.rejected(signal_id, signal, reason);
        }

        let Some(_guard) = self.in_flight.try_claim(&signal.symbol) else {
            return self.rejected(
                signal_id,
                signal,
                RejectReason::SymbolBusy {
                    symbol: signal.symbol.clone(),
                },
            );
        };

        let account = match self.snapshot(&signal.symbol).await {
            Ok(account) => account,
            Err(e) => {
                let reason = RejectReason::TransientError {
                    message: e.to_string(),
                };
                return self.rejected(signal_id, signal, reason);
            }
        };

        let order = match validate(signal, &account, &self.limits) {
            Ok(order) => order,
            Err(reason) => return self.rejected(signal_id, signal, reason),
        };

        info!(
            signal_id = %signal_id,
            symbol = %signal.symbol,
            stage = "validated",
            notional = %order.notional_usd,
            quantity = %order.quantity,
            lot_step = %order.lot_step,
            precision_risk = order.precision_risk,
            "Order validated"
        );
        if order.precision_risk {
            warn!(
                signal_id = %signal_id,
                symbol = %signal.symbol,
                "Lot step unknown for {}, quantity rounded with fallback step {}",
                signal.symbol, order.lot_step
            );
        }

        self.executor.execute(signal_id, &order).await
    }

    async fn snapshot(&self, symbol: &str) -> Result<AccountSnapshot, GatewayError> {
        let available_balance = self.gateway.get_balance().await?;
        let rules = self.gateway.get_symbol_rules(symbol).await?;
        Ok(AccountSnapshot {
            available_balance,
            rules,
        })
    }

    fn rejected(
        &self,
        signal_id: Uuid,
        signal: &TradeSignal,
        reason: RejectReason,
    ) -> ExecutionResult {
        info!(
            signal_id = %signal_id,
            symbol = %signal.symbol,
            stage = "rejected",
            reason = %reason,
            "Signal rejected before execution"
        );
        ExecutionResult::Rejected(reason)
    }

    /// One summary line per outcome. A partial success also raises the operator alert.
    fn report(&self, signal_id: Uuid, signal: &TradeSignal, result: &ExecutionResult) {
        let summary = format!("{} {} → {}", signal.direction, signal.symbol, result);
        let detail = to_json(result);

        match result {
            ExecutionResult::FullSuccess { .. } => {
                info!(
                    signal_id = %signal_id,
                    outcome = result.label(),
                    detail = %detail,
                    "{}",
                    summary
                );
                self.notifier.info(format!(
                    "✅ Trade executed successfully!\n{} {}\nEntry: {}, TP: {}\n\
                     Leverage: {}x, Margin: ${}\n⚠️ NO STOP LOSS - Manage risk manually",
                    signal.direction,
                    signal.symbol,
                    signal.entry_price,
                    signal.take_profit_price,
                    signal.leverage,
                    signal.margin_usd
                ));
            }
            ExecutionResult::PartialSuccess {
                entry_order_id,
                reason,
            } => {
                error!(
                    signal_id = %signal_id,
                    outcome = result.label(),
                    detail = %detail,
                    "{}",
                    summary
                );
                self.notifier.alert(format!(
                    "🚨 {} {} entry order {} is OPEN but the take profit at {} FAILED: {}\n\
                     The position has no take profit and no stop loss. Manage it manually now.",
                    signal.direction,
                    signal.symbol,
                    entry_order_id,
                    signal.take_profit_price,
                    reason
                ));
            }
            ExecutionResult::Rejected(_) => {
                warn!(
                    signal_id = %signal_id,
                    outcome = result.label(),
                    detail = %detail,
                    "{}",
                    summary
                );
            }
            ExecutionResult::Failed(_) => {
                error!(
                    signal_id = %signal_id,
                    outcome = result.label(),
                    detail = %detail,
                    "{}",
                    summary
                );
            }
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!("<unserializable: {}>", e))
}
