pub mod execution;
pub mod message;
pub mod order;
pub mod signal;

pub use execution::{ExecutionResult, RejectReason};
pub use message::InboundMessage;
pub use order::{AccountSnapshot, OrderId, SymbolRules, ValidatedOrder};
pub use signal::{Direction, MAX_EXCHANGE_LEVERAGE, Side, SignalError, TradeSignal};
