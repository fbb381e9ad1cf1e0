use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use common::models::{OrderId, Side, SymbolRules, TradeSignal, ValidatedOrder};
use exchange::{AccountGateway, GatewayError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::Semaphore;

pub const SOL_LONG: &str =
    "🟢 LONG SIGNAL - SOLUSDT\nEntry: 87.50000\nTP: 88.37500\nSL: 87.06250\nLeverage: 3x\nMargin: $5";

pub const ETH_SHORT: &str =
    "🔴 SHORT SIGNAL - ETHUSDT\nEntry: 3000\nTP: 2950\nSL: 3050\nLeverage: 5x\nMargin: $10";

mockall::mock! {
    pub Gateway {}

    #[async_trait]
    impl AccountGateway for Gateway {
        async fn get_balance(&self) -> Result<Decimal, GatewayError>;
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
}

pub fn rules() -> SymbolRules {
    SymbolRules {
        tradable: true,
        lot_step: Some(dec!(0.0001)),
        min_qty: Some(dec!(0.0001)),
        tick_size: Some(dec!(0.001)),
        max_leverage: Some(50),
    }
}

pub fn sol_order() -> ValidatedOrder {
    let signal = TradeSignal::new(
        common::models::Direction::Long,
        "SOLUSDT",
        dec!(87.5),
        dec!(88.375),
        dec!(87.0625),
        3,
        dec!(5),
    )
    .unwrap();
    ValidatedOrder {
        signal,
        notional_usd: dec!(15),
        quantity: dec!(0.1714),
        lot_step: dec!(0.0001),
        precision_risk: false,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Balance,
    Rules(String),
    SetLeverage {
        symbol: String,
        leverage: u32,
        isolated: bool,
    },
    Market {
        symbol: String,
        side: Side,
        quantity: Decimal,
    },
    Limit {
        symbol: String,
        side: Side,
        price: Decimal,
        quantity: Decimal,
        reduce_only: bool,
    },
}

/// In-memory venue that records every call in order.
pub struct RecordingGateway {
    pub balance: Decimal,
    pub fail_balance: Option<GatewayError>,
    pub fail_leverage: Option<GatewayError>,
    pub fail_market: Option<GatewayError>,
    pub fail_limit: Option<GatewayError>,
    /// When set, market orders wait for a permit after being recorded.
    pub entry_gate: Option<Arc<Semaphore>>,
    calls: Mutex<Vec<Call>>,
    next_id: AtomicU64,
}

impl RecordingGateway {
    pub fn new(balance: Decimal) -> Self {
        Self {
            balance,
            fail_balance: None,
            fail_leverage: None,
            fail_market: None,
            fail_limit: None,
            entry_gate: None,
            calls: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn market_calls(&self, symbol: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Market { symbol: s, .. } if s == symbol))
            .count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn order_id(&self) -> OrderId {
        OrderId::from(self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}

#[async_trait]
impl AccountGateway for RecordingGateway {
    async fn get_balance(&self) -> Result<Decimal, GatewayError> {
        self.record(Call::Balance);
        match &self.fail_balance {
            Some(e) => Err(e.clone()),
            None => Ok(self.balance),
        }
    }

    async fn get_symbol_rules(&self, symbol: &str) -> Result<Option<SymbolRules>, GatewayError> {
        self.record(Call::Rules(symbol.to_string()));
        Ok(Some(rules()))
    }

    async fn set_leverage(
        &self,
        symbol: &str,
        leverage: u32,
        isolated: bool,
    ) -> Result<(), GatewayError> {
        self.record(Call::SetLeverage {
            symbol: symbol.to_string(),
            leverage,
            isolated,
        });
        match &self.fail_leverage {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    async fn place_market_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: Decimal,
    ) -> Result<OrderId, GatewayError> {
        self.record(Call::Market {
            symbol: symbol.to_string(),
            side,
            quantity,
        });
        if let Some(gate) = &self.entry_gate {
            gate.acquire().await.unwrap().forget();
        }
        match &self.fail_market {
            Some(e) => Err(e.clone()),
            None => Ok(self.order_id()),
        }
    }

    async fn place_limit_order(
        &self,
        symbol: &str,
        side: Side,
        price: Decimal,
        quantity: Decimal,
        reduce_only: bool,
    ) -> Result<OrderId, GatewayError> {
        self.record(Call::Limit {
            symbol: symbol.to_string(),
            side,
            price,
            quantity,
            reduce_only,
        });
        match &self.fail_limit {
            Some(e) => Err(e.clone()),
            None => Ok(self.order_id()),
        }
    }
}
