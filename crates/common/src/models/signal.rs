use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

/// Highest leverage any Binance futures contract advertises.
pub const MAX_EXCHANGE_LEVERAGE: u32 = 125;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// Side of the order that opens the position.
    pub fn entry_side(self) -> Side {
        match self {
            Direction::Long => Side::Buy,
            Direction::Short => Side::Sell,
        }
    }

    /// Side of the order that closes the position.
    pub fn exit_side(self) -> Side {
        self.entry_side().opposite()
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignalError {
    #[error("{0} must be positive")]
    NonPositive(&'static str),

    #[error("leverage {0}x outside 1..=125")]
    LeverageOutOfRange(u32),

    #[error("{direction} take profit {take_profit} is on the wrong side of entry {entry}")]
    TakeProfitWrongSide {
        direction: Direction,
        entry: Decimal,
        take_profit: Decimal,
    },

    #[error("{direction} stop loss {stop_loss} is on the wrong side of entry {entry}")]
    StopLossWrongSide {
        direction: Direction,
        entry: Decimal,
        stop_loss: Decimal,
    },
}

/// A trade instruction extracted from a chat message.
///
/// Only [`TradeSignal::new`] builds one, so every value in circulation satisfies the
/// price ordering for its direction. `stop_loss_price` is kept for the audit trail
/// only and is never sent to the exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TradeSignal {
    pub direction: Direction,
    pub symbol: String,
    pub entry_price: Decimal,
    pub take_profit_price: Decimal,
    pub stop_loss_price: Decimal,
    pub leverage: u32,
    pub margin_usd: Decimal,
}

impl TradeSignal {
    pub fn new(
        direction: Direction,
        symbol: impl Into<String>,
        entry_price: Decimal,
        take_profit_price: Decimal,
        stop_loss_price: Decimal,
        leverage: u32,
        margin_usd: Decimal,
    ) -> Result<Self, SignalError> {
        for (name, value) in [
            ("entry", entry_price),
            ("take profit", take_profit_price),
            ("stop loss", stop_loss_price),
            ("margin", margin_usd),
        ] {
            if value <= Decimal::ZERO {
                return Err(SignalError::NonPositive(name));
            }
        }

        if !(1..=MAX_EXCHANGE_LEVERAGE).contains(&leverage) {
            return Err(SignalError::LeverageOutOfRange(leverage));
        }

        let (tp_ok, sl_ok) = match direction {
            Direction::Long => (take_profit_price > entry_price, stop_loss_price < entry_price),
            Direction::Short => (take_profit_price < entry_price, stop_loss_price > entry_price),
        };

        if !tp_ok {
            return Err(SignalError::TakeProfitWrongSide {
                direction,
                entry: entry_price,
                take_profit: take_profit_price,
            });
        }
        if !sl_ok {
            return Err(SignalError::StopLossWrongSide {
                direction,
                entry: entry_price,
                stop_loss: stop_loss_price,
            });
        }

        Ok(Self {
            direction,
            symbol: symbol.into().to_uppercase(),
            entry_price,
            take_profit_price,
            stop_loss_price,
            leverage,
            margin_usd,
        })
    }

    /// Position size in quote currency, `margin * leverage`. `None` on overflow.
    pub fn notional_usd(&self) -> Option<Decimal> {
        self.margin_usd.checked_mul(Decimal::from(self.leverage))
    }
}

impl fmt::Display for TradeSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} entry={} tp={} sl={} (unused) {}x margin=${}",
            self.direction,
            self.symbol,
            self.entry_price,
            self.take_profit_price,
            self.stop_loss_price,
            self.leverage,
            self.margin_usd
        )
    }
}
