use common::config::RiskLimits;
use common::models::{AccountSnapshot, RejectReason, SymbolRules, TradeSignal, ValidatedOrder};
use rust_decimal::Decimal;

/// The only check that needs no account data. Callers run it before querying the
/// exchange so an oversized signal never reaches the gateway.
pub fn check_margin_limit(signal: &TradeSignal, limits: &RiskLimits) -> Result<(), RejectReason> {
    if signal.margin_usd > limits.max_margin_limit {
        return Err(RejectReason::MarginLimitExceeded {
            margin: signal.margin_usd,
            limit: limits.max_margin_limit,
        });
    }
    Ok(())
}

/// Runs the risk checks in order and sizes the order on success.
///
/// The first failing check decides the rejection: margin ceiling, leverage bounds,
/// balance headroom, tradability, quantity sizing and minimum, take-profit tick.
pub fn validate(
    signal: &TradeSignal,
    account: &AccountSnapshot,
    limits: &RiskLimits,
) -> Result<ValidatedOrder, RejectReason> {
    check_margin_limit(signal, limits)?;

    let rules = account.rules.as_ref();

    let max_leverage = rules
        .and_then(|r| r.max_leverage)
        .unwrap_or(limits.default_max_leverage);
    if signal.leverage > max_leverage {
        return Err(RejectReason::LeverageOutOfBounds {
            leverage: signal.leverage,
            max: max_leverage,
        });
    }

    let notional_usd = signal.notional_usd().ok_or_else(|| out_of_range(signal))?;
    // a balance too large to scale has headroom for anything
    let allowed = account
        .available_balance
        .checked_mul(limits.safety_factor)
        .unwrap_or(Decimal::MAX);
    if notional_usd > allowed {
        return Err(RejectReason::InsufficientBalance {
            notional: notional_usd,
            allowed,
        });
    }

    let Some(rules) = rules.filter(|r| r.tradable) else {
        return Err(RejectReason::SymbolNotTradable {
            symbol: signal.symbol.clone(),
        });
    };

    let (lot_step, precision_risk) = match rules.lot_step {
        Some(step) if step > Decimal::ZERO => (step, false),
        _ => (limits.default_lot_step, true),
    };

    let quantity = notional_usd
        .checked_div(signal.entry_price)
        .and_then(|raw| round_down_to_step(raw, lot_step))
        .ok_or_else(|| out_of_range(signal))?;
    let minimum = rules.min_qty.unwrap_or(lot_step).max(lot_step);
    if quantity < minimum {
        return Err(RejectReason::QuantityBelowMinimum { quantity, minimum });
    }

    check_take_profit_tick(signal, rules)?;

    Ok(ValidatedOrder {
        signal: signal.clone(),
        notional_usd,
        quantity,
        lot_step,
        precision_risk,
    })
}

/// Rounds toward zero so the placed size never exceeds the requested notional.
/// `None` when `value / step` does not fit a `Decimal`.
pub fn round_down_to_step(value: Decimal, step: Decimal) -> Option<Decimal> {
    let steps = value.checked_div(step)?.floor();
    Some((steps * step).normalize())
}

/// The take profit is sent at the signal's exact price, so it has to sit on the
/// exchange's price grid. An unpublished tick size skips the check.
fn check_take_profit_tick(signal: &TradeSignal, rules: &SymbolRules) -> Result<(), RejectReason> {
    let Some(tick_size) = rules.tick_size.filter(|t| *t > Decimal::ZERO) else {
        return Ok(());
    };
    let price = signal.take_profit_price;
    match price.checked_rem(tick_size) {
        Some(rem) if rem.is_zero() => Ok(()),
        _ => Err(RejectReason::TakeProfitOffTick { price, tick_size }),
    }
}

fn out_of_range(signal: &TradeSignal) -> RejectReason {
    RejectReason::QuantityOutOfRange {
        symbol: signal.symbol.clone(),
        entry_price: signal.entry_price,
    }
}
