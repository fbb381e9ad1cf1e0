use std::env;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;

pub const DEFAULT_BINANCE_BASE_URL: &str = "https://fapi.binance.com";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("environment variable {name} has invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Risk limits applied by the trade validator. Read-only after startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskLimits {
    pub max_margin_limit: Decimal,
    /// Fraction of the available balance a single position may use, in (0, 1].
    pub safety_factor: Decimal,
    /// Leverage ceiling when the exchange does not publish one for the symbol.
    pub default_max_leverage: u32,
    /// Lot step used when the exchange does not publish one for the symbol.
    pub default_lot_step: Decimal,
}

impl RiskLimits {
    pub fn new(max_margin_limit: Decimal) -> Self {
        Self {
            max_margin_limit,
            safety_factor: Decimal::new(95, 2),
            default_max_leverage: 20,
            default_lot_step: Decimal::new(1, 3),
        }
    }
}

#[derive(Clone)]
pub struct TelegramSettings {
    pub bot_token: String,
    pub chat_id: i64,
    pub alert_chat_id: i64,
}

#[derive(Clone)]
pub struct BinanceSettings {
    pub api_key: String,
    pub api_secret: String,
    pub base_url: String,
    pub recv_window_ms: u64,
}

#[derive(Clone)]
pub struct Settings {
    pub telegram: TelegramSettings,
    pub binance: BinanceSettings,
    pub limits: RiskLimits,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds settings from any key lookup. Empty values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &'static str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let bot_token = require("TELEGRAM_BOT_TOKEN")?;
        let chat_id: i64 = parse("TELEGRAM_CHAT_ID", require("TELEGRAM_CHAT_ID")?)?;
        let api_key = require("BINANCE_API_KEY")?;
        let api_secret = require("BINANCE_API_SECRET")?;
        let max_margin_limit: Decimal = parse("MAX_MARGIN_LIMIT", require("MAX_MARGIN_LIMIT")?)?;

        if max_margin_limit <= Decimal::ZERO {
            return Err(invalid("MAX_MARGIN_LIMIT", max_margin_limit, "must be positive"));
        }

        let alert_chat_id = match get("ALERT_CHAT_ID") {
            Some(raw) => parse("ALERT_CHAT_ID", raw)?,
            None => chat_id,
        };

        let mut limits = RiskLimits::new(max_margin_limit);
        if let Some(raw) = get("SAFETY_FACTOR") {
            let factor: Decimal = parse("SAFETY_FACTOR", raw)?;
            if factor <= Decimal::ZERO || factor > Decimal::ONE {
                return Err(invalid("SAFETY_FACTOR", factor, "must be in (0, 1]"));
            }
            limits.safety_factor = factor;
        }
        if let Some(raw) = get("DEFAULT_MAX_LEVERAGE") {
            let leverage: u32 = parse("DEFAULT_MAX_LEVERAGE", raw)?;
            if leverage == 0 {
                return Err(invalid("DEFAULT_MAX_LEVERAGE", leverage, "must be at least 1"));
            }
            limits.default_max_leverage = leverage;
        }
        if let Some(raw) = get("DEFAULT_LOT_STEP") {
            let step: Decimal = parse("DEFAULT_LOT_STEP", raw)?;
            if step <= Decimal::ZERO {
                return Err(invalid("DEFAULT_LOT_STEP", step, "must be positive"));
            }
            limits.default_lot_step = step;
        }

        let recv_window_ms = match get("BINANCE_RECV_WINDOW_MS") {
            Some(raw) => parse("BINANCE_RECV_WINDOW_MS", raw)?,
            None => 5_000,
        };

        Ok(Self {
            telegram: TelegramSettings {
                bot_token,
                chat_id,
                alert_chat_id,
            },
            binance: BinanceSettings {
                api_key,
                api_secret,
                base_url: get("BINANCE_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_BINANCE_BASE_URL.to_string()),
                recv_window_ms,
            },
            limits,
        })
    }
}

// Secrets never reach the logs.
impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("chat_id", &self.telegram.chat_id)
            .field("alert_chat_id", &self.telegram.alert_chat_id)
            .field("binance_base_url", &self.binance.base_url)
            .field("max_margin_limit", &self.limits.max_margin_limit)
            .field("safety_factor", &self.limits.safety_factor)
            .field("default_max_leverage", &self.limits.default_max_leverage)
            .field("default_lot_step", &self.limits.default_lot_step)
            .finish_non_exhaustive()
    }
}

fn parse<T>(name: &'static str, raw: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.parse::<T>().map_err(|e| ConfigError::Invalid {
        name,
        reason: e.to_string(),
        value: raw,
    })
}

fn invalid(name: &'static str, value: impl fmt::Display, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k: &str| map.get(k).cloned()
    }

    const REQUIRED: [(&str, &str); 5] = [
        ("TELEGRAM_BOT_TOKEN", "token"),
        ("TELEGRAM_CHAT_ID", "-100123"),
        ("BINANCE_API_KEY", "key"),
        ("BINANCE_API_SECRET", "secret"),
        ("MAX_MARGIN_LIMIT", "100"),
    ];

    #[test]
    fn loads_required_and_defaults() {
        let settings = Settings::from_lookup(lookup(&REQUIRED)).unwrap();

        assert_eq!(settings.telegram.chat_id, -100123);
        assert_eq!(settings.telegram.alert_chat_id, -100123);
        assert_eq!(settings.binance.base_url, DEFAULT_BINANCE_BASE_URL);
        assert_eq!(settings.limits.max_margin_limit, dec!(100));
        assert_eq!(settings.limits.safety_factor, dec!(0.95));
        assert_eq!(settings.limits.default_max_leverage, 20);
        assert_eq!(settings.limits.default_lot_step, dec!(0.001));
    }

    #[test]
    fn each_missing_variable_is_named() {
        for (missing, _) in REQUIRED {
            let pairs: Vec<_> = REQUIRED.iter().copied().filter(|(k, _)| *k != missing).collect();
            let err = Settings::from_lookup(lookup(&pairs)).unwrap_err();
            assert_eq!(err, ConfigError::Missing(missing));
            assert!(err.to_string().contains(missing));
        }
    }

    #[test]
    fn blank_value_counts_as_missing() {
        let mut pairs = REQUIRED.to_vec();
        pairs[2] = ("BINANCE_API_KEY", "   ");
        assert_eq!(
            Settings::from_lookup(lookup(&pairs)).unwrap_err(),
            ConfigError::Missing("BINANCE_API_KEY")
        );
    }

    #[test]
    fn rejects_bad_numbers() {
        let mut pairs = REQUIRED.to_vec();
        pairs[4] = ("MAX_MARGIN_LIMIT", "lots");
        assert!(matches!(
            Settings::from_lookup(lookup(&pairs)),
            Err(ConfigError::Invalid { name: "MAX_MARGIN_LIMIT", .. })
        ));

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SAFETY_FACTOR", "1.5"));
        assert!(matches!(
            Settings::from_lookup(lookup(&pairs)),
            Err(ConfigError::Invalid { name: "SAFETY_FACTOR", .. })
        ));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let settings = Settings::from_lookup(lookup(&REQUIRED)).unwrap();
        let printed = format!("{:?}", settings);
        assert!(!printed.contains("secret"));
        assert!(!printed.contains("token"));
    }
}
