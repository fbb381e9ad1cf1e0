use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use common::config::BinanceSettings;
use common::models::{OrderId, Side, SymbolRules};
use hmac::{Hmac, Mac};
use reqwest::{Client, Method, Response};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use sha2::Sha256;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::GatewayError;
use crate::remote::responses::{
    ApiError, ExchangeInfo, FuturesAccount, LeverageBracketResponse, OrderResponse,
};
use crate::traits::AccountGateway;

type HmacSha256 = Hmac<Sha256>;

/// Attempts for idempotent reads. Writes are never retried.
const READ_ATTEMPTS: u32 = 2;
const READ_RETRY_DELAY: Duration = Duration::from_millis(250);

/// "No need to change margin type."
const MARGIN_TYPE_UNCHANGED: i64 = -4046;

/// Binance USDⓈ-M futures REST client.
#[derive(Clone)]
pub struct BinanceClient {
    client: Client,
    base_url: String,
    api_key: String,
    secret_key: String,
    recv_window_ms: u64,
}

impl BinanceClient {
    pub fn new(settings: &BinanceSettings) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .user_agent("signal_trader/0.1.0")
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            secret_key: settings.api_secret.clone(),
            recv_window_ms: settings.recv_window_ms,
        })
    }

    fn sign(&self, query: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret_key.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(query.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn timestamp() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default()
    }

    fn encode(params: &[(&str, String)]) -> String {
        params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&")
    }

    async fn signed<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        mut params: Vec<(&str, String)>,
    ) -> Result<T, GatewayError> {
        params.push(("recvWindow", self.recv_window_ms.to_string()));
        params.push(("timestamp", Self::timestamp().to_string()));

        let query = Self::encode(&params);
        let signature = self.sign(&query);
        let url = format!("{}{}?{}&signature={}", self.base_url, path, query, signature);

        let resp = self
            .client
            .request(method, &url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await?;

        Self::decode(resp).await
    }

    async fn public<T: DeserializeOwned>(&self, path: &str) -> Result<T, GatewayError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self.client.get(&url).send().await?;
        Self::decode(resp).await
    }

    async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, GatewayError> {
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(Self::error_from_body(status.as_u16(), body));
        }

        Ok(serde_json::from_str::<T>(&body)?)
    }

    fn error_from_body(status: u16, body: String) -> GatewayError {
        match serde_json::from_str::<ApiError>(&body) {
            Ok(api) if status < 500 => GatewayError::Exchange {
                code: api.code,
                msg: api.msg,
            },
            _ => GatewayError::Http { status, body },
        }
    }

    async fn with_read_retry<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, GatewayError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < READ_ATTEMPTS => {
                    warn!(
                        "{} failed ({}), retrying (attempt {}/{})",
                        what, e, attempt, READ_ATTEMPTS
                    );
                    attempt += 1;
                    sleep(READ_RETRY_DELAY).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn max_leverage(&self, symbol: &str) -> Option<u32> {
        let brackets = self
            .with_read_retry("leverage bracket lookup", || {
                self.signed::<LeverageBracketResponse>(
                    Method::GET,
                    "/fapi/v1/leverageBracket",
                    vec![("symbol", symbol.to_string())],
                )
            })
            .await;

        bracket_outcome(symbol, brackets)
    }

    async fn set_margin_type(&self, symbol: &str, isolated: bool) -> Result<(), GatewayError> {
        let margin_type = if isolated { "ISOLATED" } else { "CROSSED" };
        let result = self
            .signed::<serde_json::Value>(
                Method::POST,
                "/fapi/v1/marginType",
                vec![
                    ("symbol", symbol.to_string()),
                    ("marginType", margin_type.to_string()),
                ],
            )
            .await;

        margin_type_outcome(result)?;
        info!("Margin type {} in effect for {}", margin_type, symbol);
        Ok(())
    }

    async fn post_order(&self, params: Vec<(&str, String)>) -> Result<OrderId, GatewayError> {
        let order = self
            .signed::<OrderResponse>(Method::POST, "/fapi/v1/order", params)
            .await?;
        debug!(
            "Order accepted: id={} symbol={} status={}",
            order.order_id, order.symbol, order.status
        );
        Ok(OrderId::from(order.order_id))
    }
}

#[async_trait]
impl AccountGateway for BinanceClient {
    async fn get_balance(&self) -> Result<Decimal, GatewayError> {
        let account = self
            .with_read_retry("balance query", || {
                self.signed::<FuturesAccount>(Method::GET, "/fapi/v2/account", Vec::new())
            })
            .await?;

        debug!(
            "Wallet balance {} USDT, available {} USDT",
            account.total_wallet_balance, account.available_balance
        );
        Ok(account.available_balance)
    }

    async fn get_symbol_rules(&self, symbol: &str) -> Result<Option<SymbolRules>, GatewayError> {
        let info = self
            .with_read_retry("exchange info", || {
                self.public::<ExchangeInfo>("/fapi/v1/exchangeInfo")
            })
            .await?;

        let Some(symbol_info) = info.symbols.iter().find(|s| s.symbol == symbol) else {
            return Ok(None);
        };

        let max_leverage = self.max_leverage(symbol).await;
        Ok(Some(symbol_info.to_rules(max_leverage)))
    }

    async fn set_leverage(
        &self,
        symbol: &str,
        leverage: u32,
        isolated: bool,
    ) -> Result<(), GatewayError> {
        self.set_margin_type(symbol, isolated).await?;

        self.signed::<serde_json::Value>(
            Method::POST,
            "/fapi/v1/leverage",
            vec![
                ("symbol", symbol.to_string()),
                ("leverage", leverage.to_string()),
            ],
        )
        .await?;

        info!("Set leverage to {}x for {}", leverage, symbol);
        Ok(())
    }

    async fn place_market_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: Decimal,
    ) -> Result<OrderId, GatewayError> {
        info!("Placing market order: {} {} {}", side, quantity, symbol);
        self.post_order(vec![
            ("symbol", symbol.to_string()),
            ("side", side.to_string()),
            ("type", "MARKET".to_string()),
            ("quantity", quantity.normalize().to_string()),
        ])
        .await
    }

    async fn place_limit_order(
        &self,
        symbol: &str,
        side: Side,
        price: Decimal,
        quantity: Decimal,
        reduce_only: bool,
    ) -> Result<OrderId, GatewayError> {
        info!(
            "Placing limit order: {} {} {} @ {} reduce_only={}",
            side, quantity, symbol, price, reduce_only
        );
        self.post_order(vec![
            ("symbol", symbol.to_string()),
            ("side", side.to_string()),
            ("type", "LIMIT".to_string()),
            ("timeInForce", "GTC".to_string()),
            ("price", price.normalize().to_string()),
            ("quantity", quantity.normalize().to_string()),
            ("reduceOnly", reduce_only.to_string()),
        ])
        .await
    }
}

/// A margin-type change that was already in effect counts as success.
fn margin_type_outcome(
    result: Result<serde_json::Value, GatewayError>,
) -> Result<(), GatewayError> {
    match result {
        Ok(_) => Ok(()),
        Err(GatewayError::Exchange { code, .. }) if code == MARGIN_TYPE_UNCHANGED => {
            debug!("Margin type unchanged ({})", MARGIN_TYPE_UNCHANGED);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Brackets are optional. A failed lookup leaves the leverage ceiling to the configured default.
fn bracket_outcome(
    symbol: &str,
    result: Result<LeverageBracketResponse, GatewayError>,
) -> Option<u32> {
    match result {
        Ok(resp) => resp.max_leverage(symbol),
        Err(e) => {
            warn!("Leverage brackets unavailable for {}: {}", symbol, e);
            None
        }
    }
}
