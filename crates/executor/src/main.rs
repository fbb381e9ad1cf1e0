use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use dotenvy::dotenv;
use teloxide::Bot;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use common::config::{DEFAULT_BINANCE_BASE_URL, Settings};
use common::logger;
use common::models::InboundMessage;
use exchange::{AccountGateway, BinanceClient};

use crate::services::notifier::Notifier;
use crate::services::pipeline_service::SignalPipeline;
use crate::services::telegram_service::{TelegramListener, TelegramService};

mod services;
#[cfg(test)]
mod test_support;

const INBOUND_CAPACITY: usize = 256;
const NOTIFY_CAPACITY: usize = 64;
const NOTIFY_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let _log_guard = logger::setup_logger(logger::LOG_DIR);
    debug!("System starting up...");

    let settings = Settings::from_env().context("invalid configuration")?;
    info!("Loaded configuration: {:?}", settings);
    if settings.binance.base_url.trim_end_matches('/') == DEFAULT_BINANCE_BASE_URL {
        warn!("Trading on Binance MAINNET with real funds");
    }
    warn!("Stop losses are parsed but NEVER placed. Every position is managed manually.");

    let gateway = Arc::new(
        BinanceClient::new(&settings.binance).context("failed to build Binance client")?,
    );
    let balance = gateway
        .get_balance()
        .await
        .context("startup balance check failed, verify API credentials and connectivity")?;
    info!("Available futures balance: {} USDT", balance);

    let bot = Bot::new(&settings.telegram.bot_token);
    let notifier = Notifier::new(NOTIFY_CAPACITY);

    let telegram_svc = TelegramService::new(
        bot.clone(),
        settings.telegram.chat_id,
        settings.telegram.alert_chat_id,
    );
    let notifications = tokio::spawn(telegram_svc.start(notifier.subscribe()));

    let (inbound_tx, inbound_rx) = mpsc::channel::<InboundMessage>(INBOUND_CAPACITY);
    let pipeline = Arc::new(SignalPipeline::new(
        gateway,
        settings.limits.clone(),
        settings.telegram.chat_id,
        notifier.clone(),
    ));
    let pipeline_task = tokio::spawn(pipeline.start(inbound_rx));

    info!(
        "Listening for signals in chat {} (max margin {} USDT)",
        settings.telegram.chat_id, settings.limits.max_margin_limit
    );
    TelegramListener::new(bot, inbound_tx).start().await;

    info!("Shutting down, waiting for in-flight executions...");
    if let Err(e) = pipeline_task.await {
        error!("Signal pipeline crashed: {}", e);
    }

    // The pipeline owned the other sender clone; dropping ours closes the channel.
    drop(notifier);
    if tokio::time::timeout(NOTIFY_FLUSH_TIMEOUT, notifications).await.is_err() {
        warn!("Timed out flushing Telegram notifications");
    }

    info!("Shutdown complete.");
    Ok(())
}
