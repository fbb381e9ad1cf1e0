use common::models::InboundMessage;
use teloxide::prelude::*;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::services::notifier::{Notification, Severity};

/// Sends operator notifications. Alerts go to the alert chat, everything else to the signal chat.
pub struct TelegramService {
    bot: Bot,
    chat_id: ChatId,
    alert_chat_id: ChatId,
}

impl TelegramService {
    pub fn new(bot: Bot, chat_id: i64, alert_chat_id: i64) -> Self {
        Self {
            bot,
            chat_id: ChatId(chat_id),
            alert_chat_id: ChatId(alert_chat_id),
        }
    }

    pub async fn start(self, mut rx: broadcast::Receiver<Notification>) {
        info!("Starting Telegram Notification Service");

        loop {
            match rx.recv().await {
                Ok(note) => {
                    let target = match note.severity {
                        Severity::Info => self.chat_id,
                        Severity::Alert => self.alert_chat_id,
                    };
                    // a failed send is logged, the trade outcome is already final
                    if let Err(e) = self.bot.send_message(target, note.text).await {
                        error!("Failed to send Telegram message: {}", e);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    error!("Telegram service lagged behind. Missed {} messages.", n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    info!("Telegram notification channel closed. Stopping service.");
                    break;
                }
            }
        }
    }
}

/// Long-polls the bot and forwards every text message or channel post to the pipeline.
pub struct TelegramListener {
    bot: Bot,
    tx: mpsc::Sender<InboundMessage>,
}

impl TelegramListener {
    pub fn new(bot: Bot, tx: mpsc::Sender<InboundMessage>) -> Self {
        Self { bot, tx }
    }

    /// Returns once the dispatcher stops (Ctrl-C). Dropping the sender closes the pipeline input.
    pub async fn start(self) {
        info!("Starting Telegram listener");

        let handler = dptree::entry()
            .branch(Update::filter_message().endpoint(forward_message))
            .branch(Update::filter_channel_post().endpoint(forward_message));

        Dispatcher::builder(self.bot, handler)
            .dependencies(dptree::deps![self.tx])
            .default_handler(|_| async {})
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        info!("Telegram listener stopped.");
    }
}

async fn forward_message(msg: Message, tx: mpsc::Sender<InboundMessage>) -> ResponseResult<()> {
    let Some(text) = msg.text().or(msg.caption()) else {
        debug!("Skipping non-text update in chat {}", msg.chat.id);
        return Ok(());
    };

    let inbound = InboundMessage {
        group_id: msg.chat.id.0,
        text: text.to_string(),
        timestamp: msg.date,
    };

    if tx.send(inbound).await.is_err() {
        warn!("Signal pipeline is gone, dropping message from chat {}", msg.chat.id);
    }
    Ok(())
}
