use chrono::{DateTime, Utc};

/// A raw chat message as delivered by the message source.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub group_id: i64,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl InboundMessage {
    pub fn new(group_id: i64, text: impl Into<String>) -> Self {
        Self {
            group_id,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}
