use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::{
    bot::Notifier,
    config,
    declare::{Delivery, TELEGRAM_TIMEOUT},
    logging,
    util::http::Transport,
};

const MISSING_CREDENTIALS: &str = "Missing Telegram credentials (TG_BOT_TOKEN/TG_CHAT_ID)";

/// 透過 Telegram Bot API 推播警示
pub struct Telegram {
    token: Option<String>,
    chat_id: Option<String>,
    transport: Arc<dyn Transport>,
}

impl Telegram {
    pub fn new(
        token: Option<String>,
        chat_id: Option<String>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            token: token.filter(|t| !t.trim().is_empty()),
            chat_id: chat_id.filter(|c| !c.trim().is_empty()),
            transport,
        }
    }

    pub fn from_settings(settings: &config::Telegram, transport: Arc<dyn Transport>) -> Self {
        Self::new(
            Some(settings.token.clone()),
            Some(settings.chat_id.clone()),
            transport,
        )
    }

    /// token 與 chat id 都有設定才會真的送出
    pub fn is_configured(&self) -> bool {
        self.token.is_some() && self.chat_id.is_some()
    }

    fn send_message_url(token: &str) -> String {
        format!("https://api.telegram.org/bot{}/sendMessage", token)
    }
}

#[derive(Serialize)]
pub struct SendMessageRequest<'a> {
    pub chat_id: &'a str,
    pub text: &'a str,
    pub parse_mode: &'a str,
}

impl<'a> SendMessageRequest<'a> {
    pub fn new(chat_id: &'a str, text: &'a str) -> SendMessageRequest<'a> {
        SendMessageRequest {
            chat_id,
            text,
            parse_mode: "HTML",
        }
    }
}

#[async_trait]
impl Notifier for Telegram {
    async fn deliver(&self, message: &str) -> Delivery {
        let (token, chat_id) = match (&self.token, &self.chat_id) {
            (Some(token), Some(chat_id)) => (token, chat_id),
            _ => return Delivery::failed(MISSING_CREDENTIALS),
        };

        let payload = match serde_json::to_value(SendMessageRequest::new(chat_id, message)) {
            Ok(payload) => payload,
            Err(why) => return Delivery::failed(format!("Failed to encode message: {}", why)),
        };

        match self
            .transport
            .post_json(&Self::send_message_url(token), &payload, TELEGRAM_TIMEOUT)
            .await
        {
            Ok(response) => Delivery::delivered(response),
            Err(why) => {
                logging::error_file_async(format!("Failed to send_message because: {:?}", why));
                Delivery::failed(format!("{:#}", why))
            }
        }
    }
}
