use async_trait::async_trait;

use crate::declare::Delivery;

/// 輸出到本機 stdout
pub mod console;
/// Telegram Bot API
pub mod telegram;

/// 警示訊息的推播管道
#[async_trait]
pub trait Notifier: Send + Sync {
    /// 推播一則訊息，失敗時回傳 `delivered == false` 的結果而不是錯誤
    async fn deliver(&self, message: &str) -> Delivery;
}
