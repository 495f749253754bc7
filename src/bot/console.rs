use async_trait::async_trait;
use serde_json::Value;

use crate::{bot::Notifier, declare::Delivery};

/// 把訊息印到 stdout 的推播管道，永遠視為送達
#[derive(Default, Clone, Copy)]
pub struct Console;

#[async_trait]
impl Notifier for Console {
    async fn deliver(&self, message: &str) -> Delivery {
        println!("{}", message);
        Delivery::delivered(Value::Null)
    }
}
