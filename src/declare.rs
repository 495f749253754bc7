use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display};

/// 跌幅門檻(%)，漲跌幅小於等於此值即視為下跌警示
pub const THRESHOLD_PCT: f64 = -0.5;
/// 每檔標的之間的間隔，避免撞到報價來源的呼叫頻率限制
pub const PACING_INTERVAL: Duration = Duration::from_millis(1300);
/// 即時報價請求的逾時
pub const PRIMARY_TIMEOUT: Duration = Duration::from_secs(15);
/// 日內分時序列請求的逾時
pub const INTRADAY_TIMEOUT: Duration = Duration::from_secs(20);
/// 日線序列請求的逾時
pub const DAILY_TIMEOUT: Duration = Duration::from_secs(20);
/// Telegram 推播請求的逾時
pub const TELEGRAM_TIMEOUT: Duration = Duration::from_secs(10);
/// 不在警示時段內時回傳的狀態訊息
pub const OUTSIDE_WINDOW: &str = "outside window";

/// 觀察清單中的一檔標的
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Instrument {
    pub display_name: String,
    pub symbol: String,
}

impl Instrument {
    pub fn new(display_name: &str, symbol: &str) -> Self {
        Instrument {
            display_name: display_name.to_string(),
            symbol: symbol.to_string(),
        }
    }
}

/// 報價的取得方式
#[derive(Serialize, Debug, Copy, Clone, PartialEq, Eq, Display, AsRefStr)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum QuoteSource {
    /// 即時報價端點直接回傳
    Primary,
    /// 由日內分時與日線序列推算
    Derived,
}

/// 單一標的的目前價格與前一交易日收盤價
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    pub previous_close: f64,
    pub source: QuoteSource,
}

/// 推播結果
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Delivery {
    pub delivered: bool,
    pub detail: Value,
}

impl Delivery {
    pub fn delivered(detail: Value) -> Self {
        Delivery {
            delivered: true,
            detail,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Delivery {
            delivered: false,
            detail: Value::String(reason.into()),
        }
    }
}

/// 偵測到的一筆下跌紀錄
///
/// `delivery` 只會出現在當次掃描的回應中，寫入快取前會被移除。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DipRecord {
    pub display_name: String,
    pub symbol: String,
    pub price: f64,
    pub previous_close: f64,
    pub percent_change: f64,
    pub timestamp: DateTime<FixedOffset>,
    #[serde(
        rename = "deliveryResult",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub delivery: Option<Delivery>,
}

impl DipRecord {
    /// 回傳不含推播結果的副本
    pub fn without_delivery(&self) -> DipRecord {
        DipRecord {
            delivery: None,
            ..self.clone()
        }
    }
}

/// 一次掃描的結果
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    pub dips: Vec<DipRecord>,
}

impl ScanResult {
    pub fn outside_window() -> Self {
        ScanResult {
            succeeded: false,
            status_message: Some(OUTSIDE_WINDOW.to_string()),
            dips: Vec::new(),
        }
    }

    pub fn completed(dips: Vec<DipRecord>) -> Self {
        ScanResult {
            succeeded: true,
            status_message: None,
            dips,
        }
    }
}
