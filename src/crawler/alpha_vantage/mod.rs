//! # Alpha Vantage 行情採集模組
//!
//! 此模組透過 Alpha Vantage 的 REST API 取得個股報價。
//!
//! ## 使用的端點
//!
//! - `GLOBAL_QUOTE`：即時報價快照，含最新價與前一交易日收盤價。
//! - `TIME_SERIES_INTRADAY`：5 分鐘 K 線，取最後一根的收盤價作為目前價格。
//! - `TIME_SERIES_DAILY`：日 K 線，取前一交易日的收盤價。
//!
//! ## 站點資訊
//!
//! - 來源域名：`www.alphavantage.co`
//! - 存取方式：HTTP GET，API Key 以 `apikey` 查詢參數帶入
//! - 免費方案每分鐘只允許少量呼叫，呼叫端需自行控制節奏。

use std::{sync::Arc, time::Duration};

use serde::{de::DeserializeOwned, Deserialize};

use crate::{crawler::QuoteError, util::http::Transport};

/// 即時報價與序列推算子模組
pub mod price;

/// Alpha Vantage 行情 API 主機域名
const HOST: &str = "www.alphavantage.co";

/// Alpha Vantage 行情採集器
///
/// 此結構體作為 `QuoteProvider` 的實作載體，所有請求都透過注入的 [`Transport`] 送出。
pub struct AlphaVantage {
    api_key: String,
    transport: Arc<dyn Transport>,
}

/// API 以說明文字取代資料時會出現的欄位
#[derive(Deserialize, Debug, Default)]
struct Notice {
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

impl Notice {
    /// 有說明文字時轉成 `Rejected`，否則回傳 `fallback`
    fn into_error(self, fallback: QuoteError) -> QuoteError {
        match self.error_message.or(self.note).or(self.information) {
            Some(msg) => QuoteError::Rejected(msg),
            None => fallback,
        }
    }
}

impl AlphaVantage {
    pub fn new(api_key: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        AlphaVantage {
            api_key: api_key.into(),
            transport,
        }
    }

    fn build_url(&self, params: &[(&str, &str)]) -> Result<String, QuoteError> {
        let mut all_params = params.to_vec();
        all_params.push(("apikey", self.api_key.as_str()));

        reqwest::Url::parse_with_params(&format!("https://{HOST}/query"), &all_params)
            .map(|url| url.to_string())
            .map_err(|why| QuoteError::Parse(format!("Failed to build URL: {}", why)))
    }

    /// 送出一次查詢並把回應轉成指定的型別
    async fn query<T: DeserializeOwned>(
        &self,
        params: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<T, QuoteError> {
        let url = self.build_url(params)?;
        let value = self
            .transport
            .get_json(&url, timeout)
            .await
            .map_err(|why| QuoteError::Transport(format!("{:#}", why)))?;

        serde_json::from_value(value).map_err(|why| QuoteError::Parse(why.to_string()))
    }
}
