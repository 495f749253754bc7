use async_trait::async_trait;
use thiserror::Error;

use crate::{declare::Quote, logging};

/// Alpha Vantage 行情 API
pub mod alpha_vantage;

/// 取得報價時可被吸收的失敗類型
///
/// 這些錯誤只代表「這一輪拿不到這檔的報價」，掃描流程會略過該標的繼續往下。
#[derive(Debug, Error)]
pub enum QuoteError {
    /// 連線失敗、逾時或非 2xx 回應
    #[error("transport error: {0}")]
    Transport(String),
    /// 回應內容無法解析
    #[error("malformed payload: {0}")]
    Parse(String),
    /// 回應缺少必要欄位
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    /// 回應缺少時間序列或序列為空
    #[error("missing series `{0}`")]
    MissingSeries(String),
    /// 來源以說明文字取代資料回應（金鑰錯誤、超過呼叫頻率等）
    #[error("rejected by provider: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// 從即時報價端點取得目前價格與前一交易日收盤價
    async fn get_realtime_quote(&self, symbol: &str) -> Result<Quote, QuoteError>;
    /// 由日內分時與日線序列推算目前價格與前一交易日收盤價
    async fn get_derived_quote(&self, symbol: &str) -> Result<Quote, QuoteError>;
}

/// 取得報價，先試即時報價，失敗再改用序列推算
///
/// 每個來源只嘗試一次，不重試。
pub async fn try_fetch_quote(
    provider: &dyn QuoteProvider,
    symbol: &str,
) -> Result<Quote, QuoteError> {
    match provider.get_realtime_quote(symbol).await {
        Ok(quote) => return Ok(quote),
        Err(why) => logging::warn_file_async(format!(
            "Realtime quote({}) unavailable, falling back to series because {}",
            symbol, why
        )),
    }

    provider.get_derived_quote(symbol).await
}

/// 取得報價，任何失敗都只記錄並回傳 `None`
pub async fn fetch_quote(provider: &dyn QuoteProvider, symbol: &str) -> Option<Quote> {
    match try_fetch_quote(provider, symbol).await {
        Ok(quote) => Some(quote),
        Err(why) => {
            logging::error_file_async(format!(
                "Failed to fetch quote({}) from all sources because {}",
                symbol, why
            ));
            None
        }
    }
}
