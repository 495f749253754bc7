use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;

use crate::{
    crawler::{
        alpha_vantage::{AlphaVantage, Notice},
        QuoteError, QuoteProvider,
    },
    declare::{Quote, QuoteSource, DAILY_TIMEOUT, INTRADAY_TIMEOUT, PRIMARY_TIMEOUT},
    util::text,
};

/// 日內分時的 K 線間隔
const INTRADAY_INTERVAL: &str = "5min";
const INTRADAY_SERIES: &str = "Time Series (5min)";
const DAILY_SERIES: &str = "Time Series (Daily)";

/// `GLOBAL_QUOTE` 回應
#[derive(Deserialize, Debug)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    global_quote: Option<GlobalQuote>,
    #[serde(flatten)]
    notice: Notice,
}

/// 即時報價快照，僅保留需要的欄位
#[derive(Deserialize, Debug, Default)]
struct GlobalQuote {
    /// 最新成交價
    #[serde(rename = "05. price")]
    price: Option<String>,
    /// 前一交易日收盤價
    #[serde(rename = "08. previous close")]
    previous_close: Option<String>,
}

/// `TIME_SERIES_INTRADAY` 回應，key 為 `yyyy-MM-dd HH:mm:ss`
#[derive(Deserialize, Debug)]
struct IntradayResponse {
    #[serde(rename = "Time Series (5min)")]
    time_series: Option<BTreeMap<String, Bar>>,
    #[serde(flatten)]
    notice: Notice,
}

/// `TIME_SERIES_DAILY` 回應，key 為 `yyyy-MM-dd`
#[derive(Deserialize, Debug)]
struct DailyResponse {
    #[serde(rename = "Time Series (Daily)")]
    time_series: Option<BTreeMap<String, Bar>>,
    #[serde(flatten)]
    notice: Notice,
}

/// 單根 K 線，只取收盤價
#[derive(Deserialize, Debug)]
struct Bar {
    #[serde(rename = "4. close")]
    close: String,
}

/// 價格必須是有限的正數
fn parse_price(s: &str) -> Result<f64, QuoteError> {
    let price = text::parse_f64(s, None).map_err(|why| QuoteError::Parse(why.to_string()))?;
    if price.is_finite() && price > 0.0 {
        Ok(price)
    } else {
        Err(QuoteError::Parse(format!("'{}' is not a usable price", s)))
    }
}

/// 取序列中最新一根 K 線的收盤價
fn latest_close(series: &BTreeMap<String, Bar>, name: &str) -> Result<f64, QuoteError> {
    let (_, bar) = series
        .iter()
        .next_back()
        .ok_or_else(|| QuoteError::MissingSeries(name.to_string()))?;
    parse_price(&bar.close)
}

/// 取前一交易日的收盤價
///
/// 日線序列的最新一筆通常是當日尚未收盤的資料，所以取倒數第二筆；
/// 序列只有一天時只能拿那一天的收盤價當參考。
fn prior_close(series: &BTreeMap<String, Bar>, name: &str) -> Result<f64, QuoteError> {
    let mut bars = series.values().rev();
    let latest = bars
        .next()
        .ok_or_else(|| QuoteError::MissingSeries(name.to_string()))?;
    parse_price(&bars.next().unwrap_or(latest).close)
}

impl AlphaVantage {
    /// 最新一根 5 分鐘 K 線的收盤價
    async fn latest_intraday_close(&self, symbol: &str) -> Result<f64, QuoteError> {
        let response: IntradayResponse = self
            .query(
                &[
                    ("function", "TIME_SERIES_INTRADAY"),
                    ("symbol", symbol),
                    ("interval", INTRADAY_INTERVAL),
                ],
                INTRADAY_TIMEOUT,
            )
            .await?;

        match response.time_series {
            Some(series) => latest_close(&series, INTRADAY_SERIES),
            None => Err(response
                .notice
                .into_error(QuoteError::MissingSeries(INTRADAY_SERIES.to_string()))),
        }
    }

    /// 前一交易日的日線收盤價
    async fn previous_daily_close(&self, symbol: &str) -> Result<f64, QuoteError> {
        let response: DailyResponse = self
            .query(
                &[("function", "TIME_SERIES_DAILY"), ("symbol", symbol)],
                DAILY_TIMEOUT,
            )
            .await?;

        match response.time_series {
            Some(series) => prior_close(&series, DAILY_SERIES),
            None => Err(response
                .notice
                .into_error(QuoteError::MissingSeries(DAILY_SERIES.to_string()))),
        }
    }
}

#[async_trait]
impl QuoteProvider for AlphaVantage {
    async fn get_realtime_quote(&self, symbol: &str) -> Result<Quote, QuoteError> {
        let response: GlobalQuoteResponse = self
            .query(
                &[("function", "GLOBAL_QUOTE"), ("symbol", symbol)],
                PRIMARY_TIMEOUT,
            )
            .await?;

        let quote = response.global_quote.unwrap_or_default();
        let (price, previous_close) = match (quote.price, quote.previous_close) {
            (Some(price), Some(previous_close)) => (price, previous_close),
            (None, _) => {
                return Err(response
                    .notice
                    .into_error(QuoteError::MissingField("05. price")))
            }
            (_, None) => {
                return Err(response
                    .notice
                    .into_error(QuoteError::MissingField("08. previous close")))
            }
        };

        Ok(Quote {
            symbol: symbol.to_string(),
            price: parse_price(&price)?,
            previous_close: parse_price(&previous_close)?,
            source: QuoteSource::Primary,
        })
    }

    async fn get_derived_quote(&self, symbol: &str) -> Result<Quote, QuoteError> {
        let price = self.latest_intraday_close(symbol).await?;
        let previous_close = self.previous_daily_close(symbol).await?;

        Ok(Quote {
            symbol: symbol.to_string(),
            price,
            previous_close,
            source: QuoteSource::Derived,
        })
    }
}
