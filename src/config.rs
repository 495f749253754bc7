use std::{env, path::PathBuf};

use anyhow::{anyhow, bail, Result};
use chrono_tz::Tz;
use config::{Config as config_config, File as config_file};
use serde::{Deserialize, Serialize};

use crate::{declare::Instrument, logging};

const CONFIG_PATH: &str = "app.json";

const API_KEY: &str = "API_KEY";
const EARLY_CUTOFF_MINUTES: &str = "EARLY_CUTOFF_MINUTES";
const TG_BOT_TOKEN: &str = "TG_BOT_TOKEN";
const TG_CHAT_ID: &str = "TG_CHAT_ID";
const HTTP_PORT: &str = "HTTP_PORT";
const MARKET_TIMEZONE: &str = "MARKET_TIMEZONE";
const CURRENCY_SYMBOL: &str = "CURRENCY_SYMBOL";
const SCAN_CRON: &str = "SCAN_CRON";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct App {
    #[serde(default)]
    pub alpha_vantage: AlphaVantage,
    #[serde(default)]
    pub bot: Bot,
    #[serde(default)]
    pub market: Market,
    #[serde(default)]
    pub system: System,
    /// 觀察清單，依宣告順序掃描
    #[serde(default = "default_watchlist")]
    pub watchlist: Vec<Instrument>,
}

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct AlphaVantage {
    #[serde(default)]
    pub api_key: String,
}

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct Bot {
    #[serde(default)]
    pub telegram: Telegram,
}

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct Telegram {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub chat_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Market {
    /// 交易所所在時區（IANA 名稱）
    pub timezone: String,
    /// 價格前綴的貨幣符號
    pub currency_symbol: String,
    /// 收盤前提早停止警示的分鐘數
    pub early_cutoff_minutes: u32,
}

impl Default for Market {
    fn default() -> Self {
        Market {
            timezone: "Asia/Shanghai".to_string(),
            currency_symbol: "¥".to_string(),
            early_cutoff_minutes: 15,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct System {
    pub http_port: u16,
    /// 排程掃描的 cron 表示式（UTC，六欄），空字串表示不啟用
    pub scan_cron: String,
}

impl Default for System {
    fn default() -> Self {
        System {
            http_port: 8080,
            scan_cron: String::new(),
        }
    }
}

fn default_watchlist() -> Vec<Instrument> {
    vec![
        Instrument::new("貴州茅台", "600519.SHH"),
        Instrument::new("中國平安", "601318.SHH"),
        Instrument::new("五糧液", "000858.SHZ"),
        Instrument::new("寧德時代", "300750.SHZ"),
    ]
}

impl Default for App {
    fn default() -> Self {
        App {
            alpha_vantage: Default::default(),
            bot: Default::default(),
            market: Default::default(),
            system: Default::default(),
            watchlist: default_watchlist(),
        }
    }
}

impl App {
    /// 讀取 app.json（若存在），再以環境變數覆蓋
    pub fn get() -> Result<Self> {
        let config_path = config_path();
        if config_path.exists() {
            let config: App = config_config::builder()
                .add_source(config_file::from(config_path))
                .build()?
                .try_deserialize()?;
            return Ok(config.override_with_env());
        }

        Ok(App::default().override_with_env())
    }

    /// 將來自於 env 的設定值覆蓋掉 json 上的設定值
    fn override_with_env(self) -> Self {
        self.override_with(|key| env::var(key).ok())
    }

    fn override_with(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(api_key) = lookup(API_KEY) {
            self.alpha_vantage.api_key = api_key;
        }

        if let Some(minutes) = lookup(EARLY_CUTOFF_MINUTES) {
            match minutes.trim().parse::<u32>() {
                Ok(minutes) => self.market.early_cutoff_minutes = minutes,
                Err(why) => logging::error_file_async(format!(
                    "Ignore {}={} because: {:?}",
                    EARLY_CUTOFF_MINUTES, minutes, why
                )),
            }
        }

        if let Some(token) = lookup(TG_BOT_TOKEN) {
            self.bot.telegram.token = token;
        }

        if let Some(chat_id) = lookup(TG_CHAT_ID) {
            self.bot.telegram.chat_id = chat_id;
        }

        if let Some(port) = lookup(HTTP_PORT) {
            match port.trim().parse::<u16>() {
                Ok(port) => self.system.http_port = port,
                Err(why) => logging::error_file_async(format!(
                    "Ignore {}={} because: {:?}",
                    HTTP_PORT, port, why
                )),
            }
        }

        if let Some(timezone) = lookup(MARKET_TIMEZONE) {
            self.market.timezone = timezone;
        }

        if let Some(currency) = lookup(CURRENCY_SYMBOL) {
            self.market.currency_symbol = currency;
        }

        if let Some(cron) = lookup(SCAN_CRON) {
            self.system.scan_cron = cron;
        }

        self
    }

    /// 檢查啟動所需的設定，缺少 API_KEY 或時區無法解析時回傳錯誤
    pub fn validate(&self) -> Result<()> {
        if self.alpha_vantage.api_key.trim().is_empty() {
            bail!("{} is not set", API_KEY);
        }

        if self.watchlist.is_empty() {
            logging::warn_file_async("The watchlist is empty, scans will find nothing".to_string());
        }

        self.timezone().map(|_| ())
    }

    /// 交易所所在時區
    pub fn timezone(&self) -> Result<Tz> {
        self.market
            .timezone
            .parse::<Tz>()
            .map_err(|why| anyhow!("Invalid {} '{}': {}", MARKET_TIMEZONE, self.market.timezone, why))
    }
}

/// 回傳設定檔的路徑
fn config_path() -> PathBuf {
    PathBuf::from(CONFIG_PATH)
}
