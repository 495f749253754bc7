use std::{sync::Arc, time::Duration};

use anyhow::Result;
use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use tokio::{sync::Mutex, time::Instant};

use crate::{
    bot::{telegram::Telegram, Notifier},
    cache::ResultCache,
    calculation, config,
    crawler::{self, QuoteProvider},
    declare::{Delivery, DipRecord, Instrument, Quote, ScanResult, PACING_INTERVAL},
    logging,
    util::{datetime, http::Transport, pacer::Pacer, text},
};

/// 掃描觀察清單，找出跌幅超過門檻的標的並發出警示
pub struct DipScanner {
    provider: Arc<dyn QuoteProvider>,
    cache: Arc<ResultCache>,
    watchlist: Vec<Instrument>,
    /// 有設定 Telegram 憑證時才會有值
    remote: Option<Arc<dyn Notifier>>,
    timezone: Tz,
    early_cutoff_minutes: u32,
    currency_symbol: String,
    pacing: Duration,
    /// 同一時間只允許一輪掃描
    running: Mutex<()>,
    clock: Clock,
}

/// 目前時間的來源
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

impl DipScanner {
    pub fn new(
        provider: Arc<dyn QuoteProvider>,
        cache: Arc<ResultCache>,
        watchlist: Vec<Instrument>,
    ) -> Self {
        DipScanner {
            provider,
            cache,
            watchlist,
            remote: None,
            timezone: chrono_tz::Asia::Shanghai,
            early_cutoff_minutes: 15,
            currency_symbol: "¥".to_string(),
            pacing: PACING_INTERVAL,
            running: Mutex::new(()),
            clock: Arc::new(Utc::now),
        }
    }

    /// 依設定檔建立掃描器，Telegram 憑證齊全時才掛上遠端推播
    pub fn from_settings(
        settings: &config::App,
        provider: Arc<dyn QuoteProvider>,
        cache: Arc<ResultCache>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let telegram = Telegram::from_settings(&settings.bot.telegram, transport);
        let mut scanner = DipScanner::new(provider, cache, settings.watchlist.clone())
            .with_timezone(settings.timezone()?)
            .with_early_cutoff(settings.market.early_cutoff_minutes)
            .with_currency(&settings.market.currency_symbol);

        if telegram.is_configured() {
            scanner = scanner.with_remote_notifier(Arc::new(telegram));
        } else {
            logging::info_file_async(
                "Telegram credentials are not configured, remote alerts are disabled".to_string(),
            );
        }

        Ok(scanner)
    }

    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn with_early_cutoff(mut self, minutes: u32) -> Self {
        self.early_cutoff_minutes = minutes;
        self
    }

    pub fn with_currency(mut self, currency_symbol: &str) -> Self {
        self.currency_symbol = currency_symbol.to_string();
        self
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_remote_notifier(mut self, remote: Arc<dyn Notifier>) -> Self {
        self.remote = Some(remote);
        self
    }

    /// 交易所時區的目前時間
    pub fn now(&self) -> DateTime<Tz> {
        (self.clock)().with_timezone(&self.timezone)
    }

    /// 以目前時間（交易所時區）執行一輪掃描
    ///
    /// 時間在取得掃描鎖之後才讀取，排隊等候的請求以輪到自己時的時間判斷時段。
    pub async fn scan(&self, notifier: &dyn Notifier, suppress_notify: bool) -> ScanResult {
        let _running = self.running.lock().await;
        self.scan_locked(self.now(), notifier, suppress_notify).await
    }

    /// 以指定的時間點執行一輪掃描
    pub async fn scan_at(
        &self,
        now: DateTime<Tz>,
        notifier: &dyn Notifier,
        suppress_notify: bool,
    ) -> ScanResult {
        let _running = self.running.lock().await;
        self.scan_locked(now, notifier, suppress_notify).await
    }

    /// 不在警示時段內時立即回傳，不會送出任何請求也不會動到快取。
    /// 呼叫端必須持有 `running`。
    async fn scan_locked(
        &self,
        now: DateTime<Tz>,
        notifier: &dyn Notifier,
        suppress_notify: bool,
    ) -> ScanResult {
        if !datetime::is_alert_window(&now, self.early_cutoff_minutes) {
            logging::info_file_async(format!("{} is outside the alert window", now));
            return ScanResult::outside_window();
        }

        let started = Instant::now();
        let mut pacer = Pacer::new(self.pacing);
        let mut dips = Vec::new();

        for instrument in &self.watchlist {
            pacer.ready().await;

            let quote = match crawler::fetch_quote(self.provider.as_ref(), &instrument.symbol).await
            {
                Some(quote) => quote,
                None => continue,
            };

            let percent_change = match calculation::percent_change(quote.price, quote.previous_close) {
                Some(pct) => pct,
                None => {
                    logging::warn_file_async(format!(
                        "Skip {} because the quote is not usable: {:?}",
                        instrument.symbol, quote
                    ));
                    continue;
                }
            };

            if !calculation::is_dip(percent_change) {
                continue;
            }

            let timestamp = now + TimeDelta::from_std(started.elapsed()).unwrap_or(TimeDelta::zero());
            let message = format_alert_message(
                instrument,
                &quote,
                percent_change,
                &timestamp,
                &self.currency_symbol,
            );
            let delivery = if suppress_notify {
                None
            } else {
                self.notify(notifier, &message).await
            };

            dips.push(DipRecord {
                display_name: instrument.display_name.clone(),
                symbol: instrument.symbol.clone(),
                price: quote.price,
                previous_close: quote.previous_close,
                percent_change,
                timestamp: timestamp.fixed_offset(),
                delivery,
            });
        }

        logging::info_file_async(format!(
            "Scanned {} instruments paced at {:?}, {} dips found",
            pacer.issued(),
            pacer.interval(),
            dips.len()
        ));

        self.cache.set_last(&dips);
        ScanResult::completed(dips)
    }

    /// 先送主要管道，再視設定送 Telegram，只回傳 Telegram 的結果
    async fn notify(&self, notifier: &dyn Notifier, message: &str) -> Option<Delivery> {
        let primary = notifier.deliver(message).await;
        if !primary.delivered {
            logging::error_file_async(format!("Primary notifier failed: {:?}", primary.detail));
        }

        match &self.remote {
            Some(remote) => Some(remote.deliver(message).await),
            None => None,
        }
    }
}

/// 組出警示訊息（Telegram HTML 格式）
pub fn format_alert_message(
    instrument: &Instrument,
    quote: &Quote,
    percent_change: f64,
    timestamp: &DateTime<Tz>,
    currency_symbol: &str,
) -> String {
    format!(
        "📉 <b>{name}</b> ({symbol}) {pct:.2}%\n現價: {currency}{price:.2}\n昨收: {currency}{previous_close:.2}\n時間: {time}",
        name = text::escape_html(&instrument.display_name),
        symbol = text::escape_html(&instrument.symbol),
        pct = percent_change,
        currency = text::escape_html(currency_symbol),
        price = quote.price,
        previous_close = quote.previous_close,
        time = timestamp.format("%Y-%m-%d %H:%M:%S %Z"),
    )
}
