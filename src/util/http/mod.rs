use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use once_cell::sync::{Lazy, OnceCell};
use reqwest::{Client, Method, RequestBuilder};
use serde_json::Value;

use crate::logging;

/// A singleton instance of the reqwest client.
static CLIENT: OnceCell<Client> = OnceCell::new();

static USER_AGENT: Lazy<String> =
    Lazy::new(|| format!("dip_watcher/{}", env!("CARGO_PKG_VERSION")));

/// 對外 HTTP 呼叫的抽象
///
/// 報價來源與 Telegram 推播都只透過這個 trait 送出請求，
/// 每次呼叫只嘗試一次，逾時由呼叫端依端點各自指定。
#[async_trait]
pub trait Transport: Send + Sync {
    /// 送出 GET 並把回應解析為 JSON
    async fn get_json(&self, url: &str, timeout: Duration) -> Result<Value>;

    /// 以 JSON 為本文送出 POST 並把回應解析為 JSON
    async fn post_json(&self, url: &str, body: &Value, timeout: Duration) -> Result<Value>;
}

/// 以 reqwest 實作的 [`Transport`]
#[derive(Default, Clone, Copy)]
pub struct HttpClient;

#[async_trait]
impl Transport for HttpClient {
    async fn get_json(&self, url: &str, timeout: Duration) -> Result<Value> {
        send(Method::GET, url, timeout, None::<fn(RequestBuilder) -> RequestBuilder>).await
    }

    async fn post_json(&self, url: &str, body: &Value, timeout: Duration) -> Result<Value> {
        send(
            Method::POST,
            url,
            timeout,
            Some(|rb: RequestBuilder| rb.json(body)),
        )
        .await
    }
}

/// Returns the reqwest client singleton instance or creates one if it doesn't exist.
fn get_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        // 已經安裝過時會回傳 Err，忽略即可
        let _ = rustls::crypto::ring::default_provider().install_default();

        Client::builder()
            // ===== 超時設置 =====
            .connect_timeout(Duration::from_secs(8))
            // ===== TCP 優化 =====
            .tcp_nodelay(true)
            .tcp_keepalive(Duration::from_secs(60))
            // ===== 連接池 =====
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(USER_AGENT.as_str())
            .build()
            .map_err(|e| anyhow!("Failed to create reqwest client: {:?}", e))
    })
}

/// Sends a single HTTP request and parses the response body as JSON.
///
/// There is no retry: a transport error, a timeout, a non-2xx status or a body
/// that is not JSON all come back as `Err` on the first attempt.
async fn send(
    method: Method,
    url: &str,
    timeout: Duration,
    body: Option<impl FnOnce(RequestBuilder) -> RequestBuilder>,
) -> Result<Value> {
    let visit_log = format!("{method}:{}", redact(url));
    let client = get_client()?;
    let mut rb = client.request(method, url).timeout(timeout);

    if let Some(body_fn) = body {
        rb = body_fn(rb);
    }

    let start = Instant::now();
    let res = rb.send().await;
    let elapsed = start.elapsed().as_millis();

    let response = match res {
        Ok(response) => response,
        Err(why) => {
            let why = why.without_url();
            logging::error_file_async(format!(
                "{} failed because {:?}. {} ms",
                visit_log, why, elapsed
            ));
            return Err(anyhow!("{} failed: {}", visit_log, why));
        }
    };

    let status = response.status();
    logging::info_file_async(format!("{} {} {} ms", visit_log, status, elapsed));

    let text = response
        .text()
        .await
        .map_err(|e| anyhow!("Error reading response body of {}: {}", visit_log, e))?;

    if !status.is_success() {
        return Err(anyhow!("{} returned HTTP {}: {}", visit_log, status, text));
    }

    serde_json::from_str(&text)
        .map_err(|e| anyhow!("Error parsing response JSON of {}: {:?}", visit_log, e))
}

/// 去掉網址中的查詢字串與 Telegram bot token，避免金鑰寫進日誌
pub(crate) fn redact(url: &str) -> String {
    let without_query = url.split('?').next().unwrap_or_default();

    match without_query.find("/bot") {
        Some(idx) => {
            let rest = &without_query[idx + 4..];
            let tail = rest.find('/').map(|i| &rest[i..]).unwrap_or_default();
            format!("{}/bot***{}", &without_query[..idx], tail)
        }
        None => without_query.to_string(),
    }
}

#[cfg(test)]
pub mod fake {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };

    use super::*;

    /// 測試用的 [`Transport`]，依網址中的關鍵字回傳預先設定的內容並記錄呼叫次數
    #[derive(Default)]
    pub struct FakeTransport {
        routes: Mutex<Vec<(String, Result<Value, String>)>>,
        calls: AtomicUsize,
        requests: Mutex<Vec<(String, Option<Value>)>>,
    }

    impl FakeTransport {
        pub fn new() -> Self {
            Default::default()
        }

        /// 網址包含 `needle` 時回傳 `body`
        pub fn respond(self, needle: &str, body: Value) -> Self {
            self.push(needle, Ok(body));
            self
        }

        /// 網址包含 `needle` 時回傳錯誤
        pub fn fail(self, needle: &str, reason: &str) -> Self {
            self.push(needle, Err(reason.to_string()));
            self
        }

        pub fn push(&self, needle: &str, outcome: Result<Value, String>) {
            self.routes
                .lock()
                .unwrap()
                .push((needle.to_string(), outcome));
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        /// 呼叫過的網址與 POST 本文
        pub fn requests(&self) -> Vec<(String, Option<Value>)> {
            self.requests.lock().unwrap().clone()
        }

        fn answer(&self, url: &str, body: Option<&Value>) -> Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests
                .lock()
                .unwrap()
                .push((url.to_string(), body.cloned()));

            let routes = self.routes.lock().unwrap();
            match routes.iter().find(|(needle, _)| url.contains(needle.as_str())) {
                Some((_, Ok(value))) => Ok(value.clone()),
                Some((_, Err(reason))) => Err(anyhow!(reason.clone())),
                None => Err(anyhow!("no route for {}", url)),
            }
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn get_json(&self, url: &str, _timeout: Duration) -> Result<Value> {
            self.answer(url, None)
        }

        async fn post_json(&self, url: &str, body: &Value, _timeout: Duration) -> Result<Value> {
            self.answer(url, Some(body))
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{fake::FakeTransport, *};

    #[test]
    fn test_redact_hides_api_key_and_bot_token() {
        assert_eq!(
            redact("https://www.alphavantage.co/query?function=GLOBAL_QUOTE&apikey=secret"),
            "https://www.alphavantage.co/query"
        );
        assert_eq!(
            redact("https://api.telegram.org/bot123:ABC/sendMessage"),
            "https://api.telegram.org/bot***/sendMessage"
        );
        assert_eq!(redact("http://localhost/get"), "http://localhost/get");
    }

    #[tokio::test]
    async fn test_fake_transport_routes_and_counts() {
        let transport = FakeTransport::new()
            .respond("GLOBAL_QUOTE", json!({"ok": 1}))
            .fail("sendMessage", "connection reset");

        let ok = transport
            .get_json("https://x/query?function=GLOBAL_QUOTE", Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(ok, json!({"ok": 1}));

        let err = transport
            .post_json("https://x/bot1/sendMessage", &json!({}), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("connection reset"));

        assert!(transport
            .get_json("https://x/unknown", Duration::from_secs(1))
            .await
            .is_err());
        assert_eq!(transport.calls(), 3);
        assert_eq!(transport.requests()[1].1, Some(json!({})));
    }

    #[tokio::test]
    #[ignore]
    async fn test_get_json_remote() {
        dotenv::dotenv().ok();
        match HttpClient
            .get_json("https://httpbin.org/json", Duration::from_secs(15))
            .await
        {
            Ok(body) => logging::debug_file_async(format!("httpbin: {}", body)),
            Err(why) => logging::debug_file_async(format!("Failed to get_json because {:?}", why)),
        }
    }
}
