use std::{net::SocketAddr, sync::Arc};

use anyhow::Result;
use axum::{
    extract::State,
    http::{Method, Uri},
    Json, Router,
};
use chrono::DateTime;
use chrono_tz::Tz;
use serde::Serialize;

use crate::{
    bot::{console::Console, Notifier},
    cache::ResultCache,
    config,
    crawler::alpha_vantage::AlphaVantage,
    declare::{Delivery, DipRecord},
    event::dip::DipScanner,
    logging,
    util::http::{HttpClient, Transport},
};

/// 取回快取結果的路徑
const GET_LAST_PATH: &str = "/get";

/// 掃描器、快取與主要推播管道，整個程式共用一份
pub struct AppState {
    pub scanner: DipScanner,
    pub cache: Arc<ResultCache>,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub fn new(scanner: DipScanner, cache: Arc<ResultCache>, notifier: Arc<dyn Notifier>) -> Self {
        AppState {
            scanner,
            cache,
            notifier,
        }
    }

    /// 以設定檔組出正式環境使用的狀態
    pub fn from_settings(settings: &config::App) -> Result<Self> {
        let transport: Arc<dyn Transport> = Arc::new(HttpClient);
        let provider = Arc::new(AlphaVantage::new(
            settings.alpha_vantage.api_key.clone(),
            transport.clone(),
        ));
        let cache = Arc::new(ResultCache::new());
        let scanner = DipScanner::from_settings(settings, provider, cache.clone(), transport)?;

        Ok(AppState::new(scanner, cache, Arc::new(Console)))
    }
}

/// 回應本文
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct HandlerResponse {
    /// 取快取時恆為 `true`；掃描時代表這次是否真的有掃描
    pub ok: bool,
    pub dips: Vec<DipRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telegram: Option<Vec<Delivery>>,
}

/// 依 method 與 path 分派請求
///
/// `GET /get` 只讀快取；其餘請求一律觸發一次含推播的掃描。
pub async fn dispatch(state: &AppState, method: &Method, path: &str) -> HandlerResponse {
    dispatch_with(state, method, path, None).await
}

/// 同 [`dispatch`]，但掃描時以 `now` 作為目前時間
pub async fn dispatch_at(
    state: &AppState,
    method: &Method,
    path: &str,
    now: DateTime<Tz>,
) -> HandlerResponse {
    dispatch_with(state, method, path, Some(now)).await
}

async fn dispatch_with(
    state: &AppState,
    method: &Method,
    path: &str,
    now: Option<DateTime<Tz>>,
) -> HandlerResponse {
    if method == Method::GET && path == GET_LAST_PATH {
        return HandlerResponse {
            ok: true,
            dips: state.cache.get_last(),
            telegram: None,
        };
    }

    let notifier = state.notifier.as_ref();
    let result = match now {
        Some(now) => state.scanner.scan_at(now, notifier, false).await,
        None => state.scanner.scan(notifier, false).await,
    };
    let telegram: Vec<Delivery> = result
        .dips
        .iter()
        .filter_map(|dip| dip.delivery.clone())
        .collect();

    HandlerResponse {
        ok: result.succeeded,
        dips: result.dips.iter().map(DipRecord::without_delivery).collect(),
        telegram: if telegram.is_empty() {
            None
        } else {
            Some(telegram)
        },
    }
}

async fn handle(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
) -> Json<HandlerResponse> {
    logging::info_file_async(format!("{} {}", method, uri));
    Json(dispatch(&state, &method, uri.path()).await)
}

/// 所有路徑都交給 [`dispatch`]，回應一律是 200 與 JSON
pub fn router(state: Arc<AppState>) -> Router {
    Router::new().fallback(handle).with_state(state)
}

pub async fn serve(state: Arc<AppState>, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    logging::info_file_async(format!("Listening on http://{}", addr));

    axum::serve(listener, router(state)).await?;
    Ok(())
}
