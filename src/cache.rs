//! 最近一次掃描結果的快取。
//!
//! 只保存下跌紀錄本身，推播結果在寫入時就會被移除。
//! 快取由 `AppState` 持有並注入掃描器與請求處理器，程式結束前不需要清理。

use std::sync::RwLock;

use crate::{declare::DipRecord, logging};

#[derive(Default)]
pub struct ResultCache {
    last: RwLock<Vec<DipRecord>>,
}

impl ResultCache {
    pub fn new() -> Self {
        Default::default()
    }

    /// 取得最近一次掃描的下跌紀錄
    ///
    /// 鎖取得失敗時回傳空集合。
    pub fn get_last(&self) -> Vec<DipRecord> {
        match self.last.read() {
            Ok(last) => last.clone(),
            Err(why) => {
                logging::error_file_async(format!("Failed to read result cache because {:?}", why));
                Vec::new()
            }
        }
    }

    /// 以新的掃描結果整批覆蓋快取
    pub fn set_last(&self, dips: &[DipRecord]) {
        let stripped = dips.iter().map(DipRecord::without_delivery).collect();
        match self.last.write() {
            Ok(mut last) => *last = stripped,
            Err(why) => {
                logging::error_file_async(format!("Failed to write result cache because {:?}", why));
            }
        }
    }
}
