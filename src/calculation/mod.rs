use crate::declare::THRESHOLD_PCT;

/// 計算 `current` 相對於 `reference` 的漲跌幅(%)
///
/// 任一值不是有限數或 `reference` 為零時回傳 `None`，呼叫端應略過該標的。
/// 結果不做四捨五入，兩位小數只在組訊息時處理。
pub fn percent_change(current: f64, reference: f64) -> Option<f64> {
    if !current.is_finite() || !reference.is_finite() || reference == 0.0 {
        return None;
    }

    // 先乘後除，讓 99.5 / 100 這類邊界值剛好落在 -0.5
    Some((current - reference) * 100.0 / reference)
}

/// 漲跌幅小於等於門檻即為下跌警示
pub fn is_dip(percent_change: f64) -> bool {
    percent_change <= THRESHOLD_PCT
}
