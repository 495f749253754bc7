use chrono::{DateTime, Datelike, TimeZone, Timelike, Weekday};

/// 警示時段的起點 09:20:00（自午夜起算的秒數）
const WINDOW_START_SECS: u32 = 9 * 3600 + 20 * 60;
/// 收盤時間 15:00:00（自午夜起算的秒數）
const MARKET_CLOSE_SECS: u32 = 15 * 3600;

/// A trait representing the weekend concept.
pub trait Weekend {
    /// Determines if a given date is a weekend.
    ///
    /// Returns `true` if the date is on a Saturday or Sunday, and `false` otherwise.
    fn is_weekend(&self) -> bool;
}

// Implement the `Weekend` trait for any zoned `chrono::DateTime`.
impl<Tz: TimeZone> Weekend for DateTime<Tz> {
    /// Treats Saturday and Sunday as weekends, judged in the datetime's own timezone.
    fn is_weekend(&self) -> bool {
        matches!(self.weekday(), Weekday::Sat | Weekday::Sun)
    }
}

/// 判斷 `now` 是否落在警示時段內
///
/// 週六、週日一律回傳 `false`。平日的時段為交易所當地時間
/// `09:20:00.000` 起至 `15:00:00.000 - early_cutoff_minutes` 止，兩端皆包含。
/// 若提前收工的分鐘數大到截止時間早於起點，該日視為沒有警示時段。
///
/// `now` 必須已轉換為交易所所在的時區。
pub fn is_alert_window<Tz: TimeZone>(now: &DateTime<Tz>, early_cutoff_minutes: u32) -> bool {
    if now.is_weekend() {
        return false;
    }

    let cutoff_secs = match MARKET_CLOSE_SECS.checked_sub(early_cutoff_minutes.saturating_mul(60)) {
        Some(secs) if secs >= WINDOW_START_SECS => secs,
        _ => return false,
    };

    let time = now.time();
    let secs = time.num_seconds_from_midnight();
    if secs < WINDOW_START_SECS {
        return false;
    }

    secs < cutoff_secs || (secs == cutoff_secs && time.nanosecond() == 0)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};
    use chrono_tz::{Asia::Shanghai, Tz};

    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32, milli: u32) -> DateTime<Tz> {
        let naive = NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_milli_opt(h, min, s, milli)
            .unwrap();
        Shanghai.from_local_datetime(&naive).single().unwrap()
    }

    #[test]
    fn test_weekend_is_always_closed() {
        // 2026-10-17 週六、2026-10-18 週日
        for day in [17, 18] {
            for hour in 0..24 {
                let now = at(2026, 10, day, hour, 30, 0, 0);
                assert!(now.is_weekend());
                assert!(!is_alert_window(&now, 15), "{now}");
                assert!(!is_alert_window(&now, 0), "{now}");
            }
        }
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        // 2026-10-19 週一，提前 15 分鐘收工 => 09:20:00 ~ 14:45:00
        let start = at(2026, 10, 19, 9, 20, 0, 0);
        let cutoff = at(2026, 10, 19, 14, 45, 0, 0);

        assert!(is_alert_window(&start, 15));
        assert!(is_alert_window(&cutoff, 15));
        assert!(is_alert_window(&at(2026, 10, 19, 11, 0, 0, 0), 15));

        assert!(!is_alert_window(&(start - Duration::milliseconds(1)), 15));
        assert!(!is_alert_window(&(cutoff + Duration::milliseconds(1)), 15));
        assert!(!is_alert_window(&at(2026, 10, 19, 14, 45, 1, 0), 15));
    }

    #[test]
    fn test_cutoff_follows_configured_minutes() {
        let friday_afternoon = at(2026, 10, 23, 14, 59, 0, 0);
        assert!(is_alert_window(&friday_afternoon, 0));
        assert!(!is_alert_window(&friday_afternoon, 15));
        assert!(is_alert_window(&at(2026, 10, 23, 15, 0, 0, 0), 0));
        assert!(!is_alert_window(&at(2026, 10, 23, 15, 0, 1, 0), 0));
    }

    #[test]
    fn test_oversized_cutoff_closes_the_day() {
        let noon = at(2026, 10, 20, 12, 0, 0, 0);
        assert!(!is_alert_window(&noon, 6 * 60));
        assert!(!is_alert_window(&noon, u32::MAX));
    }

    #[test]
    fn test_window_is_judged_in_local_time() {
        // 01:30 UTC 週一 = 09:30 上海，週日 23:00 UTC = 週一 07:00 上海
        let utc = chrono::Utc.with_ymd_and_hms(2026, 10, 19, 1, 30, 0).unwrap();
        assert!(is_alert_window(&utc.with_timezone(&Shanghai), 15));
        assert!(!is_alert_window(&utc, 15));

        let sunday_utc = chrono::Utc.with_ymd_and_hms(2026, 10, 18, 23, 0, 0).unwrap();
        assert!(sunday_utc.is_weekend());
        assert!(!sunday_utc.with_timezone(&Shanghai).is_weekend());
    }
}
