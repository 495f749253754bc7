use std::time::Duration;

/// 依固定間隔放行呼叫的節流器
///
/// 第一次呼叫 [`Pacer::ready`] 立即放行，之後每次放行前都會先等待 `interval`。
/// 一個 `Pacer` 只服務一輪循序的呼叫，不在多個工作之間共用。
#[derive(Debug)]
pub struct Pacer {
    interval: Duration,
    issued: usize,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Pacer {
            interval,
            issued: 0,
        }
    }

    /// 等到下一次呼叫可以送出為止
    pub async fn ready(&mut self) {
        if self.issued > 0 && !self.interval.is_zero() {
            tokio::time::sleep(self.interval).await;
        }

        self.issued += 1;
    }

    /// 目前已放行的次數
    pub fn issued(&self) -> usize {
        self.issued
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}
