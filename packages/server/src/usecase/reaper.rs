//! Idle/Resource Reaper
//!
//! タイマー起点で状態を変更することが許される唯一のコンポーネント。
//! 一定間隔で `ChatRouter::sweep_idle` を呼び、アイドルセッションの
//! 回収と空ルームの掃除を Router の通常経路に委ねます。

use std::sync::Arc;
use std::time::Duration;

use super::ChatRouter;

/// アイドルセッション回収の定期タスク
pub struct IdleReaper {
    router: Arc<ChatRouter>,
    interval_ms: u64,
}

impl IdleReaper {
    pub fn new(router: Arc<ChatRouter>, interval_ms: u64) -> Self {
        Self {
            router,
            interval_ms,
        }
    }

    /// 掃除ループを回す（サーバーと同寿命の spawn タスクとして動かす）
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(Duration::from_millis(self.interval_ms));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // interval の初回 tick は即時発火するので読み捨てる
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let reaped = self.router.sweep_idle().await;
            if reaped > 0 {
                tracing::info!("reaper evicted {} idle session(s)", reaped);
            }
        }
    }
}
