//! Rate Limiter
//!
//! セッションごとの固定ウィンドウカウンタ。ウィンドウ長 W とキャップ C は
//! 全セッション共通の設定値ですが、カウントはセッション間で独立です。
//! グローバルなスロットリングはこのコンポーネントの責務外。

use std::collections::HashMap;

use crate::domain::SessionId;

/// 1 セッション分のカウントウィンドウ
#[derive(Debug, Clone, Copy)]
struct RateWindow {
    window_start: i64,
    count: u32,
}

/// セッション単位のメッセージレートリミッタ
#[derive(Debug)]
pub struct RateLimiter {
    windows: HashMap<SessionId, RateWindow>,
    window_ms: i64,
    cap: u32,
}

impl RateLimiter {
    pub fn new(window_ms: i64, cap: u32) -> Self {
        Self {
            windows: HashMap::new(),
            window_ms,
            cap,
        }
    }

    /// 送信 1 回分の予算を消費する
    ///
    /// ウィンドウ境界を過ぎていたらカウントをリセットしてから判定します。
    /// 拒否された試行はカウントしない（将来の予算を食わない）。
    pub fn try_consume(&mut self, session_id: &SessionId, now: i64) -> bool {
        let window = self
            .windows
            .entry(session_id.clone())
            .or_insert(RateWindow {
                window_start: now,
                count: 0,
            });

        if now - window.window_start >= self.window_ms {
            window.window_start = now;
            window.count = 0;
        }

        if window.count >= self.cap {
            return false;
        }
        window.count += 1;
        true
    }

    /// セッションの追跡エントリを破棄（切断時、メモリを有界に保つ）
    pub fn cleanup(&mut self, session_id: &SessionId) {
        self.windows.remove(session_id);
    }

    pub fn tracked_sessions(&self) -> usize {
        self.windows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_up_to_cap_within_window() {
        // テスト項目: cap=3 のとき連続 3 回は許可、4 回目は拒否される
        // given (前提条件):
        let mut limiter = RateLimiter::new(60_000, 3);
        let session_id = SessionId::generate();

        // when (操作):
        let results: Vec<bool> = (0..4)
            .map(|i| limiter.try_consume(&session_id, 1000 + i))
            .collect();

        // then (期待する結果):
        assert_eq!(results, vec![true, true, true, false]);
    }

    #[test]
    fn test_window_reset_allows_sending_again() {
        // テスト項目: ウィンドウ経過後は再び送信できる
        // given (前提条件): cap=3, window=60 秒で予算を使い切る
        let mut limiter = RateLimiter::new(60_000, 3);
        let session_id = SessionId::generate();
        for _ in 0..3 {
            assert!(limiter.try_consume(&session_id, 1000));
        }
        assert!(!limiter.try_consume(&session_id, 1000));

        // when (操作): ウィンドウ境界を越えた時刻で試行
        let allowed = limiter.try_consume(&session_id, 1000 + 60_000);

        // then (期待する結果):
        assert!(allowed);
    }

    #[test]
    fn test_rejected_attempts_do_not_consume_budget() {
        // テスト項目: 拒否された試行が将来の予算を消費しない
        // given (前提条件): cap=1
        let mut limiter = RateLimiter::new(60_000, 1);
        let session_id = SessionId::generate();
        assert!(limiter.try_consume(&session_id, 0));

        // when (操作): ウィンドウ内で何度も拒否された後、次ウィンドウで試行
        for i in 1..10 {
            assert!(!limiter.try_consume(&session_id, i));
        }
        let allowed = limiter.try_consume(&session_id, 60_000);

        // then (期待する結果): 次ウィンドウの 1 回目は許可される
        assert!(allowed);
    }

    #[test]
    fn test_sessions_are_counted_independently() {
        // テスト項目: セッション間でカウントが独立している
        // given (前提条件): cap=1
        let mut limiter = RateLimiter::new(60_000, 1);
        let alice = SessionId::generate();
        let bob = SessionId::generate();
        assert!(limiter.try_consume(&alice, 0));

        // when (操作): alice が上限に達していても bob は送信できる
        let bob_allowed = limiter.try_consume(&bob, 0);
        let alice_allowed = limiter.try_consume(&alice, 0);

        // then (期待する結果):
        assert!(bob_allowed);
        assert!(!alice_allowed);
    }

    #[test]
    fn test_cleanup_removes_tracking_entry() {
        // テスト項目: cleanup で追跡エントリが破棄される
        // given (前提条件):
        let mut limiter = RateLimiter::new(60_000, 3);
        let session_id = SessionId::generate();
        limiter.try_consume(&session_id, 0);
        assert_eq!(limiter.tracked_sessions(), 1);

        // when (操作):
        limiter.cleanup(&session_id);

        // then (期待する結果):
        assert_eq!(limiter.tracked_sessions(), 0);
    }
}
