//! Durability Bridge
//!
//! ライブ配信パスと永続ストアの間の非同期境界。`enqueue` は O(1) の
//! チャンネル送信のみで、`chat.send` の処理を一切ブロックしません。
//! バックグラウンドの `FlushWorker` が溜まったメッセージをバッチで
//! ストアに書き込みます（at-least-once）。
//!
//! 書き込み失敗時は同じバッチを先頭に積み直して次回のフラッシュで
//! 再試行し、規定回数を超えたらデータロスとしてログに残した上で
//! 破棄します。配信自体は既に完了しているため、永続化の遅延や失敗は
//! ユーザーには見えません。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::domain::{ChatMessage, MessageStore};

/// ライブパス側のハンドル。メッセージを書き込みキューに積む。
#[derive(Clone)]
pub struct DurabilityBridge {
    tx: mpsc::UnboundedSender<ChatMessage>,
}

impl DurabilityBridge {
    /// ブリッジと、ワーカーに渡す受信側のペアを作成
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ChatMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// メッセージを永続化キューに積む（ノンブロッキング）
    pub fn enqueue(&self, message: ChatMessage) {
        // ワーカーが落ちている場合のみ失敗する
        if self.tx.send(message).is_err() {
            tracing::error!("durability worker is gone, dropping message");
        }
    }
}

/// 書き込みキューを払い出すバックグラウンドワーカー
pub struct FlushWorker {
    rx: mpsc::UnboundedReceiver<ChatMessage>,
    store: Arc<dyn MessageStore>,
    pending: Vec<ChatMessage>,
    /// 現在先頭に積まれているバッチの失敗回数
    attempts: u32,
    batch_size: usize,
    max_retries: u32,
}

impl FlushWorker {
    pub fn new(
        rx: mpsc::UnboundedReceiver<ChatMessage>,
        store: Arc<dyn MessageStore>,
        batch_size: usize,
        max_retries: u32,
    ) -> Self {
        Self {
            rx,
            store,
            pending: Vec::new(),
            attempts: 0,
            batch_size,
            max_retries,
        }
    }

    /// キューに届いている分を pending バッファへ移す
    fn drain_queue(&mut self) {
        while let Ok(message) = self.rx.try_recv() {
            self.pending.push(message);
        }
    }

    /// 1 回分のフラッシュを実行
    ///
    /// テストから直接呼べるよう、タイマーから切り離した 1 ステップに
    /// なっています。失敗したバッチは pending の先頭へ戻します。
    pub async fn flush_once(&mut self) {
        self.drain_queue();
        if self.pending.is_empty() {
            return;
        }

        let batch = std::mem::take(&mut self.pending);
        match self.store.insert_batch(batch.clone()).await {
            Ok(()) => {
                tracing::debug!("flushed {} chat messages to store", batch.len());
                self.attempts = 0;
            }
            Err(e) => {
                self.attempts += 1;
                if self.attempts > self.max_retries {
                    tracing::error!(
                        "dropping batch of {} chat messages after {} failed flushes: {}",
                        batch.len(),
                        self.attempts,
                        e
                    );
                    self.attempts = 0;
                } else {
                    tracing::warn!(
                        "flush attempt {} failed, re-queueing {} messages: {}",
                        self.attempts,
                        batch.len(),
                        e
                    );
                    // 失敗したバッチを先頭に戻す（後続到着分より前）
                    let mut requeued = batch;
                    requeued.append(&mut self.pending);
                    self.pending = requeued;
                }
            }
        }
    }

    /// フラッシュループを回す
    ///
    /// `flush_interval_ms` ごと、または pending がバッチサイズに達した
    /// 時点でフラッシュします。送信側が全て drop されたら残りを
    /// 書き切って終了します。
    pub async fn run(mut self, flush_interval_ms: u64) {
        let mut ticker = tokio::time::interval(Duration::from_millis(flush_interval_ms));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.flush_once().await;
                }
                received = self.rx.recv() => {
                    match received {
                        Some(message) => {
                            self.pending.push(message);
                            if self.pending.len() >= self.batch_size {
                                self.flush_once().await;
                            }
                        }
                        None => {
                            self.flush_once().await;
                            tracing::info!("durability bridge closed, flush worker exiting");
                            break;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MessageBody, MockMessageStore, RoomName, StoreError};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn test_message(id: u64) -> ChatMessage {
        ChatMessage {
            id,
            room_name: RoomName::new("lobby").unwrap(),
            author_user_id: None,
            author_display_name: "alice".to_string(),
            body: MessageBody::new(&format!("message {id}"), 500).unwrap(),
            created_at: id as i64,
        }
    }

    #[tokio::test]
    async fn test_flush_once_writes_enqueued_messages_as_batch() {
        // テスト項目: enqueue されたメッセージが 1 バッチで書き込まれる
        // given (前提条件):
        let mut store = MockMessageStore::new();
        store
            .expect_insert_batch()
            .withf(|batch| batch.len() == 2)
            .times(1)
            .returning(|_| Ok(()));
        let (bridge, rx) = DurabilityBridge::new();
        let mut worker = FlushWorker::new(rx, Arc::new(store), 64, 5);

        // when (操作):
        bridge.enqueue(test_message(1));
        bridge.enqueue(test_message(2));
        worker.flush_once().await;

        // then (期待する結果): mock の times(1) が検証する
        assert!(worker.pending.is_empty());
    }

    #[tokio::test]
    async fn test_flush_once_with_empty_queue_does_not_touch_store() {
        // テスト項目: 書くものがなければストアに触らない
        // given (前提条件): insert_batch の期待なし（呼ばれたら失敗）
        let store = MockMessageStore::new();
        let (_bridge, rx) = DurabilityBridge::new();
        let mut worker = FlushWorker::new(rx, Arc::new(store), 64, 5);

        // when (操作):
        worker.flush_once().await;

        // then (期待する結果): panic しない
    }

    #[tokio::test]
    async fn test_failed_batch_is_requeued_and_retried() {
        // テスト項目: 失敗したバッチが先頭に積み直され、次回成功する
        // given (前提条件): 1 回目は失敗、2 回目は成功するストア
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        let mut store = MockMessageStore::new();
        store.expect_insert_batch().times(2).returning(move |batch| {
            assert_eq!(batch.len(), 1);
            if calls_clone.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(StoreError::WriteFailed("connection reset".to_string()))
            } else {
                Ok(())
            }
        });
        let (bridge, rx) = DurabilityBridge::new();
        let mut worker = FlushWorker::new(rx, Arc::new(store), 64, 5);
        bridge.enqueue(test_message(1));

        // when (操作):
        worker.flush_once().await;
        let pending_after_failure = worker.pending.len();
        worker.flush_once().await;

        // then (期待する結果):
        assert_eq!(pending_after_failure, 1);
        assert!(worker.pending.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_batch_is_dropped_after_retries_are_exhausted() {
        // テスト項目: 規定回数を超えて失敗したバッチが破棄される
        // given (前提条件): 常に失敗するストア、max_retries=2
        let mut store = MockMessageStore::new();
        store
            .expect_insert_batch()
            .times(3)
            .returning(|_| Err(StoreError::WriteFailed("disk full".to_string())));
        let (bridge, rx) = DurabilityBridge::new();
        let mut worker = FlushWorker::new(rx, Arc::new(store), 64, 2);
        bridge.enqueue(test_message(1));

        // when (操作): 3 回目（attempts > max_retries）で破棄される
        worker.flush_once().await;
        worker.flush_once().await;
        worker.flush_once().await;

        // then (期待する結果): バッチは消え、以後ストアは呼ばれない
        assert!(worker.pending.is_empty());
        worker.flush_once().await;
    }

    #[tokio::test]
    async fn test_requeued_batch_stays_ahead_of_new_arrivals() {
        // テスト項目: 積み直したバッチが後続到着分より前に並ぶ
        // given (前提条件): 1 回目は失敗するストア
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        let mut store = MockMessageStore::new();
        store.expect_insert_batch().times(2).returning(move |batch| {
            if calls_clone.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(StoreError::WriteFailed("timeout".to_string()))
            } else {
                // 2 回目のバッチは古いメッセージが先頭
                let ids: Vec<u64> = batch.iter().map(|m| m.id).collect();
                assert_eq!(ids, vec![1, 2]);
                Ok(())
            }
        });
        let (bridge, rx) = DurabilityBridge::new();
        let mut worker = FlushWorker::new(rx, Arc::new(store), 64, 5);

        // when (操作): 失敗後に新しいメッセージが到着してからフラッシュ
        bridge.enqueue(test_message(1));
        worker.flush_once().await;
        bridge.enqueue(test_message(2));
        worker.flush_once().await;

        // then (期待する結果): mock 内の assert が順序を検証する
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
