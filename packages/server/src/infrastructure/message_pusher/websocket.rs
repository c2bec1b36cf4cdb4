//! WebSocket を使った MessagePusher 実装
//!
//! ## 責務
//!
//! - セッションごとの WebSocket `UnboundedSender` を管理
//! - セッションへのメッセージ送信（push_to, broadcast）
//!
//! ## 設計ノート
//!
//! WebSocket の生成は UI 層（`ui/handler/websocket.rs`）で行われます。
//! この実装は生成された `UnboundedSender` を受け取り、送信に使用します。
//! sender は切断時に `unregister_client` で必ず破棄され、他の場所と
//! 共有されません（セッションがトランスポートハンドルを専有する）。
//!
//! ブロードキャスト中に相手が消えていても失敗にしません。死んだ接続
//! 1 本が配信全体を巻き込まないことが Broadcast Engine の契約です。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{MessagePushError, MessagePusher, PusherChannel, SessionId};

/// WebSocket を使った MessagePusher 実装
pub struct WebSocketMessagePusher {
    /// 接続中セッションの WebSocket sender
    ///
    /// Key: SessionId
    /// Value: PusherChannel
    clients: Mutex<HashMap<SessionId, PusherChannel>>,
}

impl WebSocketMessagePusher {
    pub fn new() -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for WebSocketMessagePusher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn register_client(&self, session_id: SessionId, sender: PusherChannel) {
        let mut clients = self.clients.lock().await;
        clients.insert(session_id.clone(), sender);
        tracing::debug!("session '{}' registered to MessagePusher", session_id);
    }

    async fn unregister_client(&self, session_id: &SessionId) {
        let mut clients = self.clients.lock().await;
        clients.remove(session_id);
        tracing::debug!("session '{}' unregistered from MessagePusher", session_id);
    }

    async fn push_to(&self, session_id: &SessionId, content: &str) -> Result<(), MessagePushError> {
        let clients = self.clients.lock().await;

        if let Some(sender) = clients.get(session_id) {
            sender
                .send(content.to_string())
                .map_err(|e| MessagePushError::PushFailed(e.to_string()))?;
            tracing::debug!("pushed message to session '{}'", session_id);
            Ok(())
        } else {
            Err(MessagePushError::SessionNotFound(
                session_id.as_str().to_string(),
            ))
        }
    }

    async fn broadcast(&self, targets: Vec<SessionId>, content: &str) {
        let clients = self.clients.lock().await;

        for target in targets {
            match clients.get(&target) {
                Some(sender) => {
                    // ブロードキャストでは一部の送信失敗を許容
                    if let Err(e) = sender.send(content.to_string()) {
                        tracing::debug!("failed to push message to session '{}': {}", target, e);
                    }
                }
                None => {
                    tracing::debug!("session '{}' not found during broadcast, skipping", target);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    async fn register(pusher: &WebSocketMessagePusher) -> (SessionId, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session_id = SessionId::generate();
        pusher.register_client(session_id.clone(), tx).await;
        (session_id, rx)
    }

    #[tokio::test]
    async fn test_push_to_success() {
        // テスト項目: 特定のセッションにメッセージを送信できる
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let (session_id, mut rx) = register(&pusher).await;

        // when (操作):
        let result = pusher.push_to(&session_id, "Hello").await;

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(rx.recv().await, Some("Hello".to_string()));
    }

    #[tokio::test]
    async fn test_push_to_unknown_session_returns_error() {
        // テスト項目: 存在しないセッションへの送信はエラーを返す
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let gone = SessionId::generate();

        // when (操作):
        let result = pusher.push_to(&gone, "Hello").await;

        // then (期待する結果):
        assert!(matches!(
            result,
            Err(MessagePushError::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_targets() {
        // テスト項目: 複数のセッションにメッセージをブロードキャストできる
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let (alice, mut rx_alice) = register(&pusher).await;
        let (bob, mut rx_bob) = register(&pusher).await;

        // when (操作):
        pusher.broadcast(vec![alice, bob], "Broadcast message").await;

        // then (期待する結果):
        assert_eq!(rx_alice.recv().await, Some("Broadcast message".to_string()));
        assert_eq!(rx_bob.recv().await, Some("Broadcast message".to_string()));
    }

    #[tokio::test]
    async fn test_broadcast_tolerates_dead_and_unknown_targets() {
        // テスト項目: 死んだ接続や未知のセッションが混ざっても配信が完走する
        // given (前提条件): bob は receiver を drop 済み、carol は未登録
        let pusher = WebSocketMessagePusher::new();
        let (alice, mut rx_alice) = register(&pusher).await;
        let (bob, rx_bob) = register(&pusher).await;
        drop(rx_bob);
        let carol = SessionId::generate();

        // when (操作): panic も Err もなく完走する
        pusher
            .broadcast(vec![alice.clone(), bob, carol], "still delivered")
            .await;

        // then (期待する結果): 生きている alice には届いている
        assert_eq!(rx_alice.recv().await, Some("still delivered".to_string()));
    }

    #[tokio::test]
    async fn test_unregister_releases_sender() {
        // テスト項目: unregister 後は push_to が SessionNotFound になる
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let (session_id, _rx) = register(&pusher).await;

        // when (操作):
        pusher.unregister_client(&session_id).await;
        let result = pusher.push_to(&session_id, "late").await;

        // then (期待する結果):
        assert!(matches!(
            result,
            Err(MessagePushError::SessionNotFound(_))
        ));
    }
}
