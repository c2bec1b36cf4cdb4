//! メッセージ送信（通知）の trait 定義
//!
//! ドメイン層が必要とする「接続中クライアントへの送信」のインターフェース。
//! 具体的な実装（WebSocket）は Infrastructure 層が提供します（依存性の逆転）。

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use super::SessionId;

/// クライアントへの送信チャンネル
///
/// UI 層が WebSocket ごとに生成し、MessagePusher に登録します。
/// クライアント 1 本につき 1 チャンネルなので、ここに書いた順序が
/// そのままそのクライアントへの配信順序になります。
pub type PusherChannel = mpsc::UnboundedSender<String>;

/// メッセージ送信時のエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MessagePushError {
    #[error("session '{0}' not found")]
    SessionNotFound(String),

    #[error("failed to push message: {0}")]
    PushFailed(String),
}

/// MessagePusher trait
///
/// Router はこの trait に依存し、WebSocket の存在を知りません。
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// セッションの送信チャンネルを登録
    async fn register_client(&self, session_id: SessionId, sender: PusherChannel);

    /// セッションの送信チャンネルを破棄（切断時）
    async fn unregister_client(&self, session_id: &SessionId);

    /// 特定のセッションにメッセージを送信
    async fn push_to(&self, session_id: &SessionId, content: &str) -> Result<(), MessagePushError>;

    /// 複数セッションへのブロードキャスト
    ///
    /// 一部のターゲットが既に消えていても失敗にしない（部分失敗を許容）。
    async fn broadcast(&self, targets: Vec<SessionId>, content: &str);
}
