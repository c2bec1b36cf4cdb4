//! 永続ストアの trait 定義
//!
//! チャットコアから見た外部リレーショナルストアのインターフェース。
//! ライブ配信パスとは独立した非同期の書き込み先で、書き込みの成否は
//! 配信済みメッセージに影響しません（at-least-once）。

use async_trait::async_trait;
use thiserror::Error;

use super::{ChatMessage, RoomName};

/// 永続ストアへのアクセスエラー
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write message batch: {0}")]
    WriteFailed(String),

    #[error("failed to load messages: {0}")]
    ReadFailed(String),
}

/// MessageStore trait
///
/// - `insert_batch`: Durability Bridge からのバッチ書き込み（トランザクション想定）
/// - `load_recent`: コールドルーム生成時の履歴読み込み（join ごとには呼ばない）
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// メッセージをバッチで永続化
    async fn insert_batch(&self, messages: Vec<ChatMessage>) -> Result<(), StoreError>;

    /// 指定ルームの直近メッセージを古い順で読み込む
    async fn load_recent(
        &self,
        room_name: &RoomName,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, StoreError>;
}
