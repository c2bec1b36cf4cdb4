//! InMemory MessageStore 実装
//!
//! ドメイン層が定義する MessageStore trait の具体的な実装。
//! HashMap をインメモリ DB として使用します。単体テストと、
//! 外部ストアなしで動かす開発モードのための実装です。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{ChatMessage, MessageStore, RoomName, StoreError};

/// インメモリ MessageStore 実装
#[derive(Default)]
pub struct InMemoryMessageStore {
    messages: Mutex<HashMap<RoomName, Vec<ChatMessage>>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 永続化済みメッセージの総数（テスト・デバッグ用）
    pub async fn total_messages(&self) -> usize {
        let messages = self.messages.lock().await;
        messages.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn insert_batch(&self, batch: Vec<ChatMessage>) -> Result<(), StoreError> {
        let mut messages = self.messages.lock().await;
        for message in batch {
            messages
                .entry(message.room_name.clone())
                .or_default()
                .push(message);
        }
        Ok(())
    }

    async fn load_recent(
        &self,
        room_name: &RoomName,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, StoreError> {
        let messages = self.messages.lock().await;
        let room_messages = messages.get(room_name).map(Vec::as_slice).unwrap_or(&[]);
        let skip = room_messages.len().saturating_sub(limit);
        Ok(room_messages[skip..].to_vec())
    }
}
