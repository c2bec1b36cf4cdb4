//! ルーム関連の値オブジェクトとエンティティ
//!
//! `Room` はライブなルームエントリ 1 つ分の状態（メンバー集合と
//! 有界の履歴リングバッファ）を保持します。永続化されたルーム定義とは
//! 別の概念で、最初の join で生成され、空になると破棄されます。

use std::collections::{HashSet, VecDeque};

use serde::Serialize;

use super::{ChatMessage, DomainError, SessionId};

/// ルーム名の最大文字数
pub const MAX_ROOM_NAME_CHARS: usize = 64;

/// ルーム名（値オブジェクト、大文字小文字を区別）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RoomName(String);

impl RoomName {
    pub fn new(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::EmptyRoomName);
        }
        if trimmed.chars().count() > MAX_ROOM_NAME_CHARS {
            return Err(DomainError::RoomNameTooLong {
                max: MAX_ROOM_NAME_CHARS,
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoomName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// ライブなルームエントリ（エンティティ）
#[derive(Debug, Clone)]
pub struct Room {
    pub name: RoomName,
    /// 現在参加中のセッション ID 集合（重複なし、順序は不問）
    members: HashSet<SessionId>,
    /// 直近のチャットメッセージ（古いものから evict される）
    history: VecDeque<ChatMessage>,
    /// 履歴リングバッファの上限
    history_size: usize,
    /// ルーム内で一意なメッセージ ID の採番カウンタ
    next_message_id: u64,
    pub created_at: i64,
    pub is_private: bool,
    pub owner_user_id: Option<i64>,
    /// メンバーが 0 になった時刻（grace period 管理用、通常は None）
    pub emptied_at: Option<i64>,
}

impl Room {
    /// 新しいライブエントリを作成
    pub fn new(name: RoomName, created_at: i64, history_size: usize) -> Self {
        Self {
            name,
            members: HashSet::new(),
            history: VecDeque::new(),
            history_size,
            next_message_id: 1,
            created_at,
            is_private: false,
            owner_user_id: None,
            emptied_at: None,
        }
    }

    /// メンバーを追加。既に参加済みなら false
    pub fn insert_member(&mut self, session_id: SessionId) -> bool {
        self.emptied_at = None;
        self.members.insert(session_id)
    }

    /// メンバーを削除。参加していなければ false
    pub fn remove_member(&mut self, session_id: &SessionId) -> bool {
        self.members.remove(session_id)
    }

    pub fn contains_member(&self, session_id: &SessionId) -> bool {
        self.members.contains(session_id)
    }

    /// メンバー集合のスナップショットを返す
    ///
    /// ブロードキャスト中の集合変化に影響されないよう、呼び出し側は
    /// このスナップショットに対して送信を行う。
    pub fn member_snapshot(&self) -> Vec<SessionId> {
        self.members.iter().cloned().collect()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// ルーム内で一意なメッセージ ID を採番
    pub fn allocate_message_id(&mut self) -> u64 {
        let id = self.next_message_id;
        self.next_message_id += 1;
        id
    }

    /// 履歴リングバッファに追加し、上限を超えたら最古のものを evict
    pub fn push_history(&mut self, message: ChatMessage) {
        if self.history_size == 0 {
            return;
        }
        if self.history.len() >= self.history_size {
            self.history.pop_front();
        }
        self.history.push_back(message);
    }

    /// 直近 `limit` 件の履歴を古い順で返す（join 時のリプレイ用）
    pub fn recent_history(&self, limit: usize) -> Vec<ChatMessage> {
        let skip = self.history.len().saturating_sub(limit);
        self.history.iter().skip(skip).cloned().collect()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}
