//! Room Directory
//!
//! ルーム名 → ライブなルームエントリのマップ。Registry と同じく
//! 同期的な状態ホルダーで、Router の単一ロック下でのみ変更されます。
//!
//! Directory 自身は「別ルームからの自動退室」を行いません。
//! leave → join の順序付けは Router の責務です（操作を明示的に
//! 保つことで個別にテスト可能にする）。
//!
//! Directory は永続化されたルームカタログを関知しません。
//! 存在しないルームへの join はアドホックなルーム作成として扱います。

use std::collections::HashMap;

use crate::domain::{ChatMessage, Room, RoomName, SessionId};

/// join の結果（参加後のメンバー数とリプレイ用履歴）
#[derive(Debug)]
pub struct JoinOutcome {
    pub member_count: usize,
    pub recent_history: Vec<ChatMessage>,
}

/// leave の結果（退室後の残メンバー数）
#[derive(Debug)]
pub struct LeaveOutcome {
    pub member_count: usize,
}

/// ライブなルームエントリのディレクトリ
#[derive(Debug)]
pub struct RoomDirectory {
    rooms: HashMap<RoomName, Room>,
    history_size: usize,
    history_replay: usize,
    room_grace_ms: i64,
}

impl RoomDirectory {
    pub fn new(history_size: usize, history_replay: usize, room_grace_ms: i64) -> Self {
        Self {
            rooms: HashMap::new(),
            history_size,
            history_replay,
            room_grace_ms,
        }
    }

    /// セッションをルームに参加させる
    ///
    /// ライブエントリがなければ作成します。既に別ルームに居る場合の
    /// 退室は呼び出し側（Router）が先に `leave` を呼ぶこと。
    pub fn join(&mut self, session_id: &SessionId, room_name: &RoomName, now: i64) -> JoinOutcome {
        let room = self
            .rooms
            .entry(room_name.clone())
            .or_insert_with(|| Room::new(room_name.clone(), now, self.history_size));
        room.insert_member(session_id.clone());
        JoinOutcome {
            member_count: room.member_count(),
            recent_history: room.recent_history(self.history_replay),
        }
    }

    /// セッションをルームから退室させる
    ///
    /// メンバーが 0 になったルームは grace period なしなら即削除、
    /// ありなら `emptied_at` を打って Reaper の prune に委ねます。
    /// 履歴はライブエントリと運命を共にします（永続化は Bridge 側）。
    pub fn leave(
        &mut self,
        session_id: &SessionId,
        room_name: &RoomName,
        now: i64,
    ) -> LeaveOutcome {
        let Some(room) = self.rooms.get_mut(room_name) else {
            return LeaveOutcome { member_count: 0 };
        };
        room.remove_member(session_id);
        let member_count = room.member_count();
        if member_count == 0 {
            if self.room_grace_ms <= 0 {
                self.rooms.remove(room_name);
                tracing::debug!("room '{}' emptied, live entry deleted", room_name);
            } else {
                room.emptied_at = Some(now);
                tracing::debug!("room '{}' emptied, grace period started", room_name);
            }
        }
        LeaveOutcome { member_count }
    }

    /// 履歴リングバッファに追加（ライブエントリがなければ no-op）
    pub fn append_history(&mut self, room_name: &RoomName, message: ChatMessage) {
        if let Some(room) = self.rooms.get_mut(room_name) {
            room.push_history(message);
        }
    }

    /// 次のメッセージ ID を採番（ライブエントリがなければ None）
    pub fn allocate_message_id(&mut self, room_name: &RoomName) -> Option<u64> {
        self.rooms.get_mut(room_name).map(Room::allocate_message_id)
    }

    /// メンバー集合のスナップショット（ライブでなければ空）
    pub fn members_of(&self, room_name: &RoomName) -> Vec<SessionId> {
        self.rooms
            .get(room_name)
            .map(Room::member_snapshot)
            .unwrap_or_default()
    }

    pub fn contains_member(&self, room_name: &RoomName, session_id: &SessionId) -> bool {
        self.rooms
            .get(room_name)
            .is_some_and(|room| room.contains_member(session_id))
    }

    pub fn member_count(&self, room_name: &RoomName) -> usize {
        self.rooms.get(room_name).map_or(0, Room::member_count)
    }

    pub fn is_live(&self, room_name: &RoomName) -> bool {
        self.rooms.contains_key(room_name)
    }

    pub fn history_len(&self, room_name: &RoomName) -> usize {
        self.rooms.get(room_name).map_or(0, Room::history_len)
    }

    /// 公開ルームの一覧（名前とメンバー数）
    pub fn list_rooms(&self) -> Vec<(RoomName, usize)> {
        let mut rooms: Vec<(RoomName, usize)> = self
            .rooms
            .values()
            .filter(|room| !room.is_private)
            .map(|room| (room.name.clone(), room.member_count()))
            .collect();
        rooms.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
        rooms
    }

    /// 空のまま放置されたルームを削除して返す（Reaper 用）
    ///
    /// Directory の自動削除があるため通常は空振りだが、grace period 中の
    /// ルームの回収と、万一リークしたエントリの防波堤を兼ねる。
    pub fn prune_empty(&mut self, now: i64) -> Vec<RoomName> {
        let grace = self.room_grace_ms;
        let expired: Vec<RoomName> = self
            .rooms
            .values()
            .filter(|room| {
                room.is_empty()
                    && room
                        .emptied_at
                        .is_none_or(|emptied_at| now - emptied_at >= grace)
            })
            .map(|room| room.name.clone())
            .collect();
        for name in &expired {
            self.rooms.remove(name);
            tracing::debug!("pruned empty room '{}'", name);
        }
        expired
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
