//! Connection Registry
//!
//! ライブなセッション集合を保持するインメモリ状態ホルダー。
//! 同期的な操作のみを持ち、Router が保持する単一ロックの内側で
//! Directory・RateLimiter と一緒に変更されます（single-writer）。
//!
//! 未知の ID に対する操作は一貫して `Option` / no-op で返します。
//! イベント発火とハンドラ実行の間にセッションが消える競合
//! （TOCTOU）は常態なので、呼び出し側は取得し直して null チェック
//! する前提です。

use std::collections::HashMap;

use crate::domain::{Identity, Session, SessionId};

/// ライブセッションのインメモリレジストリ
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    sessions: HashMap<SessionId, Session>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
        }
    }

    /// 新しいセッションを採番して登録し、ID を返す
    pub fn register(&mut self, now: i64) -> SessionId {
        let session_id = SessionId::generate();
        let session = Session::new(session_id.clone(), now);
        self.sessions.insert(session_id.clone(), session);
        session_id
    }

    /// 認証済みユーザー情報を紐付ける
    ///
    /// セッションが既に消えていた場合は黙って no-op（切断との競合は
    /// 呼び出し側に伝播させない）。
    pub fn attach_identity(&mut self, session_id: &SessionId, identity: Identity) {
        if let Some(session) = self.sessions.get_mut(session_id) {
            session.identity = Some(identity);
        }
    }

    /// 最終アクティビティ時刻を更新（受信フレームごとに呼ぶ）
    pub fn touch(&mut self, session_id: &SessionId, now: i64) {
        if let Some(session) = self.sessions.get_mut(session_id) {
            session.last_activity_at = now;
        }
    }

    /// セッションの現在ルームを設定
    pub fn set_current_room(
        &mut self,
        session_id: &SessionId,
        room: Option<crate::domain::RoomName>,
    ) {
        if let Some(session) = self.sessions.get_mut(session_id) {
            session.current_room = room;
        }
    }

    pub fn get(&self, session_id: &SessionId) -> Option<&Session> {
        self.sessions.get(session_id)
    }

    /// セッションを切り離して返す（冪等：既に消えていれば None）
    pub fn remove(&mut self, session_id: &SessionId) -> Option<Session> {
        self.sessions.remove(session_id)
    }

    /// アイドルタイムアウトを超えたセッション ID を列挙（Reaper 用）
    pub fn idle_sessions(&self, now: i64, idle_timeout_ms: i64) -> Vec<SessionId> {
        self.sessions
            .values()
            .filter(|s| now - s.last_activity_at > idle_timeout_ms)
            .map(|s| s.id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
