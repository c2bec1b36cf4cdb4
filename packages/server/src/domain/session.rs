//! セッション関連の値オブジェクトとエンティティ
//!
//! - `SessionId`: 接続ごとに採番される 128bit ランダム ID
//! - `Identity`: 外部認証層から渡される認証済みユーザー情報
//! - `Session`: 1 本のライブ接続に対応するエフェメラルな状態

use serde::Serialize;
use uuid::Uuid;

use super::RoomName;

/// セッション ID（値オブジェクト）
///
/// uuid v4 から生成されるため衝突確率は無視できます。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// 新しいセッション ID を採番
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// ゲスト表示名などに使う短縮形（先頭 8 文字）
    pub fn short(&self) -> &str {
        &self.0[..8.min(self.0.len())]
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// 認証済みユーザー情報
///
/// 外部の認証層が検証済みのものを渡してくる前提で、ここでは再検証しません。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub username: String,
}

/// ライブ接続 1 本分のセッション状態
///
/// 接続時に生成され、切断または Reaper による回収で破棄されます。
/// `current_room` が Some の場合、そのルームのメンバー集合に必ず
/// この `id` が含まれます（Registry と Directory の参照整合性）。
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    /// 認証されるまでは None（ゲスト）
    pub identity: Option<Identity>,
    /// 同時に所属できるルームは最大 1 つ
    pub current_room: Option<RoomName>,
    pub joined_at: i64,
    pub last_activity_at: i64,
}

impl Session {
    /// 新しいセッションを作成（ルーム未所属・未認証）
    pub fn new(id: SessionId, now: i64) -> Self {
        Self {
            id,
            identity: None,
            current_room: None,
            joined_at: now,
            last_activity_at: now,
        }
    }

    /// ブロードキャストに使う表示名
    ///
    /// 認証済みならユーザー名、ゲストなら `guest-<sessionId 先頭8文字>`
    pub fn display_name(&self) -> String {
        match &self.identity {
            Some(identity) => identity.username.clone(),
            None => format!("guest-{}", self.id.short()),
        }
    }
}
