//! Message Router
//!
//! 受信エンベロープのデコードとディスパッチを行う、チャットコアの
//! 唯一の書き込み経路。Registry / Directory / RateLimiter は 1 つの
//! `Mutex<CoreState>` に合成されており、1 フレーム分の状態遷移は
//! ロックを保持したまま完結します。このため Registry と Directory が
//! 食い違った状態を観測されることはありません。
//!
//! ロック保持中に await する送信は行いません。状態遷移を確定して
//! ロックを手放してから、スナップショット済みのターゲットへ
//! ブロードキャストします（遅い接続が状態変更を塞がない）。

use std::sync::Arc;

use kairanban_shared::time::Clock;

use crate::{
    config::ChatConfig,
    domain::{ChatMessage, Identity, MessageBody, MessagePusher, PusherChannel, RoomName, SessionId},
    infrastructure::{
        ConnectionRegistry, DurabilityBridge, RateLimiter, RoomDirectory,
        dto::websocket::{Inbound, Outbound},
    },
    usecase::FrameError,
};

/// Router の単一ロック下に置かれる共有状態
struct CoreState {
    registry: ConnectionRegistry,
    directory: RoomDirectory,
    limiter: RateLimiter,
}

/// チャットコアの dispatch / 状態遷移の中核
pub struct ChatRouter {
    state: tokio::sync::Mutex<CoreState>,
    pusher: Arc<dyn MessagePusher>,
    bridge: DurabilityBridge,
    clock: Arc<dyn Clock>,
    config: ChatConfig,
}

impl ChatRouter {
    pub fn new(
        config: ChatConfig,
        pusher: Arc<dyn MessagePusher>,
        bridge: DurabilityBridge,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let state = CoreState {
            registry: ConnectionRegistry::new(),
            directory: RoomDirectory::new(
                config.history_size,
                config.history_replay,
                config.room_grace_ms,
            ),
            limiter: RateLimiter::new(config.rate_window_ms, config.rate_cap),
        };
        Self {
            state: tokio::sync::Mutex::new(state),
            pusher,
            bridge,
            clock,
            config,
        }
    }

    /// 新しい接続を登録してセッション ID を返す
    pub async fn connect(&self, sender: PusherChannel) -> SessionId {
        let now = self.clock.now_millis();
        let session_id = {
            let mut state = self.state.lock().await;
            state.registry.register(now)
        };
        self.pusher
            .register_client(session_id.clone(), sender)
            .await;
        tracing::info!("session '{}' connected", session_id);
        session_id
    }

    /// 外部認証層から渡された identity をセッションに紐付ける
    ///
    /// セッションが既に切断されていても何も起きない。
    pub async fn attach_identity(&self, session_id: &SessionId, identity: Identity) {
        let mut state = self.state.lock().await;
        state.registry.attach_identity(session_id, identity);
    }

    /// 受信フレームを 1 件処理する
    ///
    /// パース失敗・バリデーション失敗はすべて発生元セッションへの
    /// `error` エンベロープに変換され、ここから先へは伝播しません。
    pub async fn handle_frame(&self, session_id: &SessionId, raw: &str) {
        let now = self.clock.now_millis();
        {
            // 不正なフレームであっても活動時刻は更新する
            let mut state = self.state.lock().await;
            state.registry.touch(session_id, now);
        }

        let frame = match serde_json::from_str::<Inbound>(raw) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::debug!("session '{}' sent malformed frame: {}", session_id, e);
                self.send_error(session_id, &FrameError::Malformed).await;
                return;
            }
        };

        let result = match frame {
            Inbound::ChatSend { text } => self.handle_chat_send(session_id, &text, now).await,
            Inbound::RoomJoin { room_name } => {
                self.handle_room_join(session_id, &room_name, now).await
            }
            Inbound::RoomLeave {} => self.handle_room_leave(session_id, now).await,
            Inbound::PresencePing {} => self.handle_presence_ping(session_id, now).await,
        };

        if let Err(error) = result {
            if error == FrameError::InvariantViolation {
                // 共有状態をこれ以上壊さないよう、そのセッションだけ落とす
                tracing::error!(
                    "registry/directory disagreement for session '{}', forcing disconnect",
                    session_id
                );
                self.handle_disconnect(session_id).await;
            } else {
                tracing::debug!("session '{}' frame rejected: {}", session_id, error);
            }
            self.send_error(session_id, &error).await;
        }
    }

    async fn handle_chat_send(
        &self,
        session_id: &SessionId,
        text: &str,
        now: i64,
    ) -> Result<(), FrameError> {
        let (message, targets) = {
            let mut state = self.state.lock().await;
            // イベント発火とハンドラ実行の間に切断されている場合がある
            let Some(session) = state.registry.get(session_id) else {
                return Ok(());
            };
            let Some(room_name) = session.current_room.clone() else {
                return Err(FrameError::NotInRoom);
            };
            let author_user_id = session.identity.as_ref().map(|i| i.user_id);
            let author_display_name = session.display_name();

            if !state.directory.contains_member(&room_name, session_id) {
                return Err(FrameError::InvariantViolation);
            }
            if !state.limiter.try_consume(session_id, now) {
                return Err(FrameError::RateLimited);
            }

            let body = MessageBody::new(text, self.config.max_message_chars)?;
            let id = state
                .directory
                .allocate_message_id(&room_name)
                .ok_or(FrameError::InvariantViolation)?;
            let message = ChatMessage {
                id,
                room_name: room_name.clone(),
                author_user_id,
                author_display_name,
                body,
                created_at: now,
            };
            state.directory.append_history(&room_name, message.clone());
            let targets = state.directory.members_of(&room_name);
            (message, targets)
        };

        self.bridge.enqueue(message.clone());
        let json = Outbound::ChatMessage((&message).into()).to_json();
        // 送信者本人を含むルーム全員へ配信
        self.pusher.broadcast(targets, &json).await;
        Ok(())
    }

    async fn handle_room_join(
        &self,
        session_id: &SessionId,
        raw_room_name: &str,
        now: i64,
    ) -> Result<(), FrameError> {
        let room_name = RoomName::new(raw_room_name)?;

        struct JoinPlan {
            display_name: String,
            joined_member_count: usize,
            history: Vec<ChatMessage>,
            new_room_others: Vec<SessionId>,
            previous: Option<(RoomName, usize, Vec<SessionId>)>,
        }

        let plan = {
            let mut state = self.state.lock().await;
            let Some(session) = state.registry.get(session_id) else {
                return Ok(());
            };
            let display_name = session.display_name();
            let previous_room = session.current_room.clone();

            // 別ルーム所属中なら、退室と入室を 1 つの論理操作として
            // 同一ロック内で適用する（0 または 2 ルーム所属の状態を
            // 外部に観測させない）
            let previous = match previous_room {
                Some(prev) if prev != room_name => {
                    let outcome = state.directory.leave(session_id, &prev, now);
                    let remaining = state.directory.members_of(&prev);
                    Some((prev, outcome.member_count, remaining))
                }
                _ => None,
            };

            let outcome = state.directory.join(session_id, &room_name, now);
            state
                .registry
                .set_current_room(session_id, Some(room_name.clone()));

            let new_room_others: Vec<SessionId> = state
                .directory
                .members_of(&room_name)
                .into_iter()
                .filter(|id| id != session_id)
                .collect();

            JoinPlan {
                display_name,
                joined_member_count: outcome.member_count,
                history: outcome.recent_history,
                new_room_others,
                previous,
            }
        };

        // 旧ルームの残メンバーへ退室通知
        if let Some((prev_room, member_count, remaining)) = plan.previous {
            let left = Outbound::UserLeft {
                room_name: prev_room.as_str().to_string(),
                username: plan.display_name.clone(),
                member_count,
            }
            .to_json();
            self.pusher.broadcast(remaining, &left).await;
        }

        // 入室者本人へメンバーシップ情報と履歴リプレイ
        let joined = Outbound::RoomJoined {
            room_name: room_name.as_str().to_string(),
            member_count: plan.joined_member_count,
            history: plan.history.iter().map(Into::into).collect(),
        }
        .to_json();
        if let Err(e) = self.pusher.push_to(session_id, &joined).await {
            tracing::debug!("failed to send room.joined to '{}': {}", session_id, e);
        }

        // 新ルームの既存メンバーへ入室通知（本人は除外）
        let notice = Outbound::UserJoined {
            room_name: room_name.as_str().to_string(),
            username: plan.display_name,
            member_count: plan.joined_member_count,
        }
        .to_json();
        self.pusher.broadcast(plan.new_room_others, &notice).await;
        Ok(())
    }

    async fn handle_room_leave(&self, session_id: &SessionId, now: i64) -> Result<(), FrameError> {
        let (room_name, display_name, member_count, remaining) = {
            let mut state = self.state.lock().await;
            let Some(session) = state.registry.get(session_id) else {
                return Ok(());
            };
            let Some(room_name) = session.current_room.clone() else {
                return Err(FrameError::NotInRoom);
            };
            let display_name = session.display_name();
            let outcome = state.directory.leave(session_id, &room_name, now);
            state.registry.set_current_room(session_id, None);
            let remaining = state.directory.members_of(&room_name);
            (room_name, display_name, outcome.member_count, remaining)
        };

        if let Err(e) = self
            .pusher
            .push_to(session_id, &Outbound::RoomLeft {}.to_json())
            .await
        {
            tracing::debug!("failed to send room.left to '{}': {}", session_id, e);
        }

        let notice = Outbound::UserLeft {
            room_name: room_name.as_str().to_string(),
            username: display_name,
            member_count,
        }
        .to_json();
        self.pusher.broadcast(remaining, &notice).await;
        Ok(())
    }

    async fn handle_presence_ping(
        &self,
        session_id: &SessionId,
        now: i64,
    ) -> Result<(), FrameError> {
        let room_member_count = {
            let state = self.state.lock().await;
            state
                .registry
                .get(session_id)
                .and_then(|session| session.current_room.as_ref())
                .map(|room| state.directory.member_count(room))
        };

        let pong = Outbound::PresencePong { timestamp: now }.to_json();
        if let Err(e) = self.pusher.push_to(session_id, &pong).await {
            tracing::debug!("failed to send presence.pong to '{}': {}", session_id, e);
        }
        // ルーム所属中は現在のメンバー数も返す
        if let Some(count) = room_member_count {
            let presence = Outbound::PresenceCount { count }.to_json();
            if let Err(e) = self.pusher.push_to(session_id, &presence).await {
                tracing::debug!("failed to send presence.count to '{}': {}", session_id, e);
            }
        }
        Ok(())
    }

    /// セッションを破棄する（トランスポート close と Reaper の両方から
    /// 呼ばれるため冪等）
    pub async fn handle_disconnect(&self, session_id: &SessionId) {
        let now = self.clock.now_millis();
        let left_room = {
            let mut state = self.state.lock().await;
            let Some(session) = state.registry.remove(session_id) else {
                // 既に回収済み（close イベントと Reaper の競合）
                return;
            };
            state.limiter.cleanup(session_id);
            session.current_room.as_ref().map(|room_name| {
                let outcome = state.directory.leave(session_id, room_name, now);
                let remaining = state.directory.members_of(room_name);
                (
                    room_name.clone(),
                    session.display_name(),
                    outcome.member_count,
                    remaining,
                )
            })
        };

        self.pusher.unregister_client(session_id).await;
        tracing::info!("session '{}' disconnected", session_id);

        if let Some((room_name, display_name, member_count, remaining)) = left_room {
            let notice = Outbound::UserLeft {
                room_name: room_name.as_str().to_string(),
                username: display_name,
                member_count,
            }
            .to_json();
            self.pusher.broadcast(remaining, &notice).await;
        }
    }

    /// アイドルセッションの回収とルームの掃除（Reaper から定期的に呼ばれる）
    ///
    /// 回収は通常の切断経路をそのまま通すため、メンバーシップの
    /// 後始末がここに重複することはありません。
    pub async fn sweep_idle(&self) -> usize {
        let now = self.clock.now_millis();
        let (idle, pruned) = {
            let mut state = self.state.lock().await;
            let idle = state
                .registry
                .idle_sessions(now, self.config.idle_timeout_ms);
            let pruned = state.directory.prune_empty(now);
            (idle, pruned)
        };

        if !pruned.is_empty() {
            tracing::info!("pruned {} empty room(s)", pruned.len());
        }
        let reaped = idle.len();
        for session_id in idle {
            tracing::info!("reaping idle session '{}'", session_id);
            self.handle_disconnect(&session_id).await;
        }
        reaped
    }

    /// 公開ルームの一覧（名前とメンバー数）。presence 用の読み取りで、
    /// 多少古いスナップショットでも構わない。
    pub async fn room_presence(&self) -> Vec<(String, usize)> {
        let state = self.state.lock().await;
        state
            .directory
            .list_rooms()
            .into_iter()
            .map(|(name, count)| (name.as_str().to_string(), count))
            .collect()
    }

    /// 接続中のセッション数
    pub async fn session_count(&self) -> usize {
        self.state.lock().await.registry.len()
    }

    async fn send_error(&self, session_id: &SessionId, error: &FrameError) {
        let envelope = Outbound::Error {
            message: error.to_string(),
        }
        .to_json();
        // 相手が既に消えていても何もしない
        let _ = self.pusher.push_to(session_id, &envelope).await;
    }

    #[cfg(test)]
    pub(crate) async fn debug_state<R>(&self, f: impl FnOnce(&ConnectionRegistry, &RoomDirectory) -> R) -> R {
        let state = self.state.lock().await;
        f(&state.registry, &state.directory)
    }
}
