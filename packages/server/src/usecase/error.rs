//! フレーム処理のエラー定義
//!
//! ここに列挙されるのはすべてクライアント起因のエラーで、発生元の
//! セッションに `error` エンベロープとして返されるだけです。
//! 他のセッションやプロセス全体には影響しません。

use thiserror::Error;

/// 受信フレーム処理時のエラー
///
/// `Display` 実装の文言がそのまま `error` エンベロープの `message` に
/// なるため、内部情報を含めないこと。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("malformed envelope")]
    Malformed,

    #[error("not in a room")]
    NotInRoom,

    #[error("rate limit")]
    RateLimited,

    #[error("message is empty")]
    EmptyMessage,

    #[error("message too long (max {max} characters)")]
    MessageTooLong { max: usize },

    #[error("invalid room name")]
    InvalidRoomName,

    #[error("session state is inconsistent")]
    InvariantViolation,
}

impl From<crate::domain::DomainError> for FrameError {
    fn from(e: crate::domain::DomainError) -> Self {
        use crate::domain::DomainError;
        match e {
            DomainError::EmptyMessage => FrameError::EmptyMessage,
            DomainError::MessageTooLong { max, .. } => FrameError::MessageTooLong { max },
            DomainError::EmptyRoomName | DomainError::RoomNameTooLong { .. } => {
                FrameError::InvalidRoomName
            }
        }
    }
}
