//! ドメイン層のエラー定義

use thiserror::Error;

/// 値オブジェクト生成時のバリデーションエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("room name must not be empty")]
    EmptyRoomName,

    #[error("room name exceeds {max} characters")]
    RoomNameTooLong { max: usize },

    #[error("message is empty after trimming")]
    EmptyMessage,

    #[error("message exceeds {max} characters (got {chars})")]
    MessageTooLong { chars: usize, max: usize },
}
