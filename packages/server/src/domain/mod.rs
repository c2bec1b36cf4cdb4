//! ドメイン層
//!
//! チャットコアの値オブジェクト・エンティティ・trait seam を定義します。
//! Infrastructure 層や UI 層には依存しません（依存性の逆転）。

mod error;
mod message;
mod pusher;
mod room;
mod session;
mod store;

pub use error::DomainError;
pub use message::{ChatMessage, MessageBody, escape_markup};
pub use pusher::{MessagePushError, MessagePusher, PusherChannel};
pub use room::{Room, RoomName};
pub use session::{Identity, Session, SessionId};
pub use store::{MessageStore, StoreError};

#[cfg(test)]
pub(crate) use store::MockMessageStore;
