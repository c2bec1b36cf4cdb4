//! Infrastructure 層
//!
//! ドメイン層の trait に対する具体的な実装と、チャットコアの
//! インメモリ状態（Registry / Directory / RateLimiter）を提供します。
//!
//! - `registry` / `directory` / `rate_limit`: Router が単一ロック下で
//!   合成する同期的な状態ホルダー
//! - `message_pusher`: WebSocket による MessagePusher 実装
//! - `store`: インメモリの MessageStore 実装
//! - `durability`: 永続ストアへの非同期バッチ書き込み
//! - `dto`: ワイヤ上のエンベロープ定義

pub mod directory;
pub mod dto;
pub mod durability;
pub mod message_pusher;
pub mod rate_limit;
pub mod registry;
pub mod store;

pub use directory::RoomDirectory;
pub use durability::{DurabilityBridge, FlushWorker};
pub use message_pusher::WebSocketMessagePusher;
pub use rate_limit::RateLimiter;
pub use registry::ConnectionRegistry;
