//! メッセージ送信（通知）の実装
//!
//! `MessagePusher` trait の具体的な実装を提供します。
//! 現状は WebSocket のみ。

pub mod websocket;

pub use websocket::WebSocketMessagePusher;
