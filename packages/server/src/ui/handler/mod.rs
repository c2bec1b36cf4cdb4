//! axum request handlers.

pub mod http;
pub mod websocket;
