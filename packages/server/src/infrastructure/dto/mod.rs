//! Data Transfer Objects (DTOs) for the chat core.
//!
//! DTOs are organized by protocol:
//! - `websocket`: inbound/outbound WebSocket envelopes
//! - `http`: HTTP API response DTOs

pub mod http;
pub mod websocket;
