//! 永続ストアの実装
//!
//! `MessageStore` trait の具体的な実装を提供します。
//! 現状はインメモリのみ。リレーショナル DB 実装を足す場合も
//! このモジュール配下に置きます。

pub mod inmemory;

pub use inmemory::InMemoryMessageStore;
