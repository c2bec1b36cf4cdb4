//! Shared application state for the axum handlers.

use std::sync::Arc;

use crate::usecase::ChatRouter;

/// Shared application state
pub struct AppState {
    /// 唯一の書き込み経路である Router
    pub router: Arc<ChatRouter>,
}
