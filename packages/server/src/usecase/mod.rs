//! UseCase 層
//!
//! 受信フレームの解釈と状態遷移はすべて `ChatRouter` が単一の
//! 書き込み経路として担います。`IdleReaper` はタイマー起点の唯一の
//! コンポーネントですが、セッション回収は Router の切断経路を
//! そのまま使います（掃除ロジックを二重に持たない）。

mod error;
mod reaper;
mod router;

pub use error::FrameError;
pub use reaper::IdleReaper;
pub use router::ChatRouter;
