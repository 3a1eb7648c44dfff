//! タスクモジュール
//!
//! 各タスクの実装を分離して管理します。

pub mod hall_simulator;
pub mod report;

// タスク関数を再エクスポート
pub use hall_simulator::hall_simulator_task;
pub use report::report_task;
