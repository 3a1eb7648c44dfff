//! Hall位置インターフェース: シーケンス検証と速度計測
//!
//! 3つのデジタルHallセンサー信号から、正常／異常なHall遷移と正常遷移間の時間間隔を求め、
//! 一定周期でテキストレポートとして出力します。
//!
//! ## モジュール構成
//! - [`hall`]: Hallコード・パターンテーブル、パターンドライバ、ウォームアップ、信号シミュレータ
//! - [`controller`]: 正常／異常遷移イベントの分類と間隔計算（割り込みコンテキスト）
//! - [`reporter`]: ティック駆動の周期レポータ
//! - [`posif`]: 位置インターフェース・キャプチャタイマー・Hall入力の抽象化
//!
//! ハードウェアに依存しないため、ホスト上で `cargo test --lib` でテストできます。
#![cfg_attr(not(test), no_std)]

// fmt.rs はマクロ定義のため最初に宣言する
mod fmt;

pub mod config;
pub mod controller;
pub mod error;
pub mod hall;
pub mod posif;
pub mod reporter;

pub use controller::{Controller, EventFlags};
pub use error::Error;
pub use reporter::{PeriodicReporter, Report, ReportSink};
