//! エラー型
//!
//! 起動時の前提条件チェックで発生するエラーのみを扱います。
//! 実行時のHallイベント処理にはエラー経路はありません。

/// 初期化エラー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(all(feature = "defmt", not(test)), derive(defmt::Format))]
pub enum Error {
    /// ペリフェラルクロック周波数が0
    InvalidClock,

    /// 1ティックが1ns未満（ns換算で0になる）
    TickTooShort,

    /// レポート周期が0ティック
    ZeroReportPeriod,

    /// デバッグカウントモードの確認回数が0
    ZeroDebugLoopCount,

    /// 位置インターフェースが対応していない動作モード
    UnsupportedMode,

    /// 位置インターフェースが対応していない入力選択
    UnsupportedInputs,
}
