//! グローバル共有状態
//!
//! 割り込みハンドラ・タスク・メインループで共有される状態です。

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

use g4_hall_posif::Controller;

/// Hall計測の共有状態（ティック長は起動時に設定）
pub static CONTROLLER: Controller = Controller::new(0);

/// シミュレータの電気角1周期完了（ウォームアップのパルス）
pub static SIMULATOR_PERIOD_MATCH: Signal<CriticalSectionRawMutex, ()> = Signal::new();
