//! Hall位置インターフェースとレポートの設定パラメータ

use crate::error::Error;

/// ティック源の周波数 [Hz]（1msティック）
pub const TICKS_PER_SECOND: u64 = 1000;

/// キャプチャタイマー（TIM4）設定
pub mod timer {
    /// タイマー入力クロック [MHz]（APB1 = 170MHz）
    pub const CLOCK_MHZ: u32 = 170;

    /// プリスケーラ分周比（PSC + 1）。170分周で1ティック = 1μs
    pub const PRESCALER_DIVIDER: u32 = 170;

    /// キャプチャ値を読むチャネル
    pub const CAPTURE_CHANNEL: u8 = 1;
}

/// レポート設定
pub mod report {
    /// レポート周期 [ティック]（1kHzティックで100ms）
    pub const PERIOD_TICKS: u32 = 100;

    /// デバッグカウントモードで確認する正常イベント回数（None = 通常のインターバル出力）
    pub const DEBUG_LOOP_COUNT_MAX: Option<u32> = None;
}

/// 計測開始前のウォームアップ
pub mod warm_up {
    /// 計測を開始する前に経過させるシミュレータパルス数
    pub const PULSES: u8 = 4;
}

/// Hall信号シミュレータ
pub mod simulator {
    /// 1ステップ（Hallコード1つ）あたりの時間 [ms]
    pub const STEP_PERIOD_MS: u64 = 10;

    /// 異常遷移を注入する電気角周期の間隔（None = 注入しない）
    pub const FAULT_INTERVAL_CYCLES: Option<u32> = Some(20);

    /// 異常遷移の後に出力を保持するステップ数（レポート2周期分）
    ///
    /// 異常遷移を含む周期は直前の正常遷移と混在して抑制されるため、
    /// 次の周期を丸ごとイベント無しにして異常遷移を出力させる。
    pub const FAULT_HOLD_STEPS: u32 = (2 * super::report::PERIOD_TICKS as u64 * 1000
        / super::TICKS_PER_SECOND
        / STEP_PERIOD_MS) as u32;
}

/// レポート出力UART
pub mod uart {
    pub const BAUDRATE: u32 = 115_200;

    /// 1行あたりの最大バイト数
    pub const LINE_CAPACITY: usize = 96;

    /// 1行の書き込みタイムアウト [ms]。超過した行は破棄
    pub const WRITE_TIMEOUT_MS: u64 = 20;
}

/// レポータ設定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportConfig {
    /// レポート周期 [ティック]（1以上）
    pub period_ticks: u32,
    /// Some(n): 正常イベントをn回確認したら1行だけ出力するデバッグモード
    pub debug_loop_count: Option<u32>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            period_ticks: report::PERIOD_TICKS,
            debug_loop_count: report::DEBUG_LOOP_COUNT_MAX,
        }
    }
}

/// 1キャプチャティックあたりのナノ秒数を計算
///
/// `prescaler_divider * 1000 / clock_mhz`
///
/// # Arguments
/// * `prescaler_divider` - タイマーのプリスケーラ分周比（PSC + 1）
/// * `clock_mhz` - タイマー入力クロック [MHz]
pub fn nanoseconds_per_tick(prescaler_divider: u32, clock_mhz: u32) -> Result<u32, Error> {
    if clock_mhz == 0 {
        return Err(Error::InvalidClock);
    }

    match prescaler_divider.saturating_mul(1000) / clock_mhz {
        0 => Err(Error::TickTooShort),
        ns => Ok(ns),
    }
}
