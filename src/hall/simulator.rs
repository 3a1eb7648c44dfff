//! Hall信号シミュレータ
//!
//! モーターの代わりに3本のGPIO出力で正転時のHall信号（1 → 3 → 2 → 6 → 4 → 5）を生成します。
//! 出力はHall入力（TIM4_CH1〜CH3）にジャンパ接続して使用します。
//!
//! - 1電気角周期（6ステップ）ごとに周期一致パルスを出す（ウォームアップのカウント用）
//! - `fault_interval` を指定すると、その周期数ごとに1ステップ飛ばして異常遷移を発生させる
//! - 異常遷移の後は `fault_hold_steps` ステップ出力を保持する。異常遷移だけのレポート周期を作り、
//!   正常遷移と混在して出力が抑制されないようにする

use crate::hall::pattern::{HallCode, HALL_SEQUENCE};

/// 1ステップ分の出力
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(all(feature = "defmt", not(test)), derive(defmt::Format))]
pub struct SimulatorStep {
    /// 出力するHallコード
    pub code: HallCode,
    /// このステップで電気角1周期が完了した
    pub period_match: bool,
    /// このステップはシーケンスを1つ飛ばした
    pub injected_fault: bool,
}

pub struct HallSimulator {
    /// `HALL_SEQUENCE` 上の位置
    index: usize,
    /// 完了した電気角周期数
    cycles: u32,
    fault_interval: Option<u32>,
    fault_hold_steps: u32,
    skip_next: bool,
    /// 残りの保持ステップ数
    hold_remaining: u32,
}

impl HallSimulator {
    pub const fn new(fault_interval: Option<u32>, fault_hold_steps: u32) -> Self {
        Self {
            index: 0,
            cycles: 0,
            fault_interval,
            fault_hold_steps,
            skip_next: false,
            hold_remaining: 0,
        }
    }

    /// 現在出力中のコード
    #[inline]
    pub fn current(&self) -> HallCode {
        HallCode::from_bits(HALL_SEQUENCE[self.index])
    }

    /// 次のステップへ進める
    ///
    /// 保持中は出力を変えない（エッジ無し）。
    pub fn step(&mut self) -> SimulatorStep {
        if self.hold_remaining > 0 {
            self.hold_remaining -= 1;
            return SimulatorStep {
                code: self.current(),
                period_match: false,
                injected_fault: false,
            };
        }

        let injected_fault = core::mem::take(&mut self.skip_next);
        let next = self.index + if injected_fault { 2 } else { 1 };

        let period_match = next >= HALL_SEQUENCE.len();
        self.index = next % HALL_SEQUENCE.len();
        if injected_fault {
            self.hold_remaining = self.fault_hold_steps;
        }

        if period_match {
            self.cycles = self.cycles.wrapping_add(1);
            if let Some(interval) = self.fault_interval.filter(|&n| n > 0) {
                self.skip_next = self.cycles % interval == 0;
            }
        }

        SimulatorStep {
            code: self.current(),
            period_match,
            injected_fault,
        }
    }

    /// 完了した電気角周期数
    pub fn cycles(&self) -> u32 {
        self.cycles
    }
}
