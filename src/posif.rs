//! 位置インターフェース（POSIF）とキャプチャタイマーの抽象化
//!
//! Hallパターンの比較とイベント発生はハードウェア（またはファームウェア側のドライバ）が担当し、
//! コア側はこのトレイト経由でパターン設定・イベント応答のみを行います。

use crate::error::Error;
use crate::hall::{HallCode, HallLine};

/// 位置インターフェースが発生させるHallイベント
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(all(feature = "defmt", not(test)), derive(defmt::Format))]
pub enum HallEvent {
    /// 期待パターンに一致する遷移（CHE）
    Correct,
    /// 期待パターンにも現在パターンにも一致しない遷移（WHE）
    Wrong,
}

impl HallEvent {
    /// イベントレジスタ上のビット
    #[inline]
    pub const fn mask(self) -> u8 {
        match self {
            HallEvent::Correct => 1 << 0,
            HallEvent::Wrong => 1 << 1,
        }
    }
}

/// イベント通知に使う割り込みライン
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(all(feature = "defmt", not(test)), derive(defmt::Format))]
pub enum ServiceRequest {
    Sr0,
    Sr1,
}

/// 動作モード
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(all(feature = "defmt", not(test)), derive(defmt::Format))]
pub enum PosifMode {
    HallSensor,
    QuadratureDecoder,
    MultiChannel,
}

/// 入力ピンセットの選択
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(all(feature = "defmt", not(test)), derive(defmt::Format))]
pub enum InputSelection {
    A,
    B,
}

/// 入力フィルタ（ペリフェラルクロックのサンプル数）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(all(feature = "defmt", not(test)), derive(defmt::Format))]
pub enum InputFilter {
    Disabled,
    Samples2,
    Samples4,
    Samples8,
}

/// 位置インターフェース初期化パラメータ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(all(feature = "defmt", not(test)), derive(defmt::Format))]
pub struct PosifConfig {
    pub mode: PosifMode,
    pub inputs: InputSelection,
    pub filter: InputFilter,
}

impl Default for PosifConfig {
    fn default() -> Self {
        Self {
            mode: PosifMode::HallSensor,
            inputs: InputSelection::A,
            filter: InputFilter::Samples8,
        }
    }
}

/// 位置インターフェース
pub trait PositionInterface {
    /// モード・入力・フィルタを設定
    fn configure(&mut self, config: &PosifConfig) -> Result<(), Error>;

    fn start(&mut self);

    fn stop(&mut self);

    /// パック済み（`expected << 3 | current`）のHallパターンをシャドウレジスタに書き込む
    fn set_hall_patterns(&mut self, packed: u8);

    /// シャドウレジスタのパターンを有効化（ラッチ）
    fn update_hall_pattern(&mut self);

    /// 発生中のイベントを解除
    fn acknowledge(&mut self, event: HallEvent);

    fn enable_event(&mut self, event: HallEvent);

    /// イベントを割り込みラインに割り当て
    fn route_event(&mut self, event: HallEvent, service_request: ServiceRequest);
}

/// Hallエッジ間隔をキャプチャするタイマー
pub trait CaptureTimer {
    fn start(&mut self);

    /// キャプチャイベントが発生しているか
    fn has_capture_event(&self) -> bool;

    fn clear_event(&mut self);

    /// キャプチャされたティック数
    fn captured_ticks(&self, channel: u8) -> u32;

    /// プリスケーラ分周比（PSC + 1）
    fn prescaler_divider(&self) -> u32;
}

/// Hallセンサー入力ライン
pub trait HallInputs {
    fn read_line(&mut self, line: HallLine) -> bool;

    /// 3ラインを読み取って `H1 | H2 << 1 | H3 << 2` を返す
    fn read_code(&mut self) -> HallCode {
        let h1 = self.read_line(HallLine::H1);
        let h2 = self.read_line(HallLine::H2);
        let h3 = self.read_line(HallLine::H3);
        HallCode::from_lines(h1, h2, h3)
    }
}


#[cfg(test)]
mod tests {
    use super::mock::MockInputs;
    use super::*;

    #[test]
    fn test_event_masks_distinct() {
        assert_ne!(HallEvent::Correct.mask(), HallEvent::Wrong.mask());
        assert_eq!(HallEvent::Correct.mask() & HallEvent::Wrong.mask(), 0);
    }

    #[test]
    fn test_read_code_composes_lines() {
        for bits in 0..8u8 {
            let mut inputs = MockInputs(HallCode::from_bits(bits));
            assert_eq!(inputs.read_code().bits(), bits);
        }
    }

    #[test]
    fn test_default_config_is_hall_mode() {
        let config = PosifConfig::default();
        assert_eq!(config.mode, PosifMode::HallSensor);
        assert_eq!(config.inputs, InputSelection::A);
    }
}
