//! 計測開始前のウォームアップ
//!
//! 入力信号が安定するまで一定数のパルスを待ってから計測（位置インターフェースとキャプチャタイマー）を
//! 開始します。一度開始したら通常動作中に解除されることはありません。

/// ワンショットのアーミングラッチ
pub struct WarmUp {
    /// 開始前に経過させるパルス数
    pulses_required: u8,
    /// 観測したパルス数（飽和）
    pulses: u8,
    armed: bool,
}

impl WarmUp {
    pub const fn new(pulses_required: u8) -> Self {
        Self {
            pulses_required,
            pulses: 0,
            armed: false,
        }
    }

    /// パルスを1つ処理
    ///
    /// `pulses_required` 個のパルスが経過した後の次のパルスで計測を開始する。
    ///
    /// # Returns
    /// この呼び出しで開始状態に遷移した場合のみ `true`
    pub fn on_pulse(&mut self) -> bool {
        let elapsed = self.pulses;
        self.pulses = self.pulses.saturating_add(1);

        if self.armed || elapsed < self.pulses_required {
            return false;
        }

        self.armed = true;
        true
    }

    #[inline]
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// 観測したパルス数
    pub fn pulses(&self) -> u8 {
        self.pulses
    }
}
