//! 正常遷移間隔の積算
//!
//! キャプチャタイマーはHallエッジごとにリセットされるため、1回のキャプチャ値は
//! 直前のエッジ（種別を問わない）からの経過時間です。正常遷移以外のエッジの間隔を積算し、
//! 正常遷移で確定させることで、連続する2つの正常遷移間の時間を求めます。

use crate::posif::HallEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IntervalAccumulator {
    /// 前回の正常遷移からの経過ティック（飽和）
    since_correct: u32,
}

impl IntervalAccumulator {
    pub const fn new() -> Self {
        Self { since_correct: 0 }
    }

    /// エッジ1つ分のキャプチャを積算
    ///
    /// # Arguments
    /// * `elapsed_ticks` - 直前のエッジからのキャプチャ値
    /// * `event` - このエッジの分類結果
    ///
    /// # Returns
    /// 正常遷移の場合のみ、前回の正常遷移からのティック数
    pub fn on_edge(&mut self, elapsed_ticks: u32, event: Option<HallEvent>) -> Option<u32> {
        let since = self.since_correct.saturating_add(elapsed_ticks);
        if event == Some(HallEvent::Correct) {
            self.since_correct = 0;
            Some(since)
        } else {
            self.since_correct = since;
            None
        }
    }

    #[inline]
    pub fn since_correct(&self) -> u32 {
        self.since_correct
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consecutive_correct_edges() {
        let mut acc = IntervalAccumulator::new();
        assert_eq!(acc.on_edge(10_000, Some(HallEvent::Correct)), Some(10_000));
        assert_eq!(acc.on_edge(10_000, Some(HallEvent::Correct)), Some(10_000));
    }

    #[test]
    fn test_wrong_edge_does_not_restart_interval() {
        let mut acc = IntervalAccumulator::new();
        acc.on_edge(10_000, Some(HallEvent::Correct));

        // 10ms後に異常遷移、さらに10ms後に正常遷移 → 20ms
        assert_eq!(acc.on_edge(10_000, Some(HallEvent::Wrong)), None);
        assert_eq!(acc.since_correct(), 10_000);
        assert_eq!(acc.on_edge(10_000, Some(HallEvent::Correct)), Some(20_000));
        assert_eq!(acc.since_correct(), 0);
    }

    #[test]
    fn test_unclassified_edges_accumulate() {
        let mut acc = IntervalAccumulator::new();
        acc.on_edge(300, None);
        acc.on_edge(200, None);
        assert_eq!(acc.on_edge(500, Some(HallEvent::Correct)), Some(1000));
    }

    #[test]
    fn test_saturates() {
        let mut acc = IntervalAccumulator::new();
        acc.on_edge(u32::MAX, None);
        assert_eq!(acc.on_edge(1, Some(HallEvent::Correct)), Some(u32::MAX));
        assert_eq!(acc.on_edge(7, Some(HallEvent::Correct)), Some(7));
    }
}
