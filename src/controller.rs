//! Hallイベント分類器
//!
//! 正常遷移（CHE）／異常遷移（WHE）の割り込みハンドラから呼ばれ、
//! スティッキーフラグとエッジ間隔 [ns] を更新します。
//!
//! ## 共有状態
//! - フラグ・間隔は割り込みコンテキストが書き込み、ティックコンテキスト（レポータ）が読み取る
//! - 各フィールドはワード単位のアトミックで、書き込み元は1つ
//! - 2つのフラグの組み合わせはアトミックに読めないため、両方trueの瞬間がありうる（レポータ側で抑制）

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use crate::config;
use crate::error::Error;
use crate::posif::{CaptureTimer, HallEvent, PositionInterface};

/// レポータが参照するスティッキーフラグ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(all(feature = "defmt", not(test)), derive(defmt::Format))]
pub struct EventFlags {
    pub correct_event_pending: bool,
    pub wrong_event_pending: bool,
}

/// 前回のレポート境界以降に発生したイベント種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(all(feature = "defmt", not(test)), derive(defmt::Format))]
pub struct SeenEvents(u8);

impl SeenEvents {
    #[inline]
    pub fn contains(self, event: HallEvent) -> bool {
        self.0 & event.mask() != 0
    }

    /// 同じ周期内に正常・異常の両方が発生した
    #[inline]
    pub fn is_mixed(self) -> bool {
        self.contains(HallEvent::Correct) && self.contains(HallEvent::Wrong)
    }
}

/// Hall計測の共有状態
pub struct Controller {
    correct_event_pending: AtomicBool,
    wrong_event_pending: AtomicBool,
    seen: AtomicU8,
    interval_ns: AtomicU32,
    nanoseconds_per_tick: AtomicU32,
}

impl Controller {
    pub const fn new(nanoseconds_per_tick: u32) -> Self {
        Self {
            correct_event_pending: AtomicBool::new(false),
            wrong_event_pending: AtomicBool::new(false),
            seen: AtomicU8::new(0),
            interval_ns: AtomicU32::new(0),
            nanoseconds_per_tick: AtomicU32::new(nanoseconds_per_tick),
        }
    }

    /// 起動時にタイマー設定から求めたティック長を設定（割り込み有効化前に呼ぶ）
    pub fn set_nanoseconds_per_tick(&self, nanoseconds_per_tick: u32) {
        self.nanoseconds_per_tick
            .store(nanoseconds_per_tick, Ordering::Relaxed);
    }

    /// キャプチャタイマーのプリスケーラからティック長を求めて設定
    ///
    /// # Returns
    /// 設定したティック長 [ns]
    pub fn calibrate<T>(&self, timer: &T, clock_mhz: u32) -> Result<u32, Error>
    where
        T: CaptureTimer + ?Sized,
    {
        let nanoseconds_per_tick =
            config::nanoseconds_per_tick(timer.prescaler_divider(), clock_mhz)?;
        self.set_nanoseconds_per_tick(nanoseconds_per_tick);
        Ok(nanoseconds_per_tick)
    }

    #[inline]
    pub fn nanoseconds_per_tick(&self) -> u32 {
        self.nanoseconds_per_tick.load(Ordering::Relaxed)
    }

    /// 正常遷移ハンドラ
    ///
    /// 間隔を `captured_ticks * nanoseconds_per_tick` で上書きし、正常フラグを立てて異常フラグを下ろす。
    /// イベントは必ず1回だけ応答する。
    pub fn on_correct_transition<P>(&self, captured_ticks: u32, posif: &mut P)
    where
        P: PositionInterface + ?Sized,
    {
        self.store_interval(captured_ticks);
        self.mark_correct();
        posif.acknowledge(HallEvent::Correct);
    }

    /// 正常遷移割り込みのエントリ
    ///
    /// キャプチャイベントがあればクリアしてキャプチャ値から間隔を更新する。
    /// キャプチャイベントが無い場合は前回の間隔を保持したままフラグのみ更新。
    pub fn service_correct_event<T, P>(&self, timer: &mut T, posif: &mut P)
    where
        T: CaptureTimer + ?Sized,
        P: PositionInterface + ?Sized,
    {
        if timer.has_capture_event() {
            timer.clear_event();
            let captured_ticks = timer.captured_ticks(config::timer::CAPTURE_CHANNEL);
            self.store_interval(captured_ticks);
        }
        self.mark_correct();
        posif.acknowledge(HallEvent::Correct);
    }

    /// 異常遷移ハンドラ
    pub fn on_incorrect_transition<P>(&self, posif: &mut P)
    where
        P: PositionInterface + ?Sized,
    {
        self.wrong_event_pending.store(true, Ordering::Release);
        self.correct_event_pending.store(false, Ordering::Release);
        self.seen.fetch_or(HallEvent::Wrong.mask(), Ordering::Relaxed);
        posif.acknowledge(HallEvent::Wrong);
    }

    /// 現在のフラグ
    #[inline]
    pub fn flags(&self) -> EventFlags {
        EventFlags {
            correct_event_pending: self.correct_event_pending.load(Ordering::Acquire),
            wrong_event_pending: self.wrong_event_pending.load(Ordering::Acquire),
        }
    }

    /// 直近の正常遷移間隔 [ns]
    #[inline]
    pub fn interval_ns(&self) -> u32 {
        self.interval_ns.load(Ordering::Relaxed)
    }

    /// 周期内の発生イベントを取り出してクリア（レポータ専用）
    pub(crate) fn take_seen(&self) -> SeenEvents {
        SeenEvents(self.seen.swap(0, Ordering::Relaxed))
    }

    pub(crate) fn clear_correct(&self) {
        self.correct_event_pending.store(false, Ordering::Relaxed);
    }

    pub(crate) fn clear_wrong(&self) {
        self.wrong_event_pending.store(false, Ordering::Relaxed);
    }

    fn store_interval(&self, captured_ticks: u32) {
        let interval = captured_ticks.saturating_mul(self.nanoseconds_per_tick());
        self.interval_ns.store(interval, Ordering::Relaxed);
    }

    fn mark_correct(&self) {
        self.correct_event_pending.store(true, Ordering::Release);
        self.wrong_event_pending.store(false, Ordering::Release);
        self.seen.fetch_or(HallEvent::Correct.mask(), Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::posif::mock::{MockPosif, MockTimer};

    #[test]
    fn test_correct_then_incorrect() {
        let controller = Controller::new(1000);
        let mut posif = MockPosif::default();

        controller.on_correct_transition(250, &mut posif);
        controller.on_incorrect_transition(&mut posif);

        let flags = controller.flags();
        assert!(!flags.correct_event_pending);
        assert!(flags.wrong_event_pending);
    }

    #[test]
    fn test_incorrect_then_correct() {
        let controller = Controller::new(1000);
        let mut posif = MockPosif::default();

        controller.on_incorrect_transition(&mut posif);
        controller.on_correct_transition(42, &mut posif);

        let flags = controller.flags();
        assert!(flags.correct_event_pending);
        assert!(!flags.wrong_event_pending);
        assert_eq!(controller.interval_ns(), 42_000);
    }

    #[test]
    fn test_each_handler_acknowledges_once() {
        let controller = Controller::new(1000);
        let mut posif = MockPosif::default();

        controller.on_correct_transition(1, &mut posif);
        controller.on_correct_transition(2, &mut posif);
        controller.on_incorrect_transition(&mut posif);
        controller.on_incorrect_transition(&mut posif);

        assert_eq!(
            posif.acks,
            [
                HallEvent::Correct,
                HallEvent::Correct,
                HallEvent::Wrong,
                HallEvent::Wrong
            ]
        );
    }

    #[test]
    fn test_latest_interval_wins() {
        let controller = Controller::new(10);
        let mut posif = MockPosif::default();

        controller.on_correct_transition(5, &mut posif);
        controller.on_correct_transition(7, &mut posif);
        assert_eq!(controller.interval_ns(), 70);
    }

    #[test]
    fn test_interval_saturates() {
        let controller = Controller::new(1000);
        let mut posif = MockPosif::default();

        controller.on_correct_transition(u32::MAX / 10, &mut posif);
        assert_eq!(controller.interval_ns(), u32::MAX);
    }

    #[test]
    fn test_service_correct_event_reads_capture() {
        let controller = Controller::new(1000);
        let mut posif = MockPosif::default();
        let mut timer = MockTimer {
            event: true,
            ticks: 250,
            ..Default::default()
        };

        controller.service_correct_event(&mut timer, &mut posif);

        assert_eq!(controller.interval_ns(), 250_000);
        assert!(!timer.event);
        assert_eq!(timer.clears, 1);
        assert_eq!(posif.acks, [HallEvent::Correct]);
    }

    #[test]
    fn test_service_correct_event_without_capture_keeps_interval() {
        let controller = Controller::new(1000);
        let mut posif = MockPosif::default();
        controller.on_correct_transition(3, &mut posif);
        controller.on_incorrect_transition(&mut posif);

        let mut timer = MockTimer::default();
        controller.service_correct_event(&mut timer, &mut posif);

        assert_eq!(controller.interval_ns(), 3_000);
        assert_eq!(timer.clears, 0);
        assert!(controller.flags().correct_event_pending);
        assert_eq!(posif.acks.len(), 3);
    }

    #[test]
    fn test_calibrate_from_prescaler() {
        let controller = Controller::new(0);
        let timer = MockTimer {
            divider: 170,
            ..Default::default()
        };

        assert_eq!(controller.calibrate(&timer, 170), Ok(1000));
        assert_eq!(controller.nanoseconds_per_tick(), 1000);

        let timer = MockTimer {
            divider: 1,
            ..Default::default()
        };
        assert_eq!(controller.calibrate(&timer, 2000), Err(Error::TickTooShort));
        // 失敗時は前の値のまま
        assert_eq!(controller.nanoseconds_per_tick(), 1000);
    }

    #[test]
    fn test_seen_events_collected_until_taken() {
        let controller = Controller::new(1000);
        let mut posif = MockPosif::default();

        assert_eq!(controller.take_seen(), SeenEvents::default());

        controller.on_correct_transition(1, &mut posif);
        controller.on_incorrect_transition(&mut posif);
        let seen = controller.take_seen();
        assert!(seen.is_mixed());

        controller.on_incorrect_transition(&mut posif);
        let seen = controller.take_seen();
        assert!(!seen.is_mixed());
        assert!(seen.contains(HallEvent::Wrong));
        assert!(!seen.contains(HallEvent::Correct));
    }
}
