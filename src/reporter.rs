//! 周期レポータ
//!
//! ティックごとに呼ばれ、`period_ticks` ティックに1回だけ分類器のフラグを確認して
//! 最大1行のレポートを出力します。高頻度・不定期なHallイベントを一定レートの出力に変換し、
//! 出力チャネルが溢れるのを防ぎます。

use core::fmt::{self, Write as _};

use crate::config::ReportConfig;
use crate::controller::Controller;
use crate::error::Error;
use crate::fmt::*;

/// 起動時に出力するバナー（ANSI画面クリア + タイトル）
pub const BANNER: &str = "\x1b[2J\x1b[;H\
============================================================ \r\n\
STM32G4: Hall position interface example \r\n\
============================================================ \r\n";

/// 1周期あたりの出力
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(all(feature = "defmt", not(test)), derive(defmt::Format))]
pub enum Report {
    /// 直近の正常遷移間隔
    Interval { nanoseconds: u32 },
    /// 異常遷移が発生した
    WrongHallEvent,
    /// デバッグカウントモードで規定回数の正常遷移を確認した
    CorrectEventsConfirmed { count: u32 },
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Report::Interval { nanoseconds } => write!(
                f,
                "Time interval between two correct hall events: {}ns",
                nanoseconds
            ),
            Report::WrongHallEvent => f.write_str("Wrong hall event"),
            Report::CorrectEventsConfirmed { count } => {
                write!(f, "All {} correct hall events occurred", count)
            }
        }
    }
}

/// レポートの出力先（送りっぱなし、失敗時は破棄）
pub trait ReportSink {
    fn emit(&mut self, report: &Report);
}

/// 1行 + `\r\n` を追記。収まらない場合は行ごと破棄
impl<const N: usize> ReportSink for heapless::String<N> {
    fn emit(&mut self, report: &Report) {
        let len = self.len();
        if write!(self, "{}\r\n", report).is_err() {
            self.truncate(len);
        }
    }
}

/// 周期レポータ
pub struct PeriodicReporter {
    /// ティックカウンタ（このレポータのみが所有）
    ticks: u32,
    period_ticks: u32,
    debug_loop_count: Option<u32>,
    /// デバッグカウントモードで確認した正常周期数
    confirmed: u32,
    /// 正常・異常が混在して出力を抑制した周期数
    suppressed: u32,
}

impl PeriodicReporter {
    pub fn new(config: ReportConfig) -> Result<Self, Error> {
        if config.period_ticks == 0 {
            return Err(Error::ZeroReportPeriod);
        }
        // 確認数は1から数えるため、0回では出力されない
        if config.debug_loop_count == Some(0) {
            return Err(Error::ZeroDebugLoopCount);
        }

        Ok(Self {
            ticks: 0,
            period_ticks: config.period_ticks,
            debug_loop_count: config.debug_loop_count,
            confirmed: 0,
            suppressed: 0,
        })
    }

    /// ティック処理
    ///
    /// # Returns
    /// この呼び出しで出力したレポート
    pub fn on_tick<S>(&mut self, controller: &Controller, sink: &mut S) -> Option<Report>
    where
        S: ReportSink + ?Sized,
    {
        self.ticks += 1;
        if self.ticks != self.period_ticks {
            return None;
        }
        self.ticks = 0;

        let report = self.evaluate(controller)?;
        sink.emit(&report);
        Some(report)
    }

    fn evaluate(&mut self, controller: &Controller) -> Option<Report> {
        let seen = controller.take_seen();
        let flags = controller.flags();

        if seen.is_mixed() || (flags.correct_event_pending && flags.wrong_event_pending) {
            // どちらのハンドラが後だったか判別できないため、この周期は出力しない
            self.suppressed = self.suppressed.wrapping_add(1);
            warn!(
                "Ambiguous hall period suppressed: flags={}, total={}",
                flags, self.suppressed
            );
            return None;
        }

        match (flags.correct_event_pending, flags.wrong_event_pending) {
            (true, false) => {
                controller.clear_correct();
                self.correct_report(controller.interval_ns())
            }
            (false, true) => {
                controller.clear_wrong();
                Some(Report::WrongHallEvent)
            }
            _ => None,
        }
    }

    fn correct_report(&mut self, nanoseconds: u32) -> Option<Report> {
        let Some(count) = self.debug_loop_count else {
            return Some(Report::Interval { nanoseconds });
        };

        self.confirmed = self.confirmed.saturating_add(1);
        if self.confirmed == count {
            Some(Report::CorrectEventsConfirmed { count })
        } else {
            trace!("Correct hall period {}/{}", self.confirmed, count);
            None
        }
    }

    /// 現在のティックカウンタ
    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    /// 抑制した周期数
    pub fn suppressed_periods(&self) -> u32 {
        self.suppressed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::EventFlags;
    use crate::posif::mock::MockPosif;
    use std::string::{String, ToString};
    use std::vec::Vec;

    impl ReportSink for Vec<String> {
        fn emit(&mut self, report: &Report) {
            self.push(report.to_string());
        }
    }

    const PERIOD: u32 = 100;

    fn reporter() -> PeriodicReporter {
        PeriodicReporter::new(ReportConfig {
            period_ticks: PERIOD,
            debug_loop_count: None,
        })
        .unwrap()
    }

    /// 1周期分ティックを進める
    fn run_period(
        reporter: &mut PeriodicReporter,
        controller: &Controller,
        sink: &mut Vec<String>,
    ) {
        for _ in 0..PERIOD {
            reporter.on_tick(controller, sink);
        }
    }

    #[test]
    fn test_zero_period_rejected() {
        let result = PeriodicReporter::new(ReportConfig {
            period_ticks: 0,
            debug_loop_count: None,
        });
        assert!(matches!(result, Err(Error::ZeroReportPeriod)));
    }

    #[test]
    fn test_zero_debug_loop_count_rejected() {
        let result = PeriodicReporter::new(ReportConfig {
            period_ticks: PERIOD,
            debug_loop_count: Some(0),
        });
        assert!(matches!(result, Err(Error::ZeroDebugLoopCount)));

        let result = PeriodicReporter::new(ReportConfig {
            period_ticks: PERIOD,
            debug_loop_count: Some(1),
        });
        assert!(result.is_ok());
    }

    #[test]
    fn test_silent_until_period_boundary() {
        let controller = Controller::new(1000);
        let mut posif = MockPosif::default();
        let mut reporter = reporter();
        let mut lines: Vec<String> = Vec::new();

        controller.on_correct_transition(10, &mut posif);

        for tick in 1..PERIOD {
            assert_eq!(reporter.on_tick(&controller, &mut lines), None);
            assert_eq!(reporter.ticks(), tick);
        }
        assert!(lines.is_empty());

        assert!(reporter.on_tick(&controller, &mut lines).is_some());
        assert_eq!(lines.len(), 1);
        assert_eq!(reporter.ticks(), 0);
    }

    #[test]
    fn test_idle_period_emits_nothing() {
        let controller = Controller::new(1000);
        let mut reporter = reporter();
        let mut lines: Vec<String> = Vec::new();

        run_period(&mut reporter, &controller, &mut lines);
        run_period(&mut reporter, &controller, &mut lines);

        assert!(lines.is_empty());
        assert_eq!(controller.flags(), EventFlags::default());
        assert_eq!(reporter.suppressed_periods(), 0);
    }

    #[test]
    fn test_correct_event_reports_interval() {
        let controller = Controller::new(1000);
        let mut posif = MockPosif::default();
        let mut reporter = reporter();
        let mut lines: Vec<String> = Vec::new();

        controller.on_correct_transition(250, &mut posif);
        run_period(&mut reporter, &controller, &mut lines);

        assert_eq!(
            lines,
            ["Time interval between two correct hall events: 250000ns"]
        );
        assert_eq!(controller.flags(), EventFlags::default());

        // 消費済みなので次の周期は出力なし
        run_period(&mut reporter, &controller, &mut lines);
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn test_wrong_event_reported() {
        let controller = Controller::new(1000);
        let mut posif = MockPosif::default();
        let mut reporter = reporter();
        let mut lines: Vec<String> = Vec::new();

        controller.on_incorrect_transition(&mut posif);
        run_period(&mut reporter, &controller, &mut lines);

        assert_eq!(lines, ["Wrong hall event"]);
        assert_eq!(controller.flags(), EventFlags::default());
    }

    #[test]
    fn test_mixed_period_suppressed() {
        let controller = Controller::new(1000);
        let mut posif = MockPosif::default();
        let mut reporter = reporter();
        let mut lines: Vec<String> = Vec::new();

        controller.on_correct_transition(250, &mut posif);
        controller.on_incorrect_transition(&mut posif);
        run_period(&mut reporter, &controller, &mut lines);

        assert!(lines.is_empty());
        assert_eq!(reporter.suppressed_periods(), 1);
        // 最後に実行されたハンドラの状態のまま
        assert_eq!(
            controller.flags(),
            EventFlags {
                correct_event_pending: false,
                wrong_event_pending: true,
            }
        );
    }

    #[test]
    fn test_only_latest_interval_reported() {
        let controller = Controller::new(1000);
        let mut posif = MockPosif::default();
        let mut reporter = reporter();
        let mut lines: Vec<String> = Vec::new();

        controller.on_correct_transition(100, &mut posif);
        controller.on_correct_transition(200, &mut posif);
        controller.on_correct_transition(300, &mut posif);
        run_period(&mut reporter, &controller, &mut lines);

        assert_eq!(
            lines,
            ["Time interval between two correct hall events: 300000ns"]
        );
    }

    #[test]
    fn test_debug_count_mode() {
        let controller = Controller::new(1000);
        let mut posif = MockPosif::default();
        let mut reporter = PeriodicReporter::new(ReportConfig {
            period_ticks: 10,
            debug_loop_count: Some(3),
        })
        .unwrap();
        let mut lines: Vec<String> = Vec::new();

        for _ in 0..5 {
            controller.on_correct_transition(1, &mut posif);
            for _ in 0..10 {
                reporter.on_tick(&controller, &mut lines);
            }
        }

        assert_eq!(lines, ["All 3 correct hall events occurred"]);
    }

    #[test]
    fn test_string_sink_appends_line() {
        let mut line: heapless::String<96> = heapless::String::new();
        line.emit(&Report::WrongHallEvent);
        assert_eq!(line.as_str(), "Wrong hall event\r\n");
    }

    #[test]
    fn test_string_sink_drops_overflowing_line() {
        let mut line: heapless::String<16> = heapless::String::new();
        line.emit(&Report::Interval { nanoseconds: 1 });
        assert!(line.is_empty());
    }
}
