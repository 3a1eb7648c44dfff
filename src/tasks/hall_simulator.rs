//! Hall信号シミュレータタスク
//!
//! 3つのGPIO出力で正転時のHall信号を生成します。
//! 電気角1周期ごとにウォームアップ用のパルスを通知します。

use embassy_stm32::gpio::Output;
use embassy_time::{Duration, Ticker};

use g4_hall_posif::config;
use g4_hall_posif::hall::{HallCode, HallLine, HallSimulator};

use crate::fmt::*;
use crate::state::SIMULATOR_PERIOD_MATCH;

/// Hallコードを3本の出力に反映
fn drive(outputs: &mut [Output<'static>; 3], code: HallCode) {
    for (output, line) in outputs.iter_mut().zip(HallLine::ALL) {
        if code.line(line) {
            output.set_high();
        } else {
            output.set_low();
        }
    }
}

/// Hall信号シミュレータタスク
///
/// `STEP_PERIOD_MS` ごとにシーケンスを1つ進めます。
#[embassy_executor::task]
pub async fn hall_simulator_task(mut outputs: [Output<'static>; 3]) {
    let mut simulator = HallSimulator::new(
        config::simulator::FAULT_INTERVAL_CYCLES,
        config::simulator::FAULT_HOLD_STEPS,
    );
    drive(&mut outputs, simulator.current());

    info!(
        "Hall simulator started: {}ms/step, fault interval {} cycles, hold {} steps",
        config::simulator::STEP_PERIOD_MS,
        config::simulator::FAULT_INTERVAL_CYCLES,
        config::simulator::FAULT_HOLD_STEPS
    );

    let mut ticker = Ticker::every(Duration::from_millis(config::simulator::STEP_PERIOD_MS));

    loop {
        ticker.next().await;

        let step = simulator.step();
        drive(&mut outputs, step.code);

        if step.injected_fault {
            debug!(
                "Simulator: injected wrong transition to {} (cycle {})",
                step.code.bits(),
                simulator.cycles()
            );
        }

        if step.period_match {
            SIMULATOR_PERIOD_MATCH.signal(());
        }
    }
}
