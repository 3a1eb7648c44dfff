#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[cfg(target_os = "none")]
mod fmt;
#[cfg(target_os = "none")]
mod hall_tim;
#[cfg(target_os = "none")]
mod hardware;
#[cfg(target_os = "none")]
mod soft_posif;
#[cfg(target_os = "none")]
mod state;
#[cfg(target_os = "none")]
mod tasks;

#[cfg(all(target_os = "none", not(feature = "defmt")))]
use panic_halt as _;
#[cfg(all(target_os = "none", feature = "defmt"))]
use {defmt_rtt as _, panic_probe as _};

#[cfg(target_os = "none")]
#[embassy_executor::main]
async fn main(spawner: embassy_executor::Spawner) {
    use embassy_time::{Duration, Timer};

    use g4_hall_posif::config::{self, ReportConfig};
    use g4_hall_posif::hall::{PatternDriver, WarmUp};
    use g4_hall_posif::posif::{HallEvent, PosifConfig, PositionInterface, ServiceRequest};
    use g4_hall_posif::PeriodicReporter;

    use fmt::*;
    use hall_tim::{GpioHallInputs, HallCaptureTimer};
    use soft_posif::SoftPosif;
    use state::{CONTROLLER, SIMULATOR_PERIOD_MATCH};
    use tasks::{hall_simulator_task, report_task};

    // ハードウェア初期化
    let p = embassy_stm32::init(hardware::create_clock_config());

    info!("═══════════════════════════════════════════════════════════════════");
    info!("    STM32G4: Hall position interface example");
    info!("    STM32G431VB @ 170MHz • TIM4 Hall capture • soft POSIF");
    info!("═══════════════════════════════════════════════════════════════════");

    // キャプチャタイマー（TIM4）
    unsafe { hardware::init_hall_sensor() };
    let mut timer = HallCaptureTimer;

    // ティック長はプリスケーラレジスタから求める
    let nanoseconds_per_tick =
        unwrap!(CONTROLLER.calibrate(&timer, config::timer::CLOCK_MHZ));
    info!("Capture tick: {}ns", nanoseconds_per_tick);

    // 位置インターフェース: 正常遷移 → SR0（高優先度）、異常遷移 → SR1
    let mut posif = SoftPosif;
    unwrap!(posif.configure(&PosifConfig::default()));
    posif.enable_event(HallEvent::Correct);
    posif.route_event(HallEvent::Correct, ServiceRequest::Sr0);
    posif.enable_event(HallEvent::Wrong);
    posif.route_event(HallEvent::Wrong, ServiceRequest::Sr1);
    unsafe { hardware::init_service_requests() };

    // レポート出力
    let reporter = unwrap!(PeriodicReporter::new(ReportConfig::default()));
    let uart = unwrap!(hardware::init_report_uart(p.USART2, p.PA2, p.DMA1_CH1));
    spawner.spawn(report_task(uart, reporter)).unwrap();

    // Hall信号シミュレータ
    let outputs = hardware::init_simulator_outputs(p.PC6, p.PC7, p.PC8);
    spawner.spawn(hall_simulator_task(outputs)).unwrap();

    let mut warm_up = WarmUp::new(config::warm_up::PULSES);
    let mut driver = PatternDriver::new();
    let mut inputs = GpioHallInputs;

    info!(
        "Waiting for {} simulator pulses before measurement",
        config::warm_up::PULSES
    );

    loop {
        if warm_up.is_armed() {
            driver.update(&mut inputs, &mut posif);
        } else if SIMULATOR_PERIOD_MATCH.try_take().is_some() && warm_up.on_pulse() {
            let pattern = driver.start_measurement(&mut inputs, &mut posif, &mut timer);
            info!(
                "Hall measurement started after {} pulses: current={}, expected={}",
                warm_up.pulses(),
                pattern.current.bits(),
                pattern.expected.bits()
            );
        }

        Timer::after(Duration::from_millis(1)).await;
    }
}

/// ホストビルド用（ファームウェアは `thumbv7em-none-eabihf` でのみ動作）
#[cfg(not(target_os = "none"))]
fn main() {}
