//! レポートタスク
//!
//! 1kHzティックで周期レポータを駆動し、出力行をUARTへ送信します。
//! 割り込みコンテキストからはUARTに触れません。

use embassy_stm32::{mode::Async, usart::UartTx};
use embassy_time::{with_timeout, Duration, Ticker};
use heapless::String;

use g4_hall_posif::config;
use g4_hall_posif::reporter::BANNER;
use g4_hall_posif::PeriodicReporter;

use crate::fmt::*;
use crate::state::CONTROLLER;

/// 1行をタイムアウト付きで送信（送れなかった行は破棄）
async fn write_line(tx: &mut UartTx<'static, Async>, line: &str) {
    let timeout = Duration::from_millis(config::uart::WRITE_TIMEOUT_MS);
    match with_timeout(timeout, tx.write(line.as_bytes())).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("UART write failed: {}", e),
        Err(_) => warn!("UART write timed out, line dropped"),
    }
}

/// レポートタスク
#[embassy_executor::task]
pub async fn report_task(mut tx: UartTx<'static, Async>, mut reporter: PeriodicReporter) {
    write_line(&mut tx, BANNER).await;
    info!("Report task started");

    let mut ticker = Ticker::every(Duration::from_hz(config::TICKS_PER_SECOND));
    let mut line: String<{ config::uart::LINE_CAPACITY }> = String::new();

    loop {
        ticker.next().await;

        line.clear();
        let Some(report) = reporter.on_tick(&CONTROLLER, &mut line) else {
            continue;
        };
        info!("{}", report);

        if line.is_empty() {
            warn!("Report line exceeds {} bytes, dropped", config::uart::LINE_CAPACITY);
            continue;
        }
        write_line(&mut tx, &line).await;
    }
}
