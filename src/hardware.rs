//! ハードウェア初期化モジュール
//!
//! ペリフェラルの初期化ロジックを集約します。

use embassy_stm32::{
    gpio::{Level, Output, Speed},
    mode::Async,
    peripherals,
    usart::{self, ConfigError, UartTx},
    Config, Peri,
};

use g4_hall_posif::config;

use crate::fmt::*;
use crate::hall_tim;
use crate::soft_posif;

/// RCCクロック設定を初期化
///
/// HSI → PLL（÷4 × 85 ÷ 2）で170MHz生成
pub fn create_clock_config() -> Config {
    let mut config = Config::default();
    {
        use embassy_stm32::rcc::{Pll, PllMul, PllPreDiv, PllRDiv, PllSource, Sysclk};

        config.rcc.hsi = true;
        config.rcc.pll = Some(Pll {
            source: PllSource::HSI,
            prediv: PllPreDiv::DIV4,
            mul: PllMul::MUL85,
            divp: None,
            divq: None,
            divr: Some(PllRDiv::DIV2),
        });
        config.rcc.sys = Sysclk::PLL1_R; // システムクロックをPLLに設定
    }
    config
}

/// TIM4 Hallセンサーインターフェース初期化
///
/// PB6=H1、PB7=H2、PB8=H3（XORモード）
///
/// # Safety
/// PACを使用した直接レジスタ操作を含む
pub unsafe fn init_hall_sensor() {
    info!("Initializing TIM4 Hall Sensor Interface (XOR mode)...");
    hall_tim::init_hall_timer();
    info!("TIM4 Hall Sensor Interface initialized");
}

/// ソフトPOSIFのサービスリクエスト割り込み初期化
///
/// # Safety
/// NVICの直接操作を含む
pub unsafe fn init_service_requests() {
    soft_posif::init_service_requests();
    info!(
        "Service requests: SR0 prio={=u8:#x}, SR1 prio={=u8:#x}",
        soft_posif::SR0_PRIORITY,
        soft_posif::SR1_PRIORITY
    );
}

/// レポート出力用UART（USART2 TX = PA2、DMA送信）
pub fn init_report_uart(
    usart: Peri<'static, peripherals::USART2>,
    tx: Peri<'static, peripherals::PA2>,
    tx_dma: Peri<'static, peripherals::DMA1_CH1>,
) -> Result<UartTx<'static, Async>, ConfigError> {
    let mut uart_config = usart::Config::default();
    uart_config.baudrate = config::uart::BAUDRATE;

    let uart = UartTx::new(usart, tx, tx_dma, uart_config)?;
    info!("USART2 report channel: {} baud", config::uart::BAUDRATE);
    Ok(uart)
}

/// Hallシミュレータ出力（PC6=H1、PC7=H2、PC8=H3）
///
/// PB6/PB7/PB8にジャンパ接続して使用
pub fn init_simulator_outputs(
    h1: Peri<'static, peripherals::PC6>,
    h2: Peri<'static, peripherals::PC7>,
    h3: Peri<'static, peripherals::PC8>,
) -> [Output<'static>; 3] {
    [
        Output::new(h1, Level::Low, Speed::High),
        Output::new(h2, Level::Low, Speed::High),
        Output::new(h3, Level::Low, Speed::High),
    ]
}
