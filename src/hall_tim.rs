//! TIM4ベースのHallエッジキャプチャ
//!
//! STM32のハードウェアHall Sensor Interface Mode（XORモード）を使用して、
//! 3つのHallセンサー入力のエッジ間隔をキャプチャします。
//!
//! ## ハードウェア構成
//! - TIM4_CH1 (PB6): Hall H1
//! - TIM4_CH2 (PB7): Hall H2
//! - TIM4_CH3 (PB8): Hall H3
//! - クロック: 170MHz (APB1)、PSC=169 で 1ティック = 1μs
//!
//! ## 動作原理（参照: HAL_TIMEx_HallSensor_Init）
//! 1. 3つのHall入力がXORされてTI1に接続される（CR2.TI1S=1）
//! 2. TI1のエッジ検出がトリガーとして選択される（SMCR.TS=TI1F_ED）
//! 3. トリガーエッジでカウンターがリセットされる（SMCR.SMS=RESET）
//! 4. エッジごとにTIM4_CCR1に前回エッジからのカウント値がキャプチャされる
//! 5. CC1割り込みでHall状態をソフトPOSIFで分類し、正常遷移間の間隔を積算する
//! 6. UPDATE割り込み（オーバーフロー）をカウントして16ビットを超える間隔を延長する

use core::cell::Cell;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use embassy_stm32::pac;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

use g4_hall_posif::config;
use g4_hall_posif::hall::{HallCode, HallLine, IntervalAccumulator};
use g4_hall_posif::posif::{CaptureTimer, HallInputs, InputFilter};

use crate::soft_posif;

/// 最後のキャプチャ値（オーバーフロー延長済み）
static CAPTURED_TICKS: AtomicU32 = AtomicU32::new(0);

/// オーバーフローカウンタ（65536カウントごとにインクリメント、キャプチャ時にリセット）
static OVERFLOW_COUNTER: AtomicU32 = AtomicU32::new(0);

/// キャプチャイベント（正常遷移ハンドラがクリア）
static CAPTURE_EVENT: AtomicBool = AtomicBool::new(false);

/// 前回の正常遷移からの経過ティック
static ACCUMULATOR: Mutex<CriticalSectionRawMutex, Cell<IntervalAccumulator>> =
    Mutex::new(Cell::new(IntervalAccumulator::new()));

/// TIM4 Hall Sensor Interface の初期化
///
/// カウンタは停止したまま。計測開始は [`HallCaptureTimer::start`] で行う。
///
/// # Safety
/// PACを使用した直接的なレジスタ操作を含むため、unsafe
pub unsafe fn init_hall_timer() {
    let rcc = pac::RCC;
    let tim4 = pac::TIM4;
    let gpiob = pac::GPIOB;

    // 1. クロック有効化
    rcc.ahb2enr().modify(|w| w.set_gpioben(true)); // GPIOB
    rcc.apb1enr1().modify(|w| w.set_tim4en(true)); // TIM4

    // 2. GPIO設定（PB6/PB7/PB8をAlternate Function AF2に設定）
    // シミュレータ出力とはジャンパ接続のためプルアップ無し
    for pin in 6..=8 {
        gpiob
            .moder()
            .modify(|w| w.set_moder(pin, pac::gpio::vals::Moder::ALTERNATE));
        gpiob
            .pupdr()
            .modify(|w| w.set_pupdr(pin, pac::gpio::vals::Pupdr::FLOATING));
        gpiob
            .ospeedr()
            .modify(|w| w.set_ospeedr(pin, pac::gpio::vals::Ospeedr::VERY_HIGH_SPEED));
    }
    gpiob.afr(0).modify(|w| {
        w.set_afr(6, 2); // PB6: AF2 (AFRL)
        w.set_afr(7, 2); // PB7: AF2 (AFRL)
    });
    gpiob.afr(1).modify(|w| w.set_afr(0, 2)); // PB8: AF2 (AFRH[0])

    // 3. TIM4設定
    tim4.cr1().modify(|w| w.set_cen(false));

    // 1ティック = PRESCALER_DIVIDER / 170MHz
    tim4.psc()
        .write_value((config::timer::PRESCALER_DIVIDER - 1) as u16);
    tim4.arr().write_value(pac::timer::regs::ArrCore(0xFFFF)); // ARR = 65535

    // 4. Hall Sensor Interface Mode設定
    // CR2.TI1S = 1: CH1/CH2/CH3をXOR -> TI1
    tim4.cr2().modify(|w| {
        w.set_ti1s(pac::timer::vals::Ti1s::XOR);
    });

    // SMCR設定: TI1のエッジ検出をトリガーにしてカウンターをリセット
    tim4.smcr().modify(|w| {
        w.set_ts(pac::timer::vals::Ts::TI1F_ED);
        w.set_sms(pac::timer::vals::Sms::RESET_MODE);
    });

    // 5. Input Capture設定（CH1でキャプチャ、IC1はTRCにマップ）
    // 入力フィルタはソフトPOSIFのconfigureで設定
    tim4.ccmr_input(0).modify(|w| {
        w.set_ccs(0, pac::timer::vals::CcmrInputCcs::TRC);
    });

    // 6. CCER: CC1E=1（キャプチャ有効）、立ち上がりエッジ（TI1F_EDで両エッジ検出済み）
    tim4.ccer().modify(|w| {
        w.set_cce(0, true);
        w.set_ccp(0, false);
    });

    // 7. 割り込み設定: CC1IE（キャプチャ）、UIE（オーバーフロー）
    tim4.dier().modify(|w| {
        w.set_ccie(0, true);
        w.set_uie(true);
    });

    // 8. 割り込み有効化（NVIC）
    // 優先度2（0x20）: 分類結果を通知するサービスリクエスト（0x00 / 0x10）より低い
    unsafe {
        cortex_m::peripheral::NVIC::unmask(pac::Interrupt::TIM4);
        let mut cp = cortex_m::Peripherals::steal();
        cp.NVIC.set_priority(pac::Interrupt::TIM4, 0x20);
    }

    // 9. カウンタとステータスをリセット（CENはstartで設定）
    tim4.cnt().write_value(pac::timer::regs::CntCore(0));
    tim4.sr().write(|w| w.0 = 0);
    tim4.egr().write(|w| w.set_ug(true)); // Update生成（プリスケーラ反映）
    tim4.sr().write(|w| w.0 = 0); // UGで立ったUIFをクリア
    tim4.cr1()
        .modify(|w| w.set_urs(pac::timer::vals::Urs::COUNTER_ONLY));
}

/// IC1入力フィルタを設定
pub fn set_input_filter(filter: InputFilter) {
    let value = match filter {
        InputFilter::Disabled => pac::timer::vals::FilterValue::NO_FILTER,
        InputFilter::Samples2 => pac::timer::vals::FilterValue::FCK_INT_N2,
        InputFilter::Samples4 => pac::timer::vals::FilterValue::FCK_INT_N4,
        InputFilter::Samples8 => pac::timer::vals::FilterValue::FCK_INT_N8,
    };
    pac::TIM4.ccmr_input(0).modify(|w| w.set_icf(0, value));
}

/// Hall入力（PB6/PB7/PB8）を直接読み取り
#[inline(always)]
pub fn read_hall_code() -> HallCode {
    let idr = pac::GPIOB.idr().read();
    let h1 = idr.idr(6) as u8; // PB6
    let h2 = idr.idr(7) as u8; // PB7
    let h3 = idr.idr(8) as u8; // PB8
    HallCode::from_bits(h1 | (h2 << 1) | (h3 << 2))
}

/// TIM4割り込みハンドラー（Capture/Compare 1 + Update）
///
/// # Safety
/// 割り込みコンテキストで実行されるため、処理は最小限にする
#[inline(always)]
pub unsafe fn tim4_irq_handler() {
    let tim4 = pac::TIM4;

    let sr = tim4.sr().read();

    // UPDATE割り込み（オーバーフロー）
    if sr.uif() {
        tim4.sr().modify(|w| w.set_uif(false));
        OVERFLOW_COUNTER.fetch_add(1, Ordering::Relaxed);
    }

    // CAPTURE/COMPARE 1割り込み（Hallエッジ検出）
    if sr.ccif(0) {
        tim4.sr().modify(|w| w.set_ccif(0, false));

        // 1. キャプチャ値読み取り
        // オーバーフローカウンタはキャプチャごとにリセットされるため、
        // 間隔 = overflow * 65536 + capture
        let capture = tim4.ccr(0).read().ccr() as u32;
        let overflow = OVERFLOW_COUNTER.swap(0, Ordering::Relaxed);
        let elapsed = overflow
            .checked_mul(1 << 16)
            .and_then(|high| high.checked_add(capture))
            .unwrap_or(u32::MAX);

        // 2. エッジ後のHall状態をソフトPOSIFで分類
        let event = soft_posif::classify_edge(read_hall_code());

        // 3. 正常遷移でのみ間隔を確定（異常遷移の間隔は積算）
        let interval = ACCUMULATOR.lock(|cell| {
            let mut acc = cell.get();
            let interval = acc.on_edge(elapsed, event);
            cell.set(acc);
            interval
        });
        if let Some(ticks) = interval {
            CAPTURED_TICKS.store(ticks, Ordering::Relaxed);
            CAPTURE_EVENT.store(true, Ordering::Release);
        }

        // 4. サービスリクエストは優先度が高いため、キャプチャ値の確定後に発生させる
        if let Some(event) = event {
            soft_posif::raise(event);
        }
    }
}

/// TIM4割り込みのRust側エントリーポイント
#[allow(non_snake_case)]
#[no_mangle]
pub unsafe extern "C" fn TIM4() {
    tim4_irq_handler();
}

/// TIM4をキャプチャタイマーとして扱うハンドル
pub struct HallCaptureTimer;

impl CaptureTimer for HallCaptureTimer {
    fn start(&mut self) {
        OVERFLOW_COUNTER.store(0, Ordering::Relaxed);
        ACCUMULATOR.lock(|cell| cell.set(IntervalAccumulator::new()));
        pac::TIM4.cnt().write_value(pac::timer::regs::CntCore(0));
        pac::TIM4.cr1().modify(|w| w.set_cen(true));
    }

    fn has_capture_event(&self) -> bool {
        CAPTURE_EVENT.load(Ordering::Acquire)
    }

    fn clear_event(&mut self) {
        CAPTURE_EVENT.store(false, Ordering::Relaxed);
    }

    fn captured_ticks(&self, _channel: u8) -> u32 {
        // CH1のみ使用
        CAPTURED_TICKS.load(Ordering::Relaxed)
    }

    fn prescaler_divider(&self) -> u32 {
        pac::TIM4.psc().read() as u32 + 1
    }
}

/// メインループ用のHall入力
pub struct GpioHallInputs;

impl HallInputs for GpioHallInputs {
    fn read_line(&mut self, line: HallLine) -> bool {
        read_hall_code().line(line)
    }

    fn read_code(&mut self) -> HallCode {
        // 3ラインを1回のIDR読み取りで取得
        read_hall_code()
    }
}
