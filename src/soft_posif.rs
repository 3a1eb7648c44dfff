//! ソフトウェア位置インターフェース（ソフトPOSIF）
//!
//! STM32G4にはHallパターン比較器を持つ位置インターフェースが無いため、
//! TIM4のキャプチャ割り込みで得たエッジ後のHall状態をここで分類します。
//!
//! - シャドウ／アクティブの2段レジスタでパターン（`expected << 3 | current`）を保持
//! - 期待パターンに一致 → 正常遷移イベント、現在パターンに一致 → イベント無し、
//!   それ以外 → 異常遷移イベント
//! - イベントは割り当てられたサービスリクエスト線（未使用ペリフェラルのNVICベクタ）を
//!   ペンディングにして通知する
//!
//! | サービスリクエスト | NVICベクタ | 優先度 | 用途 |
//! |---|---|---|---|
//! | SR0 | LPTIM1 | 0x00 | 正常遷移 |
//! | SR1 | UCPD1  | 0x10 | 異常遷移 |

use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use cortex_m::peripheral::NVIC;
use embassy_stm32::pac::Interrupt;

use g4_hall_posif::hall::{HallCode, HallPattern};
use g4_hall_posif::posif::{
    HallEvent, InputSelection, PosifConfig, PosifMode, PositionInterface, ServiceRequest,
};
use g4_hall_posif::Error;

use crate::fmt::*;
use crate::hall_tim::{self, HallCaptureTimer};
use crate::state::CONTROLLER;

/// シャドウレジスタ（パック済みパターン）
static SHADOW_PATTERN: AtomicU8 = AtomicU8::new(0);

/// アクティブレジスタ（分類に使用するパターン）
static ACTIVE_PATTERN: AtomicU8 = AtomicU8::new(0);

static RUNNING: AtomicBool = AtomicBool::new(false);

/// 発生中のイベント（`HallEvent::mask`）
static PENDING_EVENTS: AtomicU8 = AtomicU8::new(0);

/// 有効なイベント
static ENABLED_EVENTS: AtomicU8 = AtomicU8::new(0);

/// SR1に割り当てられたイベント（ビットが立っていなければSR0）
static SR1_EVENTS: AtomicU8 = AtomicU8::new(0);

/// 正常遷移の優先度（高）
pub const SR0_PRIORITY: u8 = 0x00;
/// 異常遷移の優先度（低）
pub const SR1_PRIORITY: u8 = 0x10;

/// ソフトPOSIFのハンドル
///
/// 状態はすべて静的アトミックにあるため、メインループと割り込みハンドラで
/// それぞれ生成して使用する。
pub struct SoftPosif;

impl SoftPosif {
    #[inline]
    fn interrupt(service_request: ServiceRequest) -> Interrupt {
        match service_request {
            ServiceRequest::Sr0 => Interrupt::LPTIM1,
            ServiceRequest::Sr1 => Interrupt::UCPD1,
        }
    }

    fn service_request_of(event: HallEvent) -> ServiceRequest {
        if SR1_EVENTS.load(Ordering::Relaxed) & event.mask() != 0 {
            ServiceRequest::Sr1
        } else {
            ServiceRequest::Sr0
        }
    }

    /// イベントを発生させ、有効なら割り当て先のサービスリクエストをペンディング
    fn raise(event: HallEvent) {
        PENDING_EVENTS.fetch_or(event.mask(), Ordering::AcqRel);
        if ENABLED_EVENTS.load(Ordering::Relaxed) & event.mask() != 0 {
            NVIC::pend(Self::interrupt(Self::service_request_of(event)));
        }
    }
}

impl PositionInterface for SoftPosif {
    fn configure(&mut self, config: &PosifConfig) -> Result<(), Error> {
        if config.mode != PosifMode::HallSensor {
            return Err(Error::UnsupportedMode);
        }
        // 入力セットAのみ（PB6/PB7/PB8）
        if config.inputs != InputSelection::A {
            return Err(Error::UnsupportedInputs);
        }

        hall_tim::set_input_filter(config.filter);
        PENDING_EVENTS.store(0, Ordering::Relaxed);
        info!("Soft POSIF configured: {}", config);
        Ok(())
    }

    fn start(&mut self) {
        RUNNING.store(true, Ordering::Release);
    }

    fn stop(&mut self) {
        RUNNING.store(false, Ordering::Release);
    }

    fn set_hall_patterns(&mut self, packed: u8) {
        SHADOW_PATTERN.store(packed, Ordering::Relaxed);
    }

    fn update_hall_pattern(&mut self) {
        ACTIVE_PATTERN.store(SHADOW_PATTERN.load(Ordering::Relaxed), Ordering::Release);
    }

    fn acknowledge(&mut self, event: HallEvent) {
        PENDING_EVENTS.fetch_and(!event.mask(), Ordering::AcqRel);
    }

    fn enable_event(&mut self, event: HallEvent) {
        ENABLED_EVENTS.fetch_or(event.mask(), Ordering::Relaxed);
    }

    fn route_event(&mut self, event: HallEvent, service_request: ServiceRequest) {
        match service_request {
            ServiceRequest::Sr0 => SR1_EVENTS.fetch_and(!event.mask(), Ordering::Relaxed),
            ServiceRequest::Sr1 => SR1_EVENTS.fetch_or(event.mask(), Ordering::Relaxed),
        };
    }
}

/// Hallエッジの分類（TIM4割り込みから呼ばれる）
///
/// 計測停止中は常に `None`。
pub fn classify_edge(code: HallCode) -> Option<HallEvent> {
    if !RUNNING.load(Ordering::Acquire) {
        return None;
    }

    HallPattern::unpack(ACTIVE_PATTERN.load(Ordering::Acquire)).classify(code)
}

/// イベントを発生させる（TIM4割り込みから呼ばれる）
pub fn raise(event: HallEvent) {
    SoftPosif::raise(event);
}

/// サービスリクエスト割り込みの共通処理
///
/// 割り当てられたイベントのうち発生中のものを分類器に渡す。
fn service_request_irq(service_request: ServiceRequest) {
    let pending = PENDING_EVENTS.load(Ordering::Acquire);
    let mut posif = SoftPosif;

    for event in [HallEvent::Correct, HallEvent::Wrong] {
        if pending & event.mask() == 0 || SoftPosif::service_request_of(event) != service_request {
            continue;
        }
        match event {
            HallEvent::Correct => {
                CONTROLLER.service_correct_event(&mut HallCaptureTimer, &mut posif)
            }
            HallEvent::Wrong => CONTROLLER.on_incorrect_transition(&mut posif),
        }
    }
}

/// サービスリクエスト線のNVIC設定
///
/// # Safety
/// NVICの優先度変更を含むため、割り込み有効化前に1回だけ呼ぶ
pub unsafe fn init_service_requests() {
    let mut cp = cortex_m::Peripherals::steal();
    for (service_request, priority) in [
        (ServiceRequest::Sr0, SR0_PRIORITY),
        (ServiceRequest::Sr1, SR1_PRIORITY),
    ] {
        let interrupt = SoftPosif::interrupt(service_request);
        cp.NVIC.set_priority(interrupt, priority);
        NVIC::unpend(interrupt);
        NVIC::unmask(interrupt);
    }
}

/// SR0（正常遷移）のエントリーポイント
#[allow(non_snake_case)]
#[no_mangle]
pub unsafe extern "C" fn LPTIM1() {
    service_request_irq(ServiceRequest::Sr0);
}

/// SR1（異常遷移）のエントリーポイント
#[allow(non_snake_case)]
#[no_mangle]
pub unsafe extern "C" fn UCPD1() {
    service_request_irq(ServiceRequest::Sr1);
}
