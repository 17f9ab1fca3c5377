use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::gpio::{Input, Level, Output, OutputType, Pull, Speed};
use embassy_stm32::time::Hertz;
use embassy_stm32::timer::low_level::CountingMode;
use embassy_stm32::timer::simple_pwm::{PwmPin, SimplePwm};
use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;
use embassy_sync::channel::Channel;
use heapless::Vec;
use static_cell::StaticCell;

use alarm_core::orchestrator::{AlarmConfig, AlarmController};

use crate::board::PuzzleBoard;
use crate::link::{
    ChannelScheduleSource, ChannelTelemetrySink, CommandQueue, OutboundQueue, ScheduleQueue,
};
use crate::usb;

mod alarm_task;
mod console_task;
mod usb_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

/// Depth of the USB → console byte frame queue.
const CONSOLE_RX_DEPTH: usize = 4;
/// Seed for the first round; the alarm task re-keys from uptime after each round.
const BOOT_SEED: u64 = 0x00A1_A2A3;

/// Raw bytes read from one USB packet. An empty frame marks a disconnect.
pub(super) type ConsoleFrame = Vec<u8, { usb::MAX_PACKET_SIZE as usize }>;

pub(super) type FirmwareController = AlarmController<
    PuzzleBoard<'static>,
    ChannelTelemetrySink<'static>,
    ChannelScheduleSource<'static>,
>;

pub(super) static COMMAND_QUEUE: CommandQueue = Channel::new();
pub(super) static SCHEDULE_QUEUE: ScheduleQueue = Channel::new();
pub(super) static OUTBOUND_QUEUE: OutboundQueue = Channel::new();
pub(super) static CONSOLE_RX_QUEUE: Channel<ThreadModeRawMutex, ConsoleFrame, CONSOLE_RX_DEPTH> =
    Channel::new();
pub(super) static USB_STORAGE: StaticCell<usb::UsbDeviceStorage> = StaticCell::new();

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let config = hal::Config::default();
    let hal::Peripherals {
        PA0,
        PA1,
        PA4,
        PA5,
        PA6,
        PB3,
        PB4,
        PB5,
        PB6,
        TIM3,
        USB,
        PA11,
        PA12,
        ..
    } = hal::init(config);

    let buzzer = SimplePwm::new(
        TIM3,
        Some(PwmPin::new(PA6, OutputType::PushPull)),
        None,
        None,
        None,
        Hertz::hz(500),
        CountingMode::EdgeAlignedUp,
    );
    let board = PuzzleBoard::new(
        [
            Output::new(PA0, Level::Low, Speed::Low),
            Output::new(PA1, Level::Low, Speed::Low),
            Output::new(PA4, Level::Low, Speed::Low),
            Output::new(PA5, Level::Low, Speed::Low),
        ],
        [
            Input::new(PB3, Pull::Up),
            Input::new(PB4, Pull::Up),
            Input::new(PB5, Pull::Up),
            Input::new(PB6, Pull::Up),
        ],
        buzzer,
    );

    let controller = AlarmController::with_components(
        board,
        AlarmConfig::DEFAULT,
        BOOT_SEED,
        ChannelTelemetrySink::new(OUTBOUND_QUEUE.sender()),
        ChannelScheduleSource::new(SCHEDULE_QUEUE.receiver()),
    );

    spawner
        .spawn(alarm_task::run(controller))
        .expect("failed to spawn alarm task");

    spawner
        .spawn(usb_task::run(USB, PA12, PA11))
        .expect("failed to spawn USB task");

    spawner
        .spawn(console_task::run())
        .expect("failed to spawn console task");

    core::future::pending::<()>().await;
}
