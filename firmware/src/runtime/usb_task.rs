use super::{CONSOLE_RX_QUEUE, ConsoleFrame, OUTBOUND_QUEUE, USB_STORAGE};
use crate::link::{LINE_CAPACITY, OutboundLine};
use crate::usb::{self, UsbDeviceStrings};
use embassy_futures::join::join;
use embassy_futures::select::{Either3, select3};
use embassy_stm32 as hal;
use embassy_stm32::Peri;
use embassy_usb::class::cdc_acm::{ControlChanged, Receiver, Sender};
use embassy_usb::driver::{Driver, EndpointError};

embassy_stm32::bind_interrupts!(struct UsbIrqs {
    USB_UCPD1_2 => embassy_stm32::usb::InterruptHandler<hal::peripherals::USB>;
});

const PACKET_LEN: usize = usb::MAX_PACKET_SIZE as usize;

#[embassy_executor::task]
pub async fn run(
    usb: Peri<'static, hal::peripherals::USB>,
    dp: Peri<'static, hal::peripherals::PA12>,
    dm: Peri<'static, hal::peripherals::PA11>,
) -> ! {
    let storage = USB_STORAGE.init(usb::UsbDeviceStorage::new());
    let driver = embassy_stm32::usb::Driver::new(usb, UsbIrqs, dp, dm);

    let usb::UsbConsole {
        mut device,
        console,
    } = usb::UsbConsole::new(driver, storage, UsbDeviceStrings::default());

    join(
        device.run(),
        run_console_interface(console.sender, console.receiver, console.control),
    )
    .await;
    loop {
        core::future::pending::<()>().await;
    }
}

async fn run_console_interface<D>(
    mut sender: Sender<'static, D>,
    mut receiver: Receiver<'static, D>,
    control: ControlChanged<'static>,
) -> !
where
    D: Driver<'static>,
{
    let rx_queue = CONSOLE_RX_QUEUE.sender();
    let tx_queue = OUTBOUND_QUEUE.receiver();
    let mut ingress = [0u8; PACKET_LEN];
    let mut pending_tx: Option<OutboundLine> = None;

    loop {
        join(receiver.wait_connection(), sender.wait_connection()).await;
        wait_for_dtr(&control, &mut sender).await;

        defmt::info!("usb: console connected");

        loop {
            match select3(
                receiver.read_packet(&mut ingress),
                async {
                    if pending_tx.is_none() {
                        pending_tx = Some(tx_queue.receive().await);
                    }
                    if let Some(line) = pending_tx.as_ref() {
                        write_line(&mut sender, line).await?;
                    }
                    pending_tx = None;
                    Ok::<(), EndpointError>(())
                },
                control.control_changed(),
            )
            .await
            {
                Either3::First(Ok(0)) => {}
                Either3::First(Ok(count)) => {
                    let mut frame = ConsoleFrame::new();
                    if frame.extend_from_slice(&ingress[..count]).is_err() {
                        defmt::warn!("usb: dropping console frame len={} (overflow)", count);
                        continue;
                    }
                    rx_queue.send(frame).await;
                }
                Either3::First(Err(EndpointError::Disabled))
                | Either3::Second(Err(EndpointError::Disabled)) => {
                    defmt::warn!("usb: console interface disabled");
                    break;
                }
                Either3::First(Err(_)) => defmt::warn!("usb: console read error"),
                Either3::Second(Err(_)) => defmt::warn!("usb: console write error"),
                Either3::Second(Ok(())) => {}
                Either3::Third(()) => {
                    if !sender.dtr() {
                        defmt::warn!("usb: console host dropped DTR");
                        break;
                    }
                }
            }
        }

        // Discard the half-typed line from the previous session.
        rx_queue.send(ConsoleFrame::new()).await;
    }
}

/// Writes one line plus CRLF, ending with a zero-length packet when needed.
async fn write_line<D>(sender: &mut Sender<'static, D>, line: &str) -> Result<(), EndpointError>
where
    D: Driver<'static>,
{
    let mut frame = [0u8; LINE_CAPACITY + 2];
    let len = usb::frame_line(line, &mut frame);
    for chunk in frame[..len].chunks(PACKET_LEN) {
        sender.write_packet(chunk).await?;
    }
    if len % PACKET_LEN == 0 {
        sender.write_packet(&[]).await?;
    }
    Ok(())
}

async fn wait_for_dtr<D>(control: &ControlChanged<'static>, sender: &mut Sender<'static, D>)
where
    D: Driver<'static>,
{
    while !sender.dtr() {
        control.control_changed().await;
    }
}
