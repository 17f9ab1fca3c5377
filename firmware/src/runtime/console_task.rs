use super::{COMMAND_QUEUE, CONSOLE_RX_QUEUE, OUTBOUND_QUEUE, SCHEDULE_QUEUE};
use crate::board::uptime_ms;
use crate::console::ConsoleSession;
use crate::link::{self, LinkDispatcher};

/// Buttons wired on the board; `press` on any other channel is rejected.
const BUTTONS: u8 = 4;

#[embassy_executor::task]
pub async fn run() -> ! {
    let outbound = OUTBOUND_QUEUE.sender();
    let dispatcher = LinkDispatcher::new(
        COMMAND_QUEUE.sender(),
        SCHEDULE_QUEUE.sender(),
        OUTBOUND_QUEUE.sender(),
        BUTTONS,
        uptime_ms,
    );
    let mut session = ConsoleSession::new(dispatcher);
    let frames = CONSOLE_RX_QUEUE.receiver();

    loop {
        let frame = frames.receive().await;
        if frame.is_empty() {
            session.reset();
            continue;
        }

        for &byte in &frame {
            if let Err(error) = session.ingest(byte) {
                defmt::warn!("console: {}", defmt::Display2Format(&error));
                if let Ok(line) = link::render_line(format_args!("error: {error}")) {
                    let _ = outbound.try_send(line);
                }
            }
        }
    }
}
