use embassy_time::Timer;

use super::{COMMAND_QUEUE, FirmwareController, OUTBOUND_QUEUE};
use crate::board::{core_duration_to_embassy, uptime_ms};
use crate::link::LineWriter;

#[embassy_executor::task]
pub async fn run(mut controller: FirmwareController) -> ! {
    let commands = COMMAND_QUEUE.receiver();
    let outbound = OUTBOUND_QUEUE.sender();
    let interval = core_duration_to_embassy(controller.config().service_interval);

    defmt::info!("alarm: controller ready");

    loop {
        while let Ok(command) = commands.try_receive() {
            let mut writer = LineWriter::new(&outbound);
            if controller.execute(command, &mut writer).is_err() {
                defmt::warn!("alarm: console reply failed");
            }
            let dropped = writer.finish();
            if dropped > 0 {
                defmt::warn!("alarm: dropped {} reply lines (host not reading)", dropped);
            }
        }

        if let Some(report) = controller.service().await {
            defmt::info!(
                "alarm: solved attempts={=u8} reaction={=u32}ms",
                report.attempts,
                report.reaction_ms
            );
            controller.reseed(uptime_ms());
        }

        Timer::after(interval).await;
    }
}
