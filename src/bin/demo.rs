#![no_std]
#![no_main]

use bitbang_1_wire_master::devices::Family;
use bitbang_1_wire_master::{DeviceId, HalDelay, OneWireMaster, OpenDrain, Timing};
use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::gpio::{Level, OutputOpenDrain};
use embassy_time::{Delay, Duration, Timer};
use {defmt_rtt as _, panic_halt as _};

const CONVERT_T: u8 = 0x44;
const READ_SCRATCHPAD: u8 = 0xbe;

#[embassy_executor::main]
async fn main(_spawner: Spawner) -> ! {
    info!("hello.");

    let p = embassy_rp::init(Default::default());
    let pin = OpenDrain::new(OutputOpenDrain::new(p.PIN_15, Level::High));
    let mut owm: OneWireMaster<_, _, 8> =
        OneWireMaster::new(pin, HalDelay::new(Delay), Timing::STANDARD_US);

    if !owm.reset() {
        warn!("No devices responded to 1W bus reset, trying other widths");
        match owm.try_auto_timing() {
            Ok(width) => info!("reset pulse now {=u32}us", width),
            Err(err) => warn!("{}", err),
        }
    }

    let report = owm.search_exhaustive();
    info!("Search: {}", report);
    for (slot, id) in owm.registry().iter().take(report.found).enumerate() {
        info!("  {}: {} {}", slot, id, Family::of(*id));
    }

    loop {
        for slot in 0..report.found {
            if !Family::of(DeviceId(owm.get_id(slot))).is_thermometer() {
                continue;
            }
            if !owm.reset() {
                break;
            }
            owm.match_rom(slot);
            owm.write_byte(CONVERT_T);
            Timer::after(Duration::from_millis(750)).await;

            if !owm.reset() {
                break;
            }
            owm.match_rom(slot);
            owm.write_byte(READ_SCRATCHPAD);
            let mut scratchpad = [0u8; 9];
            owm.read_bytes(&mut scratchpad);
            let raw = i16::from_le_bytes([scratchpad[0], scratchpad[1]]);
            info!("{}: raw {=i16} ({=i16} C), {:x}", slot, raw, raw >> 4, scratchpad);
        }
        info!("--");
        Timer::after(Duration::from_secs(10)).await;
    }
}
