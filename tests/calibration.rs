mod sim;

use bitbang_1_wire_master::{Error, Timing};
use sim::{bus, bus_with_timing, wire, SimBus};

const PROBE: u64 = 0x2200_000A_1B2C_3D4E;

#[test]
fn finds_a_longer_reset_pulse() {
    let w = wire(&[PROBE]);
    w.borrow_mut().reset_min = 500;
    let mut bus: SimBus<3> = bus(&w);
    assert!(!bus.reset());

    assert!(bus.auto_timing());
    // first width on the 60 + 3k grid past 500, plus the margin
    assert_eq!(bus.reset_pulse(), 504);

    assert!(bus.reset());
    assert_eq!(w.borrow().last_reset_width, Some(bus.reset_pulse() as u64));
    assert_eq!(bus.error_count(), 1);
}

#[test]
fn lenient_devices_get_a_short_pulse() {
    let w = wire(&[PROBE]);
    w.borrow_mut().reset_min = 100;
    let mut bus: SimBus<3> = bus(&w);
    assert_eq!(bus.try_auto_timing(), Ok(105));
    assert!(bus.reset());
    assert_eq!(bus.search().found, 1);
}

#[test]
fn empty_bus_keeps_old_width() {
    let w = wire(&[]);
    let mut bus: SimBus<3> = bus(&w);
    assert_eq!(bus.try_auto_timing(), Err(Error::CalibrationFailure));
    assert_eq!(bus.reset_pulse(), Timing::STANDARD_US.reset_pulse);
    assert_eq!(bus.error_count(), 1);
}

#[test]
fn failed_confirmation_restores_old_width() {
    let w = wire(&[PROBE]);
    w.borrow_mut().stuck_low = true;
    let mut bus: SimBus<3> = bus(&w);
    assert!(!bus.auto_timing());
    assert_eq!(bus.reset_pulse(), 480);
    // the timeout on the confirming reset, then the calibration itself
    assert_eq!(bus.error_count(), 2);
}

#[test]
fn manual_width_is_used_by_reset() {
    let w = wire(&[PROBE]);
    let mut bus: SimBus<3> = bus_with_timing(&w, Timing::STANDARD_US);
    bus.set_reset_pulse(700);
    assert!(bus.reset());
    assert_eq!(w.borrow().last_reset_width, Some(700));
}
