#![cfg_attr(not(test), no_std)]

//! Bit-banged 1Wire bus master: one open-drain GPIO with a pull-up (~4.7k),
//! driven and sampled in software with busy-wait delays.
//!
//! A bus handle owns its pin, its delay source, its timing table and a small
//! table of device identifiers. Typical use is to `search()` once at startup,
//! look up the device you want with `find_by_type()` or `find_by_id()`, and
//! from then on address it with `reset()` + `match_rom()` before each command:
//!
//! ```ignore
//! const TIMING: Timing = Timing::from_cpu_hz(16_000_000);
//! let pin = unsafe { PortPin::new(PIND, PORTD, DDRD, 4) };
//! let mut bus: OneWireMaster<_, _> = OneWireMaster::new(pin, BusyLoop, TIMING);
//! bus.search();
//! if let Some(slot) = bus.find_by_type(devices::Family::Ds18b20.code()) {
//!     if bus.reset() {
//!         bus.match_rom(slot);
//!         bus.write_byte(0x44); // Convert T
//!     }
//! }
//! ```
//!
//! Nothing in here is thread-safe. Every bit slot runs its timing-critical
//! phase inside `critical_section::with`, so the platform must supply a
//! critical-section implementation, and callers sharing one bus must serialize
//! whole transactions themselves. Separate buses on separate pins don't
//! interact.
//!
//! There's no CRC check on identifiers or data and no strong pull-up support
//! for parasite-powered parts.

mod fmt;

mod calibrate;
pub mod devices;
mod error;
mod pin;
mod rom;
mod search;
mod timing;

pub use error::Error;
pub use pin::{BusyLoop, DelayLoop, HalDelay, OneWirePin, OpenDrain, PortPin};
pub use rom::{DeviceId, Registry, RomId, DEFAULT_CAPACITY};
pub use search::{SearchReport, SearchState};
pub use timing::{Sweep, Timing};

/// ROM command bytes.
pub mod commands {
    pub const SEARCH_ROM: u8 = 0xf0;
    pub const ALARM_SEARCH: u8 = 0xec;
    pub const READ_ROM: u8 = 0x33;
    pub const MATCH_ROM: u8 = 0x55;
    pub const SKIP_ROM: u8 = 0xcc;
}

/// Bit-banged 1Wire driver for one wire, with room for `N` identifiers.
pub struct OneWireMaster<P, D, const N: usize = DEFAULT_CAPACITY> {
    pin: P,
    delay: D,
    timing: Timing,
    /// Current reset pulse width; starts at `timing.reset_pulse` and is
    /// retuned by `auto_timing`.
    reset_pulse: u32,
    errors: u32,
    registry: Registry<N>,
}

impl<P: OneWirePin, D: DelayLoop, const N: usize> OneWireMaster<P, D, N> {
    /// Take over `pin`, float the line and let it settle.
    pub fn new(mut pin: P, mut delay: D, timing: Timing) -> Self {
        pin.release_to_input();
        delay.spin(timing.settle);
        Self {
            pin,
            delay,
            timing,
            reset_pulse: timing.reset_pulse,
            errors: 0,
            registry: Registry::new(),
        }
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    pub fn reset_pulse(&self) -> u32 {
        self.reset_pulse
    }

    pub fn set_reset_pulse(&mut self, width: u32) {
        self.reset_pulse = width;
    }

    /// Faults seen since the bus was created. For debugging only.
    pub fn error_count(&self) -> u32 {
        self.errors
    }

    fn fault(&mut self, err: Error) -> Error {
        self.errors = self.errors.saturating_add(1);
        err
    }

    /// Reset the bus and report whether any device answered with a presence
    /// pulse. Every transaction starts here.
    pub fn reset(&mut self) -> bool {
        self.try_reset().is_ok()
    }

    /// As `reset`, keeping the reason for failure.
    pub fn try_reset(&mut self) -> Result<(), Error> {
        // If there's a 1 right after the reset pulse, nobody's home
        if !self.pulse_for_presence(self.reset_pulse) {
            warn!("1W no presence, reset pulse {=u32}", self.reset_pulse);
            return Err(self.fault(Error::NoPresence));
        }
        let mut polls: u32 = 0;
        while !self.pin.read_level() {
            if polls >= self.timing.presence_end {
                error!("1W reset timeout after {=u32} polls", polls);
                return Err(self.fault(Error::ResetTimeout));
            }
            self.delay.spin(1);
            polls += 1;
        }
        trace!("1W reset OK, presence ended after {=u32} polls", polls);
        self.delay.spin(self.timing.settle);
        Ok(())
    }

    /// Hold the line low for `width`, release it, and after `presence_wait`
    /// report whether something is holding it low.
    pub(crate) fn pulse_for_presence(&mut self, width: u32) -> bool {
        self.pin.set_low();
        self.delay.spin(width);
        self.pin.release_to_input();
        self.delay.spin(self.timing.presence_wait);
        !self.pin.read_level()
    }

    /// Write one bit slot. A 0 is a long low pulse; a 1 is a short low pulse
    /// followed by the rest of the slot high.
    pub fn write_bit(&mut self, bit: bool) {
        if bit {
            critical_section::with(|_| {
                self.pin.set_low();
                self.delay.spin(self.timing.pulse);
                self.pin.release_to_input();
            });
            self.delay.spin(self.timing.slot);
        } else {
            critical_section::with(|_| {
                self.pin.set_low();
                self.delay.spin(self.timing.slot);
                self.pin.release_to_input();
                self.delay.spin(self.timing.pulse);
            });
        }
    }

    /// Open a read slot with a short low pulse and sample what the device
    /// leaves on the line.
    pub fn read_bit(&mut self) -> bool {
        critical_section::with(|_| {
            self.pin.set_low();
            self.delay.spin(self.timing.pulse);
            self.pin.release_to_input();
            self.delay.spin(self.timing.sample);
            let bit = self.pin.read_level();
            // keep the next slot from starting while the device still drives
            self.delay.spin(self.timing.recovery);
            bit
        })
    }

    /// Write a byte LSB first. Always returns true; nothing on the bus
    /// acknowledges a write.
    pub fn write_byte(&mut self, byte: u8) -> bool {
        for i in 0..8 {
            self.write_bit((byte >> i) & 1 != 0);
        }
        true
    }

    /// Write a byte MSB first. Always returns true.
    pub fn write_byte_rev(&mut self, byte: u8) -> bool {
        for i in (0..8).rev() {
            self.write_bit((byte >> i) & 1 != 0);
        }
        true
    }

    /// Read a byte LSB first. The data is not checked in any way.
    pub fn read_byte(&mut self) -> u8 {
        let mut byte = 0u8;
        for i in 0..8 {
            if self.read_bit() {
                byte |= 1 << i;
            }
        }
        byte
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.write_byte(b);
        }
    }

    pub fn read_bytes(&mut self, buf: &mut [u8]) {
        for b in buf.iter_mut() {
            *b = self.read_byte();
        }
    }

    /// Send Match ROM with the identifier in table slot `index`, so that only
    /// that device listens until the next reset. Call right after `reset`.
    pub fn match_rom(&mut self, index: usize) {
        self.write_byte(commands::MATCH_ROM);
        for bit in 0..64 {
            let b = self.registry.get_bit(index, bit);
            self.write_bit(b);
        }
    }

    /// Send Skip ROM, addressing every device. Only sensible with one device
    /// on the bus. Call right after `reset`.
    pub fn skip_rom(&mut self) {
        self.write_byte(commands::SKIP_ROM);
    }

    /// Match ROM for a table slot, or Skip ROM when the caller has none.
    pub fn select(&mut self, index: Option<usize>) {
        match index {
            Some(index) => self.match_rom(index),
            None => self.skip_rom(),
        }
    }

    /// Reset the bus, then silence all but the device with this identifier.
    /// Returns false, having sent nothing more, if the reset got no presence.
    pub fn rom_select(&mut self, id: &DeviceId) -> bool {
        if !self.reset() {
            return false;
        }
        self.write_byte(commands::MATCH_ROM);
        self.write_bytes(&id.bytes());
        true
    }

    /// Read the identifier of the only device on the bus with Read ROM and
    /// make it the sole table entry. With more than one device the answers
    /// collide and the result is garbage. Call right after `reset`.
    pub fn read_rom(&mut self) -> DeviceId {
        self.write_byte(commands::READ_ROM);
        let mut rom: RomId = [0; 8];
        self.read_bytes(&mut rom);
        let id = DeviceId::from_bytes(rom);
        self.registry.set_only(id);
        debug!("1W read ROM {}", id);
        id
    }

    pub fn registry(&self) -> &Registry<N> {
        &self.registry
    }

    /// Identifier in table slot `index`, or 0 if there's no such slot.
    pub fn get_id(&self, index: usize) -> u64 {
        self.registry.get_id(index)
    }

    pub fn find_by_id(&self, id: u64) -> Option<usize> {
        self.registry.find_by_id(id)
    }

    /// First table slot holding a device of this family.
    pub fn find_by_type(&self, family: u8) -> Option<usize> {
        self.registry.find_by_type(family)
    }

    pub fn get_id_bit(&self, index: usize, pos: u8) -> bool {
        self.registry.get_bit(index, pos)
    }

    pub fn set_id_bit(&mut self, index: usize, pos: u8, value: bool) {
        self.registry.set_bit(index, pos, value);
    }

    /// Dump up to `how_many` table slots as hex, one per line.
    pub fn show_devices<W: core::fmt::Write>(&self, out: &mut W, how_many: usize) -> core::fmt::Result {
        self.registry.show_devices(out, how_many)
    }
}
