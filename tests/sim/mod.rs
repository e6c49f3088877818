//! A 1Wire bus in software: a virtual clock advanced only by the driver's
//! delays, a line that is low whenever the master or any device holds it low,
//! and devices that decode the master's pulses by their width.
//!
//! Times are in delay units and the thresholds assume `Timing::STANDARD_US`,
//! one unit per microsecond.
#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use bitbang_1_wire_master::{DelayLoop, OneWireMaster, OneWirePin, Timing};

/// A device samples the master's bit this long after the falling edge.
pub const SAMPLE_AT: u64 = 30;
/// A device sending 0 holds the line this long from the falling edge.
pub const HOLD_ZERO: u64 = 45;
pub const PRESENCE_DELAY: u64 = 15;
pub const PRESENCE_LEN: u64 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Command,
    Search { bit: u8, phase: u8 },
    MatchRom { bit: u8 },
    ReadRom { bit: u8 },
    Function,
    WriteScratchpad,
    ReadScratchpad { bit: usize },
}

#[derive(Debug, Clone)]
pub struct Device {
    pub id: u64,
    pub alarm: bool,
    /// Answers resets but never takes part in a search.
    pub mute_in_search: bool,
    pub scratchpad: Vec<u8>,
    state: State,
    rx_byte: u8,
    rx_bits: u8,
}

impl Device {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            alarm: false,
            mute_in_search: false,
            scratchpad: Vec::new(),
            state: State::Idle,
            rx_byte: 0,
            rx_bits: 0,
        }
    }

    pub fn alarmed(mut self) -> Self {
        self.alarm = true;
        self
    }

    pub fn mute_in_search(mut self) -> Self {
        self.mute_in_search = true;
        self
    }

    fn id_bit(&self, bit: u8) -> bool {
        (self.id >> bit) & 1 != 0
    }

    fn on_reset(&mut self) {
        self.state = State::Command;
        self.rx_byte = 0;
        self.rx_bits = 0;
    }

    fn receive(&mut self, bit: bool) -> Option<u8> {
        if bit {
            self.rx_byte |= 1 << self.rx_bits;
        }
        self.rx_bits += 1;
        if self.rx_bits == 8 {
            let byte = self.rx_byte;
            self.rx_byte = 0;
            self.rx_bits = 0;
            Some(byte)
        } else {
            None
        }
    }

    /// One time slot. Returns the bit this device put on the line, if it was
    /// the one talking; otherwise it consumed `master_bit`.
    fn on_slot(&mut self, master_bit: bool) -> Option<bool> {
        match self.state {
            State::Idle => None,
            State::Command => {
                if let Some(cmd) = self.receive(master_bit) {
                    self.state = match cmd {
                        0xf0 if !self.mute_in_search => State::Search { bit: 0, phase: 0 },
                        0xec if self.alarm && !self.mute_in_search => {
                            State::Search { bit: 0, phase: 0 }
                        }
                        0x55 => State::MatchRom { bit: 0 },
                        0xcc => State::Function,
                        0x33 => State::ReadRom { bit: 0 },
                        _ => State::Idle,
                    };
                }
                None
            }
            State::Search { bit, phase: 0 } => {
                self.state = State::Search { bit, phase: 1 };
                Some(self.id_bit(bit))
            }
            State::Search { bit, phase: 1 } => {
                self.state = State::Search { bit, phase: 2 };
                Some(!self.id_bit(bit))
            }
            State::Search { bit, .. } => {
                self.state = if master_bit != self.id_bit(bit) {
                    State::Idle
                } else if bit == 63 {
                    State::Function
                } else {
                    State::Search { bit: bit + 1, phase: 0 }
                };
                None
            }
            State::MatchRom { bit } => {
                self.state = if master_bit != self.id_bit(bit) {
                    State::Idle
                } else if bit == 63 {
                    State::Function
                } else {
                    State::MatchRom { bit: bit + 1 }
                };
                None
            }
            State::ReadRom { bit } => {
                self.state = if bit == 63 {
                    State::Function
                } else {
                    State::ReadRom { bit: bit + 1 }
                };
                Some(self.id_bit(bit))
            }
            State::Function => {
                if let Some(cmd) = self.receive(master_bit) {
                    self.state = match cmd {
                        0x4e => {
                            self.scratchpad.clear();
                            State::WriteScratchpad
                        }
                        0xbe => State::ReadScratchpad { bit: 0 },
                        _ => State::Idle,
                    };
                }
                None
            }
            State::WriteScratchpad => {
                if let Some(byte) = self.receive(master_bit) {
                    self.scratchpad.push(byte);
                }
                None
            }
            State::ReadScratchpad { bit } => {
                self.state = State::ReadScratchpad { bit: bit + 1 };
                // past the end the line just floats high
                Some(
                    self.scratchpad
                        .get(bit / 8)
                        .map_or(true, |byte| (byte >> (bit % 8)) & 1 != 0),
                )
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct Wire {
    pub now: u64,
    master_low: bool,
    fall_at: u64,
    hold_until: u64,
    presence: Option<(u64, u64)>,
    pub devices: Vec<Device>,
    /// Something shorts the line to ground after every reset.
    pub stuck_low: bool,
    /// Shortest low pulse the devices take as a reset.
    pub reset_min: u64,
    pub resets: usize,
    pub last_reset_width: Option<u64>,
    /// Every bit slot, as the devices decoded the master's pulse.
    pub slots: Vec<bool>,
}

impl Wire {
    fn fall(&mut self) {
        if !self.master_low {
            self.master_low = true;
            self.fall_at = self.now;
        }
    }

    fn rise(&mut self) {
        if !self.master_low {
            return;
        }
        self.master_low = false;
        let width = self.now - self.fall_at;
        if width >= self.reset_min {
            self.resets += 1;
            self.last_reset_width = Some(width);
            self.hold_until = 0;
            for d in self.devices.iter_mut() {
                d.on_reset();
            }
            self.presence = if self.devices.is_empty() {
                None
            } else {
                let start = self.now + PRESENCE_DELAY;
                Some((start, start + PRESENCE_LEN))
            };
        } else {
            let master_bit = width < SAMPLE_AT;
            self.slots.push(master_bit);
            let mut line = true;
            for d in self.devices.iter_mut() {
                if let Some(bit) = d.on_slot(master_bit) {
                    line &= bit;
                }
            }
            if !line {
                self.hold_until = self.fall_at + HOLD_ZERO;
            }
        }
    }

    fn level(&self) -> bool {
        if self.master_low || self.now < self.hold_until {
            return false;
        }
        if let Some((start, end)) = self.presence {
            if self.now >= start && (self.now < end || self.stuck_low) {
                return false;
            }
        }
        true
    }
}

#[derive(Clone)]
pub struct SimPin(pub Rc<RefCell<Wire>>);

impl OneWirePin for SimPin {
    fn set_low(&mut self) {
        self.0.borrow_mut().fall();
    }

    fn release_to_input(&mut self) {
        self.0.borrow_mut().rise();
    }

    fn read_level(&mut self) -> bool {
        self.0.borrow().level()
    }
}

#[derive(Clone)]
pub struct SimDelay(pub Rc<RefCell<Wire>>);

impl DelayLoop for SimDelay {
    fn spin(&mut self, units: u32) {
        self.0.borrow_mut().now += units as u64;
    }
}

pub type SimBus<const N: usize> = OneWireMaster<SimPin, SimDelay, N>;

pub fn wire(ids: &[u64]) -> Rc<RefCell<Wire>> {
    with_devices(ids.iter().map(|&id| Device::new(id)).collect())
}

pub fn with_devices(devices: Vec<Device>) -> Rc<RefCell<Wire>> {
    Rc::new(RefCell::new(Wire {
        devices,
        reset_min: 400,
        ..Default::default()
    }))
}

pub fn bus<const N: usize>(wire: &Rc<RefCell<Wire>>) -> SimBus<N> {
    bus_with_timing(wire, Timing::STANDARD_US)
}

pub fn bus_with_timing<const N: usize>(wire: &Rc<RefCell<Wire>>, timing: Timing) -> SimBus<N> {
    OneWireMaster::new(SimPin(wire.clone()), SimDelay(wire.clone()), timing)
}
