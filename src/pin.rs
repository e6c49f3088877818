//! The one GPIO a bus needs, and the busy-wait used to time it.

use core::ptr;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

/// An open-drain data line with an external pull-up.
pub trait OneWirePin {
    /// Pull the line low.
    fn set_low(&mut self);
    /// Stop driving; the pull-up takes the line high unless a device holds it.
    fn release_to_input(&mut self);
    /// Sample the line, `true` for high.
    fn read_level(&mut self) -> bool;
}

/// Blocking delay counted in the units of the bus [`Timing`](crate::Timing).
pub trait DelayLoop {
    fn spin(&mut self, units: u32);
}

/// One unit per `spin_loop` iteration. Pair with [`Timing::from_cpu_hz`].
///
/// [`Timing::from_cpu_hz`]: crate::Timing::from_cpu_hz
#[derive(Debug, Default, Clone, Copy)]
pub struct BusyLoop;

impl DelayLoop for BusyLoop {
    #[inline(always)]
    fn spin(&mut self, units: u32) {
        for _ in 0..units {
            core::hint::spin_loop();
        }
    }
}

/// One unit per microsecond of an `embedded-hal` delay. Pair with
/// [`Timing::STANDARD_US`](crate::Timing::STANDARD_US).
pub struct HalDelay<D> {
    delay: D,
}

impl<D: DelayNs> HalDelay<D> {
    pub fn new(delay: D) -> Self {
        Self { delay }
    }
}

impl<D: DelayNs> DelayLoop for HalDelay<D> {
    fn spin(&mut self, units: u32) {
        self.delay.delay_us(units);
    }
}

/// One bit of a memory-mapped port with separate input, output and direction
/// registers, AVR style. Driving low clears the output bit and makes the pin an
/// output; releasing makes it an input and sets the output bit, which turns on
/// the internal pull-up.
pub struct PortPin {
    input: *const u8,
    output: *mut u8,
    direction: *mut u8,
    mask: u8,
}

impl PortPin {
    /// Bind to bit `bit` (0-7) of the given port.
    ///
    /// # Safety
    ///
    /// The three pointers must be valid, aligned port registers for the life
    /// of this value, and nothing else may write the `bit` position of the
    /// output or direction register meanwhile.
    pub unsafe fn new(input: *const u8, output: *mut u8, direction: *mut u8, bit: u8) -> Self {
        Self {
            input,
            output,
            direction,
            mask: 1 << (bit & 0x07),
        }
    }

    pub fn mask(&self) -> u8 {
        self.mask
    }

    #[inline(always)]
    fn modify(reg: *mut u8, f: impl FnOnce(u8) -> u8) {
        // Safety: validity of `reg` was promised to `PortPin::new`.
        unsafe { ptr::write_volatile(reg, f(ptr::read_volatile(reg))) }
    }
}

impl OneWirePin for PortPin {
    fn set_low(&mut self) {
        let mask = self.mask;
        Self::modify(self.output, |v| v & !mask);
        Self::modify(self.direction, |v| v | mask);
    }

    fn release_to_input(&mut self) {
        let mask = self.mask;
        Self::modify(self.direction, |v| v & !mask);
        Self::modify(self.output, |v| v | mask);
    }

    fn read_level(&mut self) -> bool {
        // Safety: as for `modify`.
        unsafe { ptr::read_volatile(self.input) & self.mask != 0 }
    }
}

/// Any `embedded-hal` pin configured as open-drain output with input
/// readback. `set_high` floats the line. Pin errors are dropped: the bus has
/// nowhere to report them, and a dead pin shows up as no presence anyway.
pub struct OpenDrain<P> {
    pin: P,
}

impl<P: InputPin + OutputPin> OpenDrain<P> {
    pub fn new(mut pin: P) -> Self {
        let _ = pin.set_high();
        Self { pin }
    }

    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P: InputPin + OutputPin> OneWirePin for OpenDrain<P> {
    fn set_low(&mut self) {
        let _ = self.pin.set_low();
    }

    fn release_to_input(&mut self) {
        let _ = self.pin.set_high();
    }

    fn read_level(&mut self) -> bool {
        self.pin.is_high().unwrap_or(false)
    }
}
