//! Delay durations for the bus waveforms, in whatever unit the bus's
//! [`DelayLoop`](crate::DelayLoop) counts.
//!
//! Two tables are provided. [`Timing::from_cpu_hz`] gives busy-loop counts
//! scaled from the CPU clock, for use with [`BusyLoop`](crate::BusyLoop). The
//! ratios are empirical, so expect to run
//! [`auto_timing`](crate::OneWireMaster::auto_timing) on a new board.
//! [`Timing::STANDARD_US`] gives the datasheet values in microseconds, for use
//! with [`HalDelay`](crate::HalDelay).

/// Reset-pulse sweep used by auto-calibration. Widths run from `start` up to
/// but not including `end`, in `step` increments; `margin` is added to the
/// first width that works.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sweep {
    pub start: u32,
    pub end: u32,
    pub step: u32,
    pub margin: u32,
}

impl Sweep {
    /// A sweep bracketing a nominal reset-pulse width: one eighth of it up to
    /// twice it, in roughly 1/128 steps (never finer than 2).
    pub const fn around(reset_pulse: u32) -> Self {
        let step = if reset_pulse / 128 > 2 { reset_pulse / 128 } else { 2 };
        let start = if reset_pulse / 8 > 0 { reset_pulse / 8 } else { 1 };
        Self {
            start,
            end: reset_pulse.saturating_mul(2),
            step,
            margin: step,
        }
    }
}

/// All delays used by the signaling layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timing {
    /// Reset pulse low time, nominally 480us or more.
    pub reset_pulse: u32,
    /// From the end of the reset pulse to sampling for presence, ~70us.
    pub presence_wait: u32,
    /// Poll budget for the presence pulse to end. Each poll costs one unit.
    pub presence_end: u32,
    /// Quiet time after a successful reset.
    pub settle: u32,
    /// Short low pulse opening a write-1 or read slot, ~1us.
    pub pulse: u32,
    /// Release-to-sample delay in a read slot, ~15us from slot start.
    pub sample: u32,
    /// Tail of a read slot after sampling, ~45us.
    pub recovery: u32,
    /// Write-0 low time, and write-1 high time.
    pub slot: u32,
    /// Auto-calibration sweep.
    pub sweep: Sweep,
}

impl Timing {
    /// Datasheet timing with one delay unit per microsecond.
    pub const STANDARD_US: Timing = Timing {
        reset_pulse: 480,
        presence_wait: 70,
        presence_end: 480,
        settle: 410,
        pulse: 6,
        sample: 9,
        recovery: 55,
        slot: 60,
        sweep: Sweep::around(480),
    };

    /// Busy-loop counts for a CPU running at `f_cpu` Hz.
    pub const fn from_cpu_hz(f_cpu: u32) -> Timing {
        let reset_pulse = f_cpu / 30_000;
        let sample = f_cpu / 1_800_000;
        let pulse = if f_cpu / 6_000_000 > 0 { f_cpu / 6_000_000 } else { 1 };
        Timing {
            reset_pulse,
            presence_wait: f_cpu / 250_000,
            presence_end: f_cpu / 100,
            settle: sample * 6,
            pulse,
            sample,
            recovery: sample * 3,
            slot: sample * 6,
            sweep: Sweep::around(reset_pulse),
        }
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::STANDARD_US
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_scaled_counts() {
        const T: Timing = Timing::from_cpu_hz(16_000_000);
        assert_eq!(T.reset_pulse, 533);
        assert_eq!(T.presence_wait, 64);
        assert_eq!(T.presence_end, 160_000);
        assert_eq!(T.pulse, 2);
        assert_eq!(T.sample, 8);
        assert_eq!(T.recovery, 24);
        assert_eq!(T.slot, 48);
    }

    #[test]
    fn slow_clock_never_yields_a_zero_pulse() {
        let t = Timing::from_cpu_hz(4_000_000);
        assert_eq!(t.pulse, 1);
    }

    #[test]
    fn sweep_brackets_nominal() {
        let s = Sweep::around(480);
        assert_eq!(s, Sweep { start: 60, end: 960, step: 3, margin: 3 });
        assert!(s.start < 480 && 480 + 20 < s.end);

        let tiny = Sweep::around(4);
        assert_eq!(tiny.step, 2);
        assert_eq!(tiny.start, 1);
    }
}
