use crate::error::Error;
use crate::pin::{DelayLoop, OneWirePin};
use crate::OneWireMaster;

impl<P: OneWirePin, D: DelayLoop, const N: usize> OneWireMaster<P, D, N> {
    /// Look for a reset pulse width that gets a presence pulse, for when the
    /// configured one doesn't (different clock, fussy device family). Returns
    /// true if one was found; it is then used by every later `reset`.
    pub fn auto_timing(&mut self) -> bool {
        self.try_auto_timing().is_ok()
    }

    /// As `auto_timing`, returning the new reset pulse width.
    ///
    /// Widths are tried shortest first, per the timing table's [`Sweep`]. The
    /// first that draws a presence pulse, plus the sweep margin, becomes the
    /// reset pulse, provided a full reset with it then succeeds. Otherwise the
    /// old width is kept.
    ///
    /// [`Sweep`]: crate::Sweep
    pub fn try_auto_timing(&mut self) -> Result<u32, Error> {
        let sweep = self.timing.sweep;
        let mut width = sweep.start;
        let mut working = None;
        while width < sweep.end {
            if self.pulse_for_presence(width) {
                debug!("RST {=u32} OK", width);
                working = Some(width);
                break;
            }
            trace!("RST {=u32} bad", width);
            width = width.saturating_add(sweep.step.max(1));
        }

        let Some(width) = working else {
            error!("1W auto timing: no reset width in {=u32}..{=u32} works", sweep.start, sweep.end);
            return Err(self.fault(Error::CalibrationFailure));
        };

        // Add just a little to be on the safe side
        let previous = self.reset_pulse;
        self.reset_pulse = width.saturating_add(sweep.margin);
        match self.try_reset() {
            Ok(()) => {
                info!("1W reset pulse now {=u32} (was {=u32})", self.reset_pulse, previous);
                Ok(self.reset_pulse)
            }
            Err(err) => {
                warn!("1W auto timing: reset at {=u32} failed: {}", self.reset_pulse, err);
                self.reset_pulse = previous;
                Err(self.fault(Error::CalibrationFailure))
            }
        }
    }
}
