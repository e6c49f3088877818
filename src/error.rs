/// Things that go wrong on a 1Wire bus. None of these are fatal; the
/// transaction-level API reports them as `false` or in a [`SearchReport`],
/// and the `try_*` variants hand them back as-is.
///
/// [`SearchReport`]: crate::SearchReport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The line was already high right after the reset pulse: nobody's home.
    NoPresence,
    /// The line never came back high after the presence pulse.
    ResetTimeout,
    /// Both search bits read as 1 at this bit position, so no device was
    /// driving the line.
    BusContention { bit: u8 },
    /// The reset-pulse sweep ran out of widths without seeing a presence pulse.
    CalibrationFailure,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::NoPresence => write!(f, "no presence pulse after reset"),
            Error::ResetTimeout => write!(f, "line held low after presence pulse"),
            Error::BusContention { bit } => {
                write!(f, "no device driving the bus at search bit {}", bit)
            }
            Error::CalibrationFailure => write!(f, "no reset pulse width produced a presence pulse"),
        }
    }
}
