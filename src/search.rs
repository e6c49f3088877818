//! Finding out who's on the bus.
//!
//! Every device answers Search ROM by sending each identifier bit and then its
//! complement, wired-AND with everyone else still in the running, and then
//! listening for the bit the master picks. Devices whose bit differs drop out
//! until the next reset. Reading `(0, 0)` means the remaining devices
//! disagree at that position; `(1, 1)` means nobody is answering.
//!
//! Two walks of that tree live here:
//!
//! * [`search`](OneWireMaster::search) remembers only the single most recent
//!   branch point from the pass before. It finds any number of devices whose
//!   disagreements nest, but with three or more devices branching at
//!   unrelated positions it can find one device twice and miss another. Kept
//!   as the default because existing setups number their devices by it.
//! * [`search_next`](OneWireMaster::search_next) and
//!   [`search_exhaustive`](OneWireMaster::search_exhaustive) follow Maxim
//!   application note 187 and always visit every device.

use crate::devices::Family;
use crate::error::Error;
use crate::pin::{DelayLoop, OneWirePin};
use crate::rom::DeviceId;
use crate::{commands, OneWireMaster};

/// Outcome of filling the device table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SearchReport {
    /// Table slots filled, from slot 0.
    pub found: usize,
    /// The table filled up while the bus still had devices to offer.
    pub truncated: bool,
    /// What cut the search short, if anything.
    pub fault: Option<Error>,
}

impl SearchReport {
    /// No fault and nothing left behind.
    pub fn is_complete(&self) -> bool {
        self.fault.is_none() && !self.truncated
    }
}

/// All 1Wire devices respond to a search algorithm that can be used to
/// enumerate a 1Wire bus. This struct tracks state for a search in progress.
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    /// Set true going into `search_next` to use ALARM SEARCH command, else
    /// general SEARCH
    pub alarm_search: bool,
    // remaining values are private; bit numbers are 1-based, 0 meaning none
    last_discrepancy: u8,
    last_family_discrepancy: u8,
    rom: DeviceId,
    last_device_flag: bool,
}

impl SearchState {
    /// Initialize SearchState for a general (all devices) search.
    pub fn start_general() -> Self {
        Default::default()
    }

    /// Initialize SearchState for a conditional ("alarm") search.
    pub fn start_alarm() -> Self {
        Self {
            alarm_search: true,
            ..Default::default()
        }
    }

    /// Initialize SearchState so the next device found is of family `code`
    /// if the bus has one. Check the family of what comes back: if there's no
    /// such device the search carries on to whatever comes next.
    pub fn target_family(code: u8) -> Self {
        Self {
            last_discrepancy: 64,
            rom: DeviceId(code as u64),
            ..Default::default()
        }
    }

    /// Make the next `search_next` skip past the rest of the family of the
    /// device it just returned.
    pub fn skip_family(&mut self) {
        self.last_discrepancy = self.last_family_discrepancy;
        self.last_family_discrepancy = 0;
        if self.last_discrepancy == 0 {
            self.last_device_flag = true;
        }
    }

    /// True once the last device has been returned.
    pub fn is_done(&self) -> bool {
        self.last_device_flag
    }

    fn restart(&mut self) {
        *self = Self {
            alarm_search: self.alarm_search,
            ..Default::default()
        };
    }
}

impl<P: OneWirePin, D: DelayLoop, const N: usize> OneWireMaster<P, D, N> {
    /// Search the bus and fill the device table from slot 0.
    ///
    /// Each pass resets the bus, sends Search ROM and walks all 64 bits. Where
    /// devices disagree it takes 1 if that is the position where the previous
    /// pass last took 0, and otherwise takes 0 and remembers the position for
    /// the next pass. It stops when the table is full, when a pass meets no
    /// new disagreement, or on a fault. A pass that reads `(1, 1)` leaves its
    /// slot empty.
    pub fn search(&mut self) -> SearchReport {
        self.registry.clear();
        let mut report = SearchReport::default();
        let mut high_conflict: Option<u8> = None;

        while !self.registry.is_full() {
            if let Err(err) = self.try_reset() {
                report.fault = Some(err);
                break;
            }
            self.write_byte(commands::SEARCH_ROM);

            let last_conflict = high_conflict.take();
            let mut id = DeviceId::EMPTY;
            let mut contention = None;
            for bit in 0..64u8 {
                let id_bit = self.read_bit();
                let cmp_id_bit = self.read_bit();
                let choice = match (id_bit, cmp_id_bit) {
                    (false, false) => {
                        // Taking 1 here resolves the previous pass's last conflict
                        if last_conflict == Some(bit) {
                            true
                        } else {
                            high_conflict = Some(bit);
                            false
                        }
                    }
                    (true, false) => true,
                    (false, true) => false,
                    (true, true) => {
                        contention = Some(bit);
                        break;
                    }
                };
                id.set_bit(bit, choice);
                self.write_bit(choice);
            }

            if let Some(bit) = contention {
                error!("1W search: nobody driving the bus at bit {=u8}", bit);
                report.fault = Some(self.fault(Error::BusContention { bit }));
                break;
            }

            // the loop condition guarantees room
            let _ = self.registry.push(id);
            report.found += 1;
            debug!("1W search found {} ({})", id, Family::of(id));

            if high_conflict.is_none() {
                break;
            }
            if self.registry.is_full() {
                warn!("1W search: device table full, more devices remain");
                report.truncated = true;
            }
        }
        report
    }

    /// Start or continue a full search. Returns `Ok(Some(id))`, in which case
    /// call again with `st` unchanged to find more, or `Ok(None)` once every
    /// device has been returned. An alarm search with no device in alarm also
    /// returns `Ok(None)`. Errors, and `Ok(None)`, restart `st` from scratch.
    pub fn search_next(&mut self, st: &mut SearchState) -> Result<Option<DeviceId>, Error> {
        if st.last_device_flag {
            st.restart();
            return Ok(None);
        }

        if let Err(err) = self.try_reset() {
            st.restart();
            return Err(err);
        }

        self.write_byte(if st.alarm_search {
            commands::ALARM_SEARCH // "alarm" or "conditional" search command
        } else {
            commands::SEARCH_ROM // "normal" search command, all devices participate
        });

        let mut last_zero: u8 = 0;
        for id_bit_number in 1..=64u8 {
            let pos = id_bit_number - 1;
            let id_bit = self.read_bit();
            let cmp_id_bit = self.read_bit();

            let direction = match (id_bit, cmp_id_bit) {
                (true, true) => {
                    st.restart();
                    if st.alarm_search && pos == 0 {
                        debug!("1W alarm search: no device in alarm");
                        return Ok(None);
                    }
                    error!("1W search: nobody driving the bus at bit {=u8}", pos);
                    return Err(self.fault(Error::BusContention { bit: pos }));
                }
                (false, false) => {
                    // Before the last discrepancy, follow the previous path;
                    // at it, take the other branch; past it, take 0 first.
                    let direction = if id_bit_number < st.last_discrepancy {
                        st.rom.bit(pos)
                    } else {
                        id_bit_number == st.last_discrepancy
                    };
                    if !direction {
                        last_zero = id_bit_number;
                        // check for last discrepancy in family
                        if last_zero < 9 {
                            st.last_family_discrepancy = last_zero;
                        }
                    }
                    direction
                }
                (agreed, _) => agreed,
            };

            trace!(
                "search: bit {=u8} read {=bool},{=bool} write {=bool}",
                pos,
                id_bit,
                cmp_id_bit,
                direction
            );
            st.rom.set_bit(pos, direction);
            self.write_bit(direction);
        }

        st.last_discrepancy = last_zero;
        if last_zero == 0 {
            st.last_device_flag = true;
        }
        Ok(Some(st.rom))
    }

    /// Fill the device table using `search_next`, which unlike `search`
    /// visits every device whatever their identifiers look like.
    pub fn search_exhaustive(&mut self) -> SearchReport {
        self.registry.clear();
        let mut report = SearchReport::default();
        let mut st = SearchState::start_general();
        loop {
            match self.search_next(&mut st) {
                Ok(Some(id)) => {
                    if self.registry.push(id).is_err() {
                        warn!("1W search: device table full, more devices remain");
                        report.truncated = true;
                        break;
                    }
                    report.found += 1;
                    debug!("1W search found {} ({})", id, Family::of(id));
                }
                Ok(None) => break,
                Err(err) => {
                    report.fault = Some(err);
                    break;
                }
            }
        }
        report
    }
}
