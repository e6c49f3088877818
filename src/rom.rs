//! Device identifiers and the fixed-size table a bus keeps them in.

use core::fmt::{self, Write};

use heapless::{String, Vec};

/// All 1Wire devices carry a 64-bit ROM ID: 8-bit family code, 48-bit serial,
/// 8-bit check byte. Byte 0 is the family code.
pub type RomId = [u8; 8];

/// Number of identifier slots a bus gets unless told otherwise.
pub const DEFAULT_CAPACITY: usize = 3;

/// A 64-bit device identifier. Bit `n` of the number is bit `n % 8` of byte
/// `n / 8`, which is also the order the bus sends them in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(pub u64);

impl DeviceId {
    pub const EMPTY: DeviceId = DeviceId(0);

    pub const fn from_bytes(bytes: RomId) -> Self {
        Self(u64::from_le_bytes(bytes))
    }

    pub const fn value(self) -> u64 {
        self.0
    }

    pub const fn bytes(self) -> RomId {
        self.0.to_le_bytes()
    }

    /// The low byte, identifying what kind of device this is.
    pub const fn family(self) -> u8 {
        self.0 as u8
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Bit at position 0-63. Positions past 63 read as 0.
    pub fn bit(self, pos: u8) -> bool {
        match 1u64.checked_shl(pos as u32) {
            Some(mask) => self.0 & mask != 0,
            None => false,
        }
    }

    /// Set or clear the bit at position 0-63, leaving the rest alone.
    /// Positions past 63 are ignored.
    pub fn set_bit(&mut self, pos: u8, value: bool) {
        if let Some(mask) = 1u64.checked_shl(pos as u32) {
            if value {
                self.0 |= mask;
            } else {
                self.0 &= !mask;
            }
        }
    }

    /// Sixteen lowercase hex digits, most significant first.
    pub fn to_hex(self) -> String<16> {
        let mut s = String::new();
        // 16 digits always fit
        let _ = write!(s, "{:016x}", self.0);
        s
    }
}

impl From<u64> for DeviceId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<RomId> for DeviceId {
    fn from(bytes: RomId) -> Self {
        Self::from_bytes(bytes)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl fmt::LowerHex for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for DeviceId {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=u64:x}", self.0)
    }
}

/// Fixed table of identifiers found on one bus, with a count of how many of
/// the leading slots are in use. Unused slots hold zero.
#[derive(Debug, Clone)]
pub struct Registry<const N: usize> {
    slots: [DeviceId; N],
    found: usize,
}

impl<const N: usize> Default for Registry<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Registry<N> {
    pub const fn new() -> Self {
        Self {
            slots: [DeviceId::EMPTY; N],
            found: 0,
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn found(&self) -> usize {
        self.found
    }

    pub fn is_full(&self) -> bool {
        self.found >= N
    }

    /// Zero every slot.
    pub fn clear(&mut self) {
        self.slots = [DeviceId::EMPTY; N];
        self.found = 0;
    }

    /// Store `id` in the next free slot and return its index, or hand `id`
    /// back if the table is full.
    pub fn push(&mut self, id: DeviceId) -> Result<usize, DeviceId> {
        if self.is_full() {
            return Err(id);
        }
        let index = self.found;
        self.slots[index] = id;
        self.found += 1;
        Ok(index)
    }

    /// Replace the table with a single identifier in slot 0.
    pub fn set_only(&mut self, id: DeviceId) {
        self.clear();
        let _ = self.push(id);
    }

    pub fn get(&self, index: usize) -> Option<DeviceId> {
        self.slots.get(index).copied()
    }

    /// The identifier at `index`, or 0 when `index` is out of range.
    pub fn get_id(&self, index: usize) -> u64 {
        self.get(index).map_or(0, DeviceId::value)
    }

    /// Index of the slot holding exactly `id`.
    pub fn find_by_id(&self, id: u64) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| !slot.is_empty() && slot.value() == id)
    }

    /// Index of the first slot whose family code is `family`. Further devices
    /// of the same family are not reported.
    pub fn find_by_type(&self, family: u8) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| !slot.is_empty() && slot.family() == family)
    }

    /// One bit of one slot. Out-of-range slots and positions read as 0.
    pub fn get_bit(&self, index: usize, pos: u8) -> bool {
        self.slots.get(index).is_some_and(|slot| slot.bit(pos))
    }

    /// Set one bit of one slot. Out-of-range slots and positions are ignored.
    pub fn set_bit(&mut self, index: usize, pos: u8, value: bool) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.set_bit(pos, value);
        }
    }

    /// Identifiers in the slots in use, in table order.
    pub fn found_ids(&self) -> Vec<DeviceId, N> {
        self.slots[..self.found].iter().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceId> {
        self.slots.iter()
    }

    /// Write the first `how_many` slots (at most `N`) as hex, one per line.
    /// Empty slots show as zeros.
    pub fn show_devices<W: Write>(&self, out: &mut W, how_many: usize) -> fmt::Result {
        for id in self.slots.iter().take(how_many.min(N)) {
            writeln!(out, "{}", id)?;
        }
        Ok(())
    }
}
