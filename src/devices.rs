//! Family codes of common 1Wire parts, as found in byte 0 of a ROM ID.
//!
//! | Family       | Code | Parts                                   |
//! | ------------ | ---- | --------------------------------------- |
//! | `Ds1990`     |  01  | DS1990A/DS2401 serial number, iButton   |
//! | `Ds18s20`    |  10  | DS1820, DS18S20, DS18S20-PAR            |
//! | `Ds2423`     |  1d  | DS2423 counter                          |
//! | `Ds2450`     |  20  | DS2450 quad A/D                         |
//! | `Ds1822`     |  22  | DS1822                                  |
//! | `Ds18b20`    |  28  | DS18B20, MAX31820, MAX31820PAR          |
//! | `Ds2408`     |  29  | DS2408 8-channel switch                 |
//! | `Ds1825`     |  3b  | DS1825, MAX31825, MAX31826, MAX31850    |
//! | `Ds28ea00`   |  42  | DS28EA00                                |
//!
//! Anything else comes back as `Other(code)`.

use crate::rom::DeviceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Family {
    Ds1990,
    Ds18s20,
    Ds2423,
    Ds2450,
    Ds1822,
    Ds18b20,
    Ds2408,
    Ds1825,
    Ds28ea00,
    Other(u8),
}

impl Family {
    pub const fn from_code(code: u8) -> Family {
        match code {
            0x01 => Family::Ds1990,
            0x10 => Family::Ds18s20,
            0x1d => Family::Ds2423,
            0x20 => Family::Ds2450,
            0x22 => Family::Ds1822,
            0x28 => Family::Ds18b20,
            0x29 => Family::Ds2408,
            0x3b => Family::Ds1825,
            0x42 => Family::Ds28ea00,
            other => Family::Other(other),
        }
    }

    pub const fn of(id: DeviceId) -> Family {
        Family::from_code(id.family())
    }

    pub const fn code(self) -> u8 {
        match self {
            Family::Ds1990 => 0x01,
            Family::Ds18s20 => 0x10,
            Family::Ds2423 => 0x1d,
            Family::Ds2450 => 0x20,
            Family::Ds1822 => 0x22,
            Family::Ds18b20 => 0x28,
            Family::Ds2408 => 0x29,
            Family::Ds1825 => 0x3b,
            Family::Ds28ea00 => 0x42,
            Family::Other(code) => code,
        }
    }

    /// Parts that answer Convert T (0x44) and Read Scratchpad (0xBE) with a
    /// temperature.
    pub const fn is_thermometer(self) -> bool {
        matches!(
            self,
            Family::Ds18s20 | Family::Ds1822 | Family::Ds18b20 | Family::Ds1825 | Family::Ds28ea00
        )
    }
}
