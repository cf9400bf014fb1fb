//! PCI addresses and device records.
//!
//! A PCI function is identified by its BDF address, which sysfs spells as
//! `DDDD:BB:SS.F` (and older kernels sometimes as `BB:SS.F`). We pack it into
//! a single `u32` - domain in the top 16 bits, then bus, then 5 bits of slot
//! and 3 bits of function - so that ordering devices is an integer compare.
//!
//! Descriptive properties stay the raw bytes sysfs gave us ("0x8086",
//! "0x030000"...). No ID database lookups, no reinterpretation.

use core::fmt;

use crate::buffer::BoundedBuffer;
use crate::error::{Error, Result};

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Length of a formatted address: `dddd:bb:ss.f`.
pub const ADDRESS_LEN: usize = 12;

/// Packed PCI address: `domain(16) | bus(8) | slot(5) | function(3)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PciAddress(u32);

impl PciAddress {
    /// Build from components. Slot and function are masked to their widths.
    pub const fn new(domain: u16, bus: u8, slot: u8, function: u8) -> Self {
        Self(
            (domain as u32) << 16
                | (bus as u32) << 8
                | ((slot & 0x1f) as u32) << 3
                | (function & 0x7) as u32,
        )
    }

    /// Every 32-bit value is a valid packing.
    #[cfg(test)]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn domain(self) -> u16 {
        (self.0 >> 16) as u16
    }

    pub const fn bus(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn slot(self) -> u8 {
        ((self.0 >> 3) & 0x1f) as u8
    }

    pub const fn function(self) -> u8 {
        (self.0 & 0x7) as u8
    }

    /// Parse `DDDD:BB:SS.F` or `BB:SS.F`. Hex digits in either case.
    pub fn parse(bdf: &[u8]) -> Result<Self> {
        let (domain, rest) = match bdf.len() {
            12 if bdf[4] == b':' => (parse_hex(&bdf[..4])?, &bdf[5..]),
            7 => (0, bdf),
            _ => return Err(Error::InvalidFormat("PCI address")),
        };

        if rest[2] != b':' || rest[5] != b'.' {
            return Err(Error::InvalidFormat("PCI address"));
        }

        let bus = parse_hex(&rest[0..2])?;
        let slot = parse_hex(&rest[3..5])?;
        let function = parse_hex(&rest[6..7])?;

        if slot > 0x1f || function > 0x7 {
            return Err(Error::InvalidFormat("PCI address"));
        }

        Ok(Self::new(domain as u16, bus as u8, slot as u8, function as u8))
    }

    /// Long form, lower-case, zero-padded.
    pub fn format(self) -> [u8; ADDRESS_LEN] {
        let mut out = [0u8; ADDRESS_LEN];
        write_hex(&mut out[0..4], self.domain() as u32);
        out[4] = b':';
        write_hex(&mut out[5..7], self.bus() as u32);
        out[7] = b':';
        write_hex(&mut out[8..10], self.slot() as u32);
        out[10] = b'.';
        write_hex(&mut out[11..12], self.function() as u32);
        out
    }
}

impl fmt::Display for PciAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04x}:{:02x}:{:02x}.{:x}",
            self.domain(),
            self.bus(),
            self.slot(),
            self.function()
        )
    }
}

/// Parse a run of hex digits. Unlike `u32::from_str_radix`, no sign is allowed.
fn parse_hex(digits: &[u8]) -> Result<u32> {
    digits.iter().try_fold(0u32, |acc, &c| {
        let nibble = match c {
            b'0'..=b'9' => c - b'0',
            b'a'..=b'f' => c - b'a' + 10,
            b'A'..=b'F' => c - b'A' + 10,
            _ => return Err(Error::InvalidFormat("hex digit")),
        };
        Ok(acc << 4 | nibble as u32)
    })
}

/// Fill `out` with the low hex digits of `value`, most significant first.
fn write_hex(out: &mut [u8], mut value: u32) {
    for slot in out.iter_mut().rev() {
        *slot = HEX_DIGITS[(value & 0xf) as usize];
        value >>= 4;
    }
}

/// Drop a leading "0x"/"0X" the way sysfs writes IDs.
pub fn strip_hex_prefix(value: &[u8]) -> &[u8] {
    value
        .strip_prefix(b"0x")
        .or_else(|| value.strip_prefix(b"0X"))
        .unwrap_or(value)
}

/// Descriptive attributes of a PCI function, as exposed by the host.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PciDeviceProperties {
    /// Class code (3 bytes: class, subclass, prog-if), e.g. "0x030000"
    pub class: Vec<u8>,
    /// Vendor ID, e.g. "0x8086"
    pub vendor: Vec<u8>,
    /// Device ID
    pub device: Vec<u8>,
    /// Revision ID. Not every device reports one.
    pub revision: Option<Vec<u8>>,
}

/// One PCI function observed during an enumeration pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PciDevice {
    pub address: PciAddress,
    /// `None` when the attributes could not be read. The device still
    /// belongs to its group.
    pub properties: Option<PciDeviceProperties>,
}

impl PciDevice {
    /// Append the one-line description used by plain output:
    /// `Address <addr> Class <c> ID <vendor>:<device>[ Revision <r>]`,
    /// or `N/A` when properties are missing.
    pub fn describe(&self, out: &mut BoundedBuffer) {
        let Some(ref props) = self.properties else {
            out.append(b"N/A");
            return;
        };

        out.append(b"Address ");
        out.append(&self.address.format());
        out.append(b" Class ");
        out.append(strip_hex_prefix(&props.class));
        out.append(b" ID ");
        out.append(strip_hex_prefix(&props.vendor));
        out.append(b":");
        out.append(strip_hex_prefix(&props.device));

        if let Some(ref revision) = props.revision {
            out.append(b" Revision ");
            out.append(strip_hex_prefix(revision));
        }
    }
}
