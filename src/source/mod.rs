//! Where PCI devices come from.
//!
//! A `DeviceSource` walks the host's device list once and hands each entry to
//! a visitor as a `DeviceRecord`. There are two of them:
//!
//! - `sysfs`: list `/sys/bus/pci/devices` and read the files in each entry.
//! - `udev` (cargo feature `udev`): ask libudev for the `pci` subsystem and
//!   read the same attributes through its cached sysattr accessors.
//!
//! Both answer the same three questions per device - what is your BDF, which
//! IOMMU group are you in, what are your attributes - and the policy for
//! turning attributes into `PciDeviceProperties` lives here, once, so the two
//! backends cannot drift apart.

pub mod sysfs;

#[cfg(feature = "udev")]
pub mod udev;

use crate::buffer::BoundedBuffer;
use crate::error::{Error, Result};
use crate::fields::pci as f;
use crate::io;
use crate::pci::PciDeviceProperties;

/// Room for any sysfs path (PATH_MAX).
pub const PATH_CAPACITY: usize = 4096;

/// One device as seen by a source, valid for the duration of a visit.
pub trait DeviceRecord {
    /// Kernel name of the device, which for PCI is its BDF address.
    fn name(&self) -> &[u8];

    /// Resolve the IOMMU group this device belongs to.
    fn iommu_group(&mut self) -> Result<u32>;

    /// Read one attribute (`vendor`, `class`, ...), trailing newline trimmed.
    fn attribute(&mut self, name: &str) -> Result<Vec<u8>>;

    /// Collect the descriptive properties.
    ///
    /// `vendor`, `device` and `class` are required; a device missing any of
    /// them has no properties at all. `revision` is optional.
    fn properties(&mut self) -> Option<PciDeviceProperties> {
        let vendor = self.attribute(f::VENDOR).ok()?;
        let device = self.attribute(f::DEVICE).ok()?;
        let class = self.attribute(f::CLASS).ok()?;
        let revision = self.attribute(f::REVISION).ok();

        Some(PciDeviceProperties {
            class,
            vendor,
            device,
            revision,
        })
    }
}

/// A one-shot enumeration of PCI devices.
pub trait DeviceSource {
    type Record: DeviceRecord;

    /// Backend name, for `--source` and help output.
    const NAME: &'static str;

    /// Enumerate, calling `visit` for every device. Consumes the source: a
    /// new run needs a new source. An error from `visit` stops the walk and
    /// is returned as-is.
    fn scan<F>(self, visit: F) -> Result<()>
    where
        F: FnMut(&mut Self::Record) -> Result<()>;
}

/// Parse an IOMMU group id: plain decimal, no sign, fits in `u32`.
pub fn parse_group_id(text: &[u8]) -> Result<u32> {
    if text.is_empty() {
        return Err(Error::InvalidFormat("IOMMU group id"));
    }

    text.iter().try_fold(0u32, |acc, &c| {
        if !c.is_ascii_digit() {
            return Err(Error::InvalidFormat("IOMMU group id"));
        }
        acc.checked_mul(10)
            .and_then(|v| v.checked_add((c - b'0') as u32))
            .ok_or(Error::InvalidFormat("IOMMU group id"))
    })
}

/// Follow `<device_dir>/iommu_group` and parse the group id from the target.
pub fn resolve_group(device_dir: &[u8], scratch: &mut BoundedBuffer) -> Result<u32> {
    let path = io::join_path(scratch, device_dir, &[f::IOMMU_GROUP.as_bytes()])
        .ok_or(Error::NotFound("iommu_group path"))?;
    let name = io::read_link_name(path)?;
    parse_group_id(&name)
}
