//! IOMMU group table and the discovery pipeline that fills it.
//!
//! Devices in the same group cannot be isolated from each other by the
//! IOMMU, so they have to be passed through to a guest together. This module
//! answers "which devices share a group" for every group on the host.

use crate::bounded::BoundedList;
use crate::error::Result;
use crate::pci::{PciAddress, PciDevice};
use crate::sort::radix_sort_by_key;
use crate::source::{DeviceRecord, DeviceSource};

/// Most devices we keep per group.
pub const MAX_DEVICES_PER_GROUP: usize = 32;
/// Most groups we keep per host.
pub const MAX_GROUPS: usize = 256;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IommuGroup {
    pub id: u32,
    pub devices: BoundedList<PciDevice, MAX_DEVICES_PER_GROUP>,
}

impl IommuGroup {
    fn new(id: u32) -> Self {
        Self {
            id,
            devices: BoundedList::new("devices per group"),
        }
    }
}

/// Every group seen in one enumeration pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupTable {
    groups: BoundedList<IommuGroup, MAX_GROUPS>,
}

impl Default for GroupTable {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupTable {
    pub fn new() -> Self {
        Self {
            groups: BoundedList::new("IOMMU groups"),
        }
    }

    /// Add `device` to group `group_id`, creating the group if needed.
    ///
    /// Fails with `CapacityExceeded` if the group is full or a new group is
    /// needed and the table is full. Either way the table is unchanged.
    pub fn insert(&mut self, group_id: u32, device: PciDevice) -> Result<()> {
        let index = self.groups.iter().position(|g| g.id == group_id);
        match index {
            Some(i) => {
                self.groups.as_mut_slice()[i].devices.try_push(device)?;
            }
            None => {
                let mut group = IommuGroup::new(group_id);
                group.devices.try_push(device)?;
                self.groups.try_push(group)?;
            }
        }
        Ok(())
    }

    /// Groups by id, and each group's devices by address.
    pub fn sort(&mut self) -> Result<()> {
        for group in self.groups.iter_mut() {
            radix_sort_by_key(group.devices.as_mut_slice(), |d| d.address.raw())?;
        }
        radix_sort_by_key(self.groups.as_mut_slice(), |g| g.id)
    }

    pub fn groups(&self) -> &[IommuGroup] {
        self.groups.as_slice()
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total devices across all groups.
    pub fn device_count(&self) -> usize {
        self.groups.iter().map(|g| g.devices.len()).sum()
    }
}

/// Enumerate `source` and group every device that has a valid address and
/// a resolvable IOMMU group.
///
/// Devices that fail either check are skipped (and logged in debug mode).
/// A device whose attributes cannot be read keeps its place with no
/// properties. Running out of table space aborts the whole pass.
///
/// The table comes back in enumeration order; call `GroupTable::sort`.
pub fn discover<S: DeviceSource>(source: S) -> Result<GroupTable> {
    let mut table = GroupTable::new();

    source.scan(|record| {
        let address = match PciAddress::parse(record.name()) {
            Ok(address) => address,
            Err(e) => {
                crate::dbg_parse!(String::from_utf8_lossy(record.name()), e);
                return Ok(());
            }
        };

        let group_id = match record.iommu_group() {
            Ok(id) => id,
            Err(e) if e.is_per_device() => {
                crate::dbg_skip!(address, e);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let properties = record.properties();
        if properties.is_none() {
            crate::dbg_print!("{}: properties unavailable", address);
        }

        table.insert(group_id, PciDevice { address, properties })
    })?;

    crate::dbg_print!(
        "{}: {} groups, {} devices",
        S::NAME,
        table.len(),
        table.device_count()
    );
    Ok(table)
}
