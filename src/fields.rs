//! Canonical names shared between sysfs, udev and our output.
//!
//! The attribute file names under a PCI device directory happen to be the
//! same words we use as JSON keys, so both live here and nobody has to keep
//! two spellings in sync.

/// PCI device attributes (sysfs files / udev sysattrs) and device JSON keys.
pub mod pci {
    pub const ADDRESS: &str = "address";
    pub const CLASS: &str = "class";
    pub const VENDOR: &str = "vendor";
    pub const DEVICE: &str = "device";
    pub const REVISION: &str = "revision";
    /// Symlink into /sys/kernel/iommu_groups/<id>
    pub const IOMMU_GROUP: &str = "iommu_group";
    /// udev subsystem name
    #[cfg_attr(not(feature = "udev"), allow(dead_code))]
    pub const SUBSYSTEM: &str = "pci";
}

/// Group-level JSON keys.
pub mod iommu {
    pub const IOMMU_GROUPS: &str = "iommu_groups";
    pub const ID: &str = "id";
    pub const DEVICES: &str = "devices";
}
