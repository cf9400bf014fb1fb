//! sysfs backend: `/sys/bus/pci/devices/<bdf>/...`
//!
//! One directory per device, named by its BDF. Each holds the `iommu_group`
//! symlink and the `vendor`/`device`/`class`/`revision` attribute files.

use crate::buffer::BoundedBuffer;
use crate::error::{Error, Result};
use crate::io;

use super::{DeviceRecord, DeviceSource, PATH_CAPACITY, resolve_group};

/// Where the kernel lists PCI devices.
pub const PCI_SYSFS_PATH: &str = "/sys/bus/pci/devices";

pub struct SysfsSource {
    root: Vec<u8>,
}

impl SysfsSource {
    /// Walk a different device directory (tests, chroots).
    pub fn new(root: impl Into<Vec<u8>>) -> Self {
        Self { root: root.into() }
    }
}

/// The device directory currently being visited. Reused for every entry.
pub struct SysfsDevice {
    /// `<root>/<bdf>`
    dir: BoundedBuffer,
    /// Offset of `<bdf>` inside `dir`
    name_start: usize,
    /// Attribute and symlink paths are built here
    scratch: BoundedBuffer,
}

impl SysfsDevice {
    fn new() -> Result<Self> {
        Ok(Self {
            dir: BoundedBuffer::allocate(PATH_CAPACITY)?,
            name_start: 0,
            scratch: BoundedBuffer::allocate(PATH_CAPACITY)?,
        })
    }

    /// Point at `<root>/<name>`. False if the path does not fit.
    fn enter(&mut self, root: &[u8], name: &[u8]) -> bool {
        self.dir.clear();
        self.dir.append(root);
        self.dir.append(b"/");
        self.name_start = self.dir.len();
        self.dir.append(name);
        !self.dir.is_overflow()
    }
}

impl DeviceRecord for SysfsDevice {
    fn name(&self) -> &[u8] {
        &self.dir.as_bytes()[self.name_start..]
    }

    fn iommu_group(&mut self) -> Result<u32> {
        resolve_group(self.dir.as_bytes(), &mut self.scratch)
    }

    fn attribute(&mut self, name: &str) -> Result<Vec<u8>> {
        let path = io::join_path(&mut self.scratch, self.dir.as_bytes(), &[name.as_bytes()])
            .ok_or(Error::NotFound("attribute path"))?;
        io::read_attr(path)
    }
}

impl DeviceSource for SysfsSource {
    type Record = SysfsDevice;
    const NAME: &'static str = "sysfs";

    fn scan<F>(self, mut visit: F) -> Result<()>
    where
        F: FnMut(&mut Self::Record) -> Result<()>,
    {
        let mut root_buf = BoundedBuffer::allocate(PATH_CAPACITY)?;
        let root = io::join_path(&mut root_buf, &self.root, &[]).ok_or_else(|| {
            Error::enumerate(String::from_utf8_lossy(&self.root), "path too long")
        })?;

        let mut record = SysfsDevice::new()?;
        io::for_each_dir_entry(root, |name| {
            if !record.enter(&self.root, name) {
                crate::dbg_skip!(String::from_utf8_lossy(name), "path too long");
                return Ok(());
            }
            visit(&mut record)
        })?;

        Ok(())
    }
}
