//! udev backend: the device database.
//!
//! libudev caches sysattr values and already strips the trailing newline,
//! so attributes come back in the same shape as the sysfs reader's. The
//! group link is not a sysattr value we can trust across udev versions, so
//! it is resolved from `<syspath>/iommu_group` like sysfs does.

use std::os::unix::ffi::OsStrExt;

use crate::buffer::BoundedBuffer;
use crate::error::{Error, Result};
use crate::fields::pci as f;
use crate::io::attr_value;

use super::{DeviceRecord, DeviceSource, PATH_CAPACITY, resolve_group};

pub struct UdevSource;

pub struct UdevDevice {
    device: udev::Device,
    scratch: BoundedBuffer,
}

impl DeviceRecord for UdevDevice {
    fn name(&self) -> &[u8] {
        self.device.sysname().as_bytes()
    }

    fn iommu_group(&mut self) -> Result<u32> {
        let syspath = self.device.syspath().as_os_str().as_bytes();
        resolve_group(syspath, &mut self.scratch)
    }

    fn attribute(&mut self, name: &str) -> Result<Vec<u8>> {
        match self.device.attribute_value(name).and_then(|v| attr_value(v.as_bytes())) {
            Some(v) => Ok(v.to_vec()),
            None => {
                crate::dbg_fail!(format_args!("udev sysattr {}", name), "missing");
                Err(Error::NotFound("attribute"))
            }
        }
    }
}

impl DeviceSource for UdevSource {
    type Record = UdevDevice;
    const NAME: &'static str = "udev";

    fn scan<F>(self, mut visit: F) -> Result<()>
    where
        F: FnMut(&mut Self::Record) -> Result<()>,
    {
        let mut enumerator = udev::Enumerator::new().map_err(|e| Error::enumerate("udev", e))?;
        enumerator
            .match_subsystem(f::SUBSYSTEM)
            .map_err(|e| Error::enumerate("udev subsystem pci", e))?;
        let devices = enumerator
            .scan_devices()
            .map_err(|e| Error::enumerate("udev devices", e))?;

        let mut scratch = BoundedBuffer::allocate(PATH_CAPACITY)?;
        let mut count = 0usize;
        for device in devices {
            let mut record = UdevDevice { device, scratch };
            let result = visit(&mut record);
            scratch = record.scratch;
            result?;
            count += 1;
        }

        crate::dbg_scan!("udev subsystem pci", count);
        Ok(())
    }
}
