//! Printing a sorted group table.

use crate::buffer::BoundedBuffer;
use crate::error::Result;
use crate::iommu::GroupTable;
use crate::json;
use crate::pci::PciDevice;
use crate::print;

/// Room for one plain-text line. Longer lines get truncated.
pub const LINE_CAPACITY: usize = 512;

/// Output style, chosen with `--style`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Style {
    #[default]
    Plain,
    Json,
}

impl Style {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "plain" => Some(Style::Plain),
            "json" => Some(Style::Json),
            _ => None,
        }
    }
}

/// Build `Group <id> <address> <description>` into `line`.
pub fn format_line(line: &mut BoundedBuffer, group_id: u32, device: &PciDevice) {
    line.clear();
    line.append(b"Group ");
    line.append_u64_padded(group_id as u64, 3);
    line.append(b" ");
    line.append(&device.address.format());
    line.append(b" ");
    device.describe(line);
}

/// One line per device, groups in table order.
pub fn print_plain(table: &GroupTable) -> Result<()> {
    let mut line = BoundedBuffer::allocate(LINE_CAPACITY)?;
    for group in table.groups() {
        for device in &group.devices {
            format_line(&mut line, group.id, device);
            if line.is_overflow() {
                crate::dbg_print!("{}: line truncated", device.address);
            }
            print::println(line.as_bytes())?;
        }
    }
    Ok(())
}

/// The whole document on one line, or indented when `pretty`.
pub fn print_json(table: &GroupTable, pretty: bool) -> Result<()> {
    let buf = json::render(table, pretty)?;
    print::println(buf.as_bytes())
}

/// `pretty` only affects JSON.
pub fn print_table(table: &GroupTable, style: Style, pretty: bool) -> Result<()> {
    match style {
        Style::Plain => print_plain(table),
        Style::Json => print_json(table, pretty),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iommu::discover;
    use crate::pci::{PciAddress, PciDeviceProperties};
    use crate::source::memory::{MemoryDevice, MemorySource, full_attrs};

    fn line_for(group_id: u32, device: &PciDevice) -> String {
        let mut line = BoundedBuffer::allocate(LINE_CAPACITY).unwrap();
        format_line(&mut line, group_id, device);
        String::from_utf8(line.as_bytes().to_vec()).unwrap()
    }

    #[test]
    fn full_line() {
        let device = PciDevice {
            address: PciAddress::parse(b"0000:00:02.0").unwrap(),
            properties: Some(PciDeviceProperties {
                class: b"0x030000".to_vec(),
                vendor: b"0x8086".to_vec(),
                device: b"0x46a6".to_vec(),
                revision: Some(b"0x0c".to_vec()),
            }),
        };
        assert_eq!(
            line_for(5, &device),
            "Group 005 0000:00:02.0 Address 0000:00:02.0 Class 030000 ID 8086:46a6 Revision 0c"
        );
    }

    #[test]
    fn unavailable_properties() {
        let device = PciDevice {
            address: PciAddress::parse(b"0000:00:14.2").unwrap(),
            properties: None,
        };
        assert_eq!(line_for(12, &device), "Group 012 0000:00:14.2 N/A");
    }

    #[test]
    fn wide_group_ids_are_not_cut() {
        let device = PciDevice {
            address: PciAddress::from_raw(0),
            properties: None,
        };
        assert_eq!(line_for(1234, &device), "Group 1234 0000:00:00.0 N/A");
    }

    #[test]
    fn long_line_truncates() {
        let device = PciDevice {
            address: PciAddress::from_raw(0),
            properties: Some(PciDeviceProperties {
                class: vec![b'c'; 600],
                vendor: b"0x8086".to_vec(),
                device: b"0x0001".to_vec(),
                revision: None,
            }),
        };
        let mut line = BoundedBuffer::allocate(LINE_CAPACITY).unwrap();
        format_line(&mut line, 0, &device);
        assert!(line.is_overflow());
        assert_eq!(line.len(), LINE_CAPACITY - 1);

        // Reused buffer starts clean for the next device
        format_line(&mut line, 0, &PciDevice { address: PciAddress::from_raw(0), properties: None });
        assert!(!line.is_overflow());
    }

    #[test]
    fn two_devices_one_group() {
        let source = MemorySource(vec![
            MemoryDevice::new("0000:00:03.0", Some("5"), &full_attrs("0x8086", "0x0002")),
            MemoryDevice::new("0000:00:02.0", Some("5"), &full_attrs("0x8086", "0x0001")),
        ]);
        let mut table = discover(source).unwrap();
        table.sort().unwrap();

        let lines: Vec<String> = table.groups()[0]
            .devices
            .iter()
            .map(|d| line_for(5, d))
            .collect();
        assert_eq!(
            lines,
            vec![
                "Group 005 0000:00:02.0 Address 0000:00:02.0 Class 030000 ID 8086:0001 Revision 01",
                "Group 005 0000:00:03.0 Address 0000:00:03.0 Class 030000 ID 8086:0002 Revision 01",
            ]
        );
    }

    #[test]
    fn style_names() {
        assert_eq!(Style::from_name("plain"), Some(Style::Plain));
        assert_eq!(Style::from_name("json"), Some(Style::Json));
        assert_eq!(Style::from_name("JSON"), None);
        assert_eq!(Style::default(), Style::Plain);
    }
}
