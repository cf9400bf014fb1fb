//! Hand-rolled JSON, written straight into a `BoundedBuffer`.
//!
//! The output schema is tiny and fixed, so a serialization framework would
//! buy us nothing. The writer tracks whether the next element needs a comma;
//! the renderer below drives it. Compact output is the default; pretty
//! output indents by two spaces and puts every element on its own line.
//!
//! Strings are byte strings from sysfs. We escape what JSON forbids raw
//! (control bytes, `"` and `\`) as `\u00XX` and pass every other byte through
//! untouched, UTF-8 or not.

use crate::buffer::BoundedBuffer;
use crate::error::{Error, Result};
use crate::fields::{iommu as g, pci as f};
use crate::iommu::{GroupTable, IommuGroup};
use crate::pci::{PciDevice, strip_hex_prefix};

/// First buffer size tried.
pub const INITIAL_CAPACITY: usize = 4 * 1024;
/// Give up past this.
pub const MAX_CAPACITY: usize = 4 * 1024 * 1024;

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// JSON writer over a bounded buffer, compact or pretty.
pub struct JsonWriter<'a> {
    out: &'a mut BoundedBuffer,
    pretty: bool,
    indent_level: usize,
    /// Track if we need a comma before the next element. At a closing
    /// bracket this also says whether the container has any elements.
    needs_comma: bool,
}

impl<'a> JsonWriter<'a> {
    pub fn new(out: &'a mut BoundedBuffer, pretty: bool) -> Self {
        out.clear();
        Self {
            out,
            pretty,
            indent_level: 0,
            needs_comma: false,
        }
    }

    /// Write the indentation for pretty printing.
    fn write_indent(&mut self) {
        if self.pretty {
            for _ in 0..self.indent_level {
                self.out.append(b"  ");
            }
        }
    }

    /// Write a newline if pretty printing.
    fn write_newline(&mut self) {
        if self.pretty {
            self.out.append(b"\n");
        }
    }

    /// Comma if needed, then (pretty) a fresh indented line for the element.
    fn write_separator(&mut self) {
        if self.needs_comma {
            self.out.append(b",");
        }
        if self.indent_level > 0 {
            self.write_newline();
            self.write_indent();
        }
        self.needs_comma = false;
    }

    fn open(&mut self, bracket: &[u8]) {
        self.out.append(bracket);
        self.indent_level += 1;
        self.needs_comma = false;
    }

    /// Empty containers stay `{}` / `[]` even when pretty.
    fn close(&mut self, bracket: &[u8]) {
        self.indent_level -= 1;
        if self.needs_comma {
            self.write_newline();
            self.write_indent();
        }
        self.out.append(bracket);
        self.needs_comma = true;
    }

    pub fn begin_object(&mut self) {
        self.write_separator();
        self.open(b"{");
    }

    pub fn end_object(&mut self) {
        self.close(b"}");
    }

    /// Begin an array value for a key.
    pub fn field_array(&mut self, key: &str) {
        self.key(key);
        self.open(b"[");
    }

    pub fn end_array(&mut self) {
        self.close(b"]");
    }

    /// Write an object key. Must be followed by a value.
    pub fn key(&mut self, name: &str) {
        self.write_separator();
        self.string(name.as_bytes());
        self.out.append(b":");
        if self.pretty {
            self.out.append(b" ");
        }
        self.needs_comma = false;
    }

    pub fn field_str(&mut self, key: &str, value: &[u8]) {
        self.key(key);
        self.string(value);
        self.needs_comma = true;
    }

    pub fn field_u64(&mut self, key: &str, value: u64) {
        self.key(key);
        self.out.append_u64(value);
        self.needs_comma = true;
    }

    fn string(&mut self, value: &[u8]) {
        self.out.append(b"\"");
        escape_into(self.out, value);
        self.out.append(b"\"");
    }
}

#[inline]
fn needs_escape(byte: u8) -> bool {
    byte < 0x20 || byte == b'"' || byte == b'\\'
}

/// Escape `value` into `out`. Runs of clean bytes are copied in one append.
fn escape_into(out: &mut BoundedBuffer, value: &[u8]) {
    let mut start = 0;
    for (i, &byte) in value.iter().enumerate() {
        if !needs_escape(byte) {
            continue;
        }
        out.append(&value[start..i]);
        out.append(&[
            b'\\',
            b'u',
            b'0',
            b'0',
            HEX_DIGITS[(byte >> 4) as usize],
            HEX_DIGITS[(byte & 0xf) as usize],
        ]);
        start = i + 1;
    }
    out.append(&value[start..]);
}

fn write_device(w: &mut JsonWriter<'_>, device: &PciDevice) {
    w.begin_object();
    w.field_str(f::ADDRESS, &device.address.format());
    if let Some(ref props) = device.properties {
        w.field_str(f::CLASS, strip_hex_prefix(&props.class));
        w.field_str(f::VENDOR, strip_hex_prefix(&props.vendor));
        w.field_str(f::DEVICE, strip_hex_prefix(&props.device));
        if let Some(ref revision) = props.revision {
            w.field_str(f::REVISION, strip_hex_prefix(revision));
        }
    }
    w.end_object();
}

fn write_group(w: &mut JsonWriter<'_>, group: &IommuGroup) {
    w.begin_object();
    w.field_u64(g::ID, group.id as u64);
    w.field_array(g::DEVICES);
    for device in &group.devices {
        write_device(w, device);
    }
    w.end_array();
    w.end_object();
}

/// Write the whole table into `out`. Check `out.is_overflow()` afterwards.
pub fn write_table(out: &mut BoundedBuffer, table: &GroupTable, pretty: bool) {
    let mut w = JsonWriter::new(out, pretty);
    w.begin_object();
    w.field_array(g::IOMMU_GROUPS);
    for group in table.groups() {
        write_group(&mut w, group);
    }
    w.end_array();
    w.end_object();
}

/// Render `table` as JSON, compact unless `pretty`.
///
/// Starts with a 4 KiB buffer and doubles it each time the output does not
/// fit, up to 4 MiB. Past that we give up with `BufferExhausted` rather than
/// print something truncated.
pub fn render(table: &GroupTable, pretty: bool) -> Result<BoundedBuffer> {
    render_with_limits(table, pretty, INITIAL_CAPACITY, MAX_CAPACITY)
}

fn render_with_limits(
    table: &GroupTable,
    pretty: bool,
    initial: usize,
    max: usize,
) -> Result<BoundedBuffer> {
    let mut capacity = initial;
    loop {
        let mut buf = BoundedBuffer::allocate(capacity)?;
        write_table(&mut buf, table, pretty);
        if !buf.is_overflow() {
            return Ok(buf);
        }

        crate::dbg_print!("JSON output does not fit in {} bytes, retrying", capacity);
        if capacity >= max {
            return Err(Error::BufferExhausted { max });
        }
        capacity = capacity.saturating_mul(2).min(max);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pci::{PciAddress, PciDeviceProperties};

    fn escaped(value: &[u8]) -> Vec<u8> {
        let mut buf = BoundedBuffer::allocate(256).unwrap();
        escape_into(&mut buf, value);
        buf.as_bytes().to_vec()
    }

    fn props(revision: Option<&str>) -> Option<PciDeviceProperties> {
        Some(PciDeviceProperties {
            class: b"0x030000".to_vec(),
            vendor: b"0x8086".to_vec(),
            device: b"0x46a6".to_vec(),
            revision: revision.map(|r| r.as_bytes().to_vec()),
        })
    }

    fn sample_table() -> GroupTable {
        let mut table = GroupTable::new();
        table
            .insert(
                5,
                PciDevice {
                    address: PciAddress::parse(b"0000:00:02.0").unwrap(),
                    properties: props(Some("0x0c")),
                },
            )
            .unwrap();
        table
            .insert(
                5,
                PciDevice {
                    address: PciAddress::parse(b"0000:00:03.0").unwrap(),
                    properties: props(None),
                },
            )
            .unwrap();
        table
            .insert(
                9,
                PciDevice {
                    address: PciAddress::parse(b"0000:00:14.0").unwrap(),
                    properties: None,
                },
            )
            .unwrap();
        table
    }

    mod escape_tests {
        use super::*;

        #[test]
        fn plain_string() {
            assert_eq!(escaped(b"hello world"), b"hello world");
        }

        #[test]
        fn quote_and_backslash() {
            assert_eq!(escaped(br#"a"b\c"#), br"a\u0022b\u005cc");
        }

        #[test]
        fn control_bytes() {
            assert_eq!(escaped(b"\x00\x01\n\x1f"), br"\u0000\u0001\u000a\u001f");
        }

        #[test]
        fn high_bytes_pass_through() {
            assert_eq!(escaped(b"\x7f\xc3\xa9\xff"), b"\x7f\xc3\xa9\xff");
        }

        #[test]
        fn empty_string() {
            assert_eq!(escaped(b""), b"");
        }

        #[test]
        fn decodes_with_standard_parser() {
            let mut buf = BoundedBuffer::allocate(256).unwrap();
            let mut w = JsonWriter::new(&mut buf, false);
            w.begin_object();
            w.field_str("k", b"say \"hi\" \\ \x01 done");
            w.end_object();

            let value: serde_json::Value = serde_json::from_slice(buf.as_bytes()).unwrap();
            assert_eq!(value["k"], "say \"hi\" \\ \u{1} done");
        }
    }

    mod render_tests {
        use super::*;

        #[test]
        fn exact_schema() {
            let buf = render(&sample_table(), false).unwrap();
            let expected = concat!(
                r#"{"iommu_groups":["#,
                r#"{"id":5,"devices":["#,
                r#"{"address":"0000:00:02.0","class":"030000","vendor":"8086","device":"46a6","revision":"0c"},"#,
                r#"{"address":"0000:00:03.0","class":"030000","vendor":"8086","device":"46a6"}"#,
                r#"]},"#,
                r#"{"id":9,"devices":[{"address":"0000:00:14.0"}]}"#,
                r#"]}"#,
            );
            assert_eq!(core::str::from_utf8(buf.as_bytes()).unwrap(), expected);
        }

        #[test]
        fn empty_table() {
            let buf = render(&GroupTable::new(), false).unwrap();
            assert_eq!(buf.as_bytes(), br#"{"iommu_groups":[]}"#);
        }

        #[test]
        fn parses_back() {
            let buf = render(&sample_table(), false).unwrap();
            let value: serde_json::Value = serde_json::from_slice(buf.as_bytes()).unwrap();
            let groups = value["iommu_groups"].as_array().unwrap();
            assert_eq!(groups.len(), 2);
            assert_eq!(groups[0]["id"], 5);
            assert_eq!(groups[0]["devices"][1]["vendor"], "8086");
            assert!(groups[0]["devices"][1].get("revision").is_none());
            assert!(groups[1]["devices"][0].get("class").is_none());
        }

        #[test]
        fn grows_until_it_fits() {
            let table = sample_table();
            let buf = render_with_limits(&table, false, 16, 1024).unwrap();
            assert!(buf.capacity() > 16);
            assert_eq!(buf.as_bytes(), render(&table, false).unwrap().as_bytes());
        }

        #[test]
        fn gives_up_at_max() {
            let result = render_with_limits(&sample_table(), false, 16, 64);
            assert!(matches!(result, Err(Error::BufferExhausted { max: 64 })));
        }
    }

    mod pretty_tests {
        use super::*;

        fn text(buf: &BoundedBuffer) -> &str {
            core::str::from_utf8(buf.as_bytes()).unwrap()
        }

        #[test]
        fn same_value_as_compact() {
            let table = sample_table();
            let compact = render(&table, false).unwrap();
            let pretty = render(&table, true).unwrap();
            assert_ne!(compact.as_bytes(), pretty.as_bytes());

            let a: serde_json::Value = serde_json::from_slice(compact.as_bytes()).unwrap();
            let b: serde_json::Value = serde_json::from_slice(pretty.as_bytes()).unwrap();
            assert_eq!(a, b);
        }

        #[test]
        fn two_space_layout() {
            let mut table = GroupTable::new();
            table
                .insert(
                    7,
                    PciDevice {
                        address: PciAddress::parse(b"0000:00:14.0").unwrap(),
                        properties: None,
                    },
                )
                .unwrap();
            let buf = render(&table, true).unwrap();
            let expected = concat!(
                "{\n",
                "  \"iommu_groups\": [\n",
                "    {\n",
                "      \"id\": 7,\n",
                "      \"devices\": [\n",
                "        {\n",
                "          \"address\": \"0000:00:14.0\"\n",
                "        }\n",
                "      ]\n",
                "    }\n",
                "  ]\n",
                "}",
            );
            assert_eq!(text(&buf), expected);
        }

        #[test]
        fn empty_table_keeps_brackets_together() {
            let buf = render(&GroupTable::new(), true).unwrap();
            assert_eq!(text(&buf), "{\n  \"iommu_groups\": []\n}");
        }

        #[test]
        fn pretty_output_also_grows() {
            let table = sample_table();
            let buf = render_with_limits(&table, true, 16, 4096).unwrap();
            assert_eq!(buf.as_bytes(), render(&table, true).unwrap().as_bytes());
        }
    }
}
