//! I/O helpers for reading sysfs.
//!
//! Thin wrappers over rustix: open+read a small attribute file, read the
//! last component of a symlink, list a directory. Paths come in as `&CStr`
//! built in a `BoundedBuffer`, so nothing here allocates a path.
//!
//! Every handle is an owned value (`OwnedFd`, `Dir`) and is closed when it
//! goes out of scope, on the error paths too.

use core::ffi::CStr;

use rustix::fs::{Dir, Mode, OFlags, open, readlink};
use rustix::io::{Errno, read};

use crate::buffer::BoundedBuffer;
use crate::error::{Error, Result};

/// sysfs attributes we care about are a handful of bytes ("0x030000\n").
const ATTR_READ_SIZE: usize = 256;

/// Lossy view of a path for log messages.
pub fn display(path: &CStr) -> std::borrow::Cow<'_, str> {
    String::from_utf8_lossy(path.to_bytes())
}

/// Build `base/part/part...` into `out`.
///
/// Returns the finished path, or `None` if it did not fit (or contained a NUL).
pub fn join_path<'a>(out: &'a mut BoundedBuffer, base: &[u8], parts: &[&[u8]]) -> Option<&'a CStr> {
    out.clear();
    out.append(base);
    for part in parts {
        out.append(b"/");
        out.append(part);
    }
    if out.is_overflow() {
        return None;
    }
    out.as_c_str()
}

/// The usable part of a raw attribute value: trailing whitespace trimmed,
/// `None` when nothing is left. Shared by every backend so a value means
/// the same thing wherever it was read.
pub fn attr_value(raw: &[u8]) -> Option<&[u8]> {
    let value = raw.trim_ascii_end();
    (!value.is_empty()).then_some(value)
}

/// Read a single-line attribute file, trimming trailing whitespace.
///
/// Missing, unreadable and empty files are all `NotFound`: in sysfs land a
/// device without a `revision` file is normal.
pub fn read_attr(path: &CStr) -> Result<Vec<u8>> {
    let fd = match open(path, OFlags::RDONLY | OFlags::CLOEXEC, Mode::empty()) {
        Ok(fd) => fd,
        Err(e) => {
            crate::dbg_fail!(display(path), e);
            return Err(Error::NotFound("attribute"));
        }
    };

    let mut buf = [0u8; ATTR_READ_SIZE];
    let len = loop {
        match read(&fd, &mut buf[..]) {
            Ok(n) => break n,
            Err(Errno::INTR) => continue,
            Err(e) => {
                crate::dbg_fail!(display(path), e);
                return Err(Error::NotFound("attribute"));
            }
        }
    };

    attr_value(&buf[..len])
        .map(<[u8]>::to_vec)
        .ok_or(Error::NotFound("attribute"))
}

/// Get the last path component of a symlink's target.
///
/// Used for `iommu_group`, which points at something like
/// `../../../../kernel/iommu_groups/14`.
pub fn read_link_name(path: &CStr) -> Result<Vec<u8>> {
    let target = readlink(path, Vec::new()).map_err(|e| {
        crate::dbg_fail!(display(path), e);
        Error::NotFound("symlink")
    })?;

    let bytes = target.as_bytes();
    let bytes = bytes.strip_suffix(b"/").unwrap_or(bytes);
    let name = match bytes.iter().rposition(|&b| b == b'/') {
        Some(slash) => &bytes[slash + 1..],
        None => bytes,
    };
    Ok(name.to_vec())
}

/// Call `f` with the name of every entry in a directory, skipping `.`, `..`
/// and hidden entries. Stops at the first error `f` returns.
///
/// Failing to open or read the directory is an `Enumerate` error: unlike a
/// missing attribute, there is no sensible partial answer.
pub fn for_each_dir_entry<F>(path: &CStr, mut f: F) -> Result<usize>
where
    F: FnMut(&[u8]) -> Result<()>,
{
    let fd = open(
        path,
        OFlags::RDONLY | OFlags::DIRECTORY | OFlags::CLOEXEC,
        Mode::empty(),
    )
    .map_err(|e| Error::enumerate(display(path), e))?;

    let dir = Dir::read_from(&fd).map_err(|e| Error::enumerate(display(path), e))?;

    let mut count = 0;
    for entry in dir {
        let entry = entry.map_err(|e| Error::enumerate(display(path), e))?;
        let name = entry.file_name().to_bytes();
        if name.first() == Some(&b'.') {
            continue;
        }
        f(name)?;
        count += 1;
    }

    crate::dbg_scan!(display(path), count);
    Ok(count)
}
