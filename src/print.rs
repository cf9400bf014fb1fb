//! stdout/stderr through rustix `write`, no `std::io` locking.
//!
//! Output is bytes, not `str`: sysfs attributes are not guaranteed to be
//! UTF-8 and we pass them through untouched.

use rustix::fd::BorrowedFd;
use rustix::io::{self, Errno, write};
use rustix::stdio::{stderr, stdout};

use crate::error::{Error, Result};

/// Write the whole slice, retrying short writes and EINTR.
fn write_all(fd: BorrowedFd<'_>, mut bytes: &[u8]) -> io::Result<()> {
    while !bytes.is_empty() {
        match write(fd, bytes) {
            // A zero-length write on a non-empty buffer would spin forever
            Ok(0) => return Err(Errno::IO),
            Ok(n) => bytes = &bytes[n..],
            Err(Errno::INTR) => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// One line of output, raw bytes. A failed write (full disk, closed pipe)
/// is an `Output` error: the run did not deliver its result.
pub fn println(bytes: &[u8]) -> Result<()> {
    // SAFETY: fd 1 stays open for the life of the process; we never close it
    let out = unsafe { stdout() };
    write_all(out, bytes)
        .and_then(|()| write_all(out, b"\n"))
        .map_err(|e| Error::Output(e.to_string()))
}

/// Diagnostics and errors. If stderr is gone there is nobody left to tell,
/// so failures are dropped.
pub fn eprintln(s: &str) {
    // SAFETY: fd 2 stays open for the life of the process; we never close it
    let err = unsafe { stderr() };
    let _ = write_all(err, s.as_bytes()).and_then(|()| write_all(err, b"\n"));
}
