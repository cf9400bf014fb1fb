//! Fixed-capacity byte buffer with overflow tracking.
//!
//! Every path we hand to the kernel and every line we print is assembled in
//! one of these. The capacity is fixed when the buffer is allocated; after
//! that nothing grows. Appending past the end truncates, raises the overflow
//! flag, and turns all further appends into no-ops, so callers can append a
//! whole sequence of pieces and check `is_overflow()` once at the end.
//!
//! The last byte of the capacity is always reserved for a NUL terminator,
//! which lets a finished path go straight to a syscall as a `&CStr`.

use core::ffi::CStr;

use crate::error::{Error, Result};

pub struct BoundedBuffer {
    data: Vec<u8>,
    len: usize,
    overflow: bool,
}

impl BoundedBuffer {
    /// Allocate a buffer holding up to `capacity - 1` bytes plus terminator.
    pub fn allocate(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::CapacityTooSmall(capacity));
        }

        let mut data = Vec::new();
        data.try_reserve_exact(capacity)
            .map_err(|_| Error::OutOfMemory)?;
        data.resize(capacity, 0);

        Ok(Self {
            data,
            len: 0,
            overflow: false,
        })
    }

    /// Reset to empty. The storage is kept.
    pub fn clear(&mut self) {
        self.len = 0;
        self.overflow = false;
        self.data[0] = 0;
    }

    /// Append raw bytes, truncating on overflow.
    pub fn append(&mut self, bytes: &[u8]) {
        if self.overflow {
            return;
        }

        let room = self.data.len() - 1 - self.len;
        let to_copy = if bytes.len() > room {
            self.overflow = true;
            room
        } else {
            bytes.len()
        };

        self.data[self.len..self.len + to_copy].copy_from_slice(&bytes[..to_copy]);
        self.len += to_copy;
        self.data[self.len] = 0;
    }

    #[inline]
    pub fn append_str(&mut self, s: &str) {
        self.append(s.as_bytes());
    }

    /// Append a decimal integer.
    pub fn append_u64(&mut self, value: u64) {
        let mut buf = itoa::Buffer::new();
        self.append_str(buf.format(value));
    }

    /// Append a decimal integer left-padded with zeros to `width` digits,
    /// like printf's `%03u`. Wider values are written in full.
    pub fn append_u64_padded(&mut self, value: u64, width: usize) {
        let mut buf = itoa::Buffer::new();
        let digits = buf.format(value);
        for _ in digits.len()..width {
            self.append(b"0");
        }
        self.append_str(digits);
    }

    /// Contents without the terminator.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Contents as a C string. `None` if an interior NUL was appended.
    pub fn as_c_str(&self) -> Option<&CStr> {
        CStr::from_bytes_with_nul(&self.data[..=self.len]).ok()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[cfg(test)]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total capacity, terminator included.
    #[cfg(test)]
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_overflow(&self) -> bool {
        self.overflow
    }
}
