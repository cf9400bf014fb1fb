//! A `Vec` with a hard upper bound.

use crate::error::{Error, Result};

/// List holding at most `CAP` items. Pushing past the bound is an error, not
/// a reallocation, and leaves the list as it was.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoundedList<T, const CAP: usize> {
    items: Vec<T>,
    /// Used in the `CapacityExceeded` message
    what: &'static str,
}

impl<T, const CAP: usize> BoundedList<T, CAP> {
    pub fn new(what: &'static str) -> Self {
        Self {
            items: Vec::new(),
            what,
        }
    }

    /// Append, returning the stored item.
    pub fn try_push(&mut self, item: T) -> Result<&mut T> {
        if self.items.len() >= CAP {
            return Err(Error::CapacityExceeded {
                what: self.what,
                limit: CAP,
            });
        }
        self.items.try_reserve(1).map_err(|_| Error::OutOfMemory)?;
        self.items.push(item);
        let last = self.items.len() - 1;
        Ok(&mut self.items[last])
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.items
    }

    pub fn iter(&self) -> core::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> core::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }
}

impl<'a, T, const CAP: usize> IntoIterator for &'a BoundedList<T, CAP> {
    type Item = &'a T;
    type IntoIter = core::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
