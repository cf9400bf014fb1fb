//! LSB radix sort over `u32` keys.
//!
//! Four passes, one per key byte, least significant first. Each pass is a
//! counting sort, so the whole thing is stable. We sort an index array
//! between two buffers and apply the final permutation once, which keeps
//! the routine generic over element types that are not `Copy`.

use crate::error::{Error, Result};

const RADIX: usize = 256;
const PASSES: u32 = 4;

/// Sort `items` ascending by `key`. Stable.
pub fn radix_sort_by_key<T, F>(items: &mut [T], key: F) -> Result<()>
where
    F: Fn(&T) -> u32,
{
    let n = items.len();
    if n < 2 {
        return Ok(());
    }

    let mut keys = try_vec(n)?;
    keys.extend(items.iter().map(&key));
    if keys.is_sorted() {
        return Ok(());
    }

    let mut order = try_vec(n)?;
    order.extend(0..n);
    let mut scratch = try_vec(n)?;
    scratch.resize(n, 0usize);

    for pass in 0..PASSES {
        let shift = pass * 8;
        let digit = |i: usize| ((keys[i] >> shift) & 0xff) as usize;

        let mut counts = [0usize; RADIX];
        for &i in &order {
            counts[digit(i)] += 1;
        }
        // Every key has the same byte here; this pass would be a no-op.
        if counts.iter().any(|&c| c == n) {
            continue;
        }

        let mut offset = 0;
        for count in counts.iter_mut() {
            let c = *count;
            *count = offset;
            offset += c;
        }

        for &i in &order {
            let d = digit(i);
            scratch[counts[d]] = i;
            counts[d] += 1;
        }
        core::mem::swap(&mut order, &mut scratch);
    }

    apply_permutation(items, &mut order);
    Ok(())
}

/// Reorder so that `items[k]` becomes the old `items[order[k]]`.
/// `order` is consumed as scratch.
fn apply_permutation<T>(items: &mut [T], order: &mut [usize]) {
    for start in 0..items.len() {
        if order[start] == start {
            continue;
        }
        // Walk one cycle, swapping each slot into place.
        let mut cur = start;
        loop {
            let next = order[cur];
            order[cur] = cur;
            if next == start {
                break;
            }
            items.swap(cur, next);
            cur = next;
        }
    }
}

fn try_vec<T>(n: usize) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(n).map_err(|_| Error::OutOfMemory)?;
    Ok(v)
}
