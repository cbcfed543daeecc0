//! Fallible buffer allocation
//!
//! Working grids and per-cell vectors are sized from the input header, so an
//! oversized grid must surface as [`Error::Allocation`] instead of aborting.

use crate::error::{Error, Result};

/// Empty vector with room for exactly `capacity` elements
pub fn try_with_capacity<T>(capacity: usize, structure: &'static str) -> Result<Vec<T>> {
    let mut buf: Vec<T> = Vec::new();
    buf.try_reserve_exact(capacity)
        .map_err(|_| Error::Allocation { structure })?;
    Ok(buf)
}

/// Vector of `len` copies of `value`
pub fn try_vec<T: Clone>(len: usize, value: T, structure: &'static str) -> Result<Vec<T>> {
    let mut buf = try_with_capacity(len, structure)?;
    buf.resize(len, value);
    Ok(buf)
}
