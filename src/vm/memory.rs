//! Intcode memory subsystem.
//!
//! Memory holds both code and data. It is logically unbounded: reads past
//! the current extent yield 0 and writes anywhere succeed. Cells near the
//! loaded program live in a dense vector; far-away cells live in a sparse
//! map, so a write to a huge address costs one map entry.
//! An optional limit turns the memory back into a fixed-size array.

use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Writes this close past the dense extent grow the vector instead of
/// going to the sparse map.
pub const GROW_WINDOW: usize = 4096;

/// Intcode memory: an unbounded array of signed 64-bit cells.
///
/// Invariant: every key in `far` is at or past `cells.len()`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    cells: Vec<i64>,
    /// Non-zero cells beyond the dense extent, keyed by address.
    far: BTreeMap<i64, i64>,
    /// Highest number of cells this memory may grow to, if any.
    limit: Option<usize>,
}

impl Memory {
    /// Create an empty, unbounded memory.
    pub fn new() -> Self {
        Self::from_program(&[])
    }

    /// Create a memory holding a copy of `program` at addresses 0..N-1.
    pub fn from_program(program: &[i64]) -> Self {
        Self {
            cells: program.to_vec(),
            far: BTreeMap::new(),
            limit: None,
        }
    }

    /// Cap the memory at `limit` cells. Addresses at or past the limit
    /// fail with [`MemoryError::OutOfRange`].
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// The configured limit, if any.
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Read the cell at `addr`. Cells never written read as 0.
    #[inline]
    pub fn read(&self, addr: i64) -> Result<i64, MemoryError> {
        self.check(addr)?;
        Ok(self.cell(addr))
    }

    /// Write `value` at `addr`.
    pub fn write(&mut self, addr: i64, value: i64) -> Result<(), MemoryError> {
        self.check(addr)?;

        let dense = self.cells.len() as u64;
        let target = addr as u64;

        if target < dense {
            self.cells[target as usize] = value;
        } else if target - dense < GROW_WINDOW as u64 {
            self.grow(target as usize + 1);
            self.cells[target as usize] = value;
        } else if value == 0 {
            self.far.remove(&addr);
        } else {
            self.far.insert(addr, value);
        }
        Ok(())
    }

    /// Extend the dense vector to `len` cells, pulling in any sparse
    /// cells it now covers.
    fn grow(&mut self, len: usize) {
        self.cells.resize(len, 0);

        let rest = self.far.split_off(&(len as i64));
        for (addr, value) in std::mem::replace(&mut self.far, rest) {
            self.cells[addr as usize] = value;
        }
    }

    /// Cell value without validation. `addr` must be non-negative.
    fn cell(&self, addr: i64) -> i64 {
        match usize::try_from(addr) {
            Ok(index) if index < self.cells.len() => self.cells[index],
            _ => self.far.get(&addr).copied().unwrap_or(0),
        }
    }

    /// Reject negative addresses and addresses past the limit.
    fn check(&self, addr: i64) -> Result<(), MemoryError> {
        if addr < 0 {
            return Err(MemoryError::NegativeAddress(addr));
        }
        match self.limit {
            Some(limit) if addr as u64 >= limit as u64 => {
                Err(MemoryError::OutOfRange { addr, limit })
            }
            _ => Ok(()),
        }
    }

    /// Number of cells in the dense region.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check whether no cell has been loaded or written.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty() && self.far.is_empty()
    }

    /// Dense cells, in address order. Far cells are not included.
    pub fn as_slice(&self) -> &[i64] {
        &self.cells
    }

    /// Non-zero cells outside the dense region, in address order.
    pub fn far_cells(&self) -> impl Iterator<Item = (i64, i64)> + '_ {
        self.far.iter().map(|(&addr, &value)| (addr, value))
    }

    /// Number of non-zero cells outside the dense region.
    pub fn far_len(&self) -> usize {
        self.far.len()
    }

    /// Dump `count` cells starting at `start` (for debugging).
    /// Cells never written are reported as 0.
    pub fn dump(&self, start: usize, count: usize) -> Vec<(usize, i64)> {
        (start..start.saturating_add(count))
            .map(|i| (i, i64::try_from(i).map_or(0, |addr| self.cell(addr))))
            .collect()
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let non_zero = self.cells.iter().filter(|&&cell| cell != 0).count();

        f.debug_struct("Memory")
            .field("non_zero_cells", &(non_zero + self.far.len()))
            .field("dense_cells", &self.cells.len())
            .field("far_cells", &self.far.len())
            .field("limit", &self.limit)
            .finish()
    }
}

/// Errors that can occur during memory operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// Intcode addresses are never negative.
    #[error("negative memory address {0}")]
    NegativeAddress(i64),

    /// Address lies beyond a fixed memory limit.
    #[error("memory address {addr} out of range (limit {limit})")]
    OutOfRange { addr: i64, limit: usize },
}
