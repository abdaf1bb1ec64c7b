//! Client id allocator
//!
//! Hands out the smallest positive id not currently in use.

use std::collections::BTreeSet;

use parking_lot::Mutex;

use crate::error::{RegistryError, Result};

/// Assigns and reclaims client ids
///
/// ## Concurrency:
/// - `used`: Protected by Mutex, every operation is one critical section
/// - All methods use `&self`, share it behind `Arc`
#[derive(Debug)]
pub struct IdAllocator {
    /// Ids currently held by connected clients
    used: Mutex<BTreeSet<u32>>,

    /// Largest id that may be handed out
    max_id: u32,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::with_max_id(u32::MAX)
    }
}

impl IdAllocator {
    /// Create an allocator with every id free
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an allocator that never hands out ids above `max_id`
    pub fn with_max_id(max_id: u32) -> Self {
        Self {
            used: Mutex::new(BTreeSet::new()),
            max_id,
        }
    }

    /// Allocate the smallest free id (ids start at 1)
    pub fn allocate(&self) -> Result<u32> {
        let mut used = self.used.lock();

        // Walk the ordered set until the first gap
        let mut candidate: u32 = 1;
        for &id in used.iter() {
            if id != candidate {
                break;
            }
            candidate = candidate.checked_add(1).ok_or_else(|| {
                RegistryError::Capacity("client id space exhausted".to_string())
            })?;
        }

        if candidate > self.max_id {
            return Err(RegistryError::Capacity("client id space exhausted".to_string()));
        }

        used.insert(candidate);
        Ok(candidate)
    }

    /// Claim a specific id if nobody holds it
    ///
    /// Returns `false` when the id is zero, out of range or already taken.
    pub fn claim(&self, id: u32) -> bool {
        if id == 0 || id > self.max_id {
            return false;
        }
        self.used.lock().insert(id)
    }

    /// Return an id to the pool (no-op for free or unknown ids)
    pub fn release(&self, id: u32) {
        self.used.lock().remove(&id);
    }

    /// Whether the id is currently held
    pub fn is_allocated(&self, id: u32) -> bool {
        self.used.lock().contains(&id)
    }

    /// Number of ids currently held
    pub fn len(&self) -> usize {
        self.used.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.lock().is_empty()
    }
}
