//! Dense array of active den ids.
//!
//! Each den stores its slot, so removal swaps the last id into the freed slot in O(1).

use crate::den_store::*;
use crate::shared_structs::DenId;
use scrypto::prelude::*;

#[derive(ScryptoSbor)]
pub struct DenOwners {
    owners: DenStore<u64, DenId>,
    len: u64,
}

impl DenOwners {
    pub fn new() -> Self {
        Self {
            owners: DenStore::new(),
            len: 0,
        }
    }

    /// Appends `id` and returns its slot.
    pub fn push(&mut self, id: DenId) -> u64 {
        let index = self.len;
        self.owners.insert(index, id);
        self.len += 1;
        index
    }

    /// Removes the id at `index` by moving the last id into its slot.
    ///
    /// Returns the moved id and its new slot, or `None` when the removed id was the last one.
    pub fn swap_remove(&mut self, index: u64) -> Option<(DenId, u64)> {
        if index >= self.len {
            return None;
        }

        let last = self.len - 1;
        self.len -= 1;
        let tail = self.owners.remove(&last)?;
        if index == last {
            return None;
        }

        self.owners.insert(index, tail.clone());
        Some((tail, index))
    }

    pub fn get(&self, index: u64) -> Option<DenId> {
        if index >= self.len {
            return None;
        }
        load(&self.owners, &index)
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
