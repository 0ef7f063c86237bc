//! # Sorted dens
//!
//! A doubly linked list of den ids ordered by descending nominal collateral ratio (NICR).
//! `first` is the safest den, `last` the riskiest one, which is where redemptions start.
//!
//! The list does not store NICRs. Dens accrue interest and redistribution rewards lazily, so the
//! current NICR of a listed den is read through a lookup supplied by the caller. Insert
//! positions are found from caller-supplied hints; a stale hint only costs a longer walk.

use crate::den_store::*;
use crate::errors::DenError;
use crate::shared_structs::DenId;
use scrypto::prelude::*;

#[derive(ScryptoSbor, PartialEq, Clone, Debug)]
struct Node {
    prev: Option<DenId>,
    next: Option<DenId>,
}

#[derive(ScryptoSbor)]
pub struct SortedDens {
    head: Option<DenId>,
    tail: Option<DenId>,
    size: u64,
    nodes: DenStore<DenId, Node>,
}

impl SortedDens {
    pub fn new() -> Self {
        Self {
            head: None,
            tail: None,
            size: 0,
            nodes: DenStore::new(),
        }
    }

    /// Adds `id` at the position matching `nicr`, starting the search from the hints.
    pub fn insert(
        &mut self,
        id: DenId,
        nicr: Decimal,
        prev_hint: Option<DenId>,
        next_hint: Option<DenId>,
        nicr_of: &dyn Fn(&DenId) -> Decimal,
    ) -> Result<(), DenError> {
        if self.contains(&id) {
            return Err(DenError::AlreadyListed);
        }
        if nicr <= Decimal::ZERO {
            return Err(DenError::ZeroNominalCr);
        }

        let (prev, next) = if self.valid_insert_position(nicr, &prev_hint, &next_hint, nicr_of) {
            (prev_hint, next_hint)
        } else {
            self.find_insert_position(nicr, prev_hint, next_hint, nicr_of)
        };

        match (&prev, &next) {
            (None, None) => {
                self.head = Some(id.clone());
                self.tail = Some(id.clone());
            }
            (None, Some(next_id)) => {
                self.link_prev(next_id, Some(id.clone()));
                self.head = Some(id.clone());
            }
            (Some(prev_id), None) => {
                self.link_next(prev_id, Some(id.clone()));
                self.tail = Some(id.clone());
            }
            (Some(prev_id), Some(next_id)) => {
                self.link_next(prev_id, Some(id.clone()));
                self.link_prev(next_id, Some(id.clone()));
            }
        }

        self.nodes.insert(id, Node { prev, next });
        self.size += 1;

        Ok(())
    }

    /// Unlinks `id` from the list.
    pub fn remove(&mut self, id: &DenId) -> Result<(), DenError> {
        let node = self.nodes.remove(id).ok_or(DenError::NotListed)?;

        if self.size > 1 {
            match (&node.prev, &node.next) {
                (None, Some(next_id)) => {
                    self.link_prev(next_id, None);
                    self.head = Some(next_id.clone());
                }
                (Some(prev_id), None) => {
                    self.link_next(prev_id, None);
                    self.tail = Some(prev_id.clone());
                }
                (Some(prev_id), Some(next_id)) => {
                    self.link_next(prev_id, Some(next_id.clone()));
                    self.link_prev(next_id, Some(prev_id.clone()));
                }
                (None, None) => {}
            }
        } else {
            self.head = None;
            self.tail = None;
        }

        self.size -= 1;

        Ok(())
    }

    /// Moves an already listed den to the position matching its new NICR.
    pub fn re_insert(
        &mut self,
        id: DenId,
        new_nicr: Decimal,
        prev_hint: Option<DenId>,
        next_hint: Option<DenId>,
        nicr_of: &dyn Fn(&DenId) -> Decimal,
    ) -> Result<(), DenError> {
        if !self.contains(&id) {
            return Err(DenError::NotListed);
        }
        if new_nicr <= Decimal::ZERO {
            return Err(DenError::ZeroNominalCr);
        }

        self.remove(&id)?;
        self.insert(id, new_nicr, prev_hint, next_hint, nicr_of)
    }

    pub fn contains(&self, id: &DenId) -> bool {
        self.nodes.get(id).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// The den with the highest NICR.
    pub fn first(&self) -> Option<DenId> {
        self.head.clone()
    }

    /// The den with the lowest NICR.
    pub fn last(&self) -> Option<DenId> {
        self.tail.clone()
    }

    /// The next den toward the riskiest end.
    pub fn next(&self, id: &DenId) -> Option<DenId> {
        load(&self.nodes, id).and_then(|node| node.next)
    }

    /// The previous den toward the safest end.
    pub fn prev(&self, id: &DenId) -> Option<DenId> {
        load(&self.nodes, id).and_then(|node| node.prev)
    }

    /// Checks whether `nicr` fits between `prev` and `next` as they stand.
    pub fn valid_insert_position(
        &self,
        nicr: Decimal,
        prev: &Option<DenId>,
        next: &Option<DenId>,
        nicr_of: &dyn Fn(&DenId) -> Decimal,
    ) -> bool {
        match (prev, next) {
            (None, None) => self.is_empty(),
            (None, Some(next_id)) => {
                self.head.as_ref() == Some(next_id) && nicr >= nicr_of(next_id)
            }
            (Some(prev_id), None) => {
                self.tail.as_ref() == Some(prev_id) && nicr <= nicr_of(prev_id)
            }
            (Some(prev_id), Some(next_id)) => {
                self.next(prev_id).as_ref() == Some(next_id)
                    && nicr_of(prev_id) >= nicr
                    && nicr >= nicr_of(next_id)
            }
        }
    }

    /// Finds the `(prev, next)` pair to insert `nicr` between, tolerating stale hints.
    pub fn find_insert_position(
        &self,
        nicr: Decimal,
        prev_hint: Option<DenId>,
        next_hint: Option<DenId>,
        nicr_of: &dyn Fn(&DenId) -> Decimal,
    ) -> (Option<DenId>, Option<DenId>) {
        let prev = prev_hint.filter(|id| self.contains(id) && nicr <= nicr_of(id));
        let next = next_hint.filter(|id| self.contains(id) && nicr >= nicr_of(id));

        match (prev, next) {
            (Some(prev_id), _) => self.descend_list(nicr, prev_id, nicr_of),
            (None, Some(next_id)) => self.ascend_list(nicr, next_id, nicr_of),
            (None, None) => match self.head.clone() {
                Some(head) => self.descend_list(nicr, head, nicr_of),
                None => (None, None),
            },
        }
    }

    // Walks toward the tail from `start`.
    fn descend_list(
        &self,
        nicr: Decimal,
        start: DenId,
        nicr_of: &dyn Fn(&DenId) -> Decimal,
    ) -> (Option<DenId>, Option<DenId>) {
        if self.head.as_ref() == Some(&start) && nicr >= nicr_of(&start) {
            return (None, Some(start));
        }

        let mut next = self.next(&start);
        let mut prev = Some(start);
        while let Some(prev_id) = prev.clone() {
            if self.valid_insert_position(nicr, &prev, &next, nicr_of) {
                break;
            }
            prev = self.next(&prev_id);
            next = prev.as_ref().and_then(|id| self.next(id));
        }

        (prev, next)
    }

    // Walks toward the head from `start`.
    fn ascend_list(
        &self,
        nicr: Decimal,
        start: DenId,
        nicr_of: &dyn Fn(&DenId) -> Decimal,
    ) -> (Option<DenId>, Option<DenId>) {
        if self.tail.as_ref() == Some(&start) && nicr <= nicr_of(&start) {
            return (Some(start), None);
        }

        let mut prev = self.prev(&start);
        let mut next = Some(start);
        while let Some(next_id) = next.clone() {
            if self.valid_insert_position(nicr, &prev, &next, nicr_of) {
                break;
            }
            next = self.prev(&next_id);
            prev = next.as_ref().and_then(|id| self.prev(id));
        }

        (prev, next)
    }

    fn link_next(&mut self, id: &DenId, next: Option<DenId>) {
        if let Some(mut node) = load(&self.nodes, id) {
            node.next = next;
            self.nodes.insert(id.clone(), node);
        }
    }

    fn link_prev(&mut self, id: &DenId, prev: Option<DenId>) {
        if let Some(mut node) = load(&self.nodes, id) {
            node.prev = prev;
            self.nodes.insert(id.clone(), node);
        }
    }
}
