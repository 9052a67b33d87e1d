//! Fixed-capacity object pool
//!
//! Slots are allocated once. Acquiring scans from a rotating cursor for the
//! first inactive slot (wrapping once); releasing only flips the slot's
//! active flag, so a retired slot is reusable immediately.

use log::debug;

/// An entity that can live in a [`Pool`] slot
pub trait Poolable: Default {
    fn is_active(&self) -> bool;
    /// Mark the slot live; `slot` is the entity's own pool index
    fn activate(&mut self, slot: usize);
    /// Mark the slot free (entity stays in storage)
    fn deactivate(&mut self);
}

/// Fixed-size slot array with a rotating free-slot cursor
#[derive(Debug, Clone)]
pub struct Pool<T: Poolable> {
    label: &'static str,
    slots: Vec<T>,
    cursor: usize,
}

impl<T: Poolable> Pool<T> {
    pub fn with_capacity(label: &'static str, capacity: usize) -> Self {
        let slots = (0..capacity).map(|_| T::default()).collect();
        debug!("pool `{label}` created with {capacity} slots");
        Self {
            label,
            slots,
            cursor: 0,
        }
    }

    /// Claim a free slot, or `None` when every slot is active
    pub fn acquire(&mut self) -> Option<usize> {
        let capacity = self.slots.len();
        for step in 0..capacity {
            let idx = (self.cursor + step) % capacity;
            if !self.slots[idx].is_active() {
                self.slots[idx].activate(idx);
                self.cursor = (idx + 1) % capacity;
                return Some(idx);
            }
        }
        debug!("pool `{}` exhausted ({capacity} active)", self.label);
        None
    }

    /// Return a slot to the free set
    pub fn release(&mut self, idx: usize) {
        if let Some(slot) = self.slots.get_mut(idx) {
            slot.deactivate();
        }
    }

    pub fn get(&self, idx: usize) -> Option<&T> {
        self.slots.get(idx)
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut T> {
        self.slots.get_mut(idx)
    }

    pub fn iter_active(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().filter(|s| s.is_active())
    }

    pub fn iter_active_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.slots.iter_mut().filter(|s| s.is_active())
    }

    /// Every slot, active or not, in storage order
    pub fn slots(&self) -> &[T] {
        &self.slots
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_active()).count()
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Deactivate every slot and rewind the cursor
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            slot.deactivate();
        }
        self.cursor = 0;
    }
}
