//! Fixed-capacity particle pool
//!
//! Slots `[0, active_count)` are alive, the rest are free. Retiring a slot
//! swaps the last live slot into its place, so the live set stays a dense
//! prefix. Local indices are therefore not stable across retirement; use
//! [`ParticleId`] to follow a particle over time.

use std::fmt;

use glam::Vec4;

use crate::error::{EmitterError, Result};

/// Stable identity of an emitted particle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ParticleId(pub u64);

impl fmt::Display for ParticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "particle#{}", self.0)
    }
}

/// Outcome of a retirement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retirement {
    /// Slot that was freed and now holds the previously last live particle
    pub vacated: usize,
    /// Slot the retired particle's data now sits in (first free slot)
    pub tail: usize,
    /// Identity of the retired particle
    pub id: ParticleId,
}

/// Per-slot bookkeeping of an emitter
#[derive(Debug, Clone, Default)]
pub struct ParticlePool {
    active: Vec<bool>,
    life: Vec<f32>,
    colors: Vec<Vec4>,
    ids: Vec<ParticleId>,
    /// Local slot to global solver index; empty while detached
    indices: Vec<usize>,
    active_count: usize,
    next_id: u64,
}

impl ParticlePool {
    /// Create a pool of `capacity` inactive slots
    pub fn new(capacity: usize) -> Self {
        let mut pool = Self::default();
        pool.reset(capacity);
        pool
    }

    /// Drop every slot and start over with `capacity` inactive ones.
    ///
    /// Solver bindings are dropped too.
    pub fn reset(&mut self, capacity: usize) {
        self.active = vec![false; capacity];
        self.life = vec![0.0; capacity];
        self.colors = vec![Vec4::ONE; capacity];
        self.ids = vec![ParticleId::default(); capacity];
        self.indices.clear();
        self.active_count = 0;
    }

    pub fn capacity(&self) -> usize {
        self.active.len()
    }

    pub fn active_count(&self) -> usize {
        self.active_count
    }

    pub fn is_full(&self) -> bool {
        self.active_count == self.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.active_count == 0
    }

    pub fn is_active(&self, index: usize) -> bool {
        self.active.get(index).copied().unwrap_or(false)
    }

    /// Active flag of every slot
    pub fn active_flags(&self) -> &[bool] {
        &self.active
    }

    /// Remaining life of every slot, in seconds
    pub fn life(&self) -> &[f32] {
        &self.life
    }

    pub fn remaining_life(&self, index: usize) -> Option<f32> {
        self.life.get(index).copied()
    }

    pub fn colors(&self) -> &[Vec4] {
        &self.colors
    }

    pub fn color(&self, index: usize) -> Option<Vec4> {
        self.colors.get(index).copied()
    }

    /// Overwrite a slot's color. Returns false for out-of-range slots.
    pub fn set_color(&mut self, index: usize, color: Vec4) -> bool {
        match self.colors.get_mut(index) {
            Some(slot) => {
                *slot = color;
                true
            }
            None => false,
        }
    }

    /// Identity of the particle in a live slot
    pub fn particle_id(&self, index: usize) -> Option<ParticleId> {
        (index < self.active_count).then(|| self.ids[index])
    }

    /// Local slot of a live particle
    pub fn find(&self, id: ParticleId) -> Option<usize> {
        self.ids[..self.active_count].iter().position(|&p| p == id)
    }

    /// Whether slots are mapped to solver indices
    pub fn is_bound(&self) -> bool {
        !self.indices.is_empty() || self.capacity() == 0
    }

    /// Global solver index of a slot, while bound
    pub fn global_index(&self, index: usize) -> Option<usize> {
        self.indices.get(index).copied()
    }

    /// Global solver indices of every slot, while bound
    pub fn global_indices(&self) -> &[usize] {
        &self.indices
    }

    /// Map slots to solver indices. Slot `i` gets `indices[i]`.
    pub(crate) fn bind(&mut self, indices: Vec<usize>) {
        debug_assert_eq!(indices.len(), self.capacity());
        self.indices = indices;
    }

    /// Forget the solver mapping, returning it
    pub(crate) fn unbind(&mut self) -> Vec<usize> {
        std::mem::take(&mut self.indices)
    }

    /// Take the first free slot and make it live
    pub(crate) fn claim(&mut self, lifespan: f32, color: Vec4) -> Result<usize> {
        if self.is_full() {
            return Err(EmitterError::Full {
                capacity: self.capacity(),
            });
        }

        let index = self.active_count;
        self.life[index] = lifespan;
        self.colors[index] = color;
        self.ids[index] = ParticleId(self.next_id);
        self.next_id += 1;
        self.active[index] = true;
        self.active_count += 1;
        Ok(index)
    }

    /// Retire a live slot by swapping the last live slot into it
    pub(crate) fn retire(&mut self, index: usize) -> Result<Retirement> {
        if self.active_count == 0 || index >= self.active_count {
            return Err(EmitterError::EmptyOrOutOfRange {
                index,
                active: self.active_count,
            });
        }

        self.active_count -= 1;
        let tail = self.active_count;
        self.active[tail] = false;

        if !self.indices.is_empty() {
            self.indices.swap(index, tail);
        }
        self.life.swap(index, tail);
        self.colors.swap(index, tail);
        self.ids.swap(index, tail);

        Ok(Retirement {
            vacated: index,
            tail,
            id: self.ids[tail],
        })
    }

    /// Subtract `dt` from a slot's life, returning what is left
    pub(crate) fn age(&mut self, index: usize, dt: f32) -> f32 {
        self.life[index] -= dt;
        self.life[index]
    }
}
