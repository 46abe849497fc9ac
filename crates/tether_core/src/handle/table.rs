// table.rs - generation-tagged object store with deferred destruction

use crate::error::HandleError;
use crate::handle::Handle;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

/// Tag used to group objects for type-based iteration.
///
/// Intended to be a small closed enum owned by the game, e.g.
/// `enum Kind { Ship, Station, Asteroid }`.
pub trait Category: Copy + Eq + Hash + fmt::Debug {}

impl<C: Copy + Eq + Hash + fmt::Debug> Category for C {}

/// One slot of the record array.
struct Record<T, C> {
    object: Option<T>,
    alive: bool,
    generation: u32,
    category: C,
    /// Position of this slot inside `members[category]`.
    member_pos: usize,
}

/// Destruction requests collected while visiting a category.
///
/// Requests are applied once the visit finishes, so the member list being
/// walked never shrinks underneath the visitor.
#[derive(Debug, Default)]
pub struct DestroyQueue {
    handles: Vec<Handle>,
}

impl DestroyQueue {
    pub fn destroy(&mut self, handle: Handle) {
        self.handles.push(handle);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

/// Owns every tracked object and hands out generational [`Handle`]s to them.
///
/// Destruction is two-phase: [`destroy`](Self::destroy) only marks the slot
/// dead and queues it; [`flush_destructions`](Self::flush_destructions),
/// called once at the end of the tick, drops the object, bumps the slot's
/// generation and makes the slot reusable.
pub struct HandleTable<T, C: Category> {
    records: Vec<Record<T, C>>,
    free: Vec<u32>,
    pending: Vec<u32>,
    members: HashMap<C, Vec<u32>>,
    live: usize,
    retired: usize,
}

impl<T, C: Category> HandleTable<T, C> {
    /// Initial record capacity.
    const INITIAL_CAPACITY: usize = 64;

    /// First generation stamped into a fresh slot. Zero is reserved for [`Handle::NULL`].
    const FIRST_GENERATION: u32 = 1;

    pub fn new() -> Self {
        Self::with_capacity(Self::INITIAL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
            free: Vec::new(),
            pending: Vec::new(),
            members: HashMap::new(),
            live: 0,
            retired: 0,
        }
    }

    /// Admit an object and return its handle.
    ///
    /// # Panics
    /// Panics if the `u32` index space is exhausted. There is no graceful
    /// degradation for that condition; use [`try_allocate`](Self::try_allocate)
    /// to observe it instead.
    pub fn allocate(&mut self, category: C, object: T) -> Handle {
        match self.try_allocate(category, object) {
            Ok(handle) => handle,
            Err(err) => panic!("{err}"),
        }
    }

    /// Admit an object, reusing the most recently freed slot when possible.
    pub fn try_allocate(&mut self, category: C, object: T) -> Result<Handle, HandleError> {
        let members = self.members.entry(category).or_default();

        let index = match self.free.pop() {
            Some(index) => {
                let record = &mut self.records[index as usize];
                record.object = Some(object);
                record.alive = true;
                record.category = category;
                record.member_pos = members.len();
                index
            }
            None => {
                let slots = self.records.len();
                let index =
                    u32::try_from(slots).map_err(|_| HandleError::CapacityExhausted { slots })?;

                if slots == self.records.capacity() {
                    self.records.reserve(slots.max(Self::INITIAL_CAPACITY));
                    tracing::debug!(
                        capacity = self.records.capacity(),
                        "handle table grew record array"
                    );
                }

                self.records.push(Record {
                    object: Some(object),
                    alive: true,
                    generation: Self::FIRST_GENERATION,
                    category,
                    member_pos: members.len(),
                });
                index
            }
        };

        members.push(index);
        self.live += 1;
        Ok(Handle::new(index, self.records[index as usize].generation))
    }

    /// Logically destroy the object behind `handle`.
    ///
    /// Returns `false` (and does nothing) if the handle is stale, null or
    /// already destroyed. The slot is recycled by the next flush.
    pub fn destroy(&mut self, handle: Handle) -> bool {
        if !self.is_valid(handle) {
            return false;
        }
        self.records[handle.index() as usize].alive = false;
        self.pending.push(handle.index());
        self.live -= 1;
        true
    }

    /// Physically free every slot destroyed since the last flush.
    ///
    /// Returns the number of slots released.
    pub fn flush_destructions(&mut self) -> usize {
        self.flush_destructions_with(|_, _| {})
    }

    /// Like [`flush_destructions`](Self::flush_destructions), handing each
    /// released object and the handle it was known by to `on_release`.
    pub fn flush_destructions_with<F>(&mut self, mut on_release: F) -> usize
    where
        F: FnMut(Handle, T),
    {
        let mut released = 0;
        let pending = std::mem::take(&mut self.pending);

        for &index in &pending {
            let record = &mut self.records[index as usize];
            let Some(object) = record.object.take() else {
                // Already released by an earlier entry for the same slot.
                continue;
            };
            let handle = Handle::new(index, record.generation);

            Self::unregister(&mut self.members, &mut self.records, index);

            let record = &mut self.records[index as usize];
            match record.generation.checked_add(1) {
                Some(next) => {
                    record.generation = next;
                    self.free.push(index);
                }
                None => {
                    self.retired += 1;
                    let err = HandleError::GenerationOverflow { index };
                    tracing::error!(error = %err, "retiring slot");
                }
            }

            tracing::trace!(%handle, "released slot");
            on_release(handle, object);
            released += 1;
        }

        // Reuse the queue's allocation for the next tick.
        let mut pending = pending;
        pending.clear();
        self.pending = pending;

        released
    }

    /// Remove `index` from its category list in O(1) via swap-remove.
    fn unregister(members: &mut HashMap<C, Vec<u32>>, records: &mut [Record<T, C>], index: u32) {
        let (category, pos) = {
            let record = &records[index as usize];
            (record.category, record.member_pos)
        };
        let Some(list) = members.get_mut(&category) else {
            return;
        };
        debug_assert_eq!(list.get(pos), Some(&index), "category list out of sync");
        list.swap_remove(pos);
        if let Some(&moved) = list.get(pos) {
            records[moved as usize].member_pos = pos;
        }
    }

    /// `true` if `handle` names a live object.
    #[inline]
    pub fn is_valid(&self, handle: Handle) -> bool {
        !handle.is_null()
            && self
                .records
                .get(handle.index() as usize)
                .is_some_and(|r| r.alive && r.generation == handle.generation())
    }

    /// The sanctioned way to reach a tracked object.
    pub fn resolve(&self, handle: Handle) -> Option<&T> {
        if !self.is_valid(handle) {
            return None;
        }
        self.records[handle.index() as usize].object.as_ref()
    }

    pub fn resolve_mut(&mut self, handle: Handle) -> Option<&mut T> {
        if !self.is_valid(handle) {
            return None;
        }
        self.records[handle.index() as usize].object.as_mut()
    }

    /// [`resolve`](Self::resolve) reporting stale handles as an error.
    pub fn try_resolve(&self, handle: Handle) -> Result<&T, HandleError> {
        self.resolve(handle)
            .ok_or(HandleError::InvalidHandle { handle })
    }

    pub fn category_of(&self, handle: Handle) -> Option<C> {
        if !self.is_valid(handle) {
            return None;
        }
        Some(self.records[handle.index() as usize].category)
    }

    /// Current live handle for a slot index, if the slot holds a live object.
    pub fn handle_at(&self, index: u32) -> Option<Handle> {
        let record = self.records.get(index as usize)?;
        record.alive.then(|| Handle::new(index, record.generation))
    }

    /// Live handles registered under `category`.
    ///
    /// Objects destroyed earlier in the tick are skipped; their slots stay
    /// in the member list until the flush, so the sequence is stable for
    /// the rest of the tick.
    pub fn iter_category(&self, category: C) -> impl Iterator<Item = Handle> + '_ {
        self.members
            .get(&category)
            .into_iter()
            .flatten()
            .filter_map(move |&index| self.handle_at(index))
    }

    /// Every live object with its handle and category.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, C, &T)> + '_ {
        self.records.iter().enumerate().filter_map(|(index, record)| {
            if !record.alive {
                return None;
            }
            let object = record.object.as_ref()?;
            Some((Handle::new(index as u32, record.generation), record.category, object))
        })
    }

    /// Visit every live object of `category` mutably.
    ///
    /// The visitor may request destruction of any handle (including the one
    /// being visited) through the [`DestroyQueue`]; requests are applied
    /// after the last object has been visited. Returns the number of
    /// handles actually destroyed.
    pub fn for_each_in_category_mut<F>(&mut self, category: C, mut visit: F) -> usize
    where
        F: FnMut(Handle, &mut T, &mut DestroyQueue),
    {
        let mut queue = DestroyQueue::default();

        if let Some(list) = self.members.get(&category) {
            for &index in list {
                let record = &mut self.records[index as usize];
                if !record.alive {
                    continue;
                }
                let handle = Handle::new(index, record.generation);
                if let Some(object) = record.object.as_mut() {
                    visit(handle, object, &mut queue);
                }
            }
        }

        if queue.is_empty() {
            return 0;
        }
        let requested = queue.len();
        let destroyed = queue
            .handles
            .into_iter()
            .filter(|&handle| self.destroy(handle))
            .count();
        tracing::trace!(?category, requested, destroyed, "applied queued destructions");
        destroyed
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of slots ever created (live, pending, free or retired).
    pub fn slot_count(&self) -> usize {
        self.records.len()
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    pub fn pending_destructions(&self) -> usize {
        self.pending.len()
    }

    /// Slots permanently withdrawn because their generation was exhausted.
    pub fn retired_count(&self) -> usize {
        self.retired
    }

    #[cfg(test)]
    fn force_generation(&mut self, index: u32, generation: u32) {
        self.records[index as usize].generation = generation;
    }
}

impl<T, C: Category> Default for HandleTable<T, C> {
    fn default() -> Self {
        Self::new()
    }
}
