/// Sparse array mapping a `u32` key to a value.
///
/// Keys are expected to be dense-ish (handle table slot indices), so the
/// backing storage is a flat vector indexed by key with a presence flag per
/// slot. Storage grows by doubling and never shrinks; iteration walks the
/// whole backing array in ascending key order.
#[derive(Debug, Clone)]
pub struct SlotMap<T> {
    slots: Vec<Option<T>>,
    len: usize,
}

impl<T> SlotMap<T> {
    /// Smallest backing array allocated on first insert.
    const MIN_CAPACITY: usize = 16;

    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            len: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self { slots, len: 0 }
    }

    /// Store `value` under `key`, returning the previous value if present.
    pub fn insert(&mut self, key: u32, value: T) -> Option<T> {
        let idx = key as usize;
        if idx >= self.slots.len() {
            self.grow_to_fit(idx);
        }
        let previous = self.slots[idx].replace(value);
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }

    fn grow_to_fit(&mut self, idx: usize) {
        let new_len = (idx + 1)
            .max(self.slots.len() * 2)
            .max(Self::MIN_CAPACITY);
        self.slots.resize_with(new_len, || None);
    }

    pub fn remove(&mut self, key: u32) -> Option<T> {
        let removed = self.slots.get_mut(key as usize)?.take();
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    #[inline]
    pub fn get(&self, key: u32) -> Option<&T> {
        self.slots.get(key as usize)?.as_ref()
    }

    #[inline]
    pub fn get_mut(&mut self, key: u32) -> Option<&mut T> {
        self.slots.get_mut(key as usize)?.as_mut()
    }

    #[inline]
    pub fn contains(&self, key: u32) -> bool {
        self.get(key).is_some()
    }

    /// Number of present entries.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size of the backing array (highest addressable key + 1).
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Drop every entry, keeping the backing allocation.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.len = 0;
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| slot.as_ref().map(|value| (idx as u32, value)))
    }

    pub fn keys(&self) -> impl Iterator<Item = u32> + '_ {
        self.iter().map(|(key, _)| key)
    }
}

impl<T> Default for SlotMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replace_remove() {
        let mut map = SlotMap::new();
        assert_eq!(map.insert(3, "a"), None);
        assert_eq!(map.insert(3, "b"), Some("a"));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(3), Some(&"b"));
        assert!(!map.contains(2));

        assert_eq!(map.remove(3), Some("b"));
        assert_eq!(map.remove(3), None);
        assert!(map.is_empty());
    }

    #[test]
    fn grows_by_doubling() {
        let mut map = SlotMap::with_capacity(20);
        map.insert(0, 0u8);
        assert_eq!(map.capacity(), 20);

        map.insert(20, 1);
        assert_eq!(map.capacity(), 40);

        // A far key jumps straight past the doubled size.
        map.insert(500, 2);
        assert_eq!(map.capacity(), 501);
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn out_of_range_lookups_are_absent() {
        let mut map: SlotMap<i32> = SlotMap::new();
        assert_eq!(map.get(1_000_000), None);
        assert_eq!(map.get_mut(7), None);
        assert_eq!(map.remove(42), None);
        assert_eq!(map.capacity(), 0);
    }

    #[test]
    fn iterates_in_key_order() {
        let mut map = SlotMap::new();
        map.insert(9, 'c');
        map.insert(1, 'a');
        map.insert(4, 'b');
        map.remove(4);

        let entries: Vec<_> = map.iter().map(|(k, v)| (k, *v)).collect();
        assert_eq!(entries, vec![(1, 'a'), (9, 'c')]);
        assert_eq!(map.keys().collect::<Vec<_>>(), vec![1, 9]);

        map.clear();
        assert_eq!(map.iter().count(), 0);
        assert_eq!(map.capacity(), 16);
    }
}
