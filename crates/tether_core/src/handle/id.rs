//! Generational object handle
//!
//! Handles are lightweight (8 bytes) references into the handle table.
//! The generation counter detects use of a handle whose slot was recycled.

use std::fmt;

/// Object handle (generation-indexed for safety)
///
/// Format: [32-bit index | 32-bit generation]
/// - Index: Position in the handle table's record array
/// - Generation: Incremented each time the slot is freed
///
/// Slot generations start at 1, so [`Handle::NULL`] never names a live object.
///
/// Example:
/// ```ignore
/// let handle = table.allocate(Category::Crate, obj);
/// table.destroy(handle);
/// table.flush_destructions();
/// assert!(table.resolve(handle).is_none()); // generation mismatch
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    /// The null sentinel. Never valid.
    pub const NULL: Handle = Handle::new(0, 0);

    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }

    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }

    /// Pack into a 64-bit integer (for networking/save files)
    pub fn to_bits(&self) -> u64 {
        ((self.generation as u64) << 32) | (self.index as u64)
    }

    /// Unpack from a 64-bit integer
    pub fn from_bits(bits: u64) -> Self {
        Self {
            index: bits as u32,
            generation: (bits >> 32) as u32,
        }
    }
}

impl Default for Handle {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.index, self.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_preserve_index_and_generation() {
        let handle = Handle::new(7, 0xDEAD_BEEF);
        let back = Handle::from_bits(handle.to_bits());
        assert_eq!(back.index(), 7);
        assert_eq!(back.generation(), 0xDEAD_BEEF);
    }

    #[test]
    fn default_is_null() {
        assert!(Handle::default().is_null());
        assert!(!Handle::new(0, 1).is_null());
        assert_eq!(Handle::new(3, 2).to_string(), "3#2");
    }
}
