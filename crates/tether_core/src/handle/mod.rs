//! Generational object handles.
//!
//! The handle table is the single owner of every tracked object. Gameplay
//! code only ever holds [`Handle`]s and reaches objects through
//! [`HandleTable::resolve`], so a handle into a recycled slot can never
//! observe the slot's new occupant.

mod id;
mod table;

pub use id::Handle;
pub use table::{Category, DestroyQueue, HandleTable};
