//! Scope storage boundary for the Waypoint scenario evaluation engine.
//!
//! The engine never talks to a database directly. It resolves learner scope
//! data through the [`ScopeStore`] trait, which execution backends implement
//! against whatever store actually holds student scope entries. Both lookups
//! may legitimately return "not found" -- that is an `Ok(None)`, not an error.

mod error;
mod memory;
mod record;
mod traits;

pub use error::StorageError;
pub use memory::MemoryScopeStore;
pub use record::ScopeEntryRecord;
pub use traits::ScopeStore;
