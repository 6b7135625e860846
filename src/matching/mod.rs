//! Exact identity matching of components across documents.
//!
//! There is no similarity scoring here: two components are the same entity
//! only when their highest-priority common identifier is equal.

mod identity;
mod index;

pub use identity::{identity_of, key_of, same_entity, Identifiable, Resolution};
pub use index::{IdentityIndex, IndexMatch};
