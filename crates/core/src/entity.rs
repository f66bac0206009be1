//! Catalog records addressed by a typed id.

use core::fmt::{Debug, Display};
use core::hash::Hash;

/// A catalog record (product, category) that stores key by its id.
///
/// Ids are `Copy` UUID newtypes, so callers take them by value.
pub trait Entity {
    type Id: Copy + Eq + Hash + Display + Debug;

    fn id(&self) -> &Self::Id;

    /// The id, copied out of the record.
    fn key(&self) -> Self::Id {
        *self.id()
    }
}
