//! Catalog entries and the primary store that owns them.

mod entry;
mod store;

pub use entry::{CatalogEntry, EntryPatch};
pub(crate) use store::PrimaryStore;
