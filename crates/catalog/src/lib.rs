pub mod catalog;
pub mod memory;
pub mod types;

pub use catalog::{CatalogError, PathwayCatalog};
pub use memory::{MemoryCatalog, MemoryCatalogBuilder};
pub use types::{PathwayId, ProteinEntry};
