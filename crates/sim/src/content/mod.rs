mod catalog;
mod compiler;
mod hashing;

pub use catalog::{Catalog, RecipeDef};
pub use compiler::{load_catalog, ContentError, ContentErrorCode, SourceLocation};
pub use hashing::fingerprint_bytes;
