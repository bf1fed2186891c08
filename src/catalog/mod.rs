//! Catalog Reader: table metadata reflected from PostgreSQL at startup.

pub mod reader;
pub mod types;

pub use reader::*;
pub use types::*;
