//! HTTP handlers for entity CRUD and documentation.

pub mod docs;
pub mod entity;
pub use docs::*;
pub use entity::*;
