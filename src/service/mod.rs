//! CrudService: generic CRUD using the safe SQL builder, plus request validation.

mod crud;
mod validation;
pub use crud::{CrudService, Page};
pub use validation::{parse_text, RequestValidator};
