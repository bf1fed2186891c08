pub mod context;
pub use context::RequestContext;
