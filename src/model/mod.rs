//! Schema synthesis and route resolution over the reflected catalog.

pub mod resolved;
pub mod resolver;
pub mod semantic;
pub mod synth;

pub use resolved::*;
pub use resolver::*;
pub use semantic::*;
pub use synth::*;
