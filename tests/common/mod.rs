pub mod fixtures;
pub mod renderers;

pub use fixtures::*;
pub use renderers::*;
