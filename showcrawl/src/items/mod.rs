mod project;
pub mod sections;

pub use project::{ExtractError, ProjectRecord};
