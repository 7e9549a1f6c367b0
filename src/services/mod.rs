pub mod collaborators;
pub mod llm;

pub use collaborators::*;
pub use llm::*;
