pub mod client;
pub mod oracle;

pub use client::LLMService;
pub use oracle::{Generation, TextOracle};
