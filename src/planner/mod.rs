pub mod action_planner;
pub mod extract;
pub mod types;

pub use action_planner::{parse_decision, ActionPlanner};
pub use extract::{extract_fields, Extraction};
pub use types::*;
