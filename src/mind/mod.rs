pub mod global;
pub mod observation;
pub mod registry;
pub mod services;
pub mod sub_mind;

pub use global::{GlobalMind, GlobalMindState};
pub use observation::{ChatMessage, ObservationRegistry};
pub use registry::{ActionProposal, MindRegistry};
pub use services::MindServices;
pub use sub_mind::{SubMind, SubMindState};
