//! Core traits for graphmind collaborators.

mod cache;
mod directory;
mod graph_store;
mod llm;

pub use cache::*;
pub use directory::*;
pub use graph_store::*;
pub use llm::*;
