//! Conversational routing: classify a turn, run one domain handler, finalize.

pub mod classifier;
pub mod finalizer;
pub mod handlers;
pub mod history;
pub mod orchestrator;
pub mod prompts;
pub mod session;
