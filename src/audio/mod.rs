pub mod backend;
pub mod engine;
pub mod error;
pub mod output;
pub mod progress;
pub mod queue;
pub mod state;
