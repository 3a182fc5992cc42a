//! The question-answering agent.
//!
//! Wires validated settings, the Gemini collaborator, the scoring service and the
//! pipeline together. Construction is the only place configuration is checked.

mod runner;

pub use runner::Agent;
