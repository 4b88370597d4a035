//! bimbridge: runs the external BIM-to-3D-print processor for one input file.
//!
//! The library resolves invocation settings, builds the processor's argument
//! vector, supervises the process with cancellation and live output, and
//! writes a durable record of every run. [`orchestrator::Orchestrator`] ties
//! these together and always returns a typed [`outcome::RunOutcome`].

pub mod args;
pub mod error;
pub mod events;
pub mod executor;
pub mod exit_codes;
pub mod orchestrator;
pub mod outcome;
pub mod request;
pub mod run_log;
pub mod settings;
