//! Multi-machine orchestration.
//!
//! Machines are interleaved by explicit round-robin stepping on a single
//! thread; the only data flowing between them is the forwarded signal.

pub mod amplifier;
pub mod permutations;

pub use amplifier::{
    AmplifierChain, PipelineError, FEEDBACK_PHASES, SERIAL_PHASES, max_signal, run_chain,
};
pub use permutations::Permutations;
