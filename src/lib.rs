//! # Intcode VM
//!
//! A resumable virtual machine for the Intcode integer-array program format.
//!
//! Programs are flat lists of signed integers holding both code and data.
//! The machine suspends whenever it needs input, produces output, or halts,
//! so several machines can be wired together and stepped in turn.

pub mod vm;
pub mod program;
pub mod pipeline;
pub mod runner;

#[cfg(feature = "tui")]
pub mod tui;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use vm::{Machine, MachineConfig, MachineState, Memory, Instruction, Mode, Opcode, VmError};
pub use program::{Program, ProgramError, load_program, save_program, disassemble};
pub use pipeline::{AmplifierChain, PipelineError, max_signal, run_chain};
pub use runner::{RunError, run_to_completion, run_diagnostic, find_noun_verb};

#[cfg(feature = "tui")]
pub use tui::run_debugger;
