//! TUI debugger for Intcode programs.
//!
//! Provides an interactive terminal-based debugger with:
//! - Disassembly from the instruction pointer
//! - Machine state: pointer, relative base, queues
//! - Memory view and output log
//! - Step/run/breakpoint/input controls

mod app;
mod ui;

pub use app::{DebuggerApp, run_debugger};
