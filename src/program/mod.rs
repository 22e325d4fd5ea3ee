//! Loading and inspecting Intcode programs.
//!
//! This module provides:
//! - The comma-separated program text format
//! - A linear-sweep disassembler

pub mod disasm;
pub mod loader;

pub use disasm::{disassemble, disassemble_at};
pub use loader::{Program, ProgramError, load_program, save_program};
