//! The Intcode virtual machine.
//!
//! - Growable, zero-filled memory of signed 64-bit cells
//! - Three addressing modes: position, immediate, relative
//! - Nine operations plus halt, executed by a resumable state machine

pub mod memory;
pub mod decode;
pub mod operand;
pub mod execute;

pub use memory::{Memory, MemoryError};
pub use decode::{Instruction, Mode, Opcode, DecodeError, decode, encode};
pub use execute::{Machine, MachineConfig, MachineState, VmError};
