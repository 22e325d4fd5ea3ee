//! Operand resolution.
//!
//! Turns a raw operand cell plus its addressing mode into a value (for
//! reads) or a target address (for writes).

use crate::vm::decode::Mode;
use crate::vm::execute::VmError;
use crate::vm::Memory;

/// Address an operand refers to, or `None` for immediate operands.
pub fn effective_address(raw: i64, mode: Mode, relative_base: i64) -> Result<Option<i64>, VmError> {
    match mode {
        Mode::Position => Ok(Some(raw)),
        Mode::Immediate => Ok(None),
        Mode::Relative => raw
            .checked_add(relative_base)
            .map(Some)
            .ok_or(VmError::Overflow),
    }
}

/// Read an operand value.
pub fn read_operand(raw: i64, mode: Mode, mem: &Memory, relative_base: i64) -> Result<i64, VmError> {
    match effective_address(raw, mode, relative_base)? {
        Some(addr) => Ok(mem.read(addr)?),
        None => Ok(raw),
    }
}

/// Store `value` through a destination operand.
///
/// Immediate operands cannot be written to.
pub fn write_operand(
    raw: i64,
    mode: Mode,
    mem: &mut Memory,
    relative_base: i64,
    value: i64,
) -> Result<(), VmError> {
    let addr = effective_address(raw, mode, relative_base)?
        .ok_or(VmError::ImmediateWrite)?;
    mem.write(addr, value)?;
    Ok(())
}
