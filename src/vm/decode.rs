//! Instruction decoder for Intcode.
//!
//! An instruction cell packs the opcode into its two low decimal digits.
//! The remaining digits, read least-significant first, are the addressing
//! modes of operands 1, 2 and 3.

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Operand addressing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Mode {
    /// Operand is an address to dereference (mode digit 0)
    #[default]
    Position,
    /// Operand is the value itself (mode digit 1)
    Immediate,
    /// Operand is an address offset by the relative base (mode digit 2)
    Relative,
}

impl Mode {
    /// Create from a mode digit.
    pub fn from_digit(digit: i64) -> Result<Self, DecodeError> {
        match digit {
            0 => Ok(Mode::Position),
            1 => Ok(Mode::Immediate),
            2 => Ok(Mode::Relative),
            _ => Err(DecodeError::InvalidMode(digit)),
        }
    }

    /// Convert to a mode digit.
    pub fn to_digit(self) -> i64 {
        match self {
            Mode::Position => 0,
            Mode::Immediate => 1,
            Mode::Relative => 2,
        }
    }
}

/// The closed Intcode operation set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Opcode {
    /// dest := a + b
    Add,
    /// dest := a * b
    Multiply,
    /// dest := next input value
    Input,
    /// emit a
    Output,
    /// if a != 0 then ip := target
    JumpIfTrue,
    /// if a == 0 then ip := target
    JumpIfFalse,
    /// dest := (a < b) as 0/1
    LessThan,
    /// dest := (a == b) as 0/1
    Equals,
    /// relative_base += a
    AdjustRelativeBase,
    /// Stop execution
    Halt,
}

impl Opcode {
    /// Every opcode, in numeric order.
    pub const ALL: [Opcode; 10] = [
        Opcode::Add,
        Opcode::Multiply,
        Opcode::Input,
        Opcode::Output,
        Opcode::JumpIfTrue,
        Opcode::JumpIfFalse,
        Opcode::LessThan,
        Opcode::Equals,
        Opcode::AdjustRelativeBase,
        Opcode::Halt,
    ];

    /// Look up an opcode by its numeric code.
    pub fn from_code(code: i64) -> Option<Self> {
        let op = match code {
            1 => Opcode::Add,
            2 => Opcode::Multiply,
            3 => Opcode::Input,
            4 => Opcode::Output,
            5 => Opcode::JumpIfTrue,
            6 => Opcode::JumpIfFalse,
            7 => Opcode::LessThan,
            8 => Opcode::Equals,
            9 => Opcode::AdjustRelativeBase,
            99 => Opcode::Halt,
            _ => return None,
        };
        Some(op)
    }

    /// The numeric code stored in memory.
    pub fn code(self) -> i64 {
        match self {
            Opcode::Add => 1,
            Opcode::Multiply => 2,
            Opcode::Input => 3,
            Opcode::Output => 4,
            Opcode::JumpIfTrue => 5,
            Opcode::JumpIfFalse => 6,
            Opcode::LessThan => 7,
            Opcode::Equals => 8,
            Opcode::AdjustRelativeBase => 9,
            Opcode::Halt => 99,
        }
    }

    /// Number of operands following the opcode cell.
    pub fn arity(self) -> usize {
        match self {
            Opcode::Add | Opcode::Multiply | Opcode::LessThan | Opcode::Equals => 3,
            Opcode::JumpIfTrue | Opcode::JumpIfFalse => 2,
            Opcode::Input | Opcode::Output | Opcode::AdjustRelativeBase => 1,
            Opcode::Halt => 0,
        }
    }

    /// Total instruction width in cells.
    pub fn width(self) -> usize {
        1 + self.arity()
    }

    /// Assembly mnemonic.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Add => "ADD",
            Opcode::Multiply => "MUL",
            Opcode::Input => "IN",
            Opcode::Output => "OUT",
            Opcode::JumpIfTrue => "JNZ",
            Opcode::JumpIfFalse => "JZ",
            Opcode::LessThan => "LT",
            Opcode::Equals => "EQ",
            Opcode::AdjustRelativeBase => "ARB",
            Opcode::Halt => "HLT",
        }
    }
}

/// Decoded Intcode instruction.
///
/// Operand positions past the opcode's arity always hold `Mode::Position`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: Opcode,
    pub modes: [Mode; 3],
}

impl Instruction {
    /// Instruction with every operand in position mode.
    pub fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            modes: [Mode::Position; 3],
        }
    }

    /// Instruction with explicit operand modes.
    pub fn with_modes(opcode: Opcode, modes: [Mode; 3]) -> Self {
        Self { opcode, modes }
    }

    /// Modes of the operands this instruction actually takes.
    pub fn operand_modes(&self) -> &[Mode] {
        &self.modes[..self.opcode.arity()]
    }
}

/// Decode an instruction cell.
///
/// Mode digits past the opcode's arity are ignored; missing ones default
/// to position mode.
pub fn decode(cell: i64) -> Result<Instruction, DecodeError> {
    if cell < 0 {
        return Err(DecodeError::UnknownOpcode(cell));
    }

    let opcode = Opcode::from_code(cell % 100)
        .ok_or(DecodeError::UnknownOpcode(cell % 100))?;

    let mut modes = [Mode::Position; 3];
    let mut digits = cell / 100;
    for mode in modes.iter_mut().take(opcode.arity()) {
        *mode = Mode::from_digit(digits % 10)?;
        digits /= 10;
    }

    Ok(Instruction { opcode, modes })
}

/// Encode an instruction back to a memory cell.
pub fn encode(instr: &Instruction) -> i64 {
    instr
        .operand_modes()
        .iter()
        .rev()
        .fold(0, |acc, mode| acc * 10 + mode.to_digit())
        * 100
        + instr.opcode.code()
}

/// Errors that can occur during instruction decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unknown opcode: {0}")]
    UnknownOpcode(i64),

    #[error("invalid addressing mode digit: {0}")]
    InvalidMode(i64),
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    use super::Mode::{Immediate as I, Position as P};

    #[test]
    fn test_decode_mode_table() {
        let cases = [
            (1, [P, P, P]),
            (101, [I, P, P]),
            (1101, [I, I, P]),
            (11101, [I, I, I]),
            (10101, [I, P, I]),
        ];

        for (cell, modes) in cases {
            let instr = decode(cell).unwrap();
            assert_eq!(instr.opcode, Opcode::Add);
            assert_eq!(instr.modes, modes, "cell {}", cell);
        }
    }

    #[test]
    fn test_decode_halt() {
        let instr = decode(99).unwrap();
        assert_eq!(instr, Instruction::new(Opcode::Halt));
        assert!(instr.operand_modes().is_empty());
    }

    #[test]
    fn test_decode_relative() {
        let instr = decode(204).unwrap();
        assert_eq!(instr.opcode, Opcode::Output);
        assert_eq!(instr.modes[0], Mode::Relative);
    }

    #[test]
    fn test_excess_mode_digits_ignored() {
        // Output takes one operand; the extra digits are dropped
        let instr = decode(11104).unwrap();
        assert_eq!(instr, Instruction::with_modes(Opcode::Output, [I, P, P]));

        // Halt takes none, so even invalid digits are dropped
        assert_eq!(decode(99199).unwrap().opcode, Opcode::Halt);
        assert_eq!(decode(99904), Err(DecodeError::InvalidMode(9)));
    }

    #[test]
    fn test_explicit_position_digit() {
        // The 0 for operand 1 is explicit, the one for operand 3 is implied
        assert_eq!(decode(1001).unwrap(), Instruction::with_modes(Opcode::Add, [P, I, P]));
    }

    #[test]
    fn test_unknown_opcode() {
        assert_eq!(decode(0), Err(DecodeError::UnknownOpcode(0)));
        assert_eq!(decode(42), Err(DecodeError::UnknownOpcode(42)));
        assert_eq!(decode(198), Err(DecodeError::UnknownOpcode(98)));
        assert_eq!(decode(-1), Err(DecodeError::UnknownOpcode(-1)));
    }

    #[test]
    fn test_invalid_mode_digit() {
        assert_eq!(decode(301), Err(DecodeError::InvalidMode(3)));
    }

    #[test]
    fn test_encode() {
        let instr = Instruction::with_modes(Opcode::Multiply, [P, I, P]);
        assert_eq!(encode(&instr), 1002);
        assert_eq!(encode(&Instruction::new(Opcode::Halt)), 99);
        assert_eq!(decode(encode(&instr)).unwrap(), instr);
    }

    fn any_mode() -> impl Strategy<Value = Mode> {
        prop_oneof![Just(Mode::Position), Just(Mode::Immediate), Just(Mode::Relative)]
    }

    proptest! {
        #[test]
        fn decode_is_idempotent(cell in any::<i64>()) {
            prop_assert_eq!(decode(cell), decode(cell));
        }

        #[test]
        fn unknown_opcodes_are_rejected(high in 0i64..1_000, low in 0i64..100) {
            prop_assume!(Opcode::from_code(low).is_none());
            let cell = high * 100 + low;
            prop_assert_eq!(decode(cell), Err(DecodeError::UnknownOpcode(low)));
        }

        #[test]
        fn explicit_position_digits_decode_like_defaults(
            op in prop::sample::select(Opcode::ALL.to_vec()),
            modes in prop::array::uniform3(any_mode()),
        ) {
            let instr = Instruction::with_modes(op, modes);
            let explicit = decode(encode(&instr)).unwrap();
            // Operands outside the arity fall back to position mode
            for (i, mode) in explicit.modes.iter().enumerate() {
                if i < op.arity() {
                    prop_assert_eq!(*mode, modes[i]);
                } else {
                    prop_assert_eq!(*mode, Mode::Position);
                }
            }
        }
    }
}
