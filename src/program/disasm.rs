//! Disassembler for Intcode programs.
//!
//! Intcode mixes code and data freely, so the listing is a plain linear
//! sweep: anything that does not decode (or whose operands run off the end
//! of the program) is shown as a `DATA` cell.

use crate::vm::{decode, Instruction, Memory, Mode};

/// Disassemble the instruction at `addr`.
///
/// Returns the text and the number of cells it covers. Cells that do not
/// decode are rendered as `DATA` and cover one cell.
pub fn disassemble_at(mem: &Memory, addr: usize) -> (String, usize) {
    let cell = mem.read(addr as i64).unwrap_or(0);
    let Ok(instr) = decode(cell) else {
        return (format!("DATA {}", cell), 1);
    };

    let operands: Vec<i64> = (1..=instr.opcode.arity())
        .map(|i| mem.read((addr + i) as i64).unwrap_or(0))
        .collect();

    (format_instruction(&instr, &operands), instr.opcode.width())
}

/// Disassemble a whole program.
pub fn disassemble(cells: &[i64]) -> String {
    let mem = Memory::from_program(cells);
    let mut output = String::new();
    output.push_str("; Intcode Disassembly\n");
    output.push_str("; -------------------\n\n");

    let mut addr = 0;
    while addr < cells.len() {
        let (mut line, mut width) = disassemble_at(&mem, addr);
        if addr + width > cells.len() {
            // Operands would read past the end: treat as data
            line = format!("DATA {}", cells[addr]);
            width = 1;
        }

        let raw: Vec<String> = cells[addr..addr + width].iter().map(|c| c.to_string()).collect();
        output.push_str(&format!("{:04}: {:<32} ; {}\n", addr, line, raw.join(",")));
        addr += width;
    }

    output
}

/// Format a decoded instruction with its raw operand values.
pub fn format_instruction(instr: &Instruction, operands: &[i64]) -> String {
    let rendered: Vec<String> = instr
        .operand_modes()
        .iter()
        .zip(operands)
        .map(|(mode, raw)| format_operand(*raw, *mode))
        .collect();

    if rendered.is_empty() {
        instr.opcode.mnemonic().to_string()
    } else {
        format!("{:<4}{}", instr.opcode.mnemonic(), rendered.join(", "))
    }
}

/// Format an operand according to its addressing mode.
fn format_operand(raw: i64, mode: Mode) -> String {
    match mode {
        Mode::Position => format!("[{}]", raw),
        Mode::Immediate => format!("#{}", raw),
        Mode::Relative if raw < 0 => format!("[rb-{}]", raw.unsigned_abs()),
        Mode::Relative => format!("[rb+{}]", raw),
    }
}
