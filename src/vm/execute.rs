//! Intcode execution engine.
//!
//! Implements the fetch-decode-execute cycle as a resumable state machine.
//! The machine suspends whenever it needs input it does not have, whenever
//! it produces an output, and when it halts.

use std::collections::VecDeque;

use crate::vm::decode::{self, DecodeError, Instruction, Opcode};
use crate::vm::memory::MemoryError;
use crate::vm::operand;
use crate::vm::Memory;
use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::{debug, trace};

/// Machine execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MachineState {
    /// Machine is executing instructions.
    Running,
    /// Machine is blocked on an input instruction with an empty input queue.
    WaitingForInput,
    /// Machine has just pushed a value onto its output queue.
    HasOutput,
    /// Machine has executed a halt instruction.
    Halted,
}

/// Tunables applied when a machine is created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineConfig {
    /// Fixed memory size. `None` lets memory grow without bound.
    pub memory_limit: Option<usize>,
}

/// An Intcode machine.
#[derive(Clone, Serialize, Deserialize)]
pub struct Machine {
    /// Main memory.
    pub mem: Memory,
    /// Current execution state.
    pub state: MachineState,
    /// Instructions executed so far.
    pub cycles: u64,
    ip: usize,
    relative_base: i64,
    input: VecDeque<i64>,
    output: VecDeque<i64>,
    /// Loaded program, kept for `reset`.
    program: Vec<i64>,
    config: MachineConfig,
    /// Last executed instruction (for debugging).
    last_instr: Option<Instruction>,
}

impl Machine {
    /// Create a machine with `program` loaded at address 0.
    pub fn new(program: &[i64]) -> Self {
        Self::with_config(program, MachineConfig::default())
    }

    /// Create a machine with explicit configuration.
    pub fn with_config(program: &[i64], config: MachineConfig) -> Self {
        Self {
            mem: Self::load_memory(program, config),
            state: MachineState::Running,
            cycles: 0,
            ip: 0,
            relative_base: 0,
            input: VecDeque::new(),
            output: VecDeque::new(),
            program: program.to_vec(),
            config,
            last_instr: None,
        }
    }

    fn load_memory(program: &[i64], config: MachineConfig) -> Memory {
        let mem = Memory::from_program(program);
        match config.memory_limit {
            Some(limit) => mem.with_limit(limit),
            None => mem,
        }
    }

    /// Reload the original program and clear all machine state.
    pub fn reset(&mut self) {
        self.mem = Self::load_memory(&self.program, self.config);
        self.state = MachineState::Running;
        self.cycles = 0;
        self.ip = 0;
        self.relative_base = 0;
        self.input.clear();
        self.output.clear();
        self.last_instr = None;
    }

    // ==================== Queues ====================

    /// Append a value to the input queue.
    pub fn push_input(&mut self, value: i64) {
        self.input.push_back(value);
    }

    /// Append several values to the input queue, in order.
    pub fn extend_input<I: IntoIterator<Item = i64>>(&mut self, values: I) {
        self.input.extend(values);
    }

    /// Check whether any input is queued.
    pub fn has_input(&self) -> bool {
        !self.input.is_empty()
    }

    /// Number of queued input values.
    pub fn pending_input(&self) -> usize {
        self.input.len()
    }

    /// Take the oldest produced output, if any.
    pub fn pop_output(&mut self) -> Option<i64> {
        self.output.pop_front()
    }

    /// Take all produced outputs.
    pub fn drain_output(&mut self) -> Vec<i64> {
        self.output.drain(..).collect()
    }

    /// Outputs produced but not yet taken.
    pub fn output(&self) -> &VecDeque<i64> {
        &self.output
    }

    /// Inputs queued but not yet consumed.
    pub fn input(&self) -> &VecDeque<i64> {
        &self.input
    }

    // ==================== Execution ====================

    /// Execute a single instruction.
    ///
    /// A suspended machine is resumed first. An input instruction with an
    /// empty queue leaves the machine untouched apart from its state.
    pub fn tick(&mut self) -> Result<MachineState, VmError> {
        if self.state == MachineState::Halted {
            return Ok(self.state);
        }
        self.state = MachineState::Running;

        // Fetch
        let ip = self.ip;
        let raw = self.mem.read(ip as i64)?;

        // Decode
        let instr = decode::decode(raw).map_err(|source| VmError::Decode { ip, source })?;

        // Execute
        self.execute(instr)?;

        if self.state == MachineState::WaitingForInput {
            debug!(ip, "waiting for input");
        } else {
            trace!(ip, relative_base = self.relative_base, ?instr, "executed");
            self.cycles += 1;
            self.last_instr = Some(instr);
        }

        Ok(self.state)
    }

    /// Run until the next externally observable event: input blocked,
    /// output produced, or halt.
    pub fn step(&mut self) -> Result<MachineState, VmError> {
        loop {
            let state = self.tick()?;
            if state != MachineState::Running {
                debug!(?state, ip = self.ip, cycles = self.cycles, "suspended");
                return Ok(state);
            }
        }
    }

    /// Run until the next suspension. Same as [`Machine::step`].
    pub fn run(&mut self) -> Result<MachineState, VmError> {
        self.step()
    }

    /// Keep running through outputs until the machine halts or needs
    /// input it does not have. Returns `Halted` or `WaitingForInput`;
    /// outputs accumulate on the output queue.
    pub fn run_until_blocked(&mut self) -> Result<MachineState, VmError> {
        loop {
            match self.step()? {
                MachineState::HasOutput | MachineState::Running => continue,
                state => return Ok(state),
            }
        }
    }

    /// Like [`Machine::step`], but give up after `max_cycles` instructions.
    ///
    /// Returns `Running` if the budget ran out first.
    pub fn run_limited(&mut self, max_cycles: u64) -> Result<MachineState, VmError> {
        let limit = self.cycles.saturating_add(max_cycles);

        while self.cycles < limit {
            let state = self.tick()?;
            if state != MachineState::Running {
                return Ok(state);
            }
        }

        Ok(self.state)
    }

    /// Execute a decoded instruction.
    fn execute(&mut self, instr: Instruction) -> Result<(), VmError> {
        let mut next = self.ip + instr.opcode.width();

        match instr.opcode {
            // ==================== Arithmetic ====================

            Opcode::Add => {
                let a = self.param(&instr, 0)?;
                let b = self.param(&instr, 1)?;
                let sum = a.checked_add(b).ok_or(VmError::Overflow)?;
                self.store(&instr, 2, sum)?;
            }

            Opcode::Multiply => {
                let a = self.param(&instr, 0)?;
                let b = self.param(&instr, 1)?;
                let product = a.checked_mul(b).ok_or(VmError::Overflow)?;
                self.store(&instr, 2, product)?;
            }

            // ==================== I/O ====================

            Opcode::Input => {
                let Some(&value) = self.input.front() else {
                    self.state = MachineState::WaitingForInput;
                    return Ok(());
                };
                self.store(&instr, 0, value)?;
                self.input.pop_front();
            }

            Opcode::Output => {
                let value = self.param(&instr, 0)?;
                self.output.push_back(value);
                self.state = MachineState::HasOutput;
            }

            // ==================== Control Flow ====================

            Opcode::JumpIfTrue => {
                if self.param(&instr, 0)? != 0 {
                    next = Self::jump_target(self.param(&instr, 1)?)?;
                }
            }

            Opcode::JumpIfFalse => {
                if self.param(&instr, 0)? == 0 {
                    next = Self::jump_target(self.param(&instr, 1)?)?;
                }
            }

            // ==================== Comparison ====================

            Opcode::LessThan => {
                let a = self.param(&instr, 0)?;
                let b = self.param(&instr, 1)?;
                self.store(&instr, 2, i64::from(a < b))?;
            }

            Opcode::Equals => {
                let a = self.param(&instr, 0)?;
                let b = self.param(&instr, 1)?;
                self.store(&instr, 2, i64::from(a == b))?;
            }

            // ==================== Special ====================

            Opcode::AdjustRelativeBase => {
                let delta = self.param(&instr, 0)?;
                self.relative_base = self
                    .relative_base
                    .checked_add(delta)
                    .ok_or(VmError::Overflow)?;
            }

            Opcode::Halt => {
                self.state = MachineState::Halted;
                next = self.ip;
            }
        }

        self.ip = next;
        Ok(())
    }

    /// Raw operand cell `n` of the instruction at the pointer.
    fn raw_operand(&self, n: usize) -> Result<i64, VmError> {
        Ok(self.mem.read((self.ip + 1 + n) as i64)?)
    }

    /// Resolve operand `n` to a value.
    fn param(&self, instr: &Instruction, n: usize) -> Result<i64, VmError> {
        let raw = self.raw_operand(n)?;
        operand::read_operand(raw, instr.modes[n], &self.mem, self.relative_base)
    }

    /// Write `value` through destination operand `n`.
    fn store(&mut self, instr: &Instruction, n: usize, value: i64) -> Result<(), VmError> {
        let raw = self.raw_operand(n)?;
        operand::write_operand(raw, instr.modes[n], &mut self.mem, self.relative_base, value)
    }

    fn jump_target(target: i64) -> Result<usize, VmError> {
        usize::try_from(target).map_err(|_| VmError::Address(MemoryError::NegativeAddress(target)))
    }

    // ==================== Inspection ====================

    /// Current instruction pointer.
    pub fn ip(&self) -> usize {
        self.ip
    }

    /// Current relative base.
    pub fn relative_base(&self) -> i64 {
        self.relative_base
    }

    /// Configuration the machine was created with.
    pub fn config(&self) -> MachineConfig {
        self.config
    }

    /// Get the last executed instruction.
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }

    /// Check if the machine is halted.
    pub fn is_halted(&self) -> bool {
        self.state == MachineState::Halted
    }

    /// Check if the machine is blocked on input.
    pub fn is_waiting(&self) -> bool {
        self.state == MachineState::WaitingForInput
    }
}

impl std::fmt::Debug for Machine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Machine")
            .field("state", &self.state)
            .field("cycles", &self.cycles)
            .field("ip", &self.ip)
            .field("relative_base", &self.relative_base)
            .field("input", &self.input)
            .field("output", &self.output)
            .field("mem", &self.mem)
            .finish()
    }
}

/// Errors that can occur during execution. All of them are fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VmError {
    #[error("address error: {0}")]
    Address(#[from] MemoryError),

    #[error("decode error at ip={ip}: {source}")]
    Decode {
        ip: usize,
        #[source]
        source: DecodeError,
    },

    #[error("invalid mode: immediate operand used as a write target")]
    ImmediateWrite,

    #[error("arithmetic overflow")]
    Overflow,
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Run a program with no input until it halts and return its memory.
    fn run_program(program: &[i64]) -> Vec<i64> {
        let mut vm = Machine::new(program);
        assert_eq!(vm.run_until_blocked().unwrap(), MachineState::Halted);
        vm.mem.as_slice().to_vec()
    }

    /// Run a program with the given input and collect every output.
    fn outputs(program: &[i64], input: &[i64]) -> Vec<i64> {
        let mut vm = Machine::new(program);
        vm.extend_input(input.iter().copied());
        assert_eq!(vm.run_until_blocked().unwrap(), MachineState::Halted);
        vm.drain_output()
    }

    const COMPARE_TO_EIGHT: [i64; 47] = [
        3, 21, 1008, 21, 8, 20, 1005, 20, 22, 107, 8, 21, 20, 1006, 20, 31, 1106, 0, 36, 98, 0,
        0, 1002, 21, 125, 20, 4, 20, 1105, 1, 46, 104, 999, 1105, 1, 46, 1101, 1000, 1, 20, 4,
        20, 1105, 1, 46, 98, 99,
    ];

    const QUINE: [i64; 16] = [
        109, 1, 204, -1, 1001, 100, 1, 100, 1008, 100, 16, 101, 1006, 101, 0, 99,
    ];

    #[test]
    fn test_add_multiply_programs() {
        assert_eq!(
            run_program(&[1, 9, 10, 3, 2, 3, 11, 0, 99, 30, 40, 50]),
            vec![3500, 9, 10, 70, 2, 3, 11, 0, 99, 30, 40, 50]
        );
        assert_eq!(run_program(&[1, 0, 0, 0, 99]), vec![2, 0, 0, 0, 99]);
        assert_eq!(run_program(&[2, 3, 0, 3, 99]), vec![2, 3, 0, 6, 99]);
        assert_eq!(run_program(&[2, 4, 4, 5, 99, 0]), vec![2, 4, 4, 5, 99, 9801]);
        assert_eq!(
            run_program(&[1, 1, 1, 4, 99, 5, 6, 0, 99]),
            vec![30, 1, 1, 4, 2, 5, 6, 0, 99]
        );
    }

    #[test]
    fn test_immediate_mode() {
        assert_eq!(
            run_program(&[1101, 5, 6, 3, 99, 25, 35]),
            vec![1101, 5, 6, 11, 99, 25, 35]
        );
        assert_eq!(
            run_program(&[1102, 5, 6, 3, 99, 25, 35]),
            vec![1102, 5, 6, 30, 99, 25, 35]
        );
        assert_eq!(run_program(&[1002, 4, 3, 4, 33]), vec![1002, 4, 3, 4, 99]);
        assert_eq!(run_program(&[1101, 100, -1, 4, 0]), vec![1101, 100, -1, 4, 99]);
    }

    #[test]
    fn test_echo() {
        assert_eq!(outputs(&[3, 0, 4, 0, 99], &[1234]), vec![1234]);
    }

    #[test]
    fn test_comparisons() {
        // Position mode, input == 8
        let eq8 = [3, 9, 8, 9, 10, 9, 4, 9, 99, -1, 8];
        assert_eq!(outputs(&eq8, &[8]), vec![1]);
        assert_eq!(outputs(&eq8, &[7]), vec![0]);

        // Immediate mode, input < 8
        let lt8 = [3, 3, 1107, -1, 8, 3, 4, 3, 99];
        assert_eq!(outputs(&lt8, &[5]), vec![1]);
        assert_eq!(outputs(&lt8, &[8]), vec![0]);
    }

    #[test]
    fn test_jumps() {
        let nonzero_pos = [3, 12, 6, 12, 15, 1, 13, 14, 13, 4, 13, 99, -1, 0, 1, 9];
        assert_eq!(outputs(&nonzero_pos, &[0]), vec![0]);
        assert_eq!(outputs(&nonzero_pos, &[5]), vec![1]);

        let nonzero_imm = [3, 3, 1105, -1, 9, 1101, 0, 0, 12, 4, 12, 99, 1];
        assert_eq!(outputs(&nonzero_imm, &[0]), vec![0]);
        assert_eq!(outputs(&nonzero_imm, &[-3]), vec![1]);
    }

    #[test]
    fn test_compare_to_eight() {
        assert_eq!(outputs(&COMPARE_TO_EIGHT, &[7]), vec![999]);
        assert_eq!(outputs(&COMPARE_TO_EIGHT, &[8]), vec![1000]);
        assert_eq!(outputs(&COMPARE_TO_EIGHT, &[9]), vec![1001]);
    }

    #[test]
    fn test_quine() {
        let mut vm = Machine::new(&QUINE);
        assert_eq!(vm.run_until_blocked().unwrap(), MachineState::Halted);
        assert_eq!(vm.drain_output(), QUINE.to_vec());
        assert!(vm.mem.len() > QUINE.len());
    }

    #[test]
    fn test_large_numbers() {
        let out = outputs(&[1102, 34915192, 34915192, 7, 4, 7, 99, 0], &[]);
        assert_eq!(out[0].to_string().len(), 16);

        assert_eq!(outputs(&[104, 1125899906842624, 99], &[]), vec![1125899906842624]);
    }

    #[test]
    fn test_relative_write() {
        // rb := 50; [rb + 3] := input; output [53]
        let program = [109, 50, 203, 3, 4, 53, 99];
        assert_eq!(outputs(&program, &[77]), vec![77]);
    }

    #[test]
    fn test_suspends_on_empty_input() {
        let mut vm = Machine::new(&[3, 0, 4, 0, 99]);

        assert_eq!(vm.step().unwrap(), MachineState::WaitingForInput);
        assert_eq!(vm.ip(), 0);
        assert_eq!(vm.cycles, 0);
        assert_eq!(vm.mem.as_slice(), &[3, 0, 4, 0, 99]);

        // Stays blocked until input arrives
        assert_eq!(vm.step().unwrap(), MachineState::WaitingForInput);

        vm.push_input(-9);
        assert_eq!(vm.step().unwrap(), MachineState::HasOutput);
        assert_eq!(vm.pop_output(), Some(-9));
        assert_eq!(vm.step().unwrap(), MachineState::Halted);
    }

    #[test]
    fn test_suspends_once_per_output() {
        let mut vm = Machine::new(&[104, 1, 104, 2, 99]);

        assert_eq!(vm.run().unwrap(), MachineState::HasOutput);
        assert_eq!(vm.output().len(), 1);
        assert_eq!(vm.run().unwrap(), MachineState::HasOutput);
        assert_eq!(vm.drain_output(), vec![1, 2]);
        assert_eq!(vm.run().unwrap(), MachineState::Halted);
    }

    #[test]
    fn test_halt_is_terminal() {
        let mut vm = Machine::new(&[99]);

        assert_eq!(vm.step().unwrap(), MachineState::Halted);
        assert_eq!(vm.step().unwrap(), MachineState::Halted);
        assert_eq!(vm.ip(), 0);
        assert_eq!(vm.cycles, 1);
        assert!(vm.is_halted());
    }

    #[test]
    fn test_tick_executes_one_instruction() {
        let mut vm = Machine::new(&[1101, 1, 2, 0, 99]);

        assert_eq!(vm.tick().unwrap(), MachineState::Running);
        assert_eq!(vm.ip(), 4);
        assert_eq!(vm.last_instruction().map(|i| i.opcode), Some(Opcode::Add));
        assert_eq!(vm.tick().unwrap(), MachineState::Halted);
    }

    #[test]
    fn test_run_limited() {
        // Tight infinite loop
        let mut vm = Machine::new(&[1105, 1, 0]);

        assert_eq!(vm.run_limited(10).unwrap(), MachineState::Running);
        assert_eq!(vm.cycles, 10);
    }

    #[test]
    fn test_adjust_relative_base() {
        let mut vm = Machine::new(&[109, 19, 109, -7, 99]);
        vm.run().unwrap();
        assert_eq!(vm.relative_base(), 12);
    }

    #[test]
    fn test_reset() {
        let mut vm = Machine::new(&[3, 0, 4, 0, 99]);
        vm.push_input(5);
        vm.run_until_blocked().unwrap();
        assert_eq!(vm.mem.read(0).unwrap(), 5);

        vm.reset();
        assert_eq!(vm.state, MachineState::Running);
        assert_eq!(vm.mem.as_slice(), &[3, 0, 4, 0, 99]);
        assert!(!vm.has_input());
        assert!(vm.output().is_empty());
    }

    #[test]
    fn test_unknown_opcode() {
        let mut vm = Machine::new(&[1101, 0, 0, 5, 42]);

        assert_eq!(
            vm.run(),
            Err(VmError::Decode { ip: 4, source: DecodeError::UnknownOpcode(42) })
        );
    }

    #[test]
    fn test_immediate_write_target() {
        let mut vm = Machine::new(&[11101, 1, 1, 0, 99]);
        assert_eq!(vm.run(), Err(VmError::ImmediateWrite));

        let mut vm = Machine::new(&[103, 0, 99]);
        vm.push_input(1);
        assert_eq!(vm.run(), Err(VmError::ImmediateWrite));
    }

    #[test]
    fn test_negative_address() {
        let mut vm = Machine::new(&[1, -1, 0, 0, 99]);
        assert_eq!(vm.run(), Err(VmError::Address(MemoryError::NegativeAddress(-1))));

        let mut vm = Machine::new(&[1105, 1, -5]);
        assert_eq!(vm.run(), Err(VmError::Address(MemoryError::NegativeAddress(-5))));
    }

    #[test]
    fn test_overflow() {
        let mut vm = Machine::new(&[1102, i64::MAX, 2, 0, 99]);
        assert_eq!(vm.run(), Err(VmError::Overflow));
    }

    #[test]
    fn test_memory_limit() {
        let config = MachineConfig { memory_limit: Some(16) };
        let mut vm = Machine::with_config(&[1101, 1, 1, 100, 99], config);

        assert_eq!(
            vm.run(),
            Err(VmError::Address(MemoryError::OutOfRange { addr: 100, limit: 16 }))
        );

        // Limit survives a reset
        vm.reset();
        assert_eq!(vm.mem.limit(), Some(16));
    }

    #[test]
    fn test_run_until_blocked_stops_on_starved_input() {
        let mut vm = Machine::new(&[104, 5, 3, 0, 4, 0, 99]);

        assert_eq!(vm.run_until_blocked().unwrap(), MachineState::WaitingForInput);
        assert_eq!(vm.drain_output(), vec![5]);

        vm.push_input(8);
        assert_eq!(vm.run_until_blocked().unwrap(), MachineState::Halted);
        assert_eq!(vm.drain_output(), vec![8]);
    }

    #[test]
    fn test_run_matches_step() {
        let program = [104, 1, 104, 2, 99];
        let mut a = Machine::new(&program);
        let mut b = Machine::new(&program);

        for _ in 0..3 {
            assert_eq!(a.run().unwrap(), b.step().unwrap());
            assert_eq!(a.ip(), b.ip());
        }
        assert!(a.is_halted());
    }

    #[test]
    fn test_write_to_huge_address() {
        let far = 1_000_000_000_000;
        let mut vm = Machine::new(&[1101, 1, 1, far, 4, far, 99]);

        assert_eq!(vm.run().unwrap(), MachineState::HasOutput);
        assert_eq!(vm.pop_output(), Some(2));
        assert_eq!(vm.run().unwrap(), MachineState::Halted);
        assert_eq!(vm.mem.read(far).unwrap(), 2);
    }

    #[test]
    fn test_huge_relative_base() {
        // rb += 10^12; [rb+0] = 3 + 4; output [rb+0]
        let program = [109, 1_000_000_000_000, 21101, 3, 4, 0, 204, 0, 99];

        assert_eq!(outputs(&program, &[]), vec![7]);
    }

    #[test]
    fn test_machines_do_not_share_memory() {
        let program = [3, 0, 99];
        let mut a = Machine::new(&program);
        let mut b = Machine::new(&program);

        a.push_input(11);
        b.push_input(22);
        a.run().unwrap();
        b.run().unwrap();

        assert_eq!(a.mem.read(0).unwrap(), 11);
        assert_eq!(b.mem.read(0).unwrap(), 22);
    }
}
