//! One-shot runners built on top of [`Machine`].
//!
//! These cover the ways whole programs are driven without any external
//! coordination: run to completion with a fixed input list, patch the
//! noun and verb cells, or run a diagnostic self-check.

use crate::vm::{Machine, MachineState, VmError};
use thiserror::Error;
use tracing::{debug, info};

/// Address of the noun cell patched before a run.
pub const NOUN_ADDR: i64 = 1;
/// Address of the verb cell patched before a run.
pub const VERB_ADDR: i64 = 2;
/// Upper bound (inclusive) for noun and verb during a search.
pub const NOUN_VERB_MAX: i64 = 99;

/// Result of running a program to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Dense memory contents after the halt.
    pub memory: Vec<i64>,
    /// Every value the program produced, in order.
    pub outputs: Vec<i64>,
    /// Instructions executed.
    pub cycles: u64,
}

/// Run `program` with a fixed input list until it halts.
///
/// Running out of input is an error here: nothing can supply more.
pub fn run_to_completion(program: &[i64], inputs: &[i64]) -> Result<Completion, RunError> {
    let mut vm = Machine::new(program);
    vm.extend_input(inputs.iter().copied());

    match vm.run_until_blocked()? {
        MachineState::WaitingForInput => Err(RunError::InputExhausted { ip: vm.ip() }),
        _ => Ok(Completion {
            outputs: vm.drain_output(),
            cycles: vm.cycles,
            memory: vm.mem.as_slice().to_vec(),
        }),
    }
}

/// Patch the noun and verb cells, run, and return the value left at address 0.
pub fn run_with_noun_verb(program: &[i64], noun: i64, verb: i64) -> Result<i64, RunError> {
    let mut vm = Machine::new(program);
    vm.mem.write(NOUN_ADDR, noun).map_err(VmError::from)?;
    vm.mem.write(VERB_ADDR, verb).map_err(VmError::from)?;

    match vm.run_until_blocked()? {
        MachineState::WaitingForInput => Err(RunError::InputExhausted { ip: vm.ip() }),
        _ => Ok(vm.mem.read(0).map_err(VmError::from)?),
    }
}

/// Find the noun and verb that make the program leave `target` at address 0.
///
/// Returns `100 * noun + verb` for the first match, searching nouns in the
/// outer loop.
pub fn find_noun_verb(program: &[i64], target: i64) -> Result<Option<i64>, RunError> {
    for noun in 0..=NOUN_VERB_MAX {
        for verb in 0..=NOUN_VERB_MAX {
            if run_with_noun_verb(program, noun, verb)? == target {
                info!(noun, verb, target, "found noun/verb");
                return Ok(Some(100 * noun + verb));
            }
        }
    }

    debug!(target, "no noun/verb pair matched");
    Ok(None)
}

/// Run a diagnostic program for `system_id`.
///
/// Every output but the last is a test result and must be 0. The last
/// output is the diagnostic code, which is returned.
pub fn run_diagnostic(program: &[i64], system_id: i64) -> Result<i64, RunError> {
    let completion = run_to_completion(program, &[system_id])?;

    let Some((&code, checks)) = completion.outputs.split_last() else {
        return Err(RunError::NoOutput);
    };

    if let Some((index, &value)) = checks.iter().enumerate().find(|(_, v)| **v != 0) {
        return Err(RunError::DiagnosticFailed { index, value });
    }

    debug!(system_id, checks = checks.len(), code, "diagnostic passed");
    Ok(code)
}

/// Errors from the one-shot runners.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    #[error("machine error: {0}")]
    Vm(#[from] VmError),

    #[error("program requested input at ip={ip} but none is left")]
    InputExhausted { ip: usize },

    #[error("program produced no output")]
    NoOutput,

    #[error("diagnostic check {index} failed with value {value}")]
    DiagnosticFailed { index: usize, value: i64 },
}
