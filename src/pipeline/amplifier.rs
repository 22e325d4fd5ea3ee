//! Amplifier chains.
//!
//! A chain is a ring of machines running the same program. Each machine
//! gets its phase setting as its first input; after that, every output is
//! forwarded as the next machine's input. With a serial program each
//! machine outputs once and then halts; with a feedback program the signal
//! keeps circulating until a machine halts.

use crate::pipeline::permutations::Permutations;
use crate::vm::{Machine, MachineState, VmError};
use thiserror::Error;
use tracing::{debug, info, trace};

/// Phase settings used by serial chains.
pub const SERIAL_PHASES: [i64; 5] = [0, 1, 2, 3, 4];

/// Phase settings used by feedback chains.
pub const FEEDBACK_PHASES: [i64; 5] = [5, 6, 7, 8, 9];

/// A ring of amplifier machines.
#[derive(Debug, Clone)]
pub struct AmplifierChain {
    amps: Vec<Machine>,
    phases: Vec<i64>,
}

impl AmplifierChain {
    /// Build one machine per phase setting, each seeded with its phase.
    pub fn new(program: &[i64], phases: &[i64]) -> Self {
        let amps = phases
            .iter()
            .map(|&phase| {
                let mut amp = Machine::new(program);
                amp.push_input(phase);
                amp
            })
            .collect();

        Self {
            amps,
            phases: phases.to_vec(),
        }
    }

    /// Number of amplifiers.
    pub fn len(&self) -> usize {
        self.amps.len()
    }

    /// Check if the chain has no amplifiers.
    pub fn is_empty(&self) -> bool {
        self.amps.is_empty()
    }

    /// Phase settings, in chain order.
    pub fn phases(&self) -> &[i64] {
        &self.phases
    }

    /// The machines, in chain order.
    pub fn amplifiers(&self) -> &[Machine] {
        &self.amps
    }

    /// Feed `signal` into the first amplifier and circulate until any
    /// amplifier halts. Returns the last signal produced.
    pub fn run(&mut self, signal: i64) -> Result<i64, PipelineError> {
        if self.amps.is_empty() {
            return Err(PipelineError::Empty);
        }

        let mut signal = signal;
        let mut index = 0;

        loop {
            let amp = &mut self.amps[index];
            amp.push_input(signal);

            let state = amp
                .step()
                .map_err(|source| PipelineError::Vm { amplifier: index, source })?;

            match state {
                MachineState::HasOutput => {
                    if let Some(value) = amp.pop_output() {
                        trace!(amplifier = index, value, "forward");
                        signal = value;
                    }
                }
                MachineState::Halted => {
                    debug!(amplifier = index, signal, "chain halted");
                    return Ok(signal);
                }
                MachineState::WaitingForInput | MachineState::Running => {
                    return Err(PipelineError::Stalled { amplifier: index });
                }
            }

            index = (index + 1) % self.amps.len();
        }
    }
}

/// Run one chain with the given phase order, starting from signal 0.
pub fn run_chain(program: &[i64], phases: &[i64]) -> Result<i64, PipelineError> {
    AmplifierChain::new(program, phases).run(0)
}

/// Try every ordering of `phases` and return the highest final signal
/// together with the ordering that produced it.
pub fn max_signal(program: &[i64], phases: &[i64]) -> Result<(i64, Vec<i64>), PipelineError> {
    if phases.is_empty() {
        return Err(PipelineError::Empty);
    }
    for (i, phase) in phases.iter().enumerate() {
        if phases[..i].contains(phase) {
            return Err(PipelineError::DuplicatePhase(*phase));
        }
    }

    let mut best: Option<(i64, Vec<i64>)> = None;
    for order in Permutations::new(phases) {
        let signal = run_chain(program, &order)?;
        trace!(?order, signal, "candidate");
        if best.as_ref().map_or(true, |(top, _)| signal > *top) {
            best = Some((signal, order));
        }
    }

    let best = best.ok_or(PipelineError::Empty)?;
    info!(signal = best.0, phases = ?best.1, "best phase order");
    Ok(best)
}

/// Errors from running an amplifier chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("amplifier {amplifier} failed: {source}")]
    Vm {
        amplifier: usize,
        #[source]
        source: VmError,
    },

    #[error("amplifier {amplifier} asked for input before producing output")]
    Stalled { amplifier: usize },

    #[error("phase setting {0} appears more than once")]
    DuplicatePhase(i64),

    #[error("chain has no amplifiers")]
    Empty,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::DecodeError;

    const SERIAL_43210: [i64; 17] = [3, 15, 3, 16, 1002, 16, 10, 16, 1, 16, 15, 15, 4, 15, 99, 0, 0];

    const SERIAL_54321: [i64; 25] = [
        3, 23, 3, 24, 1002, 24, 10, 24, 1002, 23, -1, 23, 101, 5, 23, 23, 1, 24, 23, 23, 4, 23,
        99, 0, 0,
    ];

    const FEEDBACK_139629729: [i64; 29] = [
        3, 26, 1001, 26, -4, 26, 3, 27, 1002, 27, 2, 27, 1, 27, 26, 27, 4, 27, 1001, 28, -1, 28,
        1005, 28, 6, 99, 0, 0, 5,
    ];

    #[test]
    fn test_serial_chain() {
        assert_eq!(run_chain(&SERIAL_43210, &[4, 3, 2, 1, 0]).unwrap(), 43210);
        assert_eq!(run_chain(&SERIAL_54321, &[0, 1, 2, 3, 4]).unwrap(), 54321);
    }

    #[test]
    fn test_serial_max_signal() {
        let (signal, order) = max_signal(&SERIAL_43210, &SERIAL_PHASES).unwrap();
        assert_eq!(signal, 43210);
        assert_eq!(order, vec![4, 3, 2, 1, 0]);

        let (signal, order) = max_signal(&SERIAL_54321, &SERIAL_PHASES).unwrap();
        assert_eq!(signal, 54321);
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_feedback_chain() {
        assert_eq!(run_chain(&FEEDBACK_139629729, &[9, 8, 7, 6, 5]).unwrap(), 139629729);
    }

    #[test]
    fn test_feedback_max_signal() {
        let (signal, order) = max_signal(&FEEDBACK_139629729, &FEEDBACK_PHASES).unwrap();
        assert_eq!(signal, 139629729);
        assert_eq!(order, vec![9, 8, 7, 6, 5]);
    }

    #[test]
    fn test_chain_keeps_machines_separate() {
        let mut chain = AmplifierChain::new(&SERIAL_43210, &[4, 3, 2, 1, 0]);
        chain.run(0).unwrap();

        // Each machine stored its own phase in cell 15
        let stored: Vec<i64> = chain
            .amplifiers()
            .iter()
            .map(|amp| amp.mem.read(15).unwrap())
            .collect();
        assert_eq!(stored, vec![4, 43, 432, 4321, 43210]);
        assert_eq!(chain.phases(), &[4, 3, 2, 1, 0]);
    }

    #[test]
    fn test_stalled_amplifier() {
        // Reads phase, signal, then wants a third input before any output
        let program = [3, 0, 3, 0, 3, 0, 99];
        assert_eq!(
            run_chain(&program, &[0, 1]),
            Err(PipelineError::Stalled { amplifier: 0 })
        );
    }

    #[test]
    fn test_vm_error_names_amplifier() {
        let err = run_chain(&[3, 0, 3, 0, 42], &[1, 2]).unwrap_err();
        assert_eq!(
            err,
            PipelineError::Vm {
                amplifier: 0,
                source: VmError::Decode { ip: 4, source: DecodeError::UnknownOpcode(42) },
            }
        );
    }

    #[test]
    fn test_invalid_phase_sets() {
        assert_eq!(max_signal(&SERIAL_43210, &[]), Err(PipelineError::Empty));
        assert_eq!(
            max_signal(&SERIAL_43210, &[1, 2, 1]),
            Err(PipelineError::DuplicatePhase(1))
        );
        assert_eq!(AmplifierChain::new(&SERIAL_43210, &[]).run(0), Err(PipelineError::Empty));
    }
}
