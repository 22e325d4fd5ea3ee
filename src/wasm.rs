//! WebAssembly bindings for the Intcode VM.
//!
//! This module provides JavaScript-friendly wrappers around the machine.

use js_sys::BigInt64Array;
use wasm_bindgen::prelude::*;
use crate::{Machine, MachineState, Program};
use crate::pipeline::{self, FEEDBACK_PHASES, SERIAL_PHASES};
use crate::program::disasm::disassemble_at;

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// WebAssembly-friendly machine wrapper.
#[wasm_bindgen]
pub struct WasmMachine {
    vm: Machine,
}

#[wasm_bindgen]
impl WasmMachine {
    /// Create a machine with an empty program.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self { vm: Machine::new(&[]) }
    }

    /// Load a program from comma-separated text. Returns the cell count.
    #[wasm_bindgen]
    pub fn load(&mut self, source: &str) -> Result<usize, JsError> {
        let program = Program::parse(source)
            .map_err(|e| JsError::new(&format!("{}", e)))?;

        self.vm = Machine::new(&program.cells);
        Ok(program.len())
    }

    /// Queue an input value.
    #[wasm_bindgen]
    pub fn push_input(&mut self, value: i64) {
        self.vm.push_input(value);
    }

    /// Run until the next suspension. Returns the state name.
    #[wasm_bindgen]
    pub fn step(&mut self) -> Result<String, JsError> {
        let state = self.vm.step()
            .map_err(|e| JsError::new(&format!("{}", e)))?;
        Ok(format!("{:?}", state))
    }

    /// Execute one instruction. Returns its disassembly.
    #[wasm_bindgen]
    pub fn tick(&mut self) -> Result<String, JsError> {
        let (text, _) = disassemble_at(&self.vm.mem, self.vm.ip());
        self.vm.tick()
            .map_err(|e| JsError::new(&format!("{}", e)))?;
        Ok(text)
    }

    /// Run for at most `max_cycles` instructions, passing through outputs.
    #[wasm_bindgen]
    pub fn run(&mut self, max_cycles: u32) -> Result<String, JsError> {
        let limit = self.vm.cycles + max_cycles as u64;
        while self.vm.cycles < limit {
            let state = self.vm.run_limited(limit - self.vm.cycles)
                .map_err(|e| JsError::new(&format!("{}", e)))?;
            if state != MachineState::HasOutput {
                break;
            }
        }
        Ok(format!("{:?}", self.vm.state))
    }

    /// Take every output produced so far.
    #[wasm_bindgen]
    pub fn take_output(&mut self) -> BigInt64Array {
        BigInt64Array::from(self.vm.drain_output().as_slice())
    }

    /// Reset to the loaded program.
    #[wasm_bindgen]
    pub fn reset(&mut self) {
        self.vm.reset();
    }

    /// Check if the machine is halted.
    #[wasm_bindgen]
    pub fn is_halted(&self) -> bool {
        self.vm.is_halted()
    }

    /// Check if the machine is blocked on input.
    #[wasm_bindgen]
    pub fn is_waiting(&self) -> bool {
        self.vm.is_waiting()
    }

    /// Get cycle count.
    #[wasm_bindgen]
    pub fn cycles(&self) -> u64 {
        self.vm.cycles
    }

    /// Get instruction pointer.
    #[wasm_bindgen]
    pub fn ip(&self) -> usize {
        self.vm.ip()
    }

    /// Get relative base.
    #[wasm_bindgen]
    pub fn relative_base(&self) -> i64 {
        self.vm.relative_base()
    }

    /// Get state as string.
    #[wasm_bindgen]
    pub fn state(&self) -> String {
        format!("{:?}", self.vm.state)
    }

    /// Get memory cell value at address (0 past the end).
    #[wasm_bindgen]
    pub fn memory_at(&self, addr: i64) -> i64 {
        self.vm.mem.read(addr).unwrap_or(0)
    }

    /// Get the dense memory region.
    #[wasm_bindgen]
    pub fn memory_all(&self) -> BigInt64Array {
        BigInt64Array::from(self.vm.mem.as_slice())
    }

    /// Get the whole machine as a JSON string.
    #[wasm_bindgen]
    pub fn state_json(&self) -> Result<String, JsError> {
        serde_json::to_string(&self.vm)
            .map_err(|e| JsError::new(&format!("{}", e)))
    }
}

impl Default for WasmMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// Highest amplifier signal for a program. `feedback` picks the phase set.
#[wasm_bindgen]
pub fn wasm_max_signal(source: &str, feedback: bool) -> Result<i64, JsError> {
    let program = Program::parse(source)
        .map_err(|e| JsError::new(&format!("{}", e)))?;
    let phases = if feedback { FEEDBACK_PHASES } else { SERIAL_PHASES };

    let (signal, _) = pipeline::max_signal(&program.cells, &phases)
        .map_err(|e| JsError::new(&format!("{}", e)))?;
    Ok(signal)
}

/// Disassemble a program.
#[wasm_bindgen]
pub fn wasm_disassemble(source: &str) -> Result<String, JsError> {
    let program = Program::parse(source)
        .map_err(|e| JsError::new(&format!("{}", e)))?;
    Ok(crate::program::disassemble(&program.cells))
}
