//! Debugger application state and logic.

use crate::{Machine, MachineConfig, MachineState};
use crate::program::disasm::disassemble_at;
use std::collections::HashSet;

/// Instructions executed per frame while running continuously.
const TICKS_PER_FRAME: usize = 1000;

/// Debugger application state.
pub struct DebuggerApp {
    /// The machine being debugged.
    pub vm: Machine,
    /// Inputs queued at startup, replayed on reset.
    pub initial_input: Vec<i64>,
    /// Breakpoints (by address).
    pub breakpoints: HashSet<usize>,
    /// Every output the machine has produced.
    pub outputs: Vec<i64>,
    /// Is the debugger running continuously?
    pub running: bool,
    /// Should we quit?
    pub should_quit: bool,
    /// Pending input line while in input-entry mode.
    pub input_line: Option<String>,
    /// Status message to display.
    pub status: String,
    /// Memory view scroll offset.
    pub mem_scroll: usize,
}

impl DebuggerApp {
    /// Create a new debugger with a loaded program.
    pub fn new(program: Vec<i64>, input: Vec<i64>, config: MachineConfig) -> Self {
        let mut vm = Machine::with_config(&program, config);
        vm.extend_input(input.iter().copied());

        Self {
            vm,
            initial_input: input,
            breakpoints: HashSet::new(),
            outputs: Vec::new(),
            running: false,
            should_quit: false,
            input_line: None,
            status: "Ready. Press 's' to step, 'r' to run, 'q' to quit.".into(),
            mem_scroll: 0,
        }
    }

    /// Step one instruction.
    pub fn step(&mut self) {
        if self.vm.is_halted() {
            self.status = format!("Halted after {} cycles", self.vm.cycles);
            self.running = false;
            return;
        }

        let ip = self.vm.ip();
        let (text, _) = disassemble_at(&self.vm.mem, ip);
        match self.vm.tick() {
            Ok(MachineState::WaitingForInput) => {
                self.status = format!("ip={:04}: waiting for input, press 'i'", ip);
                self.running = false;
            }
            Ok(state) => {
                self.outputs.extend(self.vm.drain_output());
                self.status = format!("ip={:04}: {}  -> {:?}", ip, text, state);
            }
            Err(e) => {
                self.status = format!("Error: {}", e);
                self.running = false;
            }
        }
    }

    /// Run until halt, breakpoint, input request, or error.
    pub fn run(&mut self) {
        self.running = true;
        self.status = "Running...".into();
    }

    /// Run one batch of continuous execution.
    pub fn tick(&mut self) {
        for _ in 0..TICKS_PER_FRAME {
            if !self.running {
                return;
            }

            if self.vm.is_halted() {
                self.running = false;
                self.status = format!("Halted after {} cycles", self.vm.cycles);
                return;
            }

            self.step();

            // Check for breakpoint
            let ip = self.vm.ip();
            if self.running && self.breakpoints.contains(&ip) {
                self.running = false;
                self.status = format!("Breakpoint at ip={}", ip);
            }
        }
    }

    /// Toggle breakpoint at the current instruction pointer.
    pub fn toggle_breakpoint(&mut self) {
        let ip = self.vm.ip();
        if self.breakpoints.remove(&ip) {
            self.status = format!("Removed breakpoint at ip={}", ip);
        } else {
            self.breakpoints.insert(ip);
            self.status = format!("Set breakpoint at ip={}", ip);
        }
    }

    /// Start typing an input value.
    pub fn begin_input(&mut self) {
        self.running = false;
        self.input_line = Some(String::new());
        self.status = "Input: type a number, Enter to queue, Esc to cancel".into();
    }

    /// Queue the typed input value.
    pub fn submit_input(&mut self) {
        let Some(line) = self.input_line.take() else {
            return;
        };
        match line.trim().parse::<i64>() {
            Ok(value) => {
                self.vm.push_input(value);
                self.status = format!("Queued input {}", value);
            }
            Err(e) => {
                self.status = format!("Bad input {:?}: {}", line, e);
            }
        }
    }

    /// Reset the machine to its initial state.
    pub fn reset(&mut self) {
        self.vm.reset();
        self.vm.extend_input(self.initial_input.iter().copied());
        self.outputs.clear();
        self.running = false;
        self.input_line = None;
        self.status = "Reset. Ready.".into();
    }

    /// Get disassembly starting at the instruction pointer.
    pub fn get_disassembly(&self, lines: usize) -> Vec<(usize, String, bool)> {
        let ip = self.vm.ip();
        let mut addr = ip;

        (0..lines)
            .map(|_| {
                let (text, width) = disassemble_at(&self.vm.mem, addr);
                let line = (addr, text, addr == ip);
                addr += width;
                line
            })
            .collect()
    }
}

/// Run the debugger with a program.
pub fn run_debugger(program: Vec<i64>, input: Vec<i64>, config: MachineConfig) -> std::io::Result<()> {
    use crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::prelude::*;
    use std::io::stdout;
    use std::time::Duration;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut app = DebuggerApp::new(program, input, config);

    loop {
        terminal.draw(|frame| {
            super::ui::draw(frame, &app);
        })?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let Some(line) = app.input_line.as_mut() {
                        match key.code {
                            KeyCode::Char(c) if c.is_ascii_digit() || c == '-' => line.push(c),
                            KeyCode::Backspace => {
                                line.pop();
                            }
                            KeyCode::Enter => app.submit_input(),
                            KeyCode::Esc => {
                                app.input_line = None;
                                app.status = "Input cancelled.".into();
                            }
                            _ => {}
                        }
                        continue;
                    }

                    match key.code {
                        KeyCode::Char('q') => app.should_quit = true,
                        KeyCode::Char('s') => {
                            app.running = false;
                            app.step();
                        }
                        KeyCode::Char('r') => app.run(),
                        KeyCode::Char('p') => {
                            app.running = false;
                            app.status = "Paused.".into();
                        }
                        KeyCode::Char('b') => app.toggle_breakpoint(),
                        KeyCode::Char('i') => app.begin_input(),
                        KeyCode::Char('x') => app.reset(),
                        KeyCode::Up => {
                            app.mem_scroll = app.mem_scroll.saturating_sub(1);
                        }
                        KeyCode::Down => {
                            app.mem_scroll += 1;
                        }
                        KeyCode::PageDown => {
                            app.mem_scroll += 16;
                        }
                        KeyCode::PageUp => {
                            app.mem_scroll = app.mem_scroll.saturating_sub(16);
                        }
                        _ => {}
                    }
                }
            }
        }

        if app.running {
            app.tick();
        }

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
}
