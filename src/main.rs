//! Intcode VM - CLI Entry Point
//!
//! Commands:
//! - `intcode run <program>` - Run a program, printing its outputs
//! - `intcode amp <program>` - Find the best amplifier phase order
//! - `intcode search <program>` - Find the noun/verb producing a target
//! - `intcode diag <program>` - Run a diagnostic program
//! - `intcode disasm <program>` - Disassemble a program
//! - `intcode debug <program>` - Interactive debugger

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "intcode")]
#[command(author = "Yigit")]
#[command(version = "0.1.0")]
#[command(about = "A resumable Intcode virtual machine")]
struct Cli {
    /// Log verbosity (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts
    Run {
        /// Path to the program file
        program: String,
        /// Input values, comma-separated
        #[arg(short, long, value_delimiter = ',', allow_negative_numbers = true)]
        input: Vec<i64>,
        /// Value to patch into address 1 before running
        #[arg(long, allow_negative_numbers = true)]
        noun: Option<i64>,
        /// Value to patch into address 2 before running
        #[arg(long, allow_negative_numbers = true)]
        verb: Option<i64>,
        /// Prompt for input on stdin when the queue runs dry
        #[arg(long)]
        interactive: bool,
        /// Maximum number of instructions to execute
        #[arg(short, long)]
        max_cycles: Option<u64>,
        /// Fixed memory size in cells
        #[arg(long)]
        memory_limit: Option<usize>,
        /// Print every executed instruction
        #[arg(short, long)]
        trace: bool,
        /// Print a JSON report instead of plain outputs
        #[arg(long)]
        json: bool,
    },
    /// Find the phase order that maximises the amplifier signal
    Amp {
        /// Path to the program file
        program: String,
        /// Use the feedback phase set (5-9) instead of the serial one (0-4)
        #[arg(short, long)]
        feedback: bool,
        /// Explicit phase set, comma-separated
        #[arg(short, long, value_delimiter = ',', allow_negative_numbers = true, conflicts_with = "feedback")]
        phases: Option<Vec<i64>>,
    },
    /// Find the noun and verb that leave a target value at address 0
    Search {
        /// Path to the program file
        program: String,
        /// Value to look for
        #[arg(short, long, default_value = "19690720", allow_negative_numbers = true)]
        target: i64,
    },
    /// Run a diagnostic program and print its code
    Diag {
        /// Path to the program file
        program: String,
        /// System ID fed as the only input
        #[arg(short, long, default_value = "1", allow_negative_numbers = true)]
        system_id: i64,
    },
    /// Disassemble a program to readable text
    Disasm {
        /// Path to the program file
        program: String,
    },
    /// Interactive debugger
    Debug {
        /// Path to the program file
        program: String,
        /// Input values queued before starting, comma-separated
        #[arg(short, long, value_delimiter = ',', allow_negative_numbers = true)]
        input: Vec<i64>,
        /// Fixed memory size in cells
        #[arg(long)]
        memory_limit: Option<usize>,
    },
    /// Run the built-in self-test
    Test,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Some(Commands::Run { program, input, noun, verb, interactive, max_cycles, memory_limit, trace, json }) => {
            let opts = RunOptions { input, noun, verb, interactive, max_cycles, memory_limit, trace, json };
            run_program(&program, opts);
        }
        Some(Commands::Amp { program, feedback, phases }) => {
            amplify(&program, feedback, phases);
        }
        Some(Commands::Search { program, target }) => {
            search(&program, target);
        }
        Some(Commands::Diag { program, system_id }) => {
            diagnose(&program, system_id);
        }
        Some(Commands::Disasm { program }) => {
            disassemble_file(&program);
        }
        Some(Commands::Debug { program, input, memory_limit }) => {
            debug_program(&program, input, memory_limit);
        }
        Some(Commands::Test) => {
            run_self_test();
        }
        None => {
            println!("Intcode VM v0.1.0");
            println!("A resumable Intcode virtual machine");
            println!();
            println!("Use --help for available commands");
            println!();
            demo_machine();
        }
    }
}

/// Install the tracing subscriber. `RUST_LOG` wins over `-v`.
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "warn,intcode=debug",
        _ => "warn,intcode=trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_or_exit(path: &str) -> Vec<i64> {
    match intcode::load_program(path) {
        Ok(program) if program.is_empty() => {
            eprintln!("❌ Program is empty: {}", path);
            std::process::exit(1);
        }
        Ok(program) => program.cells,
        Err(e) => {
            eprintln!("❌ Failed to load program: {}", e);
            std::process::exit(1);
        }
    }
}

struct RunOptions {
    input: Vec<i64>,
    noun: Option<i64>,
    verb: Option<i64>,
    interactive: bool,
    max_cycles: Option<u64>,
    memory_limit: Option<usize>,
    trace: bool,
    json: bool,
}

/// Final machine snapshot printed by `run --json`.
#[derive(Serialize)]
struct RunReport<'a> {
    state: intcode::MachineState,
    cycles: u64,
    outputs: &'a [i64],
    memory: &'a [i64],
    /// Non-zero cells outside the dense region, as (address, value)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    far_memory: Vec<(i64, i64)>,
}

fn run_program(path: &str, opts: RunOptions) {
    use intcode::{Machine, MachineConfig, MachineState};
    use intcode::program::disasm::disassemble_at;

    let program = load_or_exit(path);
    let config = MachineConfig { memory_limit: opts.memory_limit };
    let mut vm = Machine::with_config(&program, config);
    vm.extend_input(opts.input.iter().copied());

    for (addr, value) in [(1, opts.noun), (2, opts.verb)] {
        if let Some(value) = value {
            if let Err(e) = vm.mem.write(addr, value) {
                eprintln!("❌ Failed to patch address {}: {}", addr, e);
                std::process::exit(1);
            }
        }
    }

    let max_cycles = opts.max_cycles.unwrap_or(u64::MAX);
    let mut outputs = Vec::new();

    loop {
        if vm.cycles >= max_cycles {
            eprintln!("⚠️  Reached max cycles limit ({}). Use --max-cycles to increase.", max_cycles);
            std::process::exit(2);
        }

        let ip = vm.ip();
        let listing = opts.trace.then(|| disassemble_at(&vm.mem, ip).0);

        let state = match vm.tick() {
            Ok(state) => state,
            Err(e) => {
                eprintln!("❌ Machine error at ip={}: {}", ip, e);
                std::process::exit(1);
            }
        };

        if let Some(listing) = listing {
            if state != MachineState::WaitingForInput {
                println!("{:04}: {:<32} rb={}", ip, listing, vm.relative_base());
            }
        }

        match state {
            MachineState::Running => {}
            MachineState::HasOutput => {
                for value in vm.drain_output() {
                    if !opts.json {
                        println!("{}", value);
                    }
                    outputs.push(value);
                }
            }
            MachineState::WaitingForInput if opts.interactive => {
                match prompt_input() {
                    Some(value) => vm.push_input(value),
                    None => {
                        eprintln!("❌ No more input available");
                        std::process::exit(1);
                    }
                }
            }
            MachineState::WaitingForInput => {
                eprintln!("❌ Program needs input at ip={}; pass --input or --interactive", vm.ip());
                std::process::exit(1);
            }
            MachineState::Halted => break,
        }
    }

    if opts.json {
        let report = RunReport {
            state: vm.state,
            cycles: vm.cycles,
            outputs: &outputs,
            memory: vm.mem.as_slice(),
            far_memory: vm.mem.far_cells().collect(),
        };
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("❌ Failed to encode report: {}", e);
                std::process::exit(1);
            }
        }
    } else if outputs.is_empty() {
        // Programs without output report through address 0
        if let Ok(value) = vm.mem.read(0) {
            println!("{}", value);
        }
    }
}

/// Read one integer from stdin, re-prompting on bad input.
fn prompt_input() -> Option<i64> {
    use std::io::{BufRead, Write};

    let stdin = std::io::stdin();
    loop {
        print!("Input: ");
        std::io::stdout().flush().ok()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).ok()? == 0 {
            return None;
        }
        match line.trim().parse::<i64>() {
            Ok(value) => return Some(value),
            Err(e) => eprintln!("Not an integer ({}), try again", e),
        }
    }
}

fn amplify(path: &str, feedback: bool, phases: Option<Vec<i64>>) {
    use intcode::pipeline::{FEEDBACK_PHASES, SERIAL_PHASES};

    let program = load_or_exit(path);
    let phases = phases.unwrap_or_else(|| {
        if feedback { FEEDBACK_PHASES.to_vec() } else { SERIAL_PHASES.to_vec() }
    });

    match intcode::max_signal(&program, &phases) {
        Ok((signal, _)) => println!("{}", signal),
        Err(e) => {
            eprintln!("❌ Amplifier error: {}", e);
            std::process::exit(1);
        }
    }
}

fn search(path: &str, target: i64) {
    let program = load_or_exit(path);

    match intcode::find_noun_verb(&program, target) {
        Ok(Some(answer)) => println!("{}", answer),
        Ok(None) => {
            eprintln!("❌ No noun/verb pair produces {}", target);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("❌ Search failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn diagnose(path: &str, system_id: i64) {
    let program = load_or_exit(path);

    match intcode::run_diagnostic(&program, system_id) {
        Ok(code) => println!("{}", code),
        Err(e) => {
            eprintln!("❌ Diagnostic failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn disassemble_file(path: &str) {
    let program = load_or_exit(path);
    println!("{}", intcode::disassemble(&program));
}

#[cfg(feature = "tui")]
fn debug_program(path: &str, input: Vec<i64>, memory_limit: Option<usize>) {
    use intcode::MachineConfig;

    let program = load_or_exit(path);
    println!("🔍 Loaded {} cells from {}", program.len(), path);

    if let Err(e) = intcode::run_debugger(program, input, MachineConfig { memory_limit }) {
        eprintln!("❌ Debugger error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "tui"))]
fn debug_program(_path: &str, _input: Vec<i64>, _memory_limit: Option<usize>) {
    eprintln!("❌ Built without the `tui` feature");
    std::process::exit(1);
}

fn demo_machine() {
    use intcode::{Machine, MachineState};

    println!("━━━ Intcode Demo ━━━");
    println!();

    // Prints itself using the relative base
    let quine = [109, 1, 204, -1, 1001, 100, 1, 100, 1008, 100, 16, 101, 1006, 101, 0, 99];
    println!("Program: {}", intcode::Program::new(quine.to_vec()));

    let mut vm = Machine::new(&quine);
    match vm.run_until_blocked() {
        Ok(MachineState::Halted) => {
            let out: Vec<String> = vm.drain_output().iter().map(|v| v.to_string()).collect();
            println!("Output:  {}", out.join(","));
            println!();
            println!("✓ Halted after {} cycles", vm.cycles);
        }
        Ok(state) => println!("✗ Stopped in state {:?}", state),
        Err(e) => println!("✗ Machine error: {}", e),
    }
}

fn run_self_test() {
    use intcode::{Machine, MachineState};
    use intcode::vm::{decode, Mode};

    println!("━━━ Intcode Self-Test ━━━");
    println!();

    let mut passed = 0;
    let mut failed = 0;

    let mut check = |name: &str, ok: bool| {
        if ok {
            println!("{}... ✓", name);
            passed += 1;
        } else {
            println!("{}... ✗", name);
            failed += 1;
        }
    };

    // Test 1: Add/multiply
    let done = intcode::run_to_completion(&[1, 9, 10, 3, 2, 3, 11, 0, 99, 30, 40, 50], &[]);
    check(
        "Add/multiply",
        done.map(|d| d.memory == [3500, 9, 10, 70, 2, 3, 11, 0, 99, 30, 40, 50]).unwrap_or(false),
    );

    // Test 2: Mode decoding
    check(
        "Mode decoding",
        decode(10101).map(|i| i.modes == [Mode::Immediate, Mode::Position, Mode::Immediate]).unwrap_or(false),
    );

    // Test 3: Input suspension
    let mut vm = Machine::new(&[3, 0, 4, 0, 99]);
    let waited = vm.step().ok() == Some(MachineState::WaitingForInput);
    vm.push_input(42);
    let echoed = vm.step().ok() == Some(MachineState::HasOutput) && vm.pop_output() == Some(42);
    check("Input suspension", waited && echoed);

    // Test 4: Relative base quine
    let quine = [109, 1, 204, -1, 1001, 100, 1, 100, 1008, 100, 16, 101, 1006, 101, 0, 99];
    check(
        "Relative base quine",
        intcode::run_to_completion(&quine, &[]).map(|d| d.outputs == quine).unwrap_or(false),
    );

    // Test 5: Serial amplifiers
    let serial = [3, 15, 3, 16, 1002, 16, 10, 16, 1, 16, 15, 15, 4, 15, 99, 0, 0];
    check(
        "Serial amplifiers",
        intcode::max_signal(&serial, &intcode::pipeline::SERIAL_PHASES).map(|(s, _)| s == 43210).unwrap_or(false),
    );

    // Test 6: Feedback amplifiers
    let feedback = [
        3, 26, 1001, 26, -4, 26, 3, 27, 1002, 27, 2, 27, 1, 27, 26, 27, 4, 27, 1001, 28, -1, 28,
        1005, 28, 6, 99, 0, 0, 5,
    ];
    check(
        "Feedback amplifiers",
        intcode::max_signal(&feedback, &intcode::pipeline::FEEDBACK_PHASES).map(|(s, _)| s == 139629729).unwrap_or(false),
    );

    // Test 7: Fatal errors
    check("Unknown opcode is fatal", Machine::new(&[42]).run().is_err());

    println!();
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Results: {} passed, {} failed", passed, failed);

    if failed == 0 {
        println!("✓ All tests passed!");
    } else {
        std::process::exit(1);
    }
}
