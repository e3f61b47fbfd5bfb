use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use colored::Colorize;
use miette::{IntoDiagnostic, Result};

use bobbin::{assemble, render_frame, Emulator};

/// Bobbin is a complete assembler & emulator toolchain for CHIP-8 programs.
#[derive(Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Assemble a source file into a binary ROM image
    Assemble {
        /// Source file to assemble
        source: PathBuf,
        /// Destination for the ROM image; `<source>.ROM` beside the source
        /// by default
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run an assembled ROM image until it finishes
    Run {
        /// ROM image to execute
        rom: PathBuf,
        /// Steps per frame, 1 (slowest) to 10
        #[arg(short, long, default_value_t = 5, value_parser = clap::value_parser!(u8).range(1..=10))]
        speed: u8,
        /// Trace every executed opcode to stderr
        #[arg(short, long)]
        debug: bool,
        /// Report steps-per-second while running
        #[arg(short, long)]
        perfmon: bool,
        /// Wait for enter before exiting once the program finishes
        #[arg(short, long)]
        keep_open: bool,
    },
}

fn main() -> miette::Result<()> {
    let args = Args::parse();

    match args.command {
        Some(Command::Assemble { source, output }) => cmd_assemble(&source, output),
        Some(Command::Run {
            rom,
            speed,
            debug,
            perfmon,
            keep_open,
        }) => cmd_run(&rom, speed, debug, perfmon, keep_open),
        None => {
            println!("\n~ bobbin v{VERSION} ~");
            println!("{SHORT_INFO}");
            Ok(())
        }
    }
}

#[allow(unused)]
enum MsgColor {
    Green,
    Cyan,
    Red,
}

fn message(color: MsgColor, left: &str, right: &str) {
    let left = match color {
        MsgColor::Green => left.green(),
        MsgColor::Cyan => left.cyan(),
        MsgColor::Red => left.red(),
    };
    println!("{left:>12} {right}");
}

fn file_message(color: MsgColor, left: &str, right: &Path) {
    message(color, left, &format!("target {}", right.display()));
}

fn cmd_assemble(source: &Path, output: Option<PathBuf>) -> Result<()> {
    file_message(MsgColor::Green, "Assembling", source);
    let text = fs::read_to_string(source).into_diagnostic()?;
    let rom = assemble(&text).into_diagnostic()?;

    let out_path = output.unwrap_or_else(|| source.with_extension("ROM"));
    fs::write(&out_path, &rom).into_diagnostic()?;

    message(MsgColor::Green, "Finished", &format!("{} bytes emitted", rom.len()));
    file_message(MsgColor::Green, "Saved", &out_path);
    Ok(())
}

fn cmd_run(rom_path: &Path, speed: u8, debug: bool, perfmon: bool, keep_open: bool) -> Result<()> {
    file_message(MsgColor::Green, "Loading", rom_path);
    let rom = fs::read(rom_path).into_diagnostic()?;

    let mut emu = Emulator::new();
    emu.load_rom(&rom).into_diagnostic()?;

    message(MsgColor::Green, "Running", "loaded image");

    // The driver owns the loop: step the engine, publish the frame, pace to
    // ~60Hz. The engine never calls back out.
    let frame_time = Duration::from_secs_f64(1.0 / 60.0);
    let mut last_step = Instant::now();
    let mut monitor = Instant::now();
    let mut steps_this_second: u32 = 0;

    while !emu.finished() {
        let elapsed_ms = last_step.elapsed().as_secs_f64() * 1000.0;
        last_step = Instant::now();

        for _ in 0..speed {
            if emu.finished() {
                break;
            }
            if debug {
                trace_step(&emu);
            }
            emu.step(elapsed_ms / speed as f64).into_diagnostic()?;
            steps_this_second += 1;
        }

        if emu.frame_buffer_updated() {
            // Clear screen, home cursor, repaint.
            print!("\x1B[2J\x1B[1;1H{}", render_frame(emu.frame()));
            io::stdout().flush().into_diagnostic()?;
        }

        if perfmon && monitor.elapsed() >= Duration::from_secs(1) {
            message(MsgColor::Cyan, "Perf", &format!("{steps_this_second} steps/s"));
            steps_this_second = 0;
            monitor = Instant::now();
        }

        spin_sleep::sleep(frame_time);
    }

    message(MsgColor::Green, "Finished", "program returned from top level");
    if keep_open {
        message(MsgColor::Cyan, "Help", "press enter to exit");
        let mut line = String::new();
        io::stdin().read_line(&mut line).into_diagnostic()?;
    }
    file_message(MsgColor::Green, "Completed", rom_path);
    Ok(())
}

fn trace_step(emu: &Emulator) {
    let state = emu.dump_state();
    let pc = state.pc as usize;
    let opcode = u16::from_be_bytes([
        state.memory[pc % state.memory.len()],
        state.memory[(pc + 1) % state.memory.len()],
    ]);
    eprintln!("{:>12} pc {pc:#05X}  op {opcode:#06X}", "Trace".cyan());
}

const SHORT_INFO: &str = r"
Welcome to bobbin, an all-in-one toolchain for assembling and running
CHIP-8 programs. Please use `-h` or `--help` to access the usage
instructions and documentation.
";

const VERSION: &str = env!("CARGO_PKG_VERSION");
