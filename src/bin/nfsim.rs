//! Interactive terminal for a simulated 5G core.
//!
//! Reads commands line by line from stdin and prints their output. Type
//! `help` for the list of commands.

use clap::Parser;
use nfsim::prelude::*;
use nu_ansi_term::Color;
use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
    process::ExitCode,
    time::Instant,
};

#[derive(Debug, Parser)]
#[command(name = "nfsim", version)]
#[command(about = "A simulated 5G core behind a compose-style terminal", long_about = None)]
struct Args {
    /// Simulation config file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Topology fixture (YAML), overrides the config
    #[arg(short, long)]
    fixture: Option<PathBuf>,

    /// Seed of the simulation RNG, overrides the config
    #[arg(short, long)]
    seed: Option<u64>,

    /// Maximum number of dispatched events, overrides the config
    #[arg(long)]
    max_events: Option<usize>,

    /// Service to ping from, e.g. oai-amf
    #[arg(short, long)]
    attach: Option<String>,

    /// Advance simulated time by the wall clock time between two inputs
    #[arg(long)]
    realtime: bool,

    /// Log level used if RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: tracing::Level,
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = nfsim::tracing::try_init(args.log_level) {
        eprintln!("failed to install logger: {e}");
    }

    match repl(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", Color::Red.bold().paint("error:"));
            ExitCode::FAILURE
        }
    }
}

fn repl(args: &Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    if args.fixture.is_some() {
        config.fixture.clone_from(&args.fixture);
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if args.max_events.is_some() {
        config.limits.max_events = args.max_events;
    }

    let builder = match config.seed {
        Some(seed) => Builder::seeded(seed),
        None => Builder::new(),
    };
    let limit = config.runtime_limit();
    let mut rt = builder.limit(limit).build(Simulation::new(config)?);
    let terminal = Terminal::open(&mut rt);
    if let Some(name) = &args.attach {
        rt.attach(terminal.console(), NfType::resolve(name)?)?;
    }

    let stdin = io::stdin();
    let mut last = Instant::now();
    prompt(&rt)?;
    for line in stdin.lock().lines() {
        let line = line?;
        if args.realtime {
            rt.wait(last.elapsed());
        }

        match terminal.execute(&mut rt, &line) {
            Outcome::Output(lines) => {
                for line in lines {
                    println!("{}", paint(&line));
                }
            }
            Outcome::Clear => print!("\x1b[2J\x1b[H"),
            Outcome::Exit => break,
        }
        last = Instant::now();
        prompt(&rt)?;
    }
    Ok(())
}

fn prompt(rt: &Runtime<Simulation>) -> Result<()> {
    print!(
        "{} {} ",
        Color::DarkGray.paint(format!("[{}]", rt.sim_time())),
        Color::Green.bold().paint("nfsim$")
    );
    io::stdout().flush()?;
    Ok(())
}

fn paint(line: &str) -> String {
    if line.starts_with("Error") || line.starts_with("command not found") {
        Color::Red.paint(line).to_string()
    } else if line.starts_with(" ✔") {
        Color::Green.paint(line).to_string()
    } else if line.starts_with(" !") || line.starts_with("Request timeout") {
        Color::Yellow.paint(line).to_string()
    } else {
        line.to_string()
    }
}
