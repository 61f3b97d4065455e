// pm0vm: stack machine with execution trace and time-travel viewer

use std::error::Error;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use pm0vm::config::VmConfig;
use pm0vm::interpreter::constants::{CAPACITY, CODE_START, DEFAULT_SNAPSHOT_LIMIT};
use pm0vm::interpreter::engine::{Halt, Machine};
use pm0vm::interpreter::io::{InputSource, ScriptedInput, StdinInput};
use pm0vm::loader::Program;
use pm0vm::log::{set_min_level, Level};
use pm0vm::trace::TraceWriter;
use pm0vm::ui::App;
use pm0vm::{error, info, warn};

/// Run a stack machine program and trace every instruction
#[derive(Parser, Debug)]
#[command(name = "pm0vm", version, about)]
struct Cli {
    /// Program file of whitespace-separated `OP L M` triples
    program: PathBuf,

    /// Trace file
    #[arg(short, long, default_value = "output.txt")]
    output: PathBuf,

    /// Do not echo the trace to stdout
    #[arg(long)]
    no_echo: bool,

    /// Browse the recorded run in the terminal UI
    #[arg(long)]
    tui: bool,

    /// Print the loaded text segment and exit
    #[arg(long)]
    dump: bool,

    /// Replies for `SYS 0 2` instead of reading stdin
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    input: Option<Vec<i32>>,

    /// Words in the address space
    #[arg(long, default_value_t = CAPACITY)]
    capacity: usize,

    /// First word of the text segment
    #[arg(long, default_value_t = CODE_START)]
    code_start: usize,

    /// Snapshot memory limit in bytes for the viewer
    #[arg(long, default_value_t = DEFAULT_SNAPSHOT_LIMIT)]
    snapshot_limit: usize,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if cli.quiet {
        set_min_level(Level::Warn);
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let program = Program::from_file(&cli.program)?;
    info!(
        "Loaded {} instructions from {}",
        program.len(),
        cli.program.display()
    );

    let mut config = VmConfig {
        capacity: cli.capacity,
        code_start: cli.code_start,
        ..VmConfig::default()
    };

    if cli.dump {
        config.validate()?;
        print!("{}", program.dump(config.code_start));
        return Ok(());
    }

    if cli.tui {
        config = config.with_history(cli.snapshot_limit);
    }

    let mut machine = Machine::new(program, config)?;

    let mut input: Box<dyn InputSource> = match &cli.input {
        Some(values) => Box::new(ScriptedInput::from_values(values)),
        None => Box::new(StdinInput::stdin()),
    };

    let file = TraceWriter::new(BufWriter::new(File::create(&cli.output)?));
    let result = if cli.no_echo || cli.tui {
        let mut trace = file;
        machine.run(input.as_mut(), &mut trace)
    } else {
        let mut echo = TraceWriter::new(io::stdout().lock());
        if input.is_interactive() {
            echo = echo.without_input_echo();
        }
        let mut trace = (file, echo);
        machine.run(input.as_mut(), &mut trace)
    };

    let run_error = match result {
        Ok(Halt::Terminated) => {
            info!("Execution halted after {} steps", machine.steps_executed());
            None
        }
        Ok(Halt::EndOfCode) => {
            info!(
                "Reached end of code after {} steps",
                machine.steps_executed()
            );
            None
        }
        Err(e) => Some(e),
    };
    info!("Trace written to {}", cli.output.display());

    if !cli.tui {
        return match run_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        };
    }

    if let Some(e) = &run_error {
        warn!("Runtime error: {}", e);
        warn!("Entering TUI with partial execution history...");
    }
    info!("Total snapshots: {}", machine.total_snapshots());

    // Rewind to the beginning for TUI
    if let Err(e) = machine.rewind_to_start() {
        warn!("Failed to rewind to start: {}", e);
    }

    run_tui(App::new(machine, run_error.map(|e| e.to_string())))
}

fn run_tui(mut app: App) -> Result<(), Box<dyn Error>> {
    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = app.run(&mut terminal);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res.map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn cli_parses_scripted_input() {
        let cli = Cli::parse_from(["pm0vm", "prog.txt", "--input", "3,-4,5", "--no-echo"]);
        assert_eq!(cli.input, Some(vec![3, -4, 5]));
        assert_eq!(cli.output, PathBuf::from("output.txt"));
        assert!(cli.no_echo);
        assert_eq!(cli.capacity, CAPACITY);
    }
}
