//! Execution trace
//!
//! The engine produces a [`StepRecord`] for every executed instruction; a
//! [`TraceSink`] turns records into output. [`TraceWriter`] renders the
//! classic tab-separated listing:
//!
//! ```text
//! 			PC	BP	SP	Stack
//! Initial Values:		10	499	500
//!
//! 	LIT 0 5 	13	499	499	5
//! 	LIT 0 3 	16	499	498	5 3
//! 	ADD 0 1 	19	499	499	8
//! Output result is: 8
//! 	SYS 0 1 	22	499	500
//! 	SYS 0 3 	25	499	500
//! ```
//!
//! Stack cells are listed from the bottom of the stack to the top; `| `
//! precedes the first cell of each activation record opened by `CAL`.

use crate::interpreter::io::INPUT_PROMPT;
use crate::memory::StackCell;
use std::io::{self, Write};

/// Register values and stack contents at one point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineState {
    pub pc: i32,
    pub bp: i32,
    pub sp: i32,
    pub stack: Vec<StackCell>,
}

/// Program-visible I/O performed by a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SysEvent {
    Output(i32),
    Input(i32),
}

/// Everything observable about one executed instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    /// Address the instruction was fetched from
    pub address: i32,
    pub mnemonic: &'static str,
    pub l: i32,
    pub m: i32,
    /// State after the instruction executed
    pub state: MachineState,
    pub event: Option<SysEvent>,
}

/// Render stack cells as `v v | v v `
pub fn format_stack(cells: &[StackCell]) -> String {
    let mut out = String::new();
    for cell in cells {
        if cell.boundary {
            out.push_str("| ");
        }
        out.push_str(&cell.value.to_string());
        out.push(' ');
    }
    out
}

pub fn format_header() -> &'static str {
    "\t\t\tPC\tBP\tSP\tStack\n"
}

/// Initial register line, followed by a blank separator line
pub fn format_initial(state: &MachineState) -> String {
    format!(
        "Initial Values:\t\t{}\t{}\t{}\t{}\n\n",
        state.pc,
        state.bp,
        state.sp,
        format_stack(&state.stack)
    )
}

pub fn format_step(record: &StepRecord) -> String {
    format!(
        "\t{} {} {} \t{}\t{}\t{}\t{}\n",
        record.mnemonic,
        record.l,
        record.m,
        record.state.pc,
        record.state.bp,
        record.state.sp,
        format_stack(&record.state.stack)
    )
}

pub fn format_event(event: SysEvent) -> String {
    match event {
        SysEvent::Output(value) => format!("Output result is: {}\n", value),
        SysEvent::Input(value) => format!("{}{}\n", INPUT_PROMPT, value),
    }
}

/// Consumer of the execution trace
pub trait TraceSink {
    /// Called once before the first instruction
    fn begin(&mut self, initial: &MachineState) -> io::Result<()>;

    /// Called after each executed instruction
    fn step(&mut self, record: &StepRecord) -> io::Result<()>;

    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Discards the trace
#[derive(Debug, Default)]
pub struct NullTrace;

impl TraceSink for NullTrace {
    fn begin(&mut self, _initial: &MachineState) -> io::Result<()> {
        Ok(())
    }

    fn step(&mut self, _record: &StepRecord) -> io::Result<()> {
        Ok(())
    }
}

/// Writes the textual trace to any writer
pub struct TraceWriter<W: Write> {
    out: W,
    /// Echo input events; off when the user already saw the prompt here
    show_input: bool,
}

impl<W: Write> TraceWriter<W> {
    pub fn new(out: W) -> Self {
        TraceWriter {
            out,
            show_input: true,
        }
    }

    /// Skip `Please enter an integer: N` lines, for a console that already
    /// showed the interactive prompt and the user's reply.
    pub fn without_input_echo(mut self) -> Self {
        self.show_input = false;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> TraceSink for TraceWriter<W> {
    fn begin(&mut self, initial: &MachineState) -> io::Result<()> {
        self.out.write_all(format_header().as_bytes())?;
        self.out.write_all(format_initial(initial).as_bytes())
    }

    fn step(&mut self, record: &StepRecord) -> io::Result<()> {
        match record.event {
            Some(SysEvent::Input(_)) if !self.show_input => {}
            Some(event) => self.out.write_all(format_event(event).as_bytes())?,
            None => {}
        }
        self.out.write_all(format_step(record).as_bytes())
    }

    fn finish(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// Sends the trace to two sinks, e.g. a file and the console
impl<A: TraceSink, B: TraceSink> TraceSink for (A, B) {
    fn begin(&mut self, initial: &MachineState) -> io::Result<()> {
        self.0.begin(initial)?;
        self.1.begin(initial)
    }

    fn step(&mut self, record: &StepRecord) -> io::Result<()> {
        self.0.step(record)?;
        self.1.step(record)
    }

    fn finish(&mut self) -> io::Result<()> {
        self.0.finish()?;
        self.1.finish()
    }
}

impl<T: TraceSink + ?Sized> TraceSink for &mut T {
    fn begin(&mut self, initial: &MachineState) -> io::Result<()> {
        (**self).begin(initial)
    }

    fn step(&mut self, record: &StepRecord) -> io::Result<()> {
        (**self).step(record)
    }

    fn finish(&mut self) -> io::Result<()> {
        (**self).finish()
    }
}
