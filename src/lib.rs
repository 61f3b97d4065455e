//! # Introduction
//!
//! pm0vm loads a program of integer triples into a single word-addressed
//! memory, runs it on a small stack machine and writes a trace of every
//! executed instruction. Each step can also be captured as a snapshot so the
//! run can be navigated forward and backward in a terminal UI built with
//! [ratatui](https://docs.rs/ratatui).
//!
//! ## Execution pipeline
//!
//! ```text
//! Program text → Loader → Address space → Machine → Trace / Snapshots → TUI
//! ```
//!
//! 1. [`loader`]: parses whitespace-separated integers into
//!    [`interpreter::isa::RawInstruction`]s.
//! 2. [`memory`]: the unified code/stack [`memory::AddressSpace`] with its
//!    frame-boundary marks, and the static-link walk in [`memory::frame`].
//! 3. [`interpreter`]: fetch, decode and execute, including `SYS` I/O
//!    through an [`interpreter::io::InputSource`].
//! 4. [`trace`]: the byte-exact trace text and the [`trace::TraceSink`]
//!    fan-out to a file and stdout.
//! 5. [`snapshot`]: snapshot history with a configurable memory limit and a
//!    [`snapshot::MockConsole`] that records program I/O.
//! 6. [`ui`]: ratatui-based TUI; not part of the stable library API.
//!
//! ## Instruction set
//!
//! `LIT`, `OPR` (`RTN ADD SUB MUL DIV EQL NEQ LSS LEQ GTR GEQ`), `LOD`, `STO`,
//! `CAL`, `INC`, `JMP`, `JPC` and `SYS` (write, read, halt).

pub mod config;
pub mod interpreter;
pub mod loader;
pub mod log;
pub mod memory;
pub mod snapshot;
pub mod trace;
pub mod ui;
