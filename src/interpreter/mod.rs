//! Stack machine execution engine
//!
//! This module provides the core execution logic:
//! - [`engine`]: the [`Machine`](engine::Machine) fetch/decode/execute loop
//! - [`isa`]: opcodes, sub-operations and decoding
//! - [`registers`]: the PC/BP/SP register bank and instruction register
//! - [`errors`]: runtime error types
//! - [`io`]: input collaborators for the read system call
//!
//! # Execution Model
//!
//! Each step fetches three words at PC, advances PC by 3, then executes.
//! After each step a [`StepRecord`](crate::trace::StepRecord) is handed to the
//! trace and, when history is enabled, a snapshot is taken for time travel.

pub mod constants;
pub mod engine;
pub mod errors;
pub mod io;
pub mod isa;
mod ops;
pub mod registers;
