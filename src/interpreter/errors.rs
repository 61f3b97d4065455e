//! Runtime error types for the stack machine
//!
//! This module defines [`RuntimeError`], which represents all errors that can occur
//! during program execution (as opposed to load errors).
//!
//! All runtime errors are fatal - they halt execution. Each variant that stems
//! from an instruction carries `pc`, the address of that instruction.

use super::isa::DecodeError;
use crate::memory::MemoryError;
use thiserror::Error;

/// Runtime errors that can occur during execution
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Access outside the address space
    #[error("Out of bounds access at index {index} (capacity {capacity}) by instruction at {pc}")]
    OutOfBounds { index: i32, capacity: usize, pc: i32 },

    /// The stack grew into the text segment
    #[error("Stack overflow: stack pointer {sp} would reach code ending at {code_end} (instruction at {pc})")]
    StackOverflow { sp: i32, code_end: usize, pc: i32 },

    /// A store targeted the text segment
    #[error("Store into code region at index {index} by instruction at {pc}")]
    CodeWrite { index: i32, pc: i32 },

    /// DIV with a zero divisor
    #[error("Division by zero at {pc}")]
    DivisionByZero { pc: i32 },

    /// Result does not fit in a machine word
    #[error("Integer overflow in operation: {operation} at {pc}")]
    IntegerOverflow { operation: String, pc: i32 },

    /// Unknown opcode
    #[error("Invalid opcode {opcode} at {pc}")]
    InvalidOpcode { opcode: i32, pc: i32 },

    /// OPR with a modifier outside 0..=10
    #[error("Invalid operation modifier {modifier} at {pc}")]
    InvalidOperation { modifier: i32, pc: i32 },

    /// SYS with a modifier outside 1..=3
    #[error("Invalid system call {modifier} at {pc}")]
    InvalidSyscall { modifier: i32, pc: i32 },

    /// Operand that cannot be used (negative lexical level)
    #[error("Invalid operand: {message} at {pc}")]
    InvalidOperand { message: String, pc: i32 },

    /// SYS 2 read text that is not an integer
    #[error("Invalid input '{text}': expected an integer (instruction at {pc})")]
    InvalidInput { text: String, pc: i32 },

    /// SYS 2 found no more input
    #[error("Input exhausted at {pc}")]
    InputExhausted { pc: i32 },

    /// Snapshot history limit exceeded
    #[error("Snapshot memory limit exceeded: {current} bytes used, limit is {limit}")]
    SnapshotLimitExceeded { current: usize, limit: usize },

    /// History/snapshot navigation failed
    #[error("History operation failed: {message}")]
    HistoryOperationFailed { message: String },

    /// Reading input or writing the trace failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RuntimeError {
    /// Address of the faulting instruction, if the error came from one
    pub fn pc(&self) -> Option<i32> {
        match self {
            RuntimeError::OutOfBounds { pc, .. } => Some(*pc),
            RuntimeError::StackOverflow { pc, .. } => Some(*pc),
            RuntimeError::CodeWrite { pc, .. } => Some(*pc),
            RuntimeError::DivisionByZero { pc } => Some(*pc),
            RuntimeError::IntegerOverflow { pc, .. } => Some(*pc),
            RuntimeError::InvalidOpcode { pc, .. } => Some(*pc),
            RuntimeError::InvalidOperation { pc, .. } => Some(*pc),
            RuntimeError::InvalidSyscall { pc, .. } => Some(*pc),
            RuntimeError::InvalidOperand { pc, .. } => Some(*pc),
            RuntimeError::InvalidInput { pc, .. } => Some(*pc),
            RuntimeError::InputExhausted { pc } => Some(*pc),
            RuntimeError::SnapshotLimitExceeded { .. } => None,
            RuntimeError::HistoryOperationFailed { .. } => None,
            RuntimeError::Io(_) => None,
        }
    }

    pub(crate) fn from_memory(error: MemoryError, pc: i32) -> Self {
        match error {
            MemoryError::OutOfBounds { index, capacity } => {
                RuntimeError::OutOfBounds { index, capacity, pc }
            }
        }
    }

    pub(crate) fn from_decode(error: DecodeError, pc: i32) -> Self {
        match error {
            DecodeError::InvalidOpcode(opcode) => RuntimeError::InvalidOpcode { opcode, pc },
            DecodeError::InvalidOperation(modifier) => {
                RuntimeError::InvalidOperation { modifier, pc }
            }
            DecodeError::InvalidSyscall(modifier) => RuntimeError::InvalidSyscall { modifier, pc },
        }
    }
}
