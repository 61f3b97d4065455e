//! Instruction set
//!
//! Every instruction is a triple of words `(OP, L, M)`. `OP` selects one of
//! nine opcodes; `L` is a lexical level and `M` a modifier whose meaning
//! depends on the opcode. Opcode 2 bundles the return instruction and the ten
//! arithmetic/relational operations, selected by `M`.

use std::fmt;

/// The undecoded contents of the instruction register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawInstruction {
    pub op: i32,
    pub l: i32,
    pub m: i32,
}

impl RawInstruction {
    pub fn new(op: i32, l: i32, m: i32) -> Self {
        RawInstruction { op, l, m }
    }

    pub fn words(&self) -> [i32; 3] {
        [self.op, self.l, self.m]
    }

    pub fn decode(&self) -> Result<Instruction, DecodeError> {
        Ok(Instruction {
            opcode: Opcode::decode(self.op, self.m)?,
            l: self.l,
            m: self.m,
        })
    }
}

impl fmt::Display for RawInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.decode() {
            Ok(instruction) => fmt::Display::fmt(&instruction, f),
            Err(_) => write!(f, "??? {} {} {}", self.op, self.l, self.m),
        }
    }
}

/// Sub-operations of opcode 2, keyed by `M`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Rtn,
    Add,
    Sub,
    Mul,
    Div,
    Eql,
    Neq,
    Lss,
    Leq,
    Gtr,
    Geq,
}

impl Operation {
    pub fn from_modifier(m: i32) -> Option<Self> {
        Some(match m {
            0 => Operation::Rtn,
            1 => Operation::Add,
            2 => Operation::Sub,
            3 => Operation::Mul,
            4 => Operation::Div,
            5 => Operation::Eql,
            6 => Operation::Neq,
            7 => Operation::Lss,
            8 => Operation::Leq,
            9 => Operation::Gtr,
            10 => Operation::Geq,
            _ => return None,
        })
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Operation::Rtn => "RTN",
            Operation::Add => "ADD",
            Operation::Sub => "SUB",
            Operation::Mul => "MUL",
            Operation::Div => "DIV",
            Operation::Eql => "EQL",
            Operation::Neq => "NEQ",
            Operation::Lss => "LSS",
            Operation::Leq => "LEQ",
            Operation::Gtr => "GTR",
            Operation::Geq => "GEQ",
        }
    }
}

/// System calls of opcode 9, keyed by `M`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syscall {
    /// Pop and print the top of stack
    Write,
    /// Read an integer and push it
    Read,
    /// End the program
    Halt,
}

impl Syscall {
    pub fn from_modifier(m: i32) -> Option<Self> {
        match m {
            1 => Some(Syscall::Write),
            2 => Some(Syscall::Read),
            3 => Some(Syscall::Halt),
            _ => None,
        }
    }
}

/// Decoded opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Lit,
    Opr(Operation),
    Lod,
    Sto,
    Cal,
    Inc,
    Jmp,
    Jpc,
    Sys(Syscall),
}

impl Opcode {
    pub fn decode(op: i32, m: i32) -> Result<Self, DecodeError> {
        Ok(match op {
            1 => Opcode::Lit,
            2 => Opcode::Opr(
                Operation::from_modifier(m).ok_or(DecodeError::InvalidOperation(m))?,
            ),
            3 => Opcode::Lod,
            4 => Opcode::Sto,
            5 => Opcode::Cal,
            6 => Opcode::Inc,
            7 => Opcode::Jmp,
            8 => Opcode::Jpc,
            9 => Opcode::Sys(Syscall::from_modifier(m).ok_or(DecodeError::InvalidSyscall(m))?),
            _ => return Err(DecodeError::InvalidOpcode(op)),
        })
    }

    /// Name shown in the execution trace
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Lit => "LIT",
            Opcode::Opr(operation) => operation.mnemonic(),
            Opcode::Lod => "LOD",
            Opcode::Sto => "STO",
            Opcode::Cal => "CAL",
            Opcode::Inc => "INC",
            Opcode::Jmp => "JMP",
            Opcode::Jpc => "JPC",
            Opcode::Sys(_) => "SYS",
        }
    }
}

/// Why a raw triple could not be decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    InvalidOpcode(i32),
    InvalidOperation(i32),
    InvalidSyscall(i32),
}

/// A decoded instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub l: i32,
    pub m: i32,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.opcode.mnemonic(), self.l, self.m)
    }
}
