//! The register bank

use super::isa::RawInstruction;

/// Control registers plus the instruction register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    /// Address of the next instruction to fetch
    pub pc: i32,
    /// Base of the active activation record
    pub bp: i32,
    /// Top of stack; the stack occupies `[sp, capacity)`
    pub sp: i32,
    /// Most recently fetched instruction
    pub ir: RawInstruction,
}

impl Registers {
    pub fn new(code_start: usize, capacity: usize) -> Self {
        Registers {
            pc: code_start as i32,
            bp: capacity as i32 - 1,
            sp: capacity as i32,
            ir: RawInstruction::default(),
        }
    }
}
