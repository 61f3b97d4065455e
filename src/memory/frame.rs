//! Activation records and static-scope resolution
//!
//! Each procedure call builds a three-word header at the base of its record:
//!
//! ```text
//! base     static link     (base of the lexically enclosing record)
//! base-1   dynamic link    (caller's base pointer)
//! base-2   return address  (caller's program counter)
//! base-3.. locals reserved by INC
//! ```

use super::address_space::{AddressSpace, MemoryError};

/// Offset of the dynamic link below a record base
pub const DYNAMIC_LINK_OFFSET: i32 = 1;

/// Offset of the return address below a record base
pub const RETURN_ADDRESS_OFFSET: i32 = 2;

/// Number of header words written by `CAL`
pub const HEADER_WORDS: i32 = 3;

/// Find the record base `levels` steps up the static chain from `base`.
///
/// `levels == 0` returns `base` unchanged. Depth is not validated; each
/// link read is bounds-checked.
pub fn resolve_base(memory: &AddressSpace, base: i32, levels: u32) -> Result<i32, MemoryError> {
    let mut record = base;
    for _ in 0..levels {
        record = memory.read(record)?;
    }
    Ok(record)
}

/// The fixed header of one activation record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub static_link: i32,
    pub dynamic_link: i32,
    pub return_address: i32,
}

impl FrameHeader {
    pub fn read(memory: &AddressSpace, base: i32) -> Result<Self, MemoryError> {
        Ok(FrameHeader {
            static_link: memory.read(base)?,
            dynamic_link: memory.read(base - DYNAMIC_LINK_OFFSET)?,
            return_address: memory.read(base - RETURN_ADDRESS_OFFSET)?,
        })
    }
}

/// A live activation record found by walking the dynamic chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivationRecord {
    /// Call depth, 0 for the outermost record
    pub depth: usize,
    pub base: i32,
    pub header: FrameHeader,
}

/// List the live records from the outermost to the current one.
///
/// The walk follows dynamic links from `bp` until it reaches `root_base`
/// (the initial base pointer). A corrupt chain stops the walk early rather
/// than failing.
pub fn activation_records(memory: &AddressSpace, bp: i32, root_base: i32) -> Vec<ActivationRecord> {
    let mut records = Vec::new();
    let mut base = bp;

    // A well-formed chain cannot be longer than memory
    for _ in 0..memory.capacity() {
        let Ok(header) = FrameHeader::read(memory, base) else {
            break;
        };
        records.push(ActivationRecord {
            depth: 0,
            base,
            header,
        });
        if base == root_base {
            break;
        }
        base = header.dynamic_link;
    }

    records.reverse();
    for (depth, record) in records.iter_mut().enumerate() {
        record.depth = depth;
    }
    records
}
