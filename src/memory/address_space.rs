//! The unified process address space
//!
//! A single fixed-capacity array of machine words holds both the text segment
//! (loaded instructions) and the operand/call stack. The stack starts at the
//! top of the array and grows toward lower indices.
//!
//! ```text
//! 0 .. code_start        unused
//! code_start .. code_end text segment, 3 words per instruction
//! code_end .. sp         free
//! sp .. capacity         stack, top of stack at sp
//! ```
//!
//! Every access is bounds-checked and returns a [`MemoryError`] instead of
//! panicking. Frame boundaries recorded by `CAL` are kept here as a set of
//! marked indices so they travel with the memory they describe.

use crate::loader::Program;
use rustc_hash::FxHashSet;
use std::fmt;

/// A failed access to the address space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    OutOfBounds { index: i32, capacity: usize },
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryError::OutOfBounds { index, capacity } => {
                write!(f, "index {} outside address space of {} words", index, capacity)
            }
        }
    }
}

impl std::error::Error for MemoryError {}

/// One occupied stack cell as seen by the trace and the viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackCell {
    pub index: usize,
    pub value: i32,
    /// A new activation record begins at this cell
    pub boundary: bool,
}

/// Combined code and stack memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressSpace {
    cells: Vec<i32>,
    boundaries: FxHashSet<usize>,
}

impl AddressSpace {
    pub fn new(capacity: usize) -> Self {
        AddressSpace {
            cells: vec![0; capacity],
            boundaries: FxHashSet::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    /// Copy the text segment into memory starting at `code_start`.
    ///
    /// Returns the index one past the last loaded word, or the first index
    /// that does not fit.
    pub fn load_program(&mut self, program: &Program, code_start: usize) -> Result<usize, MemoryError> {
        let capacity = self.cells.len();
        let mut index = code_start;
        for raw in program.instructions() {
            for word in raw.words() {
                let cell = self.cells.get_mut(index).ok_or(MemoryError::OutOfBounds {
                    index: i32::try_from(index).unwrap_or(i32::MAX),
                    capacity,
                })?;
                *cell = word;
                index += 1;
            }
        }
        Ok(index)
    }

    fn slot(&self, index: i32) -> Result<usize, MemoryError> {
        usize::try_from(index)
            .ok()
            .filter(|&i| i < self.cells.len())
            .ok_or(MemoryError::OutOfBounds {
                index,
                capacity: self.cells.len(),
            })
    }

    /// Read the word at `index`
    pub fn read(&self, index: i32) -> Result<i32, MemoryError> {
        let slot = self.slot(index)?;
        Ok(self.cells[slot])
    }

    /// Write `value` at `index`
    pub fn write(&mut self, index: i32, value: i32) -> Result<(), MemoryError> {
        let slot = self.slot(index)?;
        self.cells[slot] = value;
        Ok(())
    }

    /// Record that an activation record starts just below `index`.
    ///
    /// `index` is the stack pointer at the moment of the call, so it may be
    /// one past the last cell. Marks are never cleared: a slot that once
    /// opened a frame keeps its `| ` in the trace whenever it is occupied.
    pub fn mark_boundary(&mut self, index: i32) {
        if let Ok(index) = usize::try_from(index) {
            self.boundaries.insert(index);
        }
    }

    pub fn is_boundary(&self, index: usize) -> bool {
        self.boundaries.contains(&index)
    }

    /// Occupied stack cells from the bottom of the stack (highest index)
    /// down to `sp` (top of stack).
    ///
    /// A cell at index `i` opens a new frame when index `i + 1` is marked.
    pub fn stack_cells(&self, sp: i32) -> Vec<StackCell> {
        let capacity = self.cells.len();
        let top = sp.clamp(0, capacity as i32) as usize;
        (top..capacity)
            .rev()
            .map(|index| StackCell {
                index,
                value: self.cells[index],
                boundary: index + 1 < capacity && self.is_boundary(index + 1),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write_in_bounds() {
        let mut memory = AddressSpace::new(16);
        memory.write(15, 42).unwrap();
        assert_eq!(memory.read(15).unwrap(), 42);
        assert_eq!(memory.read(0).unwrap(), 0);
    }

    #[test]
    fn test_out_of_bounds_access() {
        let mut memory = AddressSpace::new(16);
        assert_eq!(
            memory.read(16),
            Err(MemoryError::OutOfBounds {
                index: 16,
                capacity: 16
            })
        );
        assert!(memory.write(-1, 7).is_err());
    }

    #[test]
    fn test_stack_cells_order_and_boundaries() {
        let mut memory = AddressSpace::new(8);
        for (i, v) in [(7, 1), (6, 2), (5, 3)] {
            memory.write(i, v).unwrap();
        }
        // Frame opened when sp was 6, so the cell at 5 starts a new record
        memory.mark_boundary(6);

        let cells = memory.stack_cells(5);
        let values: Vec<i32> = cells.iter().map(|c| c.value).collect();
        assert_eq!(values, vec![1, 2, 3]);
        assert!(!cells[0].boundary);
        assert!(!cells[1].boundary);
        assert!(cells[2].boundary);
    }

    #[test]
    fn test_boundary_outlives_its_frame() {
        let mut memory = AddressSpace::new(8);
        memory.mark_boundary(6);

        // The frame is gone but the slot below the mark is pushed again
        memory.write(7, 1).unwrap();
        memory.write(6, 2).unwrap();
        memory.write(5, 9).unwrap();
        let cells = memory.stack_cells(5);
        assert!(memory.is_boundary(6));
        assert!(cells[2].boundary);
    }

    #[test]
    fn test_load_program() {
        let program = Program::parse("1 0 5\n9 0 3\n").unwrap();
        let mut memory = AddressSpace::new(16);
        assert_eq!(memory.load_program(&program, 10), Ok(16));
        assert_eq!(memory.read(10).unwrap(), 1);
        assert_eq!(memory.read(15).unwrap(), 3);

        let mut small = AddressSpace::new(14);
        assert_eq!(
            small.load_program(&program, 10),
            Err(MemoryError::OutOfBounds {
                index: 14,
                capacity: 14
            })
        );
    }

    #[test]
    fn test_empty_stack() {
        let memory = AddressSpace::new(8);
        assert!(memory.stack_cells(8).is_empty());
    }
}
