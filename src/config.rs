//! Machine configuration

use crate::interpreter::constants::{CAPACITY, CODE_START};
use crate::loader::LoadError;

/// Layout and history settings for one machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmConfig {
    /// Words in the address space
    pub capacity: usize,
    /// First word of the text segment
    pub code_start: usize,
    /// Memory budget for snapshot history; `None` records no history
    pub snapshot_limit: Option<usize>,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            capacity: CAPACITY,
            code_start: CODE_START,
            snapshot_limit: None,
        }
    }
}

impl VmConfig {
    /// Enable snapshot history with the given memory limit
    pub fn with_history(mut self, limit: usize) -> Self {
        self.snapshot_limit = Some(limit);
        self
    }

    pub fn validate(&self) -> Result<(), LoadError> {
        if self.code_start >= self.capacity {
            return Err(LoadError::InvalidConfig {
                message: format!(
                    "code start {} must be below capacity {}",
                    self.code_start, self.capacity
                ),
            });
        }
        if self.capacity > i32::MAX as usize {
            return Err(LoadError::InvalidConfig {
                message: format!("capacity {} exceeds the word range", self.capacity),
            });
        }
        Ok(())
    }

    /// Instructions that fit between the code start and the top of memory
    pub fn max_instructions(&self) -> usize {
        self.capacity.saturating_sub(self.code_start) / 3
    }
}
