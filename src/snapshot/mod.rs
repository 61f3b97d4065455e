// Snapshot management for reverse execution

use crate::interpreter::registers::Registers;
use crate::memory::AddressSpace;
use crate::trace::{format_event, StepRecord, SysEvent};

/// A line of program I/O with the step that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleLine {
    pub event: SysEvent,
    pub step: usize,
}

impl ConsoleLine {
    pub fn text(&self) -> String {
        format_event(self.event).trim_end().to_string()
    }
}

/// Mock console capturing program I/O
#[derive(Debug, Clone, Default)]
pub struct MockConsole {
    pub lines: Vec<ConsoleLine>,
}

impl MockConsole {
    pub fn new() -> Self {
        MockConsole { lines: Vec::new() }
    }

    /// Record the I/O event of step number `step`
    pub fn record(&mut self, event: SysEvent, step: usize) {
        self.lines.push(ConsoleLine { event, step });
    }

    /// Values written by the program, in order
    pub fn outputs(&self) -> Vec<i32> {
        self.lines
            .iter()
            .filter_map(|line| match line.event {
                SysEvent::Output(value) => Some(value),
                SysEvent::Input(_) => None,
            })
            .collect()
    }

    /// All lines as a vector of strings
    pub fn get_output(&self) -> Vec<String> {
        self.lines.iter().map(ConsoleLine::text).collect()
    }
}

/// Snapshot of execution state
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub memory: AddressSpace,
    pub registers: Registers,
    pub console: MockConsole,
    /// Number of instructions executed so far
    pub steps_executed: usize,
    /// The step that produced this state, `None` for the initial state
    pub last_step: Option<StepRecord>,
}

impl Snapshot {
    /// Estimate the memory usage of this snapshot in bytes
    pub fn estimated_size(&self) -> usize {
        // Words plus a rough allowance for boundary marks
        let memory_size = self.memory.capacity() * std::mem::size_of::<i32>() + 64;

        // Stack copy held by the step record
        let record_size = self
            .last_step
            .as_ref()
            .map_or(0, |record| record.state.stack.len() * 16 + 64);

        // Console: assume 40 bytes per line on average
        let console_size = self.console.lines.len() * 40;

        memory_size + record_size + console_size
    }
}

/// Manages execution history for reverse execution
#[derive(Debug)]
pub struct SnapshotManager {
    snapshots: Vec<Snapshot>,
    max_memory: usize,
    current_memory: usize,
}

impl SnapshotManager {
    pub fn new(max_memory: usize) -> Self {
        SnapshotManager {
            snapshots: Vec::new(),
            max_memory,
            current_memory: 0,
        }
    }

    /// Add a snapshot to history
    pub fn push(&mut self, snapshot: Snapshot) -> Result<(), String> {
        let snapshot_size = snapshot.estimated_size();

        if self.current_memory + snapshot_size > self.max_memory {
            return Err(format!(
                "Snapshot memory limit exceeded: {} + {} > {}",
                self.current_memory, snapshot_size, self.max_memory
            ));
        }

        self.current_memory += snapshot_size;
        self.snapshots.push(snapshot);
        Ok(())
    }

    /// Get a snapshot by index
    pub fn get(&self, index: usize) -> Option<&Snapshot> {
        self.snapshots.get(index)
    }

    /// Get the number of snapshots
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Get current memory usage
    pub fn memory_usage(&self) -> usize {
        self.current_memory
    }

    /// Get max memory limit
    pub fn memory_limit(&self) -> usize {
        self.max_memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> Snapshot {
        Snapshot {
            memory: AddressSpace::new(100),
            registers: Registers::new(10, 100),
            console: MockConsole::new(),
            steps_executed: 0,
            last_step: None,
        }
    }

    #[test]
    fn test_push_within_limit() {
        let mut manager = SnapshotManager::new(10_000);
        manager.push(snapshot()).unwrap();
        manager.push(snapshot()).unwrap();
        assert_eq!(manager.len(), 2);
        assert!(manager.memory_usage() > 0);
    }

    #[test]
    fn test_push_over_limit() {
        let size = snapshot().estimated_size();
        let mut manager = SnapshotManager::new(size);
        manager.push(snapshot()).unwrap();
        assert!(manager.push(snapshot()).is_err());
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_console_outputs() {
        let mut console = MockConsole::new();
        console.record(SysEvent::Input(3), 1);
        console.record(SysEvent::Output(-8), 4);
        assert_eq!(console.outputs(), vec![-8]);
        assert_eq!(
            console.get_output(),
            vec!["Please enter an integer: 3", "Output result is: -8"]
        );
    }
}
