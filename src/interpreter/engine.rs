// Execution engine for the stack machine

use crate::config::VmConfig;
use crate::interpreter::errors::RuntimeError;
use crate::interpreter::io::InputSource;
use crate::interpreter::isa::{Instruction, Opcode, Operation, RawInstruction, Syscall};
use crate::interpreter::registers::Registers;
use crate::loader::{LoadError, Program};
use crate::memory::frame::{DYNAMIC_LINK_OFFSET, HEADER_WORDS, RETURN_ADDRESS_OFFSET};
use crate::memory::{activation_records, resolve_base, ActivationRecord, AddressSpace};
use crate::snapshot::{MockConsole, Snapshot, SnapshotManager};
use crate::trace::{MachineState, StepRecord, SysEvent, TraceSink};

/// How a run ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halt {
    /// `SYS 0 3` executed
    Terminated,
    /// The program counter left the text segment
    EndOfCode,
}

/// A stack machine loaded with one program
pub struct Machine {
    /// Loaded program, kept for disassembly
    program: Program,

    config: VmConfig,

    /// Combined code and stack memory
    memory: AddressSpace,

    registers: Registers,

    /// One past the last word of the text segment
    code_end: usize,

    /// Captured program I/O
    console: MockConsole,

    steps_executed: usize,

    /// Record of the most recent step
    last_step: Option<StepRecord>,

    /// Set once the program terminates or runs off the text segment
    halt: Option<Halt>,

    /// Snapshot history, when enabled in the config
    snapshot_manager: Option<SnapshotManager>,

    /// Index of the snapshot currently shown
    history_position: usize,
}

impl Machine {
    /// Load `program` into a fresh address space
    pub fn new(program: Program, config: VmConfig) -> Result<Self, LoadError> {
        config.validate()?;

        let capacity = config.max_instructions();
        if program.len() > capacity {
            return Err(LoadError::ProgramTooLarge {
                instructions: program.len(),
                capacity,
            });
        }

        let mut memory = AddressSpace::new(config.capacity);
        let code_end = memory
            .load_program(&program, config.code_start)
            .map_err(|_| LoadError::ProgramTooLarge {
                instructions: program.len(),
                capacity,
            })?;

        Ok(Machine {
            program,
            config,
            memory,
            registers: Registers::new(config.code_start, config.capacity),
            code_end,
            console: MockConsole::new(),
            steps_executed: 0,
            last_step: None,
            halt: None,
            snapshot_manager: config.snapshot_limit.map(SnapshotManager::new),
            history_position: 0,
        })
    }

    /// Run until the program halts, feeding every step to `trace`
    pub fn run(
        &mut self,
        input: &mut dyn InputSource,
        trace: &mut dyn TraceSink,
    ) -> Result<Halt, RuntimeError> {
        trace.begin(&self.state())?;
        let result = self.run_steps(input, trace);
        trace.finish()?;
        result
    }

    fn run_steps(
        &mut self,
        input: &mut dyn InputSource,
        trace: &mut dyn TraceSink,
    ) -> Result<Halt, RuntimeError> {
        if self.history_is_empty() {
            self.take_snapshot()?;
        }

        while let Some(record) = self.step(input)? {
            trace.step(&record)?;
        }

        Ok(self.halt.unwrap_or(Halt::EndOfCode))
    }

    /// Fetch, decode and execute one instruction.
    ///
    /// Returns `None` once the machine has halted.
    pub fn step(&mut self, input: &mut dyn InputSource) -> Result<Option<StepRecord>, RuntimeError> {
        if self.halt.is_some() {
            return Ok(None);
        }

        if self.is_viewing_history() {
            return Err(RuntimeError::HistoryOperationFailed {
                message: "Cannot execute while viewing past history".to_string(),
            });
        }

        let address = self.registers.pc;
        if address >= self.code_end as i32 {
            self.halt = Some(Halt::EndOfCode);
            return Ok(None);
        }

        // Fetch cycle
        let raw = RawInstruction::new(
            self.read(address, address)?,
            self.read(address + 1, address)?,
            self.read(address + 2, address)?,
        );
        self.registers.ir = raw;
        self.registers.pc = address + 3;

        // Execute cycle
        let instruction = raw
            .decode()
            .map_err(|e| RuntimeError::from_decode(e, address))?;
        let event = self.execute(instruction, address, input)?;

        self.steps_executed += 1;
        if let Some(event) = event {
            self.console.record(event, self.steps_executed);
        }

        let record = StepRecord {
            address,
            mnemonic: instruction.opcode.mnemonic(),
            l: instruction.l,
            m: instruction.m,
            state: self.state(),
            event,
        };
        self.last_step = Some(record.clone());
        self.take_snapshot()?;

        Ok(Some(record))
    }

    /// Apply one decoded instruction. `pc` is its address, for errors.
    fn execute(
        &mut self,
        instruction: Instruction,
        pc: i32,
        input: &mut dyn InputSource,
    ) -> Result<Option<SysEvent>, RuntimeError> {
        let Instruction { opcode, l, m } = instruction;

        match opcode {
            Opcode::Lit => self.push(m, pc)?,

            Opcode::Opr(Operation::Rtn) => self.return_from_call(pc)?,

            Opcode::Opr(operation) => {
                let sp = self.registers.sp;
                let top = self.read(sp, pc)?;
                let second = self.read(sp + 1, pc)?;
                if let Some(result) = operation.apply(second, top, pc) {
                    self.write(sp + 1, result?, pc)?;
                    self.registers.sp = sp + 1;
                }
            }

            Opcode::Lod => {
                let base = self.base(l, pc)?;
                let value = self.read(base.saturating_sub(m), pc)?;
                self.push(value, pc)?;
            }

            Opcode::Sto => {
                let base = self.base(l, pc)?;
                let target = base.saturating_sub(m);
                if self.in_code_region(target) {
                    return Err(RuntimeError::CodeWrite { index: target, pc });
                }
                let sp = self.registers.sp;
                let value = self.read(sp, pc)?;
                self.write(target, value, pc)?;
                self.registers.sp = sp + 1;
            }

            Opcode::Cal => self.call(l, m, pc)?,

            Opcode::Inc => {
                let sp = self.registers.sp.saturating_sub(m);
                self.check_stack(sp, pc)?;
                if sp > self.memory.capacity() as i32 {
                    return Err(RuntimeError::OutOfBounds {
                        index: sp,
                        capacity: self.memory.capacity(),
                        pc,
                    });
                }
                self.registers.sp = sp;
            }

            Opcode::Jmp => self.registers.pc = m,

            Opcode::Jpc => {
                let sp = self.registers.sp;
                if self.read(sp, pc)? == 0 {
                    self.registers.pc = m;
                    self.registers.sp = sp + 1;
                }
            }

            Opcode::Sys(Syscall::Write) => {
                let sp = self.registers.sp;
                let value = self.read(sp, pc)?;
                self.registers.sp = sp + 1;
                return Ok(Some(SysEvent::Output(value)));
            }

            Opcode::Sys(Syscall::Read) => {
                let text = input
                    .read_line()?
                    .ok_or(RuntimeError::InputExhausted { pc })?;
                let value = text
                    .trim()
                    .parse::<i32>()
                    .map_err(|_| RuntimeError::InvalidInput {
                        text: text.clone(),
                        pc,
                    })?;
                self.push(value, pc)?;
                return Ok(Some(SysEvent::Input(value)));
            }

            Opcode::Sys(Syscall::Halt) => self.halt = Some(Halt::Terminated),
        }

        Ok(None)
    }

    /// Build a new activation record and jump to `target`
    fn call(&mut self, levels: i32, target: i32, pc: i32) -> Result<(), RuntimeError> {
        let static_link = self.base(levels, pc)?;
        let sp = self.registers.sp;
        self.check_stack(sp - HEADER_WORDS, pc)?;

        let base = sp - 1;
        self.write(base, static_link, pc)?;
        self.write(base - DYNAMIC_LINK_OFFSET, self.registers.bp, pc)?;
        self.write(base - RETURN_ADDRESS_OFFSET, self.registers.pc, pc)?;
        self.memory.mark_boundary(sp);

        self.registers.bp = base;
        self.registers.pc = target;
        Ok(())
    }

    /// Pop the current activation record and resume the caller
    fn return_from_call(&mut self, pc: i32) -> Result<(), RuntimeError> {
        let base = self.registers.bp;
        let dynamic_link = self.read(base - DYNAMIC_LINK_OFFSET, pc)?;
        let return_address = self.read(base - RETURN_ADDRESS_OFFSET, pc)?;

        self.registers.sp = base + 1;
        self.registers.bp = dynamic_link;
        self.registers.pc = return_address;
        Ok(())
    }

    /// Base of the record `levels` static links above the current one
    fn base(&self, levels: i32, pc: i32) -> Result<i32, RuntimeError> {
        let levels = u32::try_from(levels).map_err(|_| RuntimeError::InvalidOperand {
            message: format!("negative lexical level {}", levels),
            pc,
        })?;
        resolve_base(&self.memory, self.registers.bp, levels)
            .map_err(|e| RuntimeError::from_memory(e, pc))
    }

    fn push(&mut self, value: i32, pc: i32) -> Result<(), RuntimeError> {
        let sp = self.registers.sp - 1;
        self.check_stack(sp, pc)?;
        self.write(sp, value, pc)?;
        self.registers.sp = sp;
        Ok(())
    }

    /// Fail if a stack reaching down to `sp` would overlap the text segment
    fn check_stack(&self, sp: i32, pc: i32) -> Result<(), RuntimeError> {
        if sp < self.code_end as i32 {
            return Err(RuntimeError::StackOverflow {
                sp,
                code_end: self.code_end,
                pc,
            });
        }
        Ok(())
    }

    fn in_code_region(&self, index: i32) -> bool {
        index >= self.config.code_start as i32 && index < self.code_end as i32
    }

    fn read(&self, index: i32, pc: i32) -> Result<i32, RuntimeError> {
        self.memory
            .read(index)
            .map_err(|e| RuntimeError::from_memory(e, pc))
    }

    fn write(&mut self, index: i32, value: i32, pc: i32) -> Result<(), RuntimeError> {
        self.memory
            .write(index, value)
            .map_err(|e| RuntimeError::from_memory(e, pc))
    }

    /// Current registers and stack contents
    pub fn state(&self) -> MachineState {
        MachineState {
            pc: self.registers.pc,
            bp: self.registers.bp,
            sp: self.registers.sp,
            stack: self.memory.stack_cells(self.registers.sp),
        }
    }

    // ========== Snapshot history ==========

    fn history_is_empty(&self) -> bool {
        self.snapshot_manager
            .as_ref()
            .map_or(true, SnapshotManager::is_empty)
    }

    fn is_viewing_history(&self) -> bool {
        self.history_position + 1 < self.total_snapshots()
    }

    /// Take a snapshot of the current execution state
    fn take_snapshot(&mut self) -> Result<(), RuntimeError> {
        let Some(manager) = self.snapshot_manager.as_mut() else {
            return Ok(());
        };

        let snapshot = Snapshot {
            memory: self.memory.clone(),
            registers: self.registers,
            console: self.console.clone(),
            steps_executed: self.steps_executed,
            last_step: self.last_step.clone(),
        };

        manager
            .push(snapshot)
            .map_err(|_| RuntimeError::SnapshotLimitExceeded {
                current: manager.memory_usage(),
                limit: manager.memory_limit(),
            })?;

        self.history_position = manager.len() - 1;
        Ok(())
    }

    /// Restore execution state from a snapshot
    fn restore_snapshot(&mut self, snapshot: &Snapshot) {
        self.memory = snapshot.memory.clone();
        self.registers = snapshot.registers;
        self.console = snapshot.console.clone();
        self.steps_executed = snapshot.steps_executed;
        self.last_step = snapshot.last_step.clone();
    }

    fn restore_position(&mut self, position: usize) -> Result<(), RuntimeError> {
        let snapshot = self
            .snapshot_manager
            .as_ref()
            .and_then(|manager| manager.get(position))
            .cloned()
            .ok_or_else(|| RuntimeError::HistoryOperationFailed {
                message: "Snapshot not found in history".to_string(),
            })?;

        self.history_position = position;
        self.restore_snapshot(&snapshot);
        Ok(())
    }

    /// Step backward in execution (restore previous snapshot)
    pub fn step_backward(&mut self) -> Result<(), RuntimeError> {
        if self.history_position == 0 {
            return Err(RuntimeError::HistoryOperationFailed {
                message: "Already at the beginning of execution".to_string(),
            });
        }
        self.restore_position(self.history_position - 1)
    }

    /// Step forward in recorded history
    pub fn step_forward(&mut self) -> Result<(), RuntimeError> {
        if !self.is_viewing_history() {
            return Err(RuntimeError::HistoryOperationFailed {
                message: "No more snapshots available (execution finished)".to_string(),
            });
        }
        self.restore_position(self.history_position + 1)
    }

    /// Rewind to the beginning of execution history
    pub fn rewind_to_start(&mut self) -> Result<(), RuntimeError> {
        if self.history_is_empty() {
            return Err(RuntimeError::HistoryOperationFailed {
                message: "No snapshots available".to_string(),
            });
        }
        self.restore_position(0)
    }

    /// Jump to the most recent snapshot
    pub fn jump_to_end(&mut self) -> Result<(), RuntimeError> {
        let total = self.total_snapshots();
        if total == 0 {
            return Err(RuntimeError::HistoryOperationFailed {
                message: "No snapshots available".to_string(),
            });
        }
        self.restore_position(total - 1)
    }

    // ========== Getter methods for UI ==========

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    pub fn memory(&self) -> &AddressSpace {
        &self.memory
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn console(&self) -> &MockConsole {
        &self.console
    }

    pub fn steps_executed(&self) -> usize {
        self.steps_executed
    }

    pub fn last_step(&self) -> Option<&StepRecord> {
        self.last_step.as_ref()
    }

    pub fn halt(&self) -> Option<Halt> {
        self.halt
    }

    /// Live activation records, outermost first
    pub fn activation_records(&self) -> Vec<ActivationRecord> {
        activation_records(
            &self.memory,
            self.registers.bp,
            self.config.capacity as i32 - 1,
        )
    }

    pub fn history_position(&self) -> usize {
        self.history_position
    }

    pub fn total_snapshots(&self) -> usize {
        self.snapshot_manager
            .as_ref()
            .map_or(0, SnapshotManager::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::io::ScriptedInput;
    use crate::trace::NullTrace;

    fn machine(source: &str) -> Machine {
        Machine::new(Program::parse(source).unwrap(), VmConfig::default()).unwrap()
    }

    fn run(source: &str, inputs: &[i32]) -> (Machine, Result<Halt, RuntimeError>) {
        let mut vm = machine(source);
        let mut input = ScriptedInput::from_values(inputs);
        let result = vm.run(&mut input, &mut NullTrace);
        (vm, result)
    }

    #[test]
    fn test_fetch_advances_pc_before_execute() {
        let mut vm = machine("1 0 5\n");
        let record = vm.step(&mut ScriptedInput::default()).unwrap().unwrap();
        assert_eq!(record.address, 10);
        assert_eq!(record.state.pc, 13);
        assert_eq!(vm.registers().ir, RawInstruction::new(1, 0, 5));
    }

    #[test]
    fn test_literal_then_write() {
        let (vm, result) = run("1 0 42\n9 0 1\n", &[]);
        assert_eq!(result.unwrap(), Halt::EndOfCode);
        assert_eq!(vm.console().outputs(), vec![42]);
        assert_eq!(vm.registers().sp, 500);
    }

    #[test]
    fn test_add_and_halt() {
        let (vm, result) = run("1 0 5\n1 0 3\n2 0 1\n9 0 1\n9 0 3\n", &[]);
        assert_eq!(result.unwrap(), Halt::Terminated);
        assert_eq!(vm.console().outputs(), vec![8]);
        assert_eq!(vm.steps_executed(), 5);
    }

    #[test]
    fn test_halt_stops_before_remaining_code() {
        let (vm, result) = run("9 0 3\n1 0 7\n9 0 1\n", &[]);
        assert_eq!(result.unwrap(), Halt::Terminated);
        assert_eq!(vm.halt(), Some(Halt::Terminated));
        assert_eq!(vm.steps_executed(), 1);
        assert!(vm.console().outputs().is_empty());
    }

    #[test]
    fn test_sub_is_second_minus_top() {
        let (vm, _) = run("1 0 10\n1 0 3\n2 0 2\n", &[]);
        assert_eq!(vm.memory().read(499).unwrap(), 7);
        assert_eq!(vm.registers().sp, 499);
    }

    #[test]
    fn test_call_then_return_restores_registers() {
        // 10: JMP 16; 13: RTN; 16: CAL 0 13; 19: (end)
        let mut vm = machine("7 0 16\n2 0 0\n5 0 13\n");
        let mut input = ScriptedInput::default();
        vm.step(&mut input).unwrap();
        let before = *vm.registers();

        let call = vm.step(&mut input).unwrap().unwrap();
        assert_eq!(call.state.bp, 499);
        assert_eq!(call.state.pc, 13);
        assert_eq!(vm.memory().read(499).unwrap(), 499);
        assert_eq!(vm.memory().read(498).unwrap(), 499);
        assert_eq!(vm.memory().read(497).unwrap(), 19);

        vm.step(&mut input).unwrap();
        assert_eq!(vm.registers().pc, 19);
        assert_eq!(vm.registers().bp, before.bp);
        assert_eq!(vm.registers().sp, before.sp);
    }

    #[test]
    fn test_jpc_jumps_and_pops_only_on_zero() {
        // zero: jump over the LIT 0 9
        let (vm, _) = run("1 0 0\n8 0 19\n1 0 9\n", &[]);
        assert_eq!(vm.registers().sp, 500);

        // non-zero: value remains and execution falls through
        let (vm, _) = run("1 0 1\n8 0 19\n1 0 9\n", &[]);
        assert_eq!(vm.registers().sp, 498);
        assert_eq!(vm.memory().read(499).unwrap(), 1);
        assert_eq!(vm.memory().read(498).unwrap(), 9);
    }

    #[test]
    fn test_read_pushes_input() {
        let (vm, result) = run("9 0 2\n9 0 1\n", &[-17]);
        assert!(result.is_ok());
        assert_eq!(vm.console().outputs(), vec![-17]);
    }

    #[test]
    fn test_read_errors() {
        let (_, result) = run("9 0 2\n", &[]);
        assert!(matches!(result, Err(RuntimeError::InputExhausted { pc: 10 })));

        let mut vm = machine("9 0 2\n");
        let mut input = ScriptedInput::new(["seven"]);
        let result = vm.run(&mut input, &mut NullTrace);
        assert!(matches!(result, Err(RuntimeError::InvalidInput { .. })));
    }

    #[test]
    fn test_division_by_zero() {
        let (_, result) = run("1 0 1\n1 0 0\n2 0 4\n", &[]);
        assert!(matches!(result, Err(RuntimeError::DivisionByZero { pc: 16 })));
    }

    #[test]
    fn test_pop_from_empty_stack_is_out_of_bounds() {
        let (_, result) = run("9 0 1\n", &[]);
        assert!(matches!(
            result,
            Err(RuntimeError::OutOfBounds { index: 500, .. })
        ));
    }

    #[test]
    fn test_stack_overflow_into_code() {
        let (_, result) = run("6 0 490\n", &[]);
        assert!(matches!(result, Err(RuntimeError::StackOverflow { .. })));
    }

    #[test]
    fn test_store_into_code_region() {
        // INC 0 3; LIT 0 1; STO 0 486 targets index 13
        let (_, result) = run("6 0 3\n1 0 1\n4 0 486\n", &[]);
        assert!(matches!(
            result,
            Err(RuntimeError::CodeWrite { index: 13, pc: 16 })
        ));
    }

    #[test]
    fn test_invalid_instructions() {
        let (_, result) = run("11 0 0\n", &[]);
        assert!(matches!(
            result,
            Err(RuntimeError::InvalidOpcode { opcode: 11, pc: 10 })
        ));

        let (_, result) = run("2 0 12\n", &[]);
        assert!(matches!(
            result,
            Err(RuntimeError::InvalidOperation { modifier: 12, .. })
        ));

        let (_, result) = run("1 0 1\n3 -1 0\n", &[]);
        assert!(matches!(result, Err(RuntimeError::InvalidOperand { pc: 13, .. })));
    }

    #[test]
    fn test_program_too_large() {
        let source = "1 0 1\n".repeat(200);
        let result = Machine::new(Program::parse(&source).unwrap(), VmConfig::default());
        assert!(matches!(result, Err(LoadError::ProgramTooLarge { .. })));
    }

    #[test]
    fn test_independent_machines() {
        let (a, _) = run("1 0 1\n9 0 1\n", &[]);
        let (b, _) = run("1 0 2\n9 0 1\n", &[]);
        assert_eq!(a.console().outputs(), vec![1]);
        assert_eq!(b.console().outputs(), vec![2]);
    }

    #[test]
    fn test_history_navigation() {
        let program = Program::parse("1 0 5\n1 0 3\n2 0 1\n9 0 3\n").unwrap();
        let mut vm = Machine::new(program, VmConfig::default().with_history(1 << 20)).unwrap();
        vm.run(&mut ScriptedInput::default(), &mut NullTrace).unwrap();

        // initial state plus one snapshot per step
        assert_eq!(vm.total_snapshots(), 5);
        assert_eq!(vm.history_position(), 4);

        vm.rewind_to_start().unwrap();
        assert_eq!(vm.registers().sp, 500);
        assert!(vm.last_step().is_none());
        assert!(vm.step_backward().is_err());

        vm.step_forward().unwrap();
        vm.step_forward().unwrap();
        assert_eq!(vm.registers().sp, 498);
        assert_eq!(vm.last_step().unwrap().mnemonic, "LIT");

        vm.jump_to_end().unwrap();
        assert!(vm.step_forward().is_err());
        assert_eq!(vm.last_step().unwrap().mnemonic, "SYS");
    }

    #[test]
    fn test_snapshot_limit() {
        let program = Program::parse("7 0 10\n").unwrap();
        let mut vm = Machine::new(program, VmConfig::default().with_history(64 * 1024)).unwrap();
        let result = vm.run(&mut ScriptedInput::default(), &mut NullTrace);
        assert!(matches!(
            result,
            Err(RuntimeError::SnapshotLimitExceeded { .. })
        ));
    }
}
