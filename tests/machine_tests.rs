// Integration tests for the stack machine

use pm0vm::config::VmConfig;
use pm0vm::interpreter::constants::DEFAULT_SNAPSHOT_LIMIT;
use pm0vm::interpreter::engine::{Halt, Machine};
use pm0vm::interpreter::errors::RuntimeError;
use pm0vm::interpreter::io::ScriptedInput;
use pm0vm::loader::{LoadError, Program};
use pm0vm::memory::resolve_base;
use pm0vm::trace::NullTrace;

// Main calls A, A calls its nested procedure B, B reads A's local through
// one static link and prints it.
//
// 10: JMP 0 40
// 13: A: INC 0 4
// 16:    LIT 0 42
// 19:    STO 0 3
// 22:    CAL 0 28
// 25:    RTN
// 28: B: INC 0 3
// 31:    LOD 1 3
// 34:    SYS 0 1
// 37:    RTN
// 40: main: INC 0 3
// 43:    CAL 0 13
// 46:    SYS 0 3
const NESTED: &str = "\
7 0 40
6 0 4
1 0 42
4 0 3
5 0 28
2 0 0
6 0 3
3 1 3
9 0 1
2 0 0
6 0 3
5 0 13
9 0 3
";

// Counts a local down from 3, printing each value.
//
// 10: INC 0 4
// 13: LIT 0 3
// 16: STO 0 3
// 19: LOD 0 3     loop
// 22: SYS 0 1
// 25: LOD 0 3
// 28: LIT 0 1
// 31: SUB
// 34: STO 0 3
// 37: LOD 0 3
// 40: JPC 0 46
// 43: JMP 0 19
// 46: SYS 0 3
const COUNTDOWN: &str = "\
6 0 4
1 0 3
4 0 3
3 0 3
9 0 1
3 0 3
1 0 1
2 0 2
4 0 3
3 0 3
8 0 46
7 0 19
9 0 3
";

fn load(source: &str, config: VmConfig) -> Machine {
    let program = Program::parse(source).expect("Parsing failed");
    Machine::new(program, config).expect("Loading failed")
}

fn run(source: &str, inputs: &[i32]) -> (Machine, Result<Halt, RuntimeError>) {
    let mut machine = load(source, VmConfig::default());
    let mut input = ScriptedInput::from_values(inputs);
    let result = machine.run(&mut input, &mut NullTrace);
    (machine, result)
}

#[test]
fn test_add_then_halt() {
    let (machine, result) = run("1 0 5\n1 0 3\n2 0 1\n9 0 1\n9 0 3\n", &[]);
    assert_eq!(result.unwrap(), Halt::Terminated);
    assert_eq!(machine.console().outputs(), vec![8]);
    assert_eq!(machine.registers().sp, 500);
}

#[test]
fn test_nested_static_links() {
    let mut machine = load(NESTED, VmConfig::default());
    let mut input = ScriptedInput::default();

    // JMP, INC, CAL, INC, LIT, STO, CAL, INC, LOD, SYS
    for _ in 0..10 {
        machine.step(&mut input).unwrap().expect("halted early");
    }

    let bp = machine.registers().bp;
    assert_eq!(bp, 492);
    assert_eq!(resolve_base(machine.memory(), bp, 0).unwrap(), 492);
    assert_eq!(resolve_base(machine.memory(), bp, 1).unwrap(), 496);
    assert_eq!(resolve_base(machine.memory(), bp, 2).unwrap(), 499);
    assert_eq!(machine.console().outputs(), vec![42]);

    let bases: Vec<i32> = machine
        .activation_records()
        .iter()
        .map(|record| record.base)
        .collect();
    assert_eq!(bases, vec![499, 496, 492]);

    let result = machine.run(&mut input, &mut NullTrace);
    assert_eq!(result.unwrap(), Halt::Terminated);
    assert_eq!(machine.registers().bp, 499);
    assert_eq!(machine.registers().sp, 497);
}

#[test]
fn test_countdown_loop() {
    let (machine, result) = run(COUNTDOWN, &[]);
    assert_eq!(result.unwrap(), Halt::Terminated);
    assert_eq!(machine.console().outputs(), vec![3, 2, 1]);
    // JPC leaves non-zero conditions on the stack
    assert_eq!(machine.registers().sp, 494);
    assert_eq!(machine.memory().read(496).unwrap(), 0);
}

#[test]
fn test_read_and_echo() {
    let (machine, result) = run("9 0 2\n9 0 2\n2 0 3\n9 0 1\n9 0 3\n", &[-6, 7]);
    assert!(result.is_ok());
    assert_eq!(machine.console().outputs(), vec![-42]);
    assert_eq!(machine.console().lines.len(), 3);
}

#[test]
fn test_relational_operators() {
    // EQL NEQ LSS LEQ GTR GEQ applied to 3 and 4
    let expected = [(5, 0), (6, 1), (7, 1), (8, 1), (9, 0), (10, 0)];
    for (modifier, expected) in expected {
        let source = format!("1 0 3\n1 0 4\n2 0 {}\n9 0 1\n", modifier);
        let (machine, result) = run(&source, &[]);
        assert!(result.is_ok());
        assert_eq!(
            machine.console().outputs(),
            vec![expected],
            "modifier {}",
            modifier
        );
    }
}

#[test]
fn test_runtime_errors_carry_pc() {
    let (_, result) = run("1 0 1\n1 0 0\n2 0 4\n", &[]);
    let err = result.unwrap_err();
    assert!(matches!(err, RuntimeError::DivisionByZero { pc: 16 }));
    assert_eq!(err.pc(), Some(16));

    let (_, result) = run("1 0 2147483647\n1 0 1\n2 0 1\n", &[]);
    assert!(matches!(
        result,
        Err(RuntimeError::IntegerOverflow { pc: 16, .. })
    ));

    let (_, result) = run("12 0 0\n", &[]);
    assert!(matches!(
        result,
        Err(RuntimeError::InvalidOpcode { opcode: 12, pc: 10 })
    ));

    let (_, result) = run("9 0 2\n", &[]);
    assert!(matches!(result, Err(RuntimeError::InputExhausted { pc: 10 })));
}

#[test]
fn test_stack_cannot_grow_into_code() {
    // INC 0 500 reaches far below the text segment
    let (_, result) = run("6 0 500\n", &[]);
    assert!(matches!(result, Err(RuntimeError::StackOverflow { .. })));

    // Endless recursion: 10: INC 0 3; 13: CAL 0 10
    let (_, result) = run("6 0 3\n5 0 10\n", &[]);
    assert!(matches!(result, Err(RuntimeError::StackOverflow { .. })));
}

#[test]
fn test_load_errors() {
    assert!(matches!(
        Program::parse("1 0 x\n"),
        Err(LoadError::InvalidToken { line: 1, .. })
    ));
    assert!(matches!(
        Program::parse("1 0 5\n9 0\n"),
        Err(LoadError::IncompleteInstruction { .. })
    ));

    let program: Program = Program::parse(&"1 0 0\n".repeat(200)).unwrap();
    assert!(matches!(
        Machine::new(program, VmConfig::default()),
        Err(LoadError::ProgramTooLarge { instructions: 200, .. })
    ));
}

#[test]
fn test_program_from_file() {
    let path = std::env::temp_dir().join(format!("pm0vm-test-{}.txt", std::process::id()));
    std::fs::write(&path, "1 0 4 9 0 1\n9 0 3\n").unwrap();
    let program = Program::from_file(&path);
    std::fs::remove_file(&path).unwrap();

    let program = program.unwrap();
    assert_eq!(program.len(), 3);
    assert!(matches!(
        Program::from_file(&path),
        Err(LoadError::Io(_))
    ));
}

#[test]
fn test_custom_layout() {
    let config = VmConfig {
        capacity: 100,
        code_start: 0,
        ..VmConfig::default()
    };
    let mut machine = load("1 0 5\n9 0 1\n9 0 3\n", config);
    assert_eq!(machine.registers().pc, 0);
    assert_eq!(machine.registers().bp, 99);

    let result = machine.run(&mut ScriptedInput::default(), &mut NullTrace);
    assert_eq!(result.unwrap(), Halt::Terminated);
    assert_eq!(machine.console().outputs(), vec![5]);
}

#[test]
fn test_independent_machines() {
    let (a, _) = run(COUNTDOWN, &[]);
    let (b, _) = run("1 0 99\n9 0 1\n", &[]);
    assert_eq!(a.console().outputs(), vec![3, 2, 1]);
    assert_eq!(b.console().outputs(), vec![99]);
}

#[test]
fn test_time_travel_over_recorded_run() {
    let config = VmConfig::default().with_history(DEFAULT_SNAPSHOT_LIMIT);
    let mut machine = load(NESTED, config);
    machine
        .run(&mut ScriptedInput::default(), &mut NullTrace)
        .unwrap();

    let steps = machine.steps_executed();
    assert_eq!(machine.total_snapshots(), steps + 1);
    let final_registers = *machine.registers();

    machine.rewind_to_start().unwrap();
    assert_eq!(machine.history_position(), 0);
    assert_eq!(machine.registers().pc, 10);
    assert!(machine.console().lines.is_empty());
    assert!(machine.step_backward().is_err());

    // Refuse to execute while viewing the past
    assert!(matches!(
        machine.step(&mut ScriptedInput::default()),
        Err(RuntimeError::HistoryOperationFailed { .. })
    ));

    for _ in 0..10 {
        machine.step_forward().unwrap();
    }
    assert_eq!(machine.registers().bp, 492);
    assert_eq!(machine.console().outputs(), vec![42]);
    assert_eq!(machine.activation_records().len(), 3);

    machine.jump_to_end().unwrap();
    assert_eq!(*machine.registers(), final_registers);
    assert!(machine.step_forward().is_err());
}
