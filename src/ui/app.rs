//! Main TUI application state and logic

use crate::interpreter::engine::{Halt, Machine};
use crate::interpreter::errors::RuntimeError;
use crate::ui::panes::{self, CodeRenderData, StackRenderData, StatusRenderData};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};
use std::io;
use std::time::{Duration, Instant};

/// Which pane is currently focused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusedPane {
    Code,
    Stack,
    Registers,
    Console,
}

impl FocusedPane {
    /// Move focus to the next pane (clockwise: code -> console -> stack -> registers)
    pub fn next(self) -> Self {
        match self {
            FocusedPane::Code => FocusedPane::Console,
            FocusedPane::Console => FocusedPane::Stack,
            FocusedPane::Stack => FocusedPane::Registers,
            FocusedPane::Registers => FocusedPane::Code,
        }
    }

    /// Move focus to the previous pane (counter-clockwise)
    pub fn prev(self) -> Self {
        match self {
            FocusedPane::Code => FocusedPane::Registers,
            FocusedPane::Console => FocusedPane::Code,
            FocusedPane::Stack => FocusedPane::Console,
            FocusedPane::Registers => FocusedPane::Stack,
        }
    }
}

/// The main application state
pub struct App {
    /// The machine whose history is being viewed
    pub machine: Machine,

    /// Currently focused pane
    pub focused_pane: FocusedPane,

    /// Per-pane scroll offsets
    pub code_scroll: usize,
    pub stack_scroll: usize,
    pub console_scroll: usize,

    /// Code pane keeps the next instruction centered until scrolled by hand
    pub follow_pc: bool,

    /// Previous item count for stack pane (for smart auto-scroll)
    pub prev_stack_items: usize,

    /// Error that ended the run, shown in the status bar
    pub run_error: Option<String>,

    /// Whether the app should quit
    pub should_quit: bool,

    /// Status message to display
    pub status_message: String,

    /// Whether auto-play mode is active
    pub is_playing: bool,

    /// Last time a step was taken in play mode
    pub last_play_time: Instant,

    /// Last time space was pressed (for debouncing)
    pub last_space_press: Instant,
}

impl App {
    /// Create a new app viewing the recorded history of `machine`
    pub fn new(machine: Machine, run_error: Option<String>) -> Self {
        let status_message = match (&run_error, machine.halt()) {
            (Some(message), _) => format!("Runtime error: {}", message),
            (None, Some(Halt::Terminated)) => String::from("Ready! Program halted with SYS 0 3"),
            (None, Some(Halt::EndOfCode)) => String::from("Ready! Program ran off the end of code"),
            (None, None) => String::from("Ready!"),
        };

        App {
            machine,
            focused_pane: FocusedPane::Code,
            code_scroll: 0,
            stack_scroll: 0,
            console_scroll: 0,
            follow_pc: true,
            prev_stack_items: 0,
            run_error,
            should_quit: false,
            status_message,
            is_playing: false,
            last_play_time: Instant::now(),
            last_space_press: Instant::now()
                .checked_sub(Duration::from_secs(1))
                .unwrap_or(Instant::now()),
        }
    }

    /// Run the TUI application
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if self.should_quit {
                break;
            }

            // Handle auto-play mode
            if self.is_playing && self.last_play_time.elapsed() >= Duration::from_millis(500) {
                if self.machine.step_forward().is_ok() {
                    self.status_message = "Playing...".to_string();
                    self.after_step();
                } else {
                    self.is_playing = false;
                    self.status_message = "Playback complete".to_string();
                }
                self.last_play_time = Instant::now();
            }

            // Use poll with timeout to allow auto-play to work
            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key_event(key);
                    }
                }
            }
        }

        Ok(())
    }

    /// Render the UI
    fn render(&mut self, frame: &mut Frame) {
        let size = frame.area();

        // Create layout: 4 panes in 2 columns, plus status bar at bottom
        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(size);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(main_chunks[0]);

        // Left column: Code (top) | Console (bottom)
        let left_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
            .split(columns[0]);

        // Right column: Stack (top) | Registers (bottom)
        let right_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(8)])
            .split(columns[1]);

        let machine = &self.machine;
        let registers = *machine.registers();

        panes::render_code_pane(
            frame,
            left_rows[0],
            CodeRenderData {
                instructions: machine.program().instructions(),
                code_start: machine.config().code_start,
                pc: registers.pc,
                executed: machine.last_step().map(|record| record.address),
            },
            self.focused_pane == FocusedPane::Code,
            &mut self.code_scroll,
            self.follow_pc,
        );

        panes::render_terminal_pane(
            frame,
            left_rows[1],
            machine.console(),
            self.focused_pane == FocusedPane::Console,
            &mut self.console_scroll,
        );

        let cells = machine.memory().stack_cells(registers.sp);
        let records = machine.activation_records();
        panes::render_stack_pane(
            frame,
            right_rows[0],
            StackRenderData {
                cells: &cells,
                records: &records,
                bp: registers.bp,
                sp: registers.sp,
            },
            self.focused_pane == FocusedPane::Stack,
            &mut self.stack_scroll,
            &mut self.prev_stack_items,
        );

        panes::render_registers_pane(
            frame,
            right_rows[1],
            &registers,
            machine.memory(),
            machine.steps_executed(),
            self.focused_pane == FocusedPane::Registers,
        );

        panes::render_status_bar(
            frame,
            main_chunks[1],
            StatusRenderData {
                message: &self.status_message,
                current_step: machine.history_position(),
                total_steps: machine.total_snapshots().saturating_sub(1),
                has_error: self.run_error.is_some(),
                is_playing: self.is_playing,
            },
        );
    }

    /// Handle keyboard events
    fn handle_key_event(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                self.should_quit = true;
            }
            // Number keys step forward N times directly
            KeyCode::Char(c @ '1'..='9') => {
                self.is_playing = false;
                let n = c.to_digit(10).unwrap_or(1) as usize;
                let mut stepped = 0;
                for _ in 0..n {
                    if self.machine.step_forward().is_ok() {
                        stepped += 1;
                    } else {
                        break;
                    }
                }
                self.status_message = format!("Stepped forward {} step(s)", stepped);
                self.after_step();
            }
            KeyCode::Tab => {
                self.focused_pane = self.focused_pane.next();
            }
            KeyCode::BackTab => {
                self.focused_pane = self.focused_pane.prev();
            }
            KeyCode::Left => {
                self.is_playing = false;
                self.step_backward();
            }
            KeyCode::Right => {
                self.is_playing = false;
                self.step_forward();
            }
            KeyCode::Up => match self.focused_pane {
                FocusedPane::Code => {
                    self.follow_pc = false;
                    self.code_scroll = self.code_scroll.saturating_sub(1);
                }
                FocusedPane::Stack => {
                    self.stack_scroll = self.stack_scroll.saturating_sub(1);
                }
                FocusedPane::Console => {
                    self.console_scroll = self.console_scroll.saturating_sub(1);
                }
                FocusedPane::Registers => {}
            },
            KeyCode::Down => match self.focused_pane {
                FocusedPane::Code => {
                    self.follow_pc = false;
                    self.code_scroll = self.code_scroll.saturating_add(1);
                }
                FocusedPane::Stack => {
                    self.stack_scroll = self.stack_scroll.saturating_add(1);
                }
                FocusedPane::Console => {
                    self.console_scroll = self.console_scroll.saturating_add(1);
                }
                FocusedPane::Registers => {}
            },
            KeyCode::Char(' ') => {
                // Toggle auto-play mode (with 200ms debounce to prevent key repeat spam)
                if self.last_space_press.elapsed() >= Duration::from_millis(200) {
                    self.last_space_press = Instant::now();
                    self.is_playing = !self.is_playing;
                    if self.is_playing {
                        self.last_play_time = Instant::now()
                            .checked_sub(Duration::from_secs(1))
                            .unwrap_or(Instant::now());
                        self.status_message = "Playing...".to_string();
                    } else {
                        self.status_message = "Paused".to_string();
                    }
                }
            }
            KeyCode::Enter => {
                self.is_playing = false;
                match self.machine.jump_to_end() {
                    Ok(()) => self.status_message = "Jumped to end".to_string(),
                    Err(e) => self.status_message = e.to_string(),
                }
                self.after_step();
            }
            KeyCode::Backspace => {
                self.is_playing = false;
                match self.machine.rewind_to_start() {
                    Ok(()) => self.status_message = "Jumped to start".to_string(),
                    Err(e) => self.status_message = e.to_string(),
                }
                self.after_step();
            }
            _ => {}
        }
    }

    /// Re-follow the program counter and scroll the console to the bottom
    fn after_step(&mut self) {
        self.follow_pc = true;
        self.console_scroll = usize::MAX;
    }

    /// Step forward in execution
    fn step_forward(&mut self) {
        match self.machine.step_forward() {
            Ok(()) => {
                self.status_message = match self.machine.last_step() {
                    Some(record) => format!(
                        "Executed {} {} {} at {}",
                        record.mnemonic, record.l, record.m, record.address
                    ),
                    None => "Stepped forward".to_string(),
                };
                self.after_step();
            }
            Err(RuntimeError::HistoryOperationFailed { message }) => {
                self.status_message = match &self.run_error {
                    Some(error) => format!("Stopped by error: {}", error),
                    None => format!("Cannot step forward: {}", message),
                };
            }
            Err(e) => {
                self.status_message = format!("Error: {}", e);
            }
        }
    }

    /// Step backward in execution
    fn step_backward(&mut self) {
        match self.machine.step_backward() {
            Ok(()) => {
                self.status_message = "Stepped backward".to_string();
                self.after_step();
            }
            Err(RuntimeError::HistoryOperationFailed { message }) => {
                self.status_message = format!("Cannot step backward: {}", message);
            }
            Err(e) => {
                self.status_message = format!("Error: {}", e);
            }
        }
    }
}
