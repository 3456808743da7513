//! A minimal terminal front-end for [`lc3_sim::debugger::DebugController`].
//!
//! This is deliberately a thin adapter: every panel renders straight off a
//! [`Snapshot`](lc3_sim::debugger::Snapshot) and a drained output buffer,
//! and every keypress is translated into exactly one debug-controller
//! command. The widget layout itself isn't architecturally interesting —
//! what matters is that the adapter never touches VM state directly, only
//! through the controller's public surface.

use std::io::{self, Write};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CEvent, KeyCode, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span as TuiSpan};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};
use ratatui::{Frame, Terminal};

use lc3_assembler::codec;
use lc3_sim::debugger::{DebugController, Notification as DebugNotification};

/// What the next keystroke feeds into, when it isn't a plain command.
enum Mode {
    Normal,
    EnterBreakpoint(String),
    EnterInput(String),
}

struct App {
    debugger: DebugController,
    output: String,
    status: String,
    mode: Mode,
    mem_start: u16,
    loaded_path: Option<String>,
    should_quit: bool,
}

impl App {
    fn new(loaded_path: Option<String>) -> Self {
        App {
            debugger: DebugController::new(),
            output: String::new(),
            status: "ready".to_string(),
            mode: Mode::Normal,
            mem_start: 0x3000,
            loaded_path,
            should_quit: false,
        }
    }

    fn drain_events(&mut self) {
        while let Some(event) = self.debugger.poll_event() {
            match event {
                DebugNotification::OutputAvailable => self.output.push_str(&self.debugger.drain_output()),
                DebugNotification::Halted => self.status = "halted".to_string(),
                DebugNotification::WaitingForInput => self.status = "waiting for input".to_string(),
                DebugNotification::BreakpointHit(addr) => self.status = format!("breakpoint hit at x{addr:04X}"),
                DebugNotification::StateChanged => {}
            }
        }
    }

    fn handle_key(&mut self, key: KeyCode) {
        match &mut self.mode {
            Mode::Normal => match key {
                KeyCode::Char('q') => self.should_quit = true,
                KeyCode::Char('r') => {
                    self.debugger.run();
                    self.status = "running".to_string();
                }
                KeyCode::Char('s') => self.debugger.step(),
                KeyCode::Char('x') => {
                    self.debugger.stop();
                    self.status = "stopped".to_string();
                }
                KeyCode::Char('c') => {
                    self.debugger.reset();
                    self.output.clear();
                    self.status = "reset".to_string();
                }
                KeyCode::Char('b') => self.mode = Mode::EnterBreakpoint(String::new()),
                KeyCode::Char('i') => self.mode = Mode::EnterInput(String::new()),
                KeyCode::Up => self.mem_start = self.mem_start.wrapping_sub(1),
                KeyCode::Down => self.mem_start = self.mem_start.wrapping_add(1),
                KeyCode::PageUp => self.mem_start = self.mem_start.wrapping_sub(16),
                KeyCode::PageDown => self.mem_start = self.mem_start.wrapping_add(16),
                _ => {}
            },
            Mode::EnterBreakpoint(buf) => match key {
                KeyCode::Enter => {
                    if let Some(addr) = parse_address(buf) {
                        self.debugger.add_breakpoint(addr);
                        self.status = format!("breakpoint set at x{addr:04X}");
                    } else {
                        self.status = format!("invalid address '{buf}'");
                    }
                    self.mode = Mode::Normal;
                }
                KeyCode::Esc => self.mode = Mode::Normal,
                KeyCode::Backspace => {
                    buf.pop();
                }
                KeyCode::Char(c) => buf.push(c),
                _ => {}
            },
            Mode::EnterInput(buf) => match key {
                KeyCode::Enter => {
                    self.debugger.feed_input(buf);
                    self.mode = Mode::Normal;
                }
                KeyCode::Esc => self.mode = Mode::Normal,
                KeyCode::Backspace => {
                    buf.pop();
                }
                KeyCode::Char(c) => buf.push(c),
                _ => {}
            },
        }
    }

    fn draw(&self, frame: &mut Frame) {
        let size = frame.size();
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(26), Constraint::Min(40)])
            .split(size);

        self.draw_left_panel(frame, columns[0]);
        self.draw_right_panel(frame, columns[1]);
    }

    fn draw_left_panel(&self, frame: &mut Frame, area: Rect) {
        let snap = self.debugger.snapshot();
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(12), Constraint::Length(3), Constraint::Min(3)])
            .split(area);

        let mut reg_lines: Vec<Line> = (0..8)
            .map(|r| Line::from(format!("R{r}: x{:04X}", snap.registers[r])))
            .collect();
        reg_lines.push(Line::from(format!("PC:  x{:04X}", snap.pc)));
        reg_lines.push(Line::from(format!("COND: {}", cond_letters(snap.cond))));
        frame.render_widget(
            Paragraph::new(reg_lines).block(Block::default().title("Registers").borders(Borders::ALL)),
            rows[0],
        );

        let status_text = match &self.mode {
            Mode::Normal => self.status.clone(),
            Mode::EnterBreakpoint(buf) => format!("address? {buf}"),
            Mode::EnterInput(buf) => format!("input? {buf}"),
        };
        frame.render_widget(
            Paragraph::new(status_text).block(Block::default().title("Status").borders(Borders::ALL)),
            rows[1],
        );

        let bp_items: Vec<ListItem> = snap
            .breakpoints
            .iter()
            .map(|addr| ListItem::new(format!("x{addr:04X}")))
            .collect();
        frame.render_widget(
            List::new(bp_items).block(Block::default().title("Breakpoints (b)").borders(Borders::ALL)),
            rows[2],
        );
    }

    fn draw_right_panel(&self, frame: &mut Frame, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(10), Constraint::Length(8)])
            .split(area);

        self.draw_memory(frame, rows[0]);

        frame.render_widget(
            Paragraph::new(self.output.as_str())
                .block(Block::default().title("Console Output").borders(Borders::ALL)),
            rows[1],
        );
    }

    fn draw_memory(&self, frame: &mut Frame, area: Rect) {
        let snap = self.debugger.snapshot();
        let visible_rows = area.height.saturating_sub(2) as usize;
        let words = self.debugger.memory_range(self.mem_start, visible_rows.max(1));

        let lines: Vec<Line> = words
            .iter()
            .enumerate()
            .map(|(i, word)| {
                let addr = self.mem_start.wrapping_add(i as u16);
                let marker = if addr == snap.pc {
                    ">>"
                } else if snap.breakpoints.contains(&addr) {
                    "BP"
                } else {
                    "  "
                };
                let style = if addr == snap.pc {
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
                } else if snap.breakpoints.contains(&addr) {
                    Style::default().fg(Color::Red)
                } else {
                    Style::default()
                };
                Line::from(TuiSpan::styled(
                    format!("{marker} x{addr:04X}: x{word:04X}  {}", disassemble(*word)),
                    style,
                ))
            })
            .collect();

        frame.render_widget(
            Paragraph::new(lines).block(
                Block::default()
                    .title("Memory (\u{2191}/\u{2193} PgUp/PgDn to scroll)")
                    .borders(Borders::ALL),
            ),
            area,
        );
    }
}

fn cond_letters(cond: u16) -> &'static str {
    match cond {
        4 => "N",
        2 => "Z",
        1 => "P",
        _ => "?",
    }
}

fn parse_address(text: &str) -> Option<u16> {
    let text = text.trim();
    let digits = text.strip_prefix("0x").or_else(|| text.strip_prefix('x')).unwrap_or(text);
    u16::from_str_radix(digits, if digits.len() == text.len() { 10 } else { 16 }).ok()
}

/// A compact, best-effort disassembly for the memory panel only; not a
/// substitute for the codec's authoritative decode.
fn disassemble(word: u16) -> String {
    let inst = codec::decode(word);
    use codec::Instruction::*;
    match inst {
        AddReg { .. } | AddImm { .. } => "ADD".to_string(),
        AndReg { .. } | AndImm { .. } => "AND".to_string(),
        Not { .. } => "NOT".to_string(),
        Br { .. } => "BR".to_string(),
        Jmp { base_r: 7 } => "RET".to_string(),
        Jmp { .. } => "JMP".to_string(),
        Jsr { .. } => "JSR".to_string(),
        Jsrr { .. } => "JSRR".to_string(),
        Ld { .. } => "LD".to_string(),
        Ldi { .. } => "LDI".to_string(),
        Ldr { .. } => "LDR".to_string(),
        Lea { .. } => "LEA".to_string(),
        St { .. } => "ST".to_string(),
        Sti { .. } => "STI".to_string(),
        Str { .. } => "STR".to_string(),
        Trap { trapvect8 } => format!("TRAP x{trapvect8:02X}"),
        Rti => "RTI".to_string(),
        Reserved => "".to_string(),
    }
}

fn main() -> io::Result<()> {
    let mut args = std::env::args().skip(1);
    let object_path = args.next();

    let mut app = App::new(object_path.clone());
    if let Some(path) = &object_path {
        match std::fs::read(path) {
            Ok(bytes) => {
                app.debugger.load(bytes);
                app.status = format!("loaded {path}");
            }
            Err(err) => app.status = format!("failed to load {path}: {err}"),
        }
    } else {
        app.status = "no object file given; start paused at reset state".to_string();
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    let tick = Duration::from_millis(33);
    let mut last_tick = Instant::now();

    while !app.should_quit {
        app.drain_events();
        terminal.draw(|frame| app.draw(frame))?;

        let timeout = tick.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            if let CEvent::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key.code);
                }
            }
        }
        if last_tick.elapsed() >= tick {
            last_tick = Instant::now();
        }
    }
    Ok(())
}
