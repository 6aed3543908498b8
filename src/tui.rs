use anyhow::Result;
use crossterm::{
    event::{
        self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEvent,
        KeyEventKind, KeyModifiers,
    },
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;
use std::panic;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error};

use crate::ai::{self, AnalysisError, CompletionProvider};
use crate::app::{AppState, Step};
use crate::dashboard;
use crate::extract::{self, ExtractError, LibraryExtractor, Upload, ACCEPTED_EXTENSIONS};
use crate::models::{ExperienceLevel, ResumeAnalysis, ROLES};

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Role,
    CustomRole,
    Level,
    Resume,
    FilePath,
}

impl Focus {
    const ORDER: [Focus; 5] = [
        Focus::Role,
        Focus::CustomRole,
        Focus::Level,
        Focus::Resume,
        Focus::FilePath,
    ];

    fn next(self) -> Self {
        let idx = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        Self::ORDER[(idx + 1) % Self::ORDER.len()]
    }

    fn prev(self) -> Self {
        let idx = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        Self::ORDER[(idx + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }
}

/// Results posted back by the worker thread.
enum WorkerMsg {
    Extracted(Result<String, ExtractError>),
    Analyzed(Result<ResumeAnalysis, AnalysisError>),
}

struct UiState {
    app: AppState,
    focus: Focus,
    file_path: String,
    scroll_offset: u16,
    tick: usize,
    provider: Arc<dyn CompletionProvider + Send + Sync>,
    tx: Sender<WorkerMsg>,
    rx: Receiver<WorkerMsg>,
}

impl UiState {
    fn new(app: AppState, provider: Arc<dyn CompletionProvider + Send + Sync>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            app,
            focus: Focus::Resume,
            file_path: String::new(),
            scroll_offset: 0,
            tick: 0,
            provider,
            tx,
            rx,
        }
    }

    fn scroll_down(&mut self, by: u16) {
        self.scroll_offset = self.scroll_offset.saturating_add(by);
    }

    fn scroll_up(&mut self, by: u16) {
        self.scroll_offset = self.scroll_offset.saturating_sub(by);
    }

    fn start_analysis(&mut self) {
        if self.app.is_parsing {
            return;
        }
        let Ok(input) = self.app.begin_analysis() else {
            return;
        };
        let provider = Arc::clone(&self.provider);
        let tx = self.tx.clone();
        thread::spawn(move || {
            let outcome = ai::analyze_resume(
                provider.as_ref(),
                &input.resume_text,
                &input.target_role,
                input.level,
            );
            let _ = tx.send(WorkerMsg::Analyzed(outcome));
        });
    }

    fn start_upload(&mut self) {
        let raw = self.file_path.trim();
        if raw.is_empty() {
            self.app.error = Some(format!(
                "Enter the path of a file to upload ({}).",
                ACCEPTED_EXTENSIONS.map(|e| format!(".{e}")).join(", ")
            ));
            return;
        }
        let path = expand_home(raw);
        if !self.app.begin_upload() {
            return;
        }
        debug!("Extracting {}", path.display());
        let tx = self.tx.clone();
        thread::spawn(move || {
            let outcome = Upload::from_path(&path)
                .and_then(|upload| extract::extract_text(&LibraryExtractor, &upload));
            let _ = tx.send(WorkerMsg::Extracted(outcome));
        });
    }

    fn drain_worker(&mut self) {
        while let Ok(msg) = self.rx.try_recv() {
            match msg {
                WorkerMsg::Extracted(outcome) => {
                    if outcome.is_ok() {
                        self.file_path.clear();
                    }
                    self.app.finish_upload(outcome);
                }
                WorkerMsg::Analyzed(outcome) => {
                    self.scroll_offset = 0;
                    self.app.finish_analysis(outcome);
                }
            }
        }
    }

    fn focused_field(&mut self) -> Option<&mut String> {
        match self.focus {
            Focus::CustomRole => Some(&mut self.app.custom_role),
            Focus::Resume if !self.app.is_parsing => Some(&mut self.app.resume_text),
            Focus::FilePath => Some(&mut self.file_path),
            _ => None,
        }
    }

    fn paste(&mut self, text: &str) {
        if self.app.step != Step::Upload {
            return;
        }
        let text = text.replace("\r\n", "\n").replace('\r', "\n");
        let multiline = self.focus == Focus::Resume;
        if let Some(field) = self.focused_field() {
            if multiline {
                field.push_str(&text);
            } else {
                field.push_str(text.lines().next().unwrap_or(""));
            }
        }
    }

    /// Returns false when the user asked to quit.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl && key.code == KeyCode::Char('c') {
            return false;
        }
        match self.app.step {
            Step::Upload => self.handle_upload_key(key, ctrl),
            Step::Analyzing => key.code != KeyCode::Esc,
            Step::Result => self.handle_result_key(key),
        }
    }

    fn handle_upload_key(&mut self, key: KeyEvent, ctrl: bool) -> bool {
        if ctrl {
            match key.code {
                KeyCode::Char('s') => self.start_analysis(),
                KeyCode::Char('o') => self.start_upload(),
                KeyCode::Char('l') if !self.app.is_parsing => self.app.clear_resume(),
                _ => {}
            }
            return true;
        }

        match (self.focus, key.code) {
            (_, KeyCode::Esc) => return false,
            (_, KeyCode::Tab) => self.focus = self.focus.next(),
            (_, KeyCode::BackTab) => self.focus = self.focus.prev(),
            (Focus::Role, KeyCode::Down | KeyCode::Char('j')) => self.app.next_role(),
            (Focus::Role, KeyCode::Up | KeyCode::Char('k')) => self.app.prev_role(),
            (Focus::Level, KeyCode::Right | KeyCode::Down | KeyCode::Char('l')) => {
                self.app.level = self.app.level.next()
            }
            (Focus::Level, KeyCode::Left | KeyCode::Up | KeyCode::Char('h')) => {
                self.app.level = self.app.level.prev()
            }
            (Focus::FilePath, KeyCode::Enter) => self.start_upload(),
            (Focus::Resume, KeyCode::Enter) => {
                if !self.app.is_parsing {
                    self.app.resume_text.push('\n');
                }
            }
            (_, KeyCode::Backspace) => {
                if let Some(field) = self.focused_field() {
                    field.pop();
                }
            }
            (_, KeyCode::Char(c)) => {
                if let Some(field) = self.focused_field() {
                    field.push(c);
                }
            }
            _ => {}
        }
        true
    }

    fn handle_result_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return false,
            KeyCode::Char('n') => {
                self.app.reset();
                self.scroll_offset = 0;
            }
            KeyCode::Down | KeyCode::Char('j') => self.scroll_down(1),
            KeyCode::Up | KeyCode::Char('k') => self.scroll_up(1),
            KeyCode::Char('J') | KeyCode::PageDown => self.scroll_down(10),
            KeyCode::Char('K') | KeyCode::PageUp => self.scroll_up(10),
            KeyCode::Home | KeyCode::Char('g') => self.scroll_offset = 0,
            _ => {}
        }
        true
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(dirs) = directories::BaseDirs::new() {
            return dirs.home_dir().join(rest);
        }
    }
    PathBuf::from(path)
}

pub fn run(
    app: AppState,
    provider: Arc<dyn CompletionProvider + Send + Sync>,
    initial_file: Option<PathBuf>,
) -> Result<()> {
    let mut state = UiState::new(app, provider);
    if let Some(path) = initial_file {
        state.file_path = path.display().to_string();
        state.start_upload();
    }

    // Panics caught in workers would otherwise print over the alternate screen.
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(|info| error!("{}", info)));

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    stdout().execute(EnableBracketedPaste)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state);

    // Restore terminal
    stdout().execute(DisableBracketedPaste)?;
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    panic::set_hook(default_hook);

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut UiState,
) -> Result<()> {
    let mut role_list = ListState::default();

    loop {
        state.drain_worker();
        role_list.select(Some(state.app.role_index));
        terminal.draw(|frame| draw(frame, state, &mut role_list))?;

        if event::poll(Duration::from_millis(100))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if !state.handle_key(key) {
                        break;
                    }
                }
                Event::Paste(text) => state.paste(&text),
                _ => {}
            }
        }
        state.tick = state.tick.wrapping_add(1);
    }
    Ok(())
}

fn draw(frame: &mut Frame, state: &UiState, role_list: &mut ListState) {
    match state.app.step {
        Step::Upload => draw_upload(frame, state, role_list),
        Step::Analyzing => draw_analyzing(frame, state),
        Step::Result => draw_result(frame, state),
    }
}

fn field_block(title: String, focused: bool) -> Block<'static> {
    let style = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    Block::default().borders(Borders::ALL).border_style(style).title(title)
}

fn draw_upload(frame: &mut Frame, state: &UiState, role_list: &mut ListState) {
    let app = &state.app;
    let error_height = if app.error.is_some() { 4 } else { 0 };
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(8),
            Constraint::Min(6),
            Constraint::Length(3),
            Constraint::Length(error_height),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            " Enterprise Resume Scorer ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(" target role: {}", app.effective_role()),
            Style::default().fg(Color::DarkGray),
        ),
    ]));
    frame.render_widget(header, rows[0]);

    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Percentage(30),
            Constraint::Percentage(30),
        ])
        .split(rows[1]);

    // Role picker
    let items: Vec<ListItem> = ROLES.iter().map(|r| ListItem::new(r.title)).collect();
    let list = List::new(items)
        .block(field_block(" Target Role ".to_string(), state.focus == Focus::Role))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, top[0], role_list);

    let custom = Paragraph::new(if app.custom_role.is_empty() && state.focus != Focus::CustomRole {
        Line::from(Span::styled(
            "Other (specify to override)",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Line::from(with_cursor(&app.custom_role, state.focus == Focus::CustomRole))
    })
    .wrap(Wrap { trim: false })
    .block(field_block(" Custom Role ".to_string(), state.focus == Focus::CustomRole));
    frame.render_widget(custom, top[1]);

    let levels: Vec<Line> = ExperienceLevel::ALL
        .iter()
        .map(|level| {
            if *level == app.level {
                Line::from(Span::styled(
                    format!("(*) {}", level.label()),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                ))
            } else {
                Line::from(format!("( ) {}", level.label()))
            }
        })
        .collect();
    let levels = Paragraph::new(levels)
        .block(field_block(" Experience Level ".to_string(), state.focus == Focus::Level));
    frame.render_widget(levels, top[2]);

    // Resume text area, scrolled to the tail
    let title = if app.is_parsing {
        format!(" Resume Content  {} Parsing... ", SPINNER[state.tick % SPINNER.len()])
    } else {
        format!(" Resume Content ({} chars) ", app.resume_text.chars().count())
    };
    let body = if app.resume_text.is_empty() && state.focus != Focus::Resume {
        Text::from(Span::styled(
            "Paste your resume content or upload a document below...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Text::raw(with_cursor(&app.resume_text, state.focus == Focus::Resume && !app.is_parsing))
    };
    let inner_height = rows[2].height.saturating_sub(2);
    let line_count = app.resume_text.lines().count() as u16 + 1;
    let resume = Paragraph::new(body)
        .block(field_block(title, state.focus == Focus::Resume))
        .wrap(Wrap { trim: false })
        .scroll((line_count.saturating_sub(inner_height), 0));
    frame.render_widget(resume, rows[2]);

    let upload = Paragraph::new(with_cursor(&state.file_path, state.focus == Focus::FilePath)).block(
        field_block(
            " Upload PDF / DOCX / TXT / MD (Enter or Ctrl-O) ".to_string(),
            state.focus == Focus::FilePath,
        ),
    );
    frame.render_widget(upload, rows[3]);

    if let Some(error) = &app.error {
        let banner = Paragraph::new(error.as_str())
            .style(Style::default().fg(Color::Red))
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Red))
                    .title(" System Error "),
            );
        frame.render_widget(banner, rows[4]);
    }

    let help = Paragraph::new(
        " Tab:next field  Ctrl-S:trigger analysis  Ctrl-O:upload  Ctrl-L:clear text  Esc:quit",
    )
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, rows[5]);
}

fn with_cursor(text: &str, focused: bool) -> String {
    if focused {
        format!("{}▏", text)
    } else {
        text.to_string()
    }
}

fn draw_analyzing(frame: &mut Frame, state: &UiState) {
    let spinner = SPINNER[state.tick % SPINNER.len()];
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("{}  Engines Active  {}", spinner, spinner),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled("Processing text vectors...", Style::default().fg(Color::DarkGray))),
        Line::from(Span::styled(
            "Simulating hiring manager review...",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let area = centered(frame.area(), 50, 9);
    let widget = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(widget, area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn draw_result(frame: &mut Frame, state: &UiState) {
    let Some(analysis) = &state.app.analysis else {
        return;
    };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());

    let width = chunks[0].width.saturating_sub(2) as usize;
    let detail = Paragraph::new(dashboard::render(analysis, width))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Enterprise ATS Evaluation "),
        )
        .scroll((state.scroll_offset, 0));
    frame.render_widget(detail, chunks[0]);

    let help = Paragraph::new(" j/k:scroll  J/K:page  n:analyze new resume  q:quit")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, chunks[1]);
}
