use anyhow::Result;
use crossterm::{
    event::{
        self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

use spotlight_core::{
    Action, AnalysisOutcome, AnalyzeError, Badge, CategorySelection, FileUpload, Step, Summary,
    Wizard, grouped_rows,
};

use crate::analyze_worker::{AnalyzeEvent, AnalyzeRequest};

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputMode {
    Browse,
    Custom,
}

/// Everything the wizard screen needs between frames.
struct App {
    server: String,
    wizard: Wizard,
    selection: CategorySelection,
    upload: FileUpload,
    cursor: usize,
    mode: InputMode,
    path_input: String,
    notice: Option<String>,
    scroll: u16,
    next_request_id: u64,
    pending: Option<u64>,
    tick: usize,
    quit: bool,
}

impl App {
    fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            wizard: Wizard::new(),
            selection: CategorySelection::new(),
            upload: FileUpload::new(),
            cursor: 0,
            mode: InputMode::Browse,
            path_input: String::new(),
            notice: None,
            scroll: 0,
            next_request_id: 1,
            pending: None,
            tick: 0,
            quit: false,
        }
    }

    /// Returns a request when the key started an analysis.
    fn handle_key(&mut self, key: KeyEvent) -> Option<AnalyzeRequest> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.quit = true;
            return None;
        }
        match self.wizard.state().step() {
            Step::SelectCategories => {
                self.on_select_key(key);
                None
            }
            Step::Upload => self.on_upload_key(key),
            Step::Results => {
                self.on_results_key(key);
                None
            }
        }
    }

    fn on_select_key(&mut self, key: KeyEvent) {
        if self.mode == InputMode::Custom {
            match key.code {
                KeyCode::Enter => match self.selection.submit_input() {
                    Ok(added) => {
                        self.mode = InputMode::Browse;
                        if added {
                            self.cursor = self.selection.categories().len() - 1;
                        }
                    }
                    Err(e) => self.notice = Some(e.to_string()),
                },
                KeyCode::Esc => {
                    self.selection.input.clear();
                    self.mode = InputMode::Browse;
                }
                KeyCode::Backspace => {
                    self.selection.input.pop();
                }
                KeyCode::Char(c) => self.selection.input.push(c),
                _ => {}
            }
            return;
        }

        let categories = self.selection.categories();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                self.cursor = (self.cursor + 1).min(categories.len().saturating_sub(1));
            }
            KeyCode::Char(' ') => {
                if let Some(c) = categories.get(self.cursor) {
                    self.selection.toggle(&c.id);
                }
            }
            KeyCode::Char('a') => {
                self.notice = None;
                self.mode = InputMode::Custom;
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(c) = categories.get(self.cursor) {
                    if self.selection.remove_custom(&c.id) {
                        self.cursor = self.cursor.min(categories.len() - 2);
                    }
                }
            }
            KeyCode::Enter => {
                let mut chosen = None;
                if self.selection.continue_with(|set| chosen = Some(set)) {
                    if let Some(set) = chosen {
                        match self.wizard.dispatch(Action::CategoriesChosen(set)) {
                            Ok(()) => self.notice = None,
                            Err(e) => self.notice = Some(e.to_string()),
                        }
                    }
                } else {
                    self.notice = Some("Select at least one category to continue".to_string());
                }
            }
            KeyCode::Esc | KeyCode::Char('q') => self.quit = true,
            _ => {}
        }
    }

    fn on_upload_key(&mut self, key: KeyEvent) -> Option<AnalyzeRequest> {
        if self.wizard.state().loading() {
            return None;
        }
        match key.code {
            KeyCode::Enter => {
                let typed = self.path_input.trim();
                if !typed.is_empty() {
                    let path = parse_dropped(typed).into_iter().next()?;
                    if self.upload.offer_picked(&path).is_ok() {
                        self.path_input.clear();
                    }
                    return None;
                }
                return self.start_analysis();
            }
            KeyCode::Delete => self.upload.clear(),
            KeyCode::Esc => {
                if self.wizard.dispatch(Action::Back).is_ok() {
                    self.notice = None;
                }
            }
            KeyCode::Backspace => {
                self.path_input.pop();
            }
            KeyCode::Char(c) => self.path_input.push(c),
            _ => {}
        }
        None
    }

    fn start_analysis(&mut self) -> Option<AnalyzeRequest> {
        let statement = self.upload.candidate()?.clone();
        if let Err(e) = self.wizard.dispatch(Action::AnalysisStarted) {
            self.notice = Some(e.to_string());
            return None;
        }

        let request_id = self.next_request_id;
        self.next_request_id += 1;
        self.pending = Some(request_id);
        info!(request_id, file = %statement.filename, "analysis started");

        Some(AnalyzeRequest {
            request_id,
            statement,
            categories: self.wizard.state().selected_categories().clone(),
        })
    }

    fn on_results_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.scroll = self.scroll.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => self.scroll = self.scroll.saturating_add(1),
            KeyCode::Char('r') => self.reset(),
            KeyCode::Esc | KeyCode::Char('q') => self.quit = true,
            _ => {}
        }
    }

    fn reset(&mut self) {
        let _ = self.wizard.dispatch(Action::Reset);
        self.selection = CategorySelection::new();
        self.upload.clear();
        self.cursor = 0;
        self.mode = InputMode::Browse;
        self.path_input.clear();
        self.notice = None;
        self.scroll = 0;
        self.pending = None;
    }

    /// Terminals deliver a dropped file as pasted text.
    fn on_paste(&mut self, text: &str) {
        if self.wizard.state().step() != Step::Upload || self.wizard.state().loading() {
            return;
        }
        self.upload.set_drag_hover(true);
        let paths = parse_dropped(text);
        let _ = self.upload.offer_dropped(&paths);
    }

    fn on_event(&mut self, ev: AnalyzeEvent) {
        if self.pending != Some(ev.request_id) {
            debug!(request_id = ev.request_id, "ignoring stale analysis result");
            return;
        }
        self.pending = None;
        if let AnalysisOutcome::Completed = self.wizard.complete_analysis(&mut self.upload, ev.outcome)
        {
            self.scroll = 0;
            self.notice = None;
        }
    }

    fn worker_gone(&mut self) {
        self.pending = None;
        self.wizard.complete_analysis(
            &mut self.upload,
            Err(AnalyzeError::Unreachable("analysis worker stopped".to_string())),
        );
    }
}

/// Paths from pasted/dropped text: one per line, optionally quoted,
/// `file://` URLs and backslash-escaped spaces accepted.
fn parse_dropped(text: &str) -> Vec<PathBuf> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| {
            let l = l
                .strip_prefix('\'')
                .and_then(|s| s.strip_suffix('\''))
                .or_else(|| l.strip_prefix('"').and_then(|s| s.strip_suffix('"')))
                .unwrap_or(l);
            let l = l.strip_prefix("file://").unwrap_or(l);
            PathBuf::from(l.replace("\\ ", " "))
        })
        .collect()
}

pub fn run_wizard(
    server: &str,
    requests: mpsc::UnboundedSender<AnalyzeRequest>,
    events: std::sync::mpsc::Receiver<AnalyzeEvent>,
) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = wizard_loop(&mut terminal, server, &requests, &events);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableBracketedPaste)?;
    terminal.show_cursor()?;

    res
}

fn wizard_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    server: &str,
    requests: &mpsc::UnboundedSender<AnalyzeRequest>,
    events: &std::sync::mpsc::Receiver<AnalyzeEvent>,
) -> Result<()> {
    let mut app = App::new(server);

    loop {
        while let Ok(ev) = events.try_recv() {
            app.on_event(ev);
        }

        app.tick = app.tick.wrapping_add(1);
        terminal.draw(|f| draw(f, &app))?;

        if app.quit {
            break;
        }

        if event::poll(Duration::from_millis(80))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if let Some(req) = app.handle_key(key) {
                        if requests.send(req).is_err() {
                            app.worker_gone();
                        }
                    }
                }
                Event::Paste(text) => app.on_paste(&text),
                _ => {}
            }
        }
    }

    Ok(())
}

fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(8),
            Constraint::Length(3),
        ])
        .split(f.area());

    draw_header(f, chunks[0], app);
    match app.wizard.state().step() {
        Step::SelectCategories => draw_categories(f, chunks[1], app),
        Step::Upload => draw_upload(f, chunks[1], app),
        Step::Results => draw_results(f, chunks[1], app),
    }
    draw_footer(f, chunks[2], app);
}

fn draw_header(f: &mut Frame, area: Rect, app: &App) {
    let current = app.wizard.state().step();
    let mut steps: Vec<Span> = Vec::new();
    for (i, step) in [Step::SelectCategories, Step::Upload, Step::Results]
        .into_iter()
        .enumerate()
    {
        if i > 0 {
            steps.push(Span::styled("  >  ", Style::default().fg(Color::DarkGray)));
        }
        let style = if step == current {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else if step < current {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::Gray)
        };
        steps.push(Span::styled(format!("{} {}", step.number(), step.title()), style));
    }

    let header = Paragraph::new(Text::from(vec![
        Line::from(Span::styled(
            "Spending Spotlight",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )),
        Line::from(steps),
    ]))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::BOTTOM));
    f.render_widget(header, area);
}

fn draw_categories(f: &mut Frame, area: Rect, app: &App) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(area);

    let items: Vec<ListItem> = app
        .selection
        .categories()
        .into_iter()
        .map(|c| {
            let mark = if app.selection.is_selected(&c.id) { "[x]" } else { "[ ]" };
            let mut spans = vec![
                Span::raw(format!("{mark} ")),
                Span::styled(c.label.clone(), Style::default().add_modifier(Modifier::BOLD)),
                Span::styled(format!("  {}", c.description), Style::default().fg(Color::Gray)),
            ];
            if c.is_custom {
                spans.push(Span::styled("  (custom)", Style::default().fg(Color::Magenta)));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("What do you expect to spend on?"),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    let mut state = ListState::default();
    state.select(Some(app.cursor));
    f.render_stateful_widget(list, cols[0], &mut state);

    let selected = app.selection.selected();
    let mut lines = vec![
        Line::from(format!("{} selected", selected.len())),
        Line::raw(""),
    ];
    for id in selected.iter() {
        lines.push(Line::from(format!("- {id}")));
    }
    if app.mode == InputMode::Custom {
        lines.push(Line::raw(""));
        lines.push(Line::from(Span::styled(
            "New category:",
            Style::default().fg(Color::Cyan),
        )));
        lines.push(Line::from(format!("> {}_", app.selection.input)));
    }
    let side = Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::ALL).title("selection"))
        .wrap(Wrap { trim: false });
    f.render_widget(side, cols[1]);
}

fn draw_upload(f: &mut Frame, area: Rect, app: &App) {
    let state = app.wizard.state();
    let mut lines = vec![
        Line::from(format!(
            "Categories: {}",
            state.selected_categories().as_slice().join(", ")
        )),
        Line::raw(""),
    ];

    match app.upload.candidate() {
        Some(c) => lines.push(Line::from(vec![
            Span::styled("Statement: ", Style::default().fg(Color::Green)),
            Span::raw(format!(
                "{} ({:.2} MB)",
                c.filename,
                c.byte_size as f64 / (1024.0 * 1024.0)
            )),
        ])),
        None => lines.push(Line::from(Span::styled(
            "Drop a PDF statement here or type its path (max 16MB)",
            Style::default().fg(Color::Gray),
        ))),
    }

    lines.push(Line::raw(""));
    lines.push(Line::from(format!("Path: {}_", app.path_input)));

    if let Some(err) = app.upload.error() {
        lines.push(Line::raw(""));
        lines.push(Line::from(Span::styled(
            err.to_string(),
            Style::default().fg(Color::Red),
        )));
    }

    if state.loading() {
        lines.push(Line::raw(""));
        lines.push(Line::from(Span::styled(
            format!(
                "{} Analyzing statement via {} ...",
                SPINNER[app.tick % SPINNER.len()],
                app.server
            ),
            Style::default().fg(Color::Yellow),
        )));
    }

    let border = if app.upload.is_drag_hover() {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let body = Paragraph::new(Text::from(lines))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border)
                .title("Upload statement"),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(body, area);
}

fn draw_results(f: &mut Frame, area: Rect, app: &App) {
    let Some(result) = app.wizard.state().results() else {
        return;
    };
    let summary = Summary::of(result);

    let mut lines = vec![Line::from(vec![
        Span::raw(format!("Total: {}   ", summary.total)),
        Span::styled(
            format!("Expected: {}   ", summary.expected),
            Style::default().fg(Color::Green),
        ),
        Span::styled(
            format!("Unexpected: {}", summary.unexpected),
            Style::default().fg(Color::Red),
        ),
    ])];

    if let Some(banner) = summary.banner() {
        lines.push(Line::raw(""));
        lines.push(Line::from(Span::styled(
            banner,
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )));
    }

    for (badge, rows) in grouped_rows(result) {
        let (heading, color) = match badge {
            Badge::Unexpected => ("Unexpected transactions", Color::Red),
            Badge::Expected => ("Expected transactions", Color::Green),
        };
        lines.push(Line::raw(""));
        lines.push(Line::from(Span::styled(
            format!("{heading} ({})", rows.len()),
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for r in rows {
            lines.push(Line::from(vec![
                Span::styled(format!("[{}] ", badge.label()), Style::default().fg(color)),
                Span::raw(r.description.clone()),
            ]));
        }
    }

    let body = Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::ALL).title("Results"))
        .wrap(Wrap { trim: false })
        .scroll((app.scroll, 0));
    f.render_widget(body, area);
}

fn draw_footer(f: &mut Frame, area: Rect, app: &App) {
    let help = match (app.wizard.state().step(), app.mode) {
        (Step::SelectCategories, InputMode::Custom) => "Enter=add  Esc=cancel",
        (Step::SelectCategories, InputMode::Browse) => {
            "Space=toggle  a=add custom  d=remove custom  Enter=continue  q=quit"
        }
        (Step::Upload, _) => "Enter=select path / analyze  Del=clear file  Esc=back  Ctrl-C=quit",
        (Step::Results, _) => "Up/Down=scroll  r=start over  q=quit",
    };

    let mut spans = vec![Span::styled(help, Style::default().fg(Color::Gray))];
    if let Some(n) = &app.notice {
        spans.push(Span::raw("   "));
        spans.push(Span::styled(n.clone(), Style::default().fg(Color::Red)));
    }
    let footer = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::TOP));
    f.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use spotlight_core::{AnalysisResult, TransactionRecord};

    fn press(app: &mut App, code: KeyCode) -> Option<AnalyzeRequest> {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_str(app: &mut App, s: &str) {
        for c in s.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn write_pdf(dir: &std::path::Path) -> PathBuf {
        let p = dir.join("march.pdf");
        std::fs::write(&p, b"%PDF-1.4 test").unwrap();
        p
    }

    #[test]
    fn test_parse_dropped() {
        assert_eq!(
            parse_dropped("'/tmp/My Statement.pdf'\n"),
            vec![PathBuf::from("/tmp/My Statement.pdf")]
        );
        assert_eq!(
            parse_dropped("/tmp/My\\ Statement.pdf"),
            vec![PathBuf::from("/tmp/My Statement.pdf")]
        );
        assert_eq!(
            parse_dropped("file:///tmp/a.pdf\n\n\"/tmp/b.pdf\""),
            vec![PathBuf::from("/tmp/a.pdf"), PathBuf::from("/tmp/b.pdf")]
        );
        assert!(parse_dropped("  \n").is_empty());
    }

    #[test]
    fn test_enter_without_selection_shows_notice() {
        let mut app = App::new("http://localhost:5000");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.wizard.state().step(), Step::SelectCategories);
        assert!(app.notice.is_some());
    }

    #[test]
    fn test_custom_category_duplicate_alert() {
        let mut app = App::new("http://localhost:5000");
        press(&mut app, KeyCode::Char('a'));
        type_str(&mut app, "Groceries");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.notice.as_deref(), Some("Category already exists"));
        assert_eq!(app.mode, InputMode::Custom);

        press(&mut app, KeyCode::Esc);
        press(&mut app, KeyCode::Char('a'));
        type_str(&mut app, "Pet care");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.mode, InputMode::Browse);
        assert!(app.selection.is_selected("pet care"));
        assert_eq!(app.cursor, 10);

        press(&mut app, KeyCode::Char('d'));
        assert!(!app.selection.is_selected("pet care"));
        assert_eq!(app.cursor, 9);
    }

    #[test]
    fn test_full_flow_emits_one_request() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = write_pdf(dir.path());
        let mut app = App::new("http://localhost:5000");

        // groceries is first, dining second
        press(&mut app, KeyCode::Char(' '));
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Char(' '));
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.wizard.state().step(), Step::Upload);

        type_str(&mut app, pdf.to_str().unwrap());
        assert!(press(&mut app, KeyCode::Enter).is_none());
        assert!(app.upload.has_file());
        assert!(app.path_input.is_empty());

        let req = press(&mut app, KeyCode::Enter).expect("analysis request");
        assert_eq!(req.categories.as_slice(), ["groceries", "dining"]);
        assert_eq!(req.statement.filename, "march.pdf");
        assert!(app.wizard.state().loading());

        // A second Enter while loading does nothing.
        assert!(press(&mut app, KeyCode::Enter).is_none());

        app.on_event(AnalyzeEvent {
            request_id: req.request_id,
            outcome: Ok(AnalysisResult {
                total_transactions: 5,
                expected: vec![TransactionRecord::new("Whole Foods")],
                unexpected: vec![TransactionRecord::new("Casino Royale")],
            }),
        });
        assert_eq!(app.wizard.state().step(), Step::Results);
        assert!(!app.wizard.state().loading());

        press(&mut app, KeyCode::Char('r'));
        assert_eq!(app.wizard.state().step(), Step::SelectCategories);
        assert!(app.selection.selected().is_empty());
        assert!(!app.upload.has_file());
    }

    #[test]
    fn test_failed_analysis_keeps_file_for_retry() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = write_pdf(dir.path());
        let mut app = App::new("http://localhost:5000");

        press(&mut app, KeyCode::Char(' '));
        press(&mut app, KeyCode::Enter);
        app.on_paste(&format!("'{}'", pdf.display()));
        assert!(app.upload.has_file());
        assert!(!app.upload.is_drag_hover());

        let req = press(&mut app, KeyCode::Enter).unwrap();
        app.on_event(AnalyzeEvent {
            request_id: req.request_id,
            outcome: Err(AnalyzeError::Server {
                status: 400,
                message: Some("Could not extract text from PDF".to_string()),
            }),
        });

        assert_eq!(app.wizard.state().step(), Step::Upload);
        assert_eq!(app.upload.error(), Some("Could not extract text from PDF"));
        assert!(app.upload.has_file());

        let retry = press(&mut app, KeyCode::Enter).unwrap();
        assert_ne!(retry.request_id, req.request_id);
    }

    #[test]
    fn test_rejected_path_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = write_pdf(dir.path());
        let csv = dir.path().join("export.csv");
        std::fs::write(&csv, "a,b\n").unwrap();
        let mut app = App::new("http://localhost:5000");

        press(&mut app, KeyCode::Char(' '));
        press(&mut app, KeyCode::Enter);
        app.on_paste(&pdf.display().to_string());
        app.on_paste(&csv.display().to_string());

        assert_eq!(app.upload.error(), Some("Please upload a PDF file"));
        assert_eq!(app.upload.candidate().unwrap().filename, "march.pdf");
    }
}
