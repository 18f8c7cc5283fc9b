use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use std::fs;
use std::io;
use std::path::PathBuf;

use transcript_generator::{run, GenerationConfig, OutputType, TranscriptError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    DataFile,
    WriteupsFile,
    OutputType,
    TemplateFile,
    OutputDir,
    Generate,
}

impl Field {
    pub fn label(&self) -> &str {
        match self {
            Field::DataFile => "Data File",
            Field::WriteupsFile => "Writeups File",
            Field::OutputType => "Output Type",
            Field::TemplateFile => "Template File",
            Field::OutputDir => "Output Location",
            Field::Generate => "Generate Transcripts",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct StatusLine {
    pub kind: StatusKind,
    pub text: String,
}

// ============================================================================
// FILE BROWSER
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct BrowserEntry {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
}

/// Directory listing used as a file/directory picker
#[derive(Debug)]
pub struct Browser {
    pub target: Field,
    pub dir: PathBuf,
    pub entries: Vec<BrowserEntry>,
    pub state: TableState,
    /// Only files with this extension are listed; None picks directories
    pub extension: Option<&'static str>,
}

impl Browser {
    pub fn open(target: Field, dir: PathBuf, extension: Option<&'static str>) -> io::Result<Self> {
        let mut browser = Browser {
            target,
            dir,
            entries: Vec::new(),
            state: TableState::default(),
            extension,
        };
        browser.refresh()?;
        Ok(browser)
    }

    pub fn refresh(&mut self) -> io::Result<()> {
        let mut dirs = Vec::new();
        let mut files = Vec::new();

        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }

            if path.is_dir() {
                dirs.push(BrowserEntry { name, path, is_dir: true });
            } else if let Some(ext) = self.extension {
                let matches = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.eq_ignore_ascii_case(ext))
                    .unwrap_or(false);
                if matches {
                    files.push(BrowserEntry { name, path, is_dir: false });
                }
            }
        }

        dirs.sort_by(|a, b| a.name.cmp(&b.name));
        files.sort_by(|a, b| a.name.cmp(&b.name));

        self.entries.clear();
        if let Some(parent) = self.dir.parent() {
            self.entries.push(BrowserEntry {
                name: "..".to_string(),
                path: parent.to_path_buf(),
                is_dir: true,
            });
        }
        self.entries.extend(dirs);
        self.entries.extend(files);

        self.state
            .select(if self.entries.is_empty() { None } else { Some(0) });
        Ok(())
    }

    pub fn selected(&self) -> Option<&BrowserEntry> {
        self.state.selected().and_then(|i| self.entries.get(i))
    }

    pub fn next(&mut self) {
        let len = self.entries.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.entries.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    pub fn picks_directory(&self) -> bool {
        self.extension.is_none()
    }

    /// Enter a directory; returns a file path when a file was chosen
    pub fn activate(&mut self) -> io::Result<Option<PathBuf>> {
        let Some(entry) = self.selected().cloned() else {
            return Ok(None);
        };
        if entry.is_dir {
            self.change_dir(entry.path)?;
            Ok(None)
        } else {
            Ok(Some(entry.path))
        }
    }

    pub fn up(&mut self) -> io::Result<()> {
        match self.dir.parent() {
            Some(parent) => self.change_dir(parent.to_path_buf()),
            None => Ok(()),
        }
    }

    /// List `dir`; on failure the current listing stays as it was
    fn change_dir(&mut self, dir: PathBuf) -> io::Result<()> {
        let previous = std::mem::replace(&mut self.dir, dir);
        if let Err(err) = self.refresh() {
            self.dir = previous;
            return Err(err);
        }
        Ok(())
    }
}

// ============================================================================
// APP STATE
// ============================================================================

pub struct App {
    pub data_path: Option<PathBuf>,
    pub writeups_path: Option<PathBuf>,
    pub output_type: OutputType,
    pub template_path: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub form_state: TableState,
    pub browser: Option<Browser>,
    pub status: Vec<StatusLine>,
    start_dir: PathBuf,
}

impl App {
    pub fn new(start_dir: PathBuf) -> Self {
        let mut form_state = TableState::default();
        form_state.select(Some(0));

        Self {
            data_path: None,
            writeups_path: None,
            output_type: OutputType::Csv,
            template_path: None,
            output_dir: None,
            form_state,
            browser: None,
            status: vec![StatusLine {
                kind: StatusKind::Info,
                text: "Select the data and writeups files, then Generate.".to_string(),
            }],
            start_dir,
        }
    }

    /// Template row only shows for DOCX output
    pub fn visible_fields(&self) -> Vec<Field> {
        let mut fields = vec![Field::DataFile, Field::WriteupsFile, Field::OutputType];
        if self.output_type == OutputType::Docx {
            fields.push(Field::TemplateFile);
        }
        fields.push(Field::OutputDir);
        fields.push(Field::Generate);
        fields
    }

    pub fn selected_field(&self) -> Field {
        let fields = self.visible_fields();
        let i = self.form_state.selected().unwrap_or(0).min(fields.len() - 1);
        fields[i]
    }

    pub fn next(&mut self) {
        let len = self.visible_fields().len();
        let i = match self.form_state.selected() {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.form_state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.visible_fields().len();
        let i = match self.form_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.form_state.select(Some(i));
    }

    pub fn toggle_output_type(&mut self) {
        let field = self.selected_field();
        self.output_type = match self.output_type {
            OutputType::Csv => OutputType::Docx,
            OutputType::Docx => OutputType::Csv,
        };
        // Keep the cursor on the same field when the template row appears/disappears
        if let Some(i) = self.visible_fields().iter().position(|f| *f == field) {
            self.form_state.select(Some(i));
        }
    }

    pub fn value_of(&self, field: Field) -> String {
        let show = |p: &Option<PathBuf>| {
            p.as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(not selected)".to_string())
        };
        match field {
            Field::DataFile => show(&self.data_path),
            Field::WriteupsFile => show(&self.writeups_path),
            Field::OutputType => match self.output_type {
                OutputType::Csv => "CSV File".to_string(),
                OutputType::Docx => "DOCX Files".to_string(),
            },
            Field::TemplateFile => show(&self.template_path),
            Field::OutputDir => self
                .output_dir
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(default)".to_string()),
            Field::Generate => "[ Enter ]".to_string(),
        }
    }

    /// Enter on the selected field
    pub fn activate(&mut self) {
        match self.selected_field() {
            Field::DataFile | Field::WriteupsFile => self.open_browser(Some("csv")),
            Field::TemplateFile => self.open_browser(Some("docx")),
            Field::OutputDir => self.open_browser(None),
            Field::OutputType => self.toggle_output_type(),
            Field::Generate => self.generate(),
        }
    }

    fn open_browser(&mut self, extension: Option<&'static str>) {
        let target = self.selected_field();
        let current = match target {
            Field::DataFile => self.data_path.as_deref(),
            Field::WriteupsFile => self.writeups_path.as_deref(),
            Field::TemplateFile => self.template_path.as_deref(),
            Field::OutputDir => self.output_dir.as_deref(),
            _ => None,
        };
        let dir = current
            .and_then(|p| if p.is_dir() { Some(p) } else { p.parent() })
            .filter(|p| p.is_dir())
            .unwrap_or(self.start_dir.as_path())
            .to_path_buf();

        match Browser::open(target, dir, extension) {
            Ok(browser) => self.browser = Some(browser),
            Err(e) => self.set_status(StatusKind::Error, format!("Cannot list directory: {}", e)),
        }
    }

    /// Store a picked path in the field the browser was opened for
    pub fn pick(&mut self, target: Field, path: PathBuf) {
        match target {
            Field::DataFile => self.data_path = Some(path),
            Field::WriteupsFile => self.writeups_path = Some(path),
            Field::TemplateFile => self.template_path = Some(path),
            Field::OutputDir => self.output_dir = Some(path),
            _ => {}
        }
        self.browser = None;
    }

    /// Enter on the browser row: descend, or take the file
    pub fn browser_activate(&mut self) {
        let Some(browser) = self.browser.as_mut() else {
            return;
        };
        match browser.activate() {
            Ok(Some(path)) => {
                let target = browser.target;
                self.pick(target, path);
            }
            Ok(None) => {}
            Err(e) => self.set_status(StatusKind::Error, format!("Cannot open directory: {}", e)),
        }
    }

    pub fn browser_up(&mut self) {
        let Some(browser) = self.browser.as_mut() else {
            return;
        };
        if let Err(e) = browser.up() {
            self.set_status(StatusKind::Error, format!("Cannot open directory: {}", e));
        }
    }

    /// Take the browsed directory itself (output location only)
    pub fn browser_use_dir(&mut self) {
        let Some(browser) = self.browser.as_ref() else {
            return;
        };
        if browser.picks_directory() {
            let (target, dir) = (browser.target, browser.dir.clone());
            self.pick(target, dir);
        }
    }

    fn set_status(&mut self, kind: StatusKind, text: impl Into<String>) {
        self.status = vec![StatusLine {
            kind,
            text: text.into(),
        }];
    }

    /// Same checks as the command surface, then the pipeline
    pub fn build_config(&self) -> std::result::Result<GenerationConfig, String> {
        let (Some(data), Some(writeups)) = (&self.data_path, &self.writeups_path) else {
            return Err("Please select both data and writeups file".to_string());
        };

        let mut config = GenerationConfig::new(data, writeups);
        if self.output_type == OutputType::Docx {
            let Some(template) = &self.template_path else {
                return Err("Please select a template file for DOCX output".to_string());
            };
            config = config.with_docx_template(template);
        }
        if let Some(dir) = &self.output_dir {
            config = config.with_output_dir(dir);
        }
        Ok(config)
    }

    pub fn generate(&mut self) {
        let config = match self.build_config() {
            Ok(config) => config,
            Err(message) => {
                self.set_status(StatusKind::Error, message);
                return;
            }
        };

        match run(&config) {
            Ok(summary) => {
                let mut lines = vec![StatusLine {
                    kind: StatusKind::Success,
                    text: format!("✓ {}", summary.summary()),
                }];
                lines.extend(summary.warnings.iter().map(|w| StatusLine {
                    kind: StatusKind::Warning,
                    text: w.to_string(),
                }));
                self.status = lines;
            }
            Err(TranscriptError::Validation(report)) => {
                self.status = report
                    .errors()
                    .map(|issue| StatusLine {
                        kind: StatusKind::Error,
                        text: issue.to_string(),
                    })
                    .collect();
            }
            Err(err) => self.set_status(StatusKind::Error, format!("An error occurred: {}", err)),
        }
    }
}

// ============================================================================
// TERMINAL LOOP
// ============================================================================

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if let Some(browser) = app.browser.as_mut() {
            match key.code {
                KeyCode::Esc => app.browser = None,
                KeyCode::Down | KeyCode::Char('j') => browser.next(),
                KeyCode::Up | KeyCode::Char('k') => browser.previous(),
                KeyCode::Backspace | KeyCode::Left => app.browser_up(),
                KeyCode::Enter | KeyCode::Right => app.browser_activate(),
                KeyCode::Char('s') => app.browser_use_dir(),
                _ => {}
            }
            continue;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
            KeyCode::Down | KeyCode::Char('j') | KeyCode::Tab => app.next(),
            KeyCode::Up | KeyCode::Char('k') | KeyCode::BackTab => app.previous(),
            KeyCode::Char(' ') if app.selected_field() == Field::OutputType => {
                app.toggle_output_type()
            }
            KeyCode::Char('g') => app.generate(),
            KeyCode::Enter => app.activate(),
            _ => {}
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(8),    // Form or browser
            Constraint::Length(8), // Status panel
            Constraint::Length(3), // Key help
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    if app.browser.is_some() {
        render_browser(f, chunks[1], app);
    } else {
        render_form(f, chunks[1], app);
    }

    render_status(f, chunks[2], app);
    render_help(f, chunks[3], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let spans = vec![
        Span::styled(
            "Transcript Generator",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  |  "),
        Span::styled(
            format!("Output: {}", app.output_type),
            Style::default().fg(Color::Cyan),
        ),
    ];

    let header = Paragraph::new(vec![Line::from(spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_form(f: &mut Frame, area: Rect, app: &mut App) {
    let rows: Vec<Row> = app.visible_fields().into_iter().map(|field| {
        let style = if field == Field::Generate {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        Row::new(vec![
            Cell::from(field.label().to_string()).style(style),
            Cell::from(app.value_of(field)),
        ])
        .height(1)
    }).collect();

    let table = Table::new(rows, [Constraint::Length(22), Constraint::Min(20)])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(" Input Files & Options "),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.form_state);
}

fn render_browser(f: &mut Frame, area: Rect, app: &mut App) {
    let Some(browser) = app.browser.as_mut() else {
        return;
    };

    let rows: Vec<Row> = browser.entries.iter().map(|entry| {
        let (marker, color) = if entry.is_dir {
            ("/", Color::Cyan)
        } else {
            ("", Color::White)
        };
        Row::new(vec![Cell::from(format!("{}{}", entry.name, marker))
            .style(Style::default().fg(color))])
        .height(1)
    }).collect();

    let title = format!(" {}: {} ", browser.target.label(), browser.dir.display());
    let table = Table::new(rows, [Constraint::Min(20)])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow))
                .title(title),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut browser.state);
}

fn render_status(f: &mut Frame, area: Rect, app: &App) {
    let lines: Vec<Line> = app
        .status
        .iter()
        .map(|line| {
            let color = match line.kind {
                StatusKind::Info => Color::White,
                StatusKind::Success => Color::Green,
                StatusKind::Warning => Color::Yellow,
                StatusKind::Error => Color::Red,
            };
            Line::from(Span::styled(line.text.clone(), Style::default().fg(color)))
        })
        .collect();

    let status = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(" Status "),
        );

    f.render_widget(status, area);
}

fn render_help(f: &mut Frame, area: Rect, app: &App) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Yellow));

    let spans = match &app.browser {
        Some(browser) => {
            let mut spans = vec![
                key("↑/↓"),
                Span::raw(" Nav | "),
                key("Enter"),
                Span::raw(" Open/Pick | "),
                key("Backspace"),
                Span::raw(" Up | "),
            ];
            if browser.picks_directory() {
                spans.push(key("s"));
                spans.push(Span::raw(" Use this folder | "));
            }
            spans.push(Span::styled("Esc", Style::default().fg(Color::Red)));
            spans.push(Span::raw(" Cancel"));
            spans
        }
        None => vec![
            key("↑/↓"),
            Span::raw(" Field | "),
            key("Enter"),
            Span::raw(" Browse/Toggle | "),
            key("g"),
            Span::raw(" Generate | "),
            Span::styled("q", Style::default().fg(Color::Red)),
            Span::raw(" Quit"),
        ],
    };

    let help = Paragraph::new(vec![Line::from(spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(help, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_field_follows_output_type() {
        let mut app = App::new(PathBuf::from("."));
        assert!(!app.visible_fields().contains(&Field::TemplateFile));

        app.form_state.select(Some(2));
        app.toggle_output_type();

        assert_eq!(app.output_type, OutputType::Docx);
        assert!(app.visible_fields().contains(&Field::TemplateFile));
        assert_eq!(app.selected_field(), Field::OutputType);
    }

    #[test]
    fn test_build_config_requires_inputs() {
        let mut app = App::new(PathBuf::from("."));
        assert!(app.build_config().is_err());

        app.pick(Field::DataFile, PathBuf::from("data.csv"));
        app.pick(Field::WriteupsFile, PathBuf::from("writeups.csv"));
        assert!(app.build_config().is_ok());

        app.toggle_output_type();
        assert!(app.build_config().is_err());

        app.pick(Field::TemplateFile, PathBuf::from("template.docx"));
        let config = app.build_config().unwrap();
        assert_eq!(config.output_type, OutputType::Docx);
    }

    #[test]
    fn test_browser_filters_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("people.csv"), "name\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let browser = Browser::open(Field::DataFile, dir.path().to_path_buf(), Some("csv")).unwrap();
        let names: Vec<_> = browser.entries.iter().map(|e| e.name.as_str()).collect();

        assert_eq!(names, vec!["..", "sub", "people.csv"]);
    }

    #[test]
    fn test_unreadable_directory_keeps_form_open() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("gone")).unwrap();
        let mut app = App::new(dir.path().to_path_buf());
        app.form_state.select(Some(0));
        app.activate();

        // Listed, then removed before it is entered
        app.browser.as_mut().unwrap().next();
        fs::remove_dir(dir.path().join("gone")).unwrap();
        app.browser_activate();

        let browser = app.browser.as_ref().unwrap();
        assert_eq!(browser.dir, dir.path());
        assert_eq!(app.status[0].kind, StatusKind::Error);
        assert!(app.status[0].text.contains("Cannot open directory"));
    }

    #[test]
    fn test_use_dir_only_for_output_location() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = App::new(dir.path().to_path_buf());

        app.activate(); // data file browser
        app.browser_use_dir();
        assert!(app.browser.is_some());
        assert_eq!(app.data_path, None);

        app.browser = None;
        app.form_state.select(Some(3)); // output location (csv layout)
        app.activate();
        app.browser_use_dir();
        assert!(app.browser.is_none());
        assert_eq!(app.output_dir, Some(dir.path().to_path_buf()));
    }

    #[test]
    fn test_browser_descend_and_pick() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("w.csv"), "accolade,writeup\n").unwrap();

        let mut browser =
            Browser::open(Field::WriteupsFile, dir.path().to_path_buf(), Some("csv")).unwrap();
        browser.next(); // "sub"
        assert_eq!(browser.activate().unwrap(), None);
        assert_eq!(browser.dir, dir.path().join("sub"));

        browser.next(); // "w.csv"
        let picked = browser.activate().unwrap();
        assert_eq!(picked, Some(dir.path().join("sub").join("w.csv")));
    }
}
