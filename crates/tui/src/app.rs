use std::{io, path::PathBuf, thread, time::Duration};

use anyhow::{Context, Result};
use cardforge_core::{
    custom,
    overlay::{OverlayState, OVERLAY_ID},
    surface::{CARD_ROOT, CARD_CONTENT},
    AppConfig, CardError, CardSurface, CardType, Composer, ExportWriter, ImageSlot, MaskChoice,
    MemorySurface, Stage,
};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

const TICK_RATE: Duration = Duration::from_millis(250);
const STATUS_TICKS: u32 = 24;
const MAX_PATH_LEN: usize = 512;

/// Style properties shown for each layer in the preview.
const PREVIEW_PROPERTIES: [&str; 4] = ["background-image", "clip-path", "mask-image", "mask-size"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Type,
    Stage,
    Set,
    DualType,
    SecondType,
    DualSet,
    Mask,
}

impl Field {
    const ALL: [Field; 7] = [
        Field::Type,
        Field::Stage,
        Field::Set,
        Field::DualType,
        Field::SecondType,
        Field::DualSet,
        Field::Mask,
    ];

    fn label(self) -> &'static str {
        match self {
            Field::Type => "Type",
            Field::Stage => "Stage",
            Field::Set => "Set",
            Field::DualType => "Dual type",
            Field::SecondType => "Second type",
            Field::DualSet => "Dual set",
            Field::Mask => "Mask",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PromptTarget {
    Artwork,
    Background,
}

impl PromptTarget {
    fn slot(self) -> ImageSlot {
        match self {
            PromptTarget::Artwork => ImageSlot::Artwork,
            PromptTarget::Background => ImageSlot::Background,
        }
    }

    fn title(self) -> &'static str {
        match self {
            PromptTarget::Artwork => "Custom artwork",
            PromptTarget::Background => "Custom background",
        }
    }
}

#[derive(Debug, Clone)]
struct PathPrompt {
    input: String,
    cursor: usize,
    target: PromptTarget,
}

impl PathPrompt {
    fn new(target: PromptTarget) -> Self {
        Self {
            input: String::new(),
            cursor: 0,
            target,
        }
    }

    fn move_cursor(&mut self, delta: isize) {
        let len = self.input.len() as isize;
        self.cursor = (self.cursor as isize + delta).clamp(0, len) as usize;
    }

    fn insert(&mut self, ch: char) {
        if self.input.len() >= MAX_PATH_LEN {
            return;
        }
        if ch.is_ascii() && !ch.is_ascii_control() {
            self.input.insert(self.cursor, ch);
            self.cursor += 1;
        }
    }

    fn backspace(&mut self) {
        if self.cursor > 0 && self.cursor <= self.input.len() {
            self.cursor -= 1;
            self.input.remove(self.cursor);
        }
    }

    fn delete(&mut self) {
        if self.cursor < self.input.len() {
            self.input.remove(self.cursor);
        }
    }

    fn path(&self) -> Option<PathBuf> {
        let trimmed = self.input.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(PathBuf::from(trimmed))
        }
    }
}

enum AppEvent {
    Input(Event),
    Tick,
}

/// Terminal front end driving a [`Composer`] over an in-memory card.
pub struct CardForgeApp {
    config: AppConfig,
    composer: Composer<MemorySurface>,
    exporter: ExportWriter,
    set_keys: Vec<String>,
    masks: Vec<MaskChoice>,
    cursor: usize,
    status: String,
    status_age: u32,
    warnings: Vec<String>,
    prompt: Option<PathPrompt>,
    should_quit: bool,
}

impl CardForgeApp {
    pub fn new(config: AppConfig, composer: Composer<MemorySurface>, exporter: ExportWriter) -> Self {
        let set_keys = composer.resolver().set_keys();
        let mut masks: Vec<MaskChoice> = config
            .masks
            .iter()
            .map(|id| MaskChoice::from_id(id))
            .collect();
        if !masks.contains(&MaskChoice::Default) {
            masks.insert(0, MaskChoice::Default);
        }

        Self {
            config,
            composer,
            exporter,
            set_keys,
            masks,
            cursor: 0,
            status: "Ready".to_string(),
            status_age: 0,
            warnings: Vec::new(),
            prompt: None,
            should_quit: false,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let warnings = self.composer.refresh();
        let message = format!(
            "Loaded {} sets • exports go to {}",
            self.set_keys.len(),
            self.exporter.root().display()
        );
        self.report(warnings, message);

        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx);

        let result = loop {
            if let Err(err) = terminal.draw(|frame| self.draw(frame)) {
                break Err(err.into());
            }
            if self.should_quit {
                break Ok(());
            }

            match event_rx.recv().await {
                Some(AppEvent::Input(event)) => {
                    if let Err(err) = self.handle_input(event) {
                        error!("Input handling failed: {err:#}");
                        self.set_status(format!("Error: {err}"));
                    }
                }
                Some(AppEvent::Tick) => self.handle_tick(),
                None => break Ok(()),
            }
        };

        restore_terminal(&mut terminal)?;
        result
    }

    fn handle_tick(&mut self) {
        self.status_age = self.status_age.saturating_add(1);
        if self.status_age == STATUS_TICKS && self.warnings.is_empty() {
            self.status = "Ready".to_string();
        }
    }

    fn set_status(&mut self, message: String) {
        self.status = message;
        self.status_age = 0;
    }

    /// Show `message`, or the first warning next to it when there is one.
    fn report(&mut self, warnings: Vec<CardError>, message: String) {
        self.warnings = warnings.iter().map(ToString::to_string).collect();
        match self.warnings.first() {
            Some(first) => {
                let status = format!("{message} • Warning: {first}");
                self.set_status(status);
            }
            None => self.set_status(message),
        }
    }

    fn handle_input(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if self.prompt.is_some() {
                    self.handle_prompt_key(key)
                } else {
                    self.handle_key(key)
                }
            }
            _ => Ok(()),
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return Ok(());
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Up | KeyCode::Char('k') => self.move_cursor(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor(1),
            KeyCode::Left | KeyCode::Char('h') => self.cycle(-1),
            KeyCode::Right | KeyCode::Char('l') | KeyCode::Enter => self.cycle(1),
            KeyCode::Char(' ') => {
                let warnings = self.composer.toggle_dual_type();
                let state = if self.composer.selection().is_dual_type {
                    "on"
                } else {
                    "off"
                };
                self.report(warnings, format!("Dual type {state}"));
            }
            KeyCode::Char('i') => self.prompt = Some(PathPrompt::new(PromptTarget::Artwork)),
            KeyCode::Char('b') => self.prompt = Some(PathPrompt::new(PromptTarget::Background)),
            KeyCode::Char('x') => {
                let mut warnings = self.composer.clear_custom_image(ImageSlot::Artwork);
                warnings.extend(self.composer.clear_custom_image(ImageSlot::Background));
                self.report(warnings, "Custom images cleared".to_string());
            }
            KeyCode::Char('e') => self.export()?,
            KeyCode::Char('o') => self.open_latest_export()?,
            KeyCode::Char('r') => self.reload()?,
            _ => {}
        }
        Ok(())
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) -> Result<()> {
        let Some(prompt) = self.prompt.as_mut() else {
            return Ok(());
        };

        match key.code {
            KeyCode::Esc => self.prompt = None,
            KeyCode::Enter => {
                let target = prompt.target;
                let path = prompt.path();
                self.prompt = None;
                if let Some(path) = path {
                    self.load_custom_image(target, path);
                }
            }
            KeyCode::Left => prompt.move_cursor(-1),
            KeyCode::Right => prompt.move_cursor(1),
            KeyCode::Home => prompt.cursor = 0,
            KeyCode::End => prompt.cursor = prompt.input.len(),
            KeyCode::Backspace => prompt.backspace(),
            KeyCode::Delete => prompt.delete(),
            KeyCode::Char(ch) => prompt.insert(ch),
            _ => {}
        }
        Ok(())
    }

    fn load_custom_image(&mut self, target: PromptTarget, path: PathBuf) {
        match custom::load_image(&path) {
            Ok(image) => {
                let warnings = self.composer.set_custom_image(target.slot(), image);
                let message = format!("{} loaded from {}", target.title(), path.display());
                self.report(warnings, message);
            }
            Err(err) => {
                error!("Custom image rejected: {err:#}");
                self.set_status(format!("Could not load {}: {err}", path.display()));
            }
        }
    }

    fn export(&mut self) -> Result<()> {
        let (composition, warnings) = self.composer.prepare_export();
        let entry = self.exporter.write(&composition)?;
        let saved = self.exporter.entries()?.len();
        self.report(
            warnings,
            format!("Exported {} ({saved} saved)", entry.path.display()),
        );
        Ok(())
    }

    fn open_latest_export(&mut self) -> Result<()> {
        let Some(latest) = self.exporter.entries()?.into_iter().next() else {
            self.set_status(format!(
                "No exports in {}",
                self.exporter.root().display()
            ));
            return Ok(());
        };
        let composition = self.exporter.load(&latest.path)?;
        info!("Reopening export {}", latest.path.display());
        let warnings = self.composer.restore(composition.selection);
        self.report(warnings, format!("Opened {}", latest.path.display()));
        Ok(())
    }

    fn reload(&mut self) -> Result<()> {
        let registry = self.config.load_registry()?;
        let manifest = self.config.rescan_manifest(&registry)?;
        info!(
            "Reloaded {} sets and {} manifest images",
            registry.len(),
            manifest.len()
        );
        self.composer.resolver().refresh(registry, manifest);
        self.set_keys = self.composer.resolver().set_keys();
        let warnings = self.composer.refresh();
        let message = format!("Reloaded {} sets", self.set_keys.len());
        self.report(warnings, message);
        Ok(())
    }

    fn move_cursor(&mut self, delta: isize) {
        let len = Field::ALL.len() as isize;
        self.cursor = (self.cursor as isize + delta).rem_euclid(len) as usize;
    }

    fn current_field(&self) -> Field {
        Field::ALL[self.cursor]
    }

    fn cycle(&mut self, delta: isize) {
        let field = self.current_field();
        let selection = self.composer.selection().clone();
        debug!("Cycling {:?} by {delta}", field);

        let warnings = match field {
            Field::Type => {
                let next = step(&CardType::ALL, &selection.current_type, delta);
                self.composer.select_type(next)
            }
            Field::Stage => {
                let next = step(&Stage::ALL, &selection.current_stage, delta);
                self.composer.select_stage(next)
            }
            Field::Set => {
                let next = step(&self.set_keys, &selection.current_set, delta);
                self.composer.select_set(next)
            }
            Field::DualType => self.composer.toggle_dual_type(),
            Field::SecondType => {
                let options: Vec<Option<CardType>> = std::iter::once(None)
                    .chain(CardType::ALL.into_iter().map(Some))
                    .collect();
                let next = step(&options, &selection.second_type, delta);
                self.composer.select_second_type(next)
            }
            Field::DualSet => {
                let next = step(&self.set_keys, &selection.dual_type_set, delta);
                self.composer.select_dual_set(next)
            }
            Field::Mask => {
                let next = step(&self.masks, &selection.current_mask, delta);
                self.composer.select_mask(next)
            }
        };

        let message = format!("{}: {}", field.label(), self.field_value(field));
        self.report(warnings, message);
    }

    fn field_value(&self, field: Field) -> String {
        let selection = self.composer.selection();
        match field {
            Field::Type => selection.current_type.capitalized(),
            Field::Stage => selection.current_stage.label().to_string(),
            Field::Set => selection.current_set.clone(),
            Field::DualType => (if selection.is_dual_type { "on" } else { "off" }).to_string(),
            Field::SecondType => selection
                .second_type
                .map(CardType::capitalized)
                .unwrap_or_else(|| "none".to_string()),
            Field::DualSet => selection.dual_type_set.clone(),
            Field::Mask => selection.current_mask.to_string(),
        }
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.size();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(10),
                Constraint::Length(3),
            ])
            .split(area);

        self.render_title(frame, chunks[0]);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(38), Constraint::Min(30)])
            .split(chunks[1]);
        self.render_selection(frame, body[0]);
        self.render_layers(frame, body[1]);
        self.render_status(frame, chunks[2]);

        if let Some(prompt) = self.prompt.as_ref() {
            render_prompt(frame, prompt);
        }
    }

    fn render_title(&self, frame: &mut Frame, area: Rect) {
        let selection = self.composer.selection();
        let mut spans = vec![
            Span::styled(
                "Card Forge",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::raw(format!(
                "{} {}",
                selection.current_type.capitalized(),
                selection.current_stage.label()
            )),
        ];
        if let Some(second) = selection.overlay_type() {
            spans.push(Span::styled(
                format!(" / {}", second.capitalized()),
                Style::default().fg(Color::Yellow),
            ));
        }

        let paragraph = Paragraph::new(Line::from(spans))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(paragraph, area);
    }

    fn render_selection(&self, frame: &mut Frame, area: Rect) {
        let items: Vec<ListItem> = Field::ALL
            .iter()
            .map(|field| {
                let dimmed = matches!(field, Field::SecondType | Field::DualSet | Field::Mask)
                    && !self.composer.selection().is_dual_type;
                let value_style = if dimmed {
                    Style::default().fg(Color::DarkGray)
                } else {
                    Style::default().fg(Color::White)
                };
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("{:<12}", field.label()),
                        Style::default().fg(Color::Gray),
                    ),
                    Span::styled(self.field_value(*field), value_style),
                ]))
            })
            .collect();

        let mut state = ListState::default();
        state.select(Some(self.cursor));

        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title("Selection"))
            .highlight_style(
                Style::default()
                    .bg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("› ");
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn render_layers(&self, frame: &mut Frame, area: Rect) {
        let surface = self.composer.surface();
        let mut children = surface.children(CARD_ROOT);
        children.sort_by_key(|id| {
            surface
                .style(id, "z-index")
                .and_then(|value| value.parse::<i32>().ok())
                .unwrap_or(i32::MIN)
        });

        let mut lines = vec![Line::from(vec![
            Span::styled("card ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(surface.classes(CARD_ROOT).join(" ")),
        ])];

        for id in children.iter().rev() {
            let z = surface
                .style(id, "z-index")
                .unwrap_or_else(|| "-".to_string());
            let color = if id == OVERLAY_ID {
                Color::Yellow
            } else if CARD_CONTENT.contains(&id.as_str()) {
                Color::Gray
            } else {
                Color::Cyan
            };
            lines.push(Line::from(vec![
                Span::styled(format!("[z {z:>2}] "), Style::default().fg(Color::DarkGray)),
                Span::styled(id.clone(), Style::default().fg(color)),
            ]));

            for property in PREVIEW_PROPERTIES {
                if let Some(value) = surface.style(id, property) {
                    if value == "none" {
                        continue;
                    }
                    lines.push(Line::from(format!(
                        "         {property}: {}",
                        shorten(&value, 60)
                    )));
                }
            }
        }

        let overlay = match self.composer.compositor().state() {
            OverlayState::Absent => "overlay absent".to_string(),
            OverlayState::Present(layer) => format!(
                "overlay {} from {}",
                layer.card_type.capitalized(),
                layer.set_key
            ),
        };
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            overlay,
            Style::default().fg(Color::DarkGray),
        )));

        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Layers"))
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let style = if self.warnings.is_empty() {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::Yellow)
        };
        let help =
            "↑↓ field  ←→ value  space dual  i/b image  x clear  e export  o open  r reload  q quit";
        let paragraph = Paragraph::new(vec![
            Line::from(Span::styled(self.status.clone(), style)),
            Line::from(Span::styled(help, Style::default().fg(Color::DarkGray))),
        ]);
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(paragraph.block(block), area);
    }
}

fn render_prompt(frame: &mut Frame, prompt: &PathPrompt) {
    let area = centered_rect(60, 5, frame.size());
    frame.render_widget(Clear, area);

    let (before, after) = prompt.input.split_at(prompt.cursor.min(prompt.input.len()));
    let line = Line::from(vec![
        Span::raw(before.to_string()),
        Span::styled("▏", Style::default().fg(Color::Cyan)),
        Span::raw(after.to_string()),
    ]);
    let paragraph = Paragraph::new(vec![
        line,
        Line::from(Span::styled(
            "Enter to load • Esc to cancel",
            Style::default().fg(Color::DarkGray),
        )),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("{} path", prompt.target.title())),
    );
    frame.render_widget(paragraph, area);
}

fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
    let width = area.width * percent_x / 100;
    Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height: height.min(area.height),
    }
}

/// Value `delta` steps away from `current`, wrapping at both ends.
fn step<T: Clone + PartialEq>(options: &[T], current: &T, delta: isize) -> T {
    if options.is_empty() {
        return current.clone();
    }
    let len = options.len() as isize;
    let index = options
        .iter()
        .position(|option| option == current)
        .map(|index| index as isize)
        .unwrap_or(-1);
    let next = (index + delta).rem_euclid(len) as usize;
    options[next].clone()
}

fn shorten(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let head: String = value.chars().take(limit.saturating_sub(1)).collect();
    format!("{head}…")
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardforge_core::{SelectionState, SetResolver};
    use tempfile::tempdir;

    fn app(
        surface: MemorySurface,
        selection: SelectionState,
        exports: &std::path::Path,
    ) -> CardForgeApp {
        let composer = Composer::with_selection(SetResolver::default(), surface, selection);
        CardForgeApp::new(AppConfig::default(), composer, ExportWriter::new(exports))
    }

    fn press(app: &mut CardForgeApp, code: KeyCode) -> Result<()> {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn warnings_stay_on_status_line() -> Result<()> {
        let dir = tempdir()?;
        let selection = SelectionState {
            second_type: Some(CardType::Water),
            ..SelectionState::default()
        };
        let mut app = app(MemorySurface::empty(), selection, dir.path());

        press(&mut app, KeyCode::Char(' '))?;
        assert!(app.status.starts_with("Dual type on"), "{}", app.status);
        assert!(app.status.contains("Warning"), "{}", app.status);
        assert!(!app.warnings.is_empty());
        Ok(())
    }

    #[test]
    fn latest_export_can_be_reopened() -> Result<()> {
        let dir = tempdir()?;
        let mut app = app(MemorySurface::card(), SelectionState::default(), dir.path());
        app.composer.refresh();

        press(&mut app, KeyCode::Char('o'))?;
        assert!(app.status.starts_with("No exports"));

        app.composer.select_type(CardType::Dragon);
        press(&mut app, KeyCode::Char('e'))?;
        assert!(app.status.contains("(1 saved)"), "{}", app.status);

        app.composer.select_type(CardType::Fire);
        press(&mut app, KeyCode::Char('o'))?;
        assert_eq!(app.composer.selection().current_type, CardType::Dragon);
        assert!(app.warnings.is_empty());
        Ok(())
    }

    #[test]
    fn step_wraps_in_both_directions() {
        let options = ["a", "b", "c"];
        assert_eq!(step(&options, &"a", -1), "c");
        assert_eq!(step(&options, &"c", 1), "a");
        assert_eq!(step(&options, &"missing", 1), "a");
    }

    #[test]
    fn prompt_edits_at_cursor() {
        let mut prompt = PathPrompt::new(PromptTarget::Artwork);
        for ch in "art.png".chars() {
            prompt.insert(ch);
        }
        prompt.move_cursor(-4);
        prompt.backspace();
        assert_eq!(prompt.input, "ar.png");
        prompt.delete();
        assert_eq!(prompt.path(), Some(PathBuf::from("arpng")));
    }

    #[test]
    fn shorten_marks_truncation() {
        assert_eq!(shorten("abcdef", 4), "abc…");
        assert_eq!(shorten("abc", 4), "abc");
    }
}
