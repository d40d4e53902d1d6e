// Headless terminal wizard (crossterm + ratatui).
//
// The loop owns the `WizardEngine`. Reference loading, image scans and submissions run as tokio
// tasks on the runtime handle passed to `run`; their results come back as `UiMsg` over a std
// channel and are applied by `drain_messages` before each frame.

use anyhow::{bail, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use log::{info, warn};
use ratatui::backend::{Backend, CrosstermBackend, TestBackend};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Terminal;
use std::future::Future;
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;

use crate::api::reference::BuiltinReferenceData;
use crate::error::DataLoadError;
use crate::models::requests::{ReferenceData, ReferenceItem};
use crate::models::responses::SubmitOutcome;
use crate::models::state::{
    FieldName, RecordShape, ReferenceStatus, Step, SubmissionStatus, NEW_REFERENCE_SENTINEL,
};
use crate::notify::{NotificationChannel, Notifier, Severity};
use crate::scan::ScanResult;
use crate::services::Services;
use crate::settings::Settings;
use crate::wizard::gates::step_gate;
use crate::wizard::{
    GateOutcome, PendingSubmission, ReferenceLoadTicket, ScanTicket, SubmitDisposition,
    WizardEngine,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ButtonFocus {
    Back,
    Next,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FocusTarget {
    List,
    NewReference,
    Field(FieldName),
    Button(ButtonFocus),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Modal {
    ImagePath,
}

#[derive(Debug, Clone, Default)]
struct TextInput {
    value: String,
    /// Cursor position in chars.
    cursor: usize,
}

impl TextInput {
    fn set(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.cursor = self.value.chars().count();
    }

    fn byte_index(&self, cursor: usize) -> usize {
        self.value
            .char_indices()
            .nth(cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    fn display(&self, focused: bool) -> String {
        if !focused {
            return self.value.clone();
        }
        let idx = self.byte_index(self.cursor);
        format!("{}|{}", &self.value[..idx], &self.value[idx..])
    }

    /// Returns `(consumed, changed)`.
    fn handle_key(&mut self, code: KeyCode) -> (bool, bool) {
        let len = self.value.chars().count();
        match code {
            KeyCode::Char(c) => {
                let idx = self.byte_index(self.cursor);
                self.value.insert(idx, c);
                self.cursor += 1;
                (true, true)
            }
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    let idx = self.byte_index(self.cursor - 1);
                    self.value.remove(idx);
                    self.cursor -= 1;
                    return (true, true);
                }
                (true, false)
            }
            KeyCode::Delete => {
                if self.cursor < len {
                    let idx = self.byte_index(self.cursor);
                    self.value.remove(idx);
                    return (true, true);
                }
                (true, false)
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                (true, false)
            }
            KeyCode::Right => {
                self.cursor = (self.cursor + 1).min(len);
                (true, false)
            }
            KeyCode::Home => {
                self.cursor = 0;
                (true, false)
            }
            KeyCode::End => {
                self.cursor = len;
                (true, false)
            }
            _ => (false, false),
        }
    }
}

#[derive(Debug)]
enum UiMsg {
    ReferenceLoaded {
        ticket: ReferenceLoadTicket,
        result: Result<ReferenceData, DataLoadError>,
    },
    SubmitFinished {
        pending: PendingSubmission,
        outcome: SubmitOutcome,
    },
    ScanFinished {
        ticket: ScanTicket,
        result: ScanResult,
    },
}

struct TuiState {
    engine: WizardEngine,
    notices: Arc<NotificationChannel>,
    services: Option<Services>,
    runtime: Option<Handle>,
    reference_index: Option<usize>,
    brand_index: Option<usize>,
    new_reference: TextInput,
    inputs: [TextInput; 6],
    image_path: TextInput,
    focus: FocusTarget,
    modal: Option<Modal>,
    quit: bool,
}

impl TuiState {
    fn new(notices: Arc<NotificationChannel>) -> Self {
        let notifier: Arc<dyn Notifier> = notices.clone();
        Self {
            engine: WizardEngine::new(notifier),
            notices,
            services: None,
            runtime: None,
            reference_index: None,
            brand_index: None,
            new_reference: TextInput::default(),
            inputs: Default::default(),
            image_path: TextInput::default(),
            focus: FocusTarget::List,
            modal: None,
            quit: false,
        }
    }

    fn input(&self, name: FieldName) -> &TextInput {
        &self.inputs[field_index(name)]
    }
}

fn field_index(name: FieldName) -> usize {
    match name {
        FieldName::Po => 0,
        FieldName::Code => 1,
        FieldName::PartNumber => 2,
        FieldName::SeriNumber => 3,
        FieldName::Location => 4,
        FieldName::Cabinet => 5,
    }
}

fn list_items(state: &TuiState) -> &[ReferenceItem] {
    match (state.engine.step(), state.engine.reference_data()) {
        (Step::Reference, Some(data)) => &data.references,
        (Step::Brand, Some(data)) => &data.brands,
        _ => &[],
    }
}

fn focus_order(state: &TuiState) -> Vec<FocusTarget> {
    let s = state.engine.state();
    let mut order = Vec::new();
    match s.step {
        Step::Reference => {
            order.push(FocusTarget::List);
            if s.selections.is_new_reference() {
                order.push(FocusTarget::NewReference);
            }
        }
        Step::Brand => {
            order.push(FocusTarget::List);
            order.push(FocusTarget::Button(ButtonFocus::Back));
        }
        Step::Entry => {
            if let Some(shape) = s.shape {
                order.extend(shape.required_fields().iter().map(|f| FocusTarget::Field(*f)));
            }
            order.push(FocusTarget::Button(ButtonFocus::Back));
        }
    }
    order.push(FocusTarget::Button(ButtonFocus::Next));
    order
}

/// Keeps the text buffers and focus consistent with the engine after any engine-side reset.
fn sync_from_engine(state: &mut TuiState) {
    let s = state.engine.state();
    for name in FieldName::ALL {
        let v = s.fields.get(name);
        if state.inputs[field_index(name)].value != v {
            state.inputs[field_index(name)].set(v);
        }
    }
    if state.new_reference.value != s.selections.new_reference {
        state.new_reference.set(s.selections.new_reference.clone());
    }

    // List markers always mirror the engine's selections.
    let position = |items: &[ReferenceItem], value: &str| {
        items.iter().position(|item| item.value == value)
    };
    let (reference_index, brand_index) = match s.reference_status.data() {
        Some(data) => (
            position(&data.references, &s.selections.reference),
            position(&data.brands, &s.selections.brand),
        ),
        None => (None, None),
    };
    state.reference_index = reference_index;
    state.brand_index = brand_index;

    let order = focus_order(state);
    if !order.contains(&state.focus) {
        state.focus = order
            .first()
            .copied()
            .unwrap_or(FocusTarget::Button(ButtonFocus::Next));
    }
}

pub fn run(settings: &Settings, services: Services, runtime: Handle) -> Result<()> {
    info!("[PHASE: tui] [STEP: start] Starting intake wizard");

    let mut terminal = setup_terminal()?;
    let result = run_loop(&mut terminal, settings, services, runtime);
    restore_terminal(&mut terminal)?;

    result
}

fn new_smoke_state(target: &str) -> Result<TuiState> {
    // Smoke-only: seeded state for deterministic page rendering in CI/tooling.
    let mut state = TuiState::new(Arc::new(NotificationChannel::default()));
    let ticket = state.engine.begin_reference_load();
    state
        .engine
        .finish_reference_load(ticket, Ok(BuiltinReferenceData::data()));

    state.engine.set_reference("PROJ-ALPHA");
    match target {
        "reference" => {}
        "brand" => {
            state.engine.advance();
        }
        "entry" => {
            state.engine.advance();
            state.engine.set_brand("SAMSUNG");
            state.engine.advance();
            state.engine.select_shape(RecordShape::Basic);
            state.engine.set_field(FieldName::Po, "PO-0001");
        }
        other => bail!(
            "Unknown smoke target '{}' (expected reference|brand|entry)",
            other
        ),
    }
    sync_from_engine(&mut state);
    Ok(state)
}

/// Non-interactive smoke mode: render a single frame and exit.
/// Targets: reference|brand|entry
pub fn smoke(target: &str) -> Result<()> {
    info!(
        "[PHASE: tui] [STEP: smoke] Rendering single-frame TUI smoke target={}",
        target
    );

    let t = target.trim().to_ascii_lowercase();
    let state = new_smoke_state(t.as_str())?;

    // In-memory backend: no raw mode / alternate screen.
    let screen = render_to_text(&state, 100, 30)?;
    info!(
        "[PHASE: tui] [STEP: smoke] Rendered {} lines",
        screen.lines().count()
    );
    Ok(())
}

fn render_to_text(state: &TuiState, width: u16, height: u16) -> Result<String> {
    let backend = TestBackend::new(width, height);
    let mut terminal = Terminal::new(backend)?;
    terminal.draw(|f| draw(f.size(), f, state))?;

    let buffer = terminal.backend().buffer();
    let mut out = String::new();
    for y in 0..buffer.area.height {
        for x in 0..buffer.area.width {
            out.push_str(buffer.get(x, y).symbol());
        }
        out.push('\n');
    }
    Ok(out)
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn run_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    settings: &Settings,
    services: Services,
    runtime: Handle,
) -> Result<()> {
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();
    let mut state = TuiState::new(Arc::new(NotificationChannel::new(settings.dismiss_after())));
    state.services = Some(services);
    state.runtime = Some(runtime);
    let (tx, rx) = mpsc::channel::<UiMsg>();

    let ticket = state.engine.begin_reference_load();
    start_reference_load(&state, &tx, ticket);

    while !state.quit {
        drain_messages(&mut state, &rx);
        terminal.draw(|f| draw(f.size(), f, &state))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_millis(0));

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key(&mut state, key, &tx);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }
    }

    info!("[PHASE: tui] [STEP: exit] Intake wizard closed");
    Ok(())
}

fn spawn_ui_task<F>(state: &TuiState, tx: &mpsc::Sender<UiMsg>, task: F)
where
    F: Future<Output = UiMsg> + Send + 'static,
{
    let Some(rt) = state.runtime.as_ref() else {
        warn!("[PHASE: tui] [STEP: spawn] No async runtime; background task skipped");
        return;
    };
    let tx = tx.clone();
    rt.spawn(async move {
        let _ = tx.send(task.await);
    });
}

fn start_reference_load(state: &TuiState, tx: &mpsc::Sender<UiMsg>, ticket: ReferenceLoadTicket) {
    let Some(services) = state.services.as_ref() else {
        return;
    };
    let provider = Arc::clone(&services.reference);
    spawn_ui_task(state, tx, async move {
        UiMsg::ReferenceLoaded {
            ticket,
            result: provider.load().await,
        }
    });
}

fn start_submit(state: &mut TuiState, tx: &mpsc::Sender<UiMsg>) {
    let Some(client) = state.services.as_ref().map(|s| Arc::clone(&s.submission)) else {
        return;
    };
    let Some(pending) = state.engine.begin_submit() else {
        return;
    };
    spawn_ui_task(state, tx, async move {
        let outcome = client.submit(pending.request_id(), pending.record()).await;
        UiMsg::SubmitFinished { pending, outcome }
    });
}

fn start_image_scan(state: &mut TuiState, tx: &mpsc::Sender<UiMsg>) {
    let path = PathBuf::from(state.image_path.value.trim());
    state.modal = None;
    let Some(scanner) = state.services.as_ref().map(|s| Arc::clone(&s.scanner)) else {
        return;
    };
    let Some(ticket) = state.engine.begin_image_scan() else {
        return;
    };
    spawn_ui_task(state, tx, async move {
        UiMsg::ScanFinished {
            ticket,
            result: scanner.scan_file(&path).await,
        }
    });
}

fn drain_messages(state: &mut TuiState, rx: &mpsc::Receiver<UiMsg>) {
    while let Ok(msg) = rx.try_recv() {
        match msg {
            UiMsg::ReferenceLoaded { ticket, result } => {
                state.engine.finish_reference_load(ticket, result);
            }
            UiMsg::SubmitFinished { pending, outcome } => {
                let disposition = state.engine.complete_submit(pending, outcome);
                // A batch shape stays active; go straight back to its scan field.
                if disposition == SubmitDisposition::Saved {
                    if let Some(shape) = state.engine.state().shape {
                        state.focus = FocusTarget::Field(shape.scan_field());
                    }
                }
            }
            UiMsg::ScanFinished { ticket, result } => {
                state.engine.complete_image_scan(ticket, result);
            }
        }
    }
    sync_from_engine(state);
}

fn move_focus(state: &mut TuiState, forward: bool) {
    let order = focus_order(state);
    if order.is_empty() {
        return;
    }
    let pos = order.iter().position(|f| *f == state.focus).unwrap_or(0);
    let next = if forward {
        (pos + 1) % order.len()
    } else {
        (pos + order.len() - 1) % order.len()
    };
    blur(state);
    state.focus = order[next];
}

/// Focus is leaving the current target; a scan field commits its buffer.
fn blur(state: &mut TuiState) {
    if let FocusTarget::Field(name) = state.focus {
        if state.engine.state().shape.map(|s| s.scan_field()) == Some(name) {
            let raw = state.input(name).value.clone();
            state.engine.commit_passive_scan(&raw);
        }
    }
}

fn move_selection(state: &mut TuiState, down: bool) {
    let len = list_items(state).len();
    if len == 0 {
        return;
    }
    let current = match state.engine.step() {
        Step::Reference => state.reference_index,
        _ => state.brand_index,
    };
    let idx = match (current, down) {
        (None, _) => 0,
        (Some(i), true) => (i + 1).min(len - 1),
        (Some(i), false) => i.saturating_sub(1),
    };
    let value = list_items(state)[idx].value.clone();
    match state.engine.step() {
        Step::Reference => {
            state.reference_index = Some(idx);
            state.engine.set_reference(value);
        }
        _ => {
            state.brand_index = Some(idx);
            state.engine.set_brand(value);
        }
    }
}

fn go_next(state: &mut TuiState, tx: &mpsc::Sender<UiMsg>) {
    if state.engine.step() == Step::Entry {
        blur(state);
        start_submit(state, tx);
    } else if let GateOutcome::Advanced(_) = state.engine.advance() {
        state.focus = FocusTarget::List;
    }
}

fn handle_key(state: &mut TuiState, key: KeyEvent, tx: &mpsc::Sender<UiMsg>) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    if ctrl && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q')) {
        state.quit = true;
        return;
    }

    // Modal handling
    if state.modal == Some(Modal::ImagePath) {
        match key.code {
            KeyCode::Esc => state.modal = None,
            KeyCode::Enter => start_image_scan(state, tx),
            code => {
                state.image_path.handle_key(code);
            }
        }
        return;
    }

    let step = state.engine.step();
    match key.code {
        KeyCode::Char('s') if ctrl => {
            if step == Step::Entry {
                go_next(state, tx);
            }
        }
        KeyCode::Char('d') if ctrl => state.engine.dismiss_notice(),
        KeyCode::Char('r') if ctrl => state.engine.restart(),
        KeyCode::F(10) if step == Step::Entry => go_next(state, tx),
        KeyCode::Esc => {
            blur(state);
            state.engine.retreat();
            state.focus = FocusTarget::List;
        }
        KeyCode::F(5) => {
            if let Some(ticket) = state.engine.reload_reference_data() {
                start_reference_load(state, tx, ticket);
            }
        }
        KeyCode::F(n @ 1..=3) if step == Step::Entry => {
            let shape = RecordShape::ALL[usize::from(n - 1)];
            if state.engine.select_shape(shape) {
                sync_from_engine(state);
                if let Some(first) = shape.required_fields().first() {
                    state.focus = FocusTarget::Field(*first);
                }
            }
        }
        KeyCode::F(4) if step == Step::Entry => {
            if state.engine.state().shape.is_none() {
                // Publishes the "select a form type" notice.
                state.engine.begin_image_scan();
            } else {
                state.image_path.set("");
                state.modal = Some(Modal::ImagePath);
            }
        }
        KeyCode::Tab => move_focus(state, true),
        KeyCode::BackTab => move_focus(state, false),
        KeyCode::Up | KeyCode::Down if state.focus == FocusTarget::List => {
            move_selection(state, key.code == KeyCode::Down)
        }
        KeyCode::Enter => match state.focus {
            FocusTarget::Button(ButtonFocus::Back) => {
                state.engine.retreat();
                state.focus = FocusTarget::List;
            }
            FocusTarget::Field(name) => {
                let is_scan_field =
                    state.engine.state().shape.map(|s| s.scan_field()) == Some(name);
                if is_scan_field {
                    let raw = state.input(name).value.clone();
                    state.engine.commit_passive_scan(&raw);
                } else {
                    move_focus(state, true);
                }
            }
            _ => go_next(state, tx),
        },
        code => match state.focus {
            FocusTarget::NewReference => {
                if state.new_reference.handle_key(code).1 {
                    let v = state.new_reference.value.clone();
                    state.engine.set_new_reference(v);
                }
            }
            FocusTarget::Field(name) => {
                let input = &mut state.inputs[field_index(name)];
                if input.handle_key(code).1 {
                    let v = input.value.clone();
                    state.engine.set_field(name, v);
                }
            }
            _ => {}
        },
    }

    sync_from_engine(state);
}

fn draw(area: Rect, f: &mut ratatui::Frame<'_>, state: &TuiState) {
    let window_area = centered_window(area, 90, 26);

    let outer_block = Block::default()
        .borders(Borders::ALL)
        .title("Equipment Intake");
    f.render_widget(outer_block, window_area);

    // Inner layout: title + body + notice + hints + buttons
    let inner = window_area.inner(&ratatui::layout::Margin {
        vertical: 1,
        horizontal: 1,
    });
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(2),
                Constraint::Min(0),
                Constraint::Length(2),
                Constraint::Length(1),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(inner);

    let step = state.engine.step();
    let title = Paragraph::new(Line::from(vec![
        Span::styled(
            state.engine.step_title(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("   ({}/{})", step.ordinal(), Step::LAST.ordinal())),
    ]));
    f.render_widget(title, rows[0]);

    let body = match step {
        Step::Reference | Step::Brand => selection_page(state),
        Step::Entry => entry_page(state),
    };
    f.render_widget(
        Paragraph::new(body)
            .block(Block::default().borders(Borders::ALL))
            .wrap(Wrap { trim: false }),
        rows[1],
    );

    if let Some(notice) = state.notices.current() {
        let color = match notice.severity {
            Severity::Info => Color::Cyan,
            Severity::Success => Color::Green,
            Severity::Error => Color::Red,
        };
        let p = Paragraph::new(Line::from(vec![
            Span::styled(notice.text, Style::default().fg(color)),
            Span::styled("  (Ctrl+D to close)", Style::default().fg(Color::DarkGray)),
        ]))
        .wrap(Wrap { trim: true });
        f.render_widget(p, rows[2]);
    }

    let hints = match step {
        Step::Entry => "F1-F3 form type  F4 scan image  Tab next field  F10 submit  Esc back",
        _ => "Up/Down select  Tab next  Enter continue  F5 reload  Esc back  Ctrl+Q quit",
    };
    f.render_widget(
        Paragraph::new(Span::styled(hints, Style::default().fg(Color::DarkGray))),
        rows[3],
    );

    draw_buttons(f, rows[4], state);

    if state.modal == Some(Modal::ImagePath) {
        draw_image_path_modal(f, window_area, state);
    }
}

fn selection_page(state: &TuiState) -> Text<'static> {
    let s = state.engine.state();
    let mut lines = Vec::new();

    if s.step == Step::Brand {
        lines.push(Line::from(format!(
            "Project code: {}",
            s.selections.resolved_reference()
        )));
        lines.push(Line::from(""));
    }

    let heading = if s.step == Step::Reference {
        "Select a project code:"
    } else {
        "Select a brand:"
    };

    match &s.reference_status {
        ReferenceStatus::Loading => lines.push(Line::from("Loading lists...")),
        ReferenceStatus::Failed(reason) => {
            lines.push(Line::from(Span::styled(
                format!("Load error: {}", reason),
                Style::default().fg(Color::Red),
            )));
            lines.push(Line::from(""));
            lines.push(Line::from("Press F5 to reload."));
        }
        ReferenceStatus::Ready(_) => {
            lines.push(Line::from(heading));
            let selected = if s.step == Step::Reference {
                state.reference_index
            } else {
                state.brand_index
            };
            let list_focused = state.focus == FocusTarget::List;
            for (i, item) in list_items(state).iter().enumerate() {
                let marker = if selected == Some(i) { "(x)" } else { "( )" };
                let mut style = Style::default();
                if list_focused && selected == Some(i) {
                    style = style.add_modifier(Modifier::REVERSED);
                }
                lines.push(Line::from(Span::styled(
                    format!("  {} {}", marker, item.label),
                    style,
                )));
            }
        }
    }

    if s.step == Step::Reference && s.selections.reference == NEW_REFERENCE_SENTINEL {
        lines.push(Line::from(""));
        let focused = state.focus == FocusTarget::NewReference;
        lines.push(input_line("New project code", &state.new_reference, focused, false));
    }

    Text::from(lines)
}

fn entry_page(state: &TuiState) -> Text<'static> {
    let s = state.engine.state();
    let mut lines = vec![
        Line::from(format!(
            "Project code: {}    Brand: {}",
            s.selections.resolved_reference(),
            s.selections.resolved_brand()
        )),
        Line::from(""),
    ];

    for (i, shape) in RecordShape::ALL.iter().enumerate() {
        let mark = if s.shape == Some(*shape) { "(x)" } else { "( )" };
        lines.push(Line::from(format!("[F{}] {} {}", i + 1, mark, shape.label())));
    }
    lines.push(Line::from(""));

    match s.shape {
        None => lines.push(Line::from("Select a form type (F1-F3) to start entry.")),
        Some(shape) => {
            for name in shape.required_fields() {
                let focused = state.focus == FocusTarget::Field(*name);
                let is_scan = shape.scan_field() == *name;
                lines.push(input_line(name.label(), state.input(*name), focused, is_scan));
            }
        }
    }

    lines.push(Line::from(""));
    let status = match s.submission_status {
        SubmissionStatus::InFlight => Some(("Submitting...", Color::Yellow)),
        SubmissionStatus::Success => Some(("Last record saved.", Color::Green)),
        SubmissionStatus::Error => Some(("Last submission failed; fields kept.", Color::Red)),
        SubmissionStatus::Idle => None,
    };
    if let Some((text, color)) = status {
        lines.push(Line::from(Span::styled(text, Style::default().fg(color))));
    }

    Text::from(lines)
}

fn input_line(label: &str, input: &TextInput, focused: bool, scan: bool) -> Line<'static> {
    let style = if focused {
        Style::default().add_modifier(Modifier::REVERSED)
    } else {
        Style::default()
    };
    let suffix = if scan { "  (scan)" } else { "" };
    Line::from(vec![
        Span::raw(format!("  {:<18}", format!("{}:", label))),
        Span::styled(format!("[{}]", input.display(focused)), style),
        Span::styled(suffix.to_string(), Style::default().fg(Color::DarkGray)),
    ])
}

fn centered_window(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width.saturating_sub(2)).max(60).min(area.width);
    let h = height.min(area.height.saturating_sub(2)).max(20).min(area.height);
    let x = area.x + (area.width.saturating_sub(w)) / 2;
    let y = area.y + (area.height.saturating_sub(h)) / 2;
    Rect {
        x,
        y,
        width: w,
        height: h,
    }
}

fn draw_buttons(f: &mut ratatui::Frame<'_>, area: Rect, state: &TuiState) {
    let step = state.engine.step();
    let back_enabled = step != Step::FIRST;
    let (next_label, next_enabled) = if step == Step::Entry {
        ("Submit", state.engine.can_submit())
    } else {
        ("Next", step_gate(state.engine.state()).is_ok())
    };

    let back = button_text(
        "Back",
        state.focus == FocusTarget::Button(ButtonFocus::Back),
        back_enabled,
    );
    let next = button_text(
        next_label,
        state.focus == FocusTarget::Button(ButtonFocus::Next),
        next_enabled,
    );

    let line = Line::from(vec![back, Span::raw(" "), next]);
    let p = Paragraph::new(Text::from(line)).alignment(Alignment::Right);
    f.render_widget(p, area);
}

fn button_text(label: &str, focused: bool, enabled: bool) -> Span<'static> {
    let mut style = Style::default();
    if !enabled {
        style = style.fg(Color::DarkGray);
    }
    if focused && enabled {
        style = style.add_modifier(Modifier::REVERSED);
    }
    Span::styled(format!("[ {} ]", label), style)
}

fn draw_image_path_modal(f: &mut ratatui::Frame<'_>, window_area: Rect, state: &TuiState) {
    let modal_w = 70u16.min(window_area.width.saturating_sub(4)).max(40);
    let modal_h = 7u16;
    let x = window_area.x + (window_area.width.saturating_sub(modal_w)) / 2;
    let y = window_area.y + (window_area.height.saturating_sub(modal_h)) / 2;
    let area = Rect {
        x,
        y,
        width: modal_w,
        height: modal_h,
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .title("Scan image");
    let body = Paragraph::new(Text::from(vec![
        Line::from("Path to a photo or screenshot of the QR code:"),
        Line::from(""),
        Line::from(format!("[{}]", state.image_path.display(true))),
        Line::from(""),
        Line::from(Span::styled(
            "Enter to scan, Esc to cancel",
            Style::default().fg(Color::DarkGray),
        )),
    ]))
    .block(block)
    .wrap(Wrap { trim: false });
    f.render_widget(Clear, area);
    f.render_widget(body, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(state: &mut TuiState, tx: &mpsc::Sender<UiMsg>, text: &str) {
        for c in text.chars() {
            handle_key(state, key(KeyCode::Char(c)), tx);
        }
    }

    #[test]
    fn smoke_targets_render() {
        for target in ["reference", "brand", "entry"] {
            smoke(target).expect("smoke render");
        }
        assert!(smoke("nope").is_err());
    }

    #[test]
    fn entry_frame_shows_title_and_fields() {
        let state = new_smoke_state("entry").expect("state");
        let screen = render_to_text(&state, 100, 30).expect("render");
        assert!(screen.contains("Step 3: Data entry (Form 1)"), "{}", screen);
        assert!(screen.contains("PO-0001"), "{}", screen);
        assert!(screen.contains("(scan)"), "{}", screen);
        assert!(screen.contains("[ Submit ]"), "{}", screen);
    }

    #[test]
    fn text_input_edits_multibyte_safely() {
        let mut input = TextInput::default();
        input.set("ab");
        input.handle_key(KeyCode::Left);
        input.handle_key(KeyCode::Char('é'));
        assert_eq!(input.value, "aéb");
        input.handle_key(KeyCode::Backspace);
        input.handle_key(KeyCode::Backspace);
        assert_eq!(input.value, "b");
        input.handle_key(KeyCode::End);
        input.handle_key(KeyCode::Delete);
        assert_eq!(input.value, "b");
    }

    #[test]
    fn keyboard_walkthrough_reaches_entry_and_scan_commit() {
        let (tx, _rx) = mpsc::channel();
        let mut state = new_smoke_state("reference").expect("state");
        state.engine.set_reference("");

        handle_key(&mut state, key(KeyCode::Enter), &tx);
        assert_eq!(state.engine.step(), Step::Reference);

        handle_key(&mut state, key(KeyCode::Down), &tx);
        handle_key(&mut state, key(KeyCode::Enter), &tx);
        assert_eq!(state.engine.step(), Step::Brand);

        handle_key(&mut state, key(KeyCode::Down), &tx);
        handle_key(&mut state, key(KeyCode::Enter), &tx);
        assert_eq!(state.engine.step(), Step::Entry);

        handle_key(&mut state, key(KeyCode::F(2)), &tx);
        assert_eq!(state.focus, FocusTarget::Field(FieldName::Po));
        type_text(&mut state, &tx, "PO9");
        handle_key(&mut state, key(KeyCode::Tab), &tx);
        type_text(&mut state, &tx, "PN-1");
        handle_key(&mut state, key(KeyCode::Tab), &tx);
        type_text(&mut state, &tx, "  SN-778899 ");
        handle_key(&mut state, key(KeyCode::Enter), &tx);

        let fields = &state.engine.state().fields;
        assert_eq!(fields.po, "PO9");
        assert_eq!(fields.part_number, "PN-1");
        assert_eq!(fields.seri_number, "SN-778899");
        assert_eq!(state.input(FieldName::SeriNumber).value, "SN-778899");
        assert!(state.engine.can_submit());
    }

    #[test]
    fn escape_from_entry_clears_buffers() {
        let (tx, _rx) = mpsc::channel();
        let mut state = new_smoke_state("entry").expect("state");
        assert_eq!(state.input(FieldName::Po).value, "PO-0001");

        handle_key(&mut state, key(KeyCode::Esc), &tx);
        assert_eq!(state.engine.step(), Step::Brand);
        assert_eq!(state.input(FieldName::Po).value, "");
        assert_eq!(state.focus, FocusTarget::List);
    }

    #[test]
    fn escape_to_first_step_keeps_brand_marker() {
        let (tx, _rx) = mpsc::channel();
        let mut state = new_smoke_state("brand").expect("state");
        handle_key(&mut state, key(KeyCode::Down), &tx);
        handle_key(&mut state, key(KeyCode::Down), &tx);
        assert_eq!(state.engine.state().selections.brand, "SONY");
        assert_eq!(state.brand_index, Some(1));

        handle_key(&mut state, key(KeyCode::Esc), &tx);
        assert_eq!(state.engine.step(), Step::Reference);
        assert_eq!(state.reference_index, Some(0));

        handle_key(&mut state, key(KeyCode::Enter), &tx);
        assert_eq!(state.engine.step(), Step::Brand);
        assert_eq!(state.brand_index, Some(1));
        let screen = render_to_text(&state, 100, 30).expect("render");
        assert!(screen.contains("(x) Sony"), "{}", screen);
    }

    #[test]
    fn installation_save_keeps_cabinet_and_refocuses_code() {
        let (tx, rx) = mpsc::channel();
        let mut state = new_smoke_state("entry").expect("state");
        handle_key(&mut state, key(KeyCode::F(3)), &tx);
        assert_eq!(state.engine.state().shape, Some(RecordShape::Installation));
        assert_eq!(state.focus, FocusTarget::Field(FieldName::Location));
        assert_eq!(state.input(FieldName::Po).value, "");

        type_text(&mut state, &tx, "ROW-A");
        handle_key(&mut state, key(KeyCode::Tab), &tx);
        type_text(&mut state, &tx, "CAB-07");
        handle_key(&mut state, key(KeyCode::Tab), &tx);
        type_text(&mut state, &tx, "DEV-000123");
        handle_key(&mut state, key(KeyCode::Enter), &tx);
        assert!(state.engine.can_submit());
        handle_key(&mut state, key(KeyCode::Tab), &tx);
        handle_key(&mut state, key(KeyCode::Tab), &tx);
        assert_eq!(state.focus, FocusTarget::Button(ButtonFocus::Next));

        let pending = state.engine.begin_submit().expect("pending");
        tx.send(UiMsg::SubmitFinished {
            pending,
            outcome: SubmitOutcome::Success,
        })
        .expect("send");
        drain_messages(&mut state, &rx);

        assert_eq!(state.input(FieldName::Location).value, "ROW-A");
        assert_eq!(state.input(FieldName::Cabinet).value, "CAB-07");
        assert_eq!(state.input(FieldName::Code).value, "");
        assert_eq!(state.focus, FocusTarget::Field(FieldName::Code));
    }

    #[test]
    fn ctrl_q_quits() {
        let (tx, _rx) = mpsc::channel();
        let mut state = new_smoke_state("reference").expect("state");
        handle_key(
            &mut state,
            KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL),
            &tx,
        );
        assert!(state.quit);
    }

    #[test]
    fn drained_scan_result_updates_input_buffer() {
        let (tx, rx) = mpsc::channel();
        let mut state = new_smoke_state("entry").expect("state");
        let ticket = state.engine.begin_image_scan().expect("ticket");
        tx.send(UiMsg::ScanFinished {
            ticket,
            result: Ok("QR-123456".to_string()),
        })
        .expect("send");

        drain_messages(&mut state, &rx);
        assert_eq!(state.input(FieldName::Code).value, "QR-123456");
    }
}
