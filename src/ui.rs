use std::sync::mpsc::Receiver;
use std::time::Duration;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::CrosstermBackend, Frame, Terminal,
    layout::{Layout, Constraint, Direction, Rect},
    widgets::{Block, Borders, Paragraph, Wrap, Clear, List, ListItem, ListState},
    style::{Style, Color, Modifier},
    text::{Span, Line},
};
use tracing::debug;
use unicode_width::UnicodeWidthStr;

use crate::api_client::Advice;
use crate::controller::{AdvisorState, Effect};
use crate::markdown;
use crate::plant_client::DiagnosisResult;
use crate::prompt::{CATEGORIES, SUGGESTIONS};

/// Results coming back from spawned requests.
pub enum UiEvent {
    Advice { query: String, advice: Advice },
    Diagnosis { outcome: Result<DiagnosisResult, String> },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Focus { Question, Suggestions, Image, History }

impl Focus {
    fn next(self) -> Self {
        match self {
            Focus::Question => Focus::Suggestions,
            Focus::Suggestions => Focus::Image,
            Focus::Image => Focus::History,
            Focus::History => Focus::Question,
        }
    }

    fn prev(self) -> Self {
        match self {
            Focus::Question => Focus::History,
            Focus::Suggestions => Focus::Question,
            Focus::Image => Focus::Suggestions,
            Focus::History => Focus::Image,
        }
    }
}

/// Widget-level state that never leaves the terminal layer.
pub struct ViewState {
    focus: Focus,
    file_input: String,
    suggestion: usize,
    history: usize,
    scroll: u16,
}

impl ViewState {
    pub fn new() -> Self {
        Self { focus: Focus::Question, file_input: String::new(), suggestion: 0, history: 0, scroll: 0 }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum KeyOutcome {
    Continue,
    Quit,
    Dispatch(Effect),
}

pub fn handle_key(view: &mut ViewState, state: &mut AdvisorState, key: KeyEvent) -> KeyOutcome {
    if key.kind != KeyEventKind::Press {
        return KeyOutcome::Continue;
    }
    if state.alert.is_some() {
        if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
            state.dismiss_alert();
        }
        return KeyOutcome::Continue;
    }

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => return KeyOutcome::Quit,
        KeyCode::Char('c') if ctrl => return KeyOutcome::Quit,
        KeyCode::Char('d') if ctrl => {
            return state.diagnose().map_or(KeyOutcome::Continue, KeyOutcome::Dispatch);
        }
        KeyCode::Tab => view.focus = view.focus.next(),
        KeyCode::BackTab => view.focus = view.focus.prev(),
        KeyCode::PageUp => view.scroll = view.scroll.saturating_sub(5),
        KeyCode::PageDown => view.scroll = view.scroll.saturating_add(5),
        _ => return handle_focused_key(view, state, key.code, ctrl),
    }
    KeyOutcome::Continue
}

fn handle_focused_key(view: &mut ViewState, state: &mut AdvisorState, code: KeyCode, ctrl: bool) -> KeyOutcome {
    match view.focus {
        Focus::Question => match code {
            KeyCode::Char(c) if !ctrl => state.query.push(c),
            KeyCode::Backspace => { state.query.pop(); }
            KeyCode::Enter => {
                if let Some(effect) = state.submit() {
                    view.scroll = 0;
                    return KeyOutcome::Dispatch(effect);
                }
            }
            _ => {}
        },
        Focus::Suggestions => match code {
            KeyCode::Left | KeyCode::Up => view.suggestion = view.suggestion.saturating_sub(1),
            KeyCode::Right | KeyCode::Down => {
                view.suggestion = (view.suggestion + 1).min(SUGGESTIONS.len() - 1);
            }
            KeyCode::Enter => {
                state.use_suggestion(view.suggestion);
                view.focus = Focus::Question;
            }
            _ => {}
        },
        Focus::Image => match code {
            KeyCode::Char(c) if !ctrl => view.file_input.push(c),
            KeyCode::Backspace => { view.file_input.pop(); }
            KeyCode::Enter => {
                let path = view.file_input.trim();
                if !path.is_empty() {
                    state.select_file(path);
                    if state.alert.is_none() {
                        view.file_input.clear();
                    }
                }
            }
            _ => {}
        },
        Focus::History => {
            let len = state.history().len();
            match code {
                KeyCode::Up => view.history = view.history.saturating_sub(1),
                KeyCode::Down => view.history = (view.history + 1).min(len.saturating_sub(1)),
                KeyCode::Enter if len > 0 => {
                    state.replay(view.history.min(len - 1));
                    view.focus = Focus::Question;
                    view.scroll = 0;
                }
                KeyCode::Delete => {
                    state.clear_history();
                    view.history = 0;
                }
                _ => {}
            }
        }
    }
    KeyOutcome::Continue
}

fn spinner(frame: u64) -> &'static str {
    ["·  ", "·· ", "···"][(frame as usize / 10) % 3]
}

fn line_display_rows(line: &Line<'_>, available_width: u16) -> u16 {
    let mut width = 0usize;
    for span in &line.spans {
        width += span.content.width();
    }
    let aw = available_width.max(1) as usize;
    let rows = if width == 0 { 1 } else { (width + aw - 1) / aw };
    rows as u16
}

fn focused_block(title: &str, focused: bool) -> Block<'static> {
    let style = if focused {
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    Block::default().borders(Borders::ALL).border_style(style).title(title.to_string())
}

fn truncate(text: &str, width: usize) -> String {
    let first = textwrap::wrap(text, width.max(1)).into_iter().next().unwrap_or_default().into_owned();
    if first.len() < text.trim_end().len() { format!("{first}…") } else { first }
}

/// Column for a cursor after `used` cells of text, kept inside the bordered `area`.
fn cursor_x(area: Rect, used: usize) -> u16 {
    let used = u16::try_from(used).unwrap_or(u16::MAX);
    let inner_right = area.x.saturating_add(area.width.saturating_sub(2));
    area.x.saturating_add(1).saturating_add(used).min(inner_right)
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect::new(area.x + (area.width - w) / 2, area.y + (area.height - h) / 2, w, h)
}

fn draw_categories(f: &mut Frame, area: Rect) {
    let cells = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 6); 6])
        .split(area);
    for (cat, cell) in CATEGORIES.iter().zip(cells.iter()) {
        let lines = vec![
            Line::from(vec![
                Span::raw(format!("{} ", cat.icon)),
                Span::styled(cat.title, Style::default().fg(cat.color).add_modifier(Modifier::BOLD)),
            ]),
            Line::from(Span::styled(cat.description, Style::default().fg(Color::Gray))),
        ];
        let card = Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::DarkGray)));
        f.render_widget(card, *cell);
    }
}

fn draw_diagnosis(f: &mut Frame, area: Rect, state: &AdvisorState, view: &ViewState, frame: u64) {
    let mut lines = vec![
        Line::from(vec![
            Span::styled("image: ", Style::default().fg(Color::DarkGray)),
            Span::raw(match &state.selected_file {
                Some(p) => p.display().to_string(),
                None => "none selected".into(),
            }),
        ]),
        Line::from(format!("path> {}", view.file_input)),
        Line::default(),
    ];

    if state.diagnosis_loading {
        lines.push(Line::from(Span::styled(format!("analyzing {}", spinner(frame)), Style::default().fg(Color::DarkGray))));
    } else if let Some(result) = &state.diagnosis {
        if result.is_empty() {
            lines.push(Line::from(Span::styled("No result returned", Style::default().fg(Color::Gray))));
        } else if result.diseases.is_empty() {
            lines.push(Line::from(Span::styled("No diseases reported", Style::default().fg(Color::Gray))));
        }
        for d in &result.diseases {
            lines.push(Line::from(vec![
                Span::styled(d.name.clone(), Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(format!("  {:.1}%", d.probability * 100.0)),
            ]));
        }
        if let Some(health) = &result.health_assessment {
            let color = if health.status == "healthy" { Color::Green } else { Color::Red };
            lines.push(Line::from(vec![
                Span::raw("health: "),
                Span::styled(health.status.clone(), Style::default().fg(color)),
            ]));
        }
    } else {
        lines.push(Line::from(Span::styled("Enter a path, then Ctrl+D to diagnose", Style::default().fg(Color::DarkGray))));
    }

    let panel = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(focused_block("plant diagnosis", view.focus == Focus::Image));
    f.render_widget(panel, area);
}

fn draw_history(f: &mut Frame, area: Rect, state: &AdvisorState, view: &ViewState) {
    let width = area.width.saturating_sub(4) as usize;
    let items: Vec<ListItem> = state
        .history()
        .iter()
        .map(|r| ListItem::new(Span::styled(truncate(&r.query, width), Style::default().fg(Color::Green))))
        .collect();
    let mut list_state = ListState::default();
    if view.focus == Focus::History && !items.is_empty() {
        list_state.select(Some(view.history.min(items.len() - 1)));
    }
    let list = List::new(items)
        .block(focused_block("recent questions", view.focus == Focus::History))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("▶ ");
    f.render_stateful_widget(list, area, &mut list_state);
}

fn draw(f: &mut Frame, state: &AdvisorState, view: &mut ViewState, frame: u64) {
    let size = f.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(5),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(9),
            Constraint::Length(1),
        ])
        .split(size);

    // Header
    let header = Paragraph::new(Line::from(vec![
        Span::styled(" 🌾 FarmAdvisor ", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
        Span::raw("— your AI-powered agricultural companion"),
    ]))
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(header, chunks[0]);

    draw_categories(f, chunks[1]);

    // Question input
    let prompt = "> ";
    let mut input_spans = vec![Span::raw(format!("{prompt}{}", state.query))];
    if state.advice_loading {
        input_spans.push(Span::styled(format!("  thinking {}", spinner(frame)), Style::default().fg(Color::DarkGray)));
    }
    let input = Paragraph::new(Line::from(input_spans))
        .block(focused_block("ask about crops, pests, weather, or market prices", view.focus == Focus::Question));
    f.render_widget(Clear, chunks[2]);
    f.render_widget(input, chunks[2]);

    // Suggestion chips
    let mut chips = Vec::with_capacity(SUGGESTIONS.len() * 2);
    for (i, s) in SUGGESTIONS.iter().enumerate() {
        let mut style = Style::default().fg(Color::Green);
        if view.focus == Focus::Suggestions && i == view.suggestion {
            style = style.add_modifier(Modifier::REVERSED);
        }
        if i > 0 { chips.push(Span::styled(" │ ", Style::default().fg(Color::DarkGray))); }
        chips.push(Span::styled(*s, style));
    }
    let chip_bar = Paragraph::new(Line::from(chips))
        .scroll((0, if view.focus == Focus::Suggestions { (view.suggestion as u16) * 30 } else { 0 }))
        .block(focused_block("suggestions", view.focus == Focus::Suggestions));
    f.render_widget(chip_bar, chunks[3]);

    // Advice, top-anchored and clamped to the rendered height
    let advice_lines = markdown::render(&state.response);
    let available_width = chunks[4].width.saturating_sub(2);
    let mut total_rows: u16 = 0;
    for line in &advice_lines { total_rows = total_rows.saturating_add(line_display_rows(line, available_width)); }
    let content_height = chunks[4].height.saturating_sub(2);
    view.scroll = view.scroll.min(total_rows.saturating_sub(content_height));
    let advice = Paragraph::new(advice_lines)
        .wrap(Wrap { trim: false })
        .scroll((view.scroll, 0))
        .block(Block::default().borders(Borders::ALL).title("expert advice"));
    f.render_widget(advice, chunks[4]);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[5]);
    draw_diagnosis(f, bottom[0], state, view, frame);
    draw_history(f, bottom[1], state, view);

    // Status line
    let status = match &state.notice {
        Some(n) => Span::styled(n.clone(), Style::default().fg(Color::Yellow)),
        None => Span::styled(
            "tab focus · enter activate · ctrl+d diagnose · pgup/pgdn scroll · del clear history · esc quit",
            Style::default().fg(Color::DarkGray),
        ),
    };
    f.render_widget(Paragraph::new(Line::from(status)), chunks[6]);

    match view.focus {
        Focus::Question => {
            let x = cursor_x(chunks[2], prompt.width() + state.query.width());
            f.set_cursor(x, chunks[2].y + 1);
        }
        Focus::Image => {
            let x = cursor_x(bottom[0], "path> ".width() + view.file_input.width());
            f.set_cursor(x, bottom[0].y + 2);
        }
        _ => {}
    }

    if let Some(alert) = &state.alert {
        let area = centered(size, 50, 5);
        let popup = Paragraph::new(vec![
            Line::from(alert.clone()),
            Line::from(Span::styled("press enter to dismiss", Style::default().fg(Color::DarkGray))),
        ])
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Red)).title("notice"));
        f.render_widget(Clear, area);
        f.render_widget(popup, area);
    }
}

pub fn run_loop<F>(
    rx: Receiver<UiEvent>,
    mut state: AdvisorState,
    mut dispatch: F,
) -> anyhow::Result<()>
where
    F: FnMut(Effect),
{
    crossterm::terminal::enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    crossterm::execute!(stdout, crossterm::terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let mut view = ViewState::new();
    let mut frame = 0u64;

    let result = (|| -> anyhow::Result<()> {
        loop {
            // 1) Pull any finished requests (non-blocking) and update state
            while let Ok(ev) = rx.try_recv() {
                state.apply(ev);
            }

            // 2) Draw UI
            terminal.draw(|f| draw(f, &state, &mut view, frame))?;
            frame += 1;

            // 3) Handle keys
            if event::poll(Duration::from_millis(33))? {
                if let Event::Key(key) = event::read()? {
                    match handle_key(&mut view, &mut state, key) {
                        KeyOutcome::Continue => {}
                        KeyOutcome::Quit => break,
                        KeyOutcome::Dispatch(effect) => {
                            debug!(?effect, "dispatching");
                            dispatch(effect);
                        }
                    }
                }
            }
        }
        Ok(())
    })();

    crossterm::terminal::disable_raw_mode()?;
    crossterm::execute!(terminal.backend_mut(), crossterm::terminal::LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}
