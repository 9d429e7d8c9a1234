use crate::{
    app::{enhancement_label, App, InputMode, InputPurpose, LogLevel, ToastLevel},
    catalog::Item,
    filter::ViewFilter,
    mode::Mode,
    status::StatusRecord,
};
use anyhow::Result;
use crossterm::{
    event::{
        self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    text::{Line, Span},
    widgets::{
        Block, BorderType, Borders, Cell, Clear, Padding, Paragraph, Row, Table, TableState, Wrap,
    },
};
use std::{io, time::{Duration, Instant}};

const SIDE_PANEL_WIDTH: u16 = 40;

#[derive(Clone)]
struct Theme {
    accent: Color,
    accent_soft: Color,
    border: Color,
    text: Color,
    muted: Color,
    success: Color,
    warning: Color,
    error: Color,
    rainbow: Color,
    header_bg: Color,
    log_bg: Color,
}

impl Theme {
    fn new() -> Self {
        Self {
            accent: Color::Rgb(255, 170, 70),
            accent_soft: Color::Rgb(150, 100, 45),
            border: Color::Rgb(70, 70, 85),
            text: Color::Rgb(225, 228, 235),
            muted: Color::Rgb(135, 140, 150),
            success: Color::Rgb(120, 220, 140),
            warning: Color::Rgb(230, 200, 120),
            error: Color::Rgb(235, 100, 95),
            rainbow: Color::Rgb(190, 140, 255),
            header_bg: Color::Rgb(26, 24, 32),
            log_bg: Color::Rgb(18, 17, 22),
        }
    }

    fn block(&self, title: &'static str) -> Block<'static> {
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(self.border))
            .title(Span::styled(
                title,
                Style::default()
                    .fg(self.accent)
                    .add_modifier(Modifier::BOLD),
            ))
    }

    fn panel(&self, title: &'static str) -> Block<'static> {
        self.block(title).padding(Padding {
            left: 1,
            right: 1,
            top: 0,
            bottom: 0,
        })
    }
}

pub fn run(app: &mut App) -> Result<()> {
    with_terminal(|terminal| run_loop(terminal, app))
}

/// Blocking error screen for a failed startup. Any key exits.
pub fn run_fatal(error: &anyhow::Error) -> Result<()> {
    let message = format!("{error:#}");
    with_terminal(|terminal| loop {
        terminal.draw(|frame| draw_fatal(frame, &message))?;
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                return Ok(());
            }
        }
    })
}

fn with_terminal<F>(body: F) -> Result<()>
where
    F: FnOnce(&mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()>,
{
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = body(&mut terminal);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), DisableBracketedPaste, LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_loop(terminal: &mut Terminal<impl Backend>, app: &mut App) -> Result<()> {
    loop {
        app.tick();
        app.clamp_selection();
        terminal.draw(|frame| draw(frame, app))?;

        if app.should_quit {
            break;
        }

        if event::poll(Duration::from_millis(200))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(app, key),
                Event::Paste(text) => handle_paste(app, text),
                _ => {}
            }
        }
    }

    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if app.help_open {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
            app.help_open = false;
        }
        return;
    }

    let mode = std::mem::replace(&mut app.input_mode, InputMode::Normal);
    match mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing {
            prompt,
            mut buffer,
            purpose,
        } => handle_input_mode(app, key, prompt, &mut buffer, purpose),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        if key.code == KeyCode::Char('c') {
            app.should_quit = true;
        }
        return;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') => app.should_quit = true,
        KeyCode::Char('?') => app.help_open = true,
        KeyCode::Up | KeyCode::Char('k') => app.move_selection(-1),
        KeyCode::Down | KeyCode::Char('j') => app.move_selection(1),
        KeyCode::Home | KeyCode::Char('g') => app.select_first(),
        KeyCode::End | KeyCode::Char('G') => app.select_last(),
        KeyCode::PageUp => app.scroll_log_up(3),
        KeyCode::PageDown => app.scroll_log_down(3),
        KeyCode::Char(' ') | KeyCode::Enter => app.activate_selected(),
        KeyCode::Tab | KeyCode::Char('m') => app.cycle_mode(),
        KeyCode::Char('1') => app.set_mode(Mode::Owned),
        KeyCode::Char('2') => app.set_mode(Mode::Enhancement),
        KeyCode::Char('3') => app.set_mode(Mode::Potential),
        KeyCode::Char('/') => app.enter_search(),
        KeyCode::Char('c') => app.cycle_category(1),
        KeyCode::Char('C') => app.cycle_category(-1),
        KeyCode::Char('f') => app.cycle_view_filter(),
        KeyCode::Char('v') => app.set_view_filter(ViewFilter::All),
        KeyCode::Char('h') => app.set_view_filter(ViewFilter::HideOwned),
        KeyCode::Char('x') => app.set_view_filter(ViewFilter::MissingOnly),
        KeyCode::Char('A') => app.select_all(),
        KeyCode::Char('N') => app.select_none(),
        KeyCode::Char('e') | KeyCode::Char('E') => app.export(),
        KeyCode::Char('i') | KeyCode::Char('I') => app.enter_import(String::new()),
        _ => {}
    }
}

fn handle_input_mode(
    app: &mut App,
    key: KeyEvent,
    prompt: String,
    buffer: &mut String,
    purpose: InputPurpose,
) {
    match key.code {
        KeyCode::Esc => {
            app.cancel_input(purpose);
            return;
        }
        KeyCode::Enter => {
            app.handle_submit(purpose, buffer.clone());
            return;
        }
        KeyCode::Char(c) => {
            if key.modifiers.contains(KeyModifiers::CONTROL)
                || key.modifiers.contains(KeyModifiers::ALT)
            {
                app.input_mode = InputMode::Editing {
                    prompt,
                    buffer: buffer.clone(),
                    purpose,
                };
                return;
            }
            buffer.push(c);
        }
        KeyCode::Backspace => {
            buffer.pop();
        }
        _ => {}
    }

    if matches!(purpose, InputPurpose::Search { .. }) {
        app.preview_search(buffer);
    }
    app.input_mode = InputMode::Editing {
        prompt,
        buffer: buffer.clone(),
        purpose,
    };
}

fn handle_paste(app: &mut App, text: String) {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return;
    }

    if let InputMode::Editing {
        buffer, purpose, ..
    } = &mut app.input_mode
    {
        buffer.push_str(trimmed);
        let preview = matches!(purpose, InputPurpose::Search { .. }).then(|| buffer.clone());
        if let Some(text) = preview {
            app.preview_search(&text);
        }
        return;
    }

    app.log_info("Paste received, opening import prompt".to_string());
    app.enter_import(trimmed.to_string());
}

fn draw(frame: &mut Frame<'_>, app: &App) {
    let area = frame.size();
    let theme = Theme::new();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Length(8),
        ])
        .split(area);

    frame.render_widget(build_header(app, &theme), chunks[0]);

    let body_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(30), Constraint::Length(SIDE_PANEL_WIDTH)])
        .split(chunks[1]);

    let items = app.visible_items();
    if items.is_empty() {
        let message = if app.tracker.catalog().is_empty() {
            "The catalog is empty."
        } else {
            "No units match the current filters."
        };
        let empty = Paragraph::new(message)
            .style(Style::default().fg(theme.muted))
            .block(theme.panel("Units"))
            .alignment(Alignment::Center);
        frame.render_widget(empty, body_chunks[0]);
    } else {
        let rows: Vec<Row> = items
            .iter()
            .map(|item| row_for_item(item, &app.tracker.record(&item.id), &theme))
            .collect();
        let table = Table::new(
            rows,
            [
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(4),
                Constraint::Length(8),
                Constraint::Min(12),
            ],
        )
        .header(
            Row::new(vec![
                Cell::from("Own"),
                Cell::from("EZA"),
                Cell::from("Pot"),
                Cell::from("Type"),
                Cell::from("Unit"),
            ])
            .style(Style::default().fg(theme.text).add_modifier(Modifier::BOLD)),
        )
        .column_spacing(1)
        .block(theme.panel("Units"))
        .highlight_style(
            Style::default()
                .bg(theme.accent_soft)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol(">");

        let mut state = TableState::default();
        state.select(Some(app.selected));
        frame.render_stateful_widget(table, body_chunks[0], &mut state);
    }

    let details = Paragraph::new(build_details(app, &theme))
        .style(Style::default().fg(theme.text))
        .block(theme.panel("Details"))
        .wrap(Wrap { trim: false });
    frame.render_widget(details, body_chunks[1]);

    let status_block = theme.panel("Status");
    let status_inner = status_block.inner(chunks[2]);
    let footer = Paragraph::new(status_bar_line(app, status_inner.width))
        .style(Style::default().fg(theme.text))
        .block(status_block);
    frame.render_widget(footer, chunks[2]);

    let log_block = theme.panel("Log").style(Style::default().bg(theme.log_bg));
    let log_inner = log_block.inner(chunks[3]);
    let log = Paragraph::new(build_log_lines(app, &theme, log_inner.height as usize))
        .style(Style::default().fg(theme.text).bg(theme.log_bg))
        .block(log_block);
    frame.render_widget(log, chunks[3]);

    if app.help_open {
        draw_help(frame, &theme);
    }
    draw_toast(frame, app, &theme, chunks[1]);
}

fn build_header(app: &App, theme: &Theme) -> Paragraph<'static> {
    let view = app.tracker.view();
    let progress = app.tracker.progress();

    let mut mode_spans = vec![Span::styled("Mode: ", Style::default().fg(theme.muted))];
    for mode in Mode::ALL {
        let style = if mode == view.mode {
            Style::default()
                .fg(Color::Black)
                .bg(theme.accent)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.muted)
        };
        mode_spans.push(Span::styled(format!(" {} ", mode.label()), style));
        mode_spans.push(Span::raw(" "));
    }

    let search = view.search_text.trim();
    Paragraph::new(vec![
        Line::from(vec![
            Span::styled(
                "Dokkan Checklist",
                Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
            ),
            Span::raw("   "),
            Span::styled("Owned ", Style::default().fg(theme.muted)),
            Span::styled(
                progress.to_string(),
                Style::default().fg(theme.success).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(" ({:.1}%)", progress.percent()),
                Style::default().fg(theme.muted),
            ),
        ]),
        Line::from(mode_spans),
        Line::from(vec![
            Span::styled("Category: ", Style::default().fg(theme.muted)),
            Span::styled(view.category_label().to_string(), Style::default().fg(theme.text)),
            Span::raw("   "),
            Span::styled("View: ", Style::default().fg(theme.muted)),
            Span::styled(view.view_filter.label(), Style::default().fg(theme.text)),
            Span::raw("   "),
            Span::styled("Search: ", Style::default().fg(theme.muted)),
            Span::styled(
                if search.is_empty() { "-".to_string() } else { search.to_string() },
                Style::default().fg(theme.text),
            ),
        ]),
    ])
    .style(Style::default().bg(theme.header_bg))
    .alignment(Alignment::Center)
}

fn row_for_item(item: &Item, record: &StatusRecord, theme: &Theme) -> Row<'static> {
    let (owned_text, owned_style) = if record.owned {
        ("[x]", Style::default().fg(theme.success))
    } else {
        ("[ ]", Style::default().fg(theme.muted))
    };
    let name_style = if record.owned {
        Style::default().fg(theme.text)
    } else {
        Style::default().fg(theme.muted)
    };
    Row::new(vec![
        Cell::from(owned_text).style(owned_style),
        Cell::from(eza_badge(record.enhancement.value())).style(Style::default().fg(theme.warning)),
        Cell::from(pot_badge(record.potential.value())).style(if record.potential.value() == 4 {
            Style::default().fg(theme.rainbow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.accent)
        }),
        Cell::from(item.category.clone()),
        Cell::from(item.name.clone()).style(name_style),
    ])
}

fn eza_badge(tier: u8) -> &'static str {
    match tier {
        1 => "Z",
        2 => "Z★",
        _ => "",
    }
}

fn pot_badge(tier: u8) -> String {
    if tier == 0 {
        String::new()
    } else {
        format!("{tier}/4")
    }
}

fn build_details(app: &App, theme: &Theme) -> Vec<Line<'static>> {
    let Some(item) = app.selected_item() else {
        return vec![Line::from(Span::styled(
            "No unit selected.",
            Style::default().fg(theme.muted),
        ))];
    };
    let record = app.tracker.record(&item.id);
    let kv = |key: &'static str, value: String, style: Style| {
        Line::from(vec![
            Span::styled(key, Style::default().fg(theme.muted)),
            Span::styled(value, style),
        ])
    };
    let text = Style::default().fg(theme.text);

    let mut lines = vec![
        Line::from(Span::styled(
            item.name.clone(),
            Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        kv("Id: ", item.id.clone(), text),
        kv("Type: ", item.category.clone(), text),
        kv(
            "Owned: ",
            if record.owned { "yes" } else { "no" }.to_string(),
            if record.owned {
                Style::default().fg(theme.success)
            } else {
                Style::default().fg(theme.muted)
            },
        ),
        kv(
            "EZA: ",
            enhancement_label(record.enhancement.value()).to_string(),
            text,
        ),
        kv(
            "Potential: ",
            format!("{}/4", record.potential.value()),
            text,
        ),
    ];
    if let Some(icon) = &item.icon {
        lines.push(kv("Icon: ", icon.clone(), Style::default().fg(theme.muted)));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!("Catalog: {}", app.catalog_label),
        Style::default().fg(theme.muted),
    )));
    lines
}

fn status_bar_line(app: &App, width: u16) -> String {
    let width = width as usize;
    let (left, right) = match &app.input_mode {
        InputMode::Normal => (format!("Status: {}", app.status), app.hint().to_string()),
        InputMode::Editing { prompt, buffer, .. } => (
            format!("{prompt}: {buffer}"),
            "Enter confirm | Esc cancel".to_string(),
        ),
    };

    if width == 0 {
        return String::new();
    }

    let left_len = left.chars().count();
    let right_len = right.chars().count();
    if left_len + right_len + 1 > width {
        let available = width.saturating_sub(left_len + 1);
        let trimmed_right: String = right.chars().take(available).collect();
        return format!("{left} {trimmed_right}");
    }

    let spaces = width - left_len - right_len;
    format!("{left}{}{right}", " ".repeat(spaces))
}

fn build_log_lines(app: &App, theme: &Theme, height: usize) -> Vec<Line<'static>> {
    if height == 0 {
        return Vec::new();
    }

    if app.logs.is_empty() {
        return vec![Line::from(Span::styled(
            "No recent events.",
            Style::default().fg(theme.muted),
        ))];
    }

    let total = app.logs.len();
    let view = height.max(1);
    let max_scroll = total.saturating_sub(view);
    let scroll = app.log_scroll.min(max_scroll);
    let start = total.saturating_sub(view + scroll);
    let end = (start + view).min(total);

    app.logs[start..end]
        .iter()
        .map(|entry| {
            let (label, color) = match entry.level {
                LogLevel::Info => ("[i]", theme.accent),
                LogLevel::Warn => ("[!]", theme.warning),
                LogLevel::Error => ("[x]", theme.error),
            };
            Line::from(vec![
                Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)),
                Span::raw(" "),
                Span::styled(entry.message.clone(), Style::default().fg(theme.text)),
            ])
        })
        .collect()
}

fn draw_help(frame: &mut Frame<'_>, theme: &Theme) {
    let area = frame.size();
    let entries = [
        ("Space / Enter", "Activate selected unit in the current mode"),
        ("Tab / m, 1 2 3", "Cycle mode / Owned, EZA, Potential"),
        ("j k, g G", "Move selection, jump to first/last"),
        ("/", "Search names and types"),
        ("c / C", "Next / previous category"),
        ("f, v h x", "Cycle view / All, Hide owned, Missing only"),
        ("A / N", "Mark every unit owned / not owned"),
        ("e", "Export code (clipboard + log)"),
        ("i, paste", "Import code"),
        ("PgUp PgDn", "Scroll log"),
        ("q", "Quit"),
    ];
    let mut lines = vec![Line::from("")];
    for (keys, action) in entries {
        lines.push(Line::from(vec![
            Span::styled(
                format!("{keys:>16}  "),
                Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
            ),
            Span::styled(action, Style::default().fg(theme.text)),
        ]));
    }

    let width = 68.min(area.width.saturating_sub(2));
    let height = (lines.len() as u16 + 2).min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    let help_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, help_area);
    let help = Paragraph::new(lines)
        .block(theme.block("Help").style(Style::default().bg(theme.header_bg)))
        .style(Style::default().fg(theme.text));
    frame.render_widget(help, help_area);
}

fn draw_fatal(frame: &mut Frame<'_>, message: &str) {
    let theme = Theme::new();
    let area = frame.size();
    let mut lines = vec![
        Line::from(Span::styled(
            "Could not start",
            Style::default().fg(theme.error).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    lines.extend(message.lines().map(|line| Line::from(line.to_string())));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Press any key to exit.",
        Style::default().fg(theme.muted),
    )));
    let error = Paragraph::new(lines)
        .block(theme.panel("Error"))
        .style(Style::default().fg(theme.text))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: false });
    frame.render_widget(error, area);
}

fn render_toast(
    frame: &mut Frame<'_>,
    theme: &Theme,
    body_area: Rect,
    message: &str,
    level: ToastLevel,
) {
    if body_area.width < 5 || body_area.height < 3 {
        return;
    }
    let max_width = body_area
        .width
        .saturating_sub(4)
        .max(24)
        .min(body_area.width);
    let max_text = max_width.saturating_sub(4) as usize;
    let mut message = message.to_string();
    if message.chars().count() > max_text {
        message = message.chars().take(max_text.saturating_sub(3)).collect();
        message.push_str("...");
    }
    let text_width = u16::try_from(message.chars().count()).unwrap_or(u16::MAX);
    let width = text_width
        .saturating_add(4)
        .clamp(max_width.min(24), max_width);
    let height = 3u16;
    let x = body_area.x + (body_area.width - width) / 2;
    let y = body_area.y + (body_area.height - height).min(1);
    let toast_area = Rect::new(x, y, width, height);

    let border = match level {
        ToastLevel::Info => theme.accent,
        ToastLevel::Warn => theme.warning,
        ToastLevel::Error => theme.error,
    };

    frame.render_widget(Clear, toast_area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(theme.header_bg));
    let content = Paragraph::new(message)
        .block(block)
        .style(Style::default().fg(theme.text))
        .alignment(Alignment::Center);
    frame.render_widget(content, toast_area);
}

fn draw_toast(frame: &mut Frame<'_>, app: &App, theme: &Theme, body_area: Rect) {
    let Some(toast) = app.toast.as_ref() else {
        return;
    };
    if toast.expires_at <= Instant::now() {
        return;
    }

    render_toast(frame, theme, body_area, &toast.message, toast.level);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;

    #[test]
    fn badges_match_tiers() {
        assert_eq!(eza_badge(0), "");
        assert_eq!(eza_badge(1), "Z");
        assert_eq!(eza_badge(2), "Z★");
        assert_eq!(pot_badge(0), "");
        assert_eq!(pot_badge(3), "3/4");
    }

    fn draw_toast_at(width: u16, height: u16, message: &str) -> ratatui::buffer::Buffer {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        let theme = Theme::new();
        terminal
            .draw(|frame| {
                let area = frame.size();
                render_toast(frame, &theme, area, message, ToastLevel::Warn);
            })
            .unwrap();
        terminal.backend().buffer().clone()
    }

    #[test]
    fn toast_fits_narrow_terminals() {
        let buffer = draw_toast_at(20, 10, "Progress not saved");
        assert_eq!(buffer.area.width, 20);
        let buffer = draw_toast_at(8, 3, "Imported.");
        assert_eq!(buffer.area.width, 8);
        draw_toast_at(4, 2, "Imported.");
    }

    #[test]
    fn toast_truncates_on_char_boundaries() {
        let message = "Z★".repeat(40);
        let buffer = draw_toast_at(30, 6, &message);
        let row: String = (0..30)
            .map(|x| buffer.get(x, 2).symbol().to_string())
            .collect();
        assert!(row.contains("..."));
    }
}
