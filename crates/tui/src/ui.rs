use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use sunpick_core::types::{AutomationState, Status};
use crate::App;
use crate::preview::FramePreview;

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = if app.log_visible {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(f.area())
    } else {
        Layout::default()
            .constraints([Constraint::Percentage(100)])
            .split(f.area())
    };

    // Banner, preview, stats
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0), Constraint::Length(9)])
        .split(chunks[0]);

    if let Ok(status) = app.status.lock() {
        draw_banner(f, left[0], status.state);
        draw_preview(f, left[1], &status);
        draw_stats(f, left[2], &status);
    }

    if app.log_visible && chunks.len() > 1 {
        draw_log(f, chunks[1], app);
    }

    if let Some(dialog) = &app.confirm {
        dialog.render(f);
    }
}

fn draw_banner(f: &mut Frame, area: Rect, state: AutomationState) {
    let (label, bg) = match state {
        AutomationState::Running => ("RUNNING (Press E to end)", Color::Green),
        AutomationState::Idle => ("IDLE (Press B to begin)", Color::Red),
    };
    let width = area.width as usize;
    let pad_total = width.saturating_sub(label.len());
    let pad_left = pad_total / 2;
    let centered = format!("{}{}{}", " ".repeat(pad_left), label, " ".repeat(pad_total - pad_left));
    let banner = Paragraph::new(Line::from(Span::styled(
        centered,
        Style::default().fg(Color::Black).bg(bg).add_modifier(Modifier::BOLD),
    )));
    f.render_widget(banner, area);
}

fn draw_preview(f: &mut Frame, area: Rect, status: &Status) {
    let title = if status.window_title.is_empty() {
        " Preview ".to_string()
    } else {
        format!(" {} ", status.window_title)
    };
    let block = Block::default()
        .borders(Borders::LEFT | Borders::RIGHT | Borders::BOTTOM)
        .title(title)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    f.render_widget(block, area);

    match &status.preview {
        Some(frame) => f.render_widget(FramePreview::new(frame), inner),
        None => f.render_widget(
            Paragraph::new(Line::from(Span::styled(
                "no preview",
                Style::default().fg(Color::DarkGray),
            ))),
            inner,
        ),
    }
}

fn draw_stats(f: &mut Frame, area: Rect, status: &Status) {
    let label = Style::default().fg(Color::DarkGray);
    let value = Style::default().fg(Color::White);

    let mut lines = vec![
        Line::from(vec![
            Span::styled(" frames ", label),
            Span::styled(status.frames.to_string(), value),
            Span::styled("  fps ", label),
            Span::styled(format!("{:.1}", status.fps), value),
            Span::styled("  clicks ", label),
            Span::styled(status.clicks.to_string(), value),
        ]),
        Line::from(vec![
            Span::styled(" s", Style::default().fg(Color::Yellow)),
            Span::raw(" save, "),
            Span::styled("b", Style::default().fg(Color::Yellow)),
            Span::raw("/"),
            Span::styled("e", Style::default().fg(Color::Yellow)),
            Span::raw(" begin/end, "),
            Span::styled("l", Style::default().fg(Color::Yellow)),
            Span::raw(" logs, "),
            Span::styled("q", Style::default().fg(Color::Yellow)),
            Span::raw(" quit"),
        ]),
    ];

    for d in &status.last_detections {
        let c = d.bbox.center();
        lines.push(Line::from(vec![
            Span::styled(format!("   {:<5}", d.name), Style::default().fg(Color::Yellow)),
            Span::styled(format!(" ({}, {})", c.x, c.y), value),
            Span::styled(format!("  {:.3}", d.score), label),
        ]));
    }

    if let Some(e) = &status.error {
        lines.push(Line::from(Span::styled(format!(" err: {}", e), Style::default().fg(Color::Red))));
    }

    let stats = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::LEFT | Borders::RIGHT | Borders::BOTTOM)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(stats, area);
}

fn draw_log(f: &mut Frame, area: Rect, app: &App) {
    let visible_height = area.height.saturating_sub(2) as usize;
    let total = app.log_messages.len();
    let max_scroll = total.saturating_sub(visible_height);
    let scroll = app.log_scroll.min(max_scroll);
    let start = total.saturating_sub(visible_height + scroll);
    let end = total.saturating_sub(scroll);
    let log_lines: Vec<Line> = app.log_messages[start..end]
        .iter()
        .map(|m| parse_log_line(m))
        .collect();

    let log_panel = Paragraph::new(log_lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Logs ")
                .border_style(Style::default().fg(Color::Yellow)),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(log_panel, area);
}

/// Parse a structured log line (level\x1fprefix\x1fcolor\x1ftimestamp\x1fmessage)
/// into a colored Line for TUI rendering.
fn parse_log_line(raw: &str) -> Line<'_> {
    let parts: Vec<&str> = raw.splitn(5, '\x1f').collect();
    if parts.len() < 5 {
        return Line::from(raw);
    }

    let level = parts[0];
    let prefix = parts[1];
    let color_idx: u8 = parts[2].parse().unwrap_or(0);
    let timestamp = parts[3];
    let message = parts[4];

    let line_color = match color_idx {
        1 => Color::DarkGray,  // COLOR_GRAY
        2 => Color::LightBlue, // COLOR_BLUE
        3 => Color::Green,     // COLOR_GREEN
        _ => Color::White,
    };

    let mut spans = vec![
        Span::styled(timestamp, Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
    ];

    // Only warn/error get a tag
    match level {
        "ERROR" => spans.push(Span::styled("error ", Style::default().fg(Color::Red))),
        "WARN" => spans.push(Span::styled("warn ", Style::default().fg(Color::Yellow))),
        _ => {}
    }

    if !prefix.is_empty() {
        spans.push(Span::styled(prefix, Style::default().fg(line_color).add_modifier(Modifier::BOLD)));
        spans.push(Span::raw(" "));
    }
    spans.push(Span::styled(message, Style::default().fg(line_color)));

    Line::from(spans)
}
