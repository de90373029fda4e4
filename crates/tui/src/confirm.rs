use crossterm::event::KeyCode;
use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

/// Modal Yes/No question drawn over the whole UI. Starts on "No".
pub struct ConfirmDialog {
    pub message: String,
    pub yes: bool,
}

impl ConfirmDialog {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), yes: false }
    }

    /// Feed a key to the dialog. `Some(answer)` once the user has decided.
    pub fn handle(&mut self, code: KeyCode) -> Option<bool> {
        match code {
            KeyCode::Left | KeyCode::Right | KeyCode::Tab => {
                self.yes = !self.yes;
                None
            }
            KeyCode::Enter => Some(self.yes),
            KeyCode::Char('y') | KeyCode::Char('Y') => Some(true),
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => Some(false),
            _ => None,
        }
    }

    pub fn render(&self, f: &mut Frame) {
        let width = (self.message.chars().count() as u16 + 6).max(32);
        let area = centered_rect(width, 6, f.area());
        f.render_widget(Clear, area);

        let button = |label: &'static str, on: bool, bg: Color| {
            if on {
                Span::styled(label, Style::default().fg(Color::Black).bg(bg).add_modifier(Modifier::BOLD))
            } else {
                Span::styled(label, Style::default().fg(Color::DarkGray))
            }
        };
        let lines = vec![
            Line::from(""),
            Line::from(Span::styled(self.message.as_str(), Style::default().fg(Color::White))),
            Line::from(""),
            Line::from(vec![
                button("  [Yes]  ", self.yes, Color::Green),
                Span::raw("   "),
                button("  [No]  ", !self.yes, Color::Red),
            ]),
        ];

        let dialog = Paragraph::new(lines).alignment(Alignment::Center).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow))
                .title(" Confirm "),
        );
        f.render_widget(dialog, area);
    }
}

/// Return a centered `Rect` of `width` columns and `height` rows inside `area`.
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}
