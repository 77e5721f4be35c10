// Header rendering module
//
// Renders the top bar: name, monitoring state, source health and the
// session threat indicator.

use crate::app::AppState;
use crate::theme::{BLOOD_RED, BONE_WHITE, NEON_PURPLE, PUMPKIN_ORANGE, TOXIC_GREEN};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};

pub fn render_header(f: &mut Frame, area: Rect, app: &AppState) {
    let (state_text, state_color) = if app.monitoring {
        ("● LIVE", TOXIC_GREEN)
    } else {
        ("❚❚ PAUSED", PUMPKIN_ORANGE)
    };

    let mut spans = vec![
        Span::styled(
            " ghostgraph ",
            Style::default()
                .fg(Color::Rgb(138, 43, 226))
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            ">>> real-time network graph <<<  ",
            Style::default().fg(BONE_WHITE),
        ),
        Span::styled(
            state_text,
            Style::default().fg(state_color).add_modifier(Modifier::BOLD),
        ),
    ];

    if let Some(error) = &app.fetch_error {
        spans.push(Span::styled(
            format!("  source offline: {}", error),
            Style::default().fg(PUMPKIN_ORANGE),
        ));
    }

    if app.aggregator.stats().has_threats() {
        spans.push(Span::styled(
            format!(
                "  ⚠ {} attacks this session",
                app.aggregator.stats().total_attacks
            ),
            Style::default().fg(BLOOD_RED).add_modifier(Modifier::BOLD),
        ));
    }

    let header = Paragraph::new(Line::from(spans))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Double)
                .border_style(Style::default().fg(NEON_PURPLE)),
        )
        .alignment(Alignment::Left);

    f.render_widget(header, area);
}
