// Status Bar rendering module
//
// Renders the bottom status bar with keyboard shortcuts and toggle indicators.

use crate::app::AppState;
use crate::theme::{BONE_WHITE, FOCUS_GOLD, NEON_PURPLE, TOXIC_GREEN};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};

struct Hint {
    priority: u8,
    key: &'static str,
    desc: &'static str,
    color: Color,
}

fn hints(app: &AppState) -> Vec<Hint> {
    let monitor_desc = if app.monitoring {
        "Pause | "
    } else {
        "Resume | "
    };
    let esc_desc = if app.focus.is_some() {
        "Unfocus | "
    } else {
        "Quit | "
    };

    vec![
        Hint {
            priority: 1,
            key: "Q:",
            desc: "Quit | ",
            color: Color::Red,
        },
        Hint {
            priority: 1,
            key: "Space:",
            desc: monitor_desc,
            color: NEON_PURPLE,
        },
        Hint {
            priority: 1,
            key: "Tab:",
            desc: "Focus | ",
            color: NEON_PURPLE,
        },
        Hint {
            priority: 1,
            key: "Esc:",
            desc: esc_desc,
            color: NEON_PURPLE,
        },
        Hint {
            priority: 2,
            key: "C:",
            desc: "Clear | ",
            color: NEON_PURPLE,
        },
        Hint {
            priority: 2,
            key: "+/-:",
            desc: "Zoom | ",
            color: NEON_PURPLE,
        },
        Hint {
            priority: 2,
            key: "←↑↓→:",
            desc: "Pan | ",
            color: NEON_PURPLE,
        },
        Hint {
            priority: 3,
            key: "0:",
            desc: "Reset view | ",
            color: NEON_PURPLE,
        },
        Hint {
            priority: 3,
            key: "L:",
            desc: "Labels | ",
            color: NEON_PURPLE,
        },
        Hint {
            priority: 3,
            key: "B:",
            desc: "Block | ",
            color: NEON_PURPLE,
        },
        Hint {
            priority: 3,
            key: "J/K:",
            desc: "Devices | ",
            color: NEON_PURPLE,
        },
        Hint {
            priority: 3,
            key: "X:",
            desc: "Block device | ",
            color: NEON_PURPLE,
        },
    ]
}

pub fn render_status_bar(f: &mut Frame, area: Rect, app: &AppState) {
    // Calculate available width for hints (subtract borders and icon)
    let available_width = area.width.saturating_sub(4) as usize;

    let indicators = build_toggle_indicators(app);
    let indicator_width: usize = indicators.iter().map(|s| s.width()).sum();

    let mut spans = vec![Span::styled(" ◈ ", Style::default().fg(NEON_PURPLE))];
    let mut current_length = 3 + indicator_width;

    // Add hints by priority until we run out of space
    let hints = hints(app);
    for priority in 1..=3 {
        for hint in hints.iter().filter(|h| h.priority == priority) {
            let hint_length = hint.key.chars().count() + hint.desc.len();
            if current_length + hint_length <= available_width {
                spans.push(Span::styled(
                    hint.key,
                    Style::default().fg(hint.color).add_modifier(Modifier::BOLD),
                ));
                spans.push(Span::raw(hint.desc));
                current_length += hint_length;
            }
        }
    }

    spans.extend(indicators);

    if let Some(notice) = &app.notice {
        spans.push(Span::styled(
            format!(" {}", notice),
            Style::default().fg(FOCUS_GOLD),
        ));
    }

    let status_bar = Paragraph::new(Line::from(spans))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Double)
                .border_style(Style::default().fg(NEON_PURPLE)),
        )
        .alignment(Alignment::Left);

    f.render_widget(status_bar, area);
}

fn indicator(key: &'static str, on: bool) -> Vec<Span<'static>> {
    let (state, color) = if on {
        ("ON", TOXIC_GREEN)
    } else {
        ("OFF", BONE_WHITE)
    };
    vec![
        Span::styled(format!("[{}:", key), Style::default().fg(BONE_WHITE)),
        Span::styled(state, Style::default().fg(color).add_modifier(Modifier::BOLD)),
        Span::styled("] ", Style::default().fg(BONE_WHITE)),
    ]
}

/// Build toggle status indicator spans for the status bar
/// Shows [MON:ON/OFF] [LBL:ON/OFF] and the zoom factor
pub fn build_toggle_indicators(app: &AppState) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    spans.extend(indicator("MON", app.monitoring));
    spans.extend(indicator("LBL", app.labels_enabled));
    spans.push(Span::styled("[x", Style::default().fg(BONE_WHITE)));
    spans.push(Span::styled(
        format!("{:.2}", app.viewport.zoom),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    ));
    spans.push(Span::styled("]", Style::default().fg(BONE_WHITE)));
    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppConfig;

    fn text(spans: &[Span]) -> String {
        spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_indicators_reflect_toggles() {
        let mut app = AppState::new(AppConfig::default(), None);
        assert_eq!(text(&build_toggle_indicators(&app)), "[MON:ON] [LBL:ON] [x1.00]");

        app.monitoring = false;
        app.labels_enabled = false;
        app.viewport.zoom_in();
        assert_eq!(text(&build_toggle_indicators(&app)), "[MON:OFF] [LBL:OFF] [x1.25]");
    }

    #[test]
    fn test_esc_hint_follows_focus() {
        let mut app = AppState::new(AppConfig::default(), None);
        let esc = |app: &AppState| hints(app).into_iter().find(|h| h.key == "Esc:").map(|h| h.desc);
        assert_eq!(esc(&app), Some("Quit | "));
        app.focus = Some("192.168.1.1".to_string());
        assert_eq!(esc(&app), Some("Unfocus | "));
    }
}
