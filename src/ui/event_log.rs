// Event log rendering module
//
// Renders the most recent traffic events, newest first, with attack rows
// highlighted and process attribution when the source reports it.

use crate::app::AppState;
use crate::theme::{BLOOD_RED, BONE_WHITE, NEON_PURPLE, PUMPKIN_ORANGE, TOXIC_GREEN};
use crate::traffic::TrafficEvent;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, List, ListItem},
    Frame,
};

/// Wall-clock time of day (UTC) for a millisecond timestamp
pub fn clock(timestamp_ms: u64) -> String {
    let secs = (timestamp_ms / 1000) % 86_400;
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

fn endpoint(address: &str, port: Option<u16>) -> String {
    match port {
        Some(port) => format!("{}:{}", address, port),
        None => address.to_string(),
    }
}

/// One log row, without styling
pub fn event_line(event: &TrafficEvent) -> String {
    let mut line = format!(
        "{} {:<5} {} → {} {}B",
        clock(event.timestamp),
        event.protocol.as_str(),
        endpoint(&event.source_ip, event.source_port),
        endpoint(&event.dest_ip, event.dest_port),
        event.size
    );
    if let Some(kind) = event.attack_type.filter(|_| event.is_attack) {
        line.push_str(&format!(" [{}]", kind));
    }
    line
}

pub fn render_event_log(f: &mut Frame, area: Rect, app: &AppState) {
    // Only as many rows as fit inside the borders
    let visible = area.height.saturating_sub(2) as usize;

    let items: Vec<ListItem> = app
        .aggregator
        .recent(visible)
        .rev()
        .map(|event| {
            let (marker, color) = if event.is_attack {
                ("!", BLOOD_RED)
            } else {
                ("·", TOXIC_GREEN)
            };

            let process_tag = match (&event.process_name, event.process_id) {
                (Some(name), Some(pid)) => format!(" [{}({})]", name, pid),
                (Some(name), None) => format!(" [{}]", name),
                _ => String::new(),
            };

            let mut row_style = Style::default().fg(if event.is_attack { BLOOD_RED } else { BONE_WHITE });
            if event.is_attack {
                row_style = row_style.add_modifier(Modifier::BOLD);
            }

            ListItem::new(Line::from(vec![
                Span::styled(format!("{} ", marker), Style::default().fg(color)),
                Span::styled(event_line(event), row_style),
                Span::styled(process_tag, Style::default().fg(Color::Cyan)),
            ]))
        })
        .collect();

    let title = format!("━ Live Traffic ({}) ", app.aggregator.len());
    let border_color = if app.aggregator.stats().has_threats() {
        PUMPKIN_ORANGE
    } else {
        NEON_PURPLE
    };

    let list = List::new(items).block(
        Block::default()
            .title(Span::styled(
                title,
                Style::default()
                    .fg(border_color)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(border_color)),
    );

    f.render_widget(list, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traffic::{AttackType, Protocol};

    #[test]
    fn test_clock_formats_time_of_day() {
        assert_eq!(clock(0), "00:00:00");
        assert_eq!(clock(3_723_000), "01:02:03");
        // Wraps at midnight
        assert_eq!(clock(86_400_000 + 61_000), "00:01:01");
    }

    #[test]
    fn test_event_line_with_ports_and_attack() {
        let event = TrafficEvent::new("e", 0, "45.1.1.1", "192.168.1.10", Protocol::Tcp, 40)
            .with_ports(51515, 22)
            .with_attack(AttackType::PortScan);
        assert_eq!(
            event_line(&event),
            "00:00:00 TCP   45.1.1.1:51515 → 192.168.1.10:22 40B [Port Scan]"
        );
    }

    #[test]
    fn test_event_line_benign_without_ports() {
        let event = TrafficEvent::new("e", 1_000, "192.168.1.10", "8.8.8.8", Protocol::Dns, 64);
        assert_eq!(event_line(&event), "00:00:01 DNS   192.168.1.10 → 8.8.8.8 64B");
    }
}
