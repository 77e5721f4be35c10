// Session and system stats rendering module
//
// Renders the right-hand summary panels: session counters with the threat
// indicator, host load gauges, and the protocol distribution bar chart.

use crate::app::AppState;
use crate::theme::{
    threat_color, usage_color, BLOOD_RED, BONE_WHITE, NEON_PURPLE, PUMPKIN_ORANGE, TOXIC_GREEN,
};
use crate::traffic::aggregator::SessionStats;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, BorderType, Borders, Gauge, Paragraph},
    Frame,
};

/// Maximum number of protocols shown in the distribution chart
const MAX_PROTOCOL_BARS: usize = 8;

/// Human-readable byte count (1024-based)
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// View model for the session panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub total_events: u64,
    pub total_attacks: u64,
    pub bytes: String,
    pub active_ips: usize,
    pub flagged: usize,
    pub devices_online: usize,
    pub threats_detected: bool,
}

impl SessionSummary {
    pub fn new(stats: &SessionStats, devices_online: usize) -> Self {
        Self {
            total_events: stats.total_events,
            total_attacks: stats.total_attacks,
            bytes: format_bytes(stats.total_bytes),
            active_ips: stats.active_ip_count(),
            flagged: stats.flagged_addresses.len(),
            devices_online,
            threats_detected: stats.has_threats(),
        }
    }
}

fn panel(title: &str, color: ratatui::style::Color) -> Block<'_> {
    Block::default()
        .title(Span::styled(
            format!("━ {} ", title),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(color))
}

pub fn render_session_stats(f: &mut Frame, area: Rect, app: &AppState) {
    let summary = SessionSummary::new(app.aggregator.stats(), app.online_devices());

    let row = |label: &str, value: String, color| {
        Line::from(vec![
            Span::styled(format!(" {:<14}", label), Style::default().fg(BONE_WHITE)),
            Span::styled(value, Style::default().fg(color).add_modifier(Modifier::BOLD)),
        ])
    };

    let attack_color = if summary.total_attacks > 0 {
        BLOOD_RED
    } else {
        TOXIC_GREEN
    };

    let mut lines = vec![
        row("Packets", summary.total_events.to_string(), NEON_PURPLE),
        row("Attacks", summary.total_attacks.to_string(), attack_color),
        row("Traffic", summary.bytes.clone(), NEON_PURPLE),
        row("Active IPs", summary.active_ips.to_string(), NEON_PURPLE),
        row("Devices online", summary.devices_online.to_string(), TOXIC_GREEN),
    ];

    lines.push(if summary.threats_detected {
        Line::from(Span::styled(
            format!(" ⚠ THREATS DETECTED ({} sources)", summary.flagged),
            Style::default()
                .fg(BLOOD_RED)
                .add_modifier(Modifier::BOLD | Modifier::SLOW_BLINK),
        ))
    } else {
        Line::from(Span::styled(
            " ✓ No threats detected",
            Style::default().fg(TOXIC_GREEN),
        ))
    });

    let paragraph = Paragraph::new(lines).block(panel("Session", NEON_PURPLE));
    f.render_widget(paragraph, area);
}

pub fn render_system_stats(f: &mut Frame, area: Rect, app: &AppState) {
    let block = panel("System", PUMPKIN_ORANGE);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(inner);

    let system = &app.system;
    let gauge = |label: &str, percent: f64| {
        let clamped = percent.clamp(0.0, 100.0);
        Gauge::default()
            .gauge_style(Style::default().fg(usage_color(clamped)))
            .ratio(clamped / 100.0)
            .label(format!("{} {:.1}%", label, clamped))
    };

    f.render_widget(gauge("CPU", system.cpu_usage), rows[0]);
    f.render_widget(gauge("RAM", system.ram_usage), rows[1]);

    let info = Line::from(vec![
        Span::styled(
            format!(" Processes: {}  ", system.active_processes),
            Style::default().fg(BONE_WHITE),
        ),
        Span::styled("Threat: ", Style::default().fg(BONE_WHITE)),
        Span::styled(
            system.threat_level.as_str(),
            Style::default()
                .fg(threat_color(system.threat_level))
                .add_modifier(Modifier::BOLD),
        ),
    ]);
    f.render_widget(Paragraph::new(info), rows[2]);
}

pub fn render_protocols(f: &mut Frame, area: Rect, app: &AppState) {
    let distribution = app.aggregator.stats().protocol_distribution();

    let bars: Vec<Bar> = distribution
        .iter()
        .take(MAX_PROTOCOL_BARS)
        .map(|(protocol, count)| {
            Bar::default()
                .label(Line::from(protocol.as_str()))
                .value(*count)
                .style(Style::default().fg(NEON_PURPLE))
                .value_style(Style::default().fg(BONE_WHITE).add_modifier(Modifier::BOLD))
        })
        .collect();

    let chart = BarChart::default()
        .block(panel("Protocols", TOXIC_GREEN))
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0)
        .data(BarGroup::default().bars(&bars));

    f.render_widget(chart, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traffic::aggregator::SessionAggregator;
    use crate::traffic::{AttackType, Protocol, TrafficEvent};

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_session_summary_from_stats() {
        let mut agg = SessionAggregator::new(10);
        agg.ingest(vec![
            TrafficEvent::new("a", 1, "192.168.1.10", "8.8.8.8", Protocol::Dns, 2048),
            TrafficEvent::new("b", 2, "45.1.1.1", "192.168.1.10", Protocol::Tcp, 0)
                .with_attack(AttackType::PortScan),
        ]);

        let summary = SessionSummary::new(agg.stats(), 2);
        assert_eq!(summary.total_events, 2);
        assert_eq!(summary.total_attacks, 1);
        assert_eq!(summary.bytes, "2.0 KB");
        assert_eq!(summary.active_ips, 3);
        assert_eq!(summary.flagged, 1);
        assert_eq!(summary.devices_online, 2);
        assert!(summary.threats_detected);
    }

    #[test]
    fn test_empty_session_has_no_threats() {
        let summary = SessionSummary::new(&SessionStats::default(), 0);
        assert!(!summary.threats_detected);
        assert_eq!(summary.bytes, "0 B");
    }
}
