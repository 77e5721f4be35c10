// Topology (Network Map) rendering module
//
// Renders the force-directed graph: a summary line and a Braille canvas with
// links, class-sized node circles and optional labels. The canvas reads
// positions from the layout and never writes back.

use crate::app::{AppState, Viewport};
use crate::graph::{GraphLink, GraphModel, NodeClass};
use crate::theme::{
    interpolate_color, node_color, BLOOD_RED, BONE_WHITE, DIM_SLATE, FOCUS_GOLD, NEON_PURPLE,
};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Circle, Line as CanvasLine},
        Block, BorderType, Borders, Paragraph,
    },
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Maximum display width of a node label in cells
const MAX_LABEL_WIDTH: usize = 15;

/// How a link is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStyle {
    Normal,
    /// Touches an attacker
    Hostile,
    /// Incident to the focused node
    Focused,
    /// Something else is focused
    Dimmed,
}

/// Pick the drawing style of a link
///
/// Focus highlighting wins over hostile coloring so the focused
/// neighbourhood stays readable.
pub fn link_style(link: &GraphLink, graph: &GraphModel, focus: Option<&str>) -> LinkStyle {
    if let Some(focus) = focus {
        if link.key.touches(focus) {
            return LinkStyle::Focused;
        }
    }
    let hostile = [link.source(), link.target()]
        .iter()
        .any(|id| graph.node(id).map(|n| n.class) == Some(NodeClass::Attacker));
    if hostile {
        LinkStyle::Hostile
    } else if focus.is_some() {
        LinkStyle::Dimmed
    } else {
        LinkStyle::Normal
    }
}

/// Truncate a label to a display width, appending "…" when cut
pub fn truncate_label(label: &str, max_width: usize) -> String {
    if label.width() <= max_width {
        return label.to_string();
    }
    let mut out = String::new();
    let mut width = 0;
    for ch in label.chars() {
        let w = ch.width().unwrap_or(0);
        if width + w + 1 > max_width {
            break;
        }
        out.push(ch);
        width += w;
    }
    out.push('…');
    out
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeView {
    pub id: String,
    pub label: String,
    pub class: NodeClass,
    pub x: f64,
    pub y: f64,
    pub focused: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkView {
    pub from: (f64, f64),
    pub to: (f64, f64),
    pub weight: u32,
    pub style: LinkStyle,
}

/// Everything the canvas needs for one frame, in world coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct TopologyView {
    pub nodes: Vec<NodeView>,
    pub links: Vec<LinkView>,
    pub max_weight: u32,
}

/// Join the graph's classification with the layout's positions
///
/// Nodes without a body yet (none in practice, since sync runs with every
/// update) are skipped rather than drawn at the origin.
pub fn build_topology_view(app: &AppState) -> TopologyView {
    let focus = app.focus.as_deref();

    let nodes: Vec<NodeView> = app
        .graph
        .nodes()
        .filter_map(|node| {
            let (x, y) = app.layout.position(&node.id)?;
            let text = if node.class == NodeClass::Gateway {
                node.label.as_str()
            } else {
                node.id.as_str()
            };
            Some(NodeView {
                id: node.id.clone(),
                label: truncate_label(text, MAX_LABEL_WIDTH),
                class: node.class,
                x,
                y,
                focused: focus == Some(node.id.as_str()),
            })
        })
        .collect();

    let links: Vec<LinkView> = app
        .graph
        .links()
        .iter()
        .filter_map(|link| {
            let from = app.layout.position(link.source())?;
            let to = app.layout.position(link.target())?;
            Some(LinkView {
                from,
                to,
                weight: link.weight,
                style: link_style(link, &app.graph, focus),
            })
        })
        .collect();

    let max_weight = links.iter().map(|l| l.weight).max().unwrap_or(0);

    TopologyView {
        nodes,
        links,
        max_weight,
    }
}

fn link_color(link: &LinkView, max_weight: u32) -> Color {
    match link.style {
        LinkStyle::Focused => FOCUS_GOLD,
        LinkStyle::Hostile => BLOOD_RED,
        LinkStyle::Dimmed => DIM_SLATE,
        LinkStyle::Normal => {
            // Busier links glow brighter
            let ratio = if max_weight == 0 {
                0.0
            } else {
                link.weight as f32 / max_weight as f32
            };
            interpolate_color((86, 95, 137), (187, 154, 247), ratio)
        }
    }
}

pub fn render_topology(f: &mut Frame, area: Rect, app: &mut AppState) {
    // Split: summary line + canvas
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(0)])
        .split(area);

    let canvas_block = Block::default()
        .borders(Borders::BOTTOM | Borders::LEFT | Borders::RIGHT)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(NEON_PURPLE));

    // Mouse picking needs the exact cells the canvas paints into
    app.viewport.set_area(canvas_block.inner(chunks[1]));

    let view = build_topology_view(app);
    render_summary(f, chunks[0], app, &view);

    let x_bounds = app.viewport.x_bounds();
    let y_bounds = app.viewport.y_bounds();
    let labels_enabled = app.labels_enabled;
    let is_quiet = app.aggregator.is_empty();

    let canvas = Canvas::default()
        .block(canvas_block)
        .marker(Marker::Braille)
        .x_bounds(x_bounds)
        .y_bounds(y_bounds)
        .paint(move |ctx| {
            // Links first so nodes sit on top
            for link in &view.links {
                let (x1, y1) = Viewport::to_canvas(link.from.0, link.from.1);
                let (x2, y2) = Viewport::to_canvas(link.to.0, link.to.1);
                ctx.draw(&CanvasLine {
                    x1,
                    y1,
                    x2,
                    y2,
                    color: link_color(link, view.max_weight),
                });
            }
            ctx.layer();

            for node in &view.nodes {
                let (x, y) = Viewport::to_canvas(node.x, node.y);
                let color = if node.focused {
                    FOCUS_GOLD
                } else {
                    node_color(node.class)
                };
                ctx.draw(&Circle {
                    x,
                    y,
                    radius: node.class.radius(),
                    color,
                });
                if node.focused {
                    ctx.draw(&Circle {
                        x,
                        y,
                        radius: node.class.radius() + 6.0,
                        color: FOCUS_GOLD,
                    });
                }
            }

            if labels_enabled {
                for node in &view.nodes {
                    let (x, y) = Viewport::to_canvas(node.x, node.y);
                    let mut style = Style::default().fg(node_color(node.class));
                    if node.focused {
                        style = style.fg(FOCUS_GOLD).add_modifier(Modifier::BOLD);
                    }
                    ctx.print(
                        x + node.class.radius() + 2.0,
                        y,
                        Span::styled(node.label.clone(), style),
                    );
                }
            }

            if is_quiet {
                let (x, y) = Viewport::to_canvas(400.0, 360.0);
                ctx.print(
                    x - 100.0,
                    y,
                    Span::styled(
                        "Waiting for traffic...",
                        Style::default().fg(BONE_WHITE).add_modifier(Modifier::ITALIC),
                    ),
                );
            }
        });

    f.render_widget(canvas, chunks[1]);
}

fn render_summary(f: &mut Frame, area: Rect, app: &AppState, view: &TopologyView) {
    let mut spans = vec![
        Span::styled(" ◈ ", Style::default().fg(NEON_PURPLE)),
        Span::styled(
            format!(
                "Nodes: {} | Links: {} | Attackers: {}",
                view.nodes.len(),
                view.links.len(),
                app.graph.count_by_class(NodeClass::Attacker)
            ),
            Style::default().fg(BONE_WHITE),
        ),
    ];

    if let Some(node) = app.focused_node() {
        let degree = app.graph.incident_links(&node.id).count();
        spans.push(Span::styled(" | Focus: ", Style::default().fg(BONE_WHITE)));
        spans.push(Span::styled(
            format!(
                "{} ({}, {} link{})",
                node.id,
                node.class.name(),
                degree,
                if degree == 1 { "" } else { "s" }
            ),
            Style::default().fg(FOCUS_GOLD).add_modifier(Modifier::BOLD),
        ));
    }

    let summary = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::TOP | Borders::LEFT | Borders::RIGHT)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(NEON_PURPLE))
            .title(Span::styled(
                "━ Network Topology ━",
                Style::default()
                    .fg(NEON_PURPLE)
                    .add_modifier(Modifier::BOLD),
            )),
    );
    f.render_widget(summary, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppConfig;
    use crate::traffic::{AttackType, Protocol, SystemStats, TrafficBatch, TrafficEvent};

    fn app_with(events: Vec<TrafficEvent>) -> AppState {
        let config = AppConfig {
            start_monitoring: false,
            ..AppConfig::default()
        };
        let mut app = AppState::new(config, None);
        app.ingest_batch(TrafficBatch {
            events,
            system: SystemStats::default(),
            fallback: None,
        });
        app
    }

    fn ev(src: &str, dst: &str) -> TrafficEvent {
        TrafficEvent::new("e", 0, src, dst, Protocol::Https, 10)
    }

    #[test]
    fn test_truncate_label() {
        assert_eq!(truncate_label("8.8.8.8", 15), "8.8.8.8");
        assert_eq!(truncate_label("2001:db8:85a3::8a2e:370:7334", 15), "2001:db8:85a3:…");
        assert_eq!(truncate_label("2001:db8:85a3::8a2e", 15).width(), 15);
    }

    #[test]
    fn test_truncate_label_counts_wide_chars() {
        let label = truncate_label("호스트호스트호스트", 7);
        assert!(label.width() <= 7);
        assert!(label.ends_with('…'));
    }

    #[test]
    fn test_view_joins_graph_and_layout() {
        let app = app_with(vec![ev("192.168.1.10", "8.8.8.8")]);
        let view = build_topology_view(&app);

        assert_eq!(view.nodes.len(), 3);
        assert_eq!(view.links.len(), 2);
        assert_eq!(view.max_weight, 1);
        let gateway = view.nodes.iter().find(|n| n.class == NodeClass::Gateway).unwrap();
        assert_eq!(gateway.label, "Gateway");
        assert_eq!((gateway.x, gateway.y), (400.0, 300.0));
    }

    #[test]
    fn test_attacker_links_are_hostile() {
        let app = app_with(vec![
            ev("192.168.1.10", "192.168.1.15").with_attack(AttackType::ArpSpoof),
            ev("192.168.1.15", "8.8.8.8"),
        ]);
        let view = build_topology_view(&app);

        let hostile = view.links.iter().filter(|l| l.style == LinkStyle::Hostile).count();
        assert_eq!(hostile, 1);
        assert!(view.links.iter().all(|l| l.style != LinkStyle::Dimmed));
    }

    #[test]
    fn test_focus_highlights_incident_links_and_dims_others() {
        let mut app = app_with(vec![
            ev("192.168.1.10", "192.168.1.15"),
            ev("192.168.1.22", "8.8.8.8"),
        ]);
        app.focus = Some("192.168.1.10".to_string());
        let view = build_topology_view(&app);

        let focused = view.links.iter().filter(|l| l.style == LinkStyle::Focused).count();
        let dimmed = view.links.iter().filter(|l| l.style == LinkStyle::Dimmed).count();
        assert_eq!(focused, 1);
        assert_eq!(dimmed, 2);
        assert_eq!(view.nodes.iter().filter(|n| n.focused).count(), 1);
    }

    #[test]
    fn test_link_color_scales_with_weight() {
        let link = |weight| LinkView {
            from: (0.0, 0.0),
            to: (1.0, 1.0),
            weight,
            style: LinkStyle::Normal,
        };
        assert_eq!(link_color(&link(4), 4), NEON_PURPLE);
        assert_ne!(link_color(&link(1), 4), NEON_PURPLE);
        assert_eq!(link_color(&link(0), 0), Color::Rgb(86, 95, 137));
    }
}
