// UI rendering module
//
// This module contains all UI rendering components for ghostgraph.
// The main draw() function orchestrates rendering of all UI panels.

mod devices;
mod event_log;
mod header;
mod stats;
mod status_bar;
mod topology;

use crate::app::AppState;
use ratatui::{
    layout::{Constraint, Direction, Layout},
    Frame,
};

use devices::render_devices;
use event_log::render_event_log;
use header::render_header;
use stats::{render_protocols, render_session_stats, render_system_stats};
use status_bar::render_status_bar;
use topology::render_topology;

/// Main UI drawing function
pub fn draw(f: &mut Frame, app: &mut AppState) {
    let size = f.area();

    // Main layout: header, body, status bar
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Body
            Constraint::Length(3), // Status bar
        ])
        .split(size);

    render_header(f, chunks[0], app);

    // Body: topology + right panels
    let body_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(65), // Topology
            Constraint::Percentage(35), // Right panels
        ])
        .split(chunks[1]);

    render_topology(f, body_chunks[0], app);

    // Right side: session, system, devices, protocols, live traffic
    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(8),
            Constraint::Length(5),
            Constraint::Length(6),
            Constraint::Length(8),
            Constraint::Min(3),
        ])
        .split(body_chunks[1]);

    render_session_stats(f, right_chunks[0], app);
    render_system_stats(f, right_chunks[1], app);
    render_devices(f, right_chunks[2], app);
    render_protocols(f, right_chunks[3], app);
    render_event_log(f, right_chunks[4], app);

    render_status_bar(f, chunks[2], app);
}
