// Device list rendering module
//
// Renders the device inventory as a table with a selectable row, so devices
// can be blocked or unblocked even when they are not on the topology.

use crate::app::AppState;
use crate::theme::{BLOOD_RED, BONE_WHITE, DIM_SLATE, FOCUS_GOLD, NEON_PURPLE, TOXIC_GREEN};
use crate::traffic::Device;
use ratatui::{
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    text::Span,
    widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

fn device_row(device: &Device) -> Row<'static> {
    let (state, color) = if device.is_blocked {
        ("BLOCKED", BLOOD_RED)
    } else {
        ("ONLINE", TOXIC_GREEN)
    };
    let hostname = if device.hostname.is_empty() {
        device.ip.clone()
    } else {
        device.hostname.clone()
    };
    Row::new(vec![
        Cell::from(device.ip.clone()),
        Cell::from(hostname),
        Cell::from(Span::styled(
            state,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )),
        Cell::from(device.vendor.clone()),
        Cell::from(device.mac.clone()),
    ])
    .style(Style::default().fg(BONE_WHITE))
}

pub fn render_devices(f: &mut Frame, area: Rect, app: &AppState) {
    let title = format!(
        "━ Devices ({}/{} online) ",
        app.online_devices(),
        app.devices.len()
    );
    let block = Block::default()
        .title(Span::styled(
            title,
            Style::default()
                .fg(NEON_PURPLE)
                .add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(NEON_PURPLE));

    if app.devices.is_empty() {
        let empty = Paragraph::new("No devices reported")
            .style(Style::default().fg(DIM_SLATE))
            .block(block);
        f.render_widget(empty, area);
        return;
    }

    let header = Row::new(vec!["IP", "Host", "State", "Vendor", "MAC"]).style(
        Style::default()
            .fg(NEON_PURPLE)
            .add_modifier(Modifier::BOLD),
    );

    let table = Table::new(
        app.devices.iter().map(device_row),
        [
            Constraint::Length(15),
            Constraint::Min(10),
            Constraint::Length(7),
            Constraint::Length(10),
            Constraint::Length(17),
        ],
    )
    .header(header)
    .block(block)
    .row_highlight_style(Style::default().fg(FOCUS_GOLD).add_modifier(Modifier::BOLD))
    .highlight_symbol("▶ ");

    let mut state = TableState::default().with_selected(app.selected_device);
    f.render_stateful_widget(table, area, &mut state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppConfig;
    use crate::traffic::source::mock_devices;
    use crate::traffic::SubnetPlan;
    use ratatui::{backend::TestBackend, Terminal};

    fn render(app: &AppState, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal
            .draw(|f| render_devices(f, f.area(), app))
            .unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_devices_panel_lists_inventory() {
        let mut app = AppState::new(AppConfig::default(), None);
        app.devices = mock_devices(&SubnetPlan::default());
        app.devices[1].is_blocked = true;
        app.selected_device = Some(1);

        let text = render(&app, 90, 7);
        assert!(text.contains("Devices (1/2 online)"));
        assert!(text.contains("192.168.1.10"));
        assert!(text.contains("Admin-MacBook"));
        assert!(text.contains("Galaxy-S23"));
        assert!(text.contains("BLOCKED"));
        assert!(text.contains("ONLINE"));
        assert!(text.contains("AA:BB:CC:DD:EE:02"));
    }

    #[test]
    fn test_devices_panel_empty_inventory() {
        let app = AppState::new(AppConfig::default(), None);
        let text = render(&app, 50, 5);
        assert!(text.contains("No devices reported"));
    }
}
