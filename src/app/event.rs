// Keyboard and mouse event handling
//
// This module contains the input handlers that process user input and
// update the application state accordingly.

use super::AppState;
use crossterm::event::{KeyCode, MouseButton, MouseEvent, MouseEventKind};

/// Handle keyboard events and update application state
///
/// Returns `true` if the application should continue running,
/// `false` if it should exit.
///
/// # Key Bindings
/// - `q`, `Q` - Quit the application
/// - `Esc` - Clear focus, or quit when nothing is focused
/// - `Space` - Toggle monitoring
/// - `c`, `C` - Clear all session data
/// - `Tab`, `Shift-Tab` - Cycle focus through nodes
/// - `+`, `=` / `-`, `_` - Zoom in / out
/// - Arrow keys - Pan the topology
/// - `0` - Reset zoom and pan
/// - `l`, `L` - Toggle node labels
/// - `b`, `B` - Block or unblock the focused device
/// - `j` / `k` - Move the device list selection down / up
/// - `x`, `X` - Block or unblock the selected device
pub fn handle_key_event(app: &mut AppState, key: KeyCode) -> bool {
    match key {
        KeyCode::Char('q') | KeyCode::Char('Q') => {
            app.running = false;
            false
        }
        KeyCode::Esc => {
            if app.focus.is_some() {
                app.clear_focus();
                true
            } else {
                app.running = false;
                false
            }
        }
        KeyCode::Char(' ') => {
            app.toggle_monitoring();
            true
        }
        KeyCode::Char('c') | KeyCode::Char('C') => {
            app.clear_data();
            true
        }
        KeyCode::Tab => {
            app.cycle_focus(true);
            true
        }
        KeyCode::BackTab => {
            app.cycle_focus(false);
            true
        }
        KeyCode::Char('+') | KeyCode::Char('=') => {
            app.viewport.zoom_in();
            true
        }
        KeyCode::Char('-') | KeyCode::Char('_') => {
            app.viewport.zoom_out();
            true
        }
        KeyCode::Left => {
            app.viewport.pan(-1, 0);
            true
        }
        KeyCode::Right => {
            app.viewport.pan(1, 0);
            true
        }
        KeyCode::Up => {
            app.viewport.pan(0, -1);
            true
        }
        KeyCode::Down => {
            app.viewport.pan(0, 1);
            true
        }
        KeyCode::Char('0') => {
            app.viewport.reset();
            true
        }
        KeyCode::Char('l') | KeyCode::Char('L') => {
            app.labels_enabled = !app.labels_enabled;
            true
        }
        KeyCode::Char('b') | KeyCode::Char('B') => {
            app.toggle_block_focused();
            true
        }
        KeyCode::Char('j') | KeyCode::Char('J') => {
            app.select_next_device();
            true
        }
        KeyCode::Char('k') | KeyCode::Char('K') => {
            app.select_previous_device();
            true
        }
        KeyCode::Char('x') | KeyCode::Char('X') => {
            app.toggle_block_selected();
            true
        }
        _ => true,
    }
}

/// Handle mouse events on the topology canvas
///
/// Left press picks a node (focus + drag) or clears focus on empty space,
/// left drag moves the grabbed node, release lets it go. The wheel zooms.
pub fn handle_mouse_event(app: &mut AppState, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => app.press_at(mouse.column, mouse.row),
        MouseEventKind::Drag(MouseButton::Left) => app.drag_to(mouse.column, mouse.row),
        MouseEventKind::Up(MouseButton::Left) => app.release(),
        MouseEventKind::ScrollUp => app.viewport.zoom_in(),
        MouseEventKind::ScrollDown => app.viewport.zoom_out(),
        _ => {}
    }
}
