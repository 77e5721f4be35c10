// Application state management
//
// This module contains the main AppState struct that ties the traffic
// aggregator, the graph model and the layout simulation together, and drives
// the two cadences: batch fetches and per-frame simulation steps.

pub mod config;
pub mod event;
pub mod viewport;

pub use config::{AppConfig, RefreshConfig};
pub use viewport::Viewport;

use crate::graph::layout::ForceLayout;
use crate::graph::{GraphModel, GraphNode};
use crate::traffic::aggregator::SessionAggregator;
use crate::traffic::worker::{FetchRequest, FetchResponse, FetchWorker};
use crate::traffic::{Device, SystemStats, TrafficBatch};
use config::DEVICE_POLL_INTERVAL;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Main application state
pub struct AppState {
    /// Whether the application is running
    pub running: bool,

    /// Whether batches are being fetched; the layout animates either way
    pub monitoring: bool,

    pub config: AppConfig,

    pub aggregator: SessionAggregator,
    pub graph: GraphModel,
    pub layout: ForceLayout,

    /// Address of the focused node
    pub focus: Option<String>,

    /// Host load from the latest batch
    pub system: SystemStats,

    /// Latest device inventory; survives data resets
    pub devices: Vec<Device>,

    /// Currently selected row of the device list
    pub selected_device: Option<usize>,

    /// Last primary source failure, cleared by the next batch the primary
    /// source serves itself
    pub fetch_error: Option<String>,

    /// One-line feedback for the status bar
    pub notice: Option<String>,

    /// Show address labels on the topology
    pub labels_enabled: bool,

    pub viewport: Viewport,

    worker: Option<FetchWorker>,
    traffic_in_flight: bool,
    devices_in_flight: bool,
    last_fetch: Option<Instant>,
    last_device_poll: Option<Instant>,
}

impl AppState {
    /// Create the application around an optional fetch worker
    ///
    /// Without a worker nothing is fetched; batches can still be applied
    /// through `apply_response`.
    pub fn new(config: AppConfig, worker: Option<FetchWorker>) -> Self {
        let aggregator = SessionAggregator::new(config.log_capacity);
        let graph = GraphModel::new(config.graph.clone());
        let layout = ForceLayout::new(config.layout.clone(), graph.gateway(), config.seed);
        let viewport = Viewport::new(config.layout.width, config.layout.height);

        Self {
            running: true,
            monitoring: config.start_monitoring,
            config,
            aggregator,
            graph,
            layout,
            focus: None,
            system: SystemStats::default(),
            devices: Vec::new(),
            selected_device: None,
            fetch_error: None,
            notice: None,
            labels_enabled: true,
            viewport,
            worker,
            traffic_in_flight: false,
            devices_in_flight: false,
            last_fetch: None,
            last_device_poll: None,
        }
    }

    /// Advance one frame: drain fetch results, schedule fetches, step the layout
    pub fn on_tick(&mut self) {
        let now = Instant::now();

        while let Some(response) = self.worker.as_ref().and_then(FetchWorker::try_recv) {
            self.apply_response(response);
        }

        if self.monitoring && !self.traffic_in_flight && self.is_due(self.last_fetch, now) {
            if self.send(FetchRequest::Traffic) {
                self.traffic_in_flight = true;
            }
            self.last_fetch = Some(now);
        }

        let device_due = self
            .last_device_poll
            .map_or(true, |last| now.duration_since(last) >= DEVICE_POLL_INTERVAL);
        if device_due && !self.devices_in_flight {
            if self.send(FetchRequest::Devices) {
                self.devices_in_flight = true;
            }
            self.last_device_poll = Some(now);
        }

        self.layout.step();
    }

    fn is_due(&self, last: Option<Instant>, now: Instant) -> bool {
        last.map_or(true, |last| {
            now.duration_since(last) >= self.config.refresh.batch_interval()
        })
    }

    fn send(&mut self, request: FetchRequest) -> bool {
        let Some(worker) = self.worker.as_ref() else {
            return false;
        };
        match worker.request(request) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Fetch worker unavailable");
                self.fetch_error = Some(e.to_string());
                false
            }
        }
    }

    /// Fold one worker response into the state
    pub fn apply_response(&mut self, response: FetchResponse) {
        match response {
            FetchResponse::Traffic(result) => {
                self.traffic_in_flight = false;
                match result {
                    Ok(batch) => {
                        // Fallback batches still animate the view, flagged as synthetic
                        self.fetch_error = batch.fallback.clone();
                        self.ingest_batch(batch);
                    }
                    Err(e) => {
                        warn!(error = %e, "Traffic fetch failed");
                        self.fetch_error = Some(e.to_string());
                    }
                }
            }
            FetchResponse::Devices(result) => {
                self.devices_in_flight = false;
                match result {
                    Ok(devices) => {
                        self.devices = devices;
                        self.selected_device = match self.selected_device {
                            Some(_) if self.devices.is_empty() => None,
                            Some(idx) => Some(idx.min(self.devices.len() - 1)),
                            None => None,
                        };
                    }
                    Err(e) => debug!(error = %e, "Device poll failed"),
                }
            }
            FetchResponse::Blocked {
                address,
                blocked,
                ok,
            } => {
                let action = if blocked { "block" } else { "unblock" };
                if ok {
                    if let Some(device) = self.devices.iter_mut().find(|d| d.ip == address) {
                        device.is_blocked = blocked;
                    }
                    self.notice = Some(format!("{}ed {}", action, address));
                } else {
                    warn!(address = %address, action, "Device service rejected request");
                    self.notice = Some(format!("Failed to {} {}", action, address));
                }
            }
        }
    }

    /// Record a batch and reconcile the graph with the new window
    pub fn ingest_batch(&mut self, batch: TrafficBatch) {
        self.system = batch.system;
        if batch.events.is_empty() {
            return;
        }
        self.aggregator.ingest(batch.events);
        self.rebuild_graph();
    }

    fn rebuild_graph(&mut self) {
        let window = self.graph.config().window_size;
        let delta = self.graph.update(self.aggregator.recent(window));
        self.layout.sync(&self.graph, &delta);

        if let Some(focus) = &self.focus {
            if !self.graph.contains(focus) {
                debug!(address = %focus, "Focused node left the graph");
                self.focus = None;
            }
        }
    }

    /// Drop logs, counters, topology and focus together
    pub fn clear_data(&mut self) {
        self.aggregator.reset();
        let delta = self.graph.reset();
        self.layout.teardown();
        self.layout.sync(&self.graph, &delta);
        self.focus = None;
        self.notice = None;
        info!("Session data cleared");
    }

    pub fn toggle_monitoring(&mut self) {
        self.monitoring = !self.monitoring;
        info!(monitoring = self.monitoring, "Monitoring toggled");
    }

    pub fn focused_node(&self) -> Option<&GraphNode> {
        self.focus.as_deref().and_then(|id| self.graph.node(id))
    }

    pub fn clear_focus(&mut self) {
        self.focus = None;
    }

    /// Move focus to the next (or previous) node in address order
    pub fn cycle_focus(&mut self, forward: bool) {
        let ids: Vec<&str> = self.graph.nodes().map(|n| n.id.as_str()).collect();
        if ids.is_empty() {
            self.focus = None;
            return;
        }
        let current = self
            .focus
            .as_deref()
            .and_then(|f| ids.iter().position(|id| *id == f));
        let next = match (current, forward) {
            (None, true) => 0,
            (None, false) => ids.len() - 1,
            (Some(i), true) => (i + 1) % ids.len(),
            (Some(i), false) => (i + ids.len() - 1) % ids.len(),
        };
        self.focus = Some(ids[next].to_string());
    }

    /// Pointer pressed on the canvas: focus and grab a node, or clear focus
    pub fn press_at(&mut self, column: u16, row: u16) {
        let Some((x, y)) = self.viewport.screen_to_world(column, row) else {
            return;
        };
        let radius = self.viewport.pick_radius();
        match self.layout.node_at(x, y, radius).map(str::to_string) {
            Some(id) => {
                self.layout.drag_start(&id, x, y);
                self.focus = Some(id);
            }
            None => self.focus = None,
        }
    }

    /// Pointer dragged: move the grabbed node's pin
    pub fn drag_to(&mut self, column: u16, row: u16) {
        if self.layout.dragging().is_none() {
            return;
        }
        if let Some((x, y)) = self.viewport.screen_to_world(column, row) {
            self.layout.drag_to(x, y);
        }
    }

    pub fn release(&mut self) {
        self.layout.drag_end();
    }

    /// Number of inventory devices currently allowed on the network
    pub fn online_devices(&self) -> usize {
        self.devices.iter().filter(|d| !d.is_blocked).count()
    }

    /// Ask the device service to flip the block state of the focused device
    pub fn toggle_block_focused(&mut self) {
        let Some(focus) = self.focus.clone() else {
            return;
        };
        let Some(device) = self.devices.iter().find(|d| d.ip == focus) else {
            self.notice = Some(format!("{} is not a managed device", focus));
            return;
        };
        let blocked = !device.is_blocked;
        self.request_block(focus, blocked);
    }

    /// Flip the block state of the device selected in the device list
    ///
    /// Works for devices that are not part of the current graph.
    pub fn toggle_block_selected(&mut self) {
        let Some(device) = self.selected_device.and_then(|idx| self.devices.get(idx)) else {
            self.notice = Some("No device selected".to_string());
            return;
        };
        let (address, blocked) = (device.ip.clone(), !device.is_blocked);
        self.request_block(address, blocked);
    }

    fn request_block(&mut self, address: String, blocked: bool) {
        self.send(FetchRequest::SetBlocked { address, blocked });
    }

    /// Move device selection up (decrease index)
    pub fn select_previous_device(&mut self) {
        if self.devices.is_empty() {
            self.selected_device = None;
            return;
        }
        self.selected_device = Some(match self.selected_device {
            // Start at the last device
            None => self.devices.len() - 1,
            Some(idx) => idx.saturating_sub(1),
        });
    }

    /// Move device selection down (increase index)
    pub fn select_next_device(&mut self) {
        if self.devices.is_empty() {
            self.selected_device = None;
            return;
        }
        self.selected_device = Some(match self.selected_device {
            None => 0,
            Some(idx) => (idx + 1).min(self.devices.len() - 1),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IngestError;
    use crate::graph::NodeClass;
    use crate::traffic::source::{
        mock_devices, DeviceInventory, FallbackSource, SyntheticSource, TrafficSource,
    };
    use crate::traffic::{AttackType, Protocol, SubnetPlan, TrafficEvent};
    use proptest::prelude::*;
    use ratatui::layout::Rect;
    use std::thread;
    use std::time::Duration;

    const GW: &str = "192.168.1.1";

    fn app() -> AppState {
        let config = AppConfig {
            start_monitoring: false,
            ..AppConfig::default()
        };
        AppState::new(config, None)
    }

    fn ev(id: usize, src: &str, dst: &str) -> TrafficEvent {
        TrafficEvent::new(format!("e{}", id), id as u64, src, dst, Protocol::Tcp, 100)
    }

    fn batch(events: Vec<TrafficEvent>) -> FetchResponse {
        FetchResponse::Traffic(Ok(TrafficBatch {
            events,
            system: SystemStats::default(),
            fallback: None,
        }))
    }

    #[test]
    fn test_initial_state_is_gateway_only() {
        let app = app();
        assert_eq!(app.graph.node_count(), 1);
        assert_eq!(app.layout.len(), 1);
        assert_eq!(app.aggregator.stats().total_events, 0);
        assert!(app.focus.is_none());
    }

    #[test]
    fn test_batch_updates_stats_graph_and_layout() {
        let mut app = app();
        app.apply_response(batch(vec![ev(1, "192.168.1.10", "8.8.8.8")]));

        assert_eq!(app.aggregator.stats().total_events, 1);
        assert_eq!(app.graph.node_count(), 3);
        assert_eq!(app.layout.len(), 3);
        assert_eq!(app.graph.link_weight("192.168.1.10", GW), 1);
        assert_eq!(app.graph.link_weight(GW, "8.8.8.8"), 1);
    }

    #[test]
    fn test_failed_fetch_is_not_fatal() {
        let mut app = app();
        app.apply_response(batch(vec![ev(1, "192.168.1.10", "8.8.8.8")]));
        app.apply_response(FetchResponse::Traffic(Err(IngestError::Status {
            url: "http://localhost:5000/api/traffic".to_string(),
            status: 503,
        })));

        assert!(app.fetch_error.as_deref().unwrap_or("").contains("503"));
        assert_eq!(app.graph.node_count(), 3);

        app.apply_response(batch(vec![ev(2, "192.168.1.10", "1.1.1.1")]));
        assert!(app.fetch_error.is_none());
    }

    struct Down;

    impl TrafficSource for Down {
        fn fetch_batch(&mut self) -> Result<TrafficBatch, IngestError> {
            Err(IngestError::Status {
                url: "http://localhost:5000/api/traffic".to_string(),
                status: 503,
            })
        }
    }

    impl DeviceInventory for Down {
        fn list_devices(&mut self) -> Result<Vec<Device>, IngestError> {
            Err(IngestError::Status {
                url: "http://localhost:5000/api/devices".to_string(),
                status: 503,
            })
        }

        fn set_blocked(&mut self, _address: &str, _blocked: bool) -> bool {
            false
        }
    }

    fn tick_until(app: &mut AppState, done: impl Fn(&AppState) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done(&*app) {
            assert!(Instant::now() < deadline, "worker did not deliver in time");
            app.on_tick();
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_backend_outage_is_surfaced_while_fallback_feeds_graph() {
        let synthetic =
            SyntheticSource::new(4, SubnetPlan::default()).without_host_load();
        let worker = FetchWorker::spawn(FallbackSource::new(Down, synthetic)).unwrap();
        let mut app = AppState::new(AppConfig::default(), Some(worker));

        tick_until(&mut app, |app| app.aggregator.stats().total_events > 0);

        assert!(app.fetch_error.as_deref().unwrap_or("").contains("503"));
        assert!(app.graph.node_count() > 1);
    }

    #[test]
    fn test_fallback_batch_sets_error_and_primary_batch_clears_it() {
        let mut app = app();
        app.apply_response(FetchResponse::Traffic(Ok(TrafficBatch {
            events: vec![ev(1, "192.168.1.10", "8.8.8.8")],
            system: SystemStats::default(),
            fallback: Some("HTTP 503".to_string()),
        })));
        assert_eq!(app.fetch_error.as_deref(), Some("HTTP 503"));
        assert_eq!(app.aggregator.stats().total_events, 1);

        app.apply_response(batch(vec![ev(2, "192.168.1.10", "1.1.1.1")]));
        assert!(app.fetch_error.is_none());
    }

    #[test]
    fn test_focus_cleared_when_node_leaves_window() {
        let mut config = AppConfig {
            start_monitoring: false,
            ..AppConfig::default()
        };
        config.graph.window_size = 1;
        let mut app = AppState::new(config, None);

        app.apply_response(batch(vec![ev(1, "192.168.1.10", "8.8.8.8")]));
        app.focus = Some("8.8.8.8".to_string());
        app.apply_response(batch(vec![ev(2, "192.168.1.10", "192.168.1.15")]));

        assert!(!app.graph.contains("8.8.8.8"));
        assert!(app.focus.is_none());
    }

    #[test]
    fn test_focus_does_not_change_classification() {
        let mut app = app();
        app.apply_response(batch(vec![
            ev(1, "192.168.1.10", "192.168.1.15").with_attack(AttackType::ArpSpoof),
        ]));
        app.focus = Some("192.168.1.10".to_string());
        assert_eq!(app.focused_node().map(|n| n.class), Some(NodeClass::Attacker));
        app.clear_focus();
        assert_eq!(
            app.graph.node("192.168.1.10").map(|n| n.class),
            Some(NodeClass::Attacker)
        );
    }

    #[test]
    fn test_clear_data_is_total() {
        let mut app = app();
        app.devices = mock_devices(&SubnetPlan::default());
        app.apply_response(batch(vec![
            ev(1, "192.168.1.10", "8.8.8.8"),
            ev(2, "45.1.1.1", "192.168.1.10").with_attack(AttackType::Dos),
        ]));
        app.focus = Some("192.168.1.10".to_string());

        app.clear_data();

        assert_eq!(app.aggregator.stats().total_events, 0);
        assert!(app.aggregator.is_empty());
        assert_eq!(app.graph.node_count(), 1);
        assert!(app.graph.links().is_empty());
        assert_eq!(app.layout.len(), 1);
        assert_eq!(app.layout.position(GW), Some((400.0, 300.0)));
        assert!(app.focus.is_none());
        // Device inventory is not session data
        assert_eq!(app.online_devices(), 2);
    }

    #[test]
    fn test_cycle_focus_wraps_in_address_order() {
        let mut app = app();
        app.apply_response(batch(vec![ev(1, "192.168.1.10", "192.168.1.15")]));

        app.cycle_focus(true);
        assert_eq!(app.focus.as_deref(), Some(GW));
        app.cycle_focus(true);
        assert_eq!(app.focus.as_deref(), Some("192.168.1.10"));
        app.cycle_focus(false);
        app.cycle_focus(false);
        assert_eq!(app.focus.as_deref(), Some("192.168.1.15"));
    }

    #[test]
    fn test_press_on_gateway_focuses_and_drags() {
        let mut app = app();
        app.viewport.set_area(Rect::new(0, 0, 80, 30));

        // Gateway sits at the world center, which is the middle cell
        app.press_at(40, 15);
        assert_eq!(app.focus.as_deref(), Some(GW));
        assert_eq!(app.layout.dragging(), Some(GW));

        app.release();
        assert!(app.layout.dragging().is_none());

        // Corner is empty space
        app.press_at(0, 0);
        assert!(app.focus.is_none());
    }

    #[test]
    fn test_block_outcome_updates_inventory() {
        let mut app = app();
        app.devices = mock_devices(&SubnetPlan::default());
        let ip = app.devices[0].ip.clone();

        app.apply_response(FetchResponse::Blocked {
            address: ip.clone(),
            blocked: true,
            ok: true,
        });
        assert_eq!(app.online_devices(), 1);

        app.apply_response(FetchResponse::Blocked {
            address: ip,
            blocked: false,
            ok: false,
        });
        assert_eq!(app.online_devices(), 1);
        assert!(app.notice.as_deref().unwrap_or("").starts_with("Failed"));
    }

    #[test]
    fn test_device_selection_stays_in_bounds() {
        let mut app = app();
        app.select_next_device();
        assert_eq!(app.selected_device, None);

        app.devices = mock_devices(&SubnetPlan::default());
        app.select_previous_device();
        assert_eq!(app.selected_device, Some(1));
        app.select_next_device();
        assert_eq!(app.selected_device, Some(1));
        app.select_previous_device();
        app.select_previous_device();
        assert_eq!(app.selected_device, Some(0));

        // A shrinking inventory pulls the selection back in range
        app.selected_device = Some(1);
        let mut shorter = mock_devices(&SubnetPlan::default());
        shorter.truncate(1);
        app.apply_response(FetchResponse::Devices(Ok(shorter)));
        assert_eq!(app.selected_device, Some(0));
        app.apply_response(FetchResponse::Devices(Ok(Vec::new())));
        assert_eq!(app.selected_device, None);
    }

    #[test]
    fn test_unblock_device_outside_graph_from_list() {
        let worker = FetchWorker::spawn(
            SyntheticSource::new(8, SubnetPlan::default()).without_host_load(),
        )
        .unwrap();
        let config = AppConfig {
            start_monitoring: false,
            ..AppConfig::default()
        };
        let mut app = AppState::new(config, Some(worker));
        tick_until(&mut app, |app| !app.devices.is_empty());
        assert_eq!(app.graph.node_count(), 1);

        app.select_next_device();
        app.select_next_device();
        let ip = app.devices[1].ip.clone();
        assert!(!app.graph.contains(&ip));

        app.toggle_block_selected();
        tick_until(&mut app, |app| app.devices[1].is_blocked);
        assert_eq!(app.notice.as_deref(), Some(format!("blocked {}", ip).as_str()));

        app.toggle_block_selected();
        tick_until(&mut app, |app| !app.devices[1].is_blocked);
        assert_eq!(app.online_devices(), 2);
    }

    #[test]
    fn test_block_without_selection_reports_notice() {
        let mut app = app();
        app.devices = mock_devices(&SubnetPlan::default());
        app.toggle_block_selected();
        assert_eq!(app.notice.as_deref(), Some("No device selected"));
    }

    #[test]
    fn test_block_requires_managed_device() {
        let mut app = app();
        app.focus = Some("8.8.8.8".to_string());
        app.toggle_block_focused();
        assert!(app.notice.is_some());
    }

    #[test]
    fn test_tick_without_worker_only_animates() {
        let mut app = app();
        app.monitoring = true;
        app.apply_response(batch(vec![ev(1, "192.168.1.10", "8.8.8.8")]));
        let before = app.layout.alpha();
        app.on_tick();
        assert!(app.layout.alpha() < before);
        assert_eq!(app.aggregator.stats().total_events, 1);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Focus never points at a node outside the graph after a batch
        #[test]
        fn prop_focus_always_valid(
            pairs in proptest::collection::vec((1u8..20, 1u8..20), 1..40),
            window in 1usize..10,
            focus_pick in 0usize..20,
        ) {
            let mut config = AppConfig { start_monitoring: false, ..AppConfig::default() };
            config.graph.window_size = window;
            let mut app = AppState::new(config, None);

            for (i, (a, b)) in pairs.iter().enumerate() {
                let nodes: Vec<String> = app.graph.nodes().map(|n| n.id.clone()).collect();
                app.focus = nodes.get(focus_pick % nodes.len()).cloned();
                app.apply_response(batch(vec![ev(
                    i,
                    &format!("192.168.1.{}", a),
                    &format!("10.0.0.{}", b),
                )]));
                if let Some(focus) = &app.focus {
                    prop_assert!(app.graph.contains(focus));
                }
                prop_assert_eq!(app.layout.len(), app.graph.node_count());
            }
        }
    }
}
