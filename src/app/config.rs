// Application configuration types
//
// This module contains configuration structs and constants for:
// - Fetch and frame cadences
// - Viewport zoom and pan limits
// - The combined application config built from the command line

use crate::graph::layout::LayoutConfig;
use crate::graph::GraphConfig;
use crate::traffic::aggregator::DEFAULT_LOG_CAPACITY;
use anyhow::{bail, Result};
use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

/// Default interval between traffic batch fetches in milliseconds
pub const DEFAULT_BATCH_INTERVAL_MS: u64 = 1000;

/// Minimum batch interval in milliseconds
pub const MIN_BATCH_INTERVAL_MS: u64 = 100;

/// Maximum batch interval in milliseconds
pub const MAX_BATCH_INTERVAL_MS: u64 = 10000;

/// Default frame interval in milliseconds (~30 fps)
pub const DEFAULT_FRAME_MS: u64 = 33;

/// Minimum frame interval in milliseconds
pub const MIN_FRAME_MS: u64 = 10;

/// Maximum frame interval in milliseconds
pub const MAX_FRAME_MS: u64 = 1000;

/// Interval between device inventory polls
pub const DEVICE_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Zoom limits and step for the topology viewport
pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 4.0;
pub const ZOOM_STEP: f64 = 1.25;

/// Pan distance per arrow key press, in screen-independent world units
pub const PAN_STEP: f64 = 40.0;

/// Hit radius for node picking, in world units at zoom 1.0
pub const PICK_RADIUS: f64 = 30.0;

// ============================================================================
// Configuration Structs
// ============================================================================

/// Fetch and frame cadences
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshConfig {
    /// Interval between batch fetches in milliseconds
    pub batch_interval_ms: u64,

    /// Interval between simulation steps and redraws in milliseconds
    pub frame_ms: u64,
}

impl RefreshConfig {
    pub fn new() -> Self {
        Self {
            batch_interval_ms: DEFAULT_BATCH_INTERVAL_MS,
            frame_ms: DEFAULT_FRAME_MS,
        }
    }

    pub fn batch_interval(&self) -> Duration {
        Duration::from_millis(self.batch_interval_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_ms)
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the application needs to start
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub refresh: RefreshConfig,
    pub graph: GraphConfig,
    pub layout: LayoutConfig,

    /// Capacity of the recent-event log
    pub log_capacity: usize,

    /// Start fetching immediately
    pub start_monitoring: bool,

    /// Seed for layout jitter
    pub seed: u64,
}

impl AppConfig {
    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.log_capacity == 0 {
            bail!("log capacity must be at least 1");
        }
        if self.graph.window_size == 0 {
            bail!("window size must be at least 1");
        }
        if self.graph.window_size > self.log_capacity {
            bail!(
                "window size {} exceeds log capacity {}",
                self.graph.window_size,
                self.log_capacity
            );
        }
        if !(MIN_BATCH_INTERVAL_MS..=MAX_BATCH_INTERVAL_MS)
            .contains(&self.refresh.batch_interval_ms)
        {
            bail!(
                "batch interval {}ms outside {}..={}ms",
                self.refresh.batch_interval_ms,
                MIN_BATCH_INTERVAL_MS,
                MAX_BATCH_INTERVAL_MS
            );
        }
        if !(MIN_FRAME_MS..=MAX_FRAME_MS).contains(&self.refresh.frame_ms) {
            bail!(
                "frame interval {}ms outside {}..={}ms",
                self.refresh.frame_ms,
                MIN_FRAME_MS,
                MAX_FRAME_MS
            );
        }
        if self.graph.plan.gateway.trim().is_empty() {
            bail!("gateway address must not be empty");
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            refresh: RefreshConfig::default(),
            graph: GraphConfig::default(),
            layout: LayoutConfig::default(),
            log_capacity: DEFAULT_LOG_CAPACITY,
            start_monitoring: true,
            seed: 0,
        }
    }
}
