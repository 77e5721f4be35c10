// Ingestion and device collaborators
//
// The graph engine only sees `TrafficSource` and `DeviceInventory`. The HTTP
// client talks to the monitoring backend; the synthetic source stands in for
// it when the backend is unreachable so the view keeps moving.

use super::{
    AttackType, Device, Protocol, SubnetPlan, SystemStats, ThreatLevel, TrafficBatch,
    TrafficEvent,
};
use crate::error::IngestError;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde_json::Value;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use sysinfo::{ProcessesToUpdate, System};
use tracing::{debug, warn};

/// Default base URL of the monitoring backend
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

/// Per-request timeout for the HTTP collaborator
const HTTP_TIMEOUT: Duration = Duration::from_secs(2);

/// Host numbers of the synthetic local fleet, appended to the subnet's base
const LOCAL_HOST_IDS: [u8; 4] = [10, 15, 22, 5];

/// Fleet members that own a managed device; the first two fleet hosts
const MANAGED_HOST_IDS: [u8; 2] = [10, 15];

/// Fleet member that runs port scans against the managed hosts
const SCANNER_HOST_ID: u8 = 22;

/// Well-known external services the synthetic fleet talks to
const EXTERNAL_HOSTS: [&str; 5] = [
    "8.8.8.8",
    "1.1.1.1",
    "142.250.185.78",
    "151.101.1.69",
    "104.16.132.229",
];

/// Addresses the synthetic source uses for inbound attacks
const HOSTILE_HOSTS: [&str; 2] = ["45.155.205.233", "185.220.101.4"];

const COMMON_PORTS: [u16; 8] = [80, 443, 21, 22, 53, 3306, 8080, 3000];

const PROTOCOLS: [Protocol; 6] = [
    Protocol::Https,
    Protocol::Https,
    Protocol::Tcp,
    Protocol::Udp,
    Protocol::Dns,
    Protocol::Quic,
];

const ATTACKS: [AttackType; 5] = [
    AttackType::PortScan,
    AttackType::Dos,
    AttackType::MalwareC2,
    AttackType::SqlInjection,
    AttackType::RansomwareBeacon,
];

/// Probability that a synthetic event is an attack
const ATTACK_PROBABILITY: f64 = 0.08;

/// Something that can be polled for traffic batches
pub trait TrafficSource {
    fn fetch_batch(&mut self) -> Result<TrafficBatch, IngestError>;
}

/// Device inventory and access control
pub trait DeviceInventory {
    fn list_devices(&mut self) -> Result<Vec<Device>, IngestError>;

    /// Block or unblock an address. Returns whether the service accepted it.
    fn set_blocked(&mut self, address: &str, blocked: bool) -> bool;
}

/// Everything the fetch worker needs from a backend
pub trait Collaborator: TrafficSource + DeviceInventory + Send {}

impl<T: TrafficSource + DeviceInventory + Send> Collaborator for T {}

/// Parse a `/traffic` response body
///
/// Individual events that fail to decode are skipped rather than failing the
/// whole batch. A missing `system` object yields default load figures.
pub fn parse_batch(body: &str) -> Result<TrafficBatch, IngestError> {
    let root: Value = serde_json::from_str(body)?;
    let packets = root
        .get("packets")
        .and_then(Value::as_array)
        .ok_or(IngestError::MissingField("packets"))?;

    let mut events = Vec::with_capacity(packets.len());
    let mut skipped = 0usize;
    for raw in packets {
        match serde_json::from_value::<TrafficEvent>(raw.clone()) {
            Ok(event) if event.is_well_formed() => events.push(event),
            Ok(event) => {
                skipped += 1;
                debug!(id = %event.id, "Skipping event with blank address");
            }
            Err(e) => {
                skipped += 1;
                debug!(error = %e, "Skipping malformed event");
            }
        }
    }
    if skipped > 0 {
        debug!(skipped, kept = events.len(), "Dropped malformed events from batch");
    }

    let system = match root.get("system") {
        Some(raw) if !raw.is_null() => serde_json::from_value(raw.clone()).unwrap_or_else(|e| {
            debug!(error = %e, "Ignoring malformed system stats");
            SystemStats::default()
        }),
        _ => SystemStats::default(),
    };

    Ok(TrafficBatch {
        events,
        system,
        fallback: None,
    })
}

/// Address prefix for single hosts of the plan's local subnet
///
/// Derived from the gateway when it is local (`192.168.1.1` gives
/// `192.168.1.`), otherwise from the local prefix padded to three octets.
pub fn host_base(plan: &SubnetPlan) -> String {
    if plan.is_local(&plan.gateway) {
        if let Some((network, _)) = plan.gateway.rsplit_once('.') {
            return format!("{}.", network);
        }
    }
    let mut base = plan.local_prefix.clone();
    if !base.is_empty() && !base.ends_with('.') {
        base.push('.');
    }
    while base.matches('.').count() < 3 {
        base.push_str("1.");
    }
    base
}

/// Devices reported when the inventory service is offline
pub fn mock_devices(plan: &SubnetPlan) -> Vec<Device> {
    let base = host_base(plan);
    vec![
        Device {
            ip: format!("{}{}", base, MANAGED_HOST_IDS[0]),
            mac: "AA:BB:CC:DD:EE:01".to_string(),
            vendor: "Apple Inc.".to_string(),
            hostname: "Admin-MacBook".to_string(),
            is_blocked: false,
        },
        Device {
            ip: format!("{}{}", base, MANAGED_HOST_IDS[1]),
            mac: "AA:BB:CC:DD:EE:02".to_string(),
            vendor: "Samsung".to_string(),
            hostname: "Galaxy-S23".to_string(),
            is_blocked: false,
        },
    ]
}

// ============================================================================
// HTTP collaborator
// ============================================================================

/// Blocking HTTP client for the monitoring backend
///
/// Only ever called from the fetch worker thread, never from the frame loop.
pub struct HttpSource {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>) -> Result<Self, IngestError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|source| IngestError::Transport {
                url: base_url.clone(),
                source,
            })?;
        Ok(Self { base_url, client })
    }

    fn get_text(&self, path: &str) -> Result<String, IngestError> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|source| IngestError::Transport {
                url: url.clone(),
                source,
            })?;
        if !response.status().is_success() {
            return Err(IngestError::Status {
                url,
                status: response.status().as_u16(),
            });
        }
        response
            .text()
            .map_err(|source| IngestError::Transport { url, source })
    }
}

impl TrafficSource for HttpSource {
    fn fetch_batch(&mut self) -> Result<TrafficBatch, IngestError> {
        let body = self.get_text("traffic")?;
        parse_batch(&body)
    }
}

impl DeviceInventory for HttpSource {
    fn list_devices(&mut self) -> Result<Vec<Device>, IngestError> {
        let body = self.get_text("devices")?;
        let raw: Vec<Value> = serde_json::from_str(&body)?;
        Ok(raw
            .into_iter()
            .filter_map(|v| serde_json::from_value::<Device>(v).ok())
            .map(|mut d| {
                if d.hostname.is_empty() {
                    d.hostname = d.ip.clone();
                }
                d
            })
            .collect())
    }

    fn set_blocked(&mut self, address: &str, blocked: bool) -> bool {
        let url = format!("{}/block", self.base_url);
        let action = if blocked { "block" } else { "unblock" };
        let body = serde_json::json!({ "ip": address, "action": action });
        match self.client.post(&url).json(&body).send() {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                warn!(address, status = resp.status().as_u16(), "Block request rejected");
                false
            }
            Err(e) => {
                warn!(address, error = %e, "Failed to toggle block status");
                false
            }
        }
    }
}

// ============================================================================
// Synthetic collaborator
// ============================================================================

/// Deterministic traffic generator
///
/// Given the same seed it produces the same sequence of endpoints, protocols
/// and attack flags. Host load figures come from the local machine.
pub struct SyntheticSource {
    rng: ChaCha8Rng,
    plan: SubnetPlan,
    host_base: String,
    next_id: u64,
    system: Option<System>,
    devices: Vec<Device>,
}

impl SyntheticSource {
    pub fn new(seed: u64, plan: SubnetPlan) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            host_base: host_base(&plan),
            devices: mock_devices(&plan),
            plan,
            next_id: 0,
            system: Some(System::new()),
        }
    }

    /// Report zeroed load instead of sampling the host
    #[cfg(test)]
    pub fn without_host_load(mut self) -> Self {
        self.system = None;
        self
    }

    fn now_millis() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    fn local_host(&self, id: u8) -> String {
        format!("{}{}", self.host_base, id)
    }

    fn pick_local(&mut self, ids: &[u8]) -> String {
        let id = ids.choose(&mut self.rng).copied().unwrap_or(LOCAL_HOST_IDS[0]);
        self.local_host(id)
    }

    fn pick_external(&mut self, hosts: &[&'static str]) -> String {
        hosts.choose(&mut self.rng).copied().unwrap_or("0.0.0.0").to_string()
    }

    fn next_event(&mut self, timestamp: u64) -> TrafficEvent {
        self.next_id += 1;
        let id = format!("syn-{}", self.next_id);
        let size = self.rng.gen_range(100..=1000);
        let source_port = self.rng.gen_range(49152..=65535);
        let dest_port = COMMON_PORTS.choose(&mut self.rng).copied().unwrap_or(443);

        if self.rng.gen::<f64>() < ATTACK_PROBABILITY {
            let kind = ATTACKS.choose(&mut self.rng).copied().unwrap_or(AttackType::PortScan);
            // Port scans come from a compromised local host, the rest from outside
            let (src, dst) = if kind == AttackType::PortScan {
                (self.local_host(SCANNER_HOST_ID), self.pick_local(&MANAGED_HOST_IDS))
            } else {
                (self.pick_external(&HOSTILE_HOSTS), self.pick_local(&LOCAL_HOST_IDS))
            };
            return TrafficEvent::new(id, timestamp, src, dst, Protocol::Tcp, size)
                .with_ports(source_port, dest_port)
                .with_attack(kind)
                .with_info(format!("{} detected", kind));
        }

        let src_id = LOCAL_HOST_IDS.choose(&mut self.rng).copied().unwrap_or(LOCAL_HOST_IDS[0]);
        let src = self.local_host(src_id);
        let mut dst = if self.rng.gen_bool(0.2) {
            let peers: Vec<u8> = LOCAL_HOST_IDS.iter().copied().filter(|id| *id != src_id).collect();
            if self.rng.gen_bool(0.5) {
                self.plan.gateway.clone()
            } else {
                self.pick_local(&peers)
            }
        } else {
            self.pick_external(&EXTERNAL_HOSTS)
        };
        // A gateway that is itself a fleet address would talk to itself
        if dst == src {
            dst = self.pick_external(&EXTERNAL_HOSTS);
        }
        let protocol = PROTOCOLS.choose(&mut self.rng).copied().unwrap_or(Protocol::Tcp);
        let mut event = TrafficEvent::new(id, timestamp, src, dst, protocol, size)
            .with_ports(source_port, dest_port)
            .with_info("Synthetic traffic (backend offline)");
        event.latency = Some(self.rng.gen_range(5.0..120.0));
        event
    }

    fn sample_load(&mut self, attacks: usize) -> SystemStats {
        let threat_level = match attacks {
            0 => ThreatLevel::Low,
            1 => ThreatLevel::Medium,
            _ => ThreatLevel::High,
        };
        let Some(system) = self.system.as_mut() else {
            return SystemStats {
                threat_level,
                ..SystemStats::default()
            };
        };

        system.refresh_cpu_usage();
        system.refresh_memory();
        system.refresh_processes(ProcessesToUpdate::All, true);

        let total = system.total_memory();
        let ram_usage = if total > 0 {
            system.used_memory() as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        SystemStats {
            cpu_usage: system.global_cpu_usage() as f64,
            ram_usage,
            active_processes: system.processes().len() as u32,
            threat_level,
        }
    }
}

impl TrafficSource for SyntheticSource {
    fn fetch_batch(&mut self) -> Result<TrafficBatch, IngestError> {
        let timestamp = Self::now_millis();
        let count = self.rng.gen_range(1..=3);
        let events: Vec<TrafficEvent> = (0..count).map(|_| self.next_event(timestamp)).collect();
        let attacks = events.iter().filter(|e| e.is_attack).count();
        let system = self.sample_load(attacks);
        Ok(TrafficBatch {
            events,
            system,
            fallback: None,
        })
    }
}

impl DeviceInventory for SyntheticSource {
    fn list_devices(&mut self) -> Result<Vec<Device>, IngestError> {
        Ok(self.devices.clone())
    }

    fn set_blocked(&mut self, address: &str, blocked: bool) -> bool {
        match self.devices.iter_mut().find(|d| d.ip == address) {
            Some(device) => {
                device.is_blocked = blocked;
                true
            }
            None => false,
        }
    }
}

// ============================================================================
// Fallback composition
// ============================================================================

/// Uses the primary collaborator, switching to the fallback per call on error
///
/// Batches served by the fallback carry the primary's error in
/// `TrafficBatch::fallback` so the caller can tell synthetic data apart.
pub struct FallbackSource<P, F> {
    primary: P,
    fallback: F,
    primary_healthy: bool,
}

impl<P, F> FallbackSource<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self {
            primary,
            fallback,
            primary_healthy: true,
        }
    }

    fn mark_ok(&mut self) {
        if !self.primary_healthy {
            tracing::info!("Primary collaborator is reachable again");
        }
        self.primary_healthy = true;
    }

    fn mark_failed(&mut self, error: &IngestError) {
        if self.primary_healthy {
            warn!(error = %error, "Primary collaborator offline, using fallback");
        } else {
            debug!(error = %error, "Primary collaborator still offline");
        }
        self.primary_healthy = false;
    }
}

impl<P: TrafficSource, F: TrafficSource> TrafficSource for FallbackSource<P, F> {
    fn fetch_batch(&mut self) -> Result<TrafficBatch, IngestError> {
        match self.primary.fetch_batch() {
            Ok(batch) => {
                self.mark_ok();
                Ok(batch)
            }
            Err(e) => {
                self.mark_failed(&e);
                let mut batch = self.fallback.fetch_batch()?;
                batch.fallback = Some(e.to_string());
                Ok(batch)
            }
        }
    }
}

impl<P: DeviceInventory, F: DeviceInventory> DeviceInventory for FallbackSource<P, F> {
    fn list_devices(&mut self) -> Result<Vec<Device>, IngestError> {
        match self.primary.list_devices() {
            Ok(devices) => Ok(devices),
            Err(e) => {
                debug!(error = %e, "Device inventory offline, using fallback");
                self.fallback.list_devices()
            }
        }
    }

    fn set_blocked(&mut self, address: &str, blocked: bool) -> bool {
        if self.primary_healthy {
            self.primary.set_blocked(address, blocked)
        } else {
            self.fallback.set_blocked(address, blocked)
        }
    }
}
