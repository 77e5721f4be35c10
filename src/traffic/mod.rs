// Traffic event model
//
// Immutable records delivered by the ingestion API, the batch envelope that
// carries them, and the address conventions (gateway, local subnet) shared by
// the aggregator, the graph builder and the synthetic source.

pub mod aggregator;
pub mod source;
pub mod worker;

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Gateway address used when none is configured
pub const DEFAULT_GATEWAY: &str = "192.168.1.1";

/// Address prefix that marks a host as part of the local subnet
pub const DEFAULT_LOCAL_PREFIX: &str = "192.168.";

/// Protocol tag carried by every event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    Tcp,
    Udp,
    Http,
    Https,
    Arp,
    Icmp,
    Ssh,
    Dns,
    Quic,
    /// Any tag the ingestion API sends that we do not know about
    #[serde(other)]
    Other,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "TCP",
            Self::Udp => "UDP",
            Self::Http => "HTTP",
            Self::Https => "HTTPS",
            Self::Arp => "ARP",
            Self::Icmp => "ICMP",
            Self::Ssh => "SSH",
            Self::Dns => "DNS",
            Self::Quic => "QUIC",
            Self::Other => "OTHER",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attack category reported alongside flagged events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackType {
    #[serde(rename = "DoS/DDoS")]
    Dos,
    #[serde(rename = "Port Scan")]
    PortScan,
    #[serde(rename = "ARP Spoof")]
    ArpSpoof,
    #[serde(rename = "Malware C2")]
    MalwareC2,
    #[serde(rename = "Ransomware Beacon")]
    RansomwareBeacon,
    #[serde(rename = "SQL Injection")]
    SqlInjection,
    #[serde(rename = "MITM")]
    Mitm,
    #[serde(other)]
    Other,
}

impl AttackType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dos => "DoS/DDoS",
            Self::PortScan => "Port Scan",
            Self::ArpSpoof => "ARP Spoof",
            Self::MalwareC2 => "Malware C2",
            Self::RansomwareBeacon => "Ransomware Beacon",
            Self::SqlInjection => "SQL Injection",
            Self::Mitm => "MITM",
            Self::Other => "Unknown",
        }
    }
}

impl fmt::Display for AttackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single observed traffic event
///
/// Field names follow the ingestion API's camelCase JSON. `id`, `timestamp`,
/// both addresses, `protocol` and `size` are required; an event missing any
/// of them is skipped by the batch parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficEvent {
    pub id: String,

    /// Milliseconds since the Unix epoch
    #[serde(deserialize_with = "deserialize_millis")]
    pub timestamp: u64,

    pub source_ip: String,
    pub dest_ip: String,
    pub protocol: Protocol,

    /// Payload size in bytes
    pub size: u64,

    #[serde(default)]
    pub source_port: Option<u16>,
    #[serde(default)]
    pub dest_port: Option<u16>,

    /// Free-text description
    #[serde(default)]
    pub info: String,

    #[serde(default)]
    pub is_attack: bool,
    #[serde(default)]
    pub attack_type: Option<AttackType>,

    /// Round-trip latency in milliseconds, when measured
    #[serde(default)]
    pub latency: Option<f64>,

    #[serde(default)]
    pub process_name: Option<String>,
    #[serde(default)]
    pub process_id: Option<u32>,
    #[serde(default)]
    pub device_mac: Option<String>,
}

impl TrafficEvent {
    /// Create a benign event with the required fields set
    pub fn new(
        id: impl Into<String>,
        timestamp: u64,
        source_ip: impl Into<String>,
        dest_ip: impl Into<String>,
        protocol: Protocol,
        size: u64,
    ) -> Self {
        Self {
            id: id.into(),
            timestamp,
            source_ip: source_ip.into(),
            dest_ip: dest_ip.into(),
            protocol,
            size,
            source_port: None,
            dest_port: None,
            info: String::new(),
            is_attack: false,
            attack_type: None,
            latency: None,
            process_name: None,
            process_id: None,
            device_mac: None,
        }
    }

    /// Flag this event as an attack of the given category
    pub fn with_attack(mut self, kind: AttackType) -> Self {
        self.is_attack = true;
        self.attack_type = Some(kind);
        self
    }

    pub fn with_ports(mut self, source_port: u16, dest_port: u16) -> Self {
        self.source_port = Some(source_port);
        self.dest_port = Some(dest_port);
        self
    }

    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = info.into();
        self
    }

    /// Both endpoints must carry a non-blank address
    pub fn is_well_formed(&self) -> bool {
        !self.source_ip.trim().is_empty() && !self.dest_ip.trim().is_empty()
    }
}

// The API may send timestamps as floats (e.g. from a Python backend)
fn deserialize_millis<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    if raw.is_finite() && raw >= 0.0 {
        Ok(raw as u64)
    } else {
        Err(serde::de::Error::custom(format!("invalid timestamp {}", raw)))
    }
}

/// Overall threat assessment reported by the ingestion API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ThreatLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl ThreatLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

/// Host load snapshot delivered with every batch
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SystemStats {
    /// CPU usage in percent
    pub cpu_usage: f64,
    /// RAM usage in percent
    pub ram_usage: f64,
    pub active_processes: u32,
    pub threat_level: ThreatLevel,
}

/// One poll's worth of data from the ingestion API
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrafficBatch {
    pub events: Vec<TrafficEvent>,
    pub system: SystemStats,

    /// Set when the primary source failed and these events are synthetic;
    /// holds the primary's error
    pub fallback: Option<String>,
}

/// A device known to the inventory service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub ip: String,
    #[serde(default)]
    pub mac: String,
    #[serde(default = "unknown_vendor")]
    pub vendor: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub is_blocked: bool,
}

fn unknown_vendor() -> String {
    "Unknown".to_string()
}

/// Address conventions of the observed network
///
/// The graph treats the gateway as the forced hop for all traffic leaving
/// the local subnet; "local" is a plain prefix match on the address string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetPlan {
    pub gateway: String,
    pub local_prefix: String,
}

impl SubnetPlan {
    pub fn new(gateway: impl Into<String>, local_prefix: impl Into<String>) -> Self {
        Self {
            gateway: gateway.into(),
            local_prefix: local_prefix.into(),
        }
    }

    pub fn is_gateway(&self, address: &str) -> bool {
        address == self.gateway
    }

    pub fn is_local(&self, address: &str) -> bool {
        address.starts_with(&self.local_prefix)
    }

    /// Display label for an address
    ///
    /// Pure lookup used only for presentation, never for classification.
    pub fn resolve_label(&self, address: &str) -> String {
        if self.is_gateway(address) {
            "Gateway".to_string()
        } else if self.is_local(address) {
            "Local Device".to_string()
        } else {
            address.to_string()
        }
    }
}

impl Default for SubnetPlan {
    fn default() -> Self {
        Self::new(DEFAULT_GATEWAY, DEFAULT_LOCAL_PREFIX)
    }
}
