// ── Network devices ──
//
// Device records as seen by the two network scanners, and the per-target
// inventory they are merged into.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::target::TargetKind;

// ── MacAddress ──────────────────────────────────────────────────────

/// MAC address, normalized to lowercase colon-separated format (aa:bb:cc:dd:ee:ff).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MacAddress(String);

impl MacAddress {
    /// Accepts colon-separated or dash-separated input in any case.
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_lowercase().replace('-', ":"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn is_zero(&self) -> bool {
        self.0.chars().all(|c| c == '0' || c == ':')
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── MacKey ──────────────────────────────────────────────────────────

/// Device identity by MAC, with "the scanner could not tell" as its own
/// value rather than a magic string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MacKey {
    Known(MacAddress),
    Unknown,
}

const UNKNOWN_MARKERS: &[&str] = &["unknown", "(incomplete)", "<incomplete>", "incomplete"];

impl MacKey {
    /// Parse a scanner-reported MAC. Missing, blank, placeholder and
    /// all-zero values are all `Unknown`.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Self::Unknown;
        };
        if UNKNOWN_MARKERS.iter().any(|m| raw.eq_ignore_ascii_case(m)) {
            return Self::Unknown;
        }
        let mac = MacAddress::new(raw);
        if mac.is_zero() {
            Self::Unknown
        } else {
            Self::Known(mac)
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }

    pub fn as_known(&self) -> Option<&MacAddress> {
        match self {
            Self::Known(mac) => Some(mac),
            Self::Unknown => None,
        }
    }
}

impl From<String> for MacKey {
    fn from(raw: String) -> Self {
        Self::parse(Some(&raw))
    }
}

impl From<MacKey> for String {
    fn from(key: MacKey) -> Self {
        match key {
            MacKey::Known(mac) => mac.0,
            MacKey::Unknown => "unknown".into(),
        }
    }
}

impl fmt::Display for MacKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(mac) => mac.fmt(f),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

// ── DeviceRecord ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub mac: MacKey,
    pub ip: String,
    /// Origin or classification label reported by the scanner.
    pub interface: String,
    pub name: Option<String>,
}

impl DeviceRecord {
    /// Identity rule: equal known MACs, or matching IPs when at least one
    /// side has no known MAC (or the MACs agree).
    pub fn same_device(&self, other: &Self) -> bool {
        match (&self.mac, &other.mac) {
            (MacKey::Known(a), MacKey::Known(b)) => a == b,
            _ => !self.ip.is_empty() && self.ip == other.ip,
        }
    }

    /// A record with no known MAC and no IP cannot be matched to anything.
    pub fn has_identity(&self) -> bool {
        self.mac.is_known() || !self.ip.is_empty()
    }

    /// True when both sides carry the same known MAC.
    pub fn same_mac(&self, other: &Self) -> bool {
        matches!((&self.mac, &other.mac), (MacKey::Known(a), MacKey::Known(b)) if a == b)
    }
}

// ── Scans ───────────────────────────────────────────────────────────

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ScanSource {
    /// Cheap ARP-cache listing.
    Fast,
    /// Slow active scan with better interface and name data.
    Deep,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub source: ScanSource,
    pub target: TargetKind,
    pub taken_at: DateTime<Utc>,
    pub records: Vec<DeviceRecord>,
}

// ── DeviceInventory ─────────────────────────────────────────────────

/// Deduplicated, insertion-ordered device list for one target.
///
/// Only the merger mutates it; records are never removed except by
/// folding duplicates together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DeviceInventory {
    records: Vec<DeviceRecord>,
}

impl DeviceInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[DeviceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DeviceRecord> {
        self.records.iter()
    }

    pub(crate) fn records_mut(&mut self) -> &mut Vec<DeviceRecord> {
        &mut self.records
    }
}

impl<'a> IntoIterator for &'a DeviceInventory {
    type Item = &'a DeviceRecord;
    type IntoIter = std::slice::Iter<'a, DeviceRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
