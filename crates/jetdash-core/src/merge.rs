// ── Device reconciliation ──
//
// Folds fast (ARP cache) and deep (active scan) results into one
// inventory per target. Records are matched by MAC first, then by IP
// under the identity rule in `DeviceRecord::same_device`.

use tracing::trace;

use crate::model::{DeviceInventory, DeviceRecord, ScanResult};

/// Interface labels that carry no real origin information.
pub const DEFAULT_GENERIC_INTERFACES: &[&str] = &["arp cache", "generic", "unknown"];

/// Counts from one merge pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub added: usize,
    pub updated: usize,
    /// Existing records folded into another after a merge revealed they
    /// were the same device.
    pub coalesced: usize,
}

#[derive(Debug, Clone)]
pub struct Merger {
    generic_interfaces: Vec<String>,
}

impl Default for Merger {
    fn default() -> Self {
        Self::new(DEFAULT_GENERIC_INTERFACES.iter().map(|s| (*s).to_owned()))
    }
}

impl Merger {
    pub fn new(generic_interfaces: impl IntoIterator<Item = String>) -> Self {
        Self {
            generic_interfaces: generic_interfaces
                .into_iter()
                .map(|s| s.trim().to_lowercase())
                .collect(),
        }
    }

    /// Empty labels are always generic.
    pub fn is_generic(&self, interface: &str) -> bool {
        let label = interface.trim();
        label.is_empty()
            || self
                .generic_interfaces
                .iter()
                .any(|g| label.eq_ignore_ascii_case(g))
    }

    /// Apply one scan to `inventory`. Never removes a device.
    pub fn merge(&self, inventory: &mut DeviceInventory, scan: &ScanResult) -> MergeStats {
        let records = inventory.records_mut();
        let mut stats = MergeStats::default();

        for incoming in scan.records.iter().filter(|r| r.has_identity()) {
            let found = records
                .iter()
                .position(|m| m.same_mac(incoming))
                .or_else(|| records.iter().position(|m| m.same_device(incoming)));

            match found {
                Some(idx) => {
                    if let Some(existing) = records.get_mut(idx) {
                        *existing = self.combine(existing, incoming);
                    }
                    stats.updated += 1;
                    stats.coalesced += self.coalesce(records, idx);
                }
                None => {
                    records.push(incoming.clone());
                    stats.added += 1;
                }
            }
        }

        trace!(
            target_kind = %scan.target,
            source = %scan.source,
            added = stats.added,
            updated = stats.updated,
            coalesced = stats.coalesced,
            "merged scan"
        );
        stats
    }

    /// `incoming` overrides `existing` field by field, except that a known
    /// MAC is never lost and a specific interface label is never replaced
    /// by a generic one.
    fn combine(&self, existing: &DeviceRecord, incoming: &DeviceRecord) -> DeviceRecord {
        let mac = if incoming.mac.is_known() {
            incoming.mac.clone()
        } else {
            existing.mac.clone()
        };
        let ip = if incoming.ip.is_empty() {
            existing.ip.clone()
        } else {
            incoming.ip.clone()
        };
        let interface = if self.is_generic(&existing.interface) && !self.is_generic(&incoming.interface)
        {
            incoming.interface.clone()
        } else {
            existing.interface.clone()
        };
        DeviceRecord {
            mac,
            ip,
            interface,
            name: incoming.name.clone().or_else(|| existing.name.clone()),
        }
    }

    /// Fold every other record that now matches `records[idx]` into it.
    /// Returns how many were folded.
    fn coalesce(&self, records: &mut Vec<DeviceRecord>, mut idx: usize) -> usize {
        let mut folded = 0;
        loop {
            let Some(anchor) = records.get(idx) else {
                return folded;
            };
            let dup = records
                .iter()
                .enumerate()
                .position(|(j, r)| j != idx && anchor.same_device(r));
            let Some(j) = dup else {
                return folded;
            };

            let other = records.remove(j);
            if j < idx {
                idx -= 1;
            }
            if let Some(anchor) = records.get_mut(idx) {
                *anchor = self.fill_gaps(anchor, other);
            }
            folded += 1;
        }
    }

    /// Keep `primary`, taking from `other` only what `primary` lacks.
    fn fill_gaps(&self, primary: &DeviceRecord, other: DeviceRecord) -> DeviceRecord {
        DeviceRecord {
            mac: if primary.mac.is_known() {
                primary.mac.clone()
            } else {
                other.mac
            },
            ip: if primary.ip.is_empty() {
                other.ip
            } else {
                primary.ip.clone()
            },
            interface: if self.is_generic(&primary.interface) && !self.is_generic(&other.interface)
            {
                other.interface
            } else {
                primary.interface.clone()
            },
            name: primary.name.clone().or(other.name),
        }
    }
}
