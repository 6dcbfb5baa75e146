// ── API-to-domain conversions ──

use chrono::{DateTime, Utc};
use tracing::debug;

use jetdash_api::NetworkDevice;

use crate::model::{DeviceRecord, MacKey, ScanResult, ScanSource, TargetKind};

impl From<NetworkDevice> for DeviceRecord {
    fn from(d: NetworkDevice) -> Self {
        Self {
            mac: MacKey::parse(d.mac.as_deref()),
            ip: d.ip.trim().to_owned(),
            interface: d.interface.map(|s| s.trim().to_owned()).unwrap_or_default(),
            name: d
                .name
                .map(|s| s.trim().to_owned())
                .filter(|s| !s.is_empty()),
        }
    }
}

impl ScanResult {
    pub fn from_devices(
        source: ScanSource,
        target: TargetKind,
        taken_at: DateTime<Utc>,
        devices: Vec<NetworkDevice>,
    ) -> Self {
        let mut records: Vec<DeviceRecord> = devices.into_iter().map(DeviceRecord::from).collect();
        let before = records.len();
        records.retain(DeviceRecord::has_identity);
        if records.len() < before {
            debug!(
                target_kind = %target,
                %source,
                dropped = before - records.len(),
                "dropped scan entries with no MAC and no IP"
            );
        }
        Self {
            source,
            target,
            taken_at,
            records,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_name_and_missing_interface() {
        let rec = DeviceRecord::from(NetworkDevice {
            ip: " 192.168.1.4 ".into(),
            mac: Some("(incomplete)".into()),
            interface: None,
            name: Some("  ".into()),
        });
        assert_eq!(rec.ip, "192.168.1.4");
        assert_eq!(rec.mac, MacKey::Unknown);
        assert_eq!(rec.interface, "");
        assert_eq!(rec.name, None);
    }

    #[test]
    fn entries_without_mac_or_ip_are_dropped() {
        let result = ScanResult::from_devices(
            ScanSource::Fast,
            TargetKind::Local,
            Utc::now(),
            vec![
                NetworkDevice {
                    ip: String::new(),
                    mac: None,
                    interface: Some("arp cache".into()),
                    name: None,
                },
                NetworkDevice {
                    ip: String::new(),
                    mac: Some("AA:BB:CC:00:00:09".into()),
                    interface: None,
                    name: None,
                },
            ],
        );
        assert_eq!(result.records.len(), 1);
        assert!(result.records[0].mac.is_known());
    }
}
