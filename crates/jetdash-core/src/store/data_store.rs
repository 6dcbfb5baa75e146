// ── Snapshot store ──
//
// One `watch` slot per (target, kind). Slots are written only by the
// reconciler (and the gate slot by the gate task); everyone else reads
// point-in-time snapshots or subscribes to changes.

use std::sync::Arc;

use tokio::sync::watch;

use crate::model::{
    DockerService, GateState, GpuInfo, HardwareSentinel, InventorySnapshot, PendingOperation,
    PowerModeState, ScalarSnapshot, SystemInfo, TargetKind, TargetSet, TargetStatus,
};
use crate::stream::SnapshotStream;

/// Slots for one target.
pub(crate) struct TargetSlots {
    pub(crate) status: watch::Sender<TargetStatus>,
    pub(crate) system_info: watch::Sender<ScalarSnapshot<SystemInfo>>,
    pub(crate) gpu_info: watch::Sender<ScalarSnapshot<GpuInfo>>,
    pub(crate) docker_services: watch::Sender<ScalarSnapshot<Vec<DockerService>>>,
    pub(crate) power_mode: watch::Sender<ScalarSnapshot<PowerModeState>>,
    pub(crate) hardware_sentinel: watch::Sender<ScalarSnapshot<HardwareSentinel>>,
    pub(crate) inventory: watch::Sender<InventorySnapshot>,
}

impl TargetSlots {
    fn new(status: TargetStatus) -> Self {
        Self {
            status: watch::channel(status).0,
            system_info: watch::channel(ScalarSnapshot::loading()).0,
            gpu_info: watch::channel(ScalarSnapshot::loading()).0,
            docker_services: watch::channel(ScalarSnapshot::loading()).0,
            power_mode: watch::channel(ScalarSnapshot::loading()).0,
            hardware_sentinel: watch::channel(ScalarSnapshot::loading()).0,
            inventory: watch::channel(InventorySnapshot::loading()).0,
        }
    }

    /// Every source back to `loading`, as at the start of a generation.
    /// The inventory keeps its devices unless `clear_inventory`.
    pub(crate) fn reset_loading(&self, clear_inventory: bool) {
        self.system_info.send_replace(ScalarSnapshot::loading());
        self.gpu_info.send_replace(ScalarSnapshot::loading());
        self.docker_services.send_replace(ScalarSnapshot::loading());
        self.power_mode.send_replace(ScalarSnapshot::loading());
        self.hardware_sentinel.send_replace(ScalarSnapshot::loading());
        self.inventory.send_modify(|inv| {
            let devices = if clear_inventory {
                InventorySnapshot::loading().devices
            } else {
                Arc::clone(&inv.devices)
            };
            *inv = InventorySnapshot {
                devices,
                ..InventorySnapshot::loading()
            };
        });
    }

    /// Every source settled with `message` and no data.
    pub(crate) fn mark_unavailable(&self, message: &str) {
        self.system_info.send_replace(ScalarSnapshot::config_error(message));
        self.gpu_info.send_replace(ScalarSnapshot::config_error(message));
        self.docker_services.send_replace(ScalarSnapshot::config_error(message));
        self.power_mode.send_replace(ScalarSnapshot::config_error(message));
        self.hardware_sentinel.send_replace(ScalarSnapshot::config_error(message));
        self.inventory.send_replace(InventorySnapshot::unavailable(message));
    }

    fn is_settled(&self) -> bool {
        match &*self.status.borrow() {
            TargetStatus::Resolving => false,
            TargetStatus::NotConfigured | TargetStatus::ConfigError { .. } => true,
            TargetStatus::Active { .. } => {
                !(self.system_info.borrow().loading
                    || self.gpu_info.borrow().loading
                    || self.docker_services.borrow().loading
                    || self.power_mode.borrow().loading
                    || self.hardware_sentinel.borrow().loading
                    || self.inventory.borrow().loading)
            }
        }
    }
}

/// Per-target, per-kind latest state. Last write wins; no history.
pub struct DataStore {
    pub(crate) local: TargetSlots,
    pub(crate) remote: TargetSlots,
    pub(crate) gate: watch::Sender<GateState>,
    pub(crate) targets: watch::Sender<TargetSet>,
    pub(crate) pending: watch::Sender<Arc<Vec<PendingOperation>>>,
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DataStore {
    pub fn new() -> Self {
        Self {
            local: TargetSlots::new(TargetStatus::Resolving),
            remote: TargetSlots::new(TargetStatus::Resolving),
            gate: watch::channel(GateState::loading()).0,
            targets: watch::channel(TargetSet::default()).0,
            pending: watch::channel(Arc::new(Vec::new())).0,
        }
    }

    pub(crate) fn slots(&self, target: TargetKind) -> &TargetSlots {
        match target {
            TargetKind::Local => &self.local,
            TargetKind::Remote => &self.remote,
        }
    }

    // ── Snapshot accessors ───────────────────────────────────────────

    pub fn system_info(&self, target: TargetKind) -> ScalarSnapshot<SystemInfo> {
        self.slots(target).system_info.borrow().clone()
    }

    pub fn gpu_info(&self, target: TargetKind) -> ScalarSnapshot<GpuInfo> {
        self.slots(target).gpu_info.borrow().clone()
    }

    pub fn docker_services(&self, target: TargetKind) -> ScalarSnapshot<Vec<DockerService>> {
        self.slots(target).docker_services.borrow().clone()
    }

    pub fn power_mode(&self, target: TargetKind) -> ScalarSnapshot<PowerModeState> {
        self.slots(target).power_mode.borrow().clone()
    }

    pub fn hardware_sentinel(&self, target: TargetKind) -> ScalarSnapshot<HardwareSentinel> {
        self.slots(target).hardware_sentinel.borrow().clone()
    }

    pub fn inventory(&self, target: TargetKind) -> InventorySnapshot {
        self.slots(target).inventory.borrow().clone()
    }

    pub fn target_status(&self, target: TargetKind) -> TargetStatus {
        self.slots(target).status.borrow().clone()
    }

    pub fn gate(&self) -> GateState {
        self.gate.borrow().clone()
    }

    pub fn targets(&self) -> TargetSet {
        self.targets.borrow().clone()
    }

    /// Operations currently awaiting confirmation.
    pub fn pending(&self) -> Arc<Vec<PendingOperation>> {
        Arc::clone(&self.pending.borrow())
    }

    /// True once both targets are resolved and every active source has
    /// answered at least once in its current generation.
    pub fn is_settled(&self) -> bool {
        self.local.is_settled() && self.remote.is_settled()
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe_system_info(
        &self,
        target: TargetKind,
    ) -> SnapshotStream<ScalarSnapshot<SystemInfo>> {
        SnapshotStream::new(self.slots(target).system_info.subscribe())
    }

    pub fn subscribe_gpu_info(&self, target: TargetKind) -> SnapshotStream<ScalarSnapshot<GpuInfo>> {
        SnapshotStream::new(self.slots(target).gpu_info.subscribe())
    }

    pub fn subscribe_docker_services(
        &self,
        target: TargetKind,
    ) -> SnapshotStream<ScalarSnapshot<Vec<DockerService>>> {
        SnapshotStream::new(self.slots(target).docker_services.subscribe())
    }

    pub fn subscribe_power_mode(
        &self,
        target: TargetKind,
    ) -> SnapshotStream<ScalarSnapshot<PowerModeState>> {
        SnapshotStream::new(self.slots(target).power_mode.subscribe())
    }

    pub fn subscribe_hardware_sentinel(
        &self,
        target: TargetKind,
    ) -> SnapshotStream<ScalarSnapshot<HardwareSentinel>> {
        SnapshotStream::new(self.slots(target).hardware_sentinel.subscribe())
    }

    pub fn subscribe_inventory(&self, target: TargetKind) -> SnapshotStream<InventorySnapshot> {
        SnapshotStream::new(self.slots(target).inventory.subscribe())
    }

    pub fn subscribe_target_status(&self, target: TargetKind) -> SnapshotStream<TargetStatus> {
        SnapshotStream::new(self.slots(target).status.subscribe())
    }

    pub fn subscribe_gate(&self) -> SnapshotStream<GateState> {
        SnapshotStream::new(self.gate.subscribe())
    }

    pub fn subscribe_pending(&self) -> SnapshotStream<Arc<Vec<PendingOperation>>> {
        SnapshotStream::new(self.pending.subscribe())
    }

    pub(crate) fn pending_receiver(&self) -> watch::Receiver<Arc<Vec<PendingOperation>>> {
        self.pending.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_resolving_and_loading() {
        let store = DataStore::new();
        for kind in TargetKind::ALL {
            assert_eq!(store.target_status(kind), TargetStatus::Resolving);
            assert!(store.system_info(kind).loading);
            assert!(store.inventory(kind).loading);
        }
        assert!(store.gate().loading);
        assert!(!store.is_settled());
    }

    #[test]
    fn unavailable_target_is_settled() {
        let store = DataStore::new();
        store.remote.status.send_replace(TargetStatus::NotConfigured);
        store.remote.mark_unavailable("Not configured");
        assert!(store.remote.is_settled());
        assert_eq!(store.power_mode(TargetKind::Remote), ScalarSnapshot::not_configured());
    }

    #[test]
    fn reset_keeps_devices_unless_asked() {
        use crate::model::{DeviceInventory, DeviceRecord, MacKey};

        let store = DataStore::new();
        let mut inv = DeviceInventory::new();
        inv.records_mut().push(DeviceRecord {
            mac: MacKey::Unknown,
            ip: "10.0.0.4".into(),
            interface: String::new(),
            name: None,
        });
        store.local.inventory.send_replace(InventorySnapshot {
            devices: Arc::new(inv),
            error: None,
            loading: false,
            last_fast: None,
            last_deep: None,
        });

        store.local.reset_loading(false);
        assert_eq!(store.inventory(TargetKind::Local).devices.len(), 1);
        assert!(store.inventory(TargetKind::Local).loading);

        store.local.reset_loading(true);
        assert!(store.inventory(TargetKind::Local).devices.is_empty());
    }
}
