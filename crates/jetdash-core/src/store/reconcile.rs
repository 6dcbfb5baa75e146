// ── Single-writer reconciliation ──
//
// All domain state (inventories, pending operations, store slots) is
// owned by one task. Pollers, the target supervisor and the command
// processor talk to it through `Update` messages; nothing else writes.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::ArrivalPolicy;
use crate::error::CoreError;
use crate::merge::Merger;
use crate::model::{
    DeviceInventory, NOT_CONFIGURED, NetworkDevice, OperationEvent, OperationKey,
    PendingOperation, ScalarSnapshot, ScanResult, ScanSource, Source, Target, TargetKind,
    TargetStatus,
};
use crate::pending::{Observation, OperationRequest, PendingTracker};
use crate::scheduler::{Payload, PollOutcome};

use super::data_store::{DataStore, TargetSlots};

/// Messages accepted by the reconciler.
#[derive(Debug)]
pub(crate) enum Update {
    Polled(PollOutcome),
    /// A target starts polling under a new generation.
    Activated { target: Target, generation: u64 },
    /// A target stops polling; its slots settle with the status' message.
    Deactivated {
        target: TargetKind,
        status: TargetStatus,
    },
    Begin {
        request: OperationRequest,
        reply: oneshot::Sender<Result<PendingOperation, CoreError>>,
    },
    /// Outcome of an operation's initiating request.
    Settle {
        key: OperationKey,
        seq: u64,
        result: Result<(), String>,
    },
}

pub(crate) struct Reconciler {
    store: Arc<DataStore>,
    merger: Merger,
    tracker: PendingTracker,
    policy: ArrivalPolicy,
    events: broadcast::Sender<OperationEvent>,
    inventories: HashMap<TargetKind, DeviceInventory>,
    /// Current generation per active target.
    generations: HashMap<TargetKind, u64>,
    /// Last activated target value, to tell a restart from a move.
    active: HashMap<TargetKind, Target>,
    /// Highest issue seq applied per (target, source).
    applied: HashMap<(TargetKind, Source), u64>,
}

impl Reconciler {
    pub(crate) fn new(
        store: Arc<DataStore>,
        merger: Merger,
        tracker: PendingTracker,
        policy: ArrivalPolicy,
        events: broadcast::Sender<OperationEvent>,
    ) -> Self {
        Self {
            store,
            merger,
            tracker,
            policy,
            events,
            inventories: HashMap::new(),
            generations: HashMap::new(),
            active: HashMap::new(),
            applied: HashMap::new(),
        }
    }

    pub(crate) fn apply(&mut self, update: Update, now: Instant, at: DateTime<Utc>) {
        match update {
            Update::Polled(outcome) => self.apply_poll(outcome, now, at),
            Update::Activated { target, generation } => self.activate(target, generation),
            Update::Deactivated { target, status } => self.deactivate(target, status),
            Update::Begin { request, reply } => {
                let result = self.tracker.request(request, now, at).map(|(op, event)| {
                    self.emit(vec![event]);
                    op
                });
                if reply.send(result).is_err() {
                    debug!("operation requester went away before reply");
                }
            }
            Update::Settle { key, seq, result } => {
                let events = self.tracker.settle(&key, seq, result).into_iter().collect();
                self.emit(events);
            }
        }
    }

    // ── Target lifecycle ─────────────────────────────────────────────

    fn activate(&mut self, target: Target, generation: u64) {
        let kind = target.kind;
        let moved = self.active.get(&kind).is_some_and(|prev| *prev != target);
        if moved {
            self.inventories.remove(&kind);
        }

        self.generations.insert(kind, generation);
        self.applied.retain(|(t, _), _| *t != kind);
        self.active.insert(kind, target);

        let slots = self.store.slots(kind);
        slots.reset_loading(moved);
        slots.status.send_replace(TargetStatus::Active { generation });
        debug!(target_kind = %kind, generation, moved, "target activated");
    }

    fn deactivate(&mut self, kind: TargetKind, status: TargetStatus) {
        self.generations.remove(&kind);
        self.active.remove(&kind);
        self.inventories.remove(&kind);
        self.applied.retain(|(t, _), _| *t != kind);

        let slots = self.store.slots(kind);
        match &status {
            TargetStatus::ConfigError { message } => slots.mark_unavailable(message),
            _ => slots.mark_unavailable(NOT_CONFIGURED),
        }
        slots.status.send_replace(status);
        debug!(target_kind = %kind, "target deactivated");
    }

    // ── Poll outcomes ────────────────────────────────────────────────

    fn apply_poll(&mut self, outcome: PollOutcome, now: Instant, at: DateTime<Utc>) {
        let expired = self.tracker.expire(now);
        self.emit(expired);
        if self.is_current(&outcome) {
            self.apply_current(outcome, at);
        }
    }

    /// Generation and arrival-policy checks. Records the seq when applied.
    fn is_current(&mut self, outcome: &PollOutcome) -> bool {
        if self.generations.get(&outcome.target) != Some(&outcome.generation) {
            debug!(
                target_kind = %outcome.target,
                source = %outcome.source,
                generation = outcome.generation,
                "discarding outcome from a retired generation"
            );
            return false;
        }

        let last = self.applied.entry((outcome.target, outcome.source)).or_insert(0);
        if self.policy == ArrivalPolicy::NewestIssued && outcome.seq < *last {
            debug!(
                target_kind = %outcome.target,
                source = %outcome.source,
                seq = outcome.seq,
                newest = *last,
                "discarding outcome issued before the applied one"
            );
            return false;
        }
        *last = (*last).max(outcome.seq);
        true
    }

    fn apply_current(&mut self, outcome: PollOutcome, at: DateTime<Utc>) {
        let PollOutcome {
            target,
            source,
            issued_at,
            result,
            ..
        } = outcome;
        let store = Arc::clone(&self.store);
        let slots = store.slots(target);

        let payload = match result {
            Ok(payload) => payload,
            Err(e) => {
                self.apply_failure(target, source, &e.to_string(), issued_at, at);
                return;
            }
        };

        let events = match (source, payload) {
            (Source::SystemInfo, Payload::SystemInfo(info)) => {
                slots.system_info.send_replace(ScalarSnapshot::ok(info, at));
                self.tracker
                    .observe(target, Observation::SystemInfo { reachable: true }, issued_at)
            }
            (Source::GpuInfo, Payload::Gpu(gpu)) => {
                slots.gpu_info.send_replace(ScalarSnapshot::ok(gpu, at));
                Vec::new()
            }
            (Source::DockerServices, Payload::Services(services)) => {
                let events =
                    self.tracker
                        .observe(target, Observation::Services(&services), issued_at);
                slots.docker_services.send_replace(ScalarSnapshot::ok(services, at));
                events
            }
            (Source::PowerMode, Payload::PowerMode(state)) => {
                let events = self
                    .tracker
                    .observe(target, Observation::PowerMode(&state), issued_at);
                slots.power_mode.send_replace(ScalarSnapshot::ok(state, at));
                events
            }
            (Source::HardwareSentinel, Payload::Sentinel(sentinel)) => {
                let events = self
                    .tracker
                    .observe(target, Observation::Sentinel(&sentinel), issued_at);
                slots.hardware_sentinel.send_replace(ScalarSnapshot::ok(sentinel, at));
                events
            }
            (Source::NetworkFast, Payload::Devices(devices)) => {
                self.apply_scan(target, ScanSource::Fast, devices, at);
                Vec::new()
            }
            (Source::NetworkDeep, Payload::Devices(devices)) => {
                self.apply_scan(target, ScanSource::Deep, devices, at);
                Vec::new()
            }
            (source, _) => {
                warn!(%source, "poll payload does not match its source");
                Vec::new()
            }
        };
        self.emit(events);
    }

    fn apply_failure(
        &mut self,
        target: TargetKind,
        source: Source,
        message: &str,
        issued_at: Instant,
        at: DateTime<Utc>,
    ) {
        let store = Arc::clone(&self.store);
        let slots = store.slots(target);
        match source {
            Source::NetworkDeep => {
                debug!(target_kind = %target, error = %message, "deep scan failed; keeping inventory");
            }
            Source::NetworkFast => {
                warn!(target_kind = %target, error = %message, "fast scan failed");
                slots.inventory.send_modify(|inv| {
                    inv.error = Some(message.to_owned());
                    inv.loading = false;
                });
            }
            Source::SystemInfo => {
                warn!(target_kind = %target, error = %message, "system info poll failed");
                slots
                    .system_info
                    .send_replace(ScalarSnapshot::failed(message, at));
                let events = self.tracker.observe(
                    target,
                    Observation::SystemInfo { reachable: false },
                    issued_at,
                );
                self.emit(events);
            }
            _ => {
                warn!(target_kind = %target, %source, error = %message, "poll failed");
                fail_scalar(slots, source, message, at);
            }
        }
    }

    fn apply_scan(
        &mut self,
        target: TargetKind,
        source: ScanSource,
        devices: Vec<NetworkDevice>,
        at: DateTime<Utc>,
    ) {
        let scan = ScanResult::from_devices(source, target, at, devices);
        let inventory = self.inventories.entry(target).or_default();
        let stats = self.merger.merge(inventory, &scan);
        let devices = Arc::new(inventory.clone());

        debug!(
            target_kind = %target,
            %source,
            devices = devices.len(),
            added = stats.added,
            "inventory updated"
        );

        self.store.slots(target).inventory.send_modify(|inv| {
            inv.devices = devices;
            inv.loading = false;
            match source {
                ScanSource::Fast => {
                    inv.error = None;
                    inv.last_fast = Some(at);
                }
                ScanSource::Deep => inv.last_deep = Some(at),
            }
        });
    }

    // ── Operation events ─────────────────────────────────────────────

    fn emit(&self, events: Vec<OperationEvent>) {
        if events.is_empty() {
            return;
        }
        self.store
            .pending
            .send_replace(Arc::new(self.tracker.snapshot()));
        for event in events {
            // No subscribers is fine.
            let _ = self.events.send(event);
        }
    }

    #[cfg(test)]
    pub(crate) fn tracker(&self) -> &PendingTracker {
        &self.tracker
    }
}

fn fail_scalar(slots: &TargetSlots, source: Source, message: &str, at: DateTime<Utc>) {
    match source {
        Source::GpuInfo => {
            slots.gpu_info.send_replace(ScalarSnapshot::failed(message, at));
        }
        Source::DockerServices => {
            slots
                .docker_services
                .send_replace(ScalarSnapshot::failed(message, at));
        }
        Source::PowerMode => {
            slots.power_mode.send_replace(ScalarSnapshot::failed(message, at));
        }
        Source::HardwareSentinel => {
            slots
                .hardware_sentinel
                .send_replace(ScalarSnapshot::failed(message, at));
        }
        Source::SystemInfo | Source::NetworkFast | Source::NetworkDeep => {}
    }
}

/// Run the reconciler until cancelled or every sender is gone.
pub(crate) async fn reconcile_task(
    mut reconciler: Reconciler,
    mut rx: mpsc::Receiver<Update>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            update = rx.recv() => {
                let Some(update) = update else { break };
                reconciler.apply(update, Instant::now(), Utc::now());
            }
        }
    }
    debug!("reconciler stopped");
}
