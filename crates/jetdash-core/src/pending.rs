// ── Pending operation tracking ──
//
// Operations are `Requested` from the moment they are initiated until a
// poll confirms them, the initiating request fails, or their deadline
// passes. Deadlines are checked before each poll outcome is applied.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::model::{
    Confirmation, DockerService, HardwareSentinel, OperationEvent, OperationKey, OperationKind,
    PendingOperation, PowerModeState, Source, TargetKind,
};

/// Everything needed to start tracking an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRequest {
    pub key: OperationKey,
    pub kind: OperationKind,
    pub confirmation: Confirmation,
    pub timeout: Duration,
}

/// A successful (or, for system info, failed) poll result, as far as
/// confirmation predicates care.
#[derive(Debug, Clone, Copy)]
pub enum Observation<'a> {
    Services(&'a [DockerService]),
    PowerMode(&'a PowerModeState),
    SystemInfo { reachable: bool },
    Sentinel(&'a HardwareSentinel),
}

impl Observation<'_> {
    pub fn source(&self) -> Source {
        match self {
            Self::Services(_) => Source::DockerServices,
            Self::PowerMode(_) => Source::PowerMode,
            Self::SystemInfo { .. } => Source::SystemInfo,
            Self::Sentinel(_) => Source::HardwareSentinel,
        }
    }
}

#[derive(Debug)]
pub struct PendingTracker {
    pending: BTreeMap<OperationKey, PendingOperation>,
    next_seq: u64,
    self_services: Vec<String>,
}

impl PendingTracker {
    pub fn new(self_services: impl IntoIterator<Item = String>) -> Self {
        Self {
            pending: BTreeMap::new(),
            next_seq: 1,
            self_services: self_services
                .into_iter()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// Restarting the console's own service or rebooting the machine it
    /// runs on cuts the initiating request short.
    fn is_self_referential(&self, request: &OperationRequest) -> bool {
        match (&request.confirmation, request.kind) {
            (Confirmation::ServiceRunning { name }, OperationKind::RestartService) => {
                let name = name.to_lowercase();
                self.self_services.iter().any(|p| names_service(&name, p))
            }
            (_, OperationKind::Reboot) => request.key.target == TargetKind::Local,
            _ => false,
        }
    }

    /// Start tracking. Rejects a key that is already pending.
    pub fn request(
        &mut self,
        request: OperationRequest,
        now: Instant,
        at: DateTime<Utc>,
    ) -> Result<(PendingOperation, OperationEvent), CoreError> {
        if self.pending.contains_key(&request.key) {
            return Err(CoreError::OperationPending {
                key: request.key.to_string(),
            });
        }

        let seq = self.next_seq;
        self.next_seq += 1;

        let self_referential = self.is_self_referential(&request);
        let op = PendingOperation {
            key: request.key,
            kind: request.kind,
            started_at: now,
            requested_at: at,
            timeout: request.timeout,
            confirmation: request.confirmation,
            seq,
            self_referential,
        };
        let event = OperationEvent::Requested {
            key: op.key.clone(),
            kind: op.kind,
            seq,
        };

        debug!(key = %op.key, seq, self_referential, "operation requested");
        self.pending.insert(op.key.clone(), op.clone());
        Ok((op, event))
    }

    /// Record the outcome of the initiating request. Success changes
    /// nothing; failure ends the operation unless it is self-referential.
    pub fn settle(
        &mut self,
        key: &OperationKey,
        seq: u64,
        result: Result<(), String>,
    ) -> Option<OperationEvent> {
        let Err(message) = result else {
            return None;
        };
        let op = self.pending.get(key).filter(|op| op.seq == seq)?;

        if op.self_referential {
            info!(key = %key, error = %message, "initiating request failed as expected; awaiting confirmation");
            return None;
        }

        warn!(key = %key, error = %message, "operation failed");
        self.pending.remove(key);
        Some(OperationEvent::Failed {
            key: key.clone(),
            seq,
            message,
        })
    }

    /// Check pending operations on `target` against a poll issued at
    /// `issued_at`. Polls issued before an operation started, or at or
    /// after its deadline, never count.
    pub fn observe(
        &mut self,
        target: TargetKind,
        observation: Observation<'_>,
        issued_at: Instant,
    ) -> Vec<OperationEvent> {
        let source = observation.source();
        let mut confirmed = Vec::new();

        for op in self.pending.values_mut() {
            if op.key.target != target
                || op.confirmation.source() != source
                || issued_at <= op.started_at
                || issued_at >= op.deadline()
            {
                continue;
            }
            if advance(&mut op.confirmation, observation) {
                confirmed.push(op.key.clone());
            }
        }

        confirmed
            .into_iter()
            .filter_map(|key| self.pending.remove(&key))
            .map(|op| {
                info!(key = %op.key, seq = op.seq, "operation confirmed");
                OperationEvent::Confirmed {
                    key: op.key,
                    seq: op.seq,
                }
            })
            .collect()
    }

    /// Drop every operation whose deadline has passed.
    pub fn expire(&mut self, now: Instant) -> Vec<OperationEvent> {
        let expired: Vec<OperationKey> = self
            .pending
            .values()
            .filter(|op| now >= op.deadline())
            .map(|op| op.key.clone())
            .collect();

        expired
            .into_iter()
            .filter_map(|key| self.pending.remove(&key))
            .map(|op| {
                info!(key = %op.key, seq = op.seq, "operation timed out without confirmation");
                OperationEvent::TimedOut {
                    key: op.key,
                    seq: op.seq,
                }
            })
            .collect()
    }

    /// Whether any pending operation on `target` is confirmed by `source`.
    pub fn awaits(&self, target: TargetKind, source: Source) -> bool {
        awaits(self.pending.values(), target, source)
    }

    pub fn is_pending(&self, key: &OperationKey) -> bool {
        self.pending.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn snapshot(&self) -> Vec<PendingOperation> {
        self.pending.values().cloned().collect()
    }
}

/// `pattern` equals `name` or one of its `-`-separated parts, as in
/// `project-web_monitor-1`. Underscores stay part of a name.
fn names_service(name: &str, pattern: &str) -> bool {
    name == pattern
        || name.match_indices(pattern).any(|(start, _)| {
            let end = start + pattern.len();
            let before = name[..start].chars().next_back();
            let after = name[end..].chars().next();
            matches!(before, None | Some('-')) && matches!(after, None | Some('-'))
        })
}

pub(crate) fn awaits<'a>(
    ops: impl IntoIterator<Item = &'a PendingOperation>,
    target: TargetKind,
    source: Source,
) -> bool {
    ops.into_iter()
        .any(|op| op.key.target == target && op.confirmation.source() == source)
}

/// Feed one observation into a predicate. Returns `true` once satisfied.
fn advance(confirmation: &mut Confirmation, observation: Observation<'_>) -> bool {
    match (confirmation, observation) {
        (Confirmation::ServiceRunning { name }, Observation::Services(services)) => services
            .iter()
            .any(|s| s.name == *name && s.is_running()),
        (Confirmation::PowerMode { mode_id }, Observation::PowerMode(state)) => {
            state.current_id == Some(*mode_id)
        }
        (Confirmation::Recovered { observed_outage }, Observation::SystemInfo { reachable }) => {
            if reachable {
                *observed_outage
            } else {
                *observed_outage = true;
                false
            }
        }
        (Confirmation::Turbo { enabled }, Observation::Sentinel(s)) => {
            s.clocks.as_flag() == Some(*enabled)
        }
        (Confirmation::Fan { mode }, Observation::Sentinel(s)) => {
            s.fan.mode.eq_ignore_ascii_case(mode)
        }
        _ => false,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{ClockState, PowerMode};

    fn tracker() -> PendingTracker {
        PendingTracker::new(["web_monitor".to_owned()])
    }

    fn restart(target: TargetKind, name: &str) -> OperationRequest {
        OperationRequest {
            key: OperationKey::service(target, name),
            kind: OperationKind::RestartService,
            confirmation: Confirmation::ServiceRunning { name: name.into() },
            timeout: Duration::from_secs(30),
        }
    }

    fn reboot(target: TargetKind) -> OperationRequest {
        OperationRequest {
            key: OperationKey::reboot(target),
            kind: OperationKind::Reboot,
            confirmation: Confirmation::Recovered {
                observed_outage: false,
            },
            timeout: Duration::from_secs(120),
        }
    }

    fn service(name: &str, status: &str) -> DockerService {
        DockerService {
            name: name.into(),
            status: status.into(),
            image: String::new(),
            id: String::new(),
        }
    }

    #[test]
    fn restart_then_running_confirms() {
        let mut t = tracker();
        let t0 = Instant::now();
        let (op, event) = t.request(restart(TargetKind::Local, "api"), t0, Utc::now()).unwrap();
        assert!(matches!(event, OperationEvent::Requested { .. }));
        assert!(t.is_pending(&op.key));

        let services = [service("api", "running")];
        let events = t.observe(
            TargetKind::Local,
            Observation::Services(&services),
            t0 + Duration::from_millis(10),
        );

        assert_eq!(
            events,
            vec![OperationEvent::Confirmed {
                key: op.key.clone(),
                seq: op.seq
            }]
        );
        assert!(t.is_empty());
    }

    #[test]
    fn polls_issued_before_start_are_ignored() {
        let mut t = tracker();
        let t0 = Instant::now();
        let issued_before = t0;
        t.request(restart(TargetKind::Local, "api"), t0 + Duration::from_millis(5), Utc::now())
            .unwrap();

        let services = [service("api", "running")];
        let events = t.observe(TargetKind::Local, Observation::Services(&services), issued_before);
        assert!(events.is_empty());
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn other_target_does_not_confirm() {
        let mut t = tracker();
        let t0 = Instant::now();
        t.request(restart(TargetKind::Remote, "api"), t0, Utc::now()).unwrap();

        let services = [service("api", "running")];
        let events = t.observe(
            TargetKind::Local,
            Observation::Services(&services),
            t0 + Duration::from_secs(1),
        );
        assert!(events.is_empty());
    }

    #[test]
    fn duplicate_request_is_rejected() {
        let mut t = tracker();
        let t0 = Instant::now();
        t.request(restart(TargetKind::Local, "api"), t0, Utc::now()).unwrap();
        let err = t.request(restart(TargetKind::Local, "api"), t0, Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::OperationPending { .. }));
        // Same service on the other target is a different key.
        t.request(restart(TargetKind::Remote, "api"), t0, Utc::now()).unwrap();
    }

    #[test]
    fn timeout_removes_without_verdict() {
        let mut t = tracker();
        let t0 = Instant::now();
        let (op, _) = t.request(restart(TargetKind::Local, "api"), t0, Utc::now()).unwrap();

        assert!(t.expire(t0 + Duration::from_secs(29)).is_empty());
        let events = t.expire(t0 + Duration::from_secs(30));
        assert_eq!(
            events,
            vec![OperationEvent::TimedOut {
                key: op.key.clone(),
                seq: op.seq
            }]
        );
        assert!(!t.is_pending(&op.key));
    }

    #[test]
    fn poll_issued_after_deadline_does_not_confirm() {
        let mut t = tracker();
        let t0 = Instant::now();
        let mut request = restart(TargetKind::Local, "api");
        request.timeout = Duration::from_secs(5);
        let (op, _) = t.request(request, t0, Utc::now()).unwrap();

        let services = [service("api", "running")];
        let late = t0 + Duration::from_secs(10);
        assert!(t.observe(TargetKind::Local, Observation::Services(&services), late).is_empty());
        assert_eq!(
            t.expire(late),
            vec![OperationEvent::TimedOut {
                key: op.key.clone(),
                seq: op.seq
            }]
        );
    }

    #[test]
    fn failed_request_fails_operation() {
        let mut t = tracker();
        let (op, _) = t
            .request(restart(TargetKind::Local, "api"), Instant::now(), Utc::now())
            .unwrap();
        let event = t.settle(&op.key, op.seq, Err("no such container".into()));
        assert!(matches!(event, Some(OperationEvent::Failed { ref message, .. }) if message == "no such container"));
        assert!(t.is_empty());
    }

    #[test]
    fn successful_request_keeps_waiting() {
        let mut t = tracker();
        let (op, _) = t
            .request(restart(TargetKind::Local, "api"), Instant::now(), Utc::now())
            .unwrap();
        assert_eq!(t.settle(&op.key, op.seq, Ok(())), None);
        assert!(t.is_pending(&op.key));
    }

    #[test]
    fn self_restart_failure_is_ignored() {
        let mut t = tracker();
        let t0 = Instant::now();
        let (op, _) = t
            .request(restart(TargetKind::Local, "Web_Monitor-backend"), t0, Utc::now())
            .unwrap();
        assert!(op.self_referential);

        assert_eq!(t.settle(&op.key, op.seq, Err("connection reset".into())), None);
        assert!(t.is_pending(&op.key));

        // Still bounded by the deadline.
        assert_eq!(t.expire(t0 + Duration::from_secs(30)).len(), 1);
        assert!(t.is_empty());
    }

    #[test]
    fn self_service_match_is_by_whole_name() {
        let t = PendingTracker::new(["web_monitor".to_owned(), "jetdash".to_owned()]);
        let is_self = |name: &str| t.is_self_referential(&restart(TargetKind::Local, name));

        assert!(is_self("web_monitor"));
        assert!(is_self("home_ai_project-web_monitor-1"));
        assert!(is_self("JetDash"));
        assert!(!is_self("web_monitor_db"));
        assert!(!is_self("old_web_monitor"));
        assert!(!is_self("jetdash2"));
    }

    #[test]
    fn stale_settle_is_ignored() {
        let mut t = tracker();
        let t0 = Instant::now();
        let (first, _) = t.request(restart(TargetKind::Local, "api"), t0, Utc::now()).unwrap();
        t.expire(t0 + Duration::from_secs(60));
        let (second, _) = t
            .request(restart(TargetKind::Local, "api"), t0 + Duration::from_secs(61), Utc::now())
            .unwrap();

        assert_eq!(t.settle(&first.key, first.seq, Err("late".into())), None);
        assert!(t.is_pending(&second.key));
    }

    #[test]
    fn local_reboot_is_self_referential_remote_is_not() {
        let mut t = tracker();
        let (local, _) = t.request(reboot(TargetKind::Local), Instant::now(), Utc::now()).unwrap();
        let (remote, _) = t.request(reboot(TargetKind::Remote), Instant::now(), Utc::now()).unwrap();
        assert!(local.self_referential);
        assert!(!remote.self_referential);
    }

    #[test]
    fn reboot_needs_outage_then_recovery() {
        let mut t = tracker();
        let t0 = Instant::now();
        t.request(reboot(TargetKind::Remote), t0, Utc::now()).unwrap();
        let later = |ms| t0 + Duration::from_millis(ms);

        assert!(t.observe(TargetKind::Remote, Observation::SystemInfo { reachable: true }, later(1)).is_empty());
        assert!(t.observe(TargetKind::Remote, Observation::SystemInfo { reachable: false }, later(2)).is_empty());
        let events = t.observe(TargetKind::Remote, Observation::SystemInfo { reachable: true }, later(3));
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], OperationEvent::Confirmed { .. }));
    }

    #[test]
    fn power_mode_and_sentinel_predicates() {
        let mut t = tracker();
        let t0 = Instant::now();
        let later = t0 + Duration::from_millis(1);

        t.request(
            OperationRequest {
                key: OperationKey::power_mode(TargetKind::Local),
                kind: OperationKind::SetPowerMode,
                confirmation: Confirmation::PowerMode { mode_id: 1 },
                timeout: Duration::from_secs(30),
            },
            t0,
            Utc::now(),
        )
        .unwrap();
        t.request(
            OperationRequest {
                key: OperationKey::turbo(TargetKind::Local),
                kind: OperationKind::SetTurbo,
                confirmation: Confirmation::Turbo { enabled: true },
                timeout: Duration::from_secs(30),
            },
            t0,
            Utc::now(),
        )
        .unwrap();

        assert!(t.awaits(TargetKind::Local, Source::PowerMode));
        assert!(t.awaits(TargetKind::Local, Source::HardwareSentinel));
        assert!(!t.awaits(TargetKind::Remote, Source::PowerMode));

        let still_old = PowerModeState {
            current_id: Some(0),
            current_name: Some("MAXN".into()),
            modes: vec![PowerMode { id: 0, name: "MAXN".into() }],
        };
        assert!(t.observe(TargetKind::Local, Observation::PowerMode(&still_old), later).is_empty());

        let switched = PowerModeState {
            current_id: Some(1),
            ..still_old
        };
        assert_eq!(t.observe(TargetKind::Local, Observation::PowerMode(&switched), later).len(), 1);

        let sentinel = HardwareSentinel {
            clocks: ClockState::Flag(true),
            ..HardwareSentinel::default()
        };
        assert_eq!(t.observe(TargetKind::Local, Observation::Sentinel(&sentinel), later).len(), 1);
        assert!(t.is_empty());
    }
}
