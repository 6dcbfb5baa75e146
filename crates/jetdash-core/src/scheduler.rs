// ── Polling scheduler ──
//
// One task per (target, source). Each firing spawns its own request so a
// slow response never delays the next poll; outcomes are sent to the
// reconciler tagged with the generation they were issued under.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use jetdash_api::MonitorClient;

use crate::model::{
    DockerService, GpuInfo, HardwareSentinel, NetworkDevice, PendingOperation, PowerModeState,
    Source, SystemInfo, TargetKind,
};
use crate::pending::awaits;
use crate::store::Update;

/// Decoded body of one successful poll.
#[derive(Debug, Clone)]
pub(crate) enum Payload {
    SystemInfo(SystemInfo),
    Devices(Vec<NetworkDevice>),
    Gpu(GpuInfo),
    Services(Vec<DockerService>),
    PowerMode(PowerModeState),
    Sentinel(HardwareSentinel),
}

/// One completed poll, successful or not.
#[derive(Debug)]
pub(crate) struct PollOutcome {
    pub target: TargetKind,
    pub generation: u64,
    pub source: Source,
    /// Issue order across all polls of this console.
    pub seq: u64,
    pub issued_at: Instant,
    pub result: Result<Payload, jetdash_api::Error>,
}

/// Everything a poll needs for one generation of one target.
pub(crate) struct PollContext {
    pub target: TargetKind,
    pub generation: u64,
    /// Console backend: system info and network scans for both targets.
    pub console: MonitorClient,
    /// The target's own backend: GPU, docker, power mode, sentinel.
    pub backend: MonitorClient,
    pub updates: mpsc::Sender<Update>,
    pub issue_seq: Arc<AtomicU64>,
}

impl PollContext {
    async fn fetch(&self, source: Source) -> Result<Payload, jetdash_api::Error> {
        let scope = self.target.scope();
        Ok(match source {
            Source::SystemInfo => Payload::SystemInfo(self.console.system_info(scope).await?),
            Source::NetworkFast => Payload::Devices(self.console.network_status(scope).await?),
            Source::NetworkDeep => Payload::Devices(self.console.network_scan(scope).await?),
            Source::GpuInfo => Payload::Gpu(self.backend.gpu_info().await?),
            Source::DockerServices => Payload::Services(self.backend.docker_services().await?),
            Source::PowerMode => Payload::PowerMode(self.backend.power_mode().await?),
            Source::HardwareSentinel => {
                Payload::Sentinel(self.backend.hardware_sentinel().await?)
            }
        })
    }

    /// Issue one poll and deliver its outcome. Returns once delivered.
    pub(crate) async fn poll_once(&self, source: Source) {
        let seq = self.issue_seq.fetch_add(1, Ordering::Relaxed);
        let issued_at = Instant::now();
        trace!(target_kind = %self.target, %source, seq, "poll issued");

        let result = self.fetch(source).await;
        let outcome = PollOutcome {
            target: self.target,
            generation: self.generation,
            source,
            seq,
            issued_at,
            result,
        };
        if self.updates.send(Update::Polled(outcome)).await.is_err() {
            debug!(target_kind = %self.target, %source, "reconciler gone; dropping poll outcome");
        }
    }
}

/// Spawn a poll without waiting for it.
fn fire(ctx: &Arc<PollContext>, source: Source) {
    let ctx = Arc::clone(ctx);
    tokio::spawn(async move { ctx.poll_once(source).await });
}

/// Fire immediately, then every `period` until cancelled. While an
/// operation confirmed by this source is pending on this target, fire
/// every `burst` instead.
pub(crate) async fn poll_task(
    ctx: Arc<PollContext>,
    source: Source,
    period: Duration,
    burst: Option<Duration>,
    mut pending: watch::Receiver<Arc<Vec<PendingOperation>>>,
    cancel: CancellationToken,
) {
    let mut burst = burst.filter(|_| source.bursts());
    let mut last_fire = Instant::now();
    fire(&ctx, source);
    let mut next = last_fire + period;

    loop {
        let deadline = match burst {
            Some(b) if awaits(pending.borrow_and_update().iter(), ctx.target, source) => {
                next.min(last_fire + b)
            }
            _ => next,
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep_until(deadline) => {
                last_fire = Instant::now();
                fire(&ctx, source);
                next = last_fire + period;
            }
            changed = pending.changed(), if burst.is_some() => {
                if changed.is_err() {
                    burst = None;
                }
            }
        }
    }

    debug!(target_kind = %ctx.target, generation = ctx.generation, %source, "poller stopped");
}
