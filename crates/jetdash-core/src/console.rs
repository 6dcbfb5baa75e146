// ── Console abstraction ──
//
// Full lifecycle for one monitoring console: target resolution, polling
// of both targets, command routing, and reactive snapshots through the
// DataStore.

use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::time::Duration;

use strum::IntoEnumIterator;
use tokio::sync::{Mutex, broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use jetdash_api::{MonitorClient, TransportConfig};

use crate::command::{Command, CommandEnvelope, CommandResult};
use crate::config::ConsoleConfig;
use crate::error::CoreError;
use crate::gate::gate_task;
use crate::merge::Merger;
use crate::model::{GateState, OperationEvent, Source, Target, TargetKind, TargetStatus};
use crate::pending::PendingTracker;
use crate::scheduler::{PollContext, poll_task};
use crate::store::{DataStore, Reconciler, Update, reconcile_task};

const COMMAND_CHANNEL_SIZE: usize = 64;
const UPDATE_CHANNEL_SIZE: usize = 256;
const EVENT_CHANNEL_SIZE: usize = 256;

// ── ConsoleState ─────────────────────────────────────────────────────

/// Lifecycle state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ConsoleState {
    Idle,
    Running,
    Stopped,
}

// ── Console ──────────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ConsoleInner>`. Owns the background tasks
/// (gate, target supervisor, pollers, reconciler, command processor) and
/// exposes the snapshot store they feed.
#[derive(Clone)]
pub struct Console {
    inner: Arc<ConsoleInner>,
}

struct ConsoleInner {
    config: ConsoleConfig,
    http: reqwest::Client,
    console_client: MonitorClient,
    store: Arc<DataStore>,
    state: watch::Sender<ConsoleState>,
    event_tx: broadcast::Sender<OperationEvent>,
    update_tx: mpsc::Sender<Update>,
    update_rx: Mutex<Option<mpsc::Receiver<Update>>>,
    command_tx: mpsc::Sender<CommandEnvelope>,
    command_rx: Mutex<Option<mpsc::Receiver<CommandEnvelope>>>,
    issue_seq: Arc<AtomicU64>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Console {
    /// Create a console from configuration. Does NOT poll; call
    /// [`start()`](Self::start) to spawn the background tasks.
    pub fn new(config: ConsoleConfig) -> Result<Self, CoreError> {
        let transport = TransportConfig {
            tls: config.tls,
            ..TransportConfig::default()
        }
        .with_timeout(config.timeout);
        let http = transport.build_client()?;
        let console_client = MonitorClient::with_client(http.clone(), config.console_url.clone());

        let (state, _) = watch::channel(ConsoleState::Idle);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        let (update_tx, update_rx) = mpsc::channel(UPDATE_CHANNEL_SIZE);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);

        Ok(Self {
            inner: Arc::new(ConsoleInner {
                config,
                http,
                console_client,
                store: Arc::new(DataStore::new()),
                state,
                event_tx,
                update_tx,
                update_rx: Mutex::new(Some(update_rx)),
                command_tx,
                command_rx: Mutex::new(Some(command_rx)),
                issue_seq: Arc::new(AtomicU64::new(1)),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        })
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.inner.config
    }

    /// Access the underlying DataStore.
    pub fn store(&self) -> &Arc<DataStore> {
        &self.inner.store
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Spawn the background tasks: reconciler, command processor,
    /// configuration gate and target supervisor. The local target starts
    /// polling immediately; the remote one once the gate resolves it.
    ///
    /// Calling this on a running console is a no-op.
    pub async fn start(&self) -> Result<(), CoreError> {
        let mut handles = self.inner.task_handles.lock().await;
        let Some(update_rx) = self.inner.update_rx.lock().await.take() else {
            return match *self.inner.state.borrow() {
                ConsoleState::Running => Ok(()),
                ConsoleState::Idle | ConsoleState::Stopped => Err(CoreError::Disconnected),
            };
        };

        let config = &self.inner.config;
        let cancel = self.inner.cancel.clone();

        let reconciler = Reconciler::new(
            Arc::clone(&self.inner.store),
            Merger::new(config.generic_interfaces.iter().cloned()),
            PendingTracker::new(config.self_services.iter().cloned()),
            config.arrival_policy,
            self.inner.event_tx.clone(),
        );
        handles.push(tokio::spawn(reconcile_task(
            reconciler,
            update_rx,
            cancel.clone(),
        )));

        if let Some(rx) = self.inner.command_rx.lock().await.take() {
            let console = self.clone();
            handles.push(tokio::spawn(command_processor_task(console, rx)));
        }

        let gate_rx = self.inner.store.gate.subscribe();
        handles.push(tokio::spawn(gate_task(
            self.inner.console_client.clone(),
            config.intervals.config,
            Arc::clone(&self.inner.store),
            cancel.clone(),
        )));

        let console = self.clone();
        handles.push(tokio::spawn(supervisor_task(console, gate_rx, cancel)));

        self.inner.state.send_replace(ConsoleState::Running);
        info!(console = %config.console_url, "console started");
        Ok(())
    }

    /// Stop every background task and wait for the long-lived ones.
    /// Requests already in flight finish but their outcomes are dropped.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }

        self.inner.state.send_replace(ConsoleState::Stopped);
        debug!("console stopped");
    }

    pub fn state(&self) -> ConsoleState {
        *self.inner.state.borrow()
    }

    /// Subscribe to lifecycle state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<ConsoleState> {
        self.inner.state.subscribe()
    }

    /// Subscribe to operation transitions.
    pub fn events(&self) -> broadcast::Receiver<OperationEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Wait until `target` leaves `Resolving`, returning its status.
    pub async fn wait_resolved(&self, target: TargetKind) -> Result<TargetStatus, CoreError> {
        let mut status = self.inner.store.subscribe_target_status(target);
        status
            .wait_for(|s| *s != TargetStatus::Resolving)
            .await
            .ok_or(CoreError::Disconnected)
    }

    /// Wait until every active source of both targets has answered once,
    /// or `limit` elapses. Returns whether the store settled.
    pub async fn wait_settled(&self, limit: Duration) -> bool {
        let store = &self.inner.store;
        let settle = async {
            let mut tick = tokio::time::interval(Duration::from_millis(50));
            loop {
                tick.tick().await;
                if store.is_settled() {
                    break;
                }
            }
        };
        tokio::time::timeout(limit, settle).await.is_ok()
    }

    // ── Command execution ────────────────────────────────────────────

    /// Execute a command against its target.
    ///
    /// Returns once the initiating request has been answered. The
    /// operation itself resolves later through [`events()`](Self::events).
    pub async fn execute(&self, cmd: Command) -> Result<CommandResult, CoreError> {
        if self.state() != ConsoleState::Running {
            return Err(CoreError::Disconnected);
        }

        let (tx, rx) = oneshot::channel();

        self.inner
            .command_tx
            .send(CommandEnvelope {
                command: cmd,
                response_tx: tx,
            })
            .await
            .map_err(|_| CoreError::Disconnected)?;

        rx.await.map_err(|_| CoreError::Disconnected)?
    }

    /// Forward a prompt to the console backend's assistant.
    pub async fn chat(&self, prompt: &str) -> Result<String, CoreError> {
        let reply = self.inner.console_client.chat(prompt).await?;
        reply
            .response
            .filter(|r| !r.trim().is_empty())
            .ok_or_else(|| CoreError::Backend {
                message: "Empty response from chat backend".into(),
            })
    }

    /// Poll one source of one target now, outside its schedule. Returns
    /// once the outcome has been handed to the reconciler.
    pub async fn refresh(&self, target: TargetKind, source: Source) -> Result<(), CoreError> {
        if self.state() != ConsoleState::Running {
            return Err(CoreError::Disconnected);
        }

        let generation = match self.inner.store.target_status(target) {
            TargetStatus::Active { generation } => generation,
            TargetStatus::ConfigError { message } => return Err(CoreError::Config { message }),
            TargetStatus::Resolving | TargetStatus::NotConfigured => {
                return Err(CoreError::NotConfigured {
                    target: target.to_string(),
                });
            }
        };

        let ctx = PollContext {
            target,
            generation,
            console: self.inner.console_client.clone(),
            backend: self.backend_for(target)?,
            updates: self.inner.update_tx.clone(),
            issue_seq: Arc::clone(&self.inner.issue_seq),
        };
        ctx.poll_once(source).await;
        Ok(())
    }

    // ── Routing ──────────────────────────────────────────────────────

    /// Client for a target's own backend. The local target's backend is
    /// the console backend.
    fn backend_for(&self, kind: TargetKind) -> Result<MonitorClient, CoreError> {
        match kind {
            TargetKind::Local => Ok(self.inner.console_client.clone()),
            TargetKind::Remote => {
                let targets = self.inner.store.targets();
                self.client_for(&targets.remote)?
                    .ok_or_else(|| CoreError::NotConfigured {
                        target: kind.to_string(),
                    })
            }
        }
    }

    fn client_for(&self, target: &Target) -> Result<Option<MonitorClient>, CoreError> {
        match (target.configured, target.address.as_deref()) {
            (true, Some(address)) => {
                let url = MonitorClient::target_url(address, target.port.as_deref())?;
                Ok(Some(MonitorClient::with_client(self.inner.http.clone(), url)))
            }
            _ => Ok(None),
        }
    }

    async fn send_update(&self, update: Update) -> Result<(), CoreError> {
        self.inner
            .update_tx
            .send(update)
            .await
            .map_err(|_| CoreError::Disconnected)
    }

    /// Spawn one poller per source for a target generation.
    fn spawn_pollers(
        &self,
        target: TargetKind,
        generation: u64,
        backend: MonitorClient,
        cancel: &CancellationToken,
    ) {
        let intervals = &self.inner.config.intervals;
        let ctx = Arc::new(PollContext {
            target,
            generation,
            console: self.inner.console_client.clone(),
            backend,
            updates: self.inner.update_tx.clone(),
            issue_seq: Arc::clone(&self.inner.issue_seq),
        });

        for source in Source::iter() {
            tokio::spawn(poll_task(
                Arc::clone(&ctx),
                source,
                intervals.period(source),
                Some(intervals.burst),
                self.inner.store.pending_receiver(),
                cancel.clone(),
            ));
        }
        debug!(target_kind = %target, generation, "pollers started");
    }
}

// ── Background tasks ─────────────────────────────────────────────────

/// What the gate says the remote target should be.
fn desired_remote(state: &GateState) -> Result<Target, TargetStatus> {
    if let Some(message) = &state.error {
        return Err(TargetStatus::ConfigError {
            message: message.clone(),
        });
    }
    let target = state.remote_target();
    if target.configured {
        Ok(target)
    } else {
        Err(TargetStatus::NotConfigured)
    }
}

/// Current remote polling generation.
struct RemoteGeneration {
    target: Target,
    cancel: CancellationToken,
}

/// Start local polling, then follow the gate: start, restart or stop the
/// remote pollers whenever its answer changes.
async fn supervisor_task(
    console: Console,
    mut gate: watch::Receiver<GateState>,
    cancel: CancellationToken,
) {
    let mut generation: u64 = 1;
    if console
        .send_update(Update::Activated {
            target: Target::local(),
            generation,
        })
        .await
        .is_err()
    {
        return;
    }
    console.spawn_pollers(
        TargetKind::Local,
        generation,
        console.inner.console_client.clone(),
        &cancel.child_token(),
    );

    let mut remote: Option<RemoteGeneration> = None;
    let mut settled_status: Option<TargetStatus> = None;

    loop {
        let state = gate.borrow_and_update().clone();
        if !state.loading {
            let next = match desired_remote(&state) {
                Ok(target) => {
                    let unchanged = remote.as_ref().is_some_and(|r| r.target == target);
                    if unchanged {
                        None
                    } else {
                        match console.client_for(&target) {
                            Ok(Some(backend)) => Some(Ok((target, backend))),
                            Ok(None) => Some(Err(TargetStatus::NotConfigured)),
                            Err(e) => Some(Err(TargetStatus::ConfigError {
                                message: e.to_string(),
                            })),
                        }
                    }
                }
                Err(status) => Some(Err(status)),
            };

            match next {
                None => {}
                Some(Ok((target, backend))) => {
                    if let Some(old) = remote.take() {
                        old.cancel.cancel();
                    }
                    generation += 1;
                    info!(
                        endpoint = ?target.endpoint(),
                        generation,
                        "remote target activated"
                    );
                    console
                        .inner
                        .store
                        .targets
                        .send_modify(|t| t.remote = target.clone());
                    if console
                        .send_update(Update::Activated {
                            target: target.clone(),
                            generation,
                        })
                        .await
                        .is_err()
                    {
                        break;
                    }
                    let child = cancel.child_token();
                    console.spawn_pollers(TargetKind::Remote, generation, backend, &child);
                    remote = Some(RemoteGeneration {
                        target,
                        cancel: child,
                    });
                    settled_status = None;
                }
                Some(Err(status)) => {
                    if let Some(old) = remote.take() {
                        old.cancel.cancel();
                        info!("remote target deactivated");
                    }
                    console
                        .inner
                        .store
                        .targets
                        .send_modify(|t| t.remote = Target::unconfigured_remote());
                    if settled_status.as_ref() != Some(&status) {
                        if let TargetStatus::ConfigError { message } = &status {
                            warn!(error = %message, "remote target unavailable");
                        }
                        settled_status = Some(status.clone());
                        if console
                            .send_update(Update::Deactivated {
                                target: TargetKind::Remote,
                                status,
                            })
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                }
            }
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            changed = gate.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    if let Some(old) = remote.take() {
        old.cancel.cancel();
    }
    debug!("target supervisor stopped");
}

/// Receive commands and run each one on its own task, so a slow
/// operation never blocks the next.
async fn command_processor_task(console: Console, mut rx: mpsc::Receiver<CommandEnvelope>) {
    let cancel = console.inner.cancel.clone();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            envelope = rx.recv() => {
                let Some(envelope) = envelope else { break };
                let console = console.clone();
                tokio::spawn(async move {
                    let result = route_command(&console, envelope.command).await;
                    let _ = envelope.response_tx.send(result);
                });
            }
        }
    }
}

// ── Command routing ──────────────────────────────────────────────────

/// Register the operation, send its initiating request, and report the
/// request's outcome back to the tracker.
async fn route_command(console: &Console, cmd: Command) -> Result<CommandResult, CoreError> {
    let client = console.backend_for(cmd.target())?;
    let request = cmd.to_request(&console.inner.config.operations);

    let (reply, rx) = oneshot::channel();
    console.send_update(Update::Begin { request, reply }).await?;
    let op = rx.await.map_err(|_| CoreError::Disconnected)??;

    let result = match &cmd {
        Command::RestartService { name, .. } => client.restart_docker_service(name).await,
        Command::SetPowerMode { mode_id, .. } => client.set_power_mode(*mode_id).await,
        Command::Reboot { kind, .. } => client.reboot(*kind).await,
        Command::SetTurbo { enabled, .. } => client.set_turbo(*enabled).await,
        Command::SetFan { mode, speed, .. } => client.set_fan(mode, *speed).await,
    };

    let settle = Update::Settle {
        key: op.key.clone(),
        seq: op.seq,
        result: result.as_ref().map(|_| ()).map_err(ToString::to_string),
    };
    if console.send_update(settle).await.is_err() {
        debug!(key = %op.key, "reconciler gone before settle");
    }

    match result {
        Ok(response) => {
            info!(key = %op.key, seq = op.seq, "operation accepted");
            Ok(CommandResult::Accepted {
                key: op.key,
                seq: op.seq,
                message: response.message,
            })
        }
        Err(e) if op.self_referential => {
            info!(key = %op.key, error = %e, "request failed as expected for a self-referential operation");
            Ok(CommandResult::Assumed {
                key: op.key,
                seq: op.seq,
                reason: e.to_string(),
            })
        }
        Err(e) => {
            warn!(key = %op.key, error = %e, "operation request failed");
            Err(e.into())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn gate(configured: bool, address: Option<&str>, error: Option<&str>) -> GateState {
        GateState {
            configured,
            address: address.map(Into::into),
            port: None,
            loading: false,
            error: error.map(Into::into),
        }
    }

    #[test]
    fn desired_remote_follows_gate() {
        assert_eq!(
            desired_remote(&gate(true, Some("10.0.0.2"), None)),
            Ok(Target::remote("10.0.0.2", None))
        );
        assert_eq!(
            desired_remote(&gate(false, None, None)),
            Err(TargetStatus::NotConfigured)
        );
        assert_eq!(
            desired_remote(&gate(false, None, Some("boom"))),
            Err(TargetStatus::ConfigError {
                message: "boom".into()
            })
        );
    }

    #[tokio::test]
    async fn execute_requires_running_console() {
        let url = url::Url::parse("http://127.0.0.1:9").unwrap();
        let console = Console::new(ConsoleConfig::new(url)).unwrap();
        let err = console
            .execute(Command::SetTurbo {
                target: TargetKind::Local,
                enabled: true,
            })
            .await;
        assert!(matches!(err, Err(CoreError::Disconnected)));
    }
}
