// ── Target configuration gate ──
//
// Asks the console backend whether a remote target is configured, at
// startup and then on a long interval, and publishes the answer.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use jetdash_api::{ConfigResponse, MonitorClient};

use crate::model::GateState;
use crate::store::DataStore;

/// Turn one configuration answer into gate state.
///
/// A failed query is a configuration error, distinct from an intentional
/// absence of a remote target.
pub fn resolve(result: Result<ConfigResponse, jetdash_api::Error>) -> GateState {
    match result {
        Ok(cfg) if cfg.monitor_target_host_set => {
            let host = cfg
                .monitor_target_host
                .map(|h| h.trim().to_owned())
                .filter(|h| !h.is_empty());
            match host {
                Some(address) => GateState {
                    configured: true,
                    address: Some(address),
                    port: cfg.monitor_target_port,
                    loading: false,
                    error: None,
                },
                None => GateState {
                    configured: false,
                    address: None,
                    port: None,
                    loading: false,
                    error: Some("Remote target is marked as set but no host was provided".into()),
                },
            }
        }
        Ok(_) => GateState {
            configured: false,
            address: None,
            port: None,
            loading: false,
            error: None,
        },
        Err(e) => GateState {
            configured: false,
            address: None,
            port: None,
            loading: false,
            error: Some(e.to_string()),
        },
    }
}

/// Query the configuration now and every `interval`, publishing changes.
pub(crate) async fn gate_task(
    client: MonitorClient,
    interval: Duration,
    store: Arc<DataStore>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let state = resolve(client.config().await);
                match (&state.error, state.configured) {
                    (Some(e), _) => warn!(error = %e, "remote target configuration error"),
                    (None, true) => debug!(address = ?state.address, port = ?state.port, "remote target configured"),
                    (None, false) => debug!("no remote target configured"),
                }
                store.gate.send_if_modified(|current| {
                    if *current == state {
                        false
                    } else {
                        info!(configured = state.configured, "remote target configuration changed");
                        *current = state;
                        true
                    }
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn cfg(set: bool, host: Option<&str>, port: Option<&str>) -> ConfigResponse {
        ConfigResponse {
            monitor_target_host_set: set,
            monitor_target_host: host.map(Into::into),
            monitor_target_port: port.map(Into::into),
        }
    }

    #[test]
    fn configured_host_and_port() {
        let state = resolve(Ok(cfg(true, Some("10.0.0.2"), Some("5000"))));
        assert_eq!(
            state,
            GateState {
                configured: true,
                address: Some("10.0.0.2".into()),
                port: Some("5000".into()),
                loading: false,
                error: None,
            }
        );
    }

    #[test]
    fn not_configured_is_not_an_error() {
        let state = resolve(Ok(cfg(false, None, None)));
        assert!(!state.configured);
        assert!(!state.loading);
        assert_eq!(state.error, None);
    }

    #[test]
    fn set_without_host_is_config_error() {
        let state = resolve(Ok(cfg(true, Some("  "), Some("5000"))));
        assert!(!state.configured);
        assert!(state.error.is_some());
    }

    #[test]
    fn query_failure_is_config_error() {
        let state = resolve(Err(jetdash_api::Error::Http {
            status: 500,
            message: "Internal Server Error".into(),
        }));
        assert!(!state.configured);
        assert_eq!(state.error.as_deref(), Some("HTTP 500: Internal Server Error"));
    }
}
