// Monitoring backend HTTP client
//
// Wraps `reqwest::Client` with URL construction and the backend's error
// conventions. The same client type serves the console backend and a
// remote target's backend; which endpoints go where is decided by the
// caller.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::models::{
    ActionResponse, ChatReply, ChatRequest, ConfigResponse, DockerService, FanRequest, GpuInfo,
    HardwareSentinel, NetworkDevice, PowerModeRequest, PowerModeState, RebootKind, RebootRequest,
    RestartRequest, Scope, SystemInfo, TurboRequest,
};
use crate::transport::TransportConfig;

/// Any JSON object carrying an `error` key is an error report, whatever
/// the HTTP status.
#[derive(serde::Deserialize)]
struct ErrorBody {
    error: serde_json::Value,
}

impl ErrorBody {
    fn message(&self) -> String {
        match &self.error {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Raw HTTP client for one monitoring backend.
#[derive(Debug, Clone)]
pub struct MonitorClient {
    http: reqwest::Client,
    base_url: Url,
}

impl MonitorClient {
    /// Create a client for the backend at `base_url` using `transport`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a client sharing an existing `reqwest::Client` (and its
    /// connection pool).
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// Base URL for a remote target: `http://address[:port]`.
    pub fn target_url(address: &str, port: Option<&str>) -> Result<Url, Error> {
        let raw = match port {
            Some(port) => format!("http://{address}:{port}"),
            None => format!("http://{address}"),
        };
        Ok(Url::parse(&raw)?)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// `{base}/api/{path}`
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/api/{path}"))?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.api_url(path)?;
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await.map_err(Error::Transport)?;
        Self::parse_body(resp).await
    }

    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &(impl Serialize + Sync),
    ) -> Result<T, Error> {
        let url = self.api_url(path)?;
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(Error::Transport)?;
        Self::parse_body(resp).await
    }

    /// Map status and `{error}` bodies onto [`Error`], then decode `T`.
    async fn parse_body<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();
        let body = resp.text().await.map_err(Error::Transport)?;
        trace!(status = status.as_u16(), len = body.len(), "response body");

        let reported = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .map(|e| e.message());

        if !status.is_success() {
            let message = reported.unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .map_or_else(|| body.chars().take(200).collect(), str::to_owned)
            });
            return Err(Error::Http {
                status: status.as_u16(),
                message,
            });
        }

        if let Some(message) = reported {
            return Err(Error::Backend { message });
        }

        serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body,
            }
        })
    }

    // ── Console-served endpoints ─────────────────────────────────────

    pub async fn config(&self) -> Result<ConfigResponse, Error> {
        self.get("config").await
    }

    pub async fn system_info(&self, scope: Scope) -> Result<SystemInfo, Error> {
        self.get(&format!("{scope}_system_info")).await
    }

    /// Fast, low-fidelity device list (ARP cache).
    pub async fn network_status(&self, scope: Scope) -> Result<Vec<NetworkDevice>, Error> {
        self.get(&format!("{scope}_network_status")).await
    }

    /// Slow, high-fidelity device scan.
    pub async fn network_scan(&self, scope: Scope) -> Result<Vec<NetworkDevice>, Error> {
        self.get(&format!("{scope}_network_scan")).await
    }

    pub async fn chat(&self, prompt: &str) -> Result<ChatReply, Error> {
        self.post("chat", &ChatRequest { prompt }).await
    }

    // ── Target-served endpoints ──────────────────────────────────────

    pub async fn gpu_info(&self) -> Result<GpuInfo, Error> {
        self.get("jetson_gpu_info").await
    }

    pub async fn docker_services(&self) -> Result<Vec<DockerService>, Error> {
        self.get("docker_services").await
    }

    pub async fn restart_docker_service(&self, name: &str) -> Result<ActionResponse, Error> {
        self.post("docker_services/restart", &RestartRequest { name })
            .await
    }

    pub async fn power_mode(&self) -> Result<PowerModeState, Error> {
        self.get("power_mode").await
    }

    pub async fn set_power_mode(&self, mode_id: u32) -> Result<ActionResponse, Error> {
        self.post("power_mode", &PowerModeRequest { mode_id }).await
    }

    pub async fn reboot(&self, kind: RebootKind) -> Result<ActionResponse, Error> {
        self.post("command/reboot", &RebootRequest { kind }).await
    }

    pub async fn hardware_sentinel(&self) -> Result<HardwareSentinel, Error> {
        self.get("hardware_sentinel").await
    }

    pub async fn set_turbo(&self, enabled: bool) -> Result<ActionResponse, Error> {
        self.post("hardware_sentinel/turbo", &TurboRequest { enabled })
            .await
    }

    pub async fn set_fan(&self, mode: &str, speed: Option<u32>) -> Result<ActionResponse, Error> {
        self.post("hardware_sentinel/fan", &FanRequest { mode, speed })
            .await
    }
}
