//! Async client for the jetdash monitoring backend.
//!
//! One [`MonitorClient`] talks to one backend. The console backend serves
//! configuration, chat and the `local_` / `remote_` system-info and network
//! endpoints; each target's own backend serves GPU, docker, power-mode,
//! hardware-sentinel and operation endpoints.

pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use client::MonitorClient;
pub use error::Error;
pub use models::{
    ActionResponse, ChatReply, ClockState, ConfigResponse, DockerService, FanState, GpuInfo,
    HardwareSentinel, NetworkDevice, PowerMode, PowerModeState, RebootKind, Scope, SwapState,
    SystemInfo,
};
pub use transport::{TlsMode, TransportConfig};
