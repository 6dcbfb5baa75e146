// jetdash-core: polling, reconciliation and operation tracking between
// jetdash-api and consumers (CLI).

pub mod command;
pub mod config;
pub mod console;
pub mod convert;
pub mod error;
pub mod gate;
pub mod merge;
pub mod model;
pub mod pending;
pub(crate) mod scheduler;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{Command, CommandResult};
pub use config::{ArrivalPolicy, ConsoleConfig, OperationTimeouts, PollIntervals};
pub use console::{Console, ConsoleState};
pub use error::CoreError;
pub use merge::{MergeStats, Merger};
pub use pending::{Observation, OperationRequest, PendingTracker};
pub use store::DataStore;
pub use stream::SnapshotStream;

// Re-export model types at the crate root for ergonomics.
pub use model::{
    // Targets
    GateState, Target, TargetKind, TargetSet, TargetStatus,
    // Devices
    DeviceInventory, DeviceRecord, MacAddress, MacKey, ScanResult, ScanSource,
    // Snapshots
    InventorySnapshot, NOT_CONFIGURED, ScalarSnapshot, Source,
    // Operations
    Confirmation, OperationEvent, OperationKey, OperationKind, PendingOperation,
    // Backend payloads
    ClockState, DockerService, FanState, GpuInfo, HardwareSentinel, NetworkDevice, PowerMode,
    PowerModeState, RebootKind, SwapState, SystemInfo,
};
pub use jetdash_api::TlsMode;
