// ── Domain model ──
//
// Targets, device records, snapshots and operations. Scalar payloads
// (system info, GPU, docker, power mode, sentinel) are the backend's own
// shapes and are re-exported from `jetdash-api` unchanged.

pub mod device;
pub mod operation;
pub mod snapshot;
pub mod target;

pub use device::{DeviceInventory, DeviceRecord, MacAddress, MacKey, ScanResult, ScanSource};
pub use operation::{Confirmation, OperationEvent, OperationKey, OperationKind, PendingOperation};
pub use snapshot::{InventorySnapshot, NOT_CONFIGURED, ScalarSnapshot, Source};
pub use target::{GateState, Target, TargetKind, TargetSet, TargetStatus};

pub use jetdash_api::models::{
    ClockState, DockerService, FanState, GpuInfo, HardwareSentinel, NetworkDevice, PowerMode,
    PowerModeState, RebootKind, SwapState, SystemInfo,
};
