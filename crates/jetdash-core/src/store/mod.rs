// ── Snapshot store ──
//
// Watch-backed storage for everything the console has learned, plus the
// single task allowed to write to it.

mod data_store;
mod reconcile;

pub use data_store::DataStore;
pub(crate) use reconcile::{Reconciler, Update, reconcile_task};
