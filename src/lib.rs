// Library exports for the tab hierarchy store
//
// # Mutex Usage Policy
//
// tabstree uses two mutex types. New code should follow these rules:
//
//   - `tokio::sync::Mutex`    - only behind `ExclusionLock`. It is fair (FIFO)
//                               and its guard may be held across `.await`, which
//                               every read-modify-write body needs for host calls.
//
//   - `parking_lot::Mutex`    - for sync-only state that is never held across an
//                               await point (in-memory key-value backend, the
//                               simulated host, the debug log file).
//
// Nothing outside an exclusive body may read or write the stored collection;
// `HierarchyStore::get`/`set` demand an `ExclusionGuard` to enforce that.

/// Crate version, for log headers and the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod debug;

pub mod cli;
pub mod engine;
pub mod error;
pub mod exclusion;
pub mod forest;
pub mod host;
pub mod notify;
pub mod persistence;
pub mod protocol;
pub mod store;
pub mod window;

pub use engine::{EngineOptions, MutationEngine};
pub use error::{HostError, StoreError};
pub use forest::{Collection, Forest, ForestEntry, TabId, WindowId};
pub use store::HierarchyStore;
