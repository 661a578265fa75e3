// wattline-core: Reactive data layer between wattline-api and consumers (TUI).

pub mod config;
pub mod diagram;
pub mod error;
pub mod model;
pub mod monitor;
mod poller;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT, MonitorConfig, TlsVerification};
pub use error::CoreError;
pub use monitor::{BatchReparentReport, Monitor, ReparentChange, ReparentOutcome};
pub use store::{PollState, SnapshotStore};

// Re-export model and diagram types at the crate root for ergonomics.
pub use diagram::{
    DiagramEdge, DiagramGraph, DiagramNode, LayoutParams, LayoutedDiagram, NodeId, PositionedNode,
    build_diagram, layout_diagram,
};
pub use model::{Device, PowerSnapshot};
