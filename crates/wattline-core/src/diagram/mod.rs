//! Single-line diagram derivation.
//!
//! Turns one poll cycle's flat device list into a bus-rooted node/edge
//! graph ([`builder`]) and assigns deterministic 2D positions to it
//! ([`layout`]). Both stages are pure: rebuilt from scratch on every
//! refresh, never stored.

pub mod builder;
pub mod layout;

pub use builder::{DiagramEdge, DiagramGraph, DiagramNode, NodeId, build_diagram};
pub use layout::{LayoutParams, LayoutedDiagram, PositionedNode, layout_diagram};
