//! Canonical domain types.

pub mod device;

pub use device::{Device, PowerSnapshot};
