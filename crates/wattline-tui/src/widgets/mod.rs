//! Shared formatting helpers used across screens.

pub mod power_fmt;
