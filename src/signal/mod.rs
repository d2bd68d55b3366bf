//! # Signal Module
//!
//! Turns raw axis readings into calibrated report values.
//!
//! This module handles:
//! - Moving-average smoothing per channel (see [`filter`])
//! - The cosine steering response curve (see [`curve`])
//! - The full per-tick stage chain (see [`pipeline`])

pub mod curve;
pub mod filter;
pub mod pipeline;

pub use pipeline::{AxisValues, PipelineStages, RawAxes, SignalPipeline};
