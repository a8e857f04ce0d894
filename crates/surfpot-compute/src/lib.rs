//! # Surfpot Compute
//!
//! Compute backend abstraction for the Surfpot framework. This crate
//! provides a [`ComputeBackend`](backend::ComputeBackend) trait that isolates
//! the physics code from how independent evaluations are scheduled.
//!
//! Every backend implements the same contract: evaluate a pure function at
//! `N` independent indices and return the results in index order, whatever
//! the completion order of the workers was.
//!
//! ## Available backends
//!
//! | Backend | Feature flag | Status |
//! |---------|-------------|--------|
//! | CPU (Rayon) | `cpu` (default) | Implemented |
//! | Serial | always | Implemented (reference / debugging) |

pub mod backend;
pub mod serial;

#[cfg(feature = "cpu")]
pub mod cpu;

pub use backend::{AnyBackend, BackendType, ComputeBackend, ComputeError, DeviceInfo};
pub use serial::SerialBackend;

#[cfg(feature = "cpu")]
pub use cpu::CpuBackend;
