//! Compute backend trait and device abstraction.
//!
//! The [`ComputeBackend`] trait abstracts over execution strategies
//! (thread pool, sequential) so that the sweep code in `surfpot-core`
//! never depends on a particular scheduler.

use thiserror::Error;

/// Errors originating from compute backends.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Backend not available: {0}")]
    Unavailable(String),

    #[error("Thread pool error: {0}")]
    ThreadPool(String),
}

/// Describes the capabilities of a compute backend.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub backend_type: BackendType,
    pub compute_units: Option<usize>,
}

/// The type of compute backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    Cpu,
    Serial,
}

/// Abstraction over evaluation strategies.
///
/// Implementations must guarantee that `result[i] == eval(i)` for every
/// index, i.e. the output is index-aligned with the input regardless of how
/// the work was scheduled. The evaluation function receives only an index
/// and must not rely on shared mutable state.
pub trait ComputeBackend: Send + Sync {
    /// Return information about the device.
    fn device_info(&self) -> DeviceInfo;

    /// Evaluate `eval` at every index in `0..len`, preserving index order.
    fn map_indexed<T, F>(&self, len: usize, eval: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Send + Sync;

    /// Evaluate `eval` for each element of `inputs`, preserving order.
    fn map_slice<I, T, F>(&self, inputs: &[I], eval: F) -> Vec<T>
    where
        I: Sync,
        T: Send,
        F: Fn(&I) -> T + Send + Sync,
    {
        self.map_indexed(inputs.len(), |i| eval(&inputs[i]))
    }
}

/// A backend chosen at runtime (e.g. from a configuration string).
#[derive(Debug)]
pub enum AnyBackend {
    #[cfg(feature = "cpu")]
    Cpu(crate::cpu::CpuBackend),
    Serial(crate::serial::SerialBackend),
}

impl AnyBackend {
    /// Resolve a backend from a preference string.
    ///
    /// - `"cpu"` — thread-pool backend (errors if built without `cpu`).
    /// - `"serial"` — sequential evaluation.
    /// - `"auto"` (or anything else) — CPU when available, otherwise serial.
    ///
    /// `threads == 0` means "use every available thread".
    pub fn from_preference(preference: &str, threads: usize) -> Result<Self, ComputeError> {
        match preference {
            "serial" => Ok(Self::Serial(crate::serial::SerialBackend)),
            "cpu" => {
                #[cfg(feature = "cpu")]
                {
                    Ok(Self::Cpu(crate::cpu::CpuBackend::with_threads(threads)?))
                }
                #[cfg(not(feature = "cpu"))]
                {
                    let _ = threads;
                    Err(ComputeError::Unavailable(
                        "binary was built without the `cpu` feature".into(),
                    ))
                }
            }
            _ => {
                #[cfg(feature = "cpu")]
                {
                    Ok(Self::Cpu(crate::cpu::CpuBackend::with_threads(threads)?))
                }
                #[cfg(not(feature = "cpu"))]
                {
                    let _ = threads;
                    log::info!("CPU backend not compiled in, using serial evaluation");
                    Ok(Self::Serial(crate::serial::SerialBackend))
                }
            }
        }
    }
}

impl ComputeBackend for AnyBackend {
    fn device_info(&self) -> DeviceInfo {
        match self {
            #[cfg(feature = "cpu")]
            Self::Cpu(b) => b.device_info(),
            Self::Serial(b) => b.device_info(),
        }
    }

    fn map_indexed<T, F>(&self, len: usize, eval: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Send + Sync,
    {
        match self {
            #[cfg(feature = "cpu")]
            Self::Cpu(b) => b.map_indexed(len, eval),
            Self::Serial(b) => b.map_indexed(len, eval),
        }
    }
}
