//! CPU compute backend using Rayon for shared-memory parallelism.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::backend::{BackendType, ComputeBackend, ComputeError, DeviceInfo};

/// CPU backend that parallelises work across threads via Rayon.
///
/// With no explicit thread count the global Rayon pool is used; otherwise a
/// dedicated pool of the requested size is built once and reused.
pub struct CpuBackend {
    num_threads: usize,
    pool: Option<ThreadPool>,
}

impl CpuBackend {
    /// Create a new CPU backend using all available threads.
    pub fn new() -> Self {
        Self {
            num_threads: rayon::current_num_threads(),
            pool: None,
        }
    }

    /// Create a CPU backend with a specified thread count (`0` = all).
    pub fn with_threads(num_threads: usize) -> Result<Self, ComputeError> {
        if num_threads == 0 {
            return Ok(Self::new());
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()
            .map_err(|e| ComputeError::ThreadPool(e.to_string()))?;
        log::debug!("built dedicated thread pool with {num_threads} threads");
        Ok(Self {
            num_threads,
            pool: Some(pool),
        })
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CpuBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuBackend")
            .field("num_threads", &self.num_threads)
            .field("dedicated_pool", &self.pool.is_some())
            .finish()
    }
}

impl ComputeBackend for CpuBackend {
    fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            name: format!("CPU ({} threads)", self.num_threads),
            backend_type: BackendType::Cpu,
            compute_units: Some(self.num_threads),
        }
    }

    fn map_indexed<T, F>(&self, len: usize, eval: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Send + Sync,
    {
        // Indexed parallel iterators collect in index order.
        let run = || (0..len).into_par_iter().map(&eval).collect::<Vec<T>>();
        match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_preserves_order() {
        let backend = CpuBackend::new();
        let out = backend.map_indexed(1000, |i| (i as f64).sqrt());
        for (i, v) in out.iter().enumerate() {
            assert_eq!(*v, (i as f64).sqrt());
        }
    }

    #[test]
    fn test_dedicated_pool_matches_global() {
        let backend = CpuBackend::with_threads(2).unwrap();
        assert_eq!(backend.num_threads(), 2);
        let out = backend.map_slice(&[3_u32, 1, 2], |x| x * x);
        assert_eq!(out, vec![9, 1, 4]);
    }

    #[test]
    fn test_zero_threads_means_all() {
        let backend = CpuBackend::with_threads(0).unwrap();
        assert_eq!(backend.device_info().backend_type, BackendType::Cpu);
        assert!(backend.num_threads() >= 1);
    }
}
