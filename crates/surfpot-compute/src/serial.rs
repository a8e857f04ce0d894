//! Sequential reference backend.

use crate::backend::{BackendType, ComputeBackend, DeviceInfo};

/// Evaluates every index on the calling thread, in order.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialBackend;

impl ComputeBackend for SerialBackend {
    fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            name: "Serial (1 thread)".into(),
            backend_type: BackendType::Serial,
            compute_units: Some(1),
        }
    }

    fn map_indexed<T, F>(&self, len: usize, eval: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Send + Sync,
    {
        (0..len).map(eval).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_preserves_order() {
        let out = SerialBackend.map_indexed(5, |i| i * 10);
        assert_eq!(out, vec![0, 10, 20, 30, 40]);
    }

    #[test]
    fn test_serial_map_slice() {
        let inputs = [1.5, -2.0, 4.0];
        let out = SerialBackend.map_slice(&inputs, |x| x * 2.0);
        assert_eq!(out, vec![3.0, -4.0, 8.0]);
    }
}
