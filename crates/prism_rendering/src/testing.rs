//! In-memory [`GpuDevice`] that records every call.
//!
//! Used by the unit tests, the integration tests and the benchmarks to count
//! allocations, writes and releases without a GPU.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::device::{BufferDesc, BufferHandle, GpuDevice};
use crate::error::{GpuError, GpuResult};

/// Call counters of a [`RecordingDevice`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeviceStats {
    /// Successful `create_buffer` calls.
    pub created: u64,
    /// `destroy_buffer` calls on live buffers.
    pub destroyed: u64,
    /// `destroy_buffer` calls on unknown or already destroyed buffers.
    pub invalid_destroys: u64,
    /// Successful `write_buffer` calls.
    pub writes: u64,
    /// Bytes copied by successful writes.
    pub bytes_written: u64,
    /// Rejected `create_buffer` calls.
    pub failed_allocations: u64,
}

impl DeviceStats {
    /// Total device calls that reached the backend.
    #[must_use]
    pub const fn calls(&self) -> u64 {
        self.created + self.destroyed + self.invalid_destroys + self.writes + self.failed_allocations
    }
}

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    live: HashMap<BufferHandle, (&'static str, u64)>,
    stats: DeviceStats,
    fail_allocations: u32,
}

/// Recording device. Buffers are bookkeeping only; no bytes are stored.
#[derive(Debug)]
pub struct RecordingDevice {
    state: Mutex<State>,
    max_buffer_size: u64,
}

impl Default for RecordingDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingDevice {
    /// Creates a device with a 256 MiB buffer limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_buffer_size(256 << 20)
    }

    /// Creates a device with a custom buffer limit.
    #[must_use]
    pub fn with_max_buffer_size(max_buffer_size: u64) -> Self {
        Self {
            state: Mutex::new(State::default()),
            max_buffer_size,
        }
    }

    /// Makes the next `count` allocations fail.
    pub fn fail_next_allocations(&self, count: u32) {
        self.state.lock().fail_allocations = count;
    }

    /// Snapshot of the call counters.
    #[must_use]
    pub fn stats(&self) -> DeviceStats {
        self.state.lock().stats.clone()
    }

    /// Number of buffers created and not yet destroyed.
    #[must_use]
    pub fn live_buffers(&self) -> usize {
        self.state.lock().live.len()
    }

    /// Capacity of a live buffer.
    #[must_use]
    pub fn capacity(&self, buffer: BufferHandle) -> Option<u64> {
        self.state.lock().live.get(&buffer).map(|(_, size)| *size)
    }

    /// Labels of the live buffers, sorted.
    #[must_use]
    pub fn live_labels(&self) -> Vec<&'static str> {
        let mut labels: Vec<_> = self.state.lock().live.values().map(|(label, _)| *label).collect();
        labels.sort_unstable();
        labels
    }
}

impl GpuDevice for RecordingDevice {
    fn create_buffer(&self, desc: &BufferDesc) -> GpuResult<BufferHandle> {
        let mut state = self.state.lock();
        if state.fail_allocations > 0 {
            state.fail_allocations -= 1;
            state.stats.failed_allocations += 1;
            return Err(GpuError::AllocationFailed {
                label: desc.label,
                size: desc.size,
                reason: "injected failure".into(),
            });
        }
        if desc.size > self.max_buffer_size {
            state.stats.failed_allocations += 1;
            return Err(GpuError::AllocationFailed {
                label: desc.label,
                size: desc.size,
                reason: format!("exceeds device limit {}", self.max_buffer_size),
            });
        }
        state.next_id += 1;
        let handle = BufferHandle::new(state.next_id);
        state.live.insert(handle, (desc.label, desc.size));
        state.stats.created += 1;
        Ok(handle)
    }

    fn write_buffer(&self, buffer: BufferHandle, offset: u64, data: &[u8]) -> GpuResult<()> {
        let mut state = self.state.lock();
        let Some(&(_, capacity)) = state.live.get(&buffer) else {
            return Err(GpuError::UnknownBuffer(buffer));
        };
        let len = data.len() as u64;
        if offset.saturating_add(len) > capacity {
            return Err(GpuError::WriteOutOfRange {
                offset,
                len,
                capacity,
            });
        }
        state.stats.writes += 1;
        state.stats.bytes_written += len;
        Ok(())
    }

    fn destroy_buffer(&self, buffer: BufferHandle) {
        let mut state = self.state.lock();
        if state.live.remove(&buffer).is_some() {
            state.stats.destroyed += 1;
        } else {
            state.stats.invalid_destroys += 1;
        }
    }

    fn max_buffer_size(&self) -> u64 {
        self.max_buffer_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::BufferUsage;

    fn desc(size: u64) -> BufferDesc {
        BufferDesc {
            label: "test",
            size,
            usage: BufferUsage::VERTEX | BufferUsage::COPY_DST,
        }
    }

    #[test]
    fn test_tracks_lifecycle() {
        let device = RecordingDevice::new();
        let handle = device.create_buffer(&desc(64)).unwrap();
        device.write_buffer(handle, 0, &[0; 64]).unwrap();
        device.destroy_buffer(handle);
        device.destroy_buffer(handle);

        let stats = device.stats();
        assert_eq!(stats.created, 1);
        assert_eq!(stats.writes, 1);
        assert_eq!(stats.bytes_written, 64);
        assert_eq!(stats.destroyed, 1);
        assert_eq!(stats.invalid_destroys, 1);
        assert_eq!(device.live_buffers(), 0);
    }

    #[test]
    fn test_rejects_out_of_range_write() {
        let device = RecordingDevice::new();
        let handle = device.create_buffer(&desc(16)).unwrap();
        let err = device.write_buffer(handle, 8, &[0; 16]).unwrap_err();
        assert!(matches!(err, GpuError::WriteOutOfRange { capacity: 16, .. }));
    }

    #[test]
    fn test_injected_failure() {
        let device = RecordingDevice::new();
        device.fail_next_allocations(1);
        assert!(device.create_buffer(&desc(16)).is_err());
        assert!(device.create_buffer(&desc(16)).is_ok());
        assert_eq!(device.stats().failed_allocations, 1);
    }

    #[test]
    fn test_limit() {
        let device = RecordingDevice::with_max_buffer_size(32);
        assert!(device.create_buffer(&desc(64)).is_err());
    }
}
