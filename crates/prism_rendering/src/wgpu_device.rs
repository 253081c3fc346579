//! # wgpu Backend
//!
//! [`GpuDevice`] over a `wgpu::Device` and its `wgpu::Queue`. Handles index a
//! buffer table; writes go through `Queue::write_buffer` and are padded to
//! `COPY_BUFFER_ALIGNMENT`.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::warn;

use crate::device::{BufferDesc, BufferHandle, BufferUsage, GpuDevice};
use crate::error::{GpuError, GpuResult};

struct Entry {
    buffer: wgpu::Buffer,
    size: u64,
}

/// wgpu-backed device.
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    buffers: Mutex<HashMap<BufferHandle, Entry>>,
    next_id: AtomicU64,
}

impl WgpuDevice {
    /// Wraps a device and its queue.
    #[must_use]
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            buffers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// The wrapped device.
    #[must_use]
    pub const fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// The wrapped queue.
    #[must_use]
    pub const fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Runs `f` with the wgpu buffer behind `handle`, for binding it.
    pub fn with_buffer<R>(&self, handle: BufferHandle, f: impl FnOnce(&wgpu::Buffer) -> R) -> Option<R> {
        self.buffers.lock().get(&handle).map(|entry| f(&entry.buffer))
    }

    /// Number of live buffers.
    #[must_use]
    pub fn live_buffers(&self) -> usize {
        self.buffers.lock().len()
    }
}

fn to_wgpu_usage(usage: BufferUsage) -> wgpu::BufferUsages {
    let mut out = wgpu::BufferUsages::empty();
    for (flag, wgpu_flag) in [
        (BufferUsage::VERTEX, wgpu::BufferUsages::VERTEX),
        (BufferUsage::INDEX, wgpu::BufferUsages::INDEX),
        (BufferUsage::UNIFORM, wgpu::BufferUsages::UNIFORM),
        (BufferUsage::STORAGE, wgpu::BufferUsages::STORAGE),
        (BufferUsage::COPY_DST, wgpu::BufferUsages::COPY_DST),
    ] {
        if usage.contains(flag) {
            out |= wgpu_flag;
        }
    }
    out
}

fn align_copy(size: u64) -> u64 {
    size.div_ceil(wgpu::COPY_BUFFER_ALIGNMENT) * wgpu::COPY_BUFFER_ALIGNMENT
}

/// Range-checks a write of `data` at `offset` into a buffer of `capacity`
/// bytes and pads it to the copy alignment.
fn padded_write(data: &[u8], offset: u64, capacity: u64) -> GpuResult<Cow<'_, [u8]>> {
    let len = data.len() as u64;
    let padded = align_copy(len);
    let out_of_range = GpuError::WriteOutOfRange {
        offset,
        len,
        capacity,
    };
    if offset % wgpu::COPY_BUFFER_ALIGNMENT != 0 || offset.saturating_add(padded) > capacity {
        return Err(out_of_range);
    }
    if padded == len {
        return Ok(Cow::Borrowed(data));
    }
    let padded = usize::try_from(padded).map_err(|_| out_of_range)?;
    let mut bytes = data.to_vec();
    bytes.resize(padded, 0);
    Ok(Cow::Owned(bytes))
}

impl GpuDevice for WgpuDevice {
    fn create_buffer(&self, desc: &BufferDesc) -> GpuResult<BufferHandle> {
        let size = align_copy(desc.size.max(wgpu::COPY_BUFFER_ALIGNMENT));
        let limit = self.max_buffer_size();
        if size > limit {
            return Err(GpuError::AllocationFailed {
                label: desc.label,
                size,
                reason: format!("exceeds device limit {limit}"),
            });
        }
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(desc.label),
            size,
            usage: to_wgpu_usage(desc.usage),
            mapped_at_creation: false,
        });
        let handle = BufferHandle::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.buffers.lock().insert(handle, Entry { buffer, size });
        Ok(handle)
    }

    fn write_buffer(&self, buffer: BufferHandle, offset: u64, data: &[u8]) -> GpuResult<()> {
        let buffers = self.buffers.lock();
        let entry = buffers.get(&buffer).ok_or(GpuError::UnknownBuffer(buffer))?;
        let bytes = padded_write(data, offset, entry.size)?;
        self.queue.write_buffer(&entry.buffer, offset, &bytes);
        Ok(())
    }

    fn destroy_buffer(&self, buffer: BufferHandle) {
        match self.buffers.lock().remove(&buffer) {
            Some(entry) => entry.buffer.destroy(),
            None => warn!(%buffer, "destroy of unknown buffer"),
        }
    }

    fn max_buffer_size(&self) -> u64 {
        self.device.limits().max_buffer_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_mapping() {
        let usage = to_wgpu_usage(BufferUsage::UNIFORM | BufferUsage::COPY_DST);
        assert_eq!(usage, wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST);
        assert_eq!(to_wgpu_usage(BufferUsage::default()), wgpu::BufferUsages::empty());
    }

    #[test]
    fn test_copy_alignment() {
        assert_eq!(align_copy(0), 0);
        assert_eq!(align_copy(1), 4);
        assert_eq!(align_copy(96), 96);
        assert_eq!(align_copy(97), 100);
    }

    #[test]
    fn test_padded_write() {
        let aligned = [1u8; 8];
        assert!(matches!(padded_write(&aligned, 4, 12).unwrap(), Cow::Borrowed(_)));

        let bytes = padded_write(&[7u8; 5], 0, 8).unwrap();
        assert_eq!(&*bytes, &[7, 7, 7, 7, 7, 0, 0, 0]);
    }

    #[test]
    fn test_padded_write_rejects_out_of_range() {
        // padding pushes the copy past the end
        assert_eq!(
            padded_write(&[0u8; 5], 4, 8).unwrap_err(),
            GpuError::WriteOutOfRange {
                offset: 4,
                len: 5,
                capacity: 8
            }
        );
        assert!(padded_write(&[0u8; 4], 2, 16).is_err());
        assert!(padded_write(&[0u8; 4], 16, 16).is_err());
    }
}
