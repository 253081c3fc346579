//! # GPU Device Seam
//!
//! Everything above this trait talks to the GPU through opaque
//! [`BufferHandle`]s. The wgpu backend lives in
//! [`WgpuDevice`](crate::wgpu_device::WgpuDevice); tests use
//! [`RecordingDevice`](crate::testing::RecordingDevice).
//!
//! Buffers are created and destroyed only by the sync bridge and the derived
//! buffer cache. Systems never call `create_buffer` ad hoc.

use std::fmt;
use std::ops::BitOr;

use crate::error::GpuResult;

/// Opaque device buffer id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(u64);

impl BufferHandle {
    /// Wraps a backend id.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Backend id.
    #[inline]
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BufferHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buffer#{}", self.0)
    }
}

/// Buffer usage flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BufferUsage(u32);

impl BufferUsage {
    /// Vertex input.
    pub const VERTEX: Self = Self(1);
    /// Index input.
    pub const INDEX: Self = Self(1 << 1);
    /// Uniform binding.
    pub const UNIFORM: Self = Self(1 << 2);
    /// Storage binding.
    pub const STORAGE: Self = Self(1 << 3);
    /// Destination of host writes.
    pub const COPY_DST: Self = Self(1 << 4);

    /// Checks if every flag of `other` is set.
    #[inline]
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Raw bits.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }
}

impl BitOr for BufferUsage {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Parameters of a buffer allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferDesc {
    /// Debug label.
    pub label: &'static str,
    /// Size in bytes, a multiple of 4.
    pub size: u64,
    /// Usage flags.
    pub usage: BufferUsage,
}

/// A device buffer together with what the bridge knows about it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GpuBuffer {
    /// Device handle.
    pub handle: BufferHandle,
    /// Allocated bytes.
    pub capacity: u64,
    /// Usage flags it was created with.
    pub usage: BufferUsage,
}

/// Minimal device interface used by the bridge.
///
/// Implementations use interior mutability; every call takes `&self`.
pub trait GpuDevice: Send + Sync {
    /// Allocates a buffer.
    ///
    /// # Errors
    ///
    /// Returns [`GpuError::AllocationFailed`](crate::GpuError::AllocationFailed)
    /// if the device cannot provide it.
    fn create_buffer(&self, desc: &BufferDesc) -> GpuResult<BufferHandle>;

    /// Copies `data` into a buffer starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown handle or an out-of-range write.
    fn write_buffer(&self, buffer: BufferHandle, offset: u64, data: &[u8]) -> GpuResult<()>;

    /// Releases a buffer. Unknown handles are ignored.
    fn destroy_buffer(&self, buffer: BufferHandle);

    /// Largest buffer the device will allocate.
    fn max_buffer_size(&self) -> u64;
}
