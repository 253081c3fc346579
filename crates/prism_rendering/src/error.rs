//! # Rendering Error Types
//!
//! - [`GpuError`]: device-side failures. Fatal for the affected buffer in
//!   that frame; the bridge rolls the slot back to "no buffer".
//! - [`RenderError`]: setup-time failures of the graphics service.

use thiserror::Error;

use prism_core::{ConfigError, SchedulerError, StoreError, SystemError};

use crate::device::BufferHandle;

/// Errors produced by a GPU device.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GpuError {
    /// The device refused to allocate a buffer.
    #[error("failed to allocate {size} byte buffer `{label}`: {reason}")]
    AllocationFailed {
        /// Buffer label.
        label: &'static str,
        /// Requested size in bytes.
        size: u64,
        /// Backend message.
        reason: String,
    },

    /// The handle does not name a live buffer.
    #[error("unknown buffer {0}")]
    UnknownBuffer(BufferHandle),

    /// A write would run past the end of the buffer.
    #[error("write of {len} bytes at offset {offset} exceeds buffer capacity {capacity}")]
    WriteOutOfRange {
        /// Write offset.
        offset: u64,
        /// Write length.
        len: u64,
        /// Buffer capacity.
        capacity: u64,
    },
}

/// Result type for device operations.
pub type GpuResult<T> = Result<T, GpuError>;

/// Errors produced while assembling the graphics service.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Store registration failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// System registration failed.
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Device failure.
    #[error(transparent)]
    Gpu(#[from] GpuError),

    /// Volume data length does not match its dimensions.
    #[error("volume of size {size:?} needs {expected} voxels, got {actual}")]
    VolumeSize {
        /// Volume dimensions.
        size: [u32; 3],
        /// `width * height * depth`.
        expected: usize,
        /// Supplied voxel count.
        actual: usize,
    },
}

/// Result type for service setup.
pub type RenderResult<T> = Result<T, RenderError>;

impl From<GpuError> for SystemError {
    fn from(error: GpuError) -> Self {
        Self::other(error)
    }
}
