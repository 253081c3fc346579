//! # GPU Sync Bridge
//!
//! Mirrors a typed column into one device buffer:
//!
//! ```text
//! column (token #41, 3 rows x 40 B)        slot (token #41, 256 B buffer)
//! +------+------+------+       sync        +------------------+---------+
//! | row0 | row1 | row2 |  ------------->   | 120 B live bytes | unused  |
//! +------+------+------+                   +------------------+---------+
//! ```
//!
//! Per sync:
//! - Token unchanged and buffer large enough: no device call at all
//! - Buffer missing or too small: the old buffer is released first, then a
//!   larger one is created (grow-or-reuse)
//! - Otherwise the live bytes are rewritten in place
//!
//! A failed allocation or write leaves the slot empty, never half-updated.

use tracing::{debug, trace, warn};

use prism_core::{ChangeToken, TypedColumn};

use crate::config::BridgeConfig;
use crate::device::{BufferDesc, BufferHandle, BufferUsage, GpuBuffer, GpuDevice};
use crate::error::{GpuError, GpuResult};

/// What a sync did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The slot already mirrored this token.
    Unchanged,
    /// Bytes were rewritten into the existing buffer.
    Uploaded {
        /// Bytes written.
        bytes: u64,
    },
    /// A new buffer was created and filled.
    Reallocated {
        /// Bytes written.
        bytes: u64,
        /// Buffer released to make room, if any.
        released: Option<BufferHandle>,
    },
}

impl SyncOutcome {
    /// Checks if the sync touched the device.
    #[inline]
    #[must_use]
    pub const fn is_changed(self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

/// One device buffer and the token of the bytes it holds.
#[derive(Debug)]
pub struct BufferSlot {
    label: &'static str,
    usage: BufferUsage,
    buffer: Option<GpuBuffer>,
    token: Option<ChangeToken>,
    len: u64,
}

impl BufferSlot {
    /// Creates an empty slot. `COPY_DST` is always added to `usage`.
    #[must_use]
    pub fn new(label: &'static str, usage: BufferUsage) -> Self {
        Self {
            label,
            usage: usage | BufferUsage::COPY_DST,
            buffer: None,
            token: None,
            len: 0,
        }
    }

    /// Debug label of the buffers this slot creates.
    #[inline]
    #[must_use]
    pub const fn label(&self) -> &'static str {
        self.label
    }

    /// Current buffer.
    #[inline]
    #[must_use]
    pub const fn buffer(&self) -> Option<GpuBuffer> {
        self.buffer
    }

    /// Token of the mirrored bytes.
    #[inline]
    #[must_use]
    pub const fn token(&self) -> Option<ChangeToken> {
        self.token
    }

    /// Number of live bytes in the buffer.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.len
    }

    /// Checks if the slot mirrors no bytes.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Releases the buffer, if any, and forgets the token.
    ///
    /// Safe to call repeatedly; the buffer is destroyed once.
    pub fn release(&mut self, device: &dyn GpuDevice) {
        if let Some(buffer) = self.buffer.take() {
            trace!(label = self.label, buffer = %buffer.handle, "releasing buffer");
            device.destroy_buffer(buffer.handle);
        }
        self.token = None;
        self.len = 0;
    }
}

/// Grow-or-reuse uploader.
#[derive(Clone, Debug, Default)]
pub struct GpuBridge {
    config: BridgeConfig,
}

impl GpuBridge {
    /// Creates a bridge with the given sizing policy.
    #[must_use]
    pub const fn new(config: BridgeConfig) -> Self {
        Self { config }
    }

    /// Sizing policy.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Mirrors a typed column into `slot`.
    ///
    /// # Errors
    ///
    /// Returns the device error of a failed allocation or write; the slot is
    /// left empty.
    pub fn sync_column(
        &self,
        device: &dyn GpuDevice,
        column: &TypedColumn,
        slot: &mut BufferSlot,
    ) -> GpuResult<SyncOutcome> {
        self.sync_bytes(device, column.bytes(), column.token(), slot)
    }

    /// Mirrors raw bytes tagged with `token` into `slot`.
    ///
    /// # Errors
    ///
    /// As [`GpuBridge::sync_column`].
    pub fn sync_bytes(
        &self,
        device: &dyn GpuDevice,
        bytes: &[u8],
        token: ChangeToken,
        slot: &mut BufferSlot,
    ) -> GpuResult<SyncOutcome> {
        let needed = bytes.len() as u64;
        let fits = slot.buffer.is_some_and(|b| b.capacity >= needed);
        if slot.token == Some(token) && fits {
            return Ok(SyncOutcome::Unchanged);
        }
        if needed == 0 {
            slot.token = Some(token);
            slot.len = 0;
            return Ok(SyncOutcome::Unchanged);
        }

        let mut released = None;
        let reallocated = !fits;
        if reallocated {
            let previous = slot.buffer.map_or(0, |b| b.capacity);
            if let Some(old) = slot.buffer.take() {
                debug!(
                    label = slot.label,
                    buffer = %old.handle,
                    capacity = old.capacity,
                    needed,
                    "buffer too small, releasing"
                );
                device.destroy_buffer(old.handle);
                released = Some(old.handle);
            }
            slot.token = None;
            slot.len = 0;

            let size = self.capacity_for(device, needed, previous);
            let desc = BufferDesc {
                label: slot.label,
                size,
                usage: slot.usage,
            };
            let handle = device.create_buffer(&desc).map_err(|e| {
                warn!(label = slot.label, size, error = %e, "buffer allocation failed");
                e
            })?;
            debug!(label = slot.label, buffer = %handle, size, "created buffer");
            slot.buffer = Some(GpuBuffer {
                handle,
                capacity: size,
                usage: slot.usage,
            });
        }

        let Some(buffer) = slot.buffer else {
            return Err(GpuError::AllocationFailed {
                label: slot.label,
                size: needed,
                reason: "slot has no buffer".into(),
            });
        };
        if let Err(e) = device.write_buffer(buffer.handle, 0, bytes) {
            warn!(label = slot.label, buffer = %buffer.handle, error = %e, "buffer write failed");
            slot.release(device);
            return Err(e);
        }
        slot.token = Some(token);
        slot.len = needed;

        Ok(if reallocated {
            SyncOutcome::Reallocated {
                bytes: needed,
                released,
            }
        } else {
            SyncOutcome::Uploaded { bytes: needed }
        })
    }

    /// Capacity for a buffer that must hold `needed` bytes.
    ///
    /// `max(needed, previous * growth, min_buffer_size)`, rounded up to 4 and
    /// clamped to the device limit, but never below `needed`.
    fn capacity_for(&self, device: &dyn GpuDevice, needed: u64, previous: u64) -> u64 {
        let grown = previous.saturating_mul(self.config.growth_factor);
        let target = needed.max(grown).max(self.config.min_buffer_size);
        let target = round_up_4(target);
        let limit = device.max_buffer_size() & !3;
        target.min(limit).max(round_up_4(needed))
    }
}

/// Rounds up to the 4-byte copy alignment.
#[inline]
#[must_use]
pub(crate) const fn round_up_4(size: u64) -> u64 {
    size.saturating_add(3) & !3
}
