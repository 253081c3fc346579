//! # Derived Buffers
//!
//! Per-entity device buffers built from expensive source data, such as voxel
//! geometry built from a color volume. Each entry remembers the
//! [`ChangeToken`] of the source it was built from:
//!
//! ```text
//! entity 3v0: volume token #12  ->  cached #12  : reuse
//! entity 4v0: volume token #19  ->  cached #15  : release, rebuild, upload
//! ```
//!
//! The build closure only runs on a token mismatch.

use std::collections::HashMap;

use tracing::debug;

use prism_core::{ChangeToken, Entity, TypedColumn};

use crate::bridge::round_up_4;
use crate::device::{BufferDesc, BufferUsage, GpuBuffer, GpuDevice};
use crate::error::GpuError;

/// One cached derived buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CachedBuffer {
    /// Device buffer; `None` when the built data was empty.
    pub buffer: Option<GpuBuffer>,
    /// Token of the source the buffer was built from.
    pub token: ChangeToken,
    /// Live bytes.
    pub len: u64,
    /// Rows of the built column.
    pub rows: u32,
}

/// Result of [`DerivedBuffers::refresh`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Refresh {
    /// The cached buffer matched the token.
    Cached,
    /// The buffer was rebuilt.
    Rebuilt {
        /// Whether a previous buffer was released.
        released: bool,
    },
}

/// Token-gated cache of per-entity buffers.
#[derive(Debug)]
pub struct DerivedBuffers {
    label: &'static str,
    usage: BufferUsage,
    entries: HashMap<Entity, CachedBuffer>,
}

impl DerivedBuffers {
    /// Creates an empty cache. `COPY_DST` is always added to `usage`.
    #[must_use]
    pub fn new(label: &'static str, usage: BufferUsage) -> Self {
        Self {
            label,
            usage: usage | BufferUsage::COPY_DST,
            entries: HashMap::new(),
        }
    }

    /// Cached entry of `entity`.
    #[must_use]
    pub fn get(&self, entity: Entity) -> Option<&CachedBuffer> {
        self.entries.get(&entity)
    }

    /// Iterates over the cached entries.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &CachedBuffer)> {
        self.entries.iter().map(|(e, c)| (*e, c))
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Checks if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ensures `entity` has a buffer built from the source tagged `token`.
    ///
    /// On a mismatch the old buffer is released before `build` runs, so a
    /// failed rebuild leaves no entry behind.
    ///
    /// # Errors
    ///
    /// Returns the error of `build`, or the device error of a failed
    /// allocation or write.
    pub fn refresh<F, E>(
        &mut self,
        device: &dyn GpuDevice,
        entity: Entity,
        token: ChangeToken,
        build: F,
    ) -> Result<Refresh, E>
    where
        F: FnOnce() -> Result<TypedColumn, E>,
        E: From<GpuError>,
    {
        if self.entries.get(&entity).is_some_and(|c| c.token == token) {
            return Ok(Refresh::Cached);
        }
        let released = match self.entries.remove(&entity) {
            Some(old) => {
                if let Some(buffer) = old.buffer {
                    device.destroy_buffer(buffer.handle);
                }
                true
            }
            None => false,
        };

        let column = build()?;
        let bytes = column.bytes();
        let len = bytes.len() as u64;
        let rows = u32::try_from(column.len()).unwrap_or(u32::MAX);
        let buffer = if bytes.is_empty() {
            None
        } else {
            let size = round_up_4(len);
            let handle = device.create_buffer(&BufferDesc {
                label: self.label,
                size,
                usage: self.usage,
            })?;
            if let Err(e) = device.write_buffer(handle, 0, bytes) {
                device.destroy_buffer(handle);
                return Err(e.into());
            }
            Some(GpuBuffer {
                handle,
                capacity: size,
                usage: self.usage,
            })
        };
        debug!(
            label = self.label,
            %entity,
            %token,
            rows,
            bytes = len,
            "rebuilt derived buffer"
        );
        self.entries.insert(
            entity,
            CachedBuffer {
                buffer,
                token,
                len,
                rows,
            },
        );
        Ok(Refresh::Rebuilt { released })
    }

    /// Releases every entry whose entity fails `keep`. Returns the count.
    pub fn prune<F>(&mut self, device: &dyn GpuDevice, mut keep: F) -> usize
    where
        F: FnMut(Entity) -> bool,
    {
        let before = self.entries.len();
        self.entries.retain(|entity, cached| {
            let retain = keep(*entity);
            if !retain {
                if let Some(buffer) = cached.buffer.take() {
                    device.destroy_buffer(buffer.handle);
                }
            }
            retain
        });
        before - self.entries.len()
    }

    /// Releases every buffer and empties the cache.
    pub fn release_all(&mut self, device: &dyn GpuDevice) {
        for (_, cached) in self.entries.drain() {
            if let Some(buffer) = cached.buffer {
                device.destroy_buffer(buffer.handle);
            }
        }
    }
}
