//! Builds and caches one vertex buffer per voxel model.
//!
//! A model's mesh is rebuilt only when the token of its `voxel_color` volume
//! differs from the one the cached buffer was built from.

use std::sync::Arc;

use tracing::debug;

use prism_core::{Entity, FrameContext, Store, System, SystemError};

use crate::cache::{DerivedBuffers, Refresh};
use crate::components::{POSITION, VOXEL_COLOR};
use crate::data::{Rgba, Volume};
use crate::device::BufferUsage;
use crate::resources::{VoxelBuffers, VoxelModelBuffer};
use crate::vertices::rgba_volume_to_vertex_data;

use super::DeviceBinding;

struct Model {
    entity: Entity,
    origin: [f32; 3],
    volume: Arc<Volume<Rgba>>,
}

/// Update-phase system publishing [`VoxelBuffers`].
pub struct VoxelVertexBufferSystem {
    cache: DerivedBuffers,
    binding: DeviceBinding,
}

impl Default for VoxelVertexBufferSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl VoxelVertexBufferSystem {
    /// Creates the system.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: DerivedBuffers::new("voxel vertices", BufferUsage::VERTEX),
            binding: DeviceBinding::default(),
        }
    }

    /// The per-model buffer cache.
    #[must_use]
    pub const fn cache(&self) -> &DerivedBuffers {
        &self.cache
    }

    fn models(store: &Store) -> Result<Vec<Model>, SystemError> {
        let mut models = Vec::new();
        for table in store.query_archetypes(&[POSITION, VOXEL_COLOR]) {
            let (Some(positions), Some(volumes)) = (table.typed_column(POSITION), table.object_column(VOXEL_COLOR))
            else {
                continue;
            };
            for (row, entity) in table.entities().iter().enumerate() {
                let Some(volume) = volumes.get(row).and_then(|v| Arc::clone(v).downcast::<Volume<Rgba>>().ok())
                else {
                    continue;
                };
                models.push(Model {
                    entity: *entity,
                    origin: positions.get_pod(row)?,
                    volume,
                });
            }
        }
        Ok(models)
    }
}

impl System for VoxelVertexBufferSystem {
    fn name(&self) -> &str {
        "voxel_vertex_buffer_system"
    }

    fn run(&mut self, ctx: &mut FrameContext<'_>) -> Result<(), SystemError> {
        ctx.store.resources_mut().remove::<VoxelBuffers>();
        let cache = &mut self.cache;
        let Some(device) = self.binding.resolve(ctx.store, |old| cache.release_all(old)) else {
            return Ok(());
        };

        let store: &Store = ctx.store;
        let pruned = self.cache.prune(device.as_ref(), |entity| store.contains(entity));
        if pruned > 0 {
            debug!(pruned, "released vertex buffers of deleted voxel models");
        }

        let models = Self::models(store)?;
        let mut published = Vec::with_capacity(models.len());
        let mut first_error = None;
        for model in models {
            let refreshed = self.cache.refresh(device.as_ref(), model.entity, model.volume.token(), || {
                rgba_volume_to_vertex_data(&model.volume).map_err(SystemError::from)
            });
            match refreshed {
                Ok(Refresh::Rebuilt { .. }) => {
                    if let Some(cached) = self.cache.get(model.entity) {
                        debug!(entity = %model.entity, bytes = cached.len, "created vertex buffer");
                    }
                }
                Ok(Refresh::Cached) => {}
                Err(e) => {
                    first_error.get_or_insert(e);
                    continue;
                }
            }
            if let Some(cached) = self.cache.get(model.entity) {
                if let Some(buffer) = cached.buffer {
                    published.push(VoxelModelBuffer {
                        entity: model.entity,
                        buffer,
                        vertex_count: cached.rows,
                        origin: model.origin,
                    });
                }
            }
        }
        ctx.store.resources_mut().insert(VoxelBuffers(published));

        first_error.map_or(Ok(()), Err)
    }

    fn dispose(&mut self, store: &mut Store) {
        if let Some(device) = self.binding.take() {
            self.cache.release_all(device.as_ref());
        }
        store.resources_mut().remove::<VoxelBuffers>();
    }
}
