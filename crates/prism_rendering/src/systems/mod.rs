//! # Graphics Systems
//!
//! ```text
//! update:      particle_buffer_system, voxel_vertex_buffer_system
//! pre-render:  scene_uniforms_system
//! render:      particle_rendering_system, voxel_rendering_system
//! ```
//!
//! Every system skips the frame, with zero device calls, while no device is
//! installed. Buffers a system created belong to it: they are released in
//! `dispose`, or as soon as the system sees the device it created them on
//! has been replaced or removed.

mod particle_buffers;
mod rendering;
mod scene_uniforms;
mod voxel_vertex_buffers;

pub use particle_buffers::ParticleBufferSystem;
pub use rendering::{particle_rendering_system, voxel_rendering_system};
pub use scene_uniforms::SceneUniformsSystem;
pub use voxel_vertex_buffers::VoxelVertexBufferSystem;

use std::sync::Arc;

use prism_core::Store;

use crate::device::GpuDevice;
use crate::resources::DeviceResource;

/// The device a system last created buffers on.
#[derive(Default)]
pub(crate) struct DeviceBinding {
    bound: Option<Arc<dyn GpuDevice>>,
}

impl DeviceBinding {
    /// Current device of the store.
    ///
    /// When it is not the bound device, `release` runs against the bound
    /// device first and the current one becomes bound.
    pub(crate) fn resolve<F>(&mut self, store: &Store, release: F) -> Option<Arc<dyn GpuDevice>>
    where
        F: FnOnce(&dyn GpuDevice),
    {
        let current = store.resources().get::<DeviceResource>().map(|d| Arc::clone(&d.0));
        let changed = match (&self.bound, &current) {
            (Some(old), Some(new)) => !Arc::ptr_eq(old, new),
            (None, None) => false,
            _ => true,
        };
        if changed {
            if let Some(old) = self.bound.take() {
                tracing::debug!("device changed, releasing buffers of the previous device");
                release(old.as_ref());
            }
            self.bound.clone_from(&current);
        }
        current
    }

    /// Unbinds and returns the bound device.
    pub(crate) fn take(&mut self) -> Option<Arc<dyn GpuDevice>> {
        self.bound.take()
    }
}
