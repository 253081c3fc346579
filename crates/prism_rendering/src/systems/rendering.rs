//! Render-phase systems. They record draw calls into the [`DrawList`] for
//! the host to submit; pipelines and passes are owned by the host.

use tracing::trace;

use prism_core::{FnSystem, Resources};

use crate::device::BufferHandle;
use crate::resources::{
    ActiveViewport, DeviceResource, DrawCall, DrawKind, DrawList, ParticleBuffers, RenderTargets,
    SceneUniformsBuffer, VoxelBuffers,
};

/// Vertices of the camera-facing quad drawn per particle.
const PARTICLE_QUAD_VERTICES: u32 = 6;

/// What every render system needs before it can record anything.
fn frame_inputs(resources: &Resources) -> Option<(BufferHandle, RenderTargets)> {
    if !resources.contains::<DeviceResource>() || !resources.contains::<DrawList>() {
        return None;
    }
    let uniforms = resources.get::<SceneUniformsBuffer>()?.0.handle;
    let targets = *resources.get::<RenderTargets>()?;
    let ActiveViewport(active) = *resources.get::<ActiveViewport>()?;
    (targets.viewport == active).then_some((uniforms, targets))
}

fn record(resources: &mut Resources, calls: Vec<DrawCall>) {
    if let Some(list) = resources.get_mut::<DrawList>() {
        list.calls.extend(calls);
    }
}

/// Records one instanced draw per particle table.
#[must_use]
pub fn particle_rendering_system() -> FnSystem {
    FnSystem::new("particle_rendering_system", |ctx| {
        let resources = ctx.store.resources_mut();
        let Some((uniforms, targets)) = frame_inputs(resources) else {
            return Ok(());
        };
        let Some(ParticleBuffers(tables)) = resources.get::<ParticleBuffers>() else {
            return Ok(());
        };
        let calls: Vec<_> = tables
            .iter()
            .map(|t| DrawCall {
                kind: DrawKind::Particles,
                vertex_buffers: vec![t.position.handle, t.color.handle],
                uniforms,
                vertex_count: PARTICLE_QUAD_VERTICES,
                instance_count: t.count,
                origin: [0.0; 3],
                targets,
            })
            .collect();
        trace!(draws = calls.len(), "particle draws recorded");
        record(resources, calls);
        Ok(())
    })
}

/// Records one draw per voxel model mesh.
#[must_use]
pub fn voxel_rendering_system() -> FnSystem {
    FnSystem::new("voxel_rendering_system", |ctx| {
        let resources = ctx.store.resources_mut();
        let Some((uniforms, targets)) = frame_inputs(resources) else {
            return Ok(());
        };
        let Some(VoxelBuffers(models)) = resources.get::<VoxelBuffers>() else {
            return Ok(());
        };
        let calls: Vec<_> = models
            .iter()
            .map(|m| DrawCall {
                kind: DrawKind::Voxels,
                vertex_buffers: vec![m.buffer.handle],
                uniforms,
                vertex_count: m.vertex_count,
                instance_count: 1,
                origin: m.origin,
                targets,
            })
            .collect();
        trace!(draws = calls.len(), "voxel draws recorded");
        record(resources, calls);
        Ok(())
    })
}
