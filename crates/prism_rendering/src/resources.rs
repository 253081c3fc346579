//! # Graphics Resources
//!
//! Well-known resource registry keys. Each key is its own type:
//!
//! | Key                    | Written by                    | Read by                 |
//! |------------------------|-------------------------------|-------------------------|
//! | [`DeviceResource`]     | host (`set_device`)           | every GPU system        |
//! | [`ActiveViewport`]     | host                          | scene uniforms, render  |
//! | [`LightDirection`] ... | host (`set_lighting`)         | scene uniforms          |
//! | [`ParticleBuffers`]    | particle buffer system        | particle rendering      |
//! | [`VoxelBuffers`]       | voxel vertex buffer system    | voxel rendering         |
//! | [`SceneUniformsBuffer`]| scene uniforms (pre-render)   | render systems          |
//! | [`RenderTargets`]      | host, once per frame          | render systems          |
//! | [`DrawList`]           | render systems                | host                    |

use std::fmt;
use std::sync::Arc;

use prism_core::{Entity, TableId};

use crate::device::{BufferHandle, GpuBuffer, GpuDevice};

/// The device every GPU system talks to.
#[derive(Clone)]
pub struct DeviceResource(pub Arc<dyn GpuDevice>);

impl fmt::Debug for DeviceResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceResource")
            .field("max_buffer_size", &self.0.max_buffer_size())
            .finish()
    }
}

/// Viewport whose camera drives the scene uniforms. May name a deleted entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActiveViewport(pub Entity);

/// Direction the light travels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightDirection(pub [f32; 3]);

/// Light color.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightColor(pub [f32; 3]);

/// Ambient term.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AmbientStrength(pub f32);

/// Uniform buffer holding the current `SceneUniforms`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SceneUniformsBuffer(pub GpuBuffer);

/// Opaque id of a host-owned render target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TargetHandle(pub u64);

/// Surfaces to draw into this frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderTargets {
    /// Viewport the targets belong to.
    pub viewport: Entity,
    /// Color attachment.
    pub color: TargetHandle,
    /// Depth attachment.
    pub depth: Option<TargetHandle>,
}

/// What a draw call renders.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DrawKind {
    /// One particle table, one instance per row.
    Particles,
    /// One voxel model mesh.
    Voxels,
}

/// A recorded draw.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawCall {
    /// Pipeline selector.
    pub kind: DrawKind,
    /// Vertex buffers in binding order.
    pub vertex_buffers: Vec<BufferHandle>,
    /// Scene uniform buffer.
    pub uniforms: BufferHandle,
    /// Vertices per instance.
    pub vertex_count: u32,
    /// Instances.
    pub instance_count: u32,
    /// Model origin.
    pub origin: [f32; 3],
    /// Surfaces drawn into.
    pub targets: RenderTargets,
}

/// Draw calls recorded during the current frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DrawList {
    /// Calls in recording order.
    pub calls: Vec<DrawCall>,
}

impl DrawList {
    /// Calls of one kind.
    pub fn of_kind(&self, kind: DrawKind) -> impl Iterator<Item = &DrawCall> {
        self.calls.iter().filter(move |c| c.kind == kind)
    }
}

/// Device buffers mirroring one particle table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParticleTableBuffers {
    /// Source table.
    pub table: TableId,
    /// `position` column.
    pub position: GpuBuffer,
    /// `color` column.
    pub color: GpuBuffer,
    /// Rows mirrored.
    pub count: u32,
}

/// Particle buffers published for the render phase.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParticleBuffers(pub Vec<ParticleTableBuffers>);

/// Mesh buffer of one voxel model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoxelModelBuffer {
    /// Model entity.
    pub entity: Entity,
    /// Vertex buffer.
    pub buffer: GpuBuffer,
    /// Vertices in the buffer.
    pub vertex_count: u32,
    /// Model position.
    pub origin: [f32; 3],
}

/// Voxel buffers published for the render phase.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VoxelBuffers(pub Vec<VoxelModelBuffer>);
