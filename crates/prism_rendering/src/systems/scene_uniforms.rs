//! Writes the scene uniform block from the active viewport's camera and the
//! lighting resources.

use tracing::trace;

use prism_core::{ArchetypeId, FrameContext, LayoutResult, Store, System, SystemError, TypedColumn};

use crate::bridge::{BufferSlot, GpuBridge};
use crate::camera::{Camera, SceneUniforms};
use crate::components::CAMERA;
use crate::config::LightingConfig;
use crate::device::BufferUsage;
use crate::resources::{ActiveViewport, AmbientStrength, LightColor, LightDirection, SceneUniformsBuffer};

use super::DeviceBinding;

/// Pre-render system publishing [`SceneUniformsBuffer`].
pub struct SceneUniformsSystem {
    bridge: GpuBridge,
    viewport: ArchetypeId,
    /// One row, rewritten only when the uniforms change.
    column: TypedColumn,
    slot: BufferSlot,
    binding: DeviceBinding,
}

impl SceneUniformsSystem {
    /// Creates the system for cameras of the `viewport` archetype.
    ///
    /// # Errors
    ///
    /// Returns an error if the uniform schema cannot be laid out.
    pub fn new(bridge: GpuBridge, viewport: ArchetypeId) -> LayoutResult<Self> {
        Ok(Self {
            bridge,
            viewport,
            column: TypedColumn::with_capacity(SceneUniforms::schema()?, 1, 2),
            slot: BufferSlot::new("scene uniforms", BufferUsage::UNIFORM),
            binding: DeviceBinding::default(),
        })
    }

    fn uniforms(&self, store: &Store) -> Option<SceneUniforms> {
        let resources = store.resources();
        let ActiveViewport(active) = *resources.get::<ActiveViewport>()?;
        let record = store.read(active, self.viewport)?;
        let camera = Camera::from_value(record.data(CAMERA)?)?;

        let defaults = LightingConfig::default();
        Some(SceneUniforms::new(
            camera.view_projection(),
            resources.get::<LightDirection>().map_or(defaults.direction, |l| l.0),
            resources.get::<AmbientStrength>().map_or(defaults.ambient_strength, |a| a.0),
            resources.get::<LightColor>().map_or(defaults.color, |c| c.0),
        ))
    }
}

impl System for SceneUniformsSystem {
    fn name(&self) -> &str {
        "scene_uniforms_system"
    }

    fn run(&mut self, ctx: &mut FrameContext<'_>) -> Result<(), SystemError> {
        let slot = &mut self.slot;
        let device = self.binding.resolve(ctx.store, |old| slot.release(old));
        if self.slot.buffer().is_none() {
            ctx.store.resources_mut().remove::<SceneUniformsBuffer>();
        }
        let Some(device) = device else {
            return Ok(());
        };
        let Some(uniforms) = self.uniforms(ctx.store) else {
            return Ok(());
        };

        if self.column.is_empty() {
            self.column.push_pod(&uniforms)?;
        } else if self.column.get_pod::<SceneUniforms>(0)? != uniforms {
            self.column.set_pod(0, &uniforms)?;
        }

        match self.bridge.sync_column(device.as_ref(), &self.column, &mut self.slot) {
            Ok(outcome) => {
                if outcome.is_changed() {
                    trace!(?outcome, "scene uniforms uploaded");
                }
                if let Some(buffer) = self.slot.buffer() {
                    ctx.store.resources_mut().insert(SceneUniformsBuffer(buffer));
                }
                Ok(())
            }
            Err(e) => {
                ctx.store.resources_mut().remove::<SceneUniformsBuffer>();
                Err(e.into())
            }
        }
    }

    fn dispose(&mut self, store: &mut Store) {
        if let Some(device) = self.binding.take() {
            self.slot.release(device.as_ref());
        }
        store.resources_mut().remove::<SceneUniformsBuffer>();
    }
}
