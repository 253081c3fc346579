//! # Graphics Service
//!
//! Owns the graphics store and its scheduler:
//!
//! ```text
//! GraphicsService::new(config)
//!   ├── Store: Particle, VoxelModel, Viewport + lighting resources
//!   └── Scheduler
//!         update:     particle_buffer_system, voxel_vertex_buffer_system
//!         pre-render: scene_uniforms_system
//!         render:     particle_rendering_system, voxel_rendering_system
//! ```

use tracing::info;

use prism_core::{ConfigError, ConfigResult, FrameReport, Scheduler, Store, StoreError};

use crate::bridge::GpuBridge;
use crate::components::{register_graphics, GraphicsArchetypes};
use crate::config::RenderingConfig;
use crate::error::RenderResult;
use crate::resources::DrawList;
use crate::systems::{
    particle_rendering_system, voxel_rendering_system, ParticleBufferSystem, SceneUniformsSystem,
    VoxelVertexBufferSystem,
};
use crate::transactions::set_lighting;

/// Phase that keeps GPU buffers in step with the store.
pub const UPDATE: &str = "update";
/// Phase that prepares per-frame uniforms.
pub const PRE_RENDER: &str = "pre-render";
/// Phase that records draw calls.
pub const RENDER: &str = "render";

/// Store, archetypes and systems of the graphics layer.
pub struct GraphicsService {
    store: Store,
    scheduler: Scheduler,
    archetypes: GraphicsArchetypes,
}

impl GraphicsService {
    /// Builds the store and registers every graphics system.
    ///
    /// The configured phases must include `update`, `pre-render` and
    /// `render`; the scene uniforms producer runs before its consumers.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for invalid values, or a scheduler
    /// error if a required phase is missing.
    pub fn new(config: &RenderingConfig) -> RenderResult<Self> {
        config.validate()?;
        check_phase_order(&config.core.scheduler.phases)?;
        let mut store = Store::new(config.core.store.clone());
        let archetypes = register_graphics(&mut store)?;
        set_lighting(&mut store, &config.lighting);

        let bridge = GpuBridge::new(config.bridge.clone());
        let mut scheduler = Scheduler::new(&config.core.scheduler)?;
        scheduler.register(UPDATE, ParticleBufferSystem::new(bridge.clone()))?;
        scheduler.register(UPDATE, VoxelVertexBufferSystem::new())?;
        scheduler.register(
            PRE_RENDER,
            SceneUniformsSystem::new(bridge, archetypes.viewport).map_err(StoreError::from)?,
        )?;
        scheduler.register(RENDER, particle_rendering_system())?;
        scheduler.register(RENDER, voxel_rendering_system())?;
        info!(systems = scheduler.len(), "graphics service ready");

        Ok(Self {
            store,
            scheduler,
            archetypes,
        })
    }

    /// The graphics store.
    #[inline]
    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    /// The graphics store, for transactions.
    #[inline]
    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    /// Archetype ids registered by the service.
    #[inline]
    #[must_use]
    pub const fn archetypes(&self) -> &GraphicsArchetypes {
        &self.archetypes
    }

    /// The scheduler.
    #[inline]
    #[must_use]
    pub const fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Clears the previous frame's draw calls and runs one frame.
    pub fn run_frame(&mut self) -> FrameReport {
        if let Some(list) = self.store.resources_mut().get_mut::<DrawList>() {
            list.calls.clear();
        }
        self.scheduler.run_frame(&mut self.store)
    }

    /// Disposes every system, releasing the buffers they hold.
    pub fn shutdown(&mut self) {
        self.scheduler.shutdown(&mut self.store);
    }
}

/// Uniforms must be produced after the buffers and before the draws.
fn check_phase_order(phases: &[String]) -> ConfigResult<()> {
    let position = |name: &str| phases.iter().position(|p| p == name);
    if let (Some(update), Some(pre_render), Some(render)) = (position(UPDATE), position(PRE_RENDER), position(RENDER)) {
        if !(update < pre_render && pre_render < render) {
            return Err(ConfigError::Invalid(format!(
                "phases must run `{UPDATE}` before `{PRE_RENDER}` before `{RENDER}`, got {phases:?}"
            )));
        }
    }
    Ok(())
}

impl Drop for GraphicsService {
    fn drop(&mut self) {
        if !self.scheduler.is_empty() {
            self.shutdown();
        }
    }
}
