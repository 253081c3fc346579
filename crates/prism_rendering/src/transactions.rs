//! Graphics transactions: the host-facing mutations of the graphics store.

use std::sync::Arc;

use tracing::debug;

use prism_core::{Entity, Patch, Record, Store, StoreResult};

use crate::camera::Camera;
use crate::components::{GraphicsArchetypes, CAMERA, CLEAR_COLOR, COLOR, POSITION, VOXEL_COLOR};
use crate::config::LightingConfig;
use crate::data::{Rgba, Volume};
use crate::device::GpuDevice;
use crate::resources::{
    ActiveViewport, AmbientStrength, DeviceResource, DrawList, LightColor, LightDirection, RenderTargets,
};

/// Inserts four particles marking the origin and the unit axes.
///
/// Black at the origin, red on X, green on Y, blue on Z.
///
/// # Errors
///
/// Returns an error if the particle archetype rejects the records.
pub fn create_axis(store: &mut Store, archetypes: &GraphicsArchetypes) -> StoreResult<[Entity; 4]> {
    let particle = |position: [f32; 3], color: [f32; 4]| Record::new().with(POSITION, position).with(COLOR, color);
    Ok([
        store.insert(archetypes.particle, particle([0.0, 0.0, 0.0], [0.0, 0.0, 0.0, 1.0]))?,
        store.insert(archetypes.particle, particle([1.0, 0.0, 0.0], [1.0, 0.0, 0.0, 1.0]))?,
        store.insert(archetypes.particle, particle([0.0, 1.0, 0.0], [0.0, 1.0, 0.0, 1.0]))?,
        store.insert(archetypes.particle, particle([0.0, 0.0, 1.0], [0.0, 0.0, 1.0, 1.0]))?,
    ])
}

/// Voxel model to create or update.
#[derive(Clone, Debug)]
pub struct VoxelModelProps {
    /// Existing model to update; `None` inserts a new one.
    pub id: Option<Entity>,
    /// Model position.
    pub position: [f32; 3],
    /// Voxel colors.
    pub voxel_color: Arc<Volume<Rgba>>,
}

/// Inserts a voxel model, or updates it in place when `props.id` is set.
///
/// # Errors
///
/// Returns [`StoreError::EntityNotFound`](prism_core::StoreError::EntityNotFound)
/// for an unknown id, or a store error if the entity is not a voxel model.
pub fn create_voxel_model(
    store: &mut Store,
    archetypes: &GraphicsArchetypes,
    props: VoxelModelProps,
) -> StoreResult<Entity> {
    let record = Record::new()
        .with(POSITION, props.position)
        .with_object(VOXEL_COLOR, props.voxel_color);
    match props.id {
        Some(id) => {
            store.update(id, record)?;
            Ok(id)
        }
        None => store.insert(archetypes.voxel_model, record),
    }
}

/// Inserts a viewport.
///
/// # Errors
///
/// Returns an error if the viewport archetype rejects the record.
pub fn insert_viewport(
    store: &mut Store,
    archetypes: &GraphicsArchetypes,
    camera: &Camera,
    clear_color: [f32; 4],
) -> StoreResult<Entity> {
    store.insert(
        archetypes.viewport,
        Record::new()
            .with(CAMERA, camera.to_value())
            .with(CLEAR_COLOR, clear_color),
    )
}

/// Replaces a viewport's camera.
///
/// # Errors
///
/// Returns an error for an unknown entity or one without a camera.
pub fn update_camera(store: &mut Store, viewport: Entity, camera: &Camera) -> StoreResult<()> {
    store.update(viewport, Patch::new().with(CAMERA, camera.to_value()))
}

/// Selects the viewport whose camera drives the scene, or clears it.
pub fn set_active_viewport(store: &mut Store, viewport: Option<Entity>) {
    let resources = store.resources_mut();
    match viewport {
        Some(viewport) => {
            resources.insert(ActiveViewport(viewport));
        }
        None => {
            resources.remove::<ActiveViewport>();
        }
    }
}

/// Installs or removes the GPU device.
///
/// Systems notice the change on their next run and release whatever they
/// created on the previous device.
pub fn set_device(store: &mut Store, device: Option<Arc<dyn GpuDevice>>) {
    let resources = store.resources_mut();
    match device {
        Some(device) => {
            debug!(max_buffer_size = device.max_buffer_size(), "device installed");
            resources.insert(DeviceResource(device));
        }
        None => {
            if resources.remove::<DeviceResource>().is_some() {
                debug!("device removed");
            }
        }
    }
}

/// Writes the lighting resources.
pub fn set_lighting(store: &mut Store, lighting: &LightingConfig) {
    let resources = store.resources_mut();
    resources.insert(LightDirection(lighting.direction));
    resources.insert(LightColor(lighting.color));
    resources.insert(AmbientStrength(lighting.ambient_strength));
}

/// Hands this frame's render targets to the render systems, or withdraws them.
pub fn set_render_targets(store: &mut Store, targets: Option<RenderTargets>) {
    let resources = store.resources_mut();
    match targets {
        Some(targets) => {
            resources.insert(targets);
            if !resources.contains::<DrawList>() {
                resources.insert(DrawList::default());
            }
        }
        None => {
            resources.remove::<RenderTargets>();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::register_graphics;

    fn store() -> (Store, GraphicsArchetypes) {
        let mut store = Store::default();
        let archetypes = register_graphics(&mut store).unwrap();
        (store, archetypes)
    }

    #[test]
    fn test_create_axis() {
        let (mut store, archetypes) = store();
        let ids = create_axis(&mut store, &archetypes).unwrap();
        let red = store.read(ids[1], archetypes.particle).unwrap();
        assert_eq!(red.data(POSITION).unwrap().to_f32_array(), Some([1.0, 0.0, 0.0]));
        assert_eq!(red.data(COLOR).unwrap().to_f32_array(), Some([1.0, 0.0, 0.0, 1.0]));
        assert_eq!(store.archetype_table(archetypes.particle).unwrap().len(), 4);
    }

    #[test]
    fn test_create_voxel_model_inserts_then_updates() {
        let (mut store, archetypes) = store();
        let volume = Arc::new(Volume::new([1, 1, 1], Rgba::new(255, 0, 0, 255)));
        let id = create_voxel_model(
            &mut store,
            &archetypes,
            VoxelModelProps {
                id: None,
                position: [0.0; 3],
                voxel_color: volume.clone(),
            },
        )
        .unwrap();

        let replacement = Arc::new(Volume::new([2, 1, 1], Rgba::new(0, 255, 0, 255)));
        let same = create_voxel_model(
            &mut store,
            &archetypes,
            VoxelModelProps {
                id: Some(id),
                position: [5.0, 0.0, 0.0],
                voxel_color: replacement.clone(),
            },
        )
        .unwrap();
        assert_eq!(same, id);
        assert_eq!(store.len(), 1);
        let stored = store.get_object::<Volume<Rgba>>(id, VOXEL_COLOR).unwrap();
        assert!(Arc::ptr_eq(&stored, &replacement));
    }

    #[test]
    fn test_update_camera() {
        let (mut store, archetypes) = store();
        let viewport = insert_viewport(&mut store, &archetypes, &Camera::default(), [1.0, 0.0, 0.0, 0.5]).unwrap();
        let moved = Camera::looking_at([0.0, 10.0, 10.0], [0.0; 3]);
        update_camera(&mut store, viewport, &moved).unwrap();
        let record = store.read(viewport, archetypes.viewport).unwrap();
        assert_eq!(Camera::from_value(record.data(CAMERA).unwrap()), Some(moved));
    }

    #[test]
    fn test_resource_transactions() {
        let (mut store, _) = store();
        set_lighting(&mut store, &LightingConfig::default());
        assert!(store.resources().contains::<AmbientStrength>());

        set_active_viewport(&mut store, Some(Entity::new(3, 0)));
        assert_eq!(store.resources().get::<ActiveViewport>(), Some(&ActiveViewport(Entity::new(3, 0))));
        set_active_viewport(&mut store, None);
        assert!(!store.resources().contains::<ActiveViewport>());

        set_device(&mut store, None);
        assert!(!store.resources().contains::<DeviceResource>());
    }
}
