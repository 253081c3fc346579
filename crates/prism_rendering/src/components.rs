//! # Graphics Components and Archetypes
//!
//! | Archetype    | Components                  |
//! |--------------|-----------------------------|
//! | `Particle`   | `position`, `color`         |
//! | `VoxelModel` | `position`, `voxel_color`   |
//! | `Viewport`   | `camera`, `clear_color`     |
//!
//! `voxel_color` is an object component holding an `Arc<Volume<Rgba>>`;
//! everything else is stored in typed columns.

use prism_core::{ArchetypeId, ComponentDef, FieldType, LayoutRules, Schema, Store, StoreResult, Value};

use crate::camera::Camera;

/// `vec3<f32>` world position.
pub const POSITION: &str = "position";
/// `vec4<f32>` linear RGBA color.
pub const COLOR: &str = "color";
/// [`Camera`] struct.
pub const CAMERA: &str = "camera";
/// `vec4<f32>` clear color of a viewport.
pub const CLEAR_COLOR: &str = "clear_color";
/// `Arc<Volume<Rgba>>` voxel colors.
pub const VOXEL_COLOR: &str = "voxel_color";

/// Archetype name of renderable particles.
pub const PARTICLE: &str = "Particle";
/// Archetype name of voxel models.
pub const VOXEL_MODEL: &str = "VoxelModel";
/// Archetype name of viewports.
pub const VIEWPORT: &str = "Viewport";

/// Ids of the graphics archetypes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GraphicsArchetypes {
    /// `Particle`.
    pub particle: ArchetypeId,
    /// `VoxelModel`.
    pub voxel_model: ArchetypeId,
    /// `Viewport`.
    pub viewport: ArchetypeId,
}

/// Registers the graphics components and archetypes.
///
/// # Errors
///
/// Returns an error if any of the names is already registered.
pub fn register_graphics(store: &mut Store) -> StoreResult<GraphicsArchetypes> {
    let vec3 = Schema::value("vec3<f32>", LayoutRules::Packed, FieldType::vec3f())?;
    let vec4 = Schema::value("vec4<f32>", LayoutRules::Packed, FieldType::vec4f())?;

    store.register_component(ComponentDef::typed(POSITION, vec3))?;
    store.register_component(
        ComponentDef::typed(COLOR, vec4.clone()).with_default(Value::from([1.0f32; 4])),
    )?;
    store.register_component(
        ComponentDef::typed(CAMERA, Camera::schema()?).with_default(Camera::default().to_value()),
    )?;
    store.register_component(
        ComponentDef::typed(CLEAR_COLOR, vec4).with_default(Value::from([0.0f32, 0.0, 0.0, 1.0])),
    )?;
    store.register_component(ComponentDef::object(VOXEL_COLOR))?;

    Ok(GraphicsArchetypes {
        particle: store.register_archetype(PARTICLE, &[POSITION, COLOR])?,
        voxel_model: store.register_archetype(VOXEL_MODEL, &[POSITION, VOXEL_COLOR])?,
        viewport: store.register_archetype(VIEWPORT, &[CAMERA, CLEAR_COLOR])?,
    })
}

#[cfg(test)]
mod tests {
    use prism_core::Record;

    use super::*;

    #[test]
    fn test_archetypes_use_separate_tables() {
        let mut store = Store::default();
        let archetypes = register_graphics(&mut store).unwrap();
        let tables: Vec<_> = [archetypes.particle, archetypes.voxel_model, archetypes.viewport]
            .iter()
            .map(|a| store.archetype_def(*a).unwrap().table)
            .collect();
        assert_ne!(tables[0], tables[1]);
        assert_ne!(tables[1], tables[2]);
        assert_eq!(store.query_archetypes(&[POSITION]).count(), 2);
    }

    #[test]
    fn test_defaults_fill_missing_components() {
        let mut store = Store::default();
        let archetypes = register_graphics(&mut store).unwrap();
        let viewport = store.insert(archetypes.viewport, Record::new()).unwrap();
        let record = store.read(viewport, archetypes.viewport).unwrap();
        let camera = Camera::from_value(record.data(CAMERA).unwrap()).unwrap();
        assert_eq!(camera, Camera::default());
    }

    #[test]
    fn test_registering_twice_fails() {
        let mut store = Store::default();
        register_graphics(&mut store).unwrap();
        assert!(register_graphics(&mut store).is_err());
    }
}
