//! # Voxel Vertices
//!
//! Face culling mesher for RGBA voxel volumes. Every visible face becomes two
//! triangles:
//!
//! ```text
//!  TL ---- TR
//!   |    / |     triangle 1: BL, BR, TR
//!   |  /   |     triangle 2: BL, TR, TL
//!  BL ---- BR
//! ```
//!
//! A face is visible when the voxel is not transparent and its neighbour in
//! that direction is transparent or outside the volume.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};

use prism_core::{FieldDef, FieldType, LayoutResult, LayoutRules, Schema, StoreResult, TypedColumn};

use crate::data::{Rgba, Volume};

/// One mesh vertex.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PositionColorNormalVertex {
    /// Model-space position.
    pub position: [f32; 3],
    /// Linear RGBA color.
    pub color: [f32; 4],
    /// Unit face normal.
    pub normal: [f32; 3],
}

impl PositionColorNormalVertex {
    /// Packed schema matching the `#[repr(C)]` layout (stride 40).
    ///
    /// # Errors
    ///
    /// Never fails for this fixed field list; the signature follows
    /// [`Schema::structure`].
    pub fn schema() -> LayoutResult<Arc<Schema>> {
        Schema::structure(
            "PositionColorNormalVertex",
            LayoutRules::Packed,
            vec![
                FieldDef::new("position", FieldType::vec3f()),
                FieldDef::new("color", FieldType::vec4f()),
                FieldDef::new("normal", FieldType::vec3f()),
            ],
        )
    }
}

struct Face {
    normal: [i32; 3],
    /// BL, BR, TR, TL
    corners: [[f32; 3]; 4],
}

const FACES: [Face; 6] = [
    Face {
        normal: [1, 0, 0],
        corners: [[1., 0., 1.], [1., 0., 0.], [1., 1., 0.], [1., 1., 1.]],
    },
    Face {
        normal: [-1, 0, 0],
        corners: [[0., 0., 0.], [0., 0., 1.], [0., 1., 1.], [0., 1., 0.]],
    },
    Face {
        normal: [0, 1, 0],
        corners: [[0., 1., 1.], [1., 1., 1.], [1., 1., 0.], [0., 1., 0.]],
    },
    Face {
        normal: [0, -1, 0],
        corners: [[0., 0., 0.], [1., 0., 0.], [1., 0., 1.], [0., 0., 1.]],
    },
    Face {
        normal: [0, 0, 1],
        corners: [[0., 0., 1.], [1., 0., 1.], [1., 1., 1.], [0., 1., 1.]],
    },
    Face {
        normal: [0, 0, -1],
        corners: [[1., 0., 0.], [0., 0., 0.], [0., 1., 0.], [1., 1., 0.]],
    },
];

const TRIANGLES: [usize; 6] = [0, 1, 2, 0, 2, 3];

/// Builds the visible-face mesh of a volume as a vertex column.
///
/// # Errors
///
/// Returns an error only if the vertex schema cannot be built.
#[allow(clippy::cast_precision_loss)]
pub fn rgba_volume_to_vertex_data(volume: &Volume<Rgba>) -> StoreResult<TypedColumn> {
    let mut column = TypedColumn::new(PositionColorNormalVertex::schema()?);
    let [width, height, depth] = volume.size();
    for z in 0..depth {
        for y in 0..height {
            for x in 0..width {
                let Some(voxel) = volume.get(x, y, z) else {
                    continue;
                };
                if voxel.is_transparent() {
                    continue;
                }
                let color = voxel.to_vec4();
                let origin = [x as f32, y as f32, z as f32];
                for face in FACES.iter().filter(|f| is_exposed(volume, [x, y, z], f.normal)) {
                    let normal = face.normal.map(|n| n as f32);
                    for corner in TRIANGLES.map(|i| face.corners[i]) {
                        column.push_pod(&PositionColorNormalVertex {
                            position: [origin[0] + corner[0], origin[1] + corner[1], origin[2] + corner[2]],
                            color,
                            normal,
                        })?;
                    }
                }
            }
        }
    }
    Ok(column)
}

fn is_exposed(volume: &Volume<Rgba>, [x, y, z]: [u32; 3], [dx, dy, dz]: [i32; 3]) -> bool {
    let neighbour = (
        x.checked_add_signed(dx),
        y.checked_add_signed(dy),
        z.checked_add_signed(dz),
    );
    match neighbour {
        (Some(nx), Some(ny), Some(nz)) => volume.get(nx, ny, nz).map_or(true, Rgba::is_transparent),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba = Rgba::new(255, 0, 0, 255);

    fn vertices(column: &TypedColumn) -> Vec<PositionColorNormalVertex> {
        (0..column.len()).map(|row| column.get_pod(row).unwrap()).collect()
    }

    #[test]
    fn test_schema_matches_struct() {
        let schema = PositionColorNormalVertex::schema().unwrap();
        assert_eq!(schema.stride(), std::mem::size_of::<PositionColorNormalVertex>());
        assert_eq!(schema.layout().field_offsets(), vec![0, 12, 28]);
    }

    #[test]
    fn test_single_voxel_is_a_cube() {
        let volume = Volume::new([1, 1, 1], RED);
        let column = rgba_volume_to_vertex_data(&volume).unwrap();
        assert_eq!(column.len(), 36);
        for vertex in vertices(&column) {
            assert_eq!(vertex.color, [1.0, 0.0, 0.0, 1.0]);
            assert!(vertex.position.iter().all(|c| *c == 0.0 || *c == 1.0));
            assert!((vertex.normal.iter().map(|n| n * n).sum::<f32>() - 1.0).abs() < f32::EPSILON);
        }
    }

    #[test]
    fn test_shared_face_is_culled() {
        let volume = Volume::new([2, 1, 1], RED);
        let column = rgba_volume_to_vertex_data(&volume).unwrap();
        assert_eq!(column.len(), 60);
        // no face between the two voxels
        assert!(vertices(&column)
            .iter()
            .all(|v| !(v.normal[0] != 0.0 && (v.position[0] - 1.0).abs() < f32::EPSILON)));
    }

    #[test]
    fn test_transparent_voxels_emit_nothing() {
        let volume = Volume::new([3, 3, 3], Rgba::TRANSPARENT);
        assert!(rgba_volume_to_vertex_data(&volume).unwrap().is_empty());
    }

    #[test]
    fn test_hole_exposes_inner_faces() {
        let mut volume = Volume::new([3, 1, 1], RED);
        volume.set(1, 0, 0, Rgba::TRANSPARENT);
        let column = rgba_volume_to_vertex_data(&volume).unwrap();
        assert_eq!(column.len(), 72);
    }

    #[test]
    fn test_faces_wind_counter_clockwise() {
        let volume = Volume::new([1, 1, 1], RED);
        let column = rgba_volume_to_vertex_data(&volume).unwrap();
        for triangle in vertices(&column).chunks(3) {
            let [a, b, c] = [triangle[0].position, triangle[1].position, triangle[2].position];
            let u = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
            let v = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
            let cross = [
                u[1] * v[2] - u[2] * v[1],
                u[2] * v[0] - u[0] * v[2],
                u[0] * v[1] - u[1] * v[0],
            ];
            let n = triangle[0].normal;
            assert!(cross[0] * n[0] + cross[1] * n[1] + cross[2] * n[2] > 0.0);
        }
    }
}
