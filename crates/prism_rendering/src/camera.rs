//! # Camera and Scene Uniforms
//!
//! Only what the scene uniforms need: a perspective camera that yields a
//! column-major view-projection matrix (right-handed, depth in `[0, 1]`),
//! and the uniform block it feeds.
//!
//! ```text
//! SceneUniforms (Gpu rules, stride 96)
//! offset  0  view_projection  mat4x4<f32>
//! offset 64  light_direction  vec3<f32>
//! offset 76  ambient_strength f32
//! offset 80  light_color      vec3<f32>
//! ```

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};

use prism_core::{FieldDef, FieldType, LayoutResult, LayoutRules, ScalarType, Schema, Value};

type Vec3 = [f32; 3];
type Mat4 = [[f32; 4]; 4];

/// Perspective camera.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Camera {
    /// Eye position.
    pub position: Vec3,
    /// Point looked at.
    pub target: Vec3,
    /// Up direction.
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    /// Width over height.
    pub aspect: f32,
    /// Near plane distance.
    pub near: f32,
    /// Far plane distance.
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 10.0],
            target: [0.0, 0.0, 0.0],
            up: [0.0, 1.0, 0.0],
            fov_y: std::f32::consts::FRAC_PI_4,
            aspect: 1.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl Camera {
    /// Default camera moved to `position`, looking at `target`.
    #[must_use]
    pub fn looking_at(position: Vec3, target: Vec3) -> Self {
        Self {
            position,
            target,
            ..Self::default()
        }
    }

    /// Packed schema matching the `#[repr(C)]` layout (stride 52).
    ///
    /// # Errors
    ///
    /// Never fails for this fixed field list.
    pub fn schema() -> LayoutResult<Arc<Schema>> {
        let f32 = FieldType::scalar(ScalarType::F32);
        Schema::structure(
            "Camera",
            LayoutRules::Packed,
            vec![
                FieldDef::new("position", FieldType::vec3f()),
                FieldDef::new("target", FieldType::vec3f()),
                FieldDef::new("up", FieldType::vec3f()),
                FieldDef::new("fov_y", f32),
                FieldDef::new("aspect", f32),
                FieldDef::new("near", f32),
                FieldDef::new("far", f32),
            ],
        )
    }

    /// Structured value in schema field order.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Struct(vec![
            self.position.into(),
            self.target.into(),
            self.up.into(),
            self.fov_y.into(),
            self.aspect.into(),
            self.near.into(),
            self.far.into(),
        ])
    }

    /// Reads a camera back from its structured value.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        Some(Self {
            position: value.field(0)?.to_f32_array()?,
            target: value.field(1)?.to_f32_array()?,
            up: value.field(2)?.to_f32_array()?,
            fov_y: value.field(3)?.as_f32()?,
            aspect: value.field(4)?.as_f32()?,
            near: value.field(5)?.as_f32()?,
            far: value.field(6)?.as_f32()?,
        })
    }

    /// Column-major `projection * view`.
    #[must_use]
    pub fn view_projection(&self) -> Mat4 {
        mul(&self.projection(), &self.view())
    }

    fn view(&self) -> Mat4 {
        let f = normalize(sub(self.target, self.position));
        let s = normalize(cross(f, self.up));
        let u = cross(s, f);
        let eye = self.position;
        [
            [s[0], u[0], -f[0], 0.0],
            [s[1], u[1], -f[1], 0.0],
            [s[2], u[2], -f[2], 0.0],
            [-dot(s, eye), -dot(u, eye), dot(f, eye), 1.0],
        ]
    }

    fn projection(&self) -> Mat4 {
        let f = 1.0 / (self.fov_y * 0.5).tan();
        let range = self.near - self.far;
        [
            [f / self.aspect, 0.0, 0.0, 0.0],
            [0.0, f, 0.0, 0.0],
            [0.0, 0.0, self.far / range, -1.0],
            [0.0, 0.0, self.near * self.far / range, 0.0],
        ]
    }
}

/// Per-frame uniform block shared by the render systems.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct SceneUniforms {
    /// Column-major view-projection matrix.
    pub view_projection: Mat4,
    /// Direction the light travels.
    pub light_direction: Vec3,
    /// Ambient term.
    pub ambient_strength: f32,
    /// Light color.
    pub light_color: Vec3,
    _pad: f32,
}

impl SceneUniforms {
    /// Assembles the block.
    #[must_use]
    pub const fn new(view_projection: Mat4, light_direction: Vec3, ambient_strength: f32, light_color: Vec3) -> Self {
        Self {
            view_projection,
            light_direction,
            ambient_strength,
            light_color,
            _pad: 0.0,
        }
    }

    /// Gpu-rules schema matching the `#[repr(C)]` layout (stride 96).
    ///
    /// # Errors
    ///
    /// Never fails for this fixed field list.
    pub fn schema() -> LayoutResult<Arc<Schema>> {
        Schema::structure(
            "SceneUniforms",
            LayoutRules::Gpu,
            vec![
                FieldDef::new("view_projection", FieldType::mat4f()),
                FieldDef::new("light_direction", FieldType::vec3f()),
                FieldDef::new("ambient_strength", FieldType::scalar(ScalarType::F32)),
                FieldDef::new("light_color", FieldType::vec3f()),
            ],
        )
    }

    /// Structured value in schema field order.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Struct(vec![
            self.view_projection.into(),
            self.light_direction.into(),
            self.ambient_strength.into(),
            self.light_color.into(),
        ])
    }
}

fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn dot(a: Vec3, b: Vec3) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: Vec3, b: Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn normalize(v: Vec3) -> Vec3 {
    let len = dot(v, v).sqrt();
    if len <= f32::EPSILON {
        return v;
    }
    [v[0] / len, v[1] / len, v[2] / len]
}

fn mul(a: &Mat4, b: &Mat4) -> Mat4 {
    let mut out = [[0.0f32; 4]; 4];
    for (c, column) in out.iter_mut().enumerate() {
        for (r, cell) in column.iter_mut().enumerate() {
            *cell = (0..4).map(|k| a[k][r] * b[c][k]).sum();
        }
    }
    out
}
