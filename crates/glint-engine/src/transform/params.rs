use nalgebra::{Unit, Vector3};

/// Where the model rotation angle comes from.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum AngleSource {
    /// Constant angle in radians.
    Fixed(f32),
    /// `radians_per_second · tick`.
    Spin { radians_per_second: f64 },
}

/// Model matrix: rotation about a unit axis.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ModelRotation {
    pub axis: Unit<Vector3<f32>>,
    pub angle: AngleSource,
}

impl Default for ModelRotation {
    fn default() -> Self {
        Self {
            axis: Vector3::x_axis(),
            angle: AngleSource::Fixed((-55.0f32).to_radians()),
        }
    }
}

/// View matrix source.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum CameraMode {
    /// The scene is translated by `translation`; the camera looks down -Z.
    Static { translation: Vector3<f32> },
    /// The eye circles the origin in the XZ plane, looking at the origin with +Y up.
    Orbit { radius: f32, angular_speed: f64 },
}

impl Default for CameraMode {
    fn default() -> Self {
        CameraMode::Static {
            translation: Vector3::new(0.0, 0.0, -3.0),
        }
    }
}

/// Clip-space depth convention of the target API.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum ClipDepth {
    /// wgpu / D3D / Metal / Vulkan.
    #[default]
    ZeroToOne,
    /// OpenGL.
    NegativeOneToOne,
}

/// Right-handed perspective projection.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Perspective {
    /// Vertical field of view, radians.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    pub clip_depth: ClipDepth,
}

impl Default for Perspective {
    fn default() -> Self {
        Self {
            fov_y: 45.0f32.to_radians(),
            near: 0.1,
            far: 100.0,
            clip_depth: ClipDepth::ZeroToOne,
        }
    }
}

/// Inputs of a [`TransformPipeline`](super::TransformPipeline), fixed at construction.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct TransformParams {
    pub model: ModelRotation,
    pub camera: CameraMode,
    pub projection: Perspective,
}
