use thiserror::Error;

/// Rejected [`TransformParams`](super::TransformParams) or aspect ratio.
#[derive(Debug, Copy, Clone, PartialEq, Error)]
pub enum TransformError {
    #[error("clip planes must satisfy 0 < near < far (near = {near}, far = {far})")]
    ClipPlanes { near: f32, far: f32 },

    #[error("vertical field of view must lie in (0, π), got {fov_y}")]
    FieldOfView { fov_y: f32 },

    #[error("aspect ratio must be positive and finite, got {aspect}")]
    Aspect { aspect: f32 },

    #[error("orbit radius must be positive and finite, got {radius}")]
    OrbitRadius { radius: f32 },

    #[error("{what} must be finite")]
    NonFinite { what: &'static str },
}
