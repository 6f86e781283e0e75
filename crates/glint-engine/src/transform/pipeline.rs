use std::f64::consts::{PI, TAU};

use nalgebra::{Matrix4, Point3, Rotation3, Vector3};

use crate::time::FrameTick;

use super::{AngleSource, CameraMode, ClipDepth, Perspective, TransformError, TransformParams, Viewport};

/// Matrices for one frame plus the scalars that produced them.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TransformState {
    pub model: Matrix4<f32>,
    pub view: Matrix4<f32>,
    pub projection: Matrix4<f32>,

    /// Model rotation angle, radians in `[0, 2π)` for spinning models.
    pub angle: f32,
    /// Camera azimuth around +Y, radians. Zero for a static camera.
    pub azimuth: f32,
    /// Distance from the eye to the origin.
    pub radius: f32,
    pub eye: Point3<f32>,

    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl TransformState {
    /// Identity model and view with the given projection inputs. Mostly useful in tests.
    pub fn identity(aspect: f32) -> Self {
        let p = Perspective::default();
        Self {
            model: Matrix4::identity(),
            view: Matrix4::identity(),
            projection: perspective(&p, aspect),
            angle: 0.0,
            azimuth: 0.0,
            radius: 0.0,
            eye: Point3::origin(),
            fov_y: p.fov_y,
            aspect,
            near: p.near,
            far: p.far,
        }
    }
}

#[derive(Debug, Copy, Clone)]
struct CachedProjection {
    aspect: f32,
    matrix: Matrix4<f32>,
}

/// Per-frame model/view/projection computation.
///
/// `update` is a pure function of the tick and the construction parameters;
/// only the projection is cached, keyed on the aspect ratio.
#[derive(Debug, Clone)]
pub struct TransformPipeline {
    params: TransformParams,
    aspect: f32,
    projection: Option<CachedProjection>,
    rebuilds: u64,
}

impl TransformPipeline {
    pub fn new(params: TransformParams, aspect: f32) -> Result<Self, TransformError> {
        validate(&params)?;
        if !(aspect.is_finite() && aspect > 0.0) {
            return Err(TransformError::Aspect { aspect });
        }

        Ok(Self {
            params,
            aspect,
            projection: None,
            rebuilds: 0,
        })
    }

    pub fn params(&self) -> &TransformParams {
        &self.params
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Number of times the projection matrix has been built.
    pub fn projection_rebuilds(&self) -> u64 {
        self.rebuilds
    }

    /// Tracks a new drawable size. Zero-area viewports are ignored.
    ///
    /// Returns `true` when the aspect ratio changed.
    pub fn notify_resize(&mut self, viewport: Viewport) -> bool {
        let Some(aspect) = viewport.aspect() else {
            return false;
        };
        if aspect == self.aspect {
            return false;
        }
        self.aspect = aspect;
        self.projection = None;
        true
    }

    pub fn update(&mut self, tick: FrameTick) -> TransformState {
        let t = tick.secs();

        let angle = match self.params.model.angle {
            AngleSource::Fixed(angle) => angle,
            AngleSource::Spin { radians_per_second } => wrap(radians_per_second * t) as f32,
        };
        let model = Rotation3::from_axis_angle(&self.params.model.axis, angle).to_homogeneous();

        let (view, eye, azimuth, radius) = match self.params.camera {
            CameraMode::Static { translation } => (
                Matrix4::new_translation(&translation),
                Point3::from(-translation),
                0.0,
                translation.norm(),
            ),
            CameraMode::Orbit { radius, angular_speed } => {
                let azimuth = wrap(angular_speed * t);
                let (sin, cos) = azimuth.sin_cos();
                let r = f64::from(radius);
                let eye = Point3::new((r * sin) as f32, 0.0, (r * cos) as f32);
                let view = Matrix4::look_at_rh(&eye, &Point3::origin(), &Vector3::y());
                (view, eye, azimuth as f32, radius)
            }
        };

        let projection = self.projection();
        let p = &self.params.projection;

        TransformState {
            model,
            view,
            projection,
            angle,
            azimuth,
            radius,
            eye,
            fov_y: p.fov_y,
            aspect: self.aspect,
            near: p.near,
            far: p.far,
        }
    }

    fn projection(&mut self) -> Matrix4<f32> {
        if let Some(cached) = self.projection {
            if cached.aspect == self.aspect {
                return cached.matrix;
            }
        }

        let matrix = perspective(&self.params.projection, self.aspect);
        self.projection = Some(CachedProjection {
            aspect: self.aspect,
            matrix,
        });
        self.rebuilds += 1;
        log::debug!("projection rebuilt for aspect {:.4}", self.aspect);
        matrix
    }
}

fn wrap(radians: f64) -> f64 {
    radians.rem_euclid(TAU)
}

fn perspective(p: &Perspective, aspect: f32) -> Matrix4<f32> {
    match p.clip_depth {
        ClipDepth::NegativeOneToOne => Matrix4::new_perspective(aspect, p.fov_y, p.near, p.far),
        ClipDepth::ZeroToOne => {
            let f = 1.0 / (p.fov_y * 0.5).tan();
            let range = p.near - p.far;
            #[rustfmt::skip]
            let m = Matrix4::new(
                f / aspect, 0.0, 0.0,            0.0,
                0.0,        f,   0.0,            0.0,
                0.0,        0.0, p.far / range,  p.near * p.far / range,
                0.0,        0.0, -1.0,           0.0,
            );
            m
        }
    }
}

fn validate(params: &TransformParams) -> Result<(), TransformError> {
    let p = &params.projection;
    if !(p.near.is_finite() && p.far.is_finite() && p.near > 0.0 && p.near < p.far) {
        return Err(TransformError::ClipPlanes {
            near: p.near,
            far: p.far,
        });
    }
    if !(p.fov_y > 0.0 && f64::from(p.fov_y) < PI) {
        return Err(TransformError::FieldOfView { fov_y: p.fov_y });
    }

    if !params.model.axis.iter().all(|c| c.is_finite()) {
        return Err(TransformError::NonFinite { what: "model axis" });
    }
    match params.model.angle {
        AngleSource::Fixed(angle) if !angle.is_finite() => {
            return Err(TransformError::NonFinite { what: "model angle" });
        }
        AngleSource::Spin { radians_per_second } if !radians_per_second.is_finite() => {
            return Err(TransformError::NonFinite { what: "model angular speed" });
        }
        _ => {}
    }

    match params.camera {
        CameraMode::Static { translation } if !translation.iter().all(|c| c.is_finite()) => {
            Err(TransformError::NonFinite { what: "camera translation" })
        }
        CameraMode::Orbit { radius, .. } if !(radius.is_finite() && radius > 0.0) => {
            Err(TransformError::OrbitRadius { radius })
        }
        CameraMode::Orbit { angular_speed, .. } if !angular_speed.is_finite() => {
            Err(TransformError::NonFinite { what: "camera angular speed" })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::FRAC_PI_2;

    use approx::assert_abs_diff_eq;
    use nalgebra::Vector4;

    use super::*;
    use crate::transform::{ModelRotation, Perspective};

    fn orbit(radius: f32, angular_speed: f64) -> TransformParams {
        TransformParams {
            camera: CameraMode::Orbit { radius, angular_speed },
            ..TransformParams::default()
        }
    }

    fn spinning() -> TransformParams {
        TransformParams {
            model: ModelRotation {
                axis: nalgebra::Unit::new_normalize(Vector3::new(0.5, 1.0, 0.0)),
                angle: AngleSource::Spin {
                    radians_per_second: 50.0f64.to_radians(),
                },
            },
            camera: CameraMode::Orbit {
                radius: 10.0,
                angular_speed: 1.0,
            },
            projection: Perspective::default(),
        }
    }

    fn bits(m: &Matrix4<f32>) -> Vec<u32> {
        m.iter().map(|v| v.to_bits()).collect()
    }

    #[test]
    fn update_is_bitwise_deterministic() {
        let mut a = TransformPipeline::new(spinning(), 4.0 / 3.0).expect("params");
        let mut b = TransformPipeline::new(spinning(), 4.0 / 3.0).expect("params");

        // Interleave extra updates on `a` so the cache state differs.
        for secs in [0.0, 0.016, 1.5, 123.456, 9_999.25] {
            let _ = a.update(FrameTick::from_secs(secs * 0.5));
            let sa = a.update(FrameTick::from_secs(secs));
            let sb = b.update(FrameTick::from_secs(secs));

            assert_eq!(bits(&sa.model), bits(&sb.model));
            assert_eq!(bits(&sa.view), bits(&sb.view));
            assert_eq!(bits(&sa.projection), bits(&sb.projection));
            assert_eq!(sa.angle.to_bits(), sb.angle.to_bits());
        }
    }

    #[test]
    fn orbit_eye_positions() {
        let radius = 10.0;
        let mut pipeline = TransformPipeline::new(orbit(radius, 1.0), 1.0).expect("params");

        let start = pipeline.update(FrameTick::from_secs(0.0));
        assert_abs_diff_eq!(start.eye, Point3::new(0.0, 0.0, radius), epsilon = 1e-5);
        assert_abs_diff_eq!(start.radius, radius);

        let quarter = pipeline.update(FrameTick::from_secs(FRAC_PI_2));
        assert_abs_diff_eq!(quarter.eye, Point3::new(radius, 0.0, 0.0), epsilon = 1e-5);
        assert_abs_diff_eq!(quarter.azimuth, std::f32::consts::FRAC_PI_2, epsilon = 1e-6);
    }

    #[test]
    fn orbit_view_looks_at_origin() {
        let mut pipeline = TransformPipeline::new(orbit(5.0, 0.7), 1.0).expect("params");
        let state = pipeline.update(FrameTick::from_secs(2.0));

        let origin = state.view * Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert_abs_diff_eq!(origin.x, 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(origin.y, 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(origin.z, -5.0, epsilon = 1e-5);
    }

    #[test]
    fn static_camera_defaults() {
        let mut pipeline = TransformPipeline::new(TransformParams::default(), 800.0 / 600.0).expect("params");
        let state = pipeline.update(FrameTick::from_secs(42.0));

        assert_eq!(state.view, Matrix4::new_translation(&Vector3::new(0.0, 0.0, -3.0)));
        assert_abs_diff_eq!(state.eye, Point3::new(0.0, 0.0, 3.0));
        assert_abs_diff_eq!(state.angle, (-55.0f32).to_radians());
        assert_abs_diff_eq!(state.fov_y, 45.0f32.to_radians());
        assert_eq!((state.near, state.far), (0.1, 100.0));
    }

    #[test]
    fn spin_angle_wraps() {
        let params = TransformParams {
            model: ModelRotation {
                axis: Vector3::z_axis(),
                angle: AngleSource::Spin { radians_per_second: 1.0 },
            },
            ..TransformParams::default()
        };
        let mut pipeline = TransformPipeline::new(params, 1.0).expect("params");

        let state = pipeline.update(FrameTick::from_secs(TAU + 0.25));
        assert_abs_diff_eq!(state.angle, 0.25, epsilon = 1e-6);
    }

    #[test]
    fn projection_rebuilt_only_on_aspect_change() {
        let mut pipeline = TransformPipeline::new(TransformParams::default(), 800.0 / 600.0).expect("params");

        for i in 0..5 {
            pipeline.update(FrameTick::from_secs(f64::from(i)));
        }
        assert_eq!(pipeline.projection_rebuilds(), 1);
        let before = pipeline.update(FrameTick::from_secs(5.0)).projection;

        assert!(!pipeline.notify_resize(Viewport::from_size(1600, 1200)));
        assert!(!pipeline.notify_resize(Viewport::from_size(0, 0)));
        pipeline.update(FrameTick::from_secs(6.0));
        assert_eq!(pipeline.projection_rebuilds(), 1);

        assert!(pipeline.notify_resize(Viewport::from_size(1920, 1080)));
        let state = pipeline.update(FrameTick::from_secs(7.0));
        pipeline.update(FrameTick::from_secs(8.0));
        assert_eq!(pipeline.projection_rebuilds(), 2);
        assert_abs_diff_eq!(state.aspect, 1920.0 / 1080.0);
        assert_ne!(state.projection, before);
        assert_abs_diff_eq!(state.projection[(0, 0)] * state.aspect, before[(0, 0)] * 800.0 / 600.0, epsilon = 1e-5);
    }

    #[test]
    fn zero_to_one_depth_range() {
        let mut pipeline = TransformPipeline::new(TransformParams::default(), 1.0).expect("params");
        let p = pipeline.update(FrameTick::from_secs(0.0)).projection;

        let near = p * Vector4::new(0.0, 0.0, -0.1, 1.0);
        let far = p * Vector4::new(0.0, 0.0, -100.0, 1.0);
        assert_abs_diff_eq!(near.z / near.w, 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(far.z / far.w, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn negative_one_to_one_depth_range() {
        let mut params = TransformParams::default();
        params.projection.clip_depth = ClipDepth::NegativeOneToOne;
        let mut pipeline = TransformPipeline::new(params, 1.0).expect("params");
        let p = pipeline.update(FrameTick::from_secs(0.0)).projection;

        let near = p * Vector4::new(0.0, 0.0, -0.1, 1.0);
        let far = p * Vector4::new(0.0, 0.0, -100.0, 1.0);
        assert_abs_diff_eq!(near.z / near.w, -1.0, epsilon = 1e-4);
        assert_abs_diff_eq!(far.z / far.w, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let mut params = TransformParams::default();
        params.projection.near = 0.0;
        assert!(matches!(
            TransformPipeline::new(params, 1.0),
            Err(TransformError::ClipPlanes { .. })
        ));

        let mut params = TransformParams::default();
        params.projection.far = 0.05;
        assert!(matches!(
            TransformPipeline::new(params, 1.0),
            Err(TransformError::ClipPlanes { .. })
        ));

        let mut params = TransformParams::default();
        params.projection.fov_y = std::f32::consts::PI;
        assert!(matches!(
            TransformPipeline::new(params, 1.0),
            Err(TransformError::FieldOfView { .. })
        ));

        assert!(matches!(
            TransformPipeline::new(orbit(0.0, 1.0), 1.0),
            Err(TransformError::OrbitRadius { .. })
        ));

        assert!(matches!(
            TransformPipeline::new(TransformParams::default(), 0.0),
            Err(TransformError::Aspect { .. })
        ));
    }
}
