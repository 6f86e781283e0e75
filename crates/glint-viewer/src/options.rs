use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use nalgebra::{Unit, Vector3};

use glint_engine::render::ClearColor;
use glint_engine::shader::ShaderSource;
use glint_engine::transform::{AngleSource, CameraMode, ModelRotation, TransformParams};
use glint_engine::window::RuntimeConfig;

use crate::meshes::{self, Mesh};

const BUILTIN_VERTEX: &str = include_str!("../shaders/mesh.vert.wgsl");
const BUILTIN_FRAGMENT: &str = include_str!("../shaders/mesh.frag.wgsl");

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
pub enum CameraChoice {
    /// Fixed camera three units back from the origin.
    Static,
    /// Camera circling the origin.
    Orbit,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
pub enum MeshChoice {
    Quad,
    Triangle,
    Cube,
}

/// Draws one mesh with a model/view/projection shader.
///
/// Keys: Escape closes, 1 switches to wireframe, 2 back to fill.
#[derive(Debug, Clone, Parser)]
#[command(name = "glint-viewer", version)]
pub struct ViewerOptions {
    /// Camera mode.
    #[arg(long, value_enum, default_value_t = CameraChoice::Static)]
    pub camera: CameraChoice,

    /// Mesh to draw.
    #[arg(long, value_enum, default_value_t = MeshChoice::Quad)]
    pub mesh: MeshChoice,

    /// Spin the model at this many degrees per second instead of a fixed tilt.
    #[arg(long, value_name = "DEG_PER_SEC")]
    pub spin: Option<f64>,

    /// Orbit radius for `--camera orbit`.
    #[arg(long, value_name = "UNITS", default_value_t = 10.0)]
    pub orbit_radius: f32,

    /// Orbit speed for `--camera orbit`, in radians per second.
    #[arg(long, value_name = "RAD_PER_SEC", default_value_t = 1.0)]
    pub orbit_speed: f64,

    /// WGSL vertex stage to use instead of the built-in one.
    #[arg(long, value_name = "PATH")]
    pub vertex: Option<PathBuf>,

    /// WGSL fragment stage to use instead of the built-in one.
    #[arg(long, value_name = "PATH")]
    pub fragment: Option<PathBuf>,

    /// Background color as six hex digits, e.g. `334d4d`.
    #[arg(long, value_name = "RRGGBB", value_parser = parse_clear_color)]
    pub clear_color: Option<ClearColor>,

    /// Window title.
    #[arg(long, default_value = "glint")]
    pub title: String,
}

impl ViewerOptions {
    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            title: self.title.clone(),
            ..RuntimeConfig::default()
        }
    }

    pub fn mesh(&self) -> Mesh {
        match self.mesh {
            MeshChoice::Quad => meshes::quad(),
            MeshChoice::Triangle => meshes::triangle(),
            MeshChoice::Cube => meshes::cube(),
        }
    }

    pub fn transform_params(&self) -> TransformParams {
        let model = match self.spin {
            Some(deg_per_sec) => ModelRotation {
                axis: Unit::new_normalize(Vector3::new(0.5, 1.0, 0.0)),
                angle: AngleSource::Spin {
                    radians_per_second: deg_per_sec.to_radians(),
                },
            },
            None => ModelRotation::default(),
        };

        let camera = match self.camera {
            CameraChoice::Static => CameraMode::default(),
            CameraChoice::Orbit => CameraMode::Orbit {
                radius: self.orbit_radius,
                angular_speed: self.orbit_speed,
            },
        };

        TransformParams {
            model,
            camera,
            ..TransformParams::default()
        }
    }

    /// Reads the stage files, falling back to the built-in shaders.
    pub fn load_sources(&self) -> Result<(ShaderSource, ShaderSource)> {
        let vertex = match &self.vertex {
            Some(path) => ShaderSource::vertex(read_stage(path)?).with_label(path.display().to_string()),
            None => ShaderSource::vertex(BUILTIN_VERTEX).with_label("mesh.vert.wgsl"),
        };
        let fragment = match &self.fragment {
            Some(path) => ShaderSource::fragment(read_stage(path)?).with_label(path.display().to_string()),
            None => ShaderSource::fragment(BUILTIN_FRAGMENT).with_label("mesh.frag.wgsl"),
        };
        Ok((vertex, fragment))
    }
}

fn parse_clear_color(text: &str) -> Result<ClearColor, String> {
    let hex = text.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(format!("expected RRGGBB, got `{text}`"));
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| format!("`{text}`: {e}"));
    Ok(ClearColor::from_srgb_u8(channel(0)?, channel(2)?, channel(4)?, 255))
}

fn read_stage(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read shader {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ViewerOptions {
        ViewerOptions::try_parse_from(std::iter::once("glint-viewer").chain(args.iter().copied()))
            .expect("valid arguments")
    }

    #[test]
    fn defaults_match_the_classic_scene() {
        let options = parse(&[]);
        assert_eq!(options.camera, CameraChoice::Static);
        assert_eq!(options.mesh, MeshChoice::Quad);
        assert_eq!(options.transform_params(), TransformParams::default());
        assert_eq!(options.runtime_config().title, "glint");
    }

    #[test]
    fn orbit_and_spin_flags() {
        let options = parse(&["--camera", "orbit", "--orbit-radius", "4", "--spin", "50", "--mesh", "cube"]);
        let params = options.transform_params();

        assert_eq!(
            params.camera,
            CameraMode::Orbit {
                radius: 4.0,
                angular_speed: 1.0
            }
        );
        assert!(matches!(
            params.model.angle,
            AngleSource::Spin { radians_per_second } if (radians_per_second - 50f64.to_radians()).abs() < 1e-12
        ));
        assert_eq!(options.mesh().vertex_count(), 8);
    }

    #[test]
    fn clear_color_is_parsed_from_hex() {
        let options = parse(&["--clear-color", "#ff0033"]);
        assert_eq!(options.clear_color, Some(ClearColor::new(1.0, 0.0, 0.2, 1.0)));

        assert!(ViewerOptions::try_parse_from(["glint-viewer", "--clear-color", "ff00"]).is_err());
        assert!(ViewerOptions::try_parse_from(["glint-viewer", "--clear-color", "gg0000"]).is_err());
    }

    #[test]
    fn unknown_camera_is_rejected() {
        assert!(ViewerOptions::try_parse_from(["glint-viewer", "--camera", "fly"]).is_err());
    }

    #[test]
    fn builtin_sources_are_used_by_default() {
        let (vertex, fragment) = parse(&[]).load_sources().expect("built-in");
        assert_eq!(vertex.text(), BUILTIN_VERTEX);
        assert_eq!(fragment.text(), BUILTIN_FRAGMENT);
    }

    #[test]
    fn unreadable_shader_path_is_an_error() {
        let options = parse(&["--vertex", "/nonexistent/glint/shader.wgsl"]);
        let err = options.load_sources().expect_err("missing file");
        assert!(format!("{err:#}").contains("failed to read shader"));
    }
}
