use glint_engine::core::{build_drawable, App, SetupError};
use glint_engine::device::Backend;
use glint_engine::render::{ClearColor, FrameRenderer, RenderLoop};
use glint_engine::shader::ShaderSource;
use glint_engine::transform::{TransformParams, TransformPipeline, Viewport};

use crate::meshes::Mesh;
use crate::options::ViewerOptions;

/// Single-mesh viewer: one program, one geometry, one draw per frame.
pub struct ViewerApp {
    vertex: ShaderSource,
    fragment: ShaderSource,
    mesh: Mesh,
    params: TransformParams,
    clear_color: ClearColor,
}

impl ViewerApp {
    pub fn new(vertex: ShaderSource, fragment: ShaderSource, mesh: Mesh, params: TransformParams) -> Self {
        Self {
            vertex,
            fragment,
            mesh,
            params,
            clear_color: ClearColor::default(),
        }
    }

    pub fn from_options(options: &ViewerOptions) -> anyhow::Result<Self> {
        let (vertex, fragment) = options.load_sources()?;
        let mut app = Self::new(vertex, fragment, options.mesh(), options.transform_params());
        if let Some(color) = options.clear_color {
            app.clear_color = color;
        }
        Ok(app)
    }
}

impl App for ViewerApp {
    fn setup<B: Backend>(&mut self, backend: &mut B) -> Result<RenderLoop<B>, SetupError> {
        let (width, height) = backend.surface_size();
        let aspect = Viewport::from_size(width, height).aspect().unwrap_or(1.0);
        let transforms = TransformPipeline::new(self.params, aspect)?;

        let drawable = build_drawable(
            backend,
            self.vertex.clone(),
            self.fragment.clone(),
            self.mesh.data(),
        )?;

        log::info!(
            "viewer ready: {} vertices, aspect {aspect:.3}",
            drawable.geometry().vertex_count()
        );

        Ok(RenderLoop::new(drawable, transforms, FrameRenderer::new(self.clear_color)))
    }
}
