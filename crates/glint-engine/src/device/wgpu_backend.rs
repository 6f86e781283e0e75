use std::collections::HashMap;
use std::num::NonZeroU64;

use anyhow::Result;
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::geometry::{ComponentType, VertexLayout};
use crate::render::ClearColor;
use crate::shader::StageKind;

use super::surface::{DepthTarget, DEPTH_FORMAT};
use super::{
    Backend, DeviceError, DeviceOp, DrawCall, GeometryDescriptor, Gpu, GpuFrame, GpuInit,
    IndexFormat, ProgramLayout, StageDescriptor, SurfaceErrorAction, UniformLocation,
};

/// Rasterization mode used for subsequently bound geometry.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PolygonMode {
    Fill,
    Line,
}

impl PolygonMode {
    fn to_wgpu(self) -> wgpu::PolygonMode {
        match self {
            PolygonMode::Fill => wgpu::PolygonMode::Fill,
            PolygonMode::Line => wgpu::PolygonMode::Line,
        }
    }
}

/// Compiled shader module plus the entry point it was validated against.
pub struct WgpuStage {
    kind: StageKind,
    module: wgpu::ShaderModule,
    entry_point: String,
}

/// Uniform buffers and bind groups of a linked program.
pub struct WgpuProgram {
    id: u64,
    uniforms: HashMap<String, UniformSlot>,
    bind_groups: Vec<wgpu::BindGroup>,
}

struct UniformSlot {
    location: UniformLocation,
    buffer: wgpu::Buffer,
    size: u32,
}

/// Pipeline ingredients kept by the backend until the program is released.
struct ProgramParts {
    vertex: wgpu::ShaderModule,
    vertex_entry: String,
    fragment: wgpu::ShaderModule,
    fragment_entry: String,
    pipeline_layout: wgpu::PipelineLayout,
}

/// Device buffers of one mesh.
pub struct WgpuGeometry {
    id: u64,
    vertex_buffer: wgpu::Buffer,
    index_buffer: Option<(wgpu::Buffer, wgpu::IndexFormat)>,
    layout: VertexLayout,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
struct PipelineKey {
    program: u64,
    layout: VertexLayout,
    polygon_mode: PolygonMode,
}

/// Frame opened by `clear` and closed by `present`/`abandon_frame`.
///
/// Field order matters: the pass must be dropped before the encoder is finished.
struct FrameInFlight {
    pass: wgpu::RenderPass<'static>,
    frame: GpuFrame,
    program: Option<u64>,
}

/// [`Backend`] over wgpu, bound to one window surface.
pub struct WgpuBackend<'w> {
    gpu: Gpu<'w>,
    depth: DepthTarget,
    programs: HashMap<u64, ProgramParts>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    frame: Option<FrameInFlight>,
    polygon_mode: PolygonMode,
    next_id: u64,
}

impl<'w> WgpuBackend<'w> {
    /// Creates the GPU context for `window` and the matching depth target.
    pub fn new(window: &'w Window, init: GpuInit) -> Result<Self> {
        let gpu = pollster::block_on(Gpu::new(window, init))?;
        let depth = DepthTarget::new(gpu.device(), gpu.size());

        Ok(Self {
            gpu,
            depth,
            programs: HashMap::new(),
            pipelines: HashMap::new(),
            frame: None,
            polygon_mode: PolygonMode::Fill,
            next_id: 0,
        })
    }

    pub fn gpu(&self) -> &Gpu<'w> {
        &self.gpu
    }

    /// Reconfigures the surface and depth target. Zero-area sizes are deferred.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        // Any frame in flight targets the old surface texture.
        self.frame = None;
        if self.gpu.resize(new_size) {
            self.depth = DepthTarget::new(self.gpu.device(), new_size);
            log::debug!("surface resized to {}x{}", new_size.width, new_size.height);
        }
    }

    pub fn polygon_mode(&self) -> PolygonMode {
        self.polygon_mode
    }

    /// Switches between filled and wireframe rasterization.
    ///
    /// Returns `false` (and keeps the current mode) when the device lacks line mode.
    pub fn set_polygon_mode(&mut self, mode: PolygonMode) -> bool {
        if mode == PolygonMode::Line && !self.gpu.features().contains(wgpu::Features::POLYGON_MODE_LINE) {
            log::warn!("wireframe requested but the device does not support line polygon mode");
            return false;
        }
        if self.polygon_mode != mode {
            log::info!("polygon mode: {mode:?}");
            self.polygon_mode = mode;
        }
        true
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn pipeline_for(
        &mut self,
        program: u64,
        geometry: &WgpuGeometry,
        op: DeviceOp,
    ) -> Result<wgpu::RenderPipeline, DeviceError> {
        let key = PipelineKey {
            program,
            layout: geometry.layout.clone(),
            polygon_mode: self.polygon_mode,
        };
        if let Some(pipeline) = self.pipelines.get(&key) {
            return Ok(pipeline.clone());
        }

        let parts = self
            .programs
            .get(&program)
            .ok_or_else(|| DeviceError::new(op, "program has been released"))?;

        let attributes = vertex_attributes(&geometry.layout);
        let stride = geometry.layout.stride().unwrap_or(0);
        let buffers = [wgpu::VertexBufferLayout {
            array_stride: u64::from(stride),
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &attributes,
        }];

        let device = self.gpu.device();
        let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("glint mesh pipeline"),
            layout: Some(&parts.pipeline_layout),

            vertex: wgpu::VertexState {
                module: &parts.vertex,
                entry_point: Some(&parts.vertex_entry),
                compilation_options: Default::default(),
                buffers: &buffers,
            },

            fragment: Some(wgpu::FragmentState {
                module: &parts.fragment,
                entry_point: Some(&parts.fragment_entry),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.gpu.surface_format(),
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: self.polygon_mode.to_wgpu(),
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });
        if let Some(err) = pollster::block_on(scope.pop()) {
            return Err(DeviceError::new(op, err.to_string()));
        }

        log::debug!(
            "built pipeline for program {program}, geometry {} ({:?})",
            geometry.id,
            self.polygon_mode
        );
        self.pipelines.insert(key, pipeline.clone());
        Ok(pipeline)
    }

    fn frame_mut(&mut self, op: DeviceOp) -> Result<&mut FrameInFlight, DeviceError> {
        self.frame
            .as_mut()
            .ok_or_else(|| DeviceError::new(op, "no frame in flight"))
    }
}

impl<'w> Backend for WgpuBackend<'w> {
    type Stage = WgpuStage;
    type Program = WgpuProgram;
    type Geometry = WgpuGeometry;

    fn surface_size(&self) -> (u32, u32) {
        let size = self.gpu.size();
        (size.width, size.height)
    }

    fn create_stage(&mut self, desc: &StageDescriptor<'_>) -> Result<Self::Stage, DeviceError> {
        let device = self.gpu.device();
        let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: desc.label,
            source: wgpu::ShaderSource::Wgsl(desc.source.into()),
        });
        if let Some(err) = pollster::block_on(scope.pop()) {
            return Err(DeviceError::new(DeviceOp::CreateStage, err.to_string()));
        }

        Ok(WgpuStage {
            kind: desc.kind,
            module,
            entry_point: desc.entry_point.to_owned(),
        })
    }

    fn create_program(
        &mut self,
        vertex: &Self::Stage,
        fragment: &Self::Stage,
        layout: &ProgramLayout,
    ) -> Result<Self::Program, DeviceError> {
        if vertex.kind != StageKind::Vertex || fragment.kind != StageKind::Fragment {
            return Err(DeviceError::new(
                DeviceOp::CreateProgram,
                format!("stages are ({}, {}), expected (vertex, fragment)", vertex.kind, fragment.kind),
            ));
        }

        let device = self.gpu.device();
        let group_count = bind_group_count(layout, device.limits().max_bind_groups)?;
        let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);

        let mut uniforms = HashMap::new();
        let mut group_layouts = Vec::with_capacity(group_count as usize);
        let mut bind_groups = Vec::with_capacity(group_count as usize);

        for group in 0..group_count {
            let members: Vec<_> = layout
                .uniforms
                .iter()
                .filter(|u| u.location.group == group)
                .collect();

            let entries: Vec<wgpu::BindGroupLayoutEntry> = members
                .iter()
                .map(|u| wgpu::BindGroupLayoutEntry {
                    binding: u.location.binding,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: NonZeroU64::new(u64::from(u.size)),
                    },
                    count: None,
                })
                .collect();

            let bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("glint uniform bgl"),
                entries: &entries,
            });

            let buffers: Vec<wgpu::Buffer> = members
                .iter()
                .map(|u| {
                    device.create_buffer(&wgpu::BufferDescriptor {
                        label: Some(&u.name),
                        size: u64::from(u.size),
                        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                        mapped_at_creation: false,
                    })
                })
                .collect();

            let bind_entries: Vec<wgpu::BindGroupEntry> = members
                .iter()
                .zip(&buffers)
                .map(|(u, buffer)| wgpu::BindGroupEntry {
                    binding: u.location.binding,
                    resource: buffer.as_entire_binding(),
                })
                .collect();

            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("glint uniform bind group"),
                layout: &bgl,
                entries: &bind_entries,
            });

            for (u, buffer) in members.iter().zip(buffers) {
                uniforms.insert(
                    u.name.clone(),
                    UniformSlot {
                        location: u.location,
                        buffer,
                        size: u.size,
                    },
                );
            }
            group_layouts.push(bgl);
            bind_groups.push(bind_group);
        }

        let layout_refs: Vec<&wgpu::BindGroupLayout> = group_layouts.iter().collect();
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("glint program layout"),
            bind_group_layouts: &layout_refs,
            immediate_size: 0,
        });

        if let Some(err) = pollster::block_on(scope.pop()) {
            return Err(DeviceError::new(DeviceOp::CreateProgram, err.to_string()));
        }

        let id = self.next_id();
        self.programs.insert(
            id,
            ProgramParts {
                vertex: vertex.module.clone(),
                vertex_entry: vertex.entry_point.clone(),
                fragment: fragment.module.clone(),
                fragment_entry: fragment.entry_point.clone(),
                pipeline_layout,
            },
        );

        Ok(WgpuProgram {
            id,
            uniforms,
            bind_groups,
        })
    }

    fn uniform_location(&mut self, program: &Self::Program, name: &str) -> Option<UniformLocation> {
        program.uniforms.get(name).map(|slot| slot.location)
    }

    fn create_geometry(&mut self, desc: &GeometryDescriptor<'_>) -> Result<Self::Geometry, DeviceError> {
        let device = self.gpu.device();
        let label = desc.label.unwrap_or("glint geometry");

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: desc.vertices,
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = desc.indices.map(|(bytes, format)| {
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytes,
                usage: wgpu::BufferUsages::INDEX,
            });
            (buffer, index_format(format))
        });

        Ok(WgpuGeometry {
            id: self.next_id(),
            vertex_buffer,
            index_buffer,
            layout: desc.layout.clone(),
        })
    }

    fn prepare_draw(&mut self, program: &Self::Program, geometry: &Self::Geometry) -> Result<(), DeviceError> {
        self.pipeline_for(program.id, geometry, DeviceOp::PrepareDraw)
            .map(|_| ())
    }

    fn clear(&mut self, color: ClearColor) -> Result<(), DeviceError> {
        if self.frame.take().is_some() {
            log::debug!("discarding unfinished frame");
        }

        let mut frame = match self.gpu.begin_frame() {
            Ok(f) => f,
            Err(err) => {
                let reason = err.to_string();
                return Err(match self.gpu.handle_surface_error(err) {
                    SurfaceErrorAction::Fatal => DeviceError::fatal(DeviceOp::Clear, reason),
                    SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame => {
                        DeviceError::new(DeviceOp::Clear, reason)
                    }
                });
            }
        };

        let pass = frame
            .encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("glint frame pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(color.to_wgpu()),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: self.depth.view(),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            })
            .forget_lifetime();

        self.frame = Some(FrameInFlight {
            pass,
            frame,
            program: None,
        });
        Ok(())
    }

    fn use_program(&mut self, program: &Self::Program) -> Result<(), DeviceError> {
        if !self.programs.contains_key(&program.id) {
            return Err(DeviceError::new(DeviceOp::UseProgram, "program has been released"));
        }

        let frame = self.frame_mut(DeviceOp::UseProgram)?;
        for (index, bind_group) in program.bind_groups.iter().enumerate() {
            frame.pass.set_bind_group(index as u32, bind_group, &[]);
        }
        frame.program = Some(program.id);
        Ok(())
    }

    fn set_uniform_mat4(
        &mut self,
        program: &Self::Program,
        location: UniformLocation,
        value: &[f32; 16],
    ) -> Result<(), DeviceError> {
        let slot = program
            .uniforms
            .values()
            .find(|slot| slot.location == location)
            .ok_or_else(|| {
                DeviceError::new(
                    DeviceOp::SetUniform,
                    format!("no uniform at group {} binding {}", location.group, location.binding),
                )
            })?;

        let bytes: &[u8] = bytemuck::cast_slice(value);
        if (slot.size as usize) < bytes.len() {
            return Err(DeviceError::new(
                DeviceOp::SetUniform,
                format!("uniform holds {} bytes, a mat4 needs {}", slot.size, bytes.len()),
            ));
        }

        self.gpu.queue().write_buffer(&slot.buffer, 0, bytes);
        Ok(())
    }

    fn bind_geometry(&mut self, geometry: &Self::Geometry) -> Result<(), DeviceError> {
        let program = self
            .frame_mut(DeviceOp::BindGeometry)?
            .program
            .ok_or_else(|| DeviceError::new(DeviceOp::BindGeometry, "no program in use"))?;

        let pipeline = self.pipeline_for(program, geometry, DeviceOp::BindGeometry)?;

        let frame = self.frame_mut(DeviceOp::BindGeometry)?;
        frame.pass.set_pipeline(&pipeline);
        frame.pass.set_vertex_buffer(0, geometry.vertex_buffer.slice(..));
        if let Some((buffer, format)) = &geometry.index_buffer {
            frame.pass.set_index_buffer(buffer.slice(..), *format);
        }
        Ok(())
    }

    fn draw(&mut self, call: DrawCall) -> Result<(), DeviceError> {
        let frame = self.frame_mut(DeviceOp::Draw)?;
        match call {
            DrawCall::Indexed { count, .. } => frame.pass.draw_indexed(0..count, 0, 0..1),
            DrawCall::Arrays { count } => frame.pass.draw(0..count, 0..1),
        }
        Ok(())
    }

    fn present(&mut self) -> Result<(), DeviceError> {
        let FrameInFlight { pass, frame, .. } = self
            .frame
            .take()
            .ok_or_else(|| DeviceError::new(DeviceOp::Present, "no frame in flight"))?;

        drop(pass);
        self.gpu.submit(frame);
        Ok(())
    }

    fn abandon_frame(&mut self) {
        self.frame = None;
    }

    fn release_program(&mut self, program: Self::Program) {
        self.programs.remove(&program.id);
        self.pipelines.retain(|key, _| key.program != program.id);
        log::debug!("released program {}", program.id);
    }

    fn release_geometry(&mut self, geometry: Self::Geometry) {
        log::debug!("released geometry {}", geometry.id);
    }
}

/// Number of bind groups the program needs, bounded by the device limit.
fn bind_group_count(layout: &ProgramLayout, max_bind_groups: u32) -> Result<u32, DeviceError> {
    let Some(highest) = layout.uniforms.iter().map(|u| u.location.group).max() else {
        return Ok(0);
    };
    if highest >= max_bind_groups {
        return Err(DeviceError::new(
            DeviceOp::CreateProgram,
            format!("uniform group {highest} exceeds the device limit of {max_bind_groups} bind groups"),
        ));
    }
    Ok(highest + 1)
}

fn index_format(format: IndexFormat) -> wgpu::IndexFormat {
    match format {
        IndexFormat::U16 => wgpu::IndexFormat::Uint16,
        IndexFormat::U32 => wgpu::IndexFormat::Uint32,
    }
}

fn vertex_attributes(layout: &VertexLayout) -> Vec<wgpu::VertexAttribute> {
    layout
        .attributes()
        .iter()
        .map(|attr| wgpu::VertexAttribute {
            format: vertex_format(attr.component, attr.components),
            offset: u64::from(attr.offset),
            shader_location: attr.slot,
        })
        .collect()
}

/// Maps a validated (type, count) pair to a wgpu format. Counts are 1..=4.
fn vertex_format(component: ComponentType, components: u8) -> wgpu::VertexFormat {
    use wgpu::VertexFormat as F;
    match (component, components) {
        (ComponentType::Float32, 1) => F::Float32,
        (ComponentType::Float32, 2) => F::Float32x2,
        (ComponentType::Float32, 3) => F::Float32x3,
        (ComponentType::Float32, _) => F::Float32x4,
        (ComponentType::Uint32, 1) => F::Uint32,
        (ComponentType::Uint32, 2) => F::Uint32x2,
        (ComponentType::Uint32, 3) => F::Uint32x3,
        (ComponentType::Uint32, _) => F::Uint32x4,
        (ComponentType::Sint32, 1) => F::Sint32,
        (ComponentType::Sint32, 2) => F::Sint32x2,
        (ComponentType::Sint32, 3) => F::Sint32x3,
        (ComponentType::Sint32, _) => F::Sint32x4,
    }
}
