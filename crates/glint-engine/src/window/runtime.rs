use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use crate::core::App;
use crate::device::{Backend, GpuInit, PolygonMode, WgpuBackend};
use crate::render::{LoopState, RenderLoop};
use crate::time::FrameClock;
use crate::transform::Viewport;

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    /// Escape requests close.
    pub escape_closes: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "glint".to_string(),
            initial_size: LogicalSize::new(800.0, 600.0),
            escape_closes: true,
        }
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens the window, runs `app.setup` against its surface and drives the
    /// render loop until it stops.
    ///
    /// A setup failure stops the event loop before the first frame and is returned.
    pub fn run<A>(config: RuntimeConfig, gpu_init: GpuInit, app: A) -> Result<()>
    where
        A: App + 'static,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = RuntimeState::new(config, gpu_init, app);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.fatal.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Everything that borrows the window surface.
///
/// Fields drop in declaration order: the loop (and the drawable it still
/// holds) goes before the backend and its device.
struct Session<B: Backend> {
    render_loop: RenderLoop<B>,
    backend: B,
    clock: FrameClock,
    close_requested: bool,
}

impl<'w> Session<WgpuBackend<'w>> {
    fn start<A: App>(window: &'w Window, gpu_init: GpuInit, app: &mut A) -> Result<Self> {
        let mut backend = WgpuBackend::new(window, gpu_init)?;
        let render_loop = app.setup(&mut backend).context("setup failed")?;
        Ok(Self::new(backend, render_loop))
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        self.backend.resize(size);
        self.render_loop
            .notify_resize(Viewport::from_size(size.width, size.height));
    }
}

impl<B: Backend> Session<B> {
    fn new(backend: B, render_loop: RenderLoop<B>) -> Self {
        Self {
            render_loop,
            backend,
            clock: FrameClock::new(),
            close_requested: false,
        }
    }

    fn step(&mut self) -> LoopState {
        let Session {
            render_loop,
            backend,
            clock,
            close_requested,
        } = self;
        let close = *close_requested;
        render_loop.step(backend, &mut || close, clock)
    }
}

#[self_referencing]
struct WindowEntry {
    window: Window,

    #[borrows(window)]
    #[not_covariant]
    session: Session<WgpuBackend<'this>>,
}

struct RuntimeState<A>
where
    A: App + 'static,
{
    config: RuntimeConfig,
    gpu_init: GpuInit,
    app: A,

    entry: Option<WindowEntry>,
    started: bool,
    fatal: Option<anyhow::Error>,
}

impl<A> RuntimeState<A>
where
    A: App + 'static,
{
    fn new(config: RuntimeConfig, gpu_init: GpuInit, app: A) -> Self {
        Self {
            config,
            gpu_init,
            app,
            entry: None,
            started: false,
            fatal: None,
        }
    }

    fn create_window_entry(&mut self, event_loop: &ActiveEventLoop) -> Result<WindowEntry> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let gpu_init = self.gpu_init.clone();
        let app = &mut self.app;

        WindowEntry::try_new(window, |window: &Window| Session::start(window, gpu_init, app))
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.fatal = Some(err);
        self.entry = None;
        event_loop.exit();
    }

    fn handle_key(&mut self, event: &KeyEvent) {
        if event.state != ElementState::Pressed || event.repeat {
            return;
        }
        let Some(entry) = self.entry.as_mut() else {
            return;
        };

        let escape_closes = self.config.escape_closes;
        entry.with_session_mut(|session| match event.physical_key {
            PhysicalKey::Code(KeyCode::Escape) if escape_closes => {
                session.close_requested = true;
            }
            PhysicalKey::Code(KeyCode::Digit1) => {
                session.backend.set_polygon_mode(PolygonMode::Line);
            }
            PhysicalKey::Code(KeyCode::Digit2) => {
                session.backend.set_polygon_mode(PolygonMode::Fill);
            }
            _ => {}
        });
    }
}

impl<A> ApplicationHandler for RuntimeState<A>
where
    A: App + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.started {
            return;
        }
        self.started = true;

        match self.create_window_entry(event_loop) {
            Ok(entry) => {
                entry.with_window(|w| w.request_redraw());
                self.entry = Some(entry);
            }
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);

        // Continuous redraw: the loop renders every frame until closed.
        if let Some(entry) = &self.entry {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match &event {
            WindowEvent::CloseRequested => {
                if let Some(entry) = self.entry.as_mut() {
                    entry.with_session_mut(|session| session.close_requested = true);
                    entry.with_window(|w| w.request_redraw());
                }
            }

            WindowEvent::KeyboardInput { event, .. } => self.handle_key(event),

            WindowEvent::Resized(new_size) => {
                if let Some(entry) = self.entry.as_mut() {
                    entry.with_session_mut(|session| session.resize(*new_size));
                    entry.with_window(|w| w.request_redraw());
                }
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(entry) = self.entry.as_mut() {
                    let new_size = entry.with_window(|w| w.inner_size());
                    entry.with_session_mut(|session| session.resize(new_size));
                    entry.with_window(|w| w.request_redraw());
                }
            }

            WindowEvent::RedrawRequested => {
                let Some(entry) = self.entry.as_mut() else {
                    return;
                };

                if entry.with_session_mut(|session| session.step()) == LoopState::Stopped {
                    // Drop the surface before the window goes away.
                    self.entry = None;
                    event_loop.exit();
                }
            }

            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{build_drawable, MeshData};
    use crate::render::FrameRenderer;
    use crate::shader::ShaderSource;
    use crate::testing::{fixtures, RecordingBackend};
    use crate::transform::{TransformParams, TransformPipeline};

    fn quad_session() -> Session<RecordingBackend> {
        let mut backend = RecordingBackend::new();
        let quad = fixtures::unit_quad();
        let drawable = build_drawable(
            &mut backend,
            ShaderSource::vertex(fixtures::MVP_VERTEX),
            ShaderSource::fragment(fixtures::COLOR_FRAGMENT),
            MeshData::from(&quad),
        )
        .expect("drawable");
        let transforms = TransformPipeline::new(TransformParams::default(), 4.0 / 3.0).expect("params");

        Session::new(backend, RenderLoop::new(drawable, transforms, FrameRenderer::default()))
    }

    #[test]
    fn dropping_a_running_session_frees_the_drawable_first() {
        let mut session = quad_session();
        assert_eq!(session.step(), LoopState::Running);

        let live_at_drop = session.backend.live_at_drop();
        drop(session);

        assert_eq!(live_at_drop.get(), Some(0));
    }

    #[test]
    fn close_request_stops_on_the_next_step() {
        let mut session = quad_session();
        session.close_requested = true;

        assert_eq!(session.step(), LoopState::Stopped);
        assert_eq!(session.backend.live_programs(), 0);
        assert_eq!(session.backend.live_geometries(), 0);
    }
}
