use crate::core::Drawable;
use crate::device::Backend;
use crate::logging::{DiagnosticSink, LogSink};
use crate::time::{FrameClock, FrameTick};
use crate::transform::{TransformPipeline, Viewport};

use super::FrameRenderer;

/// Lifecycle of a [`RenderLoop`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LoopState {
    Running,
    /// Close observed; resources are being released.
    Closing,
    /// Terminal.
    Stopped,
}

/// "The surface should close" flag, polled once per iteration.
pub trait CloseSignal {
    fn should_close(&mut self) -> bool;
}

impl<F> CloseSignal for F
where
    F: FnMut() -> bool,
{
    fn should_close(&mut self) -> bool {
        self()
    }
}

/// Monotonic tick, sampled once per iteration.
pub trait TickSource {
    fn next_tick(&mut self) -> FrameTick;
}

impl TickSource for FrameClock {
    fn next_tick(&mut self) -> FrameTick {
        self.tick().tick
    }
}

impl<F> TickSource for F
where
    F: FnMut() -> FrameTick,
{
    fn next_tick(&mut self) -> FrameTick {
        self()
    }
}

/// Drives one drawable: tick → transforms → frame → present, until closed.
///
/// Single-threaded. `step` runs one iteration for push-style hosts (a winit
/// redraw); `run` iterates until the loop stops.
pub struct RenderLoop<B: Backend, S: DiagnosticSink = LogSink> {
    drawable: Option<Drawable<B>>,
    transforms: TransformPipeline,
    renderer: FrameRenderer,
    sink: S,
    state: LoopState,
    frame_index: u64,
    frames_presented: u64,
    frames_skipped: u64,
}

impl<B: Backend> RenderLoop<B> {
    pub fn new(drawable: Drawable<B>, transforms: TransformPipeline, renderer: FrameRenderer) -> Self {
        Self {
            drawable: Some(drawable),
            transforms,
            renderer,
            sink: LogSink,
            state: LoopState::Running,
            frame_index: 0,
            frames_presented: 0,
            frames_skipped: 0,
        }
    }
}

impl<B: Backend, S: DiagnosticSink> RenderLoop<B, S> {
    /// Replaces the diagnostic sink.
    pub fn with_sink<T: DiagnosticSink>(self, sink: T) -> RenderLoop<B, T> {
        RenderLoop {
            drawable: self.drawable,
            transforms: self.transforms,
            renderer: self.renderer,
            sink,
            state: self.state,
            frame_index: self.frame_index,
            frames_presented: self.frames_presented,
            frames_skipped: self.frames_skipped,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    pub fn frames_skipped(&self) -> u64 {
        self.frames_skipped
    }

    pub fn transforms(&self) -> &TransformPipeline {
        &self.transforms
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Forwards a drawable-size change to the transform pipeline.
    pub fn notify_resize(&mut self, viewport: Viewport) -> bool {
        self.transforms.notify_resize(viewport)
    }

    /// Runs one iteration and returns the resulting state.
    pub fn step(
        &mut self,
        backend: &mut B,
        close: &mut impl CloseSignal,
        ticks: &mut impl TickSource,
    ) -> LoopState {
        if self.state == LoopState::Running {
            if close.should_close() {
                log::info!("close requested");
                self.state = LoopState::Closing;
            } else {
                self.render_once(backend, ticks);
            }
        }

        if self.state == LoopState::Closing {
            self.teardown(backend);
        }

        self.state
    }

    /// Iterates until the loop stops.
    pub fn run(&mut self, backend: &mut B, mut close: impl CloseSignal, mut ticks: impl TickSource) {
        while self.step(backend, &mut close, &mut ticks) != LoopState::Stopped {}
    }

    fn render_once(&mut self, backend: &mut B, ticks: &mut impl TickSource) {
        let Some(drawable) = self.drawable.as_mut() else {
            self.state = LoopState::Closing;
            return;
        };

        let frame_index = self.frame_index;
        self.frame_index += 1;

        let transforms = self.transforms.update(ticks.next_tick());
        let result = self
            .renderer
            .render_frame(backend, &mut drawable.program, &drawable.geometry, &transforms)
            .and_then(|()| backend.present());

        match result {
            Ok(()) => self.frames_presented += 1,
            Err(err) => {
                backend.abandon_frame();
                self.frames_skipped += 1;
                self.sink.frame_failed(frame_index, &err);
                if err.is_fatal() {
                    self.state = LoopState::Closing;
                }
            }
        }
    }

    fn teardown(&mut self, backend: &mut B) {
        if let Some(drawable) = self.drawable.take() {
            drawable.release(backend);
        }
        self.state = LoopState::Stopped;
        log::info!(
            "render loop stopped: {} frames presented, {} skipped",
            self.frames_presented,
            self.frames_skipped
        );
    }
}
