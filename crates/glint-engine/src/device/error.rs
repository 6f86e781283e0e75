use std::fmt;

use thiserror::Error;

/// Device operation that can fail.
///
/// Carried by [`DeviceError`] so diagnostics and tests can tell which step of a
/// frame (or of resource creation) was rejected.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum DeviceOp {
    CreateStage,
    CreateProgram,
    CreateGeometry,
    PrepareDraw,
    Clear,
    UseProgram,
    SetUniform,
    BindGeometry,
    Draw,
    Present,
}

impl fmt::Display for DeviceOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceOp::CreateStage => "create stage",
            DeviceOp::CreateProgram => "create program",
            DeviceOp::CreateGeometry => "create geometry",
            DeviceOp::PrepareDraw => "prepare draw state",
            DeviceOp::Clear => "clear",
            DeviceOp::UseProgram => "use program",
            DeviceOp::SetUniform => "set uniform",
            DeviceOp::BindGeometry => "bind geometry",
            DeviceOp::Draw => "draw",
            DeviceOp::Present => "present",
        };
        f.write_str(name)
    }
}

/// Failure of a single device call.
///
/// Per-frame failures are non-fatal unless flagged otherwise: the render loop
/// abandons the frame and keeps going. Fatal failures (e.g. the surface ran out
/// of memory) close the loop gracefully.
#[derive(Debug, Clone, Error)]
#[error("{op} failed: {reason}")]
pub struct DeviceError {
    op: DeviceOp,
    reason: String,
    fatal: bool,
}

impl DeviceError {
    pub fn new(op: DeviceOp, reason: impl Into<String>) -> Self {
        Self {
            op,
            reason: reason.into(),
            fatal: false,
        }
    }

    pub fn fatal(op: DeviceOp, reason: impl Into<String>) -> Self {
        Self {
            op,
            reason: reason.into(),
            fatal: true,
        }
    }

    pub fn op(&self) -> DeviceOp {
        self.op
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn is_fatal(&self) -> bool {
        self.fatal
    }
}

/// High-level response after a surface error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; rendering may resume next frame.
    Reconfigured,
    /// Transient error; skip the current frame.
    SkipFrame,
    /// Fatal error (commonly OOM); terminate gracefully.
    Fatal,
}
