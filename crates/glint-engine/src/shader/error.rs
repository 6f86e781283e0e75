use thiserror::Error;

use crate::device::{DeviceError, UniformLocation};

use super::StageKind;

/// Failure to turn a [`ShaderSource`](super::ShaderSource) into a compiled stage.
#[derive(Debug, Clone, Error)]
pub enum CompileError {
    #[error("{kind} shader source is empty")]
    EmptySource { kind: StageKind },

    #[error("{kind} shader failed to parse:\n{diagnostic}")]
    Syntax { kind: StageKind, diagnostic: String },

    #[error("{kind} shader failed validation:\n{diagnostic}")]
    Validation { kind: StageKind, diagnostic: String },

    #[error("{kind} shader has no {kind} entry point named `{entry_point}`")]
    MissingEntryPoint { kind: StageKind, entry_point: String },

    #[error("{kind} shader rejected by the device")]
    Device {
        kind: StageKind,
        #[source]
        source: DeviceError,
    },
}

impl CompileError {
    pub fn kind(&self) -> StageKind {
        match self {
            CompileError::EmptySource { kind }
            | CompileError::Syntax { kind, .. }
            | CompileError::Validation { kind, .. }
            | CompileError::MissingEntryPoint { kind, .. }
            | CompileError::Device { kind, .. } => *kind,
        }
    }

    /// Front-end diagnostic text, when the failure came with one.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            CompileError::Syntax { diagnostic, .. } | CompileError::Validation { diagnostic, .. } => {
                Some(diagnostic)
            }
            _ => None,
        }
    }
}

/// Failure to link a vertex and a fragment stage into a program.
#[derive(Debug, Clone, Error)]
pub enum LinkError {
    #[error("expected (vertex, fragment) stages, got ({first}, {second})")]
    StageOrder { first: StageKind, second: StageKind },

    #[error("fragment input at location {location} is not written by the vertex stage")]
    UnmatchedVarying { location: u32 },

    #[error("uniform `{name}` conflicts with `{other}` at group {} binding {}", location.group, location.binding)]
    UniformConflict {
        name: String,
        other: String,
        location: UniformLocation,
    },

    #[error("program rejected by the device")]
    Device(#[source] DeviceError),
}
