//! Shader stages and programs.
//!
//! - `StageCompiler` turns WGSL text into a device stage (naga parse + validate + reflect)
//! - `link` pairs a vertex and a fragment stage into a `LinkedProgram`
//!
//! Stages are owned values: linking consumes them and releases their device
//! resources on every path.

mod compiler;
mod error;
mod linker;
mod reflect;
mod source;

pub use compiler::{CompiledStage, StageCompiler};
pub use error::{CompileError, LinkError};
pub use linker::{link, LinkedProgram};
pub use reflect::StageInterface;
pub use source::{ShaderSource, StageKind};
