//! Static mesh data on the device.
//!
//! A `VertexLayout` describes interleaved attributes; `build` validates raw
//! vertex/index bytes against it and uploads them into a `GeometryHandle`.

mod buffer;
mod error;
mod layout;

pub use buffer::{build, GeometryHandle, Indices};
pub use error::{GeometryError, LayoutMismatchError};
pub use layout::{ComponentType, VertexAttribute, VertexLayout};
