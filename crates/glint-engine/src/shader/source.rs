use std::fmt;

/// Programmable pipeline stage a source targets.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum StageKind {
    Vertex,
    Fragment,
}

impl StageKind {
    pub(crate) fn to_naga(self) -> naga::ShaderStage {
        match self {
            StageKind::Vertex => naga::ShaderStage::Vertex,
            StageKind::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Vertex => f.write_str("vertex"),
            StageKind::Fragment => f.write_str("fragment"),
        }
    }
}

/// WGSL text for a single stage.
///
/// Taken by value by [`StageCompiler::compile`](super::StageCompiler::compile),
/// so a source is compiled exactly once.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ShaderSource {
    kind: StageKind,
    text: String,
    entry_point: String,
    label: Option<String>,
}

impl ShaderSource {
    pub const DEFAULT_ENTRY_POINT: &'static str = "main";

    pub fn new(kind: StageKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            entry_point: Self::DEFAULT_ENTRY_POINT.to_owned(),
            label: None,
        }
    }

    pub fn vertex(text: impl Into<String>) -> Self {
        Self::new(StageKind::Vertex, text)
    }

    pub fn fragment(text: impl Into<String>) -> Self {
        Self::new(StageKind::Fragment, text)
    }

    pub fn with_entry_point(mut self, name: impl Into<String>) -> Self {
        self.entry_point = name.into();
        self
    }

    /// Debug label forwarded to the device (e.g. the file the text came from).
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn kind(&self) -> StageKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_point_defaults_to_main() {
        let src = ShaderSource::vertex("@vertex fn main() {}");
        assert_eq!(src.kind(), StageKind::Vertex);
        assert_eq!(src.entry_point(), "main");
        assert_eq!(src.label(), None);

        let src = src.with_entry_point("vs_main").with_label("mesh.vert.wgsl");
        assert_eq!(src.entry_point(), "vs_main");
        assert_eq!(src.label(), Some("mesh.vert.wgsl"));
    }

    #[test]
    fn stage_kind_display() {
        assert_eq!(StageKind::Vertex.to_string(), "vertex");
        assert_eq!(StageKind::Fragment.to_string(), "fragment");
    }
}
