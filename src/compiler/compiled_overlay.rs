use std::path::Path;

use crate::dsl::node::Node;
use crate::dsl::parser::DslFormat;
use crate::dsl::schema::DomainSpec;
use crate::dsl::validation::ValidationReport;
use crate::error::OverlayError;
use crate::graph::{DomainGraph, GraphSummary};

/// One overlay input with its display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlaySource {
    pub name: String,
    pub content: String,
    pub format: DslFormat,
}

impl OverlaySource {
    pub fn new(name: impl Into<String>, content: impl Into<String>, format: DslFormat) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            format,
        }
    }

    /// Read a file; the format follows its extension.
    pub fn from_path(path: &Path) -> Result<Self, OverlayError> {
        let format = DslFormat::from_path(path)?;
        let content = std::fs::read_to_string(path).map_err(|e| OverlayError::io(path, e))?;
        Ok(Self::new(path.display().to_string(), content, format))
    }
}

/// Fully resolved and checked overlay.
#[derive(Debug, Clone)]
pub struct ResolvedOverlay {
    /// Hash of the source texts, in load order.
    pub content_hash: u64,
    /// Merged tree after anchor resolution.
    pub tree: Node,
    pub graph: DomainGraph,
    /// Non-fatal diagnostics collected along the way.
    pub report: ValidationReport,
}

impl ResolvedOverlay {
    pub fn domain(&self, name: &str) -> Result<&DomainSpec, OverlayError> {
        self.graph.domain(name)
    }

    pub fn summary(&self) -> GraphSummary {
        self.graph.summary()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_results_are_thread_safe() {
        assert_send_sync::<ResolvedOverlay>();
        assert_send_sync::<OverlaySource>();
        assert_send_sync::<OverlayError>();
    }

    #[test]
    fn test_source_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.json");
        std::fs::write(&path, r#"{"domains": {}}"#).unwrap();
        let source = OverlaySource::from_path(&path).unwrap();
        assert_eq!(source.format, DslFormat::Json);
        assert!(source.name.ends_with("board.json"));

        let missing = OverlaySource::from_path(&dir.path().join("absent.yaml"));
        assert!(matches!(missing, Err(OverlayError::Io { .. })));
        let unsupported = OverlaySource::from_path(&dir.path().join("board.ini"));
        assert!(matches!(unsupported, Err(OverlayError::UnsupportedFormat(_))));
    }
}
