//! Validation diagnostic types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dsl::node::NodePath;

/// Severity level of a validation diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticLevel {
    Error,
    Warning,
    Info,
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DiagnosticLevel::Error => "error",
            DiagnosticLevel::Warning => "warning",
            DiagnosticLevel::Info => "info",
        })
    }
}

/// What went wrong. Error kinds abort the pipeline; the others are reported
/// alongside a successful result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    ParseError,
    UndefinedAnchorError,
    CyclicReferenceError,
    SchemaViolationError,
    UnknownDomainReferenceError,
    UnknownCarveoutReferenceError,
    UngrantedMailboxError,
    ResourceConflictError,
    MergeConflictWarning,
    ElfLoadWarning,
    UnknownKeyInfo,
    UnpairedRelationInfo,
}

impl DiagnosticKind {
    pub fn level(self) -> DiagnosticLevel {
        match self {
            DiagnosticKind::MergeConflictWarning | DiagnosticKind::ElfLoadWarning => {
                DiagnosticLevel::Warning
            }
            DiagnosticKind::UnknownKeyInfo | DiagnosticKind::UnpairedRelationInfo => {
                DiagnosticLevel::Info
            }
            _ => DiagnosticLevel::Error,
        }
    }

    /// Stable short code, grouped by pipeline stage.
    pub fn code(self) -> &'static str {
        match self {
            DiagnosticKind::ParseError => "E001",
            DiagnosticKind::UndefinedAnchorError => "E101",
            DiagnosticKind::CyclicReferenceError => "E102",
            DiagnosticKind::MergeConflictWarning => "W101",
            DiagnosticKind::SchemaViolationError => "E201",
            DiagnosticKind::UnknownKeyInfo => "I201",
            DiagnosticKind::UnknownDomainReferenceError => "E301",
            DiagnosticKind::UnknownCarveoutReferenceError => "E302",
            DiagnosticKind::UngrantedMailboxError => "E303",
            DiagnosticKind::ResourceConflictError => "E304",
            DiagnosticKind::ElfLoadWarning => "W301",
            DiagnosticKind::UnpairedRelationInfo => "I301",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub kind: DiagnosticKind,
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            level: kind.level(),
            kind,
            code: kind.code().to_string(),
            message: message.into(),
            domain: None,
            path: None,
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn at(mut self, path: &NodePath) -> Self {
        if !path.is_root() {
            self.path = Some(path.to_string());
        }
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == DiagnosticLevel::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}] {}: {}", self.level, self.code, self.kind, self.message)?;
        if let Some(path) = &self.path {
            write!(f, " (at {})", path)?;
        }
        Ok(())
    }
}

/// Aggregated result of overlay validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationReport {
    pub fn from_diagnostics(diagnostics: Vec<Diagnostic>) -> Self {
        let is_valid = diagnostics.iter().all(|d| !d.is_error());
        Self {
            is_valid,
            diagnostics,
        }
    }

    /// Raise every warning to an error.
    pub fn promote_warnings(mut self) -> Self {
        for diag in &mut self.diagnostics {
            if diag.level == DiagnosticLevel::Warning {
                diag.level = DiagnosticLevel::Error;
            }
        }
        self.is_valid = self.diagnostics.iter().all(|d| !d.is_error());
        self
    }

    /// Return only the error-level diagnostics.
    pub fn errors(&self) -> Vec<&Diagnostic> {
        self.by_level(DiagnosticLevel::Error)
    }

    /// Return only the warning-level diagnostics.
    pub fn warnings(&self) -> Vec<&Diagnostic> {
        self.by_level(DiagnosticLevel::Warning)
    }

    pub fn infos(&self) -> Vec<&Diagnostic> {
        self.by_level(DiagnosticLevel::Info)
    }

    pub fn has_kind(&self, kind: DiagnosticKind) -> bool {
        self.diagnostics.iter().any(|d| d.kind == kind)
    }

    pub fn count_kind(&self, kind: DiagnosticKind) -> usize {
        self.diagnostics.iter().filter(|d| d.kind == kind).count()
    }

    fn by_level(&self, level: DiagnosticLevel) -> Vec<&Diagnostic> {
        self.diagnostics.iter().filter(|d| d.level == level).collect()
    }
}
