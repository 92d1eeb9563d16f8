use std::hash::{Hash, Hasher};
use std::path::Path;

use crate::config::ResolverConfig;
use crate::dsl::node::Node;
use crate::dsl::parser::{parse_overlay, DslFormat};
use crate::dsl::resolver::{merge_documents, resolve_document};
use crate::dsl::validation::{validate_overlay, Diagnostic, DiagnosticKind, ValidationReport};
use crate::error::OverlayError;
use crate::graph::{build_graph, validate_graph, DomainGraph};

use super::compiled_overlay::{OverlaySource, ResolvedOverlay};

/// Runs parse → resolve → merge → validate → graph → resource checks.
///
/// Each stage collects every diagnostic it can; the pipeline stops after the
/// first stage that produced an error. Schema errors inside a domain only
/// take that domain out of the graph checks.
#[derive(Debug, Clone, Default)]
pub struct OverlayCompiler {
    config: ResolverConfig,
}

struct Outcome {
    diagnostics: Vec<Diagnostic>,
    resolved: Option<(Node, DomainGraph)>,
}

impl OverlayCompiler {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Compile from overlay text content.
    pub fn compile(&self, content: &str, format: DslFormat) -> Result<ResolvedOverlay, OverlayError> {
        self.compile_sources(&[OverlaySource::new("<input>", content, format)])
    }

    /// Compile several overlays, merged in the given order.
    pub fn compile_sources(&self, sources: &[OverlaySource]) -> Result<ResolvedOverlay, OverlayError> {
        let content_hash = Self::hash_sources(sources);
        let outcome = self.run(sources);
        let report = self.finish(outcome.diagnostics);
        match outcome.resolved {
            Some((tree, graph)) if report.is_valid => {
                tracing::info!(
                    domains = graph.summary().domains,
                    relations = graph.summary().relations,
                    warnings = report.warnings().len(),
                    "overlay resolved"
                );
                Ok(ResolvedOverlay {
                    content_hash,
                    tree,
                    graph,
                    report,
                })
            }
            _ => Err(OverlayError::ValidationFailed(Box::new(report))),
        }
    }

    /// Read and compile files, merged in the given order.
    pub fn compile_files<P: AsRef<Path>>(&self, paths: &[P]) -> Result<ResolvedOverlay, OverlayError> {
        let sources = Self::load(paths)?;
        self.compile_sources(&sources)
    }

    /// Run every stage and return the diagnostics without failing.
    pub fn check(&self, sources: &[OverlaySource]) -> ValidationReport {
        self.finish(self.run(sources).diagnostics)
    }

    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<OverlaySource>, OverlayError> {
        paths.iter().map(|p| OverlaySource::from_path(p.as_ref())).collect()
    }

    fn run(&self, sources: &[OverlaySource]) -> Outcome {
        let mut diagnostics = Vec::new();
        let failed = |diags: &[Diagnostic]| diags.iter().any(Diagnostic::is_error);

        // 1. parse + resolve, per document
        let mut documents = Vec::new();
        for source in sources {
            match parse_overlay(&source.content, source.format) {
                Ok(docs) => {
                    for doc in &docs {
                        let resolved = resolve_document(doc);
                        diagnostics.extend(resolved.diagnostics);
                        documents.push(resolved.root);
                    }
                }
                Err(err) => diagnostics.push(parse_diagnostic(&source.name, err)),
            }
        }
        tracing::debug!(sources = sources.len(), documents = documents.len(), "parsed and resolved");
        if failed(&diagnostics) {
            return Outcome { diagnostics, resolved: None };
        }

        // 2. merge
        let (tree, merge_diags) = merge_documents(documents);
        diagnostics.extend(merge_diags);

        // 3. schema
        let (schema, schema_diags) = validate_overlay(&tree, &self.config);
        let document_failed = schema_diags.iter().any(|d| d.is_error() && d.domain.is_none());
        diagnostics.extend(schema_diags);
        tracing::debug!(
            domains = schema.domains.len(),
            rejected = schema.domains.values().filter(|d| d.rejected).count(),
            "schema checked"
        );
        if document_failed {
            return Outcome { diagnostics, resolved: None };
        }

        // 4. graph + resources
        let (graph, graph_diags) = build_graph(schema);
        diagnostics.extend(graph_diags);
        diagnostics.extend(validate_graph(&graph, &self.config));
        tracing::debug!(edges = graph.summary().edges, "resources checked");
        if failed(&diagnostics) {
            return Outcome { diagnostics, resolved: None };
        }

        Outcome {
            diagnostics,
            resolved: Some((tree, graph)),
        }
    }

    fn finish(&self, diagnostics: Vec<Diagnostic>) -> ValidationReport {
        let report = ValidationReport::from_diagnostics(diagnostics);
        if self.config.warnings_as_errors {
            report.promote_warnings()
        } else {
            report
        }
    }

    fn hash_sources(sources: &[OverlaySource]) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        for source in sources {
            source.content.hash(&mut hasher);
        }
        hasher.finish()
    }
}

fn parse_diagnostic(source: &str, err: OverlayError) -> Diagnostic {
    match err {
        OverlayError::UndefinedAnchor(name) => Diagnostic::new(
            DiagnosticKind::UndefinedAnchorError,
            format!("{}: alias *{} is used before any anchor &{} is defined", source, name, name),
        ),
        other => Diagnostic::new(DiagnosticKind::ParseError, format!("{}: {}", source, other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAIR: &str = r#"
domains:
  a53:
    cpus:
      - {cluster: cpus_a53, cpumask: 0x1, mode: {secure: true, el: 3}}
    access:
      - {dev: ipi@ff340000, flags: 0}
    reserved-memory:
      vring0: {start: 0x3ed40000, size: 0x2000, no-map: 1}
    domain-to-domain:
      rpmsg-relation:
        remote: r5_0
        carveouts: [vring0]
        mbox: ipi@ff340000
  r5_0:
    cpus:
      - {cluster: cpus_r5, cpumask: 0x1, mode: {split: true}}
    domain-to-domain:
      rpmsg-relation:
        host: a53
"#;

    #[test]
    fn test_compile_pair() {
        let compiled = OverlayCompiler::default().compile(PAIR, DslFormat::Yaml).unwrap();
        assert!(compiled.report.is_valid);
        assert_eq!(compiled.summary().rpmsg_relations, 2);
        assert_eq!(compiled.graph.remotes_of("a53").unwrap(), vec!["r5_0"]);
        assert!(compiled.tree.is_resolved());
        assert!(compiled.domain("r5_0").is_ok());
    }

    #[test]
    fn test_content_hash_is_stable() {
        let compiler = OverlayCompiler::default();
        let a = compiler.compile(PAIR, DslFormat::Yaml).unwrap();
        let b = compiler.compile(PAIR, DslFormat::Yaml).unwrap();
        assert_eq!(a.content_hash, b.content_hash);
    }

    #[test]
    fn test_parse_error_is_reported() {
        let err = OverlayCompiler::default()
            .compile("domains: [unclosed", DslFormat::Yaml)
            .unwrap_err();
        let report = err.report().unwrap();
        assert!(report.has_kind(DiagnosticKind::ParseError));
        assert!(report.errors()[0].message.starts_with("<input>:"));
    }

    #[test]
    fn test_undefined_anchor_is_reported() {
        let err = OverlayCompiler::default()
            .compile("domains:\n  a: *missing\n", DslFormat::Yaml)
            .unwrap_err();
        assert!(err.report().unwrap().has_kind(DiagnosticKind::UndefinedAnchorError));
    }

    #[test]
    fn test_rejected_domain_skips_graph_checks() {
        let yaml = "domains:\n  a:\n    cpus: []\n    domain-to-domain:\n      rpmsg-relation: {remote: ghost}\n";
        let report = OverlayCompiler::default().check(&[OverlaySource::new("x", yaml, DslFormat::Yaml)]);
        assert!(!report.is_valid);
        assert!(report.has_kind(DiagnosticKind::SchemaViolationError));
        assert!(!report.has_kind(DiagnosticKind::UnknownDomainReferenceError));
    }

    #[test]
    fn test_unrelated_domains_keep_validating() {
        let yaml = r#"
domains:
  broken:
    cpus: []
  a53:
    cpus:
      - {cluster: cpus_a53, cpumask: 0xf}
    domain-to-domain:
      rpmsg-relation: {remote: ghost, mbox: ipi0}
"#;
        let err = OverlayCompiler::default().compile(yaml, DslFormat::Yaml).unwrap_err();
        let report = err.report().unwrap();
        let kinds: Vec<_> = report.errors().iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![
                DiagnosticKind::SchemaViolationError,
                DiagnosticKind::UngrantedMailboxError,
                DiagnosticKind::UnknownDomainReferenceError,
            ]
        );
        assert_eq!(report.errors()[0].domain.as_deref(), Some("broken"));
        assert!(report.errors()[1..].iter().all(|d| d.domain.as_deref() == Some("a53")));
    }

    #[test]
    fn test_block_scalar_text_does_not_rename_anchors() {
        let yaml = r#"
definitions:
  notes: |
    ring &buffers are shared
  vring0: &vring0
    - {start: 0x3ed40000, size: 0x2000, no-map: 1}
domains:
  a53:
    access:
      - {dev: ipi0, flags: 0}
    reserved-memory:
      <<+: [ *vring0 ]
    domain-to-domain:
      rpmsg-relation: {remote: r5, carveouts: [vring0], mbox: ipi0}
  r5:
    domain-to-domain:
      rpmsg-relation: {host: a53}
"#;
        let compiled = OverlayCompiler::default().compile(yaml, DslFormat::Yaml).unwrap();
        assert!(compiled.report.diagnostics.is_empty(), "{:?}", compiled.report.diagnostics);
        assert!(compiled.domain("a53").unwrap().carveout("vring0").is_some());
    }

    #[test]
    fn test_host_relation_rejects_remote_only_carveout() {
        let yaml = r#"
domains:
  a53:
    access:
      - {dev: ipi0, flags: 0}
    domain-to-domain:
      rpmsg-relation: {remote: r5, carveouts: [vring0], mbox: ipi0}
  r5:
    reserved-memory:
      vring0: {start: 0x3ed40000, size: 0x2000}
    domain-to-domain:
      rpmsg-relation: {host: a53, carveouts: [vring0]}
"#;
        let err = OverlayCompiler::default().compile(yaml, DslFormat::Yaml).unwrap_err();
        let errors = err.report().unwrap().errors().into_iter().cloned().collect::<Vec<_>>();
        assert_eq!(errors.len(), 1, "{:?}", errors);
        assert_eq!(errors[0].kind, DiagnosticKind::UnknownCarveoutReferenceError);
        assert_eq!(errors[0].domain.as_deref(), Some("a53"));
    }

    #[test]
    fn test_document_level_schema_error_stops() {
        let yaml = "definitions: {}\n";
        let report = OverlayCompiler::default().check(&[OverlaySource::new("x", yaml, DslFormat::Yaml)]);
        assert_eq!(report.errors().len(), 1);
        assert!(report.errors()[0].message.contains("missing `domains`"));
    }

    #[test]
    fn test_warnings_as_errors() {
        let yaml = "domains:\n  a:\n    access:\n      - {dev: x, flags: 0}\n      - {dev: x, flags: 1}\n";
        let lenient = OverlayCompiler::default().compile(yaml, DslFormat::Yaml).unwrap();
        assert_eq!(lenient.report.warnings().len(), 1);

        let strict = OverlayCompiler::new(ResolverConfig {
            warnings_as_errors: true,
            ..ResolverConfig::default()
        });
        assert!(strict.compile(yaml, DslFormat::Yaml).is_err());
    }

    #[test]
    fn test_sources_merge_in_order() {
        let base = OverlaySource::new("base.yaml", "domains:\n  a:\n    id: 1\n", DslFormat::Yaml);
        let extra = OverlaySource::new(
            "extra.json",
            r#"{"domains": {"a": {"id": 2}, "b": {"id": 3}}}"#,
            DslFormat::Json,
        );
        let compiled = OverlayCompiler::default().compile_sources(&[base, extra]).unwrap();
        assert_eq!(compiled.domain("a").unwrap().id, Some(2));
        assert_eq!(compiled.summary().domains, 2);
        assert!(compiled.report.has_kind(DiagnosticKind::MergeConflictWarning));
    }
}
