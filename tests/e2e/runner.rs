use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

use domain_overlay::{emit, OverlayCompiler, OverlayError, OverlaySource, ResolverConfig};

#[derive(Debug, Deserialize)]
struct ExpectedOutput {
    valid: bool,
    /// Overlay files, merged in order
    #[serde(default = "default_inputs")]
    inputs: Vec<String>,
    /// Error-level diagnostic kinds, in report order
    #[serde(default)]
    errors: Vec<String>,
    #[serde(default)]
    warnings: Vec<String>,
    /// Info-level kinds; not checked when absent
    #[serde(default)]
    infos: Option<Vec<String>>,
    /// Substrings that must appear in some diagnostic message
    #[serde(default)]
    message_contains: Vec<String>,
    #[serde(default)]
    summary: Option<Value>,
    /// Subset of the emitted JSON
    #[serde(default)]
    output: Option<Value>,
}

fn default_inputs() -> Vec<String> {
    vec!["overlay.yaml".to_string()]
}

pub fn run_case(case_dir: &Path) {
    let expected: ExpectedOutput = read_json(&case_dir.join("expected.json"));

    let config_path = case_dir.join("config.toml");
    let config = if config_path.exists() {
        ResolverConfig::from_path(&config_path)
            .unwrap_or_else(|e| panic!("Failed to load {}: {}", config_path.display(), e))
    } else {
        ResolverConfig::default()
    };

    let sources: Vec<OverlaySource> = expected
        .inputs
        .iter()
        .map(|name| {
            OverlaySource::from_path(&case_dir.join(name))
                .unwrap_or_else(|e| panic!("Failed to load {}: {}", name, e))
        })
        .collect();

    let compiler = OverlayCompiler::new(config);
    let (report, emitted) = match compiler.compile_sources(&sources) {
        Ok(resolved) => {
            let json = emit(&resolved, &compiler.config().emit)
                .unwrap_or_else(|e| panic!("Failed to emit: {}", e));
            let value: Value = serde_json::from_str(&json).expect("emitted JSON must parse");
            (resolved.report, Some(value))
        }
        Err(OverlayError::ValidationFailed(report)) => (*report, None),
        Err(other) => panic!("Unexpected error for case {}: {}", case_dir.display(), other),
    };

    let kinds = |diags: Vec<&domain_overlay::Diagnostic>| -> Vec<String> {
        diags.iter().map(|d| d.kind.to_string()).collect()
    };

    assert_eq!(
        report.is_valid,
        expected.valid,
        "Validity mismatch for case {}: {:#?}",
        case_dir.display(),
        report.diagnostics
    );
    assert_eq!(kinds(report.errors()), expected.errors, "Errors mismatch for case: {}", case_dir.display());
    assert_eq!(
        kinds(report.warnings()),
        expected.warnings,
        "Warnings mismatch for case: {}",
        case_dir.display()
    );
    if let Some(infos) = expected.infos {
        assert_eq!(kinds(report.infos()), infos, "Infos mismatch for case: {}", case_dir.display());
    }
    for substr in &expected.message_contains {
        assert!(
            report.diagnostics.iter().any(|d| d.message.contains(substr.as_str())),
            "No diagnostic contained '{}': {:#?}",
            substr,
            report.diagnostics
        );
    }

    if expected.summary.is_some() || expected.output.is_some() {
        let emitted = emitted.unwrap_or_else(|| panic!("Case {} produced no output", case_dir.display()));
        if let Some(summary) = &expected.summary {
            assert_subset(summary, &emitted["summary"], "summary");
        }
        if let Some(output) = &expected.output {
            assert_subset(output, &emitted, "");
        }
    }
}

/// Objects match key by key; arrays must have the same length.
fn assert_subset(expected: &Value, actual: &Value, path: &str) {
    match (expected, actual) {
        (Value::Object(exp), Value::Object(act)) => {
            for (key, value) in exp {
                let child = format!("{}/{}", path, key);
                let found = act.get(key).unwrap_or_else(|| panic!("Missing key {} in {}", child, actual));
                assert_subset(value, found, &child);
            }
        }
        (Value::Array(exp), Value::Array(act)) => {
            assert_eq!(exp.len(), act.len(), "Length mismatch at {}: {}", path, actual);
            for (index, (e, a)) in exp.iter().zip(act).enumerate() {
                assert_subset(e, a, &format!("{}[{}]", path, index));
            }
        }
        _ => assert_eq!(expected, actual, "Value mismatch at {}", path),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> T {
    let content = fs::read_to_string(path).unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e));
    serde_json::from_str(&content).unwrap_or_else(|e| panic!("Failed to parse {}: {}", path.display(), e))
}
