//! Resolver configuration.
//!
//! Every field has a default, so an empty file (or no file at all) yields
//! [`ResolverConfig::default`]. Unknown fields are rejected.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::OverlayError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverConfig {
    /// Treat unrecognized keys as schema violations instead of passing them through.
    pub strict_unknown_keys: bool,
    /// Fail on warnings as if they were errors.
    pub warnings_as_errors: bool,
    /// Report rpmsg relations whose peer does not declare the reverse relation.
    pub check_relation_pairing: bool,
    pub emit: EmitConfig,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            strict_unknown_keys: false,
            warnings_as_errors: false,
            check_relation_pairing: true,
            emit: EmitConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmitConfig {
    pub pretty: bool,
    /// Attach non-fatal diagnostics to the emitted document.
    pub include_diagnostics: bool,
    /// Emit unrecognized entries alongside the typed sections.
    pub include_passthrough: bool,
}

impl Default for EmitConfig {
    fn default() -> Self {
        Self {
            pretty: true,
            include_diagnostics: false,
            include_passthrough: true,
        }
    }
}

impl ResolverConfig {
    /// Load from a `.toml`, `.yaml`/`.yml` or `.json` file.
    pub fn from_path(path: &Path) -> Result<Self, OverlayError> {
        let content = std::fs::read_to_string(path).map_err(|e| OverlayError::io(path, e))?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        Self::from_str_with_format(&content, ext)
    }

    /// Parse configuration text; `format` is a file extension.
    pub fn from_str_with_format(content: &str, format: &str) -> Result<Self, OverlayError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        match format {
            "toml" => toml::from_str(content).map_err(|e| OverlayError::ConfigError(e.to_string())),
            "yaml" | "yml" => {
                serde_saphyr::from_str(content).map_err(|e| OverlayError::ConfigError(e.to_string()))
            }
            "json" => {
                serde_json::from_str(content).map_err(|e| OverlayError::ConfigError(e.to_string()))
            }
            other => Err(OverlayError::UnsupportedFormat(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ResolverConfig::default();
        assert!(!config.strict_unknown_keys);
        assert!(config.check_relation_pairing);
        assert!(config.emit.pretty);
        assert_eq!(ResolverConfig::from_str_with_format("", "toml").unwrap(), config);
    }

    #[test]
    fn test_toml_partial() {
        let config = ResolverConfig::from_str_with_format(
            "warnings_as_errors = true\n[emit]\npretty = false\n",
            "toml",
        )
        .unwrap();
        assert!(config.warnings_as_errors);
        assert!(!config.emit.pretty);
        assert!(config.emit.include_passthrough);
    }

    #[test]
    fn test_yaml_and_json() {
        let yaml = ResolverConfig::from_str_with_format("strict_unknown_keys: true\n", "yaml").unwrap();
        assert!(yaml.strict_unknown_keys);
        let json =
            ResolverConfig::from_str_with_format(r#"{"check_relation_pairing": false}"#, "json").unwrap();
        assert!(!json.check_relation_pairing);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = ResolverConfig::from_str_with_format("colour = \"red\"\n", "toml").unwrap_err();
        assert!(matches!(err, OverlayError::ConfigError(_)));
        assert!(matches!(
            ResolverConfig::from_str_with_format("x", "ini"),
            Err(OverlayError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "strict_unknown_keys = true").unwrap();
        let config = ResolverConfig::from_path(file.path()).unwrap();
        assert!(config.strict_unknown_keys);
    }
}
