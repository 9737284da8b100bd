//! Configuration loading and parsing for vbscope
//!
//! Provides functionality to load and parse `vbscope.toml` configuration files.

use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::diagnostic::{DiagnosticCode, Severity};

pub const CONFIG_FILENAME: &str = "vbscope.toml";
pub const DEFAULT_MAX_DOCUMENT_LINES: usize = 1500;

const KNOWN_TOP_LEVEL_KEYS: &[&str] = &["analysis", "diagnostics"];
const KNOWN_ANALYSIS_KEYS: &[&str] = &["max_document_lines"];
const KNOWN_DIAGNOSTICS_KEYS: &[&str] = &["disabled", "severity"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid TOML in '{path}': {message}")]
    ParseError { path: PathBuf, message: String },
}

#[derive(Debug, Clone, Default)]
pub struct ConfigResult {
    pub config: Config,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub analysis: AnalysisConfig,
    pub diagnostics: DiagnosticsConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Documents longer than this are not analysed.
    pub max_document_lines: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_document_lines: DEFAULT_MAX_DOCUMENT_LINES,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub disabled: Vec<String>,
    pub severity: HashMap<String, SeverityValue>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum SeverityValue {
    Error,
    Warning,
    #[serde(alias = "info")]
    Information,
    Hint,
}

impl From<SeverityValue> for Severity {
    fn from(value: SeverityValue) -> Self {
        match value {
            SeverityValue::Error => Severity::Error,
            SeverityValue::Warning => Severity::Warning,
            SeverityValue::Information => Severity::Information,
            SeverityValue::Hint => Severity::Hint,
        }
    }
}

impl Config {
    pub fn is_disabled(&self, code: DiagnosticCode) -> bool {
        self.diagnostics.disabled.iter().any(|id| id == code.as_str())
    }

    pub fn severity_override(&self, code: DiagnosticCode) -> Option<Severity> {
        self.diagnostics
            .severity
            .get(code.as_str())
            .copied()
            .map(Severity::from)
    }
}

pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    loop {
        let config_path = current.join(CONFIG_FILENAME);
        if config_path.exists() {
            return Some(config_path);
        }
        if !current.pop() {
            return None;
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    load_config_with_warnings(path).map(|result| result.config)
}

pub fn load_config_with_warnings(path: &Path) -> Result<ConfigResult, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.message().to_string(),
    })?;

    let mut warnings = detect_unknown_keys(&content);
    warnings.extend(detect_unknown_codes(&config));

    Ok(ConfigResult { config, warnings })
}

fn detect_unknown_keys(content: &str) -> Vec<String> {
    let mut warnings = Vec::new();

    let table: toml::Table = match content.parse() {
        Ok(t) => t,
        Err(_) => return warnings,
    };

    let known_top: HashSet<&str> = KNOWN_TOP_LEVEL_KEYS.iter().copied().collect();
    for key in table.keys() {
        if !known_top.contains(key.as_str()) {
            warnings.push(format!("Unknown config option: '{}'", key));
        }
    }

    for (section, known) in [
        ("analysis", KNOWN_ANALYSIS_KEYS),
        ("diagnostics", KNOWN_DIAGNOSTICS_KEYS),
    ] {
        if let Some(toml::Value::Table(values)) = table.get(section) {
            for key in values.keys() {
                if !known.contains(&key.as_str()) {
                    warnings.push(format!("Unknown config option in [{}]: '{}'", section, key));
                }
            }
        }
    }

    warnings
}

fn detect_unknown_codes(config: &Config) -> Vec<String> {
    let mut ids: Vec<&String> = config.diagnostics.disabled.iter().collect();
    ids.extend(config.diagnostics.severity.keys());
    ids.sort();
    ids.dedup();

    ids.into_iter()
        .filter(|id| DiagnosticCode::from_id(id).is_none())
        .map(|id| format!("Unknown diagnostic code: '{}'", id))
        .collect()
}

pub fn load_config_or_default(start_dir: &Path) -> Config {
    find_config_file(start_dir)
        .and_then(|path| load_config(&path).ok())
        .unwrap_or_default()
}

pub fn load_config_or_default_with_warnings(start_dir: &Path) -> ConfigResult {
    match find_config_file(start_dir) {
        Some(path) => load_config_with_warnings(&path).unwrap_or_else(|error| ConfigResult {
            config: Config::default(),
            warnings: vec![error.to_string()],
        }),
        None => ConfigResult::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn create_temp_dir() -> tempfile::TempDir {
        tempfile::tempdir().expect("Failed to create temp dir")
    }

    #[test]
    fn load_config_from_file() {
        let dir = create_temp_dir();
        let config_path = dir.path().join(CONFIG_FILENAME);
        fs::write(
            &config_path,
            r#"
[analysis]
max_document_lines = 4000

[diagnostics]
disabled = ["unused-declaration"]

[diagnostics.severity]
shadowed-declaration = "hint"
"#,
        )
        .unwrap();

        let config = load_config(&config_path).unwrap();

        assert_eq!(config.analysis.max_document_lines, 4000);
        assert_eq!(config.diagnostics.disabled, vec!["unused-declaration"]);
        assert_eq!(
            config.diagnostics.severity.get("shadowed-declaration"),
            Some(&SeverityValue::Hint)
        );
        assert!(config.is_disabled(DiagnosticCode::UnusedDeclaration));
        assert!(!config.is_disabled(DiagnosticCode::AmbiguousName));
        assert_eq!(
            config.severity_override(DiagnosticCode::ShadowedDeclaration),
            Some(Severity::Hint)
        );
        assert_eq!(config.severity_override(DiagnosticCode::AmbiguousName), None);
    }

    #[test]
    fn default_config_when_missing() {
        let dir = create_temp_dir();
        let config = load_config_or_default(dir.path());

        assert_eq!(config, Config::default());
        assert_eq!(config.analysis.max_document_lines, DEFAULT_MAX_DOCUMENT_LINES);
        assert!(config.diagnostics.disabled.is_empty());
        assert!(config.diagnostics.severity.is_empty());
    }

    #[test]
    fn error_on_invalid_toml() {
        let dir = create_temp_dir();
        let config_path = dir.path().join(CONFIG_FILENAME);
        fs::write(&config_path, "this is not valid { toml }").unwrap();

        let result = load_config(&config_path);

        match result {
            Err(ConfigError::ParseError { path, message }) => {
                assert_eq!(path, config_path);
                assert!(!message.is_empty());
            }
            other => panic!("Expected ParseError, got {:?}", other),
        }
    }

    #[test]
    fn error_on_missing_file() {
        let dir = create_temp_dir();

        let result = load_config(&dir.path().join(CONFIG_FILENAME));

        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn find_config_file_in_current_directory() {
        let dir = create_temp_dir();
        let config_path = dir.path().join(CONFIG_FILENAME);
        fs::write(&config_path, "").unwrap();

        let found = find_config_file(dir.path());

        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn find_config_file_in_parent_directory() {
        let parent = create_temp_dir();
        let child = parent.path().join("src");
        fs::create_dir(&child).unwrap();
        let config_path = parent.path().join(CONFIG_FILENAME);
        fs::write(&config_path, "").unwrap();

        let found = find_config_file(&child);

        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn partial_config_uses_defaults() {
        let dir = create_temp_dir();
        let config_path = dir.path().join(CONFIG_FILENAME);
        fs::write(&config_path, "[diagnostics]\ndisabled = [\"ambiguous-name\"]").unwrap();

        let config = load_config(&config_path).unwrap();

        assert_eq!(config.analysis, AnalysisConfig::default());
        assert_eq!(config.diagnostics.disabled, vec!["ambiguous-name"]);
    }

    #[test]
    fn severity_values_parse_correctly() {
        let dir = create_temp_dir();
        let config_path = dir.path().join(CONFIG_FILENAME);
        fs::write(
            &config_path,
            r#"
[diagnostics.severity]
duplicate-declaration = "warning"
shadowed-declaration = "error"
unused-declaration = "info"
ambiguous-name = "hint"
"#,
        )
        .unwrap();

        let config = load_config(&config_path).unwrap();
        let severity = &config.diagnostics.severity;

        assert_eq!(severity.get("duplicate-declaration"), Some(&SeverityValue::Warning));
        assert_eq!(severity.get("shadowed-declaration"), Some(&SeverityValue::Error));
        assert_eq!(severity.get("unused-declaration"), Some(&SeverityValue::Information));
        assert_eq!(severity.get("ambiguous-name"), Some(&SeverityValue::Hint));
    }

    #[test]
    fn severity_value_converts_to_severity() {
        assert_eq!(Severity::from(SeverityValue::Error), Severity::Error);
        assert_eq!(Severity::from(SeverityValue::Warning), Severity::Warning);
        assert_eq!(Severity::from(SeverityValue::Information), Severity::Information);
        assert_eq!(Severity::from(SeverityValue::Hint), Severity::Hint);
    }

    #[test]
    fn warns_on_unknown_options() {
        let dir = create_temp_dir();
        let config_path = dir.path().join(CONFIG_FILENAME);
        fs::write(
            &config_path,
            r#"
typo = true

[analysis]
max_lines = 10
"#,
        )
        .unwrap();

        let result = load_config_with_warnings(&config_path).unwrap();

        assert_eq!(result.warnings.len(), 2);
        assert!(result.warnings[0].contains("typo"));
        assert!(result.warnings[1].contains("[analysis]"));
        assert!(result.warnings[1].contains("max_lines"));
    }

    #[test]
    fn warns_on_unknown_diagnostic_codes() {
        let dir = create_temp_dir();
        let config_path = dir.path().join(CONFIG_FILENAME);
        fs::write(&config_path, "[diagnostics]\ndisabled = [\"no-such-check\"]").unwrap();

        let result = load_config_with_warnings(&config_path).unwrap();

        assert_eq!(result.warnings, vec!["Unknown diagnostic code: 'no-such-check'"]);
    }

    #[test]
    fn no_warnings_for_valid_config() {
        let dir = create_temp_dir();
        let config_path = dir.path().join(CONFIG_FILENAME);
        fs::write(
            &config_path,
            r#"
[analysis]
max_document_lines = 1500

[diagnostics]
disabled = ["unused-declaration"]

[diagnostics.severity]
variable-not-defined = "warning"
"#,
        )
        .unwrap();

        let result = load_config_with_warnings(&config_path).unwrap();

        assert!(result.warnings.is_empty());
    }

    #[test]
    fn load_config_or_default_with_warnings_returns_empty_when_no_config() {
        let dir = create_temp_dir();

        let result = load_config_or_default_with_warnings(dir.path());

        assert_eq!(result.config, Config::default());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn config_error_display_is_helpful() {
        let err = ConfigError::ParseError {
            path: PathBuf::from("/path/to/vbscope.toml"),
            message: "expected `=`".to_string(),
        };

        let msg = format!("{}", err);

        assert!(msg.contains("/path/to/vbscope.toml"));
        assert!(msg.contains("expected `=`"));
    }
}
