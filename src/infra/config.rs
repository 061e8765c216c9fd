use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cli::{AppContext, InitArgs};

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    /// Default ignore patterns (in addition to .gitignore)
    pub ignore_patterns: Vec<String>,

    /// Directory holding exercises/ and assessments/ JSON configs
    pub config_dir: PathBuf,

    /// Default extraction settings
    pub extract: ExtractConfig,

    /// Default analysis settings
    pub analyze: AnalyzeConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Directory submissions are unpacked into
    pub output_dir: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeConfig {
    /// Default report destination
    pub output_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ignore_patterns: vec![
                "target/".to_string(),
                "node_modules/".to_string(),
                "build/".to_string(),
                ".git/".to_string(),
                "*.class".to_string(),
                ".DS_Store".to_string(),
                "Thumbs.db".to_string(),
            ],
            config_dir: PathBuf::from("configs"),
            extract: ExtractConfig {
                output_dir: "extracted".to_string(),
            },
            analyze: AnalyzeConfig {
                output_file: "analysis.json".to_string(),
            },
        }
    }
}

pub fn load_config() -> Result<Config> {
    let mut builder = config::Config::builder();

    // Load from config files in priority order
    let config_paths = ["teachassist.toml", "teachassist.yaml", ".teachassist.toml"];

    for path in &config_paths {
        if Path::new(path).exists() {
            builder = builder.add_source(config::File::with_name(path));
            break;
        }
    }

    // Add environment variables with TEACHASSIST_ prefix
    builder = builder.add_source(config::Environment::with_prefix("TEACHASSIST").separator("_"));

    let cfg = builder.build().context("Failed to load configuration")?;
    let parsed: Config = cfg
        .try_deserialize()
        .context("Failed to parse configuration")?;

    Ok(parsed)
}

pub fn init(args: InitArgs, ctx: &AppContext) -> Result<()> {
    let config_path = args.path.join("teachassist.toml");

    if config_path.exists() && !args.force {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let config = Config::default();
    let toml_string =
        toml::to_string_pretty(&config).context("Failed to serialize default config")?;

    std::fs::write(&config_path, toml_string).context("Failed to write config file")?;

    if !ctx.quiet {
        println!("Created config file at {}", config_path.display());
    }
    Ok(())
}

/// Errors raised while loading exercise or assessment configs.
/// Kept typed so the analyzer can degrade a missing exercise into a
/// `system.error` finding instead of aborting the whole run.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found for {kind} '{id}' at {path}")]
    NotFound {
        kind: &'static str,
        id: String,
        path: PathBuf,
    },

    #[error("Invalid JSON in {path}: {source}")]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration format in {path}: missing required field '{field}'")]
    MissingField { path: PathBuf, field: &'static str },

    #[error("Failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Exercise description: what the student must deliver and the rules the
/// analyzer checks. JSON field names stay camelCase so existing exercise
/// files keep loading unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseConfig {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub rules: ExerciseRules,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseRules {
    /// Class names that must be declared
    #[serde(default)]
    pub required_classes: Vec<String>,

    /// Methods that must be declared (optionally with signature)
    #[serde(default)]
    pub required_methods: Vec<RequiredMethod>,

    /// Regex patterns that must not match the source
    #[serde(default)]
    pub disallowed_elements: Vec<String>,

    /// Report assignments to identifiers never declared in scope
    #[serde(default)]
    pub check_variable_scope: bool,

    /// Warn when a method body exceeds this many lines
    #[serde(default)]
    pub check_method_length: Option<usize>,

    /// Warn when a method exceeds this cyclomatic complexity
    #[serde(default)]
    pub check_cyclomatic_complexity: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequiredMethod {
    pub name: String,
    /// Expected parameter types, in order; None skips the check
    #[serde(default)]
    pub params: Option<Vec<String>>,
    /// Expected return type; None skips the check
    #[serde(default)]
    pub return_type: Option<String>,
}

/// One graded exercise inside an assessment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentExercise {
    pub exercise_id: String,
    #[serde(default)]
    pub max_points: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentConfig {
    pub assessment_id: String,
    pub name: String,
    pub exercises: Vec<AssessmentExercise>,
    #[serde(default)]
    pub total_max_points: Option<u32>,
}

fn read_json_config(path: &Path) -> Result<serde_json::Value, ConfigError> {
    let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&data).map_err(|source| ConfigError::InvalidJson {
        path: path.to_path_buf(),
        source,
    })
}

/// Load `<config_dir>/exercises/<id>.json` with minimal validation.
pub fn load_exercise_config(config_dir: &Path, id: &str) -> Result<ExerciseConfig, ConfigError> {
    let path = config_dir.join("exercises").join(format!("{id}.json"));

    if !path.exists() {
        return Err(ConfigError::NotFound {
            kind: "exercise",
            id: id.to_string(),
            path,
        });
    }

    let value = read_json_config(&path)?;

    // Validate before deserializing so empty strings are caught too
    for field in ["id", "name", "description"] {
        let present = value
            .get(field)
            .and_then(|v| v.as_str())
            .is_some_and(|s| !s.is_empty());
        if !present {
            return Err(ConfigError::MissingField { path, field });
        }
    }

    serde_json::from_value(value).map_err(|source| ConfigError::InvalidJson { path, source })
}

/// Whether an exercise config exists under `config_dir`.
pub fn exercise_config_exists(config_dir: &Path, id: &str) -> bool {
    config_dir
        .join("exercises")
        .join(format!("{id}.json"))
        .exists()
}

/// Load `<config_dir>/assessments/<id>.json`.
pub fn load_assessment_config(
    config_dir: &Path,
    id: &str,
) -> Result<AssessmentConfig, ConfigError> {
    let path = config_dir.join("assessments").join(format!("{id}.json"));

    if !path.exists() {
        return Err(ConfigError::NotFound {
            kind: "assessment",
            id: id.to_string(),
            path,
        });
    }

    let value = read_json_config(&path)?;

    for field in ["assessmentId", "name"] {
        let present = value
            .get(field)
            .and_then(|v| v.as_str())
            .is_some_and(|s| !s.is_empty());
        if !present {
            return Err(ConfigError::MissingField { path, field });
        }
    }

    serde_json::from_value(value).map_err(|source| ConfigError::InvalidJson { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_exercise(dir: &Path, id: &str, body: &str) {
        let ex_dir = dir.join("exercises");
        fs::create_dir_all(&ex_dir).unwrap();
        fs::write(ex_dir.join(format!("{id}.json")), body).unwrap();
    }

    #[test]
    fn loads_valid_exercise_config() {
        let tmp = TempDir::new().unwrap();
        write_exercise(
            tmp.path(),
            "test-basic",
            r#"{
                "id": "test-basic",
                "name": "Basic test",
                "description": "Hello world with main",
                "rules": {
                    "requiredClasses": ["Hello"],
                    "requiredMethods": [{"name": "main", "params": ["String[]"], "returnType": "void"}],
                    "checkVariableScope": true,
                    "checkMethodLength": 20
                }
            }"#,
        );

        let cfg = load_exercise_config(tmp.path(), "test-basic").unwrap();
        assert_eq!(cfg.id, "test-basic");
        assert_eq!(cfg.rules.required_classes, vec!["Hello"]);
        assert_eq!(cfg.rules.required_methods[0].name, "main");
        assert_eq!(
            cfg.rules.required_methods[0].return_type.as_deref(),
            Some("void")
        );
        assert!(cfg.rules.check_variable_scope);
        assert_eq!(cfg.rules.check_method_length, Some(20));
        assert!(exercise_config_exists(tmp.path(), "test-basic"));
    }

    #[test]
    fn missing_exercise_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = load_exercise_config(tmp.path(), "nope").unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
        assert!(err.to_string().contains("not found"));
        assert!(!exercise_config_exists(tmp.path(), "nope"));
    }

    #[test]
    fn invalid_json_is_reported() {
        let tmp = TempDir::new().unwrap();
        write_exercise(tmp.path(), "broken", "{ not json");
        let err = load_exercise_config(tmp.path(), "broken").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidJson { .. }));
    }

    #[test]
    fn empty_required_field_is_rejected() {
        let tmp = TempDir::new().unwrap();
        write_exercise(
            tmp.path(),
            "nameless",
            r#"{"id": "nameless", "name": "", "description": "d"}"#,
        );
        let err = load_exercise_config(tmp.path(), "nameless").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingField { field: "name", .. }
        ));
    }

    #[test]
    fn loads_assessment_config() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("assessments");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("midterm.json"),
            r#"{
                "assessmentId": "midterm",
                "name": "Midterm",
                "exercises": [{"exerciseId": "test-basic", "maxPoints": 10}],
                "totalMaxPoints": 10
            }"#,
        )
        .unwrap();

        let cfg = load_assessment_config(tmp.path(), "midterm").unwrap();
        assert_eq!(cfg.assessment_id, "midterm");
        assert_eq!(cfg.exercises.len(), 1);
        assert_eq!(cfg.exercises[0].max_points, Some(10));
    }

    #[test]
    fn default_tool_config_has_java_ignores() {
        let cfg = Config::default();
        assert!(cfg.ignore_patterns.iter().any(|p| p == "*.class"));
        assert_eq!(cfg.extract.output_dir, "extracted");
    }
}
