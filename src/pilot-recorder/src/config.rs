//! Recorder configuration.
//!
//! Configuration is read from a TOML file and then overridden from the
//! environment:
//!
//! ```toml
//! [bindings]
//! undo = "ctrl+z"
//! finalize = "ctrl+c"
//!
//! [output]
//! path = "tests/test_paint_something.rs"
//! test_name = "test_paint_something"
//! app_path = "app.toml"
//! export_steps = false
//!
//! [replay]
//! settle_yields = 1
//! step_delay_ms = 0
//! exit_timeout_ms = 5000
//! ```

use crate::error::{RecorderError, RecorderResult};
use pilot_core::KeyEvent;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the test file path.
pub const ENV_OUTPUT: &str = "PILOT_RECORDER_OUTPUT";
/// Environment variable overriding the generated test name.
pub const ENV_TEST_NAME: &str = "PILOT_RECORDER_TEST_NAME";
/// Environment variable overriding the application path in generated tests.
pub const ENV_APP_PATH: &str = "PILOT_RECORDER_APP_PATH";
/// Environment variable overriding the undo key.
pub const ENV_UNDO_KEY: &str = "PILOT_RECORDER_UNDO_KEY";
/// Environment variable overriding the finalize key.
pub const ENV_FINALIZE_KEY: &str = "PILOT_RECORDER_FINALIZE_KEY";

/// Complete recorder configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Control keys.
    #[serde(default)]
    pub bindings: KeyBindings,

    /// Where and how the test file is written.
    #[serde(default)]
    pub output: OutputConfig,

    /// Replay pacing.
    #[serde(default)]
    pub replay: ReplayConfig,
}

/// Keys handled by the recorder instead of being recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBindings {
    /// Removes the last step and restarts the application.
    #[serde(default = "default_undo")]
    pub undo: String,

    /// Writes the recorded steps as a test file.
    #[serde(default = "default_finalize")]
    pub finalize: String,
}

fn default_undo() -> String {
    "ctrl+z".to_string()
}

fn default_finalize() -> String {
    "ctrl+c".to_string()
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            undo: default_undo(),
            finalize: default_finalize(),
        }
    }
}

/// Output settings for generated tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Base path of the generated test file.
    #[serde(default = "default_output_path")]
    pub path: PathBuf,

    /// Name of the generated test function.
    #[serde(default = "default_test_name")]
    pub test_name: String,

    /// Application path embedded in the generated test.
    #[serde(default = "default_app_path")]
    pub app_path: String,

    /// Also write the step log as JSON next to the test file.
    #[serde(default)]
    pub export_steps: bool,
}

fn default_output_path() -> PathBuf {
    PathBuf::from("tests/test_paint_something.rs")
}

fn default_test_name() -> String {
    "test_paint_something".to_string()
}

fn default_app_path() -> String {
    "app.toml".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            test_name: default_test_name(),
            app_path: default_app_path(),
            export_steps: false,
        }
    }
}

/// Pacing of replayed steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Cooperative yields after each replayed step.
    #[serde(default = "default_settle_yields")]
    pub settle_yields: u32,

    /// Fixed delay after each replayed step, in milliseconds.
    #[serde(default)]
    pub step_delay_ms: u64,

    /// How long to wait for an instance to stop on restart, in milliseconds.
    #[serde(default = "default_exit_timeout")]
    pub exit_timeout_ms: u64,
}

fn default_settle_yields() -> u32 {
    1
}

fn default_exit_timeout() -> u64 {
    5000
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            settle_yields: default_settle_yields(),
            step_delay_ms: 0,
            exit_timeout_ms: default_exit_timeout(),
        }
    }
}

impl ReplayConfig {
    /// Delay after each step, if any.
    pub fn step_delay(&self) -> Option<Duration> {
        (self.step_delay_ms > 0).then(|| Duration::from_millis(self.step_delay_ms))
    }

    /// Exit timeout as a duration.
    pub fn exit_timeout(&self) -> Duration {
        Duration::from_millis(self.exit_timeout_ms)
    }
}

/// Strict and reserved keywords of the 2024 edition.
const RUST_KEYWORDS: &[&str] = &[
    "Self", "abstract", "as", "async", "await", "become", "box", "break", "const", "continue",
    "crate", "do", "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if",
    "impl", "in", "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv",
    "pub", "ref", "return", "self", "static", "struct", "super", "trait", "true", "try", "type",
    "typeof", "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

fn is_rust_identifier(name: &str) -> bool {
    if RUST_KEYWORDS.contains(&name) {
        return false;
    }
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            name != "_" && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

impl RecorderConfig {
    /// Parses a TOML configuration.
    pub fn from_toml_str(source: &str) -> RecorderResult<Self> {
        toml::from_str(source).map_err(|e| RecorderError::ConfigError(e.to_string()))
    }

    /// Loads a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> RecorderResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "Loaded recorder config");
        Ok(config)
    }

    /// Default location of the configuration file.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("pilot-recorder").join("config.toml"))
    }

    /// Loads the configuration from `path`, or from the default location when
    /// it exists, then applies environment overrides and validates.
    pub fn resolve(path: Option<&Path>) -> RecorderResult<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::load(path)?,
                None => Self::default(),
            },
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Applies `PILOT_RECORDER_*` environment overrides.
    pub fn apply_env(&mut self) {
        if let Ok(path) = std::env::var(ENV_OUTPUT) {
            self.output.path = PathBuf::from(path);
        }

        if let Ok(name) = std::env::var(ENV_TEST_NAME) {
            self.output.test_name = name;
        }

        if let Ok(app_path) = std::env::var(ENV_APP_PATH) {
            self.output.app_path = app_path;
        }

        if let Ok(key) = std::env::var(ENV_UNDO_KEY) {
            self.bindings.undo = key;
        }

        if let Ok(key) = std::env::var(ENV_FINALIZE_KEY) {
            self.bindings.finalize = key;
        }
    }

    /// Checks the configuration for values the recorder cannot work with.
    pub fn validate(&self) -> RecorderResult<()> {
        let undo = KeyEvent::parse(&self.bindings.undo)
            .map_err(|e| RecorderError::ConfigError(format!("undo binding: {e}")))?;
        let finalize = KeyEvent::parse(&self.bindings.finalize)
            .map_err(|e| RecorderError::ConfigError(format!("finalize binding: {e}")))?;
        if undo == finalize {
            return Err(RecorderError::ConfigError(format!(
                "undo and finalize are both bound to {undo}"
            )));
        }

        if !is_rust_identifier(&self.output.test_name) {
            return Err(RecorderError::ConfigError(format!(
                "test name {:?} is not a valid function name",
                self.output.test_name
            )));
        }

        if self.output.path.as_os_str().is_empty() {
            return Err(RecorderError::ConfigError(
                "output path must not be empty".to_string(),
            ));
        }

        if self.replay.settle_yields == 0 {
            return Err(RecorderError::ConfigError(
                "settle_yields must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Builder: set the key bindings.
    pub fn with_bindings(mut self, undo: impl Into<String>, finalize: impl Into<String>) -> Self {
        self.bindings.undo = undo.into();
        self.bindings.finalize = finalize.into();
        self
    }

    /// Builder: set the output path.
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output.path = path.into();
        self
    }

    /// Builder: set the test name.
    pub fn with_test_name(mut self, name: impl Into<String>) -> Self {
        self.output.test_name = name.into();
        self
    }

    /// Builder: set the application path embedded in tests.
    pub fn with_app_path(mut self, app_path: impl Into<String>) -> Self {
        self.output.app_path = app_path.into();
        self
    }

    /// Builder: also export the step log on save.
    pub fn with_export_steps(mut self, export: bool) -> Self {
        self.output.export_steps = export;
        self
    }

    /// Builder: set replay pacing.
    pub fn with_replay(mut self, replay: ReplayConfig) -> Self {
        self.replay = replay;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use tempfile::TempDir;

    fn clear_env() {
        for var in [
            ENV_OUTPUT,
            ENV_TEST_NAME,
            ENV_APP_PATH,
            ENV_UNDO_KEY,
            ENV_FINALIZE_KEY,
        ] {
            // SAFETY: env tests run serially
            unsafe { std::env::remove_var(var) };
        }
    }

    #[test]
    fn test_defaults() {
        let config = RecorderConfig::default();
        assert_eq!(config.bindings.undo, "ctrl+z");
        assert_eq!(config.bindings.finalize, "ctrl+c");
        assert_eq!(
            config.output.path,
            PathBuf::from("tests/test_paint_something.rs")
        );
        assert_eq!(config.output.test_name, "test_paint_something");
        assert_eq!(config.replay.settle_yields, 1);
        assert_eq!(config.replay.step_delay(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config = RecorderConfig::from_toml_str(
            r#"
[output]
test_name = "test_draw_line"

[replay]
step_delay_ms = 20
"#,
        )
        .unwrap();
        assert_eq!(config.output.test_name, "test_draw_line");
        assert_eq!(config.bindings.undo, "ctrl+z");
        assert_eq!(
            config.replay.step_delay(),
            Some(Duration::from_millis(20))
        );
        assert_eq!(config.replay.exit_timeout_ms, 5000);
    }

    #[test]
    fn test_load_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[bindings]\nundo = \"ctrl+u\"\n").unwrap();
        let config = RecorderConfig::load(&path).unwrap();
        assert_eq!(config.bindings.undo, "ctrl+u");
    }

    #[test]
    fn test_invalid_toml() {
        let result = RecorderConfig::from_toml_str("[replay]\nsettle_yields = \"many\"");
        assert!(matches!(result, Err(RecorderError::ConfigError(_))));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let same = RecorderConfig::default().with_bindings("ctrl+z", "control+z");
        assert!(same.validate().is_err());

        let bad_key = RecorderConfig::default().with_bindings("", "ctrl+c");
        assert!(bad_key.validate().is_err());

        let bad_name = RecorderConfig::default().with_test_name("test-with-dash");
        assert!(bad_name.validate().is_err());

        let no_yields = RecorderConfig::default().with_replay(ReplayConfig {
            settle_yields: 0,
            ..ReplayConfig::default()
        });
        assert!(no_yields.validate().is_err());
    }

    #[test]
    fn test_rust_identifiers() {
        assert!(is_rust_identifier("test_paint_something"));
        assert!(is_rust_identifier("_t1"));
        assert!(!is_rust_identifier("_"));
        assert!(!is_rust_identifier("1test"));
        assert!(!is_rust_identifier("test name"));
    }

    #[test]
    fn test_keywords_are_not_test_names() {
        for keyword in ["fn", "match", "async", "self", "Self", "gen", "try", "yield"] {
            assert!(!is_rust_identifier(keyword), "{keyword} accepted");
        }
        assert!(is_rust_identifier("test_match"));
        assert!(!is_rust_identifier("r#match"));

        let err = RecorderConfig::default()
            .with_test_name("match")
            .validate()
            .unwrap_err();
        assert!(matches!(err, RecorderError::ConfigError(_)));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        // SAFETY: env tests run serially
        unsafe {
            std::env::set_var(ENV_OUTPUT, "out/recorded.rs");
            std::env::set_var(ENV_TEST_NAME, "test_from_env");
            std::env::set_var(ENV_UNDO_KEY, "ctrl+u");
        }

        let mut config = RecorderConfig::default();
        config.apply_env();
        clear_env();

        assert_eq!(config.output.path, PathBuf::from("out/recorded.rs"));
        assert_eq!(config.output.test_name, "test_from_env");
        assert_eq!(config.bindings.undo, "ctrl+u");
        assert_eq!(config.bindings.finalize, "ctrl+c");
    }

    #[test]
    #[serial]
    fn test_resolve_explicit_path() {
        clear_env();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[output]\napp_path = \"paint.toml\"\n").unwrap();

        let config = RecorderConfig::resolve(Some(&path)).unwrap();
        assert_eq!(config.output.app_path, "paint.toml");
    }
}
