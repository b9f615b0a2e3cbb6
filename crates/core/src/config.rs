use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_CONTEXT_HEADER: &str = "=== CANVAS FILES ===";
const DEFAULT_CONTEXT_FOOTER: &str = "=== END OF CANVAS ===";

/// Tunable knobs for a canvas instance.
///
/// Every canvas carries one of these; `TextCanvas::new` uses the defaults.
/// Embedding applications can layer a TOML file and `VELLUM_*` environment
/// overrides on top via [`CanvasConfig::load`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasConfig {
    /// Number of unchanged lines shown around each change in generated diffs.
    pub diff_context_lines: usize,
    /// First line of the full-canvas context snapshot.
    pub context_header: String,
    /// Last line of the full-canvas context snapshot.
    pub context_footer: String,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            diff_context_lines: 3,
            context_header: DEFAULT_CONTEXT_HEADER.to_string(),
            context_footer: DEFAULT_CONTEXT_FOOTER.to_string(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl CanvasConfig {
    /// Layered load: defaults, then an optional TOML file, then `VELLUM_*`
    /// environment variables, then validation.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("vellum.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(canvas) = patch.canvas {
            if let Some(diff_context_lines) = canvas.diff_context_lines {
                self.diff_context_lines = diff_context_lines;
            }
            if let Some(context_header) = canvas.context_header {
                self.context_header = context_header;
            }
            if let Some(context_footer) = canvas.context_footer {
                self.context_footer = context_footer;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("VELLUM_DIFF_CONTEXT_LINES") {
            self.diff_context_lines = parse_usize("VELLUM_DIFF_CONTEXT_LINES", &value)?;
        }
        if let Some(value) = read_env("VELLUM_CONTEXT_HEADER") {
            self.context_header = value;
        }
        if let Some(value) = read_env("VELLUM_CONTEXT_FOOTER") {
            self.context_footer = value;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.diff_context_lines == 0 || self.diff_context_lines > 100 {
            return Err(ConfigError::Validation(
                "diff_context_lines must be in range 1..=100".to_string(),
            ));
        }
        if self.context_header.trim().is_empty() {
            return Err(ConfigError::Validation("context_header must not be blank".to_string()));
        }
        if self.context_footer.trim().is_empty() {
            return Err(ConfigError::Validation("context_footer must not be blank".to_string()));
        }
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("vellum.toml"), PathBuf::from("config/vellum.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    toml::from_str::<ConfigPatch>(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    canvas: Option<CanvasPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct CanvasPatch {
    diff_context_lines: Option<usize>,
    context_header: Option<String>,
    context_footer: Option<String>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{CanvasConfig, ConfigError, LoadOptions};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    #[test]
    fn defaults_pass_validation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&["VELLUM_DIFF_CONTEXT_LINES", "VELLUM_CONTEXT_HEADER", "VELLUM_CONTEXT_FOOTER"]);

        let config = CanvasConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        if config.diff_context_lines != 3 {
            return Err("default diff context should be 3 lines".to_string());
        }
        if config.context_header != "=== CANVAS FILES ===" {
            return Err("default header marker is wrong".to_string());
        }
        Ok(())
    }

    #[test]
    fn file_then_env_precedence() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("VELLUM_DIFF_CONTEXT_LINES", "5");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("vellum.toml");
            fs::write(
                &path,
                r#"
[canvas]
diff_context_lines = 7
context_header = "--- files ---"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                CanvasConfig::load(LoadOptions { config_path: Some(path), require_file: true })
                    .map_err(|err| format!("config load failed: {err}"))?;

            if config.diff_context_lines != 5 {
                return Err("env override should win over the file value".to_string());
            }
            if config.context_header != "--- files ---" {
                return Err("file value should win over the default".to_string());
            }
            Ok(())
        })();

        clear_vars(&["VELLUM_DIFF_CONTEXT_LINES"]);
        result
    }

    #[test]
    fn zero_context_lines_fails_validation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("VELLUM_DIFF_CONTEXT_LINES", "0");

        let result = (|| -> Result<(), String> {
            let error = match CanvasConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected validation failure".to_string()),
                Err(error) => error,
            };
            match error {
                ConfigError::Validation(message) if message.contains("diff_context_lines") => Ok(()),
                other => Err(format!("unexpected error: {other}")),
            }
        })();

        clear_vars(&["VELLUM_DIFF_CONTEXT_LINES"]);
        result
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let missing = std::path::PathBuf::from("/nonexistent/vellum.toml");
        let result = CanvasConfig::load(LoadOptions {
            config_path: Some(missing.clone()),
            require_file: true,
        });
        assert!(matches!(result, Err(ConfigError::MissingConfigFile(path)) if path == missing));
    }

    #[test]
    fn blank_marker_fails_validation() {
        let config = CanvasConfig { context_header: "   ".to_string(), ..CanvasConfig::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }
}
