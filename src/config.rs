//! Runtime configuration from environment variables.
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `XTALCLASS_MODEL_PATH` | `models` | directory holding the model artifacts |
//! | `XTALCLASS_LOG_MODE` | `auto` | `auto`, `file` or `stdout` |
//! | `XTALCLASS_LOG_FILE` | `xtalclass.log` | log file used in file mode |
//! | `XTALCLASS_REQUIRE_MANIFEST` | `false` | refuse artifacts without `manifest.json` |

use std::path::PathBuf;

const MODEL_PATH_ENV: &str = "XTALCLASS_MODEL_PATH";
const LOG_MODE_ENV: &str = "XTALCLASS_LOG_MODE";
const LOG_FILE_ENV: &str = "XTALCLASS_LOG_FILE";
const REQUIRE_MANIFEST_ENV: &str = "XTALCLASS_REQUIRE_MANIFEST";

/// Where log output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    /// File when stdout is a terminal, stdout otherwise
    Auto,
    File,
    Stdout,
}

impl LogMode {
    fn parse(value: &str) -> Self {
        match value.trim() {
            "file" => Self::File,
            "stdout" => Self::Stdout,
            _ => Self::Auto,
        }
    }

    /// Whether logs go to a file, given whether stdout is interactive.
    ///
    /// Terminal output would corrupt the TUI's alternate screen.
    #[must_use]
    pub fn use_file(self, interactive: bool) -> bool {
        match self {
            Self::File => true,
            Self::Stdout => false,
            Self::Auto => interactive,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub model_dir: PathBuf,
    pub log_mode: LogMode,
    pub log_file: PathBuf,
    pub require_manifest: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            log_mode: LogMode::Auto,
            log_file: PathBuf::from("xtalclass.log"),
            require_manifest: false,
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim(), "1" | "true" | "TRUE" | "yes" | "YES")
}

impl AppConfig {
    /// Read the configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            model_dir: lookup(MODEL_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or(defaults.model_dir),
            log_mode: lookup(LOG_MODE_ENV)
                .map(|v| LogMode::parse(&v))
                .unwrap_or(defaults.log_mode),
            log_file: lookup(LOG_FILE_ENV)
                .map(PathBuf::from)
                .unwrap_or(defaults.log_file),
            require_manifest: lookup(REQUIRE_MANIFEST_ENV)
                .map(|v| parse_bool(&v))
                .unwrap_or(defaults.require_manifest),
        }
    }
}
