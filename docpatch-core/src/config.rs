//! Engine configuration.
//!
//! # Lookup order
//!
//! ```text
//! <work_dir>/docpatch.yaml        project config, wins when present
//! ~/.docpatch/config.yaml         user config
//! built-in defaults
//! ```
//!
//! Every loader has an `_at` form taking explicit directories; tests must use
//! those so they never read the real home directory.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const CONFIG_FILE_NAME: &str = "docpatch.yaml";

/// Identity fields probed in order when fingerprinting a document.
pub const DEFAULT_IDENTIFIER_CANDIDATES: &[&str] = &["_id", "id", "uuid", "key"];

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Text encoding mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Every scalar explicitly type-tagged.
    #[default]
    Canonical,
    /// Native JSON values where unambiguous.
    Relaxed,
    /// Console constructor syntax; render-only.
    Shell,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Canonical => write!(f, "canonical"),
            Mode::Relaxed => write!(f, "relaxed"),
            Mode::Shell => write!(f, "shell"),
        }
    }
}

/// Layout of the editable dump file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DumpShape {
    /// A single JSON array of documents.
    #[default]
    Array,
    /// One document per line.
    Lines,
}

impl DumpShape {
    pub fn extension(&self) -> &'static str {
        match self {
            DumpShape::Array => "json",
            DumpShape::Lines => "jsonl",
        }
    }
}

impl fmt::Display for DumpShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DumpShape::Array => write!(f, "array"),
            DumpShape::Lines => write!(f, "lines"),
        }
    }
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Everything the engine would otherwise take from process-wide constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory holding the session record, snapshot and dump.
    pub staging_dir: PathBuf,
    /// Identity fields, probed in order.
    pub identifier_candidates: Vec<String>,
    /// Encoding of the dump file; shell is refused.
    pub dump_mode: Mode,
    pub dump_shape: DumpShape,
    /// Single-line documents inside an array dump.
    pub compact_dump: bool,
    /// Indent unit for indented output.
    pub indent: String,
    /// Skip documents that fail to encode instead of aborting the query.
    pub ignore_failures: bool,
    /// Encoding used for payloads of emitted commands.
    pub command_mode: Mode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            staging_dir: PathBuf::from(".docpatch"),
            identifier_candidates: DEFAULT_IDENTIFIER_CANDIDATES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            dump_mode: Mode::Canonical,
            dump_shape: DumpShape::Array,
            compact_dump: false,
            indent: "  ".to_string(),
            ignore_failures: false,
            command_mode: Mode::Shell,
        }
    }
}

impl EngineConfig {
    /// Defaults with an explicit staging directory.
    pub fn with_staging_dir(staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
            ..Self::default()
        }
    }

    /// Check the invariants the engine relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.identifier_candidates.is_empty() {
            return Err(ConfigError::Invalid(
                "identifier_candidates must not be empty".to_string(),
            ));
        }
        for name in &self.identifier_candidates {
            if name.is_empty() || name.chars().any(char::is_whitespace) {
                return Err(ConfigError::Invalid(format!(
                    "identifier candidate '{name}' must be non-empty and contain no whitespace"
                )));
            }
        }
        if self.dump_mode == Mode::Shell {
            return Err(ConfigError::Invalid(
                "dump_mode 'shell' cannot be read back; use canonical or relaxed".to_string(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// `<work_dir>/docpatch.yaml` — pure, no I/O.
pub fn project_config_path_at(work_dir: &Path) -> PathBuf {
    work_dir.join(CONFIG_FILE_NAME)
}

/// `<home>/.docpatch/config.yaml` — pure, no I/O.
pub fn user_config_path_at(home: &Path) -> PathBuf {
    home.join(".docpatch").join("config.yaml")
}

/// Load the effective configuration for `work_dir`.
///
/// A relative `staging_dir` is resolved against `work_dir`. The result is
/// validated before it is returned.
pub fn load_at(work_dir: &Path, home: Option<&Path>) -> Result<EngineConfig, ConfigError> {
    let candidates = std::iter::once(project_config_path_at(work_dir))
        .chain(home.map(user_config_path_at));

    let mut config = EngineConfig::default();
    for path in candidates {
        if path.exists() {
            config = read_config(&path)?;
            break;
        }
    }

    if config.staging_dir.is_relative() {
        config.staging_dir = work_dir.join(&config.staging_dir);
    }
    config.validate()?;
    Ok(config)
}

/// `load_at` convenience wrapper — uses `dirs::home_dir()` for the user config.
pub fn load(work_dir: &Path) -> Result<EngineConfig, ConfigError> {
    load_at(work_dir, dirs::home_dir().as_deref())
}

fn read_config(path: &Path) -> Result<EngineConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if contents.trim().is_empty() {
        return Ok(EngineConfig::default());
    }
    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
