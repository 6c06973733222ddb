//! Configuration for the code index and enrichment pipeline.
//!
//! Settings come from three layers, each overriding the one before it:
//! built-in defaults, a `.codatlas/settings.toml` file found by walking
//! up from the current directory, and `CODATLAS_*` environment variables:
//!
//! - `CODATLAS_PARALLEL_THREADS` sets `indexing.parallel_threads`
//! - `CODATLAS_DAMPING` sets `ranking.damping`
//! - `CODATLAS_WORKERS` sets `enrichment.workers`
//! - `CODATLAS_MAX_ATTEMPTS` sets `enrichment.max_attempts`
//! - `CODATLAS_CALL_TIMEOUT_MS` sets `enrichment.call_timeout_ms`
//! - `CODATLAS_TRAIL_TTL_SECS` sets `trail.ttl_secs`
//! - `CODATLAS_LOG` sets `logging.default`

use crate::{IndexError, IndexResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Directories that are never worth indexing.
pub const DEFAULT_IGNORES: &[&str] = &[
    ".git/**",
    "__pycache__/**",
    "node_modules/**",
    ".venv/**",
    "venv/**",
    "build/**",
    "dist/**",
    "target/**",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Index directory, relative to the workspace root.
    pub index_path: PathBuf,

    /// Workspace root (where `.codatlas` lives). Detected when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,

    pub indexing: IndexingConfig,
    pub ranking: RankingConfig,
    pub enrichment: EnrichmentConfig,
    pub trail: TrailConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexingConfig {
    /// Threads used for per-file extraction.
    pub parallel_threads: usize,

    /// Glob patterns excluded from the workspace walk, on top of
    /// gitignore rules.
    pub ignore_patterns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Damping factor of the power iteration.
    pub damping: f64,

    /// L1 convergence tolerance; the primary stop condition.
    pub tolerance: f64,

    /// Iteration cap; a safety net, not the primary stop condition.
    pub max_iterations: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Number of concurrent workers.
    pub workers: usize,

    /// Attempt ceiling per profile; exceeding it is terminal.
    pub max_attempts: u32,

    /// Base delay for exponential backoff, milliseconds.
    pub base_backoff_ms: u64,

    /// Upper bound on a single backoff delay, milliseconds.
    pub max_backoff_ms: u64,

    /// Per-call timeout against the generation service, milliseconds.
    /// A timeout counts as a failed attempt, not a crash.
    pub call_timeout_ms: u64,

    /// How long a consumed-but-unacked delivery stays invisible before
    /// the queue hands it out again, milliseconds.
    pub visibility_timeout_ms: u64,

    /// Character cap on the source excerpt sent to the generation service.
    pub max_excerpt_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrailConfig {
    /// Absolute expiry applied to every stored trail, seconds from
    /// creation.
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing directive, applied when `RUST_LOG` is unset.
    pub default: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            index_path: PathBuf::from(".codatlas/index"),
            workspace_root: None,
            indexing: IndexingConfig::default(),
            ranking: RankingConfig::default(),
            enrichment: EnrichmentConfig::default(),
            trail: TrailConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            parallel_threads: num_cpus::get(),
            ignore_patterns: DEFAULT_IGNORES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            damping: 0.85,
            tolerance: 1.0e-6,
            max_iterations: 100,
        }
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            max_attempts: 5,
            base_backoff_ms: 500,
            max_backoff_ms: 30_000,
            call_timeout_ms: 60_000,
            visibility_timeout_ms: 120_000,
            max_excerpt_chars: 6_000,
        }
    }
}

impl Default for TrailConfig {
    fn default() -> Self {
        Self { ttl_secs: 3_600 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: "codatlas=warn".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from the nearest `.codatlas/settings.toml`, falling
    /// back to defaults, with environment overrides applied last. A
    /// broken config file warns and falls back rather than aborting.
    pub fn load() -> Self {
        let mut settings = match Self::find_config_file() {
            Some(path) => Self::read_file(&path).unwrap_or_else(|e| {
                eprintln!("codatlas: Warning: {e}, using defaults");
                Self::default()
            }),
            None => Self::default(),
        };
        if settings.workspace_root.is_none() {
            settings.workspace_root = Self::find_workspace_root();
        }
        settings.apply_env_overrides();
        settings
    }

    /// Load settings from a specific file, with environment overrides
    /// applied on top.
    pub fn load_from(path: impl AsRef<Path>) -> IndexResult<Self> {
        let mut settings = Self::read_file(path.as_ref())?;
        settings.apply_env_overrides();
        Ok(settings)
    }

    fn read_file(path: &Path) -> IndexResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            IndexError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        toml::from_str(&content)
            .map_err(|e| IndexError::Config(format!("invalid {}: {e}", path.display())))
    }

    /// Save the settings to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> IndexResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| IndexError::Config(e.to_string()))?;
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| IndexError::Config(e.to_string()))?;
        }
        std::fs::write(path.as_ref(), content).map_err(|e| IndexError::Config(e.to_string()))
    }

    /// Write a default `.codatlas/settings.toml` in the current directory.
    pub fn init_config_file(force: bool) -> IndexResult<PathBuf> {
        let config_path = PathBuf::from(".codatlas/settings.toml");

        if !force && config_path.exists() {
            return Err(IndexError::Config(
                "configuration file already exists, use --force to overwrite".to_string(),
            ));
        }

        let mut settings = Settings::default();
        if let Ok(current_dir) = env::current_dir() {
            settings.workspace_root = Some(current_dir);
        }

        settings.save(&config_path)?;
        Ok(config_path)
    }

    fn apply_env_overrides(&mut self) {
        env_override(
            "CODATLAS_PARALLEL_THREADS",
            &mut self.indexing.parallel_threads,
        );
        env_override("CODATLAS_DAMPING", &mut self.ranking.damping);
        env_override("CODATLAS_WORKERS", &mut self.enrichment.workers);
        env_override("CODATLAS_MAX_ATTEMPTS", &mut self.enrichment.max_attempts);
        env_override(
            "CODATLAS_CALL_TIMEOUT_MS",
            &mut self.enrichment.call_timeout_ms,
        );
        env_override("CODATLAS_TRAIL_TTL_SECS", &mut self.trail.ttl_secs);
        env_override("CODATLAS_LOG", &mut self.logging.default);
    }

    fn find_config_file() -> Option<PathBuf> {
        let current = env::current_dir().ok()?;
        for ancestor in current.ancestors() {
            let path = ancestor.join(".codatlas").join("settings.toml");
            if path.is_file() {
                return Some(path);
            }
        }
        None
    }

    /// Nearest ancestor of the current directory containing `.codatlas`.
    pub fn find_workspace_root() -> Option<PathBuf> {
        let current = env::current_dir().ok()?;
        for ancestor in current.ancestors() {
            if ancestor.join(".codatlas").is_dir() {
                return Some(ancestor.to_path_buf());
            }
        }
        None
    }
}

fn env_override<T: FromStr + Display>(var: &str, slot: &mut T) {
    if let Ok(val) = env::var(var) {
        if let Ok(parsed) = val.parse() {
            *slot = parsed;
        } else {
            eprintln!("codatlas: Warning: invalid {var} value: {val}, using default: {slot}");
        }
    }
}
