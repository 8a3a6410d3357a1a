//! Collection-pair configuration.
//!
//! # Storage layout
//!
//! ```text
//! ~/.tasksync/
//!   pairs.yaml    (mode 0600, directory mode 0700)
//! ```
//!
//! # API pattern
//!
//! Path-taking functions (`load_from`, `save_to`, `add_pair_to`) do the work.
//! `_at(home)` forms resolve the default path under an explicit home and are
//! what tests use; the no-arg forms derive home from `dirs::home_dir()`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{Direction, MembershipPolicy, MissingSectionPolicy, ReconcileMode};

/// Highest config `version` this build understands.
pub const SUPPORTED_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A collection addressed by workspace name and collection name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionRef {
    pub workspace: String,
    pub collection: String,
}

impl CollectionRef {
    pub fn new(workspace: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            workspace: workspace.into(),
            collection: collection.into(),
        }
    }
}

impl fmt::Display for CollectionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.workspace, self.collection)
    }
}

/// Parses `WORKSPACE/COLLECTION`. The first `/` separates the two, so
/// collection names may contain slashes but workspace names may not.
impl FromStr for CollectionRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((workspace, collection)) if !workspace.is_empty() && !collection.is_empty() => {
                Ok(Self::new(workspace, collection))
            }
            _ => Err(format!("expected WORKSPACE/COLLECTION, got '{s}'")),
        }
    }
}

/// Two collections kept in agreement, plus how to reconcile them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairConfig {
    pub a: CollectionRef,
    pub b: CollectionRef,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub mode: ReconcileMode,
    #[serde(default)]
    pub membership_policy: MembershipPolicy,
    #[serde(default)]
    pub missing_section: MissingSectionPolicy,
}

impl PairConfig {
    /// A bidirectional, full-mode pair with default policies.
    pub fn new(a: CollectionRef, b: CollectionRef) -> Self {
        Self {
            a,
            b,
            direction: Direction::default(),
            mode: ReconcileMode::default(),
            membership_policy: MembershipPolicy::default(),
            missing_section: MissingSectionPolicy::default(),
        }
    }

    /// Human-readable `a <-> b` / `a -> b` label.
    pub fn label(&self) -> String {
        let arrow = match self.direction {
            Direction::Both => "<->",
            Direction::AToB => "->",
        };
        format!("{} {arrow} {}", self.a, self.b)
    }
}

/// Root of `pairs.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub version: u32,
    #[serde(default)]
    pub pairs: Vec<PairConfig>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            version: SUPPORTED_VERSION,
            pairs: Vec::new(),
        }
    }
}

impl SyncConfig {
    /// Reject configs the engine cannot run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version > SUPPORTED_VERSION {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "config version {} is newer than supported version {SUPPORTED_VERSION}",
                    self.version
                ),
            });
        }
        for (index, pair) in self.pairs.iter().enumerate() {
            for side in [&pair.a, &pair.b] {
                if side.workspace.is_empty() || side.collection.is_empty() {
                    return Err(ConfigError::Invalid {
                        reason: format!(
                            "pair #{index}: workspace and collection must be non-empty"
                        ),
                    });
                }
            }
            if pair.a == pair.b {
                return Err(ConfigError::Invalid {
                    reason: format!("pair #{index}: both sides are {}", pair.a),
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.tasksync/pairs.yaml` — pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(".tasksync").join("pairs.yaml")
}

/// `config_path_at` convenience wrapper.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(config_path_at(&home()?))
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

/// Load and validate the config at `path`.
///
/// Returns `ConfigError::ConfigNotFound` if absent,
/// `ConfigError::Parse` (with path + line context) if malformed YAML.
pub fn load_from(path: &Path) -> Result<SyncConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path)?;
    let config: SyncConfig = serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    config.validate()?;
    Ok(config)
}

/// Load `<home>/.tasksync/pairs.yaml`.
pub fn load_at(home: &Path) -> Result<SyncConfig, ConfigError> {
    load_from(&config_path_at(home))
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<SyncConfig, ConfigError> {
    load_at(&home()?)
}

// ---------------------------------------------------------------------------
// 3. Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically save `config` to `path`.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
/// The parent directory is created with mode `0700` if absent.
pub fn save_to(path: &Path, config: &SyncConfig) -> Result<(), ConfigError> {
    config.validate()?;
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            std::fs::create_dir_all(dir)?;
            set_dir_permissions(dir)?;
        }
    }
    let tmp_path = path.with_extension("yaml.tmp");

    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp_path, yaml)?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Save to `<home>/.tasksync/pairs.yaml`.
pub fn save_at(home: &Path, config: &SyncConfig) -> Result<(), ConfigError> {
    save_to(&config_path_at(home), config)
}

// ---------------------------------------------------------------------------
// 4. Add pair
// ---------------------------------------------------------------------------

/// Append `pair` to the config at `path`, creating the file if needed.
///
/// Idempotent: an identical pair already present is not added twice.
/// Returns the config as saved.
pub fn add_pair_to(path: &Path, pair: PairConfig) -> Result<SyncConfig, ConfigError> {
    let mut config = match load_from(path) {
        Ok(config) => config,
        Err(ConfigError::ConfigNotFound { .. }) => SyncConfig::default(),
        Err(err) => return Err(err),
    };
    if !config.pairs.contains(&pair) {
        config.pairs.push(pair);
    }
    save_to(path, &config)?;
    Ok(config)
}

/// `add_pair_to` against `<home>/.tasksync/pairs.yaml`.
pub fn add_pair_at(home: &Path, pair: PairConfig) -> Result<SyncConfig, ConfigError> {
    add_pair_to(&config_path_at(home), pair)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
