//! `.brrr-tidy.toml` configuration support.
//!
//! The engine consumes a read-only [`TidyConfig`] snapshot that is threaded
//! explicitly into every stage. Files are discovered by walking up to the
//! nearest `.git` root.
//!
//! # Example config
//!
//! ```toml
//! [directives]
//! order = ["doc", "behaviour", "use", "import", "alias", "require"]
//! sort = "default"          # or "ascii"
//! expand_groups = true
//!
//! [alias_lifting]
//! enabled = true
//! min_depth = 1
//! min_frequency = 1
//! include = ["^MyApp\\."]
//! exclude_namespaces = ["Ecto"]
//! exclude_last_names = ["Config"]
//!
//! [markers]
//! skip_all = "brrr-tidy: skip"
//! keep_order = "brrr-tidy: keep-order"
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::reorg::Category;

/// Name of the config file.
pub const CONFIG_FILE_NAME: &str = ".brrr-tidy.toml";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error reading {0}: {1}")]
    Io(PathBuf, std::io::Error),

    #[error("invalid TOML: {0}")]
    Parse(toml::de::Error),

    #[error("category '{0}' cannot be ordered")]
    InvalidCategory(String),

    #[error("category '{0}' listed more than once in directives.order")]
    DuplicateCategory(String),

    #[error("invalid alias_lifting.include pattern '{0}': {1}")]
    InvalidPattern(String, String),

    #[error("marker '{0}' must not be empty")]
    EmptyMarker(&'static str),
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Comparison used when sorting declarations within a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// Case-insensitive keys, case-sensitive tie-break.
    #[default]
    Default,
    /// Raw byte comparison.
    Ascii,
}

/// Top-level `.brrr-tidy.toml` configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TidyConfig {
    #[serde(default)]
    pub directives: DirectivesConfig,

    #[serde(default)]
    pub alias_lifting: AliasLiftingConfig,

    #[serde(default)]
    pub markers: MarkersConfig,
}

/// Category order, sort mode and group expansion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DirectivesConfig {
    /// Category order. Categories left out are placed after the listed ones.
    #[serde(default = "default_order")]
    pub order: Vec<Category>,

    #[serde(default)]
    pub sort: SortMode,

    /// Expand `Prefix.{A, B}` into one declaration per target.
    #[serde(default = "default_true")]
    pub expand_groups: bool,
}

impl Default for DirectivesConfig {
    fn default() -> Self {
        Self {
            order: default_order(),
            sort: SortMode::Default,
            expand_groups: true,
        }
    }
}

/// Alias lifting thresholds and filters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AliasLiftingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// A name is lifted only if it has strictly more segments than this.
    #[serde(default = "default_threshold")]
    pub min_depth: usize,

    /// A name is lifted only if it occurs strictly more often than this.
    #[serde(default = "default_threshold")]
    pub min_frequency: usize,

    /// Regexes matched against the dotted path. Empty means everything.
    #[serde(default)]
    pub include: Vec<String>,

    /// Root segments whose names are never lifted.
    #[serde(default)]
    pub exclude_namespaces: Vec<String>,

    /// Short names that are never introduced by lifting.
    #[serde(default)]
    pub exclude_last_names: Vec<String>,
}

impl Default for AliasLiftingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_depth: default_threshold(),
            min_frequency: default_threshold(),
            include: Vec::new(),
            exclude_namespaces: Vec::new(),
            exclude_last_names: Vec::new(),
        }
    }
}

/// Inline comment markers that opt a scope out of processing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MarkersConfig {
    /// Leave the scope untouched.
    #[serde(default = "default_skip_marker")]
    pub skip_all: String,

    /// Expand and lift, but keep document order within each category.
    #[serde(default = "default_keep_order_marker")]
    pub keep_order: String,
}

impl Default for MarkersConfig {
    fn default() -> Self {
        Self {
            skip_all: default_skip_marker(),
            keep_order: default_keep_order_marker(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_threshold() -> usize {
    1
}

fn default_order() -> Vec<Category> {
    vec![
        Category::Doc,
        Category::Behaviour,
        Category::Capability,
        Category::Import,
        Category::Alias,
        Category::Require,
    ]
}

fn default_skip_marker() -> String {
    "brrr-tidy: skip".to_string()
}

fn default_keep_order_marker() -> String {
    "brrr-tidy: keep-order".to_string()
}

// ---------------------------------------------------------------------------
// Category ranking
// ---------------------------------------------------------------------------

impl DirectivesConfig {
    /// Position of `category` in the effective order. Unlisted categories
    /// rank after every listed one, in their canonical order.
    pub fn rank(&self, category: Category) -> usize {
        match self.order.iter().position(|c| *c == category) {
            Some(index) => index,
            None => self.order.len() + category.canonical_index(),
        }
    }

    /// Every declaration category in effective order.
    pub fn ordered_categories(&self) -> Vec<Category> {
        let mut all = Category::DECLARATIONS.to_vec();
        all.sort_by_key(|c| self.rank(*c));
        all
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

impl TidyConfig {
    /// Parse a `.brrr-tidy.toml` file from a string.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Parse)
    }

    /// Load and validate a `.brrr-tidy.toml` file from disk.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate semantic constraints that the TOML schema cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for category in &self.directives.order {
            if *category == Category::Other {
                return Err(ConfigError::InvalidCategory(category.as_str().to_string()));
            }
            if !seen.insert(*category) {
                return Err(ConfigError::DuplicateCategory(category.as_str().to_string()));
            }
        }

        for pattern in &self.alias_lifting.include {
            regex::Regex::new(pattern)
                .map_err(|e| ConfigError::InvalidPattern(pattern.clone(), e.to_string()))?;
        }

        if self.markers.skip_all.trim().is_empty() {
            return Err(ConfigError::EmptyMarker("skip_all"));
        }
        if self.markers.keep_order.trim().is_empty() {
            return Err(ConfigError::EmptyMarker("keep_order"));
        }

        Ok(())
    }

    /// Generate a default `.brrr-tidy.toml` config as a string.
    pub fn default_toml() -> &'static str {
        r#"# brrr-tidy configuration file

# Declaration ordering.
[directives]
order = ["doc", "behaviour", "use", "import", "alias", "require"]
# "default" compares case-insensitively, "ascii" compares raw bytes.
sort = "default"
expand_groups = true

# Promotion of deep, frequently used names into aliases.
[alias_lifting]
enabled = true
min_depth = 1
min_frequency = 1
# include = ["^MyApp\\."]
# exclude_namespaces = ["Ecto"]
# exclude_last_names = ["Config"]

# Comment markers that opt a module out.
[markers]
skip_all = "brrr-tidy: skip"
keep_order = "brrr-tidy: keep-order"
"#
    }
}

// ---------------------------------------------------------------------------
// Config file discovery
// ---------------------------------------------------------------------------

/// Nearest `.brrr-tidy.toml` at or above `start_dir`. The search never
/// leaves the enclosing repository: a directory holding `.git` is the last
/// one checked. `start_dir` may also name a file, in which case its
/// directory is the starting point.
pub fn discover_config(start_dir: &Path) -> Option<PathBuf> {
    let start = if start_dir.is_file() {
        start_dir.parent()?
    } else {
        start_dir
    };

    start
        .ancestors()
        .scan(false, |past_root, dir| {
            if *past_root {
                return None;
            }
            *past_root = dir.join(".git").exists();
            Some(dir.join(CONFIG_FILE_NAME))
        })
        .find(|candidate| candidate.is_file())
}

/// Discover and load the config file. Returns `Ok(None)` if none is found.
pub fn discover_and_load_config(
    start_dir: &Path,
) -> Result<Option<(TidyConfig, PathBuf)>, ConfigError> {
    match discover_config(start_dir) {
        Some(path) => {
            let config = TidyConfig::load(&path)?;
            Ok(Some((config, path)))
        }
        None => Ok(None),
    }
}
