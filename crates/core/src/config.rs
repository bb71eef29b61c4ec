//! ACL component configuration via `acl.toml`
//!
//! The raw [`AclConfig`] mirrors the file and leaves the required options
//! optional so a missing key can be reported by name. [`AclConfig::validate`]
//! turns it into [`FilterSettings`], which is what the component runs on.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config file name conventionally placed next to the index.
pub const CONFIG_FILE_NAME: &str = "acl.toml";

/// Default upper bound on cached segment filters.
pub const DEFAULT_MAX_CACHE_ENTRIES: usize = 1024;

/// ACL configuration loaded from `acl.toml`.
///
/// # Example
///
/// ```toml
/// principals_parameter = "principals"
/// principals_field = "readers"
/// max_cache_entries = 1024
/// cache_low_water_mark = 921
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AclConfig {
    /// Request parameter carrying the comma-separated principal list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principals_parameter: Option<String>,
    /// Indexed field whose postings list, per principal, the readable documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principals_field: Option<String>,
    /// Upper bound on cached entries.
    #[serde(default = "default_max_cache_entries")]
    pub max_cache_entries: usize,
    /// Entry count to settle at after an eviction pass (default: 90% of max).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_low_water_mark: Option<usize>,
    /// Number of most recently used principal sets to prebuild for a new snapshot.
    #[serde(default)]
    pub autowarm_count: usize,
}

fn default_max_cache_entries() -> usize {
    DEFAULT_MAX_CACHE_ENTRIES
}

impl Default for AclConfig {
    fn default() -> Self {
        AclConfig {
            principals_parameter: None,
            principals_field: None,
            max_cache_entries: DEFAULT_MAX_CACHE_ENTRIES,
            cache_low_water_mark: None,
            autowarm_count: 0,
        }
    }
}

/// Validated settings the ACL component runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSettings {
    /// Request parameter carrying the principal list
    pub principals_parameter: String,
    /// Indexed readers field
    pub principals_field: String,
    /// Upper bound on cached entries
    pub max_cache_entries: usize,
    /// Target entry count after eviction
    pub cache_low_water_mark: usize,
    /// Principal sets to prebuild on warm
    pub autowarm_count: usize,
}

impl AclConfig {
    /// Config with both required options set and defaults elsewhere.
    pub fn new(principals_parameter: impl Into<String>, principals_field: impl Into<String>) -> Self {
        AclConfig {
            principals_parameter: Some(principals_parameter.into()),
            principals_field: Some(principals_field.into()),
            max_cache_entries: DEFAULT_MAX_CACHE_ENTRIES,
            cache_low_water_mark: None,
            autowarm_count: 0,
        }
    }

    /// Set the cache bounds.
    pub fn with_cache_bounds(mut self, max_entries: usize, low_water_mark: usize) -> Self {
        self.max_cache_entries = max_entries;
        self.cache_low_water_mark = Some(low_water_mark);
        self
    }

    /// Set the autowarm count.
    pub fn with_autowarm(mut self, count: usize) -> Self {
        self.autowarm_count = count;
        self
    }

    /// Check required options and cache bounds.
    ///
    /// # Errors
    ///
    /// `MissingConfig` if a required option is absent or blank,
    /// `InvalidConfig` if the cache bounds are inconsistent.
    pub fn validate(&self) -> Result<FilterSettings> {
        let principals_parameter = required(&self.principals_parameter, "principals_parameter")?;
        let principals_field = required(&self.principals_field, "principals_field")?;

        if self.max_cache_entries == 0 {
            return Err(Error::InvalidConfig(
                "max_cache_entries must be at least 1".to_string(),
            ));
        }
        let low_water_mark = self
            .cache_low_water_mark
            .unwrap_or_else(|| (self.max_cache_entries * 9 / 10).max(1));
        if low_water_mark == 0 || low_water_mark > self.max_cache_entries {
            return Err(Error::InvalidConfig(format!(
                "cache_low_water_mark {} must be between 1 and max_cache_entries {}",
                low_water_mark, self.max_cache_entries
            )));
        }

        Ok(FilterSettings {
            principals_parameter,
            principals_field,
            max_cache_entries: self.max_cache_entries,
            cache_low_water_mark: low_water_mark,
            autowarm_count: self.autowarm_count,
        })
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Strata ACL filter configuration
#
# Request parameter carrying the comma-separated principal list (required)
principals_parameter = "principals"

# Indexed field listing, per principal, the documents it may read (required)
principals_field = "readers"

# Upper bound on cached segment filters (default: 1024)
max_cache_entries = 1024

# Entry count to settle at after an eviction pass (default: 90% of max)
# cache_low_water_mark = 921

# Most recently used principal sets to prebuild for a new index snapshot
autowarm_count = 0
"#
    }

    /// Parse config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the text is not valid TOML for this schema.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::InvalidConfig(format!("Failed to parse config: {}", e)))
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            Error::InvalidConfig(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml())?;
        }
        Ok(())
    }
}

fn required(value: &Option<String>, name: &'static str) -> Result<String> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(Error::MissingConfig(name)),
    }
}
