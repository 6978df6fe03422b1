//! Provenance configuration that downstream crates can serialize/deserialize.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::record::Role;

/// Wildcard accepted in the ignore lists.
pub const IGNORE_ALL: &str = "all";

/// Scheme selecting the in-memory log store (tests, dry runs).
pub const MEMORY_DB: &str = "memory://";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvConfig {
    /// Location of the run log. `memory://` keeps it in-process.
    pub db_path: String,

    /// Attach a content fingerprint to every logged input.
    pub hash_inputs: bool,

    /// Attach a content fingerprint to every logged output. Off by default:
    /// observations are taken before the write happens.
    pub hash_outputs: bool,

    /// Suppress the "run recorded" banner.
    pub quiet: bool,

    /// Verbose diagnostics (hook transitions, every observation).
    pub debug: bool,

    /// Module names (or `all`) whose inputs are never patched.
    pub ignored_inputs: Vec<String>,

    /// Module names (or `all`) whose outputs are never patched.
    pub ignored_outputs: Vec<String>,

    pub ignored_metadata: IgnoredMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnoredMetadata {
    /// Skip the version-control probe entirely.
    pub git: bool,
    /// Keep commit/origin but drop the working-tree diff.
    pub diff: bool,
}

impl Default for ProvConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            hash_inputs: true,
            hash_outputs: false,
            quiet: false,
            debug: false,
            ignored_inputs: Vec::new(),
            ignored_outputs: Vec::new(),
            ignored_metadata: IgnoredMetadata::default(),
        }
    }
}

impl ProvConfig {
    /// In-memory store, everything else default.
    pub fn in_memory() -> Self {
        Self {
            db_path: MEMORY_DB.to_string(),
            ..Self::default()
        }
    }

    /// Load from environment variables (PROVLOG_*), falling back to defaults.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("PROVLOG_DB_PATH") {
            if !s.trim().is_empty() {
                cfg.db_path = s;
            }
        }

        if let Some(v) = env_flag("PROVLOG_HASH_INPUTS") {
            cfg.hash_inputs = v;
        }

        if let Some(v) = env_flag("PROVLOG_HASH_OUTPUTS") {
            cfg.hash_outputs = v;
        }

        if let Some(v) = env_flag("PROVLOG_QUIET") {
            cfg.quiet = v;
        }

        if let Some(v) = env_flag("PROVLOG_DEBUG") {
            cfg.debug = v;
        }

        if let Ok(s) = std::env::var("PROVLOG_IGNORED_INPUTS") {
            cfg.ignored_inputs = split_list(&s);
        }

        if let Ok(s) = std::env::var("PROVLOG_IGNORED_OUTPUTS") {
            cfg.ignored_outputs = split_list(&s);
        }

        if let Some(v) = env_flag("PROVLOG_IGNORE_GIT") {
            cfg.ignored_metadata.git = v;
        }

        if let Some(v) = env_flag("PROVLOG_IGNORE_DIFF") {
            cfg.ignored_metadata.diff = v;
        }

        cfg
    }

    /// Parse a YAML document; missing keys take their defaults.
    ///
    /// ```yaml
    /// db_path: /var/lib/provlog/runs.json
    /// hash_outputs: true
    /// ignored_inputs: [numpy]
    /// ignored_metadata: { diff: true }
    /// ```
    pub fn from_yaml_str(src: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(src)?)
    }

    pub fn is_memory(&self) -> bool {
        self.db_path == MEMORY_DB
    }

    /// Whether `module`'s observations of the given role are switched off.
    pub fn is_ignored(&self, role: Role, module: &str) -> bool {
        let list = match role {
            Role::Input => &self.ignored_inputs,
            Role::Output => &self.ignored_outputs,
        };
        list.iter().any(|m| m == IGNORE_ALL || m == module)
    }

    pub fn hashes(&self, role: Role) -> bool {
        match role {
            Role::Input => self.hash_inputs,
            Role::Output => self.hash_outputs,
        }
    }
}

fn default_db_path() -> String {
    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir);
    home.join(".provlog")
        .join("runs.json")
        .to_string_lossy()
        .into_owned()
}

fn env_flag(key: &str) -> Option<bool> {
    let s = std::env::var(key).ok()?;
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(|p| p.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_overrides_defaults() {
        let cfg = ProvConfig::from_yaml_str(
            "db_path: memory://\nhash_outputs: true\nignored_inputs: [numpy]\nignored_metadata: { diff: true }\n",
        )
        .unwrap();
        assert!(cfg.is_memory());
        assert!(cfg.hash_inputs);
        assert!(cfg.hash_outputs);
        assert!(cfg.is_ignored(Role::Input, "numpy"));
        assert!(!cfg.is_ignored(Role::Output, "numpy"));
        assert!(!cfg.ignored_metadata.git);
        assert!(cfg.ignored_metadata.diff);
    }

    #[test]
    fn all_ignores_every_module() {
        let cfg = ProvConfig {
            ignored_outputs: vec![IGNORE_ALL.into()],
            ..ProvConfig::in_memory()
        };
        assert!(cfg.is_ignored(Role::Output, "pandas"));
        assert!(cfg.is_ignored(Role::Output, "anything"));
        assert!(!cfg.is_ignored(Role::Input, "pandas"));
    }

    #[test]
    fn ignore_lists_match_whole_names() {
        let cfg = ProvConfig {
            ignored_inputs: vec!["np".into()],
            ..ProvConfig::in_memory()
        };
        assert!(!cfg.is_ignored(Role::Input, "numpy"));
    }

    #[test]
    fn list_splitting() {
        assert_eq!(split_list(" a, b ,,c"), vec!["a", "b", "c"]);
    }
}
