//! Run metadata captured when a run starts.

use std::path::{Path, PathBuf};

use provlog_core::id::RunId;
use provlog_core::record::{RunRecord, VcsInfo};

/// Version-control boundary. Extraction of repository, commit, origin and
/// diff is someone else's job; the context only asks.
pub trait VcsProbe: Send + Sync {
    fn probe(&self, script: &Path) -> Option<VcsInfo>;
}

/// Probe that never finds a repository.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoVcs;

impl VcsProbe for NoVcs {
    fn probe(&self, _script: &Path) -> Option<VcsInfo> {
        None
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunMeta {
    pub script: String,
    pub command: String,
    pub command_args: Vec<String>,
    pub author: String,
    pub description: String,
    pub environment: Vec<String>,
}

impl RunMeta {
    /// Metadata for an explicitly named script; environment and author are
    /// taken from the current process.
    pub fn new(script: impl Into<String>) -> Self {
        let script = script.into();
        Self {
            command: script.clone(),
            script,
            command_args: Vec::new(),
            author: current_author(),
            description: String::new(),
            environment: environment_descriptors(),
        }
    }

    /// Describe the current process.
    pub fn capture(description: impl Into<String>) -> Self {
        let mut args = std::env::args();
        let argv0 = args.next().unwrap_or_default();
        let command = std::env::current_exe()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| argv0.clone());
        Self {
            script: absolute(&argv0).display().to_string(),
            command,
            command_args: args.collect(),
            author: current_author(),
            description: description.into(),
            environment: environment_descriptors(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.command_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub(crate) fn into_record(self, id: RunId) -> RunRecord {
        let mut rec = RunRecord::new(id, self.script, self.command);
        rec.command_args = self.command_args;
        rec.author = self.author;
        rec.description = self.description;
        rec.environment = self.environment;
        rec
    }
}

fn current_author() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

fn environment_descriptors() -> Vec<String> {
    vec![
        format!("{} {}", std::env::consts::OS, std::env::consts::ARCH),
        format!("provlog {}", provlog_core::VERSION),
    ]
}

fn absolute(p: &str) -> PathBuf {
    let path = Path::new(p);
    if path.is_absolute() || p.is_empty() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
