//! Persisted run record.
//!
//! Field names are the on-disk keys; keep them stable.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::RunId;

/// Whether an observation is a data input or a data output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Input,
    Output,
}

impl Role {
    pub fn field(self) -> Field {
        match self {
            Role::Input => Field::Inputs,
            Role::Output => Field::Outputs,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Input => f.write_str("input"),
            Role::Output => f.write_str("output"),
        }
    }
}

/// One logged file: a bare path, or a `[path, fingerprint]` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileRef {
    Bare(String),
    Hashed(String, String),
}

impl FileRef {
    pub fn new(path: impl Into<String>, fingerprint: Option<String>) -> Self {
        match fingerprint {
            Some(h) => FileRef::Hashed(path.into(), h),
            None => FileRef::Bare(path.into()),
        }
    }

    pub fn path(&self) -> &str {
        match self {
            FileRef::Bare(p) | FileRef::Hashed(p, _) => p,
        }
    }

    pub fn fingerprint(&self) -> Option<&str> {
        match self {
            FileRef::Bare(_) => None,
            FileRef::Hashed(_, h) => Some(h),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarningRecord {
    pub message: String,
    pub category: String,
    /// Module (source label) the warning originated from, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionInfo {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub traceback: String,
}

/// Keys of a run record addressable through the log store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    UniqueId,
    Author,
    Description,
    Inputs,
    Outputs,
    Script,
    Command,
    CommandArgs,
    Environment,
    Date,
    ExitDate,
    Exception,
    Warnings,
    Notes,
    GitRepo,
    GitCommit,
    GitOrigin,
    Diff,
}

impl Field {
    pub fn key(self) -> &'static str {
        match self {
            Field::UniqueId => "unique_id",
            Field::Author => "author",
            Field::Description => "description",
            Field::Inputs => "inputs",
            Field::Outputs => "outputs",
            Field::Script => "script",
            Field::Command => "command",
            Field::CommandArgs => "command_args",
            Field::Environment => "environment",
            Field::Date => "date",
            Field::ExitDate => "exit_date",
            Field::Exception => "exception",
            Field::Warnings => "warnings",
            Field::Notes => "notes",
            Field::GitRepo => "gitrepo",
            Field::GitCommit => "gitcommit",
            Field::GitOrigin => "gitorigin",
            Field::Diff => "diff",
        }
    }

    /// Fields that `append` may extend.
    pub fn is_list(self) -> bool {
        matches!(
            self,
            Field::Inputs | Field::Outputs | Field::Warnings | Field::CommandArgs | Field::Environment
        )
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Version-control descriptors captured at run start.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VcsInfo {
    pub repo: Option<String>,
    pub commit: Option<String>,
    pub origin: Option<String>,
    pub diff: Option<String>,
}

/// One record per process execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub unique_id: RunId,
    pub author: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub inputs: Vec<FileRef>,
    #[serde(default)]
    pub outputs: Vec<FileRef>,
    pub script: String,
    pub command: String,
    #[serde(default)]
    pub command_args: Vec<String>,
    #[serde(default)]
    pub environment: Vec<String>,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub exit_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<ExceptionInfo>,
    #[serde(default)]
    pub warnings: Vec<WarningRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gitrepo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gitcommit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gitorigin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
}

impl RunRecord {
    /// Fresh record stamped with the current time; inputs/outputs empty.
    pub fn new(unique_id: RunId, script: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            unique_id,
            author: String::new(),
            description: String::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            script: script.into(),
            command: command.into(),
            command_args: Vec::new(),
            environment: Vec::new(),
            date: Utc::now(),
            exit_date: None,
            exception: None,
            warnings: Vec::new(),
            notes: None,
            gitrepo: None,
            gitcommit: None,
            gitorigin: None,
            diff: None,
        }
    }

    pub fn with_vcs(mut self, vcs: VcsInfo) -> Self {
        self.gitrepo = vcs.repo;
        self.gitcommit = vcs.commit;
        self.gitorigin = vcs.origin;
        self.diff = vcs.diff;
        self
    }

    pub fn is_finished(&self) -> bool {
        self.exit_date.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_refs_serialize_as_string_or_pair() {
        let bare = serde_json::to_value(FileRef::new("/a.csv", None)).unwrap();
        assert_eq!(bare, serde_json::json!("/a.csv"));

        let hashed = serde_json::to_value(FileRef::new("/a.csv", Some("ff".into()))).unwrap();
        assert_eq!(hashed, serde_json::json!(["/a.csv", "ff"]));

        let back: FileRef = serde_json::from_value(hashed).unwrap();
        assert_eq!(back.fingerprint(), Some("ff"));
        assert_eq!(back.path(), "/a.csv");
    }

    #[test]
    fn optional_keys_are_omitted() {
        let rec = RunRecord::new(RunId::new(), "s.rs", "cmd");
        let v = serde_json::to_value(&rec).unwrap();
        let obj = v.as_object().unwrap();
        for key in ["unique_id", "inputs", "outputs", "date", "exit_date", "warnings"] {
            assert!(obj.contains_key(key), "missing {key}");
        }
        for key in ["exception", "notes", "gitrepo", "diff"] {
            assert!(!obj.contains_key(key), "unexpected {key}");
        }
    }

    #[test]
    fn role_maps_to_list_field() {
        assert_eq!(Role::Input.field(), Field::Inputs);
        assert_eq!(Role::Output.field().key(), "outputs");
        assert!(Field::Warnings.is_list());
        assert!(!Field::Notes.is_list());
    }
}
