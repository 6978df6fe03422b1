//! Patch plans.
//!
//! A plan lists, per target module, which attribute paths are inputs, which
//! are outputs, and which decide at call time. Plans are static data; they
//! are built once and only read afterwards.
//!
//! YAML form:
//! ```yaml
//! plans:
//!   - module: tables
//!     entries:
//!       - { path: read_csv, role: input, arg: 0 }
//!       - { path: Frame.to_csv, role: output, arg: 1, arg_name: path }
//!       - path: open
//!         role: conditional
//!         arg: 0
//!         keyword: mode
//!         keyword_position: 1
//!         input_values: [r, a]
//!         output_values: [w, a]
//!         default: r
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use provlog_core::config::ProvConfig;
use provlog_core::record::Role;

use crate::error::PatchError;

/// Which argument carries the file path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgRef {
    pub position: usize,
    /// Keyword to try when the position is not supplied positionally. When
    /// unset, the parameter name at `position` in the callable's signature is
    /// used.
    pub keyword: Option<String>,
}

impl ArgRef {
    pub fn new(position: usize) -> Self {
        Self {
            position,
            keyword: None,
        }
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }
}

impl From<usize> for ArgRef {
    fn from(position: usize) -> Self {
        Self::new(position)
    }
}

/// Call-time classification: read the discriminator passed as `keyword`,
/// else the positional slot `position` (or the slot the callable's signature
/// gives `keyword`), else `default`. Then check membership in each value set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionalRule {
    pub keyword: String,
    #[serde(default)]
    pub position: Option<usize>,
    pub input_values: BTreeSet<String>,
    pub output_values: BTreeSet<String>,
    pub default: String,
}

impl ConditionalRule {
    pub fn new<I, O>(
        keyword: impl Into<String>,
        input_values: I,
        output_values: O,
        default: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        O: IntoIterator,
        O::Item: Into<String>,
    {
        Self {
            keyword: keyword.into(),
            position: None,
            input_values: input_values.into_iter().map(Into::into).collect(),
            output_values: output_values.into_iter().map(Into::into).collect(),
            default: default.into(),
        }
    }

    /// Positional slot of the discriminator, for callables whose signature
    /// does not name it.
    pub fn with_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    /// Roles for one discriminator value, input first. Empty when the value
    /// is in neither set.
    pub fn classify(&self, value: &str) -> Vec<Role> {
        let mut roles = Vec::with_capacity(2);
        if self.input_values.contains(value) {
            roles.push(Role::Input);
        }
        if self.output_values.contains(value) {
            roles.push(Role::Output);
        }
        roles
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchRole {
    Input,
    Output,
    Conditional(ConditionalRule),
}

impl PatchRole {
    /// Whether configuration switches this entry off entirely. Conditional
    /// entries stay patched while either category is still wanted.
    pub fn is_ignored(&self, cfg: &ProvConfig, module: &str) -> bool {
        match self {
            PatchRole::Input => cfg.is_ignored(Role::Input, module),
            PatchRole::Output => cfg.is_ignored(Role::Output, module),
            PatchRole::Conditional(_) => {
                cfg.is_ignored(Role::Input, module) && cfg.is_ignored(Role::Output, module)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchEntry {
    /// Dotted attribute path from the module root, e.g. `Model.save`.
    pub path: String,
    pub role: PatchRole,
    pub arg: ArgRef,
    /// Label handed to the recorder; usually the module name.
    pub source_label: String,
}

impl PatchEntry {
    pub fn input(
        path: impl Into<String>,
        arg: impl Into<ArgRef>,
        source_label: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            role: PatchRole::Input,
            arg: arg.into(),
            source_label: source_label.into(),
        }
    }

    pub fn output(
        path: impl Into<String>,
        arg: impl Into<ArgRef>,
        source_label: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            role: PatchRole::Output,
            arg: arg.into(),
            source_label: source_label.into(),
        }
    }

    pub fn conditional(
        path: impl Into<String>,
        arg: impl Into<ArgRef>,
        rule: ConditionalRule,
        source_label: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            role: PatchRole::Conditional(rule),
            arg: arg.into(),
            source_label: source_label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchPlan {
    pub module: String,
    pub entries: Vec<PatchEntry>,
}

impl PatchPlan {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            entries: Vec::new(),
        }
    }

    pub fn entry(mut self, entry: PatchEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn inputs(mut self, paths: &[&str], arg: usize) -> Self {
        for p in paths {
            let e = PatchEntry::input(*p, arg, self.module.clone());
            self.entries.push(e);
        }
        self
    }

    pub fn outputs(mut self, paths: &[&str], arg: usize) -> Self {
        for p in paths {
            let e = PatchEntry::output(*p, arg, self.module.clone());
            self.entries.push(e);
        }
        self
    }
}

/// Patch plans keyed by exact module name.
#[derive(Debug, Clone, Default)]
pub struct PatchPlanRegistry {
    plans: BTreeMap<String, PatchPlan>,
}

impl PatchPlanRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a plan; entries for an already-registered module are appended.
    pub fn register(&mut self, plan: PatchPlan) -> &mut Self {
        match self.plans.get_mut(&plan.module) {
            Some(existing) => existing.entries.extend(plan.entries),
            None => {
                self.plans.insert(plan.module.clone(), plan);
            }
        }
        self
    }

    pub fn plan_for(&self, module: &str) -> Option<&PatchPlan> {
        self.plans.get(module)
    }

    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.plans.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    /// Entries for `module` that survive the configured ignore lists.
    pub fn effective_entries(&self, module: &str, cfg: &ProvConfig) -> Vec<PatchEntry> {
        let Some(plan) = self.plans.get(module) else {
            return Vec::new();
        };
        plan.entries
            .iter()
            .filter(|e| !e.role.is_ignored(cfg, module))
            .cloned()
            .collect()
    }

    pub fn from_yaml_str(src: &str) -> Result<Self, PatchError> {
        let doc: PlanDoc = serde_yaml::from_str(src)?;
        let mut reg = Self::new();
        for p in doc.plans {
            let mut plan = PatchPlan::new(p.module.clone());
            for raw in p.entries {
                plan.entries.push(raw.into_entry(&p.module)?);
            }
            reg.register(plan);
        }
        Ok(reg)
    }
}

#[derive(Debug, Deserialize)]
struct PlanDoc {
    #[serde(default)]
    plans: Vec<PlanDef>,
}

#[derive(Debug, Deserialize)]
struct PlanDef {
    module: String,
    #[serde(default)]
    entries: Vec<EntryDef>,
}

#[derive(Debug, Deserialize)]
struct EntryDef {
    path: String,
    role: String,
    #[serde(default)]
    arg: usize,
    #[serde(default)]
    arg_name: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    keyword: Option<String>,
    #[serde(default)]
    keyword_position: Option<usize>,
    #[serde(default)]
    input_values: Vec<String>,
    #[serde(default)]
    output_values: Vec<String>,
    #[serde(default)]
    default: Option<String>,
}

impl EntryDef {
    fn into_entry(self, module: &str) -> Result<PatchEntry, PatchError> {
        let role = match self.role.as_str() {
            "input" => PatchRole::Input,
            "output" => PatchRole::Output,
            "conditional" => {
                let keyword = self.keyword.ok_or_else(|| {
                    PatchError::InvalidPlan(format!(
                        "{module}.{}: conditional entry needs a 'keyword'",
                        self.path
                    ))
                })?;
                let default = self.default.ok_or_else(|| {
                    PatchError::InvalidPlan(format!(
                        "{module}.{}: conditional entry needs a 'default'",
                        self.path
                    ))
                })?;
                let mut rule = ConditionalRule::new(
                    keyword,
                    self.input_values,
                    self.output_values,
                    default,
                );
                if let Some(position) = self.keyword_position {
                    rule = rule.with_position(position);
                }
                PatchRole::Conditional(rule)
            }
            other => {
                return Err(PatchError::InvalidPlan(format!(
                    "{module}.{}: unknown role '{other}'",
                    self.path
                )))
            }
        };
        let mut arg = ArgRef::new(self.arg);
        arg.keyword = self.arg_name;
        Ok(PatchEntry {
            path: self.path,
            role,
            arg,
            source_label: self.source.unwrap_or_else(|| module.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
plans:
  - module: tables
    entries:
      - { path: read_csv, role: input, arg: 0 }
      - { path: Frame.to_csv, role: output, arg: 1, arg_name: path, source: tables-io }
      - path: open
        role: conditional
        keyword: mode
        keyword_position: 1
        input_values: [r, a]
        output_values: [w, a]
        default: r
  - module: arrays
    entries:
      - { path: load, role: input }
"#;

    #[test]
    fn yaml_plans_parse() {
        let reg = PatchPlanRegistry::from_yaml_str(YAML).unwrap();
        assert_eq!(reg.modules().collect::<Vec<_>>(), vec!["arrays", "tables"]);
        let plan = reg.plan_for("tables").unwrap();
        assert_eq!(plan.entries.len(), 3);
        assert_eq!(plan.entries[0].source_label, "tables");
        assert_eq!(plan.entries[1].arg, ArgRef::new(1).with_keyword("path"));
        assert_eq!(plan.entries[1].source_label, "tables-io");
        match &plan.entries[2].role {
            PatchRole::Conditional(rule) => {
                assert_eq!(rule.default, "r");
                assert_eq!(rule.position, Some(1));
                assert_eq!(rule.classify("a"), vec![Role::Input, Role::Output]);
            }
            other => panic!("expected conditional, got {other:?}"),
        }
    }

    #[test]
    fn conditional_without_keyword_is_rejected() {
        let err = PatchPlanRegistry::from_yaml_str(
            "plans:\n  - module: m\n    entries:\n      - { path: open, role: conditional, default: r }\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("needs a 'keyword'"));
    }

    #[test]
    fn unknown_role_is_rejected() {
        let err = PatchPlanRegistry::from_yaml_str(
            "plans:\n  - module: m\n    entries:\n      - { path: f, role: both }\n",
        )
        .unwrap_err();
        assert!(matches!(err, PatchError::InvalidPlan(_)));
    }

    #[test]
    fn registering_twice_merges_entries() {
        let mut reg = PatchPlanRegistry::new();
        reg.register(PatchPlan::new("m").inputs(&["a"], 0));
        reg.register(PatchPlan::new("m").outputs(&["b"], 0));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.plan_for("m").unwrap().entries.len(), 2);
    }

    #[test]
    fn ignore_lists_filter_entries() {
        let reg = PatchPlanRegistry::from_yaml_str(YAML).unwrap();
        let cfg = ProvConfig {
            ignored_inputs: vec!["tables".into()],
            ..ProvConfig::in_memory()
        };
        let kept: Vec<_> = reg
            .effective_entries("tables", &cfg)
            .into_iter()
            .map(|e| e.path)
            .collect();
        assert_eq!(kept, vec!["Frame.to_csv", "open"]);

        let cfg = ProvConfig {
            ignored_inputs: vec!["all".into()],
            ignored_outputs: vec!["all".into()],
            ..ProvConfig::in_memory()
        };
        assert!(reg.effective_entries("tables", &cfg).is_empty());
        assert!(reg.effective_entries("unknown", &ProvConfig::in_memory()).is_empty());
    }

    #[test]
    fn classify_outside_both_sets_is_empty() {
        let rule = ConditionalRule::new("mode", ["r"], ["w"], "r");
        assert!(rule.classify("x").is_empty());
        assert_eq!(rule.classify("w"), vec![Role::Output]);
    }
}
