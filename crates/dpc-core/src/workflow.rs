//! Semantic view of GitHub Actions files.
//!
//! This is the cheap, lossy decode used only to decide whether a file needs
//! patching. Formatting is discarded here; the syntax tree in [`crate::cst`]
//! is what gets edited.

use crate::error::{DpcError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const CHECKOUT_PREFIX: &str = "actions/checkout@";
pub const PERSIST_CREDENTIALS: &str = "persist-credentials";

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Document {
    Workflow(Workflow),
    Action(Action),
    /// Neither `jobs` nor `runs` is present; nothing to patch.
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Workflow,
    Action,
    Other,
}

impl Document {
    pub fn kind(&self) -> DocumentKind {
        match self {
            Document::Workflow(_) => DocumentKind::Workflow,
            Document::Action(_) => DocumentKind::Action,
            Document::Other => DocumentKind::Other,
        }
    }
}

impl DocumentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentKind::Workflow => "workflow",
            DocumentKind::Action => "action",
            DocumentKind::Other => "other",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Workflow {
    #[serde(default, deserialize_with = "null_jobs")]
    pub jobs: BTreeMap<String, Job>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Job {
    #[serde(default, deserialize_with = "null_as_default")]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Action {
    #[serde(default, deserialize_with = "null_as_default")]
    pub runs: Runs,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Runs {
    #[serde(default, deserialize_with = "null_as_default")]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Step {
    /// Kept as a raw value so a non-string `uses` surfaces as a type error
    /// with job context instead of failing the whole decode.
    #[serde(default)]
    pub uses: Option<serde_yaml::Value>,
    #[serde(default)]
    pub with: Option<serde_yaml::Mapping>,
}

impl Step {
    /// The action reference; `None` when `uses` is absent or null.
    pub fn uses(&self) -> Result<Option<&str>> {
        match self.uses.as_ref().map(untag) {
            None | Some(serde_yaml::Value::Null) => Ok(None),
            Some(serde_yaml::Value::String(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(DpcError::type_error("uses must be a string")),
        }
    }

    pub fn is_checkout(&self) -> bool {
        matches!(self.uses(), Ok(Some(u)) if u.starts_with(CHECKOUT_PREFIX))
    }

    /// The `with.persist-credentials` input, if the step sets one.
    pub fn persist_credentials(&self) -> Option<PersistCredentials> {
        self.with
            .as_ref()?
            .get(PERSIST_CREDENTIALS)
            .map(PersistCredentials::from_value)
    }
}

// ---------------------------------------------------------------------------
// PersistCredentials
// ---------------------------------------------------------------------------

/// The only shapes `persist-credentials` may legitimately take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistCredentials {
    Bool(bool),
    Str(String),
    /// Any other YAML type; carries the type name for error messages.
    Other(&'static str),
}

impl PersistCredentials {
    pub fn from_value(value: &serde_yaml::Value) -> Self {
        use serde_yaml::Value;
        match untag(value) {
            Value::Bool(b) => PersistCredentials::Bool(*b),
            Value::String(s) => PersistCredentials::Str(s.clone()),
            Value::Tagged(_) => PersistCredentials::Other("tagged value"),
            Value::Null => PersistCredentials::Other("null"),
            Value::Number(_) => PersistCredentials::Other("number"),
            Value::Sequence(_) => PersistCredentials::Other("sequence"),
            Value::Mapping(_) => PersistCredentials::Other("mapping"),
        }
    }
}

fn untag(value: &serde_yaml::Value) -> &serde_yaml::Value {
    match value {
        serde_yaml::Value::Tagged(tagged) => untag(&tagged.value),
        v => v,
    }
}

// ---------------------------------------------------------------------------
// decode
// ---------------------------------------------------------------------------

/// Decode the first YAML document of `content`.
///
/// `runs` wins over `jobs` when both are present, so a composite action that
/// happens to carry a `jobs` key is still treated as an action.
pub fn decode(content: &[u8]) -> Result<Document> {
    let value = match serde_yaml::Deserializer::from_slice(content).next() {
        Some(de) => serde_yaml::Value::deserialize(de)?,
        None => serde_yaml::Value::Null,
    };
    let Some(mapping) = value.as_mapping() else {
        return Ok(Document::Other);
    };
    if mapping.contains_key("runs") {
        let action: Action = serde_yaml::from_value(value)?;
        return Ok(Document::Action(action));
    }
    if mapping.contains_key("jobs") {
        let workflow: Workflow = serde_yaml::from_value(value)?;
        return Ok(Document::Workflow(workflow));
    }
    Ok(Document::Other)
}

fn null_as_default<'de, D, T>(de: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}

fn null_jobs<'de, D>(de: D) -> std::result::Result<BTreeMap<String, Job>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, Option<Job>>> = Option::deserialize(de)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(name, job)| (name, job.unwrap_or_default()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_workflow_jobs_and_steps() {
        let doc = decode(
            b"on: push\njobs:\n  build:\n    runs-on: ubuntu-latest\n    steps:\n      - uses: actions/checkout@v4\n        with:\n          fetch-depth: 0\n      - run: make\n",
        )
        .unwrap();
        let Document::Workflow(wf) = doc else {
            panic!("expected workflow");
        };
        let steps = &wf.jobs["build"].steps;
        assert_eq!(steps.len(), 2);
        assert!(steps[0].is_checkout());
        assert!(!steps[1].is_checkout());
        assert_eq!(steps[0].persist_credentials(), None);
    }

    #[test]
    fn decodes_composite_action() {
        let doc = decode(
            b"name: setup\nruns:\n  using: composite\n  steps:\n    - uses: actions/checkout@v4\n      with:\n        persist-credentials: \"false\"\n",
        )
        .unwrap();
        let Document::Action(action) = doc else {
            panic!("expected action");
        };
        assert_eq!(
            action.runs.steps[0].persist_credentials(),
            Some(PersistCredentials::Str("false".to_string()))
        );
    }

    #[test]
    fn document_without_jobs_or_runs_is_other() {
        assert!(matches!(decode(b"name: x\non: push\n").unwrap(), Document::Other));
        assert!(matches!(decode(b"").unwrap(), Document::Other));
        assert!(matches!(decode(b"- a\n- b\n").unwrap(), Document::Other));
    }

    #[test]
    fn null_jobs_and_steps_decode_as_empty() {
        let doc = decode(b"jobs:\n  empty:\n  nosteps:\n    steps:\n").unwrap();
        let Document::Workflow(wf) = doc else {
            panic!("expected workflow");
        };
        assert!(wf.jobs["empty"].steps.is_empty());
        assert!(wf.jobs["nosteps"].steps.is_empty());
    }

    #[test]
    fn malformed_yaml_is_a_decode_error() {
        let err = decode(b"jobs:\n  build: [unclosed\n").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Decode);
    }

    #[test]
    fn checkout_prefix_requires_version_separator() {
        let step = Step {
            uses: Some("actions/checkout-extra@v1".into()),
            with: None,
        };
        assert!(!step.is_checkout());
        let step = Step {
            uses: Some("actions/checkout@8ade135a41bc03ea155e62e844d188df1ea18608".into()),
            with: None,
        };
        assert!(step.is_checkout());
    }

    #[test]
    fn non_string_uses_decodes_and_is_a_type_error() {
        let doc = decode(b"jobs:\n  a:\n    steps:\n      - uses: 3\n      - uses:\n").unwrap();
        let Document::Workflow(wf) = doc else {
            panic!("expected workflow");
        };
        let steps = &wf.jobs["a"].steps;
        assert_eq!(
            steps[0].uses().unwrap_err().kind(),
            crate::error::ErrorKind::Type
        );
        assert!(!steps[0].is_checkout());
        assert_eq!(steps[1].uses().unwrap(), None);
    }

    #[test]
    fn persist_credentials_variants() {
        let v: serde_yaml::Value = serde_yaml::from_str("1").unwrap();
        assert_eq!(PersistCredentials::from_value(&v), PersistCredentials::Other("number"));
        let v: serde_yaml::Value = serde_yaml::from_str("true").unwrap();
        assert_eq!(PersistCredentials::from_value(&v), PersistCredentials::Bool(true));
        let v: serde_yaml::Value = serde_yaml::from_str("~").unwrap();
        assert_eq!(PersistCredentials::from_value(&v), PersistCredentials::Other("null"));
    }
}
