use crate::error::{DpcError, Result};
use crate::workflow::{
    Document, Job, PersistCredentials, Runs, Step, CHECKOUT_PREFIX, PERSIST_CREDENTIALS,
};
use std::collections::BTreeSet;

/// What a file needs patched, as decided from the semantic view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Affected {
    None,
    /// Names of workflow jobs with at least one non-compliant checkout step.
    Jobs(BTreeSet<String>),
    /// The composite action's `runs.steps` needs patching.
    Action,
}

impl Affected {
    pub fn is_empty(&self) -> bool {
        match self {
            Affected::None => true,
            Affected::Jobs(jobs) => jobs.is_empty(),
            Affected::Action => false,
        }
    }
}

pub fn detect(doc: &Document) -> Result<Affected> {
    match doc {
        Document::Workflow(wf) => {
            let mut jobs = BTreeSet::new();
            for (name, job) in &wf.jobs {
                if !job.is_compliant().map_err(|e| e.in_job(name))? {
                    jobs.insert(name.clone());
                }
            }
            if jobs.is_empty() {
                Ok(Affected::None)
            } else {
                Ok(Affected::Jobs(jobs))
            }
        }
        Document::Action(action) => {
            if action.runs.is_compliant()? {
                Ok(Affected::None)
            } else {
                Ok(Affected::Action)
            }
        }
        Document::Other => Ok(Affected::None),
    }
}

impl Job {
    pub fn is_compliant(&self) -> Result<bool> {
        steps_compliant(&self.steps)
    }
}

impl Runs {
    pub fn is_compliant(&self) -> Result<bool> {
        steps_compliant(&self.steps)
    }
}

// Every step is evaluated so a type error later in the list still surfaces.
fn steps_compliant(steps: &[Step]) -> Result<bool> {
    let mut compliant = true;
    for step in steps {
        if !step.is_compliant()? {
            compliant = false;
        }
    }
    Ok(compliant)
}

impl Step {
    /// Non-checkout steps are always compliant.
    pub fn is_compliant(&self) -> Result<bool> {
        match self.uses()? {
            Some(uses) if uses.starts_with(CHECKOUT_PREFIX) => {}
            _ => return Ok(true),
        }
        match self.persist_credentials() {
            None => Ok(false),
            Some(PersistCredentials::Bool(b)) => Ok(!b),
            Some(PersistCredentials::Str(s)) => Ok(s == "false"),
            Some(PersistCredentials::Other(ty)) => Err(DpcError::type_error(format!(
                "{PERSIST_CREDENTIALS} must be a string or boolean, got {ty}"
            ))),
        }
    }
}
