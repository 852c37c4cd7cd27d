//! Surgical edits of checkout steps on the concrete syntax tree.

use crate::cst::{CollectionStyle, NodeId, Resolved, ScalarStyle, Tree};
use crate::detect::Affected;
use crate::error::{DpcError, Result};
use crate::workflow::{CHECKOUT_PREFIX, PERSIST_CREDENTIALS};
use std::collections::BTreeSet;

const FALSE: &str = "false";

/// Apply whatever `affected` calls for to `content`.
pub fn patch(content: &str, affected: &Affected) -> Result<String> {
    match affected {
        Affected::None => Ok(content.to_string()),
        Affected::Jobs(jobs) => patch_workflow(content, jobs),
        Affected::Action => patch_action(content),
    }
}

/// Patch the checkout steps of the named jobs in every document.
pub fn patch_workflow(content: &str, jobs: &BTreeSet<String>) -> Result<String> {
    let mut tree = Tree::parse(content)?;
    for doc in tree.documents() {
        if tree.mapping(doc).is_none() {
            return Err(DpcError::structure("document body must be a mapping"));
        }
        let jobs_node = tree
            .get(doc, "jobs")
            .ok_or_else(|| DpcError::structure("the field 'jobs' is required"))?;
        let entries = tree
            .mapping(jobs_node)
            .ok_or_else(|| DpcError::structure("jobs must be a mapping"))?
            .entries
            .clone();
        for entry in entries {
            let Some(name) = tree.key_str(&entry).map(str::to_string) else {
                return Err(DpcError::structure("job name must be a string"));
            };
            if !jobs.contains(&name) {
                continue;
            }
            tracing::debug!(job = %name, "patching job");
            patch_job(&mut tree, entry.value).map_err(|e| e.in_job(&name))?;
        }
    }
    Ok(tree.render())
}

/// Patch the checkout steps of a composite action's `runs.steps`.
pub fn patch_action(content: &str) -> Result<String> {
    let mut tree = Tree::parse(content)?;
    for doc in tree.documents() {
        if tree.mapping(doc).is_none() {
            return Err(DpcError::structure("document body must be a mapping"));
        }
        let runs = tree
            .get(doc, "runs")
            .ok_or_else(|| DpcError::structure("the field 'runs' is required"))?;
        if tree.mapping(runs).is_none() {
            return Err(DpcError::structure("runs must be a mapping"));
        }
        if let Some(steps) = tree.get(runs, "steps") {
            patch_steps(&mut tree, steps)?;
        }
    }
    Ok(tree.render())
}

fn patch_job(tree: &mut Tree, job: NodeId) -> Result<()> {
    let fields = tree
        .mapping(job)
        .ok_or_else(|| DpcError::structure("job must be a mapping"))?;
    if fields.entries.is_empty() {
        return Err(DpcError::structure("job doesn't have any field"));
    }
    match tree.get(job, "steps") {
        Some(steps) => patch_steps(tree, steps),
        None => Ok(()),
    }
}

fn patch_steps(tree: &mut Tree, steps: NodeId) -> Result<()> {
    let items = tree
        .sequence(steps)
        .ok_or_else(|| DpcError::structure("steps must be a sequence"))?
        .items
        .clone();
    for step in items {
        if tree.mapping(step).is_none() {
            return Err(DpcError::structure("step must be a mapping"));
        }
        let Some(uses) = tree.get(step, "uses") else {
            continue;
        };
        if tree.is_null(uses) {
            continue;
        }
        if tree.resolve(uses) != Some(Resolved::Str) {
            return Err(DpcError::type_error("uses must be a string"));
        }
        let is_checkout = tree
            .scalar(uses)
            .is_some_and(|s| s.value.starts_with(CHECKOUT_PREFIX));
        if is_checkout {
            patch_checkout(tree, step)?;
        }
    }
    Ok(())
}

/// One of three edits, in priority order: add `with`, add the key to an
/// existing `with`, or flip a truthy value.
fn patch_checkout(tree: &mut Tree, step: NodeId) -> Result<()> {
    let Some(with) = tree.get(step, "with") else {
        let style = tree
            .mapping(step)
            .map_or(CollectionStyle::Block, |m| m.style);
        let with = tree.new_mapping(style);
        let value = tree.new_scalar(ScalarStyle::Plain, FALSE, FALSE);
        tree.push_entry(with, PERSIST_CREDENTIALS, value)?;
        return tree.push_entry(step, "with", with);
    };
    if tree.mapping(with).is_none() {
        return Err(DpcError::structure("with must be a mapping"));
    }
    let Some(current) = tree.get(with, PERSIST_CREDENTIALS) else {
        let value = tree.new_scalar(ScalarStyle::Plain, FALSE, FALSE);
        return tree.push_entry(with, PERSIST_CREDENTIALS, value);
    };
    disable(tree, current)
}

fn disable(tree: &mut Tree, node: NodeId) -> Result<()> {
    let type_error = || {
        DpcError::type_error(format!("{PERSIST_CREDENTIALS} must be a string or boolean"))
    };
    let scalar = tree.scalar(node).ok_or_else(type_error)?;
    let resolved = scalar.resolve(tree.node(node).tag.as_deref());
    let (style, is_false) = (scalar.style, scalar.value == FALSE);
    match resolved {
        Resolved::Bool(false) => Ok(()),
        // Always writes the canonical token; `True`/`TRUE` lose their casing.
        Resolved::Bool(true) => tree.set_scalar(node, FALSE, FALSE),
        Resolved::Str if is_false => Ok(()),
        Resolved::Str => {
            // A plain `false` would turn the string into a boolean.
            let token = match style {
                ScalarStyle::SingleQuoted => "'false'",
                _ => "\"false\"",
            };
            tree.set_scalar(node, FALSE, token)
        }
        Resolved::Null | Resolved::Int | Resolved::Float => Err(type_error()),
    }
}
