//! File orchestration: discover, plan every file, then write.

use crate::detect::{detect, Affected};
use crate::error::{DpcError, Result};
use crate::io::atomic_write;
use crate::patch::patch;
use crate::workflow::{decode, DocumentKind};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Directory scanned when no files are given, relative to the root.
pub const WORKFLOWS_DIR: &str = ".github/workflows";

#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    /// Report what would change without writing anything.
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Unchanged,
    Updated,
    WouldUpdate,
}

impl FileStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FileStatus::Unchanged => "unchanged",
            FileStatus::Updated => "updated",
            FileStatus::WouldUpdate => "would_update",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub kind: DocumentKind,
    pub status: FileStatus,
    /// Workflow jobs that had a non-compliant checkout step.
    pub jobs: Vec<String>,
}

/// Result of running the pipeline on one file's content, before any write.
#[derive(Debug, Clone)]
pub struct Fixed {
    pub kind: DocumentKind,
    pub affected: Affected,
    pub content: String,
}

impl Fixed {
    pub fn changed(&self, original: &[u8]) -> bool {
        self.content.as_bytes() != original
    }
}

/// Workflow files under `root`: `*.yaml` first, then `*.yml`, each sorted.
/// Subdirectories are not searched.
pub fn discover(root: &Path) -> Result<Vec<PathBuf>> {
    let dir = root.join(WORKFLOWS_DIR);
    let dir = dir
        .to_str()
        .ok_or_else(|| DpcError::Glob(format!("path is not valid UTF-8: {}", dir.display())))?;
    let base = glob::Pattern::escape(dir);

    let mut files = Vec::new();
    for ext in ["yaml", "yml"] {
        let pattern = format!("{base}/*.{ext}");
        let entries = glob::glob(&pattern).map_err(|e| DpcError::Glob(e.to_string()))?;
        for entry in entries {
            let path = entry.map_err(|e| DpcError::Glob(e.to_string()))?;
            if path.is_file() {
                files.push(path);
            }
        }
    }
    tracing::debug!(root = %root.display(), count = files.len(), "discovered workflow files");
    Ok(files)
}

/// Decode, detect and patch `content` in memory.
pub fn fix_content(content: &[u8]) -> Result<Fixed> {
    let doc = decode(content)?;
    let kind = doc.kind();
    let affected = detect(&doc)?;
    let text = std::str::from_utf8(content)?;
    let content = if affected.is_empty() {
        text.to_string()
    } else {
        patch(text, &affected)?
    };
    Ok(Fixed {
        kind,
        affected,
        content,
    })
}

struct Plan {
    path: PathBuf,
    fixed: Fixed,
    changed: bool,
}

/// Fix `files` in order. Every file is planned before anything is written, so
/// an error in any file leaves all of them untouched.
pub fn run(files: &[PathBuf], opts: &Options) -> Result<Vec<FileReport>> {
    let mut plans = Vec::with_capacity(files.len());
    for path in files {
        let plan = plan_file(path).map_err(|e| e.in_file(path))?;
        plans.push(plan);
    }

    let mut reports = Vec::with_capacity(plans.len());
    for plan in plans {
        let status = match (plan.changed, opts.dry_run) {
            (false, _) => {
                tracing::debug!(file = %plan.path.display(), "already compliant");
                FileStatus::Unchanged
            }
            (true, true) => {
                tracing::info!(file = %plan.path.display(), "would update (dry run)");
                FileStatus::WouldUpdate
            }
            (true, false) => {
                atomic_write(&plan.path, plan.fixed.content.as_bytes())
                    .map_err(|e| e.in_file(&plan.path))?;
                tracing::info!(file = %plan.path.display(), "updated");
                FileStatus::Updated
            }
        };
        let jobs = match &plan.fixed.affected {
            Affected::Jobs(jobs) => jobs.iter().cloned().collect(),
            Affected::None | Affected::Action => Vec::new(),
        };
        reports.push(FileReport {
            path: plan.path,
            kind: plan.fixed.kind,
            status,
            jobs,
        });
    }
    Ok(reports)
}

fn plan_file(path: &Path) -> Result<Plan> {
    let original = std::fs::read(path)?;
    let fixed = fix_content(&original)?;
    if let Affected::Jobs(jobs) = &fixed.affected {
        for job in jobs {
            tracing::debug!(file = %path.display(), job = %job, "job needs patching");
        }
    }
    let changed = fixed.changed(&original);
    Ok(Plan {
        path: path.to_path_buf(),
        fixed,
        changed,
    })
}
