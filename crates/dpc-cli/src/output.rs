use dpc_core::fix::{FileReport, FileStatus};
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

/// One line per file that changed (or would change), then a summary.
pub fn print_reports(reports: &[FileReport]) {
    let mut changed = 0;
    for report in reports {
        if report.status == FileStatus::Unchanged {
            continue;
        }
        changed += 1;
        if report.jobs.is_empty() {
            println!(
                "{}: {} [{}]",
                report.status.as_str(),
                report.path.display(),
                report.kind
            );
        } else {
            println!(
                "{}: {} [{}] (jobs: {})",
                report.status.as_str(),
                report.path.display(),
                report.kind,
                report.jobs.join(", ")
            );
        }
    }
    println!("{changed} of {} file(s) need changes", reports.len());
}
