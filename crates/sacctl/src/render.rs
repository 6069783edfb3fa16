//! Plain-text rendering of the association tree and the job list.

use sacctl_model::{Account, AssociationModel, Resource};
use sacctl_parsers::format_walltime;
use sacctl_slurm::{Job, JobState};
use std::fmt::Write;
use std::time::Duration;

const RESOURCES: [(Resource, &str); 3] = [
    (Resource::Cpus, "cpu"),
    (Resource::Gpus, "gpu"),
    (Resource::Walltime, "wall"),
];

fn resource_value(resource: Resource, value: u64) -> String {
    match resource {
        Resource::Walltime => format_walltime(Duration::from_secs(value)),
        _ => value.to_string(),
    }
}

/// Render the account forest, indented, with limits and the ancestors
/// that shadow them.
pub fn render_tree(model: &AssociationModel) -> String {
    let mut out = String::new();
    for root in model.snapshot().roots() {
        render_account(model, root, 0, &mut out);
    }

    let detached: Vec<&str> = model
        .snapshot()
        .users
        .values()
        .filter(|u| u.account.is_none())
        .map(|u| u.name.as_str())
        .collect();
    if !detached.is_empty() {
        out.push_str("(no account)\n");
        for name in detached {
            let _ = writeln!(out, "  @{}", name);
        }
    }
    out
}

fn render_account(model: &AssociationModel, account: &Account, depth: usize, out: &mut String) {
    let pad = "  ".repeat(depth);
    let mut line = format!("{}{}", pad, account.name);
    if !account.limits.is_unlimited() {
        let _ = write!(line, "  [{}]", account.limits);
    }
    for (resource, label) in RESOURCES {
        if let Ok(Some(bottleneck)) = model.limit_bottleneck(&account.name, resource) {
            let _ = write!(
                line,
                "  ({} capped at {} by {})",
                label,
                resource_value(resource, bottleneck.value),
                bottleneck.account
            );
        }
    }
    out.push_str(&line);
    out.push('\n');

    for user in model.snapshot().members_of(&account.name) {
        let _ = writeln!(out, "{}  @{}", pad, user.name);
    }
    for child in model.snapshot().children_of(&account.name) {
        render_account(model, child, depth + 1, out);
    }
}

/// Render the job list as a fixed-width table.
pub fn render_jobs(jobs: &[Job]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<10} {:<24} {:<12} {:<12} {:>5} {:>5} {:>8} {:>12}  {}",
        "JOBID", "NAME", "USER", "ACCOUNT", "CPUS", "GPUS", "MEM", "RUNTIME", "STATE"
    );
    for job in jobs {
        let runtime = job
            .run_time
            .map(format_walltime)
            .unwrap_or_else(|| "-".to_string());
        let mut state = job.state.as_str().to_string();
        if job.state != JobState::Running {
            if let Some(reason) = &job.reason {
                let _ = write!(state, " ({})", reason);
            }
        }
        let _ = writeln!(
            out,
            "{:<10} {:<24} {:<12} {:<12} {:>5} {:>5} {:>8} {:>12}  {}",
            job.job_id,
            job.name,
            job.user.as_deref().unwrap_or("-"),
            job.account.as_deref().unwrap_or("-"),
            job.cpus().unwrap_or("-"),
            job.gpus().unwrap_or("-"),
            job.memory().unwrap_or("-"),
            runtime,
            state
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use sacctl_model::{Snapshot, TresLimits, User};

    fn model() -> AssociationModel {
        let mut snap = Snapshot::default();
        for (name, parent, gpus) in [
            ("root", None, Some(2)),
            ("cs", Some("root"), None),
            ("ml", Some("cs"), Some(8)),
        ] {
            snap.accounts.insert(
                name.to_string(),
                Account {
                    name: name.to_string(),
                    parent: parent.map(str::to_string),
                    limits: TresLimits {
                        max_gpus: gpus,
                        ..TresLimits::default()
                    },
                },
            );
        }
        snap.users.insert(
            "alice".to_string(),
            User {
                name: "alice".to_string(),
                account: Some("ml".to_string()),
            },
        );
        AssociationModel::new(snap)
    }

    #[test]
    fn test_render_tree_nests_and_annotates() {
        let rendered = render_tree(&model());
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "root  [cpu=∞ gpu=2 wall=∞]");
        assert_eq!(lines[1], "  cs  (gpu capped at 2 by root)");
        assert!(lines[2].starts_with("    ml  [cpu=∞ gpu=8 wall=∞]"));
        assert!(lines[2].contains("(gpu capped at 2 by root)"));
        assert_eq!(lines[3], "      @alice");
    }

    #[test]
    fn test_render_tree_detached_users() {
        let mut model = model();
        model.set_user_account("alice", None).unwrap();
        let rendered = render_tree(&model);
        assert!(rendered.contains("(no account)\n  @alice"));
    }

    #[test]
    fn test_render_jobs_table() {
        let job = Job {
            job_id: "42".to_string(),
            name: "train".to_string(),
            state: JobState::Pending,
            user: Some("alice".to_string()),
            account: Some("ml".to_string()),
            tres: Some("cpu=4,mem=16G,gres/gpu=1".to_string()),
            run_time: None,
            time_limit: None,
            node_list: None,
            reason: Some("Dependency".to_string()),
        };
        let rendered = render_jobs(&[job]);
        let row = rendered.lines().nth(1).unwrap();
        assert!(row.starts_with("42"));
        assert!(row.contains("PENDING (Dependency)"));
        assert!(row.contains("16G"));
    }
}
