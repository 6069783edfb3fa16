//! sacctl - Slurm account and limit management from the command line.
//!
//! Each mutating subcommand is one reconciliation pass: query the current
//! association snapshot, apply the edit to the in-memory model, diff
//! against the queried baseline, and turn the changes into sacctmgr calls
//! (printed with --dry-run/--json, executed otherwise). The model is
//! discarded afterwards; the accounting database is the only store.

use clap::Parser;
use miette::{IntoDiagnostic, Result, miette};
use sacctl_cli::{Args, Command};
use sacctl_model::{AssociationModel, TresLimits};
use sacctl_parsers::parse_walltime;
use std::time::Duration;

mod render;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let timeout = Duration::from_secs(args.timeout);

    match &args.command {
        Command::Tree => {
            let snapshot = sacctl_slurm::query_snapshot(timeout)
                .await
                .into_diagnostic()?;
            let model = AssociationModel::new(snapshot);
            print!("{}", render::render_tree(&model));
            Ok(())
        }
        Command::Jobs => {
            let jobs = sacctl_slurm::query_jobs(timeout).await.into_diagnostic()?;
            print!("{}", render::render_jobs(&jobs));
            Ok(())
        }
        Command::Cancel { job_id } => {
            sacctl_slurm::cancel_job(job_id, timeout)
                .await
                .into_diagnostic()?;
            println!("Cancelled job {}", job_id);
            Ok(())
        }
        command => reconcile(command, &args, timeout).await,
    }
}

/// Query, edit, diff, plan, then print or apply.
async fn reconcile(command: &Command, args: &Args, timeout: Duration) -> Result<()> {
    let baseline = sacctl_slurm::query_snapshot(timeout)
        .await
        .into_diagnostic()?;
    let mut model = AssociationModel::new(baseline.clone());

    apply_edit(&mut model, command)?;

    let changes = model.diff(&baseline);
    if changes.is_empty() {
        println!("Nothing to do.");
        return Ok(());
    }

    let calls = sacctl_slurm::plan_changes(&changes).into_diagnostic()?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&calls).into_diagnostic()?
        );
    } else if args.dry_run {
        for call in &calls {
            println!("{}", call);
        }
    } else {
        sacctl_slurm::apply_plan(&calls, timeout)
            .await
            .into_diagnostic()?;
        println!(
            "Applied {} change{}.",
            changes.len(),
            if changes.len() == 1 { "" } else { "s" }
        );
    }
    Ok(())
}

/// Apply one subcommand's edit to the model; validation errors surface as
/// diagnostics and leave nothing to reconcile.
fn apply_edit(model: &mut AssociationModel, command: &Command) -> Result<()> {
    match command {
        Command::AddAccount { name, parent } => model
            .add_account(name, parent.as_deref())
            .into_diagnostic()?,
        Command::RemoveAccount { name } => model.remove_account(name).into_diagnostic()?,
        Command::AddUser { name, account } => {
            model.add_user(name, account.as_deref()).into_diagnostic()?
        }
        Command::RemoveUser { name } => model.remove_user(name).into_diagnostic()?,
        Command::SetParent { account, parent } => model
            .set_parent(account, parent.as_deref())
            .into_diagnostic()?,
        Command::SetUser { user, account } => model
            .set_user_account(user, account.as_deref())
            .into_diagnostic()?,
        Command::SetLimits {
            account,
            cpus,
            gpus,
            walltime,
            clear_cpus,
            clear_gpus,
            clear_walltime,
        } => {
            let current = model.account(account).map(|a| a.limits).unwrap_or_default();
            let walltime = walltime
                .as_deref()
                .map(|s| {
                    parse_walltime(s).ok_or_else(|| miette!("invalid wall-time value: {:?}", s))
                })
                .transpose()?;
            let limits = TresLimits {
                max_cpus: if *clear_cpus { None } else { cpus.or(current.max_cpus) },
                max_gpus: if *clear_gpus { None } else { gpus.or(current.max_gpus) },
                max_walltime: if *clear_walltime {
                    None
                } else {
                    walltime.or(current.max_walltime)
                },
            };
            model.set_limits(account, limits).into_diagnostic()?;
        }
        // read-only commands never reach the reconcile path
        Command::Tree | Command::Jobs | Command::Cancel { .. } => {}
    }
    Ok(())
}
