//! CLI argument parsing for sacctl.

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "sacctl")]
#[command(about = "Manage Slurm accounts, users and resource limits")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Print the planned sacctmgr calls instead of running them
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Emit the plan as JSON (implies --dry-run)
    #[arg(long, global = true)]
    pub json: bool,

    /// Timeout for each scheduler command, in seconds
    #[arg(long, global = true, default_value = "30")]
    pub timeout: u64,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the account/user hierarchy with resource limits
    Tree,

    /// List jobs known to the controller
    Jobs,

    /// Cancel a job
    Cancel {
        /// Slurm job id
        job_id: String,
    },

    /// Create an account
    AddAccount {
        name: String,
        /// Parent account (omit for a top-level account)
        #[arg(long)]
        parent: Option<String>,
    },

    /// Delete an account (must have no child accounts or users)
    RemoveAccount { name: String },

    /// Create a user
    AddUser {
        name: String,
        /// Account the user belongs to
        #[arg(long)]
        account: Option<String>,
    },

    /// Delete a user
    RemoveUser { name: String },

    /// Reassign an account's parent
    SetParent {
        account: String,
        /// New parent (omit to make the account top-level)
        #[arg(long)]
        parent: Option<String>,
    },

    /// Move a user to another account
    SetUser {
        user: String,
        /// New account (omit to detach the user)
        #[arg(long)]
        account: Option<String>,
    },

    /// Change an account's grouped resource limits
    ///
    /// Limits not mentioned keep their current value.
    SetLimits {
        account: String,
        /// GrpTRES cpu count
        #[arg(long, conflicts_with = "clear_cpus")]
        cpus: Option<u32>,
        /// GrpTRES gres/gpu count
        #[arg(long, conflicts_with = "clear_gpus")]
        gpus: Option<u32>,
        /// GrpWall budget (D-HH:MM:SS, HH:MM:SS or minutes)
        #[arg(long, conflicts_with = "clear_walltime")]
        walltime: Option<String>,
        /// Remove the cpu limit
        #[arg(long)]
        clear_cpus: bool,
        /// Remove the gpu limit
        #[arg(long)]
        clear_gpus: bool,
        /// Remove the wall-time limit
        #[arg(long)]
        clear_walltime: bool,
    },
}
