//! Job listing via scontrol and cancellation via scancel.

use crate::command;
use crate::error::BridgeError;
use sacctl_parsers::{parse_walltime, tres_value};
use std::time::Duration;
use tokio::process::Command;

/// Slurm job state, reduced to what the job view distinguishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Suspended,
    Completing,
    Completed,
    Cancelled,
    Failed,
    Timeout,
    NodeFail,
    Unknown(String),
}

impl JobState {
    fn parse(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "PENDING" => Self::Pending,
            "RUNNING" => Self::Running,
            "SUSPENDED" => Self::Suspended,
            "COMPLETING" => Self::Completing,
            "COMPLETED" => Self::Completed,
            "CANCELLED" => Self::Cancelled,
            "FAILED" => Self::Failed,
            "TIMEOUT" => Self::Timeout,
            "NODE_FAIL" => Self::NodeFail,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Suspended => "SUSPENDED",
            Self::Completing => "COMPLETING",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
            Self::Failed => "FAILED",
            Self::Timeout => "TIMEOUT",
            Self::NodeFail => "NODE_FAIL",
            Self::Unknown(s) => s,
        }
    }
}

/// One job as reported by `scontrol show job`.
#[derive(Debug, Clone)]
pub struct Job {
    pub job_id: String,
    pub name: String,
    pub state: JobState,
    pub user: Option<String>,
    pub account: Option<String>,
    /// Raw allocated TRES string (`cpu=4,mem=16G,gres/gpu=1,...`)
    pub tres: Option<String>,
    pub run_time: Option<Duration>,
    pub time_limit: Option<Duration>,
    pub node_list: Option<String>,
    /// Pending reason, if the scheduler reports one
    pub reason: Option<String>,
}

impl Job {
    pub fn cpus(&self) -> Option<&str> {
        self.tres.as_deref().and_then(|t| tres_value(t, "cpu"))
    }

    pub fn gpus(&self) -> Option<&str> {
        self.tres.as_deref().and_then(|t| tres_value(t, "gres/gpu"))
    }

    pub fn memory(&self) -> Option<&str> {
        self.tres.as_deref().and_then(|t| tres_value(t, "mem"))
    }
}

/// Normalize scontrol's placeholder values to absent.
fn non_empty(value: &str) -> Option<String> {
    match value {
        "" | "(null)" | "N/A" | "None" => None,
        other => Some(other.to_string()),
    }
}

/// Parse one `--oneline` job record: whitespace-separated `Key=Value`
/// pairs, values never containing spaces in the fields read here.
fn parse_job_line(line: &str) -> Result<Job, BridgeError> {
    let mut job_id = None;
    let mut name = None;
    let mut state = None;
    let mut user = None;
    let mut account = None;
    let mut tres = None;
    let mut run_time = None;
    let mut time_limit = None;
    let mut node_list = None;
    let mut reason = None;

    for pair in line.split_whitespace() {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        match key {
            "JobId" => job_id = Some(value.to_string()),
            "JobName" => name = Some(value.to_string()),
            "JobState" => state = Some(JobState::parse(value)),
            // UserId is formatted as name(uid)
            "UserId" => {
                user = non_empty(value.split('(').next().unwrap_or(value));
            }
            "Account" => account = non_empty(value),
            "TRES" => tres = non_empty(value),
            "RunTime" => run_time = parse_walltime(value),
            "TimeLimit" => time_limit = parse_walltime(value),
            "NodeList" => node_list = non_empty(value),
            "Reason" => reason = non_empty(value),
            _ => {}
        }
    }

    let job_id = job_id.ok_or_else(|| BridgeError::Parse {
        command: "scontrol".to_string(),
        message: format!("job record without JobId: {}", line),
    })?;

    Ok(Job {
        job_id,
        name: name.unwrap_or_default(),
        state: state.unwrap_or_else(|| JobState::Unknown(String::new())),
        user,
        account,
        tres,
        run_time,
        time_limit,
        node_list,
        reason,
    })
}

/// List all jobs known to the controller.
pub async fn query_jobs(timeout: Duration) -> Result<Vec<Job>, BridgeError> {
    let mut cmd = Command::new("scontrol");
    cmd.args(["show", "job", "--oneliner", "--details"]);

    let stdout = match command::run(&mut cmd, "scontrol", timeout).await {
        Ok(stdout) => stdout,
        // scontrol exits non-zero on an empty queue
        Err(BridgeError::Failed { message, .. }) if message.contains("No jobs in the system") => {
            return Ok(Vec::new());
        }
        Err(e) => return Err(e),
    };

    let mut jobs = Vec::new();
    for line in stdout.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_job_line(line) {
            Ok(job) => jobs.push(job),
            Err(e) => tracing::warn!("{}", e),
        }
    }
    Ok(jobs)
}

/// Cancel a job by id.
pub async fn cancel_job(job_id: &str, timeout: Duration) -> Result<(), BridgeError> {
    let mut cmd = Command::new("scancel");
    cmd.arg(job_id);
    command::run(&mut cmd, "scancel", timeout).await?;
    Ok(())
}
