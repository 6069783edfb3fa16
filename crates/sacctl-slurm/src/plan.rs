//! Mapping model changes onto sacctmgr invocations.
//!
//! Every [`Change`] becomes one call, except user moves: sacctmgr cannot
//! reassign an association, so moving a user is a create of the new
//! user+account association followed by a delete of the old one.

use crate::command;
use crate::error::BridgeError;
use once_cell::sync::Lazy;
use regex::Regex;
use sacctl_model::{Change, TresLimits};
use sacctl_parsers::{format_walltime, set_tres_value};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Names that are safe to splice into sacctmgr arguments.
static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    Create,
    Modify,
    Delete,
}

impl Verb {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Modify => "modify",
            Self::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Entity {
    Account,
    User,
}

impl Entity {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::User => "user",
        }
    }
}

/// One concrete sacctmgr invocation.
///
/// `filters` become the `where` clause, `updates` the `set` clause (for
/// modify) or the attribute list (for create). Field order is fixed at
/// construction, so the rendered argv is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SacctmgrCall {
    pub verb: Verb,
    pub entity: Entity,
    pub filters: Vec<(String, String)>,
    pub updates: Vec<(String, String)>,
}

impl SacctmgrCall {
    /// Arguments for the sacctmgr subprocess, without the global
    /// machine-readable flags the runner appends.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![self.verb.as_str().to_string(), self.entity.as_str().to_string()];
        if !self.filters.is_empty() {
            args.push("where".to_string());
            for (key, value) in &self.filters {
                args.push(format!("{}={}", key, value));
            }
        }
        if !self.updates.is_empty() {
            if self.verb == Verb::Modify {
                args.push("set".to_string());
            }
            for (key, value) in &self.updates {
                args.push(format!("{}={}", key, value));
            }
        }
        args.push("--immediate".to_string());
        args
    }
}

impl fmt::Display for SacctmgrCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sacctmgr {}", self.to_args().join(" "))
    }
}

fn check_name(kind: &'static str, name: &str) -> Result<(), BridgeError> {
    if NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(BridgeError::InvalidName {
            kind,
            name: name.to_string(),
        })
    }
}

fn check_opt(kind: &'static str, name: Option<&str>) -> Result<(), BridgeError> {
    match name {
        Some(name) => check_name(kind, name),
        None => Ok(()),
    }
}

/// The GrpTRES/GrpWall update pair for a limit triple.
///
/// Both TRES keys are always rendered; `-1` clears a previously set value,
/// which is required because the change record carries the full triple.
fn limit_updates(limits: &TresLimits) -> Vec<(String, String)> {
    let cpus = limits.max_cpus.map(|n| n.to_string());
    let gpus = limits.max_gpus.map(|n| n.to_string());
    let tres = set_tres_value(
        &set_tres_value("", "cpu", cpus.as_deref()),
        "gres/gpu",
        gpus.as_deref(),
    );
    let wall = limits
        .max_walltime
        .map_or_else(|| "-1".to_string(), format_walltime);
    vec![
        ("grptres".to_string(), tres),
        ("grpwall".to_string(), wall),
    ]
}

/// Plan the sacctmgr calls for one elementary change.
pub fn plan_change(change: &Change) -> Result<Vec<SacctmgrCall>, BridgeError> {
    let calls = match change {
        Change::CreateAccount { name, parent } => {
            check_name("account", name)?;
            check_opt("account", parent.as_deref())?;
            let mut updates = vec![("account".to_string(), name.clone())];
            if let Some(parent) = parent {
                updates.push(("parent".to_string(), parent.clone()));
            }
            vec![SacctmgrCall {
                verb: Verb::Create,
                entity: Entity::Account,
                filters: Vec::new(),
                updates,
            }]
        }
        Change::SetParent { account, parent } => {
            check_name("account", account)?;
            check_opt("account", parent.as_deref())?;
            // sacctmgr has no "unset parent"; top-level accounts hang off
            // the synthetic root account
            let parent = parent.clone().unwrap_or_else(|| "root".to_string());
            vec![SacctmgrCall {
                verb: Verb::Modify,
                entity: Entity::Account,
                filters: vec![("account".to_string(), account.clone())],
                updates: vec![("parent".to_string(), parent)],
            }]
        }
        Change::SetLimits { account, limits } => {
            check_name("account", account)?;
            vec![SacctmgrCall {
                verb: Verb::Modify,
                entity: Entity::Account,
                filters: vec![("account".to_string(), account.clone())],
                updates: limit_updates(limits),
            }]
        }
        Change::CreateUser { name, account } => {
            check_name("user", name)?;
            check_opt("account", account.as_deref())?;
            let mut updates = vec![("user".to_string(), name.clone())];
            if let Some(account) = account {
                updates.push(("account".to_string(), account.clone()));
                updates.push(("defaultaccount".to_string(), account.clone()));
            }
            vec![SacctmgrCall {
                verb: Verb::Create,
                entity: Entity::User,
                filters: Vec::new(),
                updates,
            }]
        }
        Change::SetUserAccount {
            user,
            old_account,
            new_account,
        } => {
            check_name("user", user)?;
            check_opt("account", old_account.as_deref())?;
            check_opt("account", new_account.as_deref())?;
            let mut calls = Vec::new();
            if let Some(new_account) = new_account {
                calls.push(SacctmgrCall {
                    verb: Verb::Create,
                    entity: Entity::User,
                    filters: Vec::new(),
                    updates: vec![
                        ("user".to_string(), user.clone()),
                        ("account".to_string(), new_account.clone()),
                        ("defaultaccount".to_string(), new_account.clone()),
                    ],
                });
            }
            if let Some(old_account) = old_account {
                calls.push(SacctmgrCall {
                    verb: Verb::Delete,
                    entity: Entity::User,
                    filters: vec![
                        ("user".to_string(), user.clone()),
                        ("account".to_string(), old_account.clone()),
                    ],
                    updates: Vec::new(),
                });
            }
            calls
        }
        Change::RemoveUser { name } => {
            check_name("user", name)?;
            vec![SacctmgrCall {
                verb: Verb::Delete,
                entity: Entity::User,
                filters: vec![("user".to_string(), name.clone())],
                updates: Vec::new(),
            }]
        }
        Change::RemoveAccount { name } => {
            check_name("account", name)?;
            vec![SacctmgrCall {
                verb: Verb::Delete,
                entity: Entity::Account,
                filters: vec![("account".to_string(), name.clone())],
                updates: Vec::new(),
            }]
        }
    };
    Ok(calls)
}

/// Plan a whole change sequence, preserving its order.
pub fn plan_changes(changes: &[Change]) -> Result<Vec<SacctmgrCall>, BridgeError> {
    let mut calls = Vec::new();
    for change in changes {
        calls.extend(plan_change(change)?);
    }
    Ok(calls)
}

/// Execute planned calls sequentially, stopping at the first failure.
pub async fn apply_plan(calls: &[SacctmgrCall], timeout: Duration) -> Result<(), BridgeError> {
    for call in calls {
        tracing::debug!("Applying: {}", call);
        command::run_sacctmgr(&call.to_args(), timeout).await?;
    }
    Ok(())
}
