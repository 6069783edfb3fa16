//! Snapshot types for the association hierarchy.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Grouped resource limits attached to an account.
///
/// Each `None` means unlimited. A limit bounds the aggregate simultaneous
/// usage of all users transitively below the account; that enforcement
/// happens in the scheduler, this type only carries the values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TresLimits {
    /// GrpTRES cpu count
    pub max_cpus: Option<u32>,
    /// GrpTRES gres/gpu count
    pub max_gpus: Option<u32>,
    /// GrpWall budget
    pub max_walltime: Option<Duration>,
}

/// A limited resource kind, for bottleneck lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Cpus,
    Gpus,
    Walltime,
}

impl TresLimits {
    /// Whether no limit is set at all.
    pub fn is_unlimited(&self) -> bool {
        *self == Self::default()
    }

    /// Uniform numeric view of one resource (walltime in seconds).
    pub fn get(&self, resource: Resource) -> Option<u64> {
        match resource {
            Resource::Cpus => self.max_cpus.map(u64::from),
            Resource::Gpus => self.max_gpus.map(u64::from),
            Resource::Walltime => self.max_walltime.map(|d| d.as_secs()),
        }
    }
}

impl fmt::Display for TresLimits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fmt_count = |v: Option<u32>| v.map_or_else(|| "∞".to_string(), |n| n.to_string());
        let walltime = self
            .max_walltime
            .map_or_else(|| "∞".to_string(), sacctl_parsers::format_walltime);
        write!(
            f,
            "cpu={} gpu={} wall={}",
            fmt_count(self.max_cpus),
            fmt_count(self.max_gpus),
            walltime
        )
    }
}

/// An account in the scheduler's accounting hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub name: String,
    /// Parent account; `None` for roots of the forest.
    pub parent: Option<String>,
    pub limits: TresLimits,
}

/// A user association. At most one account per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub account: Option<String>,
}

/// The ancestor whose limit actually bounds an account's resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bottleneck {
    pub account: String,
    pub value: u64,
}

/// A point-in-time capture of accounts, users and limits, as queried from
/// the scheduler.
///
/// BTreeMap keys keep every iteration alphabetical, which is what makes
/// diff output (and therefore generated sacctmgr commands) reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub accounts: BTreeMap<String, Account>,
    pub users: BTreeMap<String, User>,
}

impl Snapshot {
    /// Accounts without a parent, in alphabetical order.
    pub fn roots(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values().filter(|a| a.parent.is_none())
    }

    /// Direct child accounts of `name`, in alphabetical order.
    pub fn children_of<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Account> {
        self.accounts
            .values()
            .filter(move |a| a.parent.as_deref() == Some(name))
    }

    /// Users directly associated with `name`, in alphabetical order.
    pub fn members_of<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a User> {
        self.users
            .values()
            .filter(move |u| u.account.as_deref() == Some(name))
    }
}
