//! Diffing an edited model against its baseline snapshot.
//!
//! The diff is the tool's only output: each elementary change maps to one
//! (or for user moves, two) sacctmgr invocation in the bridge layer. The
//! order is deterministic so generated commands are reproducible: accounts
//! before users, alphabetical within each class, with creations emitted
//! parents-first and removals children-first so the command sequence is
//! executable as emitted.

use crate::model::AssociationModel;
use crate::types::{Snapshot, TresLimits};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// An elementary change between a baseline snapshot and the edited model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum Change {
    CreateAccount {
        name: String,
        parent: Option<String>,
    },
    SetParent {
        account: String,
        parent: Option<String>,
    },
    SetLimits {
        account: String,
        limits: TresLimits,
    },
    CreateUser {
        name: String,
        account: Option<String>,
    },
    SetUserAccount {
        user: String,
        /// The association to drop; sacctmgr cannot move an association,
        /// so the bridge needs both ends.
        old_account: Option<String>,
        new_account: Option<String>,
    },
    RemoveUser {
        name: String,
    },
    RemoveAccount {
        name: String,
    },
}

impl AssociationModel {
    /// Elementary changes between the current state and `baseline`.
    ///
    /// Calling this with an unedited model yields an empty vector;
    /// repeated calls on identical state yield identical sequences.
    pub fn diff(&self, baseline: &Snapshot) -> Vec<Change> {
        let current = self.snapshot();
        let mut changes = Vec::new();

        // 1. account creations, parents before children
        let created: BTreeSet<&str> = current
            .accounts
            .keys()
            .filter(|name| !baseline.accounts.contains_key(*name))
            .map(String::as_str)
            .collect();
        for name in in_creation_order(current, &created) {
            let account = &current.accounts[name];
            changes.push(Change::CreateAccount {
                name: account.name.clone(),
                parent: account.parent.clone(),
            });
        }

        // 2. parent changes, 3. limit changes (created accounts with
        // non-default limits need the limit call too)
        for (name, account) in &current.accounts {
            let Some(base) = baseline.accounts.get(name) else {
                continue;
            };
            if account.parent != base.parent {
                changes.push(Change::SetParent {
                    account: name.clone(),
                    parent: account.parent.clone(),
                });
            }
        }
        for (name, account) in &current.accounts {
            let base_limits = baseline
                .accounts
                .get(name)
                .map(|a| a.limits)
                .unwrap_or_default();
            if account.limits != base_limits {
                changes.push(Change::SetLimits {
                    account: name.clone(),
                    limits: account.limits,
                });
            }
        }

        // 4. user creations, 5. membership changes, 6. user removals
        for (name, user) in &current.users {
            match baseline.users.get(name) {
                None => changes.push(Change::CreateUser {
                    name: name.clone(),
                    account: user.account.clone(),
                }),
                Some(base) if user.account != base.account => {
                    changes.push(Change::SetUserAccount {
                        user: name.clone(),
                        old_account: base.account.clone(),
                        new_account: user.account.clone(),
                    });
                }
                Some(_) => {}
            }
        }
        for name in baseline.users.keys() {
            if !current.users.contains_key(name) {
                changes.push(Change::RemoveUser { name: name.clone() });
            }
        }

        // 7. account removals, children before parents
        let removed: BTreeSet<&str> = baseline
            .accounts
            .keys()
            .filter(|name| !current.accounts.contains_key(*name))
            .map(String::as_str)
            .collect();
        let mut removals = in_creation_order(baseline, &removed);
        removals.reverse();
        for name in removals {
            changes.push(Change::RemoveAccount {
                name: name.to_string(),
            });
        }

        changes
    }
}

/// Order `names` so that within the set, every parent precedes its
/// children, alphabetical within a level. Accounts whose parent is outside
/// the set count as roots.
fn in_creation_order<'a>(snapshot: &Snapshot, names: &BTreeSet<&'a str>) -> Vec<&'a str> {
    let mut ordered = Vec::with_capacity(names.len());
    let mut pending = names.clone();
    while !pending.is_empty() {
        let ready: Vec<&str> = pending
            .iter()
            .copied()
            .filter(|name| {
                snapshot
                    .accounts
                    .get(*name)
                    .and_then(|a| a.parent.as_deref())
                    .is_none_or(|parent| !pending.contains(parent))
            })
            .collect();
        if ready.is_empty() {
            // parent references inside the set form a loop; a valid
            // snapshot cannot get here, but don't spin if one does
            ordered.extend(pending.iter().copied());
            break;
        }
        for name in ready {
            pending.remove(name);
            ordered.push(name);
        }
    }
    ordered
}
