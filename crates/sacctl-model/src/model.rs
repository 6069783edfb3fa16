//! The association model: validated edits on a loaded snapshot.

use crate::types::{Account, Bottleneck, Resource, Snapshot, TresLimits, User};
use thiserror::Error;

/// What kind of entity a validation error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Account,
    User,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Account => write!(f, "account"),
            Self::User => write!(f, "user"),
        }
    }
}

/// Validation failures for administrator edits.
///
/// All of these are local and synchronous; the edit is rejected and the
/// prior valid state is kept.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("{kind} not found: {name}")]
    NotFound { kind: EntityKind, name: String },
    #[error("setting parent of {account} to {parent} would create a cycle")]
    Cycle { account: String, parent: String },
    #[error("{kind} already exists: {name}")]
    AlreadyExists { kind: EntityKind, name: String },
    #[error("account {account} still has child accounts or users")]
    NotEmpty { account: String },
}

/// Owns a snapshot and applies validated edits to it.
///
/// Lifecycle per reconciliation pass: [`load`](Self::load) a freshly
/// queried snapshot, apply edits, [`diff`](Self::diff) against the pristine
/// baseline, then discard. Nothing here invokes the scheduler.
#[derive(Debug, Clone, Default)]
pub struct AssociationModel {
    snapshot: Snapshot,
}

impl AssociationModel {
    pub fn new(snapshot: Snapshot) -> Self {
        Self { snapshot }
    }

    /// Replace internal state with a freshly queried snapshot.
    pub fn load(&mut self, snapshot: Snapshot) {
        self.snapshot = snapshot;
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn account(&self, name: &str) -> Option<&Account> {
        self.snapshot.accounts.get(name)
    }

    pub fn user(&self, name: &str) -> Option<&User> {
        self.snapshot.users.get(name)
    }

    fn require_account(&self, name: &str) -> Result<&Account, ModelError> {
        self.account(name).ok_or_else(|| ModelError::NotFound {
            kind: EntityKind::Account,
            name: name.to_string(),
        })
    }

    /// Whether `ancestor` is reached by following parent references up
    /// from `name` (inclusive of `name` itself).
    ///
    /// The walk is bounded by the account count; the hierarchy is
    /// re-verified on every call rather than maintained incrementally.
    fn is_self_or_ancestor(&self, name: &str, ancestor: &str) -> bool {
        let mut current = Some(name);
        let mut hops = self.snapshot.accounts.len() + 1;
        while let Some(acc) = current {
            if acc == ancestor {
                return true;
            }
            if hops == 0 {
                // corrupt snapshot; treat as reachable so the edit is refused
                return true;
            }
            hops -= 1;
            current = self
                .snapshot
                .accounts
                .get(acc)
                .and_then(|a| a.parent.as_deref());
        }
        false
    }

    /// Reassign an account's parent (`None` makes it a root).
    pub fn set_parent(&mut self, account: &str, parent: Option<&str>) -> Result<(), ModelError> {
        self.require_account(account)?;
        if let Some(parent) = parent {
            self.require_account(parent)?;
            if self.is_self_or_ancestor(parent, account) {
                return Err(ModelError::Cycle {
                    account: account.to_string(),
                    parent: parent.to_string(),
                });
            }
        }
        if let Some(entry) = self.snapshot.accounts.get_mut(account) {
            entry.parent = parent.map(str::to_string);
        }
        Ok(())
    }

    /// Move a user to another account (`None` detaches the user).
    pub fn set_user_account(&mut self, user: &str, account: Option<&str>) -> Result<(), ModelError> {
        if !self.snapshot.users.contains_key(user) {
            return Err(ModelError::NotFound {
                kind: EntityKind::User,
                name: user.to_string(),
            });
        }
        if let Some(account) = account {
            self.require_account(account)?;
        }
        if let Some(entry) = self.snapshot.users.get_mut(user) {
            entry.account = account.map(str::to_string);
        }
        Ok(())
    }

    /// Replace an account's grouped limits. The values themselves are
    /// administrator-trusted; only the account name is validated.
    pub fn set_limits(&mut self, account: &str, limits: TresLimits) -> Result<(), ModelError> {
        self.require_account(account)?;
        if let Some(entry) = self.snapshot.accounts.get_mut(account) {
            entry.limits = limits;
        }
        Ok(())
    }

    pub fn add_account(&mut self, name: &str, parent: Option<&str>) -> Result<(), ModelError> {
        if self.snapshot.accounts.contains_key(name) {
            return Err(ModelError::AlreadyExists {
                kind: EntityKind::Account,
                name: name.to_string(),
            });
        }
        if let Some(parent) = parent {
            self.require_account(parent)?;
        }
        self.snapshot.accounts.insert(
            name.to_string(),
            Account {
                name: name.to_string(),
                parent: parent.map(str::to_string),
                limits: TresLimits::default(),
            },
        );
        Ok(())
    }

    /// Remove an account. Fails with [`ModelError::NotEmpty`] while child
    /// accounts or member users remain; the scheduler would cascade, the
    /// model makes the administrator be explicit.
    pub fn remove_account(&mut self, name: &str) -> Result<(), ModelError> {
        self.require_account(name)?;
        if self.snapshot.children_of(name).next().is_some()
            || self.snapshot.members_of(name).next().is_some()
        {
            return Err(ModelError::NotEmpty {
                account: name.to_string(),
            });
        }
        self.snapshot.accounts.remove(name);
        Ok(())
    }

    pub fn add_user(&mut self, name: &str, account: Option<&str>) -> Result<(), ModelError> {
        if self.snapshot.users.contains_key(name) {
            return Err(ModelError::AlreadyExists {
                kind: EntityKind::User,
                name: name.to_string(),
            });
        }
        if let Some(account) = account {
            self.require_account(account)?;
        }
        self.snapshot.users.insert(
            name.to_string(),
            User {
                name: name.to_string(),
                account: account.map(str::to_string),
            },
        );
        Ok(())
    }

    pub fn remove_user(&mut self, name: &str) -> Result<(), ModelError> {
        if self.snapshot.users.remove(name).is_none() {
            return Err(ModelError::NotFound {
                kind: EntityKind::User,
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// The limits the scheduler will actually enforce for an account's
    /// subtree: per resource, the minimum over the account and its
    /// ancestors.
    pub fn effective_limits(&self, account: &str) -> Result<TresLimits, ModelError> {
        self.require_account(account)?;
        let min = |resource| {
            self.ancestry(account)
                .filter_map(|a| a.limits.get(resource))
                .min()
        };
        Ok(TresLimits {
            max_cpus: min(Resource::Cpus).map(|v| v as u32),
            max_gpus: min(Resource::Gpus).map(|v| v as u32),
            max_walltime: min(Resource::Walltime).map(std::time::Duration::from_secs),
        })
    }

    /// The ancestor whose limit shadows the account's own value for one
    /// resource, if any. Used for display hints in the tree view.
    pub fn limit_bottleneck(
        &self,
        account: &str,
        resource: Resource,
    ) -> Result<Option<Bottleneck>, ModelError> {
        let own = self.require_account(account)?.limits.get(resource);
        let shadow = self
            .ancestry(account)
            .skip(1)
            .filter_map(|a| a.limits.get(resource).map(|v| (a.name.clone(), v)))
            .min_by_key(|(_, v)| *v);
        Ok(match (own, shadow) {
            (Some(own), Some((name, value))) if value < own => Some(Bottleneck {
                account: name,
                value,
            }),
            (None, Some((name, value))) => Some(Bottleneck {
                account: name,
                value,
            }),
            _ => None,
        })
    }

    /// Iterate an account and its ancestors, nearest first.
    fn ancestry<'a>(&'a self, account: &'a str) -> impl Iterator<Item = &'a Account> {
        let mut current = self.snapshot.accounts.get(account);
        let mut hops = self.snapshot.accounts.len() + 1;
        std::iter::from_fn(move || {
            if hops == 0 {
                return None;
            }
            hops -= 1;
            let acc = current?;
            current = acc
                .parent
                .as_deref()
                .and_then(|p| self.snapshot.accounts.get(p));
            Some(acc)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn model() -> AssociationModel {
        let mut model = AssociationModel::default();
        let mut snap = Snapshot::default();
        for (name, parent) in [("root", None), ("cs", Some("root")), ("ml", Some("cs"))] {
            snap.accounts.insert(
                name.to_string(),
                Account {
                    name: name.to_string(),
                    parent: parent.map(str::to_string),
                    limits: TresLimits::default(),
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
        model.load(snap);
        model
    }

    #[test]
    fn test_set_parent_to_self_is_cycle() {
        let mut model = model();
        let before = model.snapshot().clone();
        let err = model.set_parent("ml", Some("ml")).unwrap_err();
        assert!(matches!(err, ModelError::Cycle { .. }));
        assert_eq!(model.snapshot(), &before);
    }

    #[test]
    fn test_set_parent_to_descendant_is_cycle() {
        let mut model = model();
        let before = model.snapshot().clone();
        let err = model.set_parent("root", Some("ml")).unwrap_err();
        assert!(matches!(err, ModelError::Cycle { .. }));
        assert_eq!(model.snapshot(), &before);
    }

    #[test]
    fn test_set_parent_valid_reassignment() {
        let mut model = model();
        model.set_parent("ml", Some("root")).unwrap();
        assert_eq!(model.account("ml").unwrap().parent.as_deref(), Some("root"));
    }

    #[test]
    fn test_set_parent_none_makes_root() {
        let mut model = model();
        model.set_parent("ml", None).unwrap();
        assert_eq!(model.account("ml").unwrap().parent, None);
    }

    #[test]
    fn test_set_parent_unknown_account() {
        let mut model = model();
        let before = model.snapshot().clone();
        assert!(matches!(
            model.set_parent("physics", Some("root")),
            Err(ModelError::NotFound { kind: EntityKind::Account, .. })
        ));
        assert!(matches!(
            model.set_parent("ml", Some("physics")),
            Err(ModelError::NotFound { kind: EntityKind::Account, .. })
        ));
        assert_eq!(model.snapshot(), &before);
    }

    #[test]
    fn test_no_cycles_after_valid_reassignments() {
        let mut model = model();
        model.set_parent("ml", Some("root")).unwrap();
        model.set_parent("cs", Some("ml")).unwrap();
        model.set_parent("ml", None).unwrap();
        // every account terminates at a root
        for name in ["root", "cs", "ml"] {
            let chain: Vec<_> = model.ancestry(name).map(|a| a.name.clone()).collect();
            assert!(chain.len() <= 3, "ancestor walk did not terminate: {:?}", chain);
            assert_eq!(chain.iter().filter(|n| *n == name).count(), 1);
        }
    }

    #[test]
    fn test_set_user_account() {
        let mut model = model();
        model.set_user_account("alice", Some("cs")).unwrap();
        assert_eq!(model.user("alice").unwrap().account.as_deref(), Some("cs"));
        model.set_user_account("alice", None).unwrap();
        assert_eq!(model.user("alice").unwrap().account, None);
    }

    #[test]
    fn test_set_user_account_unknown() {
        let mut model = model();
        let before = model.snapshot().clone();
        assert!(matches!(
            model.set_user_account("bob", Some("cs")),
            Err(ModelError::NotFound { kind: EntityKind::User, .. })
        ));
        assert!(matches!(
            model.set_user_account("alice", Some("physics")),
            Err(ModelError::NotFound { kind: EntityKind::Account, .. })
        ));
        assert_eq!(model.snapshot(), &before);
    }

    #[test]
    fn test_set_limits_unknown_account() {
        let mut model = model();
        let before = model.snapshot().clone();
        assert!(matches!(
            model.set_limits("physics", TresLimits::default()),
            Err(ModelError::NotFound { .. })
        ));
        assert_eq!(model.snapshot(), &before);
    }

    #[test]
    fn test_add_and_remove_account() {
        let mut model = model();
        model.add_account("physics", Some("root")).unwrap();
        assert!(model.account("physics").is_some());
        assert!(matches!(
            model.add_account("physics", None),
            Err(ModelError::AlreadyExists { .. })
        ));
        model.remove_account("physics").unwrap();
        assert!(model.account("physics").is_none());
    }

    #[test]
    fn test_remove_account_not_empty() {
        let mut model = model();
        assert!(matches!(
            model.remove_account("cs"),
            Err(ModelError::NotEmpty { .. })
        ));
        // ml still holds alice
        assert!(matches!(
            model.remove_account("ml"),
            Err(ModelError::NotEmpty { .. })
        ));
        model.remove_user("alice").unwrap();
        model.remove_account("ml").unwrap();
        model.remove_account("cs").unwrap();
    }

    #[test]
    fn test_add_user() {
        let mut model = model();
        model.add_user("bob", Some("cs")).unwrap();
        assert_eq!(model.user("bob").unwrap().account.as_deref(), Some("cs"));
        assert!(matches!(
            model.add_user("bob", None),
            Err(ModelError::AlreadyExists { .. })
        ));
        assert!(matches!(
            model.add_user("carol", Some("physics")),
            Err(ModelError::NotFound { .. })
        ));
    }

    #[test]
    fn test_effective_limits_take_minimum_over_ancestry() {
        let mut model = model();
        model
            .set_limits(
                "root",
                TresLimits {
                    max_cpus: Some(64),
                    max_gpus: Some(2),
                    max_walltime: None,
                },
            )
            .unwrap();
        model
            .set_limits(
                "ml",
                TresLimits {
                    max_cpus: Some(16),
                    max_gpus: Some(8),
                    max_walltime: Some(Duration::from_secs(3600)),
                },
            )
            .unwrap();

        let effective = model.effective_limits("ml").unwrap();
        assert_eq!(effective.max_cpus, Some(16));
        assert_eq!(effective.max_gpus, Some(2));
        assert_eq!(effective.max_walltime, Some(Duration::from_secs(3600)));
    }

    #[test]
    fn test_limit_bottleneck() {
        let mut model = model();
        model
            .set_limits(
                "root",
                TresLimits {
                    max_gpus: Some(2),
                    ..TresLimits::default()
                },
            )
            .unwrap();
        model
            .set_limits(
                "ml",
                TresLimits {
                    max_gpus: Some(8),
                    ..TresLimits::default()
                },
            )
            .unwrap();

        let bottleneck = model.limit_bottleneck("ml", Resource::Gpus).unwrap().unwrap();
        assert_eq!(bottleneck.account, "root");
        assert_eq!(bottleneck.value, 2);

        // own value below every ancestor: no bottleneck
        model
            .set_limits(
                "ml",
                TresLimits {
                    max_gpus: Some(1),
                    ..TresLimits::default()
                },
            )
            .unwrap();
        assert_eq!(model.limit_bottleneck("ml", Resource::Gpus).unwrap(), None);

        // no own value: nearest set ancestor still applies
        model.set_limits("ml", TresLimits::default()).unwrap();
        let inherited = model.limit_bottleneck("ml", Resource::Gpus).unwrap().unwrap();
        assert_eq!(inherited.account, "root");
    }
}
