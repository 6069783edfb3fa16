//! Snapshot querying via `sacctmgr show association tree`.

use crate::command;
use crate::error::BridgeError;
use sacctl_model::{Account, Snapshot, TresLimits, User};
use sacctl_parsers::{parse_count, parse_walltime, tres_value};
use std::time::Duration;

/// Association columns, pipe-separated by `--parsable2`.
const SHOW_FORMAT: &str = "format=Account,User,GrpTRES,GrpWall";

/// Query the full association snapshot from the accounting database.
pub async fn query_snapshot(timeout: Duration) -> Result<Snapshot, BridgeError> {
    let args: Vec<String> = ["show", "association", "tree", SHOW_FORMAT]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let stdout = command::run_sacctmgr(&args, timeout).await?;
    parse_association_tree(&stdout)
}

/// Parse the output of `sacctmgr show association tree`.
///
/// The `tree` query option indents the account column by one space per
/// nesting level, so a stack of the account seen at each level rebuilds
/// the hierarchy. Rows with an empty user column define accounts; rows
/// with a user name are user associations under the indented account.
/// Malformed lines are skipped with a warning rather than failing the
/// whole snapshot.
pub fn parse_association_tree(output: &str) -> Result<Snapshot, BridgeError> {
    let mut snapshot = Snapshot::default();
    let mut level_stack: Vec<String> = Vec::new();

    for line in output.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('|').collect();
        if fields.len() < 4 {
            tracing::warn!(
                "Skipping association line with {} fields: {}",
                fields.len(),
                line
            );
            continue;
        }

        let account_field = fields[0];
        let user = fields[1];
        let level = account_field.len() - account_field.trim_start_matches(' ').len();
        let account_name = account_field.trim();
        if account_name.is_empty() {
            tracing::warn!("Skipping association line without an account: {}", line);
            continue;
        }

        if user.is_empty() {
            // account row
            let parent = if level == 0 {
                None
            } else {
                match level_stack.get(level - 1) {
                    Some(parent) => Some(parent.clone()),
                    None => {
                        tracing::warn!(
                            "Account {} indented at level {} with no parent row; treating as root",
                            account_name,
                            level
                        );
                        None
                    }
                }
            };
            if snapshot.accounts.contains_key(account_name) {
                tracing::warn!("Duplicate account row for {}; keeping the first", account_name);
            } else {
                snapshot.accounts.insert(
                    account_name.to_string(),
                    Account {
                        name: account_name.to_string(),
                        parent,
                        limits: parse_limits(fields[2], fields[3]),
                    },
                );
            }
            level_stack.truncate(level);
            level_stack.push(account_name.to_string());
        } else {
            // user association row; the model keeps limits on accounts
            // only, so per-user GrpTRES columns are ignored here
            if snapshot.users.contains_key(user) {
                tracing::warn!(
                    "User {} has more than one association; keeping the first",
                    user
                );
            } else {
                snapshot.users.insert(
                    user.to_string(),
                    User {
                        name: user.to_string(),
                        account: Some(account_name.to_string()),
                    },
                );
            }
        }
    }

    Ok(snapshot)
}

/// Map GrpTRES/GrpWall columns onto the model's limit triple.
///
/// sacctmgr prints sentinel values for unset limits; the parsers treat
/// those as absent.
fn parse_limits(grp_tres: &str, grp_wall: &str) -> TresLimits {
    TresLimits {
        max_cpus: tres_value(grp_tres, "cpu").and_then(parse_count),
        max_gpus: tres_value(grp_tres, "gres/gpu").and_then(parse_count),
        max_walltime: parse_walltime(grp_wall),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
root|||
 cs||cpu=32,gres/gpu=8|
  cs|alice||
  ml||cpu=16|1-00:00:00
   ml|bob||
 physics|||
";

    #[test]
    fn test_parse_association_tree_hierarchy() {
        let snap = parse_association_tree(SAMPLE).unwrap();

        assert_eq!(snap.accounts.len(), 4);
        assert_eq!(snap.accounts["root"].parent, None);
        assert_eq!(snap.accounts["cs"].parent.as_deref(), Some("root"));
        assert_eq!(snap.accounts["ml"].parent.as_deref(), Some("cs"));
        assert_eq!(snap.accounts["physics"].parent.as_deref(), Some("root"));
    }

    #[test]
    fn test_parse_association_tree_users() {
        let snap = parse_association_tree(SAMPLE).unwrap();

        assert_eq!(snap.users.len(), 2);
        assert_eq!(snap.users["alice"].account.as_deref(), Some("cs"));
        assert_eq!(snap.users["bob"].account.as_deref(), Some("ml"));
    }

    #[test]
    fn test_parse_association_tree_limits() {
        let snap = parse_association_tree(SAMPLE).unwrap();

        let cs = &snap.accounts["cs"].limits;
        assert_eq!(cs.max_cpus, Some(32));
        assert_eq!(cs.max_gpus, Some(8));
        assert_eq!(cs.max_walltime, None);

        let ml = &snap.accounts["ml"].limits;
        assert_eq!(ml.max_cpus, Some(16));
        assert_eq!(ml.max_gpus, None);
        assert_eq!(ml.max_walltime, Some(Duration::from_secs(86400)));

        assert!(snap.accounts["root"].limits.is_unlimited());
    }

    #[test]
    fn test_parse_association_tree_sibling_after_descent() {
        // physics follows the deeper ml subtree; the level stack must
        // unwind back to root's children
        let snap = parse_association_tree(SAMPLE).unwrap();
        assert_eq!(snap.accounts["physics"].parent.as_deref(), Some("root"));
    }

    #[test]
    fn test_parse_association_tree_skips_malformed() {
        let snap = parse_association_tree("root|||\ngarbage-line\n cs|||\n").unwrap();
        assert_eq!(snap.accounts.len(), 2);
    }

    #[test]
    fn test_parse_association_tree_empty() {
        let snap = parse_association_tree("").unwrap();
        assert!(snap.accounts.is_empty());
        assert!(snap.users.is_empty());
    }
}
