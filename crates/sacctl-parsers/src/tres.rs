//! TRES (trackable resource) string handling.
//!
//! sacctmgr reports grouped limits as comma-separated `key=value` pairs,
//! e.g. `cpu=16,mem=128G,gres/gpu=2`. Clearing a single key is done by
//! writing the sentinel value `-1` back to sacctmgr.

/// Look up a single key in a TRES spec.
///
/// Returns `None` if the key is absent. Entries without an `=` are
/// skipped, matching how sacctmgr tolerates them.
pub fn tres_value<'a>(spec: &'a str, key: &str) -> Option<&'a str> {
    spec.split(',').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == key).then_some(v)
    })
}

/// Return `spec` with `key` set to `value`.
///
/// `None` writes the `-1` sentinel, which is how a single TRES limit is
/// cleared without touching the others. A key not yet present is appended.
pub fn set_tres_value(spec: &str, key: &str, value: Option<&str>) -> String {
    let new_value = value.unwrap_or("-1");
    let mut parts: Vec<String> = Vec::new();
    let mut replaced = false;

    for pair in spec.split(',') {
        let Some((k, v)) = pair.split_once('=') else {
            continue;
        };
        if k == key {
            parts.push(format!("{}={}", k, new_value));
            replaced = true;
        } else {
            parts.push(format!("{}={}", k, v));
        }
    }

    if !replaced {
        parts.push(format!("{}={}", key, new_value));
    }

    parts.join(",")
}

/// Parse a numeric TRES entry (cpu/gpu counts).
///
/// Non-numeric values (memory sizes with suffixes end up here when callers
/// pick the wrong key) are logged and treated as absent.
pub fn parse_count(value: &str) -> Option<u32> {
    if value.is_empty() {
        return None;
    }
    match value.parse() {
        Ok(n) => Some(n),
        Err(_) => {
            tracing::warn!("Ignoring non-numeric TRES count: {}", value);
            None
        }
    }
}
