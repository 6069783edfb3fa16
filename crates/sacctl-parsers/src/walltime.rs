//! Slurm wall-time parsing and formatting.

use std::time::Duration;

/// Values sacctmgr reports for limits that are not actually set.
const UNSET_VARIANTS: &[&str] = &["", "UNLIMITED", "N/A", "0-00:00:00", "00:00:00", "0"];

/// Parse a Slurm wall-time string (D-HH:MM:SS, HH:MM:SS, MM:SS or MM).
///
/// Empty strings, `UNLIMITED` and the zero forms sacctmgr emits for unset
/// limits all map to `None`.
pub fn parse_walltime(s: &str) -> Option<Duration> {
    let s = s.trim();
    if UNSET_VARIANTS.contains(&s) {
        return None;
    }

    let (days, time_part) = match s.split_once('-') {
        Some((d, rest)) => (d.parse::<u64>().ok()?, rest),
        None => (0, s),
    };

    let fields: Vec<u64> = time_part
        .split(':')
        .map(|p| p.parse().ok())
        .collect::<Option<Vec<u64>>>()?;

    let seconds = match fields.len() {
        3 => fields[0] * 3600 + fields[1] * 60 + fields[2],
        2 => fields[0] * 60 + fields[1],
        // a bare number is minutes, as sacctmgr interprets it
        1 => fields[0] * 60,
        _ => return None,
    };

    Some(Duration::from_secs(days * 86400 + seconds))
}

/// Format a duration in the D-HH:MM:SS form sacctmgr accepts.
pub fn format_walltime(d: Duration) -> String {
    let total = d.as_secs();
    let days = total / 86400;
    let hours = (total % 86400) / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{}-{:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_walltime() {
        assert_eq!(parse_walltime("1:00:00"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_walltime("2-00:00:00"), Some(Duration::from_secs(172800)));
        assert_eq!(parse_walltime("30:00"), Some(Duration::from_secs(1800)));
        assert_eq!(parse_walltime("90"), Some(Duration::from_secs(5400)));
    }

    #[test]
    fn test_parse_walltime_unset_variants() {
        assert_eq!(parse_walltime(""), None);
        assert_eq!(parse_walltime("UNLIMITED"), None);
        assert_eq!(parse_walltime("0-00:00:00"), None);
        assert_eq!(parse_walltime("00:00:00"), None);
        assert_eq!(parse_walltime("garbage"), None);
    }

    #[test]
    fn test_format_walltime() {
        assert_eq!(format_walltime(Duration::from_secs(3600)), "0-01:00:00");
        assert_eq!(format_walltime(Duration::from_secs(90061)), "1-01:01:01");
    }

    #[test]
    fn test_roundtrip_day_form() {
        let d = Duration::from_secs(4 * 86400 + 3 * 3600 + 20 * 60 + 15);
        assert_eq!(parse_walltime(&format_walltime(d)), Some(d));
    }
}
