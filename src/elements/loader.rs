use std::collections::HashMap;
use std::path::Path;

use crate::elements::{ElementsError, OrbitState};

/// One element set the loader could not turn into an `OrbitState`. The
/// catalog number is recovered from the raw line where possible so the
/// failure manifest can name the satellite.
pub struct RejectedSet {
    pub norad_id: Option<u32>,
    pub label: String,
    pub error: ElementsError,
}

pub struct LoadOutcome {
    pub states: Vec<OrbitState>,
    pub rejected: Vec<RejectedSet>,
}

/// Load a multi-satellite TLE file. Bad element sets are collected, not
/// fatal; duplicate catalog numbers keep the later entry in the earlier
/// entry's position.
pub fn load_tle_file(path: &Path) -> Result<LoadOutcome, ElementsError> {
    let content = std::fs::read_to_string(path)?;

    let mut states: Vec<OrbitState> = Vec::new();
    let mut rejected = Vec::new();
    let mut index_by_id: HashMap<u32, usize> = HashMap::new();

    for (name, line1, line2) in parse_tle_set(&content) {
        let label = name.clone().unwrap_or_else(|| line1.clone());
        match OrbitState::from_tle(name, &line1, &line2) {
            Ok(state) => {
                log::debug!("loaded {} ({})", state.name, state.norad_id);
                match index_by_id.get(&state.norad_id).copied() {
                    Some(existing) => {
                        log::debug!(
                            "duplicate catalog number {}, keeping later entry",
                            state.norad_id
                        );
                        states[existing] = state;
                    }
                    None => {
                        index_by_id.insert(state.norad_id, states.len());
                        states.push(state);
                    }
                }
            }
            Err(error) => {
                log::warn!("skipping element set {label:?}: {error}");
                rejected.push(RejectedSet {
                    norad_id: norad_hint(&line1),
                    label,
                    error,
                });
            }
        }
    }

    Ok(LoadOutcome { states, rejected })
}

/// Split raw TLE text into element sets, bare 2-line and named 3-line
/// entries in any mix. `#`-prefixed lines are comments. Any other non-TLE
/// line is held as the candidate name for the next element set (a later
/// candidate replaces an earlier one); a stray line 1 or line 2 that never
/// pairs up is dropped along with any held name.
pub fn parse_tle_set(content: &str) -> Vec<(Option<String>, String, String)> {
    let lines: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .collect();

    let mut sets = Vec::new();
    let mut pending_name: Option<&str> = None;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        if line.starts_with("1 ") {
            if i + 1 < lines.len() && lines[i + 1].starts_with("2 ") {
                sets.push((
                    pending_name.take().map(String::from),
                    line.to_string(),
                    lines[i + 1].to_string(),
                ));
                i += 2;
                continue;
            }
            pending_name = None;
        } else if line.starts_with("2 ") {
            pending_name = None;
        } else {
            pending_name = Some(line);
        }
        i += 1;
    }

    sets
}

/// Best-effort catalog number from columns 3-7 of line 1, for labelling
/// element sets that fail to parse.
fn norad_hint(line1: &str) -> Option<u32> {
    line1.get(2..7)?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ISS_LINE1: &str = "1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927";
    const ISS_LINE2: &str = "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537";

    fn write_fixture(name: &str, content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn parses_mixed_two_and_three_line_sets() {
        let content = format!(
            "ISS (ZARYA)\n{ISS_LINE1}\n{ISS_LINE2}\n\n# comment line\n{ISS_LINE1}\n{ISS_LINE2}\n"
        );
        let sets = parse_tle_set(&content);
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].0.as_deref(), Some("ISS (ZARYA)"));
        // The comment must not be mistaken for the second entry's name
        assert_eq!(sets[1].0, None);
    }

    #[test]
    fn later_name_candidate_replaces_earlier_one() {
        let content = format!("STALE HEADER\nISS (ZARYA)\n{ISS_LINE1}\n{ISS_LINE2}\n");
        let sets = parse_tle_set(&content);
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].0.as_deref(), Some("ISS (ZARYA)"));
    }

    #[test]
    fn orphan_tle_lines_are_dropped_with_their_name() {
        // A line 1 with no matching line 2 must not leak its name onto the
        // next complete entry.
        let content = format!("DECAYED\n{ISS_LINE1}\n{ISS_LINE1}\n{ISS_LINE2}\n");
        let sets = parse_tle_set(&content);
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].0, None);
    }

    #[test]
    fn deduplicates_by_catalog_number() {
        let content = format!("{ISS_LINE1}\n{ISS_LINE2}\nISS (ZARYA)\n{ISS_LINE1}\n{ISS_LINE2}\n");
        let path = write_fixture("satfence_dedup.tle", &content);
        let outcome = load_tle_file(&path).unwrap();
        assert_eq!(outcome.states.len(), 1);
        // Later entry wins
        assert_eq!(outcome.states[0].name, "ISS (ZARYA)");
        assert!(outcome.rejected.is_empty());
    }

    #[test]
    fn collects_bad_sets_without_aborting() {
        let bad_line1 = ISS_LINE1.replace("08264", "0826X");
        let content = format!("{bad_line1}\n{ISS_LINE2}\n{ISS_LINE1}\n{ISS_LINE2}\n");
        let path = write_fixture("satfence_bad.tle", &content);
        let outcome = load_tle_file(&path).unwrap();
        assert_eq!(outcome.states.len(), 1);
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.rejected[0].norad_id, Some(25544));
    }

    #[test]
    fn norad_hint_reads_catalog_column() {
        assert_eq!(norad_hint(ISS_LINE1), Some(25544));
        assert_eq!(norad_hint("1 X"), None);
    }
}
