//! Flat-file persistence: one applicant per line, `name Day Day ...`.
use std::{fmt::Write as _, fs, path::Path};

use tracing::{debug, warn};

use crate::{Applicant, MAX_APPLICANTS, Roster, Weekday, error::ModelResult};

/// Non-fatal problem found while loading a roster file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    /// Unknown day token; the whole line was skipped.
    InvalidDay { line: usize, token: String },
    /// The day was already fully booked and was dropped from this entry.
    DayFull { line: usize, name: String, day: Weekday },
    /// The line named no usable day and was skipped.
    NoDays { line: usize },
    /// The roster reached its capacity; remaining lines were ignored.
    RosterFull { line: usize },
}

/// Summary of a load operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Number of applicants appended to the roster.
    pub loaded: usize,
    pub warnings: Vec<LoadWarning>,
}

/// Parse roster text and append its entries to `roster`.
///
/// Rules:
/// - blank lines are ignored;
/// - an unknown day discards the whole line;
/// - a fully booked day is dropped from that entry only;
/// - loading stops once the roster holds [`MAX_APPLICANTS`] entries.
pub fn parse_roster(text: &str, roster: &mut Roster) -> LoadReport {
    let mut report = LoadReport::default();

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let mut tokens = raw.split_whitespace();
        let Some(name) = tokens.next() else {
            continue;
        };

        if roster.len() >= MAX_APPLICANTS {
            report.warnings.push(LoadWarning::RosterFull { line });
            break;
        }

        let mut days = Vec::new();
        let mut rejected = false;
        for token in tokens {
            match token.parse::<Weekday>() {
                Ok(day) if roster.is_day_full(day) => {
                    report.warnings.push(LoadWarning::DayFull {
                        line,
                        name: name.to_string(),
                        day,
                    });
                }
                Ok(day) => days.push(day),
                Err(_) => {
                    report.warnings.push(LoadWarning::InvalidDay {
                        line,
                        token: token.to_string(),
                    });
                    rejected = true;
                    break;
                }
            }
        }
        if rejected {
            continue;
        }

        match Applicant::new(name, days) {
            Ok(applicant) => {
                roster.push_loaded(applicant);
                report.loaded += 1;
            }
            Err(_) => report.warnings.push(LoadWarning::NoDays { line }),
        }
    }
    report
}

/// Read `path` and append its entries to `roster`.
pub fn load_roster(path: impl AsRef<Path>, roster: &mut Roster) -> ModelResult<LoadReport> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let report = parse_roster(&text, roster);

    debug!(path = %path.display(), loaded = report.loaded, "roster loaded");
    for w in &report.warnings {
        warn!(path = %path.display(), warning = ?w, "roster line skipped or trimmed");
    }
    Ok(report)
}

/// Render the roster in file format.
pub fn render_roster(roster: &Roster) -> String {
    let mut out = String::new();
    for a in roster.applicants() {
        out.push_str(a.name());
        for day in a.available_days() {
            let _ = write!(out, " {day}");
        }
        out.push('\n');
    }
    out
}

/// Overwrite `path` with the current roster.
pub fn save_roster(path: impl AsRef<Path>, roster: &Roster) -> ModelResult<()> {
    let path = path.as_ref();
    fs::write(path, render_roster(roster))?;
    debug!(path = %path.display(), entries = roster.len(), "roster saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MAX_APPLICANTS_PER_DAY;

    #[test]
    fn parses_entries_in_order() {
        let mut r = Roster::new();
        let report = parse_roster("A Monday\nB Monday Friday\n\nC Tuesday\n", &mut r);

        assert_eq!(report.loaded, 3);
        assert!(report.warnings.is_empty());
        assert_eq!(r.list_available(Weekday::Monday), vec!["A", "B"]);
        assert_eq!(r.list_available(Weekday::Friday), vec!["B"]);
    }

    #[test]
    fn unknown_day_drops_the_line() {
        let mut r = Roster::new();
        let report = parse_roster("A Monday Funday\nB Tuesday\n", &mut r);

        assert_eq!(report.loaded, 1);
        assert_eq!(
            report.warnings,
            vec![LoadWarning::InvalidDay {
                line: 1,
                token: "Funday".into()
            }]
        );
        assert!(!r.contains("A"));
    }

    #[test]
    fn name_without_days_is_skipped() {
        let mut r = Roster::new();
        let report = parse_roster("Lonely\n", &mut r);
        assert_eq!(report.loaded, 0);
        assert_eq!(report.warnings, vec![LoadWarning::NoDays { line: 1 }]);
    }

    #[test]
    fn full_day_is_trimmed_from_entry() {
        let mut text = String::new();
        for i in 0..MAX_APPLICANTS_PER_DAY {
            text.push_str(&format!("P{i} Monday\n"));
        }
        text.push_str("Late Monday Tuesday\n");

        let mut r = Roster::new();
        let report = parse_roster(&text, &mut r);

        assert_eq!(report.loaded, MAX_APPLICANTS_PER_DAY + 1);
        assert_eq!(r.count_on(Weekday::Monday), MAX_APPLICANTS_PER_DAY);
        assert_eq!(r.list_available(Weekday::Tuesday), vec!["Late"]);
        assert!(matches!(
            report.warnings.as_slice(),
            [LoadWarning::DayFull { day: Weekday::Monday, .. }]
        ));
    }

    #[test]
    fn save_then_load_preserves_roster() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("applicants.txt");

        let mut r = Roster::new();
        r.add("A", vec![Weekday::Monday, Weekday::Sunday]).unwrap();
        r.add("B", vec![Weekday::Wednesday]).unwrap();
        save_roster(&path, &r).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "A Monday Sunday\nB Wednesday\n"
        );

        let mut loaded = Roster::new();
        let report = load_roster(&path, &mut loaded).unwrap();
        assert_eq!(report.loaded, 2);
        assert_eq!(loaded.applicants(), r.applicants());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut r = Roster::new();
        let err = load_roster(dir.path().join("nope.txt"), &mut r).unwrap_err();
        assert!(matches!(err, crate::ModelError::Io(_)));
    }
}
