//! In-memory applicant roster.
//!
//! The roster is an explicitly owned value: the interactive layer mutates it,
//! the dispatch coordinator only ever reads a per-day view of it through
//! [`Roster::list_available`].
mod store;
pub use store::{LoadReport, LoadWarning, load_roster, parse_roster, render_roster, save_roster};

use tracing::debug;

use crate::{
    Applicant, MAX_APPLICANTS, MAX_APPLICANTS_PER_DAY, Weekday,
    domain::validate_name,
    error::{ModelError, ModelResult},
};

/// Requested change to an existing applicant. `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct ApplicantUpdate {
    pub name: Option<String>,
    pub days: Option<Vec<Weekday>>,
}

/// Result of [`Roster::modify`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModifyOutcome {
    /// Requested days that were dropped because they are fully booked.
    pub skipped_full: Vec<Weekday>,
    /// `true` if the day list was replaced.
    pub days_changed: bool,
}

/// Ordered list of applicants. Insertion order is preserved and drives batch order.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    applicants: Vec<Applicant>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.applicants.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.applicants.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.applicants.len() >= MAX_APPLICANTS
    }

    pub fn applicants(&self) -> &[Applicant] {
        &self.applicants
    }

    pub fn contains(&self, name: &str) -> bool {
        self.applicants.iter().any(|a| a.name() == name)
    }

    /// Number of applicants available on `day`.
    pub fn count_on(&self, day: Weekday) -> usize {
        self.applicants.iter().filter(|a| a.is_available(day)).count()
    }

    /// Names available on `day`, in roster order.
    ///
    /// This is the only view the dispatch coordinator receives.
    pub fn list_available(&self, day: Weekday) -> Vec<String> {
        self.applicants
            .iter()
            .filter(|a| a.is_available(day))
            .map(|a| a.name().to_string())
            .collect()
    }

    pub fn is_day_full(&self, day: Weekday) -> bool {
        self.count_on(day) >= MAX_APPLICANTS_PER_DAY
    }

    /// Append a new applicant.
    ///
    /// Fails when the roster is full, when no day is given, or when any requested
    /// day is already fully booked; in the last case nothing is added.
    pub fn add(&mut self, name: &str, days: Vec<Weekday>) -> ModelResult<()> {
        if self.is_full() {
            return Err(ModelError::RosterFull {
                max: MAX_APPLICANTS,
            });
        }
        let applicant = Applicant::new(name, days)?;

        for &day in applicant.available_days() {
            if self.is_day_full(day) {
                return Err(ModelError::DayFull {
                    day,
                    max: MAX_APPLICANTS_PER_DAY,
                    booked: self.list_available(day),
                });
            }
        }

        debug!(name, days = ?applicant.available_days(), "applicant added");
        self.applicants.push(applicant);
        Ok(())
    }

    /// Push an already validated applicant without capacity checks.
    ///
    /// The file loader applies its own limits and reports instead of failing.
    pub(crate) fn push_loaded(&mut self, applicant: Applicant) {
        self.applicants.push(applicant);
    }

    /// Update the first applicant called `name`.
    ///
    /// Full days are skipped rather than failing the whole update; a booking the
    /// applicant already holds does not count against them. If every requested
    /// day is skipped the current days are kept. An invalid new name fails the
    /// call before anything is changed.
    pub fn modify(&mut self, name: &str, update: ApplicantUpdate) -> ModelResult<ModifyOutcome> {
        let idx = self
            .applicants
            .iter()
            .position(|a| a.name() == name)
            .ok_or_else(|| ModelError::NotFound(name.to_string()))?;

        let new_name = update.name.filter(|n| !n.is_empty());
        if let Some(n) = &new_name {
            validate_name(n)?;
        }

        let mut outcome = ModifyOutcome::default();

        if let Some(days) = update.days {
            let mut accepted: Vec<Weekday> = Vec::new();
            for day in days {
                if accepted.contains(&day) {
                    continue;
                }
                let already_booked = self.applicants[idx].is_available(day);
                let others = self.count_on(day) - usize::from(already_booked);
                if others >= MAX_APPLICANTS_PER_DAY {
                    outcome.skipped_full.push(day);
                } else {
                    accepted.push(day);
                }
            }
            outcome.days_changed = !accepted.is_empty();
            self.applicants[idx].set_days(accepted);
        }

        if let Some(new_name) = new_name {
            self.applicants[idx].rename(new_name);
        }

        debug!(name, ?outcome, "applicant modified");
        Ok(outcome)
    }

    /// All entries named `name`, with their roster index.
    pub fn duplicates(&self, name: &str) -> Vec<(usize, &Applicant)> {
        self.applicants
            .iter()
            .enumerate()
            .filter(|(_, a)| a.name() == name)
            .collect()
    }

    /// Remove an applicant by name.
    ///
    /// When several entries share the name, `choice` picks one of them (1-based,
    /// in roster order); without it the call fails with [`ModelError::AmbiguousName`].
    pub fn delete(&mut self, name: &str, choice: Option<usize>) -> ModelResult<Applicant> {
        let matches: Vec<usize> = self.duplicates(name).into_iter().map(|(i, _)| i).collect();

        let idx = match (matches.as_slice(), choice) {
            ([], _) => return Err(ModelError::NotFound(name.to_string())),
            ([only], _) => *only,
            (many, None) => {
                return Err(ModelError::AmbiguousName {
                    name: name.to_string(),
                    count: many.len(),
                });
            }
            (many, Some(k)) => match k.checked_sub(1).and_then(|i| many.get(i)) {
                Some(&idx) => idx,
                None => {
                    return Err(ModelError::InvalidChoice {
                        choice: k,
                        count: many.len(),
                    });
                }
            },
        };

        let removed = self.applicants.remove(idx);
        debug!(name, index = idx, "applicant deleted");
        Ok(removed)
    }
}
