use crate::{
    Weekday,
    error::{ModelError, ModelResult},
};

/// A single roster entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applicant {
    name: String,
    available_days: Vec<Weekday>,
}

impl Applicant {
    /// Build an applicant, validating the name and collapsing duplicate days.
    ///
    /// Rules:
    /// - `name` is a single non-empty token without whitespace (the roster file is space separated);
    /// - at least one day is given.
    pub fn new(name: impl Into<String>, days: impl IntoIterator<Item = Weekday>) -> ModelResult<Self> {
        let name = name.into();
        validate_name(&name)?;

        let mut available_days = Vec::new();
        for day in days {
            if !available_days.contains(&day) {
                available_days.push(day);
            }
        }
        if available_days.is_empty() {
            return Err(ModelError::NoValidDays);
        }
        Ok(Self {
            name,
            available_days,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn available_days(&self) -> &[Weekday] {
        &self.available_days
    }

    #[inline]
    pub fn is_available(&self, day: Weekday) -> bool {
        self.available_days.contains(&day)
    }

    /// Caller validates `name` with [`validate_name`] first.
    pub(crate) fn rename(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn set_days(&mut self, days: Vec<Weekday>) {
        if !days.is_empty() {
            self.available_days = days;
        }
    }
}

pub(crate) fn validate_name(name: &str) -> ModelResult<()> {
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return Err(ModelError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_duplicate_days() {
        let a = Applicant::new(
            "Anna",
            [Weekday::Monday, Weekday::Friday, Weekday::Monday],
        )
        .unwrap();
        assert_eq!(a.available_days(), &[Weekday::Monday, Weekday::Friday]);
        assert!(a.is_available(Weekday::Friday));
        assert!(!a.is_available(Weekday::Sunday));
    }

    #[test]
    fn rejects_bad_names() {
        for bad in ["", "Anna Smith", "tab\tname"] {
            let err = Applicant::new(bad, [Weekday::Monday]).unwrap_err();
            assert!(matches!(err, ModelError::InvalidName(_)));
        }
    }

    #[test]
    fn requires_at_least_one_day() {
        let err = Applicant::new("Anna", Vec::<Weekday>::new()).unwrap_err();
        assert!(matches!(err, ModelError::NoValidDays));
    }
}
