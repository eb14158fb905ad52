use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize, Serializer};

use crate::error::{ModelError, ModelResult};

/// Day of the week an applicant can travel on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    /// All days in calendar order.
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    /// Canonical capitalised name, as written to the roster file.
    pub const fn as_str(self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
            Weekday::Sunday => "Sunday",
        }
    }

    /// Split whitespace-separated input into recognised days and rejected tokens.
    ///
    /// Duplicates are collapsed; first occurrence wins the position.
    pub fn parse_list(input: &str) -> (Vec<Weekday>, Vec<String>) {
        let mut days = Vec::new();
        let mut rejected = Vec::new();
        for token in input.split_whitespace() {
            match token.parse::<Weekday>() {
                Ok(day) if !days.contains(&day) => days.push(day),
                Ok(_) => {}
                Err(_) => rejected.push(token.to_string()),
            }
        }
        (days, rejected)
    }
}

impl FromStr for Weekday {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        let norm = s.trim();
        Weekday::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(norm))
            .ok_or_else(|| ModelError::UnknownDay(s.to_string()))
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Weekday {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Weekday {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}
