use thiserror::Error;

use crate::Weekday;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown day: {0} (expected Monday..Sunday)")]
    UnknownDay(String),

    #[error("invalid applicant name: {0:?}")]
    InvalidName(String),

    #[error("no valid days were given")]
    NoValidDays,

    #[error("maximum number of applicants reached ({max})")]
    RosterFull { max: usize },

    #[error("maximum number of applicants reached for {day} ({}/{max}): {}", .booked.len(), .booked.join(" "))]
    DayFull {
        day: Weekday,
        max: usize,
        booked: Vec<String>,
    },

    #[error("applicant not found: {0}")]
    NotFound(String),

    #[error("found {count} applicants named '{name}'; pick one of them")]
    AmbiguousName { name: String, count: usize },

    #[error("invalid choice {choice}: expected 1..={count}")]
    InvalidChoice { choice: usize, count: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ModelResult<T> = Result<T, ModelError>;
