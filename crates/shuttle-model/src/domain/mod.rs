mod weekday;
pub use weekday::Weekday;

mod applicant;
pub use applicant::Applicant;
pub(crate) use applicant::validate_name;

mod bus;
pub use bus::BusRole;

/// Upper bound on roster entries.
pub const MAX_APPLICANTS: usize = 100;

/// Upper bound on applicants booked for any single day.
///
/// Two buses of five seats each; the dispatch split depends on it.
pub const MAX_APPLICANTS_PER_DAY: usize = 10;
