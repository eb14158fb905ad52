mod domain;
pub use domain::{Applicant, BusRole, Weekday};
pub use domain::{MAX_APPLICANTS, MAX_APPLICANTS_PER_DAY};

mod error;
pub use error::{ModelError, ModelResult};

mod roster;
pub use roster::{ApplicantUpdate, LoadReport, LoadWarning, ModifyOutcome, Roster};
pub use roster::{load_roster, parse_roster, render_roster, save_roster};
