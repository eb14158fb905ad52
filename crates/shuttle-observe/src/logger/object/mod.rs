pub mod format;
pub use format::LoggerFormat;

pub mod level;
pub use level::LoggerLevel;

pub mod timer;
pub use timer::ProcessTimer;

pub mod timezone;
pub use timezone::{LoggerTimeZone, init_local_offset};
