use std::{env, fs, path::{Path, PathBuf}};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use shuttle_core::DispatchConfig;
use shuttle_observe::LoggerConfig;

/// Environment variable naming the config file when no argument is given.
pub const CONFIG_ENV: &str = "SHUTTLE_CONFIG";

/// Application configuration. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logger: LoggerConfig,
    pub dispatch: DispatchConfig,
    /// Suggested file for save and load when the user enters none.
    pub roster_file: Option<PathBuf>,
}

impl AppConfig {
    /// Read a JSON config file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Config from the first CLI argument, else from [`CONFIG_ENV`], else defaults.
    pub fn discover() -> anyhow::Result<Self> {
        let path = env::args_os()
            .nth(1)
            .or_else(|| env::var_os(CONFIG_ENV))
            .map(PathBuf::from);
        match path {
            Some(p) => Self::from_file(&p),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn sections_default_independently() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"dispatch":{{"handshake":"signal"}},"roster_file":"applicants.txt"}}"#
        )
        .unwrap();

        let cfg = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(cfg.dispatch.handshake.to_string(), "signal");
        assert_eq!(cfg.dispatch.poll_interval_ms, 10);
        assert_eq!(cfg.roster_file.as_deref(), Some(Path::new("applicants.txt")));
        assert!(cfg.logger.with_pid);
    }

    #[test]
    fn unreadable_or_malformed_files_are_errors() {
        assert!(AppConfig::from_file(Path::new("/definitely/not/here.json")).is_err());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let err = AppConfig::from_file(file.path()).unwrap_err();
        assert!(err.to_string().starts_with("parsing config"));
    }
}
