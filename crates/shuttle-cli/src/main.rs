use std::io;

use tracing::info;

use shuttle_core::Coordinator;
use shuttle_observe::{LoggerTimeZone, init_local_offset, init_logger};

mod config;
use config::AppConfig;

mod menu;
use menu::Session;

fn main() -> anyhow::Result<()> {
    // 1) config
    let cfg = AppConfig::discover()?;

    // 2) logger
    if cfg.logger.tz == LoggerTimeZone::Local {
        init_local_offset();
    }
    init_logger(&cfg.logger)?;
    info!("logger initialized");

    // 3) coordinator
    let coordinator = Coordinator::new(cfg.dispatch)?;
    info!(
        handshake = %coordinator.config().handshake,
        queue = %coordinator.config().queue.path().display(),
        "dispatch ready"
    );

    // 4) menu; a fatal dispatch failure ends the process with a non-zero status
    let stdin = io::stdin();
    Session::new(stdin.lock(), io::stdout(), coordinator, cfg.roster_file).run()
}
