use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Sends tracing output to `path`; the terminal itself is owned by the TUI.
pub fn init(path: &Path) -> anyhow::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let log_file = OpenOptions::new().create(true).append(true).open(path)?;

    let filter = EnvFilter::try_from_env("FARMADVISOR_LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to set global subscriber: {}", e))
}
