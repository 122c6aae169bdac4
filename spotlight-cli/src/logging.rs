use anyhow::{Context, Result, anyhow};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Takes precedence over any filter passed in.
pub const LOG_ENV: &str = "SPOTLIGHT_LOG";

pub enum LogTarget {
    Stderr,
    /// Used while the alternate screen is up.
    File(PathBuf),
}

pub fn init_logging(filter: &str, target: LogTarget) -> Result<()> {
    let env_filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(filter));
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter);

    let res = match target {
        LogTarget::Stderr => builder.with_writer(std::io::stderr).try_init(),
        LogTarget::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("open {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).try_init()
        }
    };
    res.map_err(|e| anyhow!("init logging: {e}"))
}

/// Filter for line commands: quiet unless asked.
pub fn verbosity_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}
