//! Tracing configuration for the airlock CLI.
//!
//! Logs go to stderr so stdout stays reserved for command output such as
//! generated environment scripts.

use std::io;

use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Log verbosity accepted by the `--level` flag.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum LogLevel {
    /// Everything, including per-artifact progress
    Trace,
    /// Parser and resolver detail
    Debug,
    /// High-level progress
    Info,
    /// Problems worth knowing about (default)
    Warn,
    /// Failures only
    Error,
}

impl LogLevel {
    const fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Initialize tracing for the CLI.
///
/// `RUST_LOG` takes precedence when set; otherwise the given level applies
/// to all airlock crates.
pub fn init_tracing(level: LogLevel) -> miette::Result<()> {
    let level_str = level.as_str();

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            EnvFilter::try_new(format!(
                "airlock={level_str},airlock_core={level_str},airlock_workspaces={level_str},airlock_sbom={level_str},airlock_fetch={level_str}"
            ))
        })
        .map_err(|e| miette::miette!("Failed to create tracing filter: {e}"))?;

    let layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_ids(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layer)
        .try_init()
        .map_err(|e| miette::miette!("Failed to initialize tracing: {e}"))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_render_as_filter_directives() {
        assert_eq!(LogLevel::Trace.as_str(), "trace");
        assert_eq!(LogLevel::Warn.as_str(), "warn");
        assert_eq!(LogLevel::Error.as_str(), "error");
    }
}
