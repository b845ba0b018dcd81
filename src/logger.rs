use std::fmt;
use std::io::IsTerminal;

use chrono::Local;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;

/// Leveled message sink used by the download pipeline.
///
/// `emergency` is the only level with a side effect: after recording the message it ends the
/// whole process and never returns. Library code reports fatal conditions as errors instead of
/// calling it; only the top-level caller decides to go through `emergency`.
pub trait Logger {
    fn emergency(&self, message: &str) -> !;
    fn alert(&self, message: &str);
    fn critical(&self, message: &str);
    fn error(&self, message: &str);
    fn warning(&self, message: &str);
    fn notice(&self, message: &str);
    fn info(&self, message: &str);
    fn debug(&self, message: &str);
    fn success(&self, message: &str);
}

/// [`Logger`] on top of `tracing`; pair it with [`init_tracing`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

/// Exit status used by [`TracingLogger::emergency`].
pub const EMERGENCY_EXIT_CODE: i32 = 1;

impl Logger for TracingLogger {
    fn emergency(&self, message: &str) -> ! {
        tracing::error!(severity = "emergency", "{message}");
        std::process::exit(EMERGENCY_EXIT_CODE)
    }

    fn alert(&self, message: &str) {
        tracing::error!(severity = "alert", "{message}");
    }

    fn critical(&self, message: &str) {
        tracing::error!(severity = "critical", "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!("{message}");
    }

    fn warning(&self, message: &str) {
        tracing::warn!("{message}");
    }

    fn notice(&self, message: &str) {
        tracing::info!(status = "notice", "{message}");
    }

    fn info(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn debug(&self, message: &str) {
        tracing::debug!("{message}");
    }

    fn success(&self, message: &str) {
        tracing::info!(status = "success", "{message}");
    }
}

/// `[2024-05-01 12:00:00]` in local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct BracketTimer;

impl FormatTime for BracketTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "[{}]", Local::now().format("%Y-%m-%d %H:%M:%S"))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LogOptions {
    /// Only error-severity records are printed.
    pub quiet: bool,
    pub show_timer: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            quiet: false,
            show_timer: true,
        }
    }
}

impl LogOptions {
    /// Debug output is limited to this crate; dependencies only surface warnings.
    pub fn default_directive(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            "ckan_downloader=debug,warn"
        }
    }
}

/// Installs the global stderr subscriber. `RUST_LOG` overrides the level from `options`;
/// colors are only used when stderr is a terminal.
pub fn init_tracing(options: LogOptions) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(options.default_directive()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr);

    if options.show_timer {
        builder.with_timer(BracketTimer).init();
    } else {
        builder.without_time().init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_directive_scopes_debug_to_this_crate() {
        let quiet = LogOptions {
            quiet: true,
            show_timer: false,
        };
        assert_eq!(quiet.default_directive(), "error");
        assert_eq!(
            LogOptions::default().default_directive(),
            "ckan_downloader=debug,warn"
        );
    }
}
