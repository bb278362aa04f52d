// re-export for convenience
pub use slog::{Logger, debug, error, info, o, trace, warn};
use slog::{Drain, Level};

use crate::configuration::LoggingConfig;

/// Builds the root logger for a run. Output goes to stderr so that reports
/// written to stdout stay machine readable.
pub fn initialize_logger(conf: LoggingConfig) -> Logger {
    let decorator = slog_term::TermDecorator::new().stderr().build();
    let drain = slog_term::FullFormat::new(decorator).build();
    let filter_level = if conf.debug_logging {
        Level::Trace
    } else if conf.quiet {
        Level::Error
    } else {
        Level::Info
    };
    let drain = drain.filter_level(filter_level).fuse();

    let drain = slog_async::Async::new(drain).build().fuse();

    Logger::root(drain, o!())
}

/// A logger which drops everything, for tests and library callers that do
/// not care.
pub fn discard() -> Logger {
    Logger::root(slog::Discard, o!())
}
