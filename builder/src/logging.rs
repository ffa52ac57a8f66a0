//! Log subscriber installation for the CLI.
//!
//! Library modules log through the `log` facade. The binary installs a
//! `tracing-subscriber` formatter on stderr, which also captures `log`
//! records, filtered by `RUST_LOG` when set and by `-q`/`-v` otherwise.

use tracing_subscriber::EnvFilter;

/// Return the default filter directive for the CLI verbosity flags.
///
/// # Examples
///
/// ```
/// use offline_builder::logging::default_directive;
///
/// assert_eq!(default_directive(0, false), "warn");
/// assert_eq!(default_directive(2, false), "debug");
/// assert_eq!(default_directive(0, true), "error");
/// ```
#[must_use]
pub fn default_directive(verbosity: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber.
///
/// A subscriber that is already installed (for example by a test harness)
/// is left in place.
pub fn init(verbosity: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity, quiet)));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
    if installed.is_err() {
        log::debug!("log subscriber already installed");
    }
}
