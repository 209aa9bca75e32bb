//! Logging setup for the command-line tool
//!
//! The library only emits `tracing` events; the binary decides where they go.
//! `RUST_LOG` takes precedence over the verbosity flags.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Map `-v`/`-q` counts onto a level: default info, `-v` debug, `-vv` trace,
/// `-q` warnings only, `-qq` errors only.
pub fn level_from_flags(verbose: u8, quiet: u8) -> Level {
    match (verbose, quiet) {
        (0, 0) => Level::INFO,
        (0, 1) => Level::WARN,
        (0, _) => Level::ERROR,
        (1, _) => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Install the global fmt subscriber, writing to stderr
pub fn init_logging(level: Level) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("docbatch={level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_flags() {
        assert_eq!(level_from_flags(0, 0), Level::INFO);
        assert_eq!(level_from_flags(1, 0), Level::DEBUG);
        assert_eq!(level_from_flags(3, 0), Level::TRACE);
        assert_eq!(level_from_flags(0, 1), Level::WARN);
        assert_eq!(level_from_flags(0, 2), Level::ERROR);
    }
}
