//! Log output to the terminal.

use anyhow::Context as _;

/// A [`clap::Args`] struct for options controlling log output to stderr.
#[derive(Clone, Debug, clap::Args)]
#[expect(clippy::module_name_repetitions)]
pub struct LoggingArgs {
    /// Additional logging to stderr. Repeat for even more.
    #[arg(long = "verbose", short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Install a [`log`] global logger based on user-provided `options`.
pub fn install(options: &LoggingArgs) -> Result<(), anyhow::Error> {
    use log::LevelFilter::{Debug, Info, Off, Trace};

    let level = match options.verbose {
        0 => Info,
        1 => Debug,
        _ => Trace,
    };
    let stderr_logger = simplelog::TermLogger::new(
        level,
        simplelog::ConfigBuilder::new()
            .set_target_level(Off)
            .set_location_level(Off)
            .build(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    );

    log::set_boxed_logger(Box::new(ServerLogger { stderr_logger }))
        .context("failed to initialize logging")?;
    log::set_max_level(level);
    Ok(())
}

/// [`log::Log`] implementation that [`install()`] registers globally.
struct ServerLogger {
    stderr_logger: Box<simplelog::TermLogger>,
}

impl log::Log for ServerLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        standard_filter(metadata) && self.stderr_logger.enabled(metadata)
    }

    fn log(&self, record: &log::Record<'_>) {
        if standard_filter(record.metadata()) {
            self.stderr_logger.log(record);
        }
    }

    fn flush(&self) {
        self.stderr_logger.flush();
    }
}

/// Excludes particularly noisy details of our dependencies.
///
/// At [`log::Level::Debug`] or lower, there should be no messages produced for every
/// frame of every connection unless something is wrong.
pub fn standard_filter(metadata: &log::Metadata<'_>) -> bool {
    let target = metadata.target();
    !(target.starts_with("hyper")
        || target.starts_with("tower")
        || target.starts_with("tokio_tungstenite")
        || target.starts_with("tungstenite"))
}
