pub use log::LevelFilter::{Debug, Error, Info, Trace, Warn};

/// Install a fern logger at the given verbosity. Safe to call more than
/// once; later calls are no-ops (relevant when several orchestrators are
/// hosted in one process).
pub fn setup_logging(verbosity: log::LevelFilter) {
    let _ = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}] {}: {}",
                record.level(),
                record.target(),
                message
            ))
        })
        .level(verbosity)
        .chain(std::io::stdout())
        .apply();
}
