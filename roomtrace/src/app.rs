//! Application plumbing: CLI arguments, logging, configuration and the
//! simulate pipeline.

pub(crate) mod args;
pub(crate) mod cli;
pub(crate) mod config;
pub(crate) mod experiment;

use crate::error::Error;
use args::CliArgs;
use std::io::Write;

fn log_filter_from_level(level: u8) -> log::LevelFilter {
    match level {
        0 => log::LevelFilter::Error,
        1 => log::LevelFilter::Warn,
        2 => log::LevelFilter::Info,
        3 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

/// Initialises the logger from the CLI arguments.
///
/// The format prints the level and the top-level module, optionally
/// prefixed with the elapsed time since `launch_time`.
pub fn init(args: &CliArgs, launch_time: std::time::SystemTime) -> Result<(), Error> {
    let log_level = if args.verbose { 4 } else { args.log_level };
    let timestamp = args.log_timestamp;

    env_logger::builder()
        .format(move |buf, record| {
            let module = record
                .module_path()
                .unwrap_or("?")
                .split("::")
                .next()
                .unwrap_or("?");
            if timestamp {
                let duration = launch_time.elapsed().unwrap_or_default();
                let millis = duration.as_millis() % 1000;
                let seconds = duration.as_secs() % 60;
                let minutes = (duration.as_secs() / 60) % 60;
                let hours = (duration.as_secs() / 60) / 60;
                writeln!(
                    buf,
                    "{}:{:02}:{:02}.{:03} {:5} [{}]: {}",
                    hours,
                    minutes,
                    seconds,
                    millis,
                    record.level(),
                    module,
                    record.args()
                )
            } else {
                writeln!(buf, "{:5} [{}]: {}", record.level(), module, record.args())
            }
        })
        .filter_level(log_filter_from_level(log_level))
        .try_init()
        .map_err(Error::from)?;

    log::info!(
        "roomtrace launched at {} on {}.",
        chrono::DateTime::<chrono::Utc>::from(launch_time),
        std::env::consts::OS
    );
    Ok(())
}
