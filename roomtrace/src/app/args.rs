use std::path::PathBuf;

/// roomtrace command line interface arguments.
#[derive(clap::Parser, Debug)]
#[clap(
    author,
    version,
    about = "Acoustic ray-tracing simulation for recording-studio room design."
)]
pub struct CliArgs {
    /// Whether to print verbose information to stdout.
    #[clap(short, long, help = "Use verbose output (log level = 4)")]
    pub verbose: bool,

    /// Verbosity level for the log.
    #[clap(
        long,
        help = "Set logging verbosity level (higher for more details)\n  0 - error\n  1 - warn + \
                error\n  2 - info + warn + error\n  3 - debug + info + warn + error\n  4 - trace + \
                debug + info + warn + error",
        default_value_t = 1
    )]
    pub log_level: u8,

    /// Whether to show the elapsed time in log messages.
    #[clap(
        long,
        help = "Show timestamp for each log message in seconds since program starts"
    )]
    pub log_timestamp: bool,

    /// Command to execute.
    #[clap(subcommand)]
    pub command: SubCommand,
}

/// roomtrace command.
#[derive(clap::Subcommand, Debug)]
pub enum SubCommand {
    /// Simulates a room described by an experiment config.
    Simulate(SimulateOptions),

    /// Prints an example experiment configuration.
    #[clap(name = "info")]
    PrintInfo,
}

/// Options for the `simulate` command.
#[derive(clap::Args, Debug)]
#[clap(about = "Run the reflection simulation for an experiment config.")]
pub struct SimulateOptions {
    /// The experiment configuration file.
    #[clap(help = "Experiment config file (YAML) to simulate")]
    pub config: PathBuf,

    /// Root directory to create the experiment directory in.
    #[clap(
        short,
        long,
        default_value = "experiments",
        help = "Directory where experiment output directories are created"
    )]
    pub output: PathBuf,

    /// Skip the speaker-fits-in-room validation.
    #[clap(long, help = "Don't check whether the speakers fit inside the room")]
    pub skip_speaker_in_room_check: bool,

    /// Skip adding the flush-mount speaker walls.
    #[clap(long, help = "Don't add walls for the speakers to be flush-mounted in")]
    pub skip_add_speaker_wall: bool,

    /// Surfaces to shoot diagnostic rays at.
    #[clap(
        long,
        value_name = "SURFACE",
        help = "Trace a small targeted grid at the named surface and record the\npaths in the \
                annotations regardless of RFZ crossings (repeatable)"
    )]
    pub trace_surface: Vec<String>,
}
