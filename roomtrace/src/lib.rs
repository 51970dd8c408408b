//! roomtrace is an acoustic ray-tracing simulator for recording-studio
//! room design.
//!
//! Given a triangular mesh of a room, per-surface absorption data, a pair
//! of directional loudspeakers placed by a listening-triangle construction
//! and a listening position, it computes the early reflections that pass
//! through a spherical reflection-free zone (RFZ) around the listener,
//! the initial time-delay gap, reverberation descriptors (Sabine/Eyring
//! T60, Schroeder frequency) and an aggregate early-energy metric. Results
//! are emitted as a JSON annotation set plus a summary record, and the
//! augmented room mesh can be exported as STL.

#![warn(missing_docs)]

mod app;
mod error;

pub mod analysis;
pub mod annotation;
pub mod io;
pub mod listening;
pub mod material;
pub mod mesh;
pub mod plane;
pub mod room;
pub mod speaker;
pub mod summary;
pub mod surface;
pub mod trace;

pub use error::{Error, SimulationError, ValidationError};

/// Main entry point for the command line application.
pub fn run() -> Result<(), Error> {
    use app::args::CliArgs;
    use clap::Parser;

    let args = CliArgs::parse();
    app::init(&args, std::time::SystemTime::now())?;
    app::cli::run(args)
}
