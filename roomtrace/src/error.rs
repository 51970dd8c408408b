use roomtrace_core::math::Vec3;
use std::fmt::{Display, Formatter};

/// Top-level error type of the simulator.
#[derive(Debug)]
pub enum Error {
    /// The configuration or scene is semantically invalid; the run is
    /// aborted before (or instead of) tracing.
    Validation(ValidationError),
    /// A failure during tracing itself.
    Simulation(SimulationError),
    /// An I/O failure surfaced by a collaborator (file reading/writing).
    Io(std::io::Error),
    /// YAML (de)serialization failure while handling the experiment config.
    Yaml(serde_yaml::Error),
    /// JSON serialization failure while writing annotations or summaries.
    Json(serde_json::Error),
    /// Failed to install the logger.
    Logger(log::SetLoggerError),
}

/// Scene or configuration problems detected before tracing starts.
#[derive(Debug, Clone)]
pub enum ValidationError {
    /// A speaker cabinet does not fit in the room: some box vertex is
    /// occluded from the listening position.
    SpeakerOutsideRoom {
        /// Display name of the offending speaker.
        speaker: String,
        /// The cabinet vertex that failed the visibility check.
        vertex: Vec3,
        /// Where the listener-to-vertex ray first hit the room, if it hit
        /// anything at all.
        obstruction: Option<Vec3>,
    },
    /// The experiment configuration is semantically invalid.
    InvalidConfig {
        /// Dotted path of the offending field.
        field: String,
        /// Human-readable description of the problem.
        reason: String,
    },
}

impl ValidationError {
    /// Machine-readable tag recorded in the summary's error list.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::SpeakerOutsideRoom { .. } => "speaker_outside_room",
            Self::InvalidConfig { .. } => "invalid_config",
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SpeakerOutsideRoom {
                speaker,
                vertex,
                obstruction,
            } => match obstruction {
                Some(p) => write!(
                    f,
                    "speaker {speaker} does not fit in the room: vertex {vertex} is obscured at {p}"
                ),
                None => write!(
                    f,
                    "speaker {speaker} does not fit in the room: no wall found behind vertex \
                     {vertex}"
                ),
            },
            Self::InvalidConfig { field, reason } => {
                write!(f, "invalid config at {field}: {reason}")
            }
        }
    }
}

/// Failures produced by the tracer.
#[derive(Debug, Clone)]
pub enum SimulationError {
    /// A ray escaped the mesh without hitting any triangle. Either the
    /// mesh is not closed or the ray started outside it.
    NonTerminatingRay {
        /// Origin of the offending ray.
        origin: Vec3,
        /// Direction of the offending ray.
        direction: Vec3,
    },
}

impl SimulationError {
    /// Machine-readable tag recorded in the summary's error list.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::NonTerminatingRay { .. } => "non_terminating_ray",
        }
    }
}

impl Display for SimulationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonTerminatingRay { origin, direction } => {
                write!(
                    f,
                    "non-terminating ray from {origin} along {direction}: mesh returned no hit"
                )
            }
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Validation(err) => write!(f, "validation error - {err}"),
            Error::Simulation(err) => write!(f, "simulation error - {err}"),
            Error::Io(err) => write!(f, "IO error - {err}"),
            Error::Yaml(err) => write!(f, "YAML error - {err}"),
            Error::Json(err) => write!(f, "JSON error - {err}"),
            Error::Logger(_) => write!(f, "failed to set logger"),
        }
    }
}

impl std::error::Error for Error {}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self { Error::Validation(err) }
}

impl From<SimulationError> for Error {
    fn from(err: SimulationError) -> Self { Error::Simulation(err) }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self { Error::Io(err) }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self { Error::Yaml(err) }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self { Error::Json(err) }
}

impl From<log::SetLoggerError> for Error {
    fn from(err: log::SetLoggerError) -> Self { Error::Logger(err) }
}
