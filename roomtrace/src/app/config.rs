//! Experiment configuration: YAML schema, loading and validation.

use crate::error::{Error, ValidationError};
use crate::listening::ListeningTriangle;
use crate::material::Material;
use crate::speaker::{Directivity, LoudspeakerSpec};
use crate::trace::TraceParams;
use roomtrace_core::math::Vec3;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

/// A YAML mapping with numeric keys, kept in document order.
///
/// Used for absorption (frequency → α) and directivity (angle → dB)
/// curves, whose keys YAML parses as numbers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumberMap(pub Vec<(f64, f64)>);

impl<'de> Deserialize<'de> for NumberMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct NumberMapVisitor;
        impl<'de> Visitor<'de> for NumberMapVisitor {
            type Value = NumberMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a mapping of numbers to numbers")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::new();
                while let Some((key, value)) = map.next_entry::<f64, f64>()? {
                    entries.push((key, value));
                }
                Ok(NumberMap(entries))
            }
        }
        deserializer.deserialize_map(NumberMapVisitor)
    }
}

/// The complete configuration of an acoustic room simulation.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExperimentConfig {
    /// Free-form provenance carried into the experiment directory.
    #[serde(default)]
    pub metadata: Metadata,
    /// Input mesh description.
    pub input: Input,
    /// Material definitions by name.
    #[serde(default)]
    pub materials: Materials,
    /// Surface-name → material-name assignments.
    #[serde(default)]
    pub surface_assignments: SurfaceAssignments,
    /// The loudspeaker model used for both sources.
    pub speaker: SpeakerConfig,
    /// Listening-triangle geometry.
    pub listening_triangle: ListeningTriangleConfig,
    /// Tracing parameters.
    pub simulation: SimulationConfig,
    /// Optional ceiling absorber panels.
    #[serde(default)]
    pub ceiling_panels: Option<CeilingPanels>,
    /// Optional extruded wall absorbers.
    #[serde(default)]
    pub wall_absorbers: Option<WallAbsorbers>,
    /// Behavior flags, also settable from the CLI.
    #[serde(default)]
    pub flags: Flags,
}

/// Provenance metadata. Recorded, never interpreted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Metadata {
    /// Timestamp string, `YYYY-MM-DD HH:MM:SS` UTC by convention.
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Git commit of the model/config revision.
    #[serde(default)]
    pub git_commit: Option<String>,
}

/// Input section.
#[derive(Debug, Clone, Deserialize)]
pub struct Input {
    /// The mesh to load.
    pub mesh: MeshInput,
}

/// The room mesh on disk.
#[derive(Debug, Clone, Deserialize)]
pub struct MeshInput {
    /// Path to a Wavefront OBJ file with named objects.
    pub path: PathBuf,
    /// Scale applied to every coordinate (1/1000 for millimeter models).
    #[serde(default = "default_scale")]
    pub scale: f64,
}

fn default_scale() -> f64 { 1.0 }

/// Material definitions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Materials {
    /// Inline name → material table.
    #[serde(default)]
    pub inline: BTreeMap<String, MaterialConfig>,
}

/// One material: a flat absorption value or a frequency curve.
#[derive(Debug, Clone, Deserialize)]
pub struct MaterialConfig {
    /// Absorption: either a single coefficient or a frequency → α map.
    pub absorption: AbsorptionSpec,
}

/// Flat or frequency-dependent absorption.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AbsorptionSpec {
    /// A single coefficient across the band.
    Flat(f64),
    /// Frequency → absorption breakpoints.
    Curve(NumberMap),
}

impl AbsorptionSpec {
    fn to_material(&self) -> Material {
        match self {
            AbsorptionSpec::Flat(alpha) => Material::flat(*alpha),
            AbsorptionSpec::Curve(curve) => Material::new(curve.0.iter().copied()),
        }
    }

    fn values(&self) -> Vec<f64> {
        match self {
            AbsorptionSpec::Flat(alpha) => vec![*alpha],
            AbsorptionSpec::Curve(curve) => curve.0.iter().map(|&(_, a)| a).collect(),
        }
    }
}

/// Surface-to-material assignments.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SurfaceAssignments {
    /// Inline surface-name → material-name table.
    #[serde(default)]
    pub inline: BTreeMap<String, String>,
}

/// The loudspeaker description.
#[derive(Debug, Clone, Deserialize)]
pub struct SpeakerConfig {
    /// Display name of the speaker model.
    #[serde(default)]
    pub model: Option<String>,
    /// Cabinet dimensions, meters.
    pub dimensions: SpeakerDimensions,
    /// Acoustic-center offsets inside the cabinet, meters.
    pub offset: SpeakerOffset,
    /// Directivity curves.
    pub directivity: DirectivityConfig,
}

/// Cabinet dimensions.
#[derive(Debug, Clone, Deserialize)]
pub struct SpeakerDimensions {
    /// Depth, meters.
    pub x: f64,
    /// Width, meters.
    pub y: f64,
    /// Height, meters.
    pub z: f64,
}

/// Acoustic-center offsets.
#[derive(Debug, Clone, Deserialize)]
pub struct SpeakerOffset {
    /// Lateral offset, meters.
    pub y: f64,
    /// Vertical offset, meters.
    pub z: f64,
}

/// Horizontal and vertical angle → dB attenuation curves.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectivityConfig {
    /// Horizontal curve.
    pub horizontal: NumberMap,
    /// Vertical curve.
    pub vertical: NumberMap,
}

/// Listening-triangle geometry.
#[derive(Debug, Clone, Deserialize)]
pub struct ListeningTriangleConfig {
    /// A point on the front wall.
    #[serde(default)]
    pub reference_position: [f64; 3],
    /// Normal of the front wall.
    #[serde(default = "default_reference_normal")]
    pub reference_normal: [f64; 3],
    /// Distance of the sources from the front wall, meters.
    pub distance_from_front: f64,
    /// Distance of each source from the center line, meters.
    pub distance_from_center: f64,
    /// Source height, meters.
    pub source_height: f64,
    /// Listening height, meters.
    pub listen_height: f64,
}

fn default_reference_normal() -> [f64; 3] { [1.0, 0.0, 0.0] }

/// Tracing parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    /// Radius of the reflection-free zone, meters.
    pub rfz_radius: f64,
    /// Number of shots per speaker.
    pub shot_count: usize,
    /// Angular half-range of the shot grid, degrees.
    pub shot_angle_range: f64,
    /// Maximum number of reflections per shot.
    pub order: usize,
    /// Gain threshold in dB; tracing stops below it.
    pub gain_threshold_db: f64,
    /// Time threshold in milliseconds; tracing stops beyond it.
    pub time_threshold_ms: f64,
}

/// Ceiling absorber panels.
#[derive(Debug, Clone, Deserialize)]
pub struct CeilingPanels {
    /// A panel centered over the listening axis.
    #[serde(default)]
    pub center: Option<CenterPanel>,
    /// A symmetric pair of side panels.
    #[serde(default)]
    pub sides: Option<SidePanels>,
    /// Material name for the panels; a perfect absorber when omitted.
    #[serde(default)]
    pub material: Option<String>,
}

/// The center ceiling panel.
#[derive(Debug, Clone, Deserialize)]
pub struct CenterPanel {
    /// Panel start along X, meters.
    pub x_min: f64,
    /// Panel end along X, meters.
    pub x_max: f64,
    /// Panel width (Y extent), meters.
    pub width: f64,
    /// Mounting height of the panel underside, meters.
    pub height: f64,
    /// Panel thickness, meters.
    pub thickness: f64,
}

/// The symmetric side ceiling panels.
#[derive(Debug, Clone, Deserialize)]
pub struct SidePanels {
    /// Panel start along X, meters.
    pub x_min: f64,
    /// Panel end along X, meters.
    pub x_max: f64,
    /// Width of each panel, meters.
    pub width: f64,
    /// Center-to-center spacing between the two panels, meters.
    pub spacing: f64,
    /// Mounting height of the panel undersides, meters.
    pub height: f64,
    /// Panel thickness, meters.
    pub thickness: f64,
}

/// Extruded wall absorbers.
#[derive(Debug, Clone, Deserialize)]
pub struct WallAbsorbers {
    /// Names of the surfaces to extrude absorbers from.
    pub surfaces: Vec<String>,
    /// Extrusion thickness, meters.
    pub thickness: f64,
    /// Absorber height above the surface's bottom edge, meters.
    pub height: f64,
    /// Material name; must exist in the materials table.
    pub material: String,
}

/// Behavior flags.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Flags {
    /// Skip the speaker-fits-in-room validation.
    #[serde(default)]
    pub skip_speaker_in_room_check: bool,
    /// Skip adding the flush-mount speaker walls.
    #[serde(default)]
    pub skip_add_speaker_wall: bool,
}

impl ExperimentConfig {
    /// Loads and validates a config from a YAML file.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)?;
        let config: ExperimentConfig = serde_yaml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Semantic validation beyond what the schema enforces.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let invalid = |field: &str, reason: &str| {
            Err(ValidationError::InvalidConfig {
                field: field.to_string(),
                reason: reason.to_string(),
            })
        };

        if self.input.mesh.scale <= 0.0 {
            return invalid("input.mesh.scale", "must be positive");
        }
        if self.simulation.shot_count == 0 {
            return invalid("simulation.shot_count", "must be at least 1");
        }
        if self.simulation.order == 0 {
            return invalid("simulation.order", "must be at least 1");
        }
        if self.simulation.rfz_radius <= 0.0 {
            return invalid("simulation.rfz_radius", "must be positive");
        }
        if !(0.0..=180.0).contains(&self.simulation.shot_angle_range)
            || self.simulation.shot_angle_range == 0.0
        {
            return invalid("simulation.shot_angle_range", "must be in (0, 180]");
        }
        if self.simulation.time_threshold_ms <= 0.0 {
            return invalid("simulation.time_threshold_ms", "must be positive");
        }
        if self.speaker.dimensions.x <= 0.0
            || self.speaker.dimensions.y <= 0.0
            || self.speaker.dimensions.z <= 0.0
        {
            return invalid("speaker.dimensions", "must be positive");
        }
        if self.listening_triangle.distance_from_center <= 0.0 {
            return invalid("listening_triangle.distance_from_center", "must be positive");
        }

        for (name, material) in &self.materials.inline {
            for alpha in material.absorption.values() {
                if !(0.0..=1.0).contains(&alpha) {
                    return invalid(
                        &format!("materials.inline.{name}"),
                        "absorption must be within [0, 1]",
                    );
                }
            }
        }
        for (surface, material) in &self.surface_assignments.inline {
            if !self.materials.inline.contains_key(material) {
                return invalid(
                    &format!("surface_assignments.inline.{surface}"),
                    "references an unknown material",
                );
            }
        }
        if let Some(absorbers) = &self.wall_absorbers {
            if !self.materials.inline.contains_key(&absorbers.material) {
                return invalid("wall_absorbers.material", "references an unknown material");
            }
            if absorbers.thickness <= 0.0 || absorbers.height <= 0.0 {
                return invalid("wall_absorbers", "thickness and height must be positive");
            }
        }
        if let Some(panels) = &self.ceiling_panels {
            if let Some(material) = &panels.material {
                if !self.materials.inline.contains_key(material) {
                    return invalid("ceiling_panels.material", "references an unknown material");
                }
            }
        }
        Ok(())
    }

    /// Resolves a material by name from the inline table.
    pub fn material(&self, name: &str) -> Option<Material> {
        self.materials
            .inline
            .get(name)
            .map(|m| m.absorption.to_material())
    }

    /// Builds the surface-name → material map handed to the room:
    /// the assignment table resolved through the material table, plus
    /// the `default` material when one is defined.
    pub fn surface_materials(&self) -> HashMap<String, Material> {
        let mut map = HashMap::new();
        for (surface, material_name) in &self.surface_assignments.inline {
            if let Some(material) = self.material(material_name) {
                map.insert(surface.clone(), material);
            }
        }
        if let Some(default) = self.material("default") {
            map.insert("default".to_string(), default);
        }
        map
    }

    /// Material for a synthetic surface: its assignment if present,
    /// otherwise the given fallback.
    pub fn material_for_surface(&self, surface: &str, fallback: Material) -> Material {
        self.surface_assignments
            .inline
            .get(surface)
            .and_then(|name| self.material(name))
            .unwrap_or(fallback)
    }

    /// The listening triangle described by this config.
    pub fn listening_triangle(&self) -> ListeningTriangle {
        let p = self.listening_triangle.reference_position;
        let n = self.listening_triangle.reference_normal;
        ListeningTriangle {
            reference_position: Vec3::new(p[0], p[1], p[2]),
            reference_normal: Vec3::new(n[0], n[1], n[2]),
            dist_from_front: self.listening_triangle.distance_from_front,
            dist_from_center: self.listening_triangle.distance_from_center,
            source_height: self.listening_triangle.source_height,
            listen_height: self.listening_triangle.listen_height,
        }
    }

    /// The loudspeaker spec described by this config.
    pub fn loudspeaker_spec(&self) -> LoudspeakerSpec {
        LoudspeakerSpec {
            x_dim: self.speaker.dimensions.x,
            y_dim: self.speaker.dimensions.y,
            z_dim: self.speaker.dimensions.z,
            y_off: self.speaker.offset.y,
            z_off: self.speaker.offset.z,
            directivity: Directivity::new(
                self.speaker.directivity.horizontal.0.iter().copied(),
                self.speaker.directivity.vertical.0.iter().copied(),
            ),
        }
    }

    /// The trace parameters described by this config.
    pub fn trace_params(&self) -> TraceParams {
        TraceParams {
            order: self.simulation.order,
            gain_threshold_db: self.simulation.gain_threshold_db,
            time_threshold_s: self.simulation.time_threshold_ms / 1000.0,
            rfz_radius: self.simulation.rfz_radius,
        }
    }
}

/// An example configuration, printed by `roomtrace info`.
pub const EXAMPLE_CONFIG: &str = r#"metadata:
  timestamp: "2024-11-02 09:30:00"
  git_commit: 0000000000000000000000000000000000000000
input:
  mesh:
    path: models/studio.obj
    scale: 1.0
materials:
  inline:
    default:
      absorption: 0.05
    brick:
      absorption: 0.04
    rockwool_24cm:
      absorption: { 125: 0.8, 250: 0.95, 1000: 0.996 }
    diffuser:
      absorption: 0.99
surface_assignments:
  inline:
    Front Wall: brick
    Back A: diffuser
speaker:
  model: generic-3way
  dimensions: { x: 0.42, y: 0.28, z: 0.52 }
  offset: { y: 0.14, z: 0.36 }
  directivity:
    horizontal: { 0: 0, 30: 0, 50: -2, 70: -4, 90: -7, 120: -11, 150: -20 }
    vertical: { 0: 0, 30: -4, 60: -6, 80: -12, 120: -15 }
listening_triangle:
  reference_position: [0.0, 2.0, 0.0]
  reference_normal: [1.0, 0.0, 0.0]
  distance_from_front: 0.6
  distance_from_center: 1.1
  source_height: 1.45
  listen_height: 1.3
simulation:
  rfz_radius: 0.5
  shot_count: 10000
  shot_angle_range: 90
  order: 10
  gain_threshold_db: -20
  time_threshold_ms: 100
ceiling_panels:
  material: rockwool_24cm
  center:
    x_min: 1.0
    x_max: 3.4
    width: 1.8
    height: 2.6
    thickness: 0.24
flags:
  skip_speaker_in_room_check: false
  skip_add_speaker_wall: false
"#;
