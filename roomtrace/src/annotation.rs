//! The annotation accumulator and its JSON serialization.
//!
//! Annotations collect the points, paths, traced arrivals and zones a
//! simulation wants rendered, then serialize to the viewer's JSON schema:
//! `points`, `paths`, `acousticPaths` (reflection sequences with surface
//! and material data) and `zones`. Gains are stored in dB; absorption
//! curves serialize as maps keyed by two-decimal frequency strings.

use crate::material::Material;
use crate::room::Room;
use crate::trace::Arrival;
use roomtrace_core::math::Vec3;
use roomtrace_core::units::to_db;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

/// Color palette for annotations.
pub mod color {
    /// Soft red.
    pub const PASTEL_RED: &str = "#FF6961";
    /// Soft green.
    pub const PASTEL_GREEN: &str = "#77DD77";
    /// Soft lavender.
    pub const PASTEL_LAVENDER: &str = "#B39EB5";
    /// Soft blue.
    pub const PASTEL_BLUE: &str = "#AEC6CF";
    /// Soft yellow.
    pub const PASTEL_YELLOW: &str = "#FDFD96";
    /// Soft orange.
    pub const PASTEL_ORANGE: &str = "#FFB347";
    /// Soft pink.
    pub const PASTEL_PINK: &str = "#FFD1DC";
    /// Saturated red, used for error call-outs.
    pub const BRIGHT_RED: &str = "#FF4D4D";
}

/// A labeled point.
#[derive(Debug, Clone)]
pub struct Point {
    /// Position in room coordinates.
    pub position: Vec3,
    /// Optional display name.
    pub name: Option<String>,
    /// Optional hex color.
    pub color: Option<String>,
}

impl Point {
    /// A bare point with no label or color.
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            name: None,
            color: None,
        }
    }

    /// Attaches a name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attaches a color.
    pub fn colored(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// A polyline annotation.
#[derive(Debug, Clone)]
pub struct PathAnnotation {
    /// The polyline's points.
    pub points: Vec<Point>,
    /// Optional display name.
    pub name: Option<String>,
    /// Optional hex color.
    pub color: Option<String>,
    /// Optional line thickness.
    pub thickness: Option<f64>,
}

/// A spherical zone annotation (the RFZ).
#[derive(Debug, Clone)]
pub struct Zone {
    /// Sphere center.
    pub center: Vec3,
    /// Sphere radius, meters.
    pub radius: f64,
    /// Optional display name.
    pub name: Option<String>,
    /// Optional hex color.
    pub color: Option<String>,
    /// Optional transparency in `[0, 1]`.
    pub transparency: Option<f64>,
}

/// Accumulator for everything a run wants rendered. Serialized by
/// [`Annotations::save`] once tracing finishes.
#[derive(Debug, Clone, Default)]
pub struct Annotations {
    /// Standalone points.
    pub points: Vec<Point>,
    /// Standalone polylines.
    pub paths: Vec<PathAnnotation>,
    /// Traced arrivals, rendered as acoustic paths.
    pub arrivals: Vec<Arrival>,
    /// Zones.
    pub zones: Vec<Zone>,
    /// Sparse per-arrival color overrides, keyed by arrival index.
    arrival_colors: HashMap<usize, String>,
}

impl Annotations {
    /// An empty accumulator.
    pub fn new() -> Self { Self::default() }

    /// Overrides the color of the arrival at `index`.
    pub fn set_arrival_color(&mut self, index: usize, color: impl Into<String>) {
        self.arrival_colors.insert(index, color.into());
    }

    /// Color override of the arrival at `index`, if any.
    pub fn arrival_color(&self, index: usize) -> Option<&str> {
        self.arrival_colors.get(&index).map(String::as_str)
    }

    /// Builds the serializable document, resolving surface references
    /// through `room`.
    pub fn to_json(&self, room: &Room) -> AnnotationsJson {
        AnnotationsJson {
            points: self.points.iter().map(PointJson::from).collect(),
            paths: self.paths.iter().map(PathJson::from).collect(),
            acoustic_paths: self
                .arrivals
                .iter()
                .enumerate()
                .map(|(i, arrival)| {
                    let color = self
                        .arrival_color(i)
                        .unwrap_or(color::BRIGHT_RED)
                        .to_string();
                    AcousticPathJson::new(arrival, room, color)
                })
                .collect(),
            zones: self.zones.iter().map(ZoneJson::from).collect(),
        }
    }

    /// Serializes the annotations to pretty-printed JSON at `path`.
    pub fn save(&self, path: &Path, room: &Room) -> Result<(), crate::Error> {
        let mut file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(&mut file, &self.to_json(room))?;
        file.write_all(b"\n")?;
        Ok(())
    }
}

// --- JSON document types ---

/// Root annotation document.
#[derive(Debug, Serialize)]
pub struct AnnotationsJson {
    /// Standalone points.
    pub points: Vec<PointJson>,
    /// Standalone polylines.
    pub paths: Vec<PathJson>,
    /// Acoustic paths.
    #[serde(rename = "acousticPaths")]
    pub acoustic_paths: Vec<AcousticPathJson>,
    /// Zones.
    pub zones: Vec<ZoneJson>,
}

/// A point with optional label and color.
#[derive(Debug, Serialize)]
pub struct PointJson {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
    /// Optional name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Optional color.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl From<&Point> for PointJson {
    fn from(p: &Point) -> Self {
        Self {
            x: p.position.x,
            y: p.position.y,
            z: p.position.z,
            name: p.name.clone(),
            color: p.color.clone(),
        }
    }
}

impl From<Vec3> for PointJson {
    fn from(v: Vec3) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
            name: None,
            color: None,
        }
    }
}

/// A bare vector.
#[derive(Debug, Serialize)]
pub struct VectorJson {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
    /// Z component.
    pub z: f64,
}

impl From<Vec3> for VectorJson {
    fn from(v: Vec3) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

/// A polyline.
#[derive(Debug, Serialize)]
pub struct PathJson {
    /// The polyline's points.
    pub points: Vec<PointJson>,
    /// Optional name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Optional color.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Optional thickness.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thickness: Option<f64>,
}

impl From<&PathAnnotation> for PathJson {
    fn from(p: &PathAnnotation) -> Self {
        Self {
            points: p.points.iter().map(PointJson::from).collect(),
            name: p.name.clone(),
            color: p.color.clone(),
            thickness: p.thickness,
        }
    }
}

/// Absorption curve serialized as `{"125.00": 0.05, ...}` in breakpoint
/// order.
#[derive(Debug)]
pub struct MaterialJson {
    breakpoints: Vec<(f64, f64)>,
}

impl From<&Material> for MaterialJson {
    fn from(m: &Material) -> Self {
        Self {
            breakpoints: m.breakpoints().to_vec(),
        }
    }
}

impl Serialize for MaterialJson {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Inner<'a> {
            absorption: Curve<'a>,
        }
        struct Curve<'a>(&'a [(f64, f64)]);
        impl Serialize for Curve<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(self.0.len()))?;
                for (freq, alpha) in self.0 {
                    map.serialize_entry(&format!("{freq:.2}"), alpha)?;
                }
                map.end()
            }
        }
        Inner {
            absorption: Curve(&self.breakpoints),
        }
        .serialize(serializer)
    }
}

/// A surface reference carried by a reflection.
#[derive(Debug, Serialize)]
pub struct SurfaceJson {
    /// The surface's material.
    pub material: MaterialJson,
    /// The surface's name.
    pub name: String,
}

/// One reflection of an acoustic path.
#[derive(Debug, Serialize)]
pub struct ReflectionJson {
    /// Where the ray hit.
    pub position: PointJson,
    /// Outward normal at the hit.
    pub normal: VectorJson,
    /// The hit surface; absent for the synthetic emission entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surface: Option<SurfaceJson>,
}

/// The emitting shot.
#[derive(Debug, Serialize)]
pub struct ShotJson {
    /// The emitted ray.
    pub ray: RayJson,
    /// Emission gain in dB.
    pub gain: f64,
}

/// A ray as origin plus direction.
#[derive(Debug, Serialize)]
pub struct RayJson {
    /// Ray origin.
    pub origin: VectorJson,
    /// Ray direction.
    pub direction: VectorJson,
}

/// Nearest approach of an acoustic path to the listener.
#[derive(Debug, Serialize)]
pub struct NearestApproachJson {
    /// Point of nearest approach.
    pub position: PointJson,
    /// Miss distance, meters.
    pub distance: f64,
}

/// A traced arrival as rendered by the viewer.
#[derive(Debug, Serialize)]
pub struct AcousticPathJson {
    /// The reflection sequence, emission point first.
    pub reflections: Vec<ReflectionJson>,
    /// The emitting shot.
    pub shot: ShotJson,
    /// Arrival gain in dB.
    pub gain: f64,
    /// Total distance traveled, meters.
    pub distance: f64,
    /// Nearest approach to the listening position.
    #[serde(rename = "nearestApproach")]
    pub nearest_approach: NearestApproachJson,
    /// Optional name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Optional color.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Optional thickness.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thickness: Option<f64>,
}

impl AcousticPathJson {
    fn new(arrival: &Arrival, room: &Room, color: String) -> Self {
        Self {
            reflections: arrival
                .reflections
                .iter()
                .map(|r| ReflectionJson {
                    position: PointJson::from(r.position),
                    normal: VectorJson::from(r.normal),
                    surface: r.surface.map(|id| {
                        let surface = room.surface(id);
                        SurfaceJson {
                            material: MaterialJson::from(&surface.material),
                            name: surface.name.clone(),
                        }
                    }),
                })
                .collect(),
            shot: ShotJson {
                ray: RayJson {
                    origin: VectorJson::from(arrival.shot.ray.org),
                    direction: VectorJson::from(arrival.shot.ray.dir),
                },
                gain: to_db(arrival.shot.gain),
            },
            gain: to_db(arrival.gain),
            distance: arrival.distance,
            nearest_approach: NearestApproachJson {
                position: PointJson::from(arrival.nearest_approach_position),
                distance: arrival.nearest_approach_distance,
            },
            name: None,
            color: Some(color),
            thickness: None,
        }
    }
}

/// A spherical zone.
#[derive(Debug, Serialize)]
pub struct ZoneJson {
    /// Center X.
    pub x: f64,
    /// Center Y.
    pub y: f64,
    /// Center Z.
    pub z: f64,
    /// Radius, meters.
    pub radius: f64,
    /// Optional name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Optional color.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Optional transparency.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transparency: Option<f64>,
}

impl From<&Zone> for ZoneJson {
    fn from(z: &Zone) -> Self {
        Self {
            x: z.center.x,
            y: z.center.y,
            z: z.center.z,
            radius: z.radius,
            name: z.name.clone(),
            color: z.color.clone(),
            transparency: z.transparency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Material;
    use crate::mesh::box_vertices;
    use crate::speaker::Shot;
    use crate::trace::Reflection;
    use roomtrace_core::math::Ray;
    use std::collections::HashMap as StdHashMap;

    fn test_room() -> Room {
        let mut materials = StdHashMap::new();
        materials.insert(
            "room".to_string(),
            Material::new([(125.0, 0.05), (1000.0, 0.3)]),
        );
        Room::from_objects(
            vec![(
                "room".to_string(),
                box_vertices(Vec3::ZERO, Vec3::new(4.0, 3.0, 3.0)),
            )],
            &materials,
        )
    }

    fn test_arrival(room: &Room) -> Arrival {
        let surface = room.surface_id("room").unwrap();
        Arrival {
            shot: Shot {
                ray: Ray::new(Vec3::new(0.5, 1.5, 1.5), Vec3::X),
                gain: 1.0,
            },
            reflections: vec![
                Reflection {
                    position: Vec3::new(0.5, 1.5, 1.5),
                    normal: Vec3::X,
                    surface: None,
                },
                Reflection {
                    position: Vec3::new(4.0, 1.5, 1.5),
                    normal: -Vec3::X,
                    surface: Some(surface),
                },
            ],
            gain: 0.7,
            distance: 4.2,
            nearest_approach_distance: 0.0,
            nearest_approach_position: Vec3::new(3.0, 1.5, 1.5),
        }
    }

    #[test]
    fn document_shape_matches_schema() {
        let room = test_room();
        let mut annotations = Annotations::new();
        annotations
            .points
            .push(Point::new(Vec3::ONE).named("listen").colored(color::PASTEL_GREEN));
        annotations.arrivals.push(test_arrival(&room));
        annotations.zones.push(Zone {
            center: Vec3::ONE,
            radius: 0.5,
            name: None,
            color: None,
            transparency: Some(0.8),
        });

        let value = serde_json::to_value(annotations.to_json(&room)).unwrap();

        assert_eq!(value["points"][0]["name"], "listen");
        assert_eq!(value["points"][0]["color"], "#77DD77");
        assert!(value["points"][0].get("size").is_none());

        let path = &value["acousticPaths"][0];
        // Emission entry has no surface; the wall hit carries material
        // breakpoints keyed by two-decimal frequency strings.
        assert!(path["reflections"][0].get("surface").is_none());
        let absorption = &path["reflections"][1]["surface"]["material"]["absorption"];
        assert_eq!(absorption["125.00"], 0.05);
        assert_eq!(absorption["1000.00"], 0.3);
        assert_eq!(path["reflections"][1]["surface"]["name"], "room");
        // Gains are stored in dB.
        assert_eq!(path["shot"]["gain"], 0.0);
        assert!((path["gain"].as_f64().unwrap() - to_db(0.7)).abs() < 1e-12);
        assert_eq!(path["nearestApproach"]["distance"], 0.0);

        assert_eq!(value["zones"][0]["radius"], 0.5);
        assert_eq!(value["zones"][0]["transparency"], 0.8);
        assert!(value["zones"][0].get("name").is_none());
    }

    #[test]
    fn arrival_color_override() {
        let room = test_room();
        let mut annotations = Annotations::new();
        annotations.arrivals.push(test_arrival(&room));
        annotations.arrivals.push(test_arrival(&room));
        annotations.set_arrival_color(1, color::PASTEL_LAVENDER);

        let value = serde_json::to_value(annotations.to_json(&room)).unwrap();
        assert_eq!(value["acousticPaths"][0]["color"], color::BRIGHT_RED);
        assert_eq!(value["acousticPaths"][1]["color"], color::PASTEL_LAVENDER);
    }
}
