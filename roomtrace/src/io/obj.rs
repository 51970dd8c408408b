//! Minimal Wavefront OBJ reader.
//!
//! Supports exactly what the simulator consumes: `o` object names, `v`
//! positions and `f` faces (fan-triangulated, 1-based or negative
//! indices, `v/vt/vn` forms). Everything else is skipped. Coordinates
//! are interpreted as meters after the caller's scale factor.

use roomtrace_core::math::Vec3;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Name given to faces that appear before any `o` statement.
const UNNAMED_OBJECT: &str = "unnamed";

/// Reads `(object name, triangles)` pairs from an OBJ file, multiplying
/// every coordinate by `scale`.
pub fn read_objects(
    path: &Path,
    scale: f64,
) -> Result<Vec<(String, Vec<[Vec3; 3]>)>, crate::Error> {
    let file = std::fs::File::open(path)?;
    parse_objects(BufReader::new(file), scale)
}

/// Parses OBJ content from any reader. See [`read_objects`].
pub fn parse_objects(
    reader: impl BufRead,
    scale: f64,
) -> Result<Vec<(String, Vec<[Vec3; 3]>)>, crate::Error> {
    let mut vertices: Vec<Vec3> = Vec::new();
    let mut objects: Vec<(String, Vec<[Vec3; 3]>)> = Vec::new();
    let mut current: Option<usize> = None;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split_ascii_whitespace();
        match fields.next() {
            Some("o") => {
                let name = fields.collect::<Vec<_>>().join(" ");
                let name = if name.is_empty() {
                    UNNAMED_OBJECT.to_string()
                } else {
                    name
                };
                objects.push((name, Vec::new()));
                current = Some(objects.len() - 1);
            }
            Some("v") => {
                let mut parse = || -> Option<f64> { fields.next()?.parse().ok() };
                match (parse(), parse(), parse()) {
                    (Some(x), Some(y), Some(z)) => {
                        vertices.push(Vec3::new(x, y, z) * scale);
                    }
                    _ => {
                        return Err(malformed(line_no, "vertex needs three coordinates"));
                    }
                }
            }
            Some("f") => {
                let mut indices = Vec::new();
                for field in fields {
                    let index_str = field.split('/').next().unwrap_or(field);
                    let index: i64 = index_str
                        .parse()
                        .map_err(|_| malformed(line_no, "unparsable face index"))?;
                    let resolved = if index > 0 {
                        index as usize - 1
                    } else if index < 0 {
                        let from_end = vertices.len() as i64 + index;
                        if from_end < 0 {
                            return Err(malformed(line_no, "negative index out of range"));
                        }
                        from_end as usize
                    } else {
                        return Err(malformed(line_no, "face index 0 is invalid"));
                    };
                    if resolved >= vertices.len() {
                        return Err(malformed(line_no, "face index out of range"));
                    }
                    indices.push(resolved);
                }
                if indices.len() < 3 {
                    return Err(malformed(line_no, "face needs at least three vertices"));
                }
                let object = match current {
                    Some(i) => i,
                    None => {
                        objects.push((UNNAMED_OBJECT.to_string(), Vec::new()));
                        current = Some(objects.len() - 1);
                        objects.len() - 1
                    }
                };
                // Fan triangulation around the first vertex.
                for window in indices[1..].windows(2) {
                    objects[object].1.push([
                        vertices[indices[0]],
                        vertices[window[0]],
                        vertices[window[1]],
                    ]);
                }
            }
            _ => {}
        }
    }

    objects.retain(|(_, triangles)| !triangles.is_empty());
    log::info!(
        "parsed {} objects, {} triangles",
        objects.len(),
        objects.iter().map(|(_, t)| t.len()).sum::<usize>()
    );
    Ok(objects)
}

fn malformed(line_no: usize, reason: &str) -> crate::Error {
    crate::Error::Io(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("OBJ line {}: {}", line_no + 1, reason),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_named_objects_and_quads() {
        let src = "\
# comment
o Front Wall
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
f 1 2 3 4
o Floor
v 0 0 1
f 1 2 5
";
        let objects = parse_objects(Cursor::new(src), 1.0).unwrap();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].0, "Front Wall");
        // The quad fan-triangulates into two triangles.
        assert_eq!(objects[0].1.len(), 2);
        assert_eq!(objects[1].0, "Floor");
        assert_eq!(objects[1].1.len(), 1);
        assert_eq!(objects[1].1[0][2], Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn applies_scale_and_negative_indices() {
        let src = "\
o box
v 1000 0 0
v 0 1000 0
v 0 0 1000
f -3/1 -2/2 -1/3
";
        let objects = parse_objects(Cursor::new(src), 0.001).unwrap();
        assert_eq!(objects[0].1[0][0], Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(objects[0].1[0][2], Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn faces_before_object_get_a_default_name() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let objects = parse_objects(Cursor::new(src), 1.0).unwrap();
        assert_eq!(objects[0].0, "unnamed");
    }

    #[test]
    fn rejects_out_of_range_indices() {
        let src = "o x\nv 0 0 0\nf 1 2 3\n";
        assert!(parse_objects(Cursor::new(src), 1.0).is_err());
    }
}
