//! Binary STL export of the augmented room mesh.

use crate::mesh::Mesh;
use roomtrace_core::math::Vec3;
use std::io::{BufWriter, Write};
use std::path::Path;

const HEADER_LEN: usize = 80;

/// Writes the mesh as binary STL: an 80-byte header, a little-endian
/// `u32` triangle count, then 50 bytes per triangle (normal, three
/// vertices as `f32` triples, and a zero attribute word).
pub fn write_binary_stl(path: &Path, mesh: &Mesh) -> Result<(), crate::Error> {
    let file = std::fs::File::create(path)?;
    let mut out = BufWriter::new(file);

    let mut header = [0u8; HEADER_LEN];
    let tag = b"roomtrace binary STL export";
    header[..tag.len()].copy_from_slice(tag);
    out.write_all(&header)?;
    out.write_all(&(mesh.len() as u32).to_le_bytes())?;

    for tri in mesh.triangles() {
        write_vec3(&mut out, tri.normal)?;
        write_vec3(&mut out, tri.v0)?;
        write_vec3(&mut out, tri.v1)?;
        write_vec3(&mut out, tri.v2)?;
        out.write_all(&0u16.to_le_bytes())?;
    }
    out.flush()?;
    log::info!("wrote {} triangles to {}", mesh.len(), path.display());
    Ok(())
}

fn write_vec3(out: &mut impl Write, v: Vec3) -> std::io::Result<()> {
    out.write_all(&(v.x as f32).to_le_bytes())?;
    out.write_all(&(v.y as f32).to_le_bytes())?;
    out.write_all(&(v.z as f32).to_le_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{box_triangles, Mesh};
    use crate::surface::SurfaceId;

    #[test]
    fn stl_layout_is_well_formed() {
        let mesh = Mesh::from_triangles(box_triangles(
            Vec3::ZERO,
            Vec3::new(1.0, 2.0, 3.0),
            SurfaceId(0),
        ));
        let path = std::env::temp_dir().join("roomtrace_stl_layout_test.stl");
        write_binary_stl(&path, &mesh).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(bytes.len(), HEADER_LEN + 4 + mesh.len() * 50);
        let count = u32::from_le_bytes(bytes[HEADER_LEN..HEADER_LEN + 4].try_into().unwrap());
        assert_eq!(count as usize, mesh.len());
        // First record's normal matches the first triangle.
        let nx = f32::from_le_bytes(bytes[84..88].try_into().unwrap());
        assert_eq!(nx, mesh.triangles()[0].normal.x as f32);
    }
}
