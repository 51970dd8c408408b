//! The listening triangle: placing two sources and the listener.

use roomtrace_core::math::Vec3;

/// How far the listener sits inside the equilateral triangle, toward the
/// line connecting the two sources. This is Thomas Northward's figure;
/// Rod Gervais' *Home Recording Studio* uses 0.38 m.
pub const LISTEN_DIST_INTO_TRIANGLE: f64 = 0.32;

/// Derives source positions, aiming normals and the listening position
/// from an offset-equilateral-triangle construction against the front
/// wall.
///
/// The listener does not sit at the triangle's apex: it is raised to
/// `listen_height` and pulled [`LISTEN_DIST_INTO_TRIANGLE`] meters back
/// toward the sources, so the ears sit on the source-to-apex paths.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListeningTriangle {
    /// A point on the front wall.
    pub reference_position: Vec3,
    /// Normal of the front wall. Currently unused; reserved for rotating
    /// the construction against non-axis-aligned front walls.
    pub reference_normal: Vec3,
    /// Distance of the sources from the front wall, meters.
    pub dist_from_front: f64,
    /// Distance of each source from the room's horizontal center line,
    /// meters.
    pub dist_from_center: f64,
    /// Height of the sources, meters.
    pub source_height: f64,
    /// Height of the listening position, meters.
    pub listen_height: f64,
}

impl ListeningTriangle {
    /// Position of the left source.
    pub fn left_source_position(&self) -> Vec3 {
        Vec3::new(
            self.reference_position.x + self.dist_from_front,
            self.reference_position.y - self.dist_from_center,
            self.source_height,
        )
    }

    /// Position of the right source.
    pub fn right_source_position(&self) -> Vec3 {
        Vec3::new(
            self.reference_position.x + self.dist_from_front,
            self.reference_position.y + self.dist_from_center,
            self.source_height,
        )
    }

    /// Aiming normal of the left source: toward the equilateral apex.
    pub fn left_source_normal(&self) -> Vec3 {
        (self.equilateral_position() - self.left_source_position()).normalize()
    }

    /// Aiming normal of the right source: toward the equilateral apex.
    pub fn right_source_normal(&self) -> Vec3 {
        (self.equilateral_position() - self.right_source_position()).normalize()
    }

    /// Height drop from listen height down to the equilateral apex,
    /// by proportional triangles along the source-to-apex hypotenuse.
    fn height_drop_to_apex(&self) -> f64 {
        let source_to_apex = 2.0 * self.dist_from_center;
        let along_hypotenuse = LISTEN_DIST_INTO_TRIANGLE * 2.0 / 3.0_f64.sqrt();
        let dist_along_hypotenuse_to_listen = source_to_apex - along_hypotenuse;
        let height_drop_to_listen = self.source_height - self.listen_height;
        height_drop_to_listen / dist_along_hypotenuse_to_listen * along_hypotenuse
    }

    /// The apex of the hypothetical equilateral triangle formed with the
    /// two sources. External renderers draw the direct-sound paths from
    /// each source through the listener to this point.
    pub fn equilateral_position(&self) -> Vec3 {
        let source_to_apex = 2.0 * self.dist_from_center;
        let source_x = self.reference_position.x + self.dist_from_front;
        let source_z = self.source_height;
        let apex_z = self.listen_height - self.height_drop_to_apex();
        // Solve ‖source − apex‖ = source_to_apex for the apex X; the apex
        // sits on the center line (y = reference y).
        let apex_x = (source_to_apex.powi(2)
            - (apex_z - source_z).powi(2)
            - self.dist_from_center.powi(2))
        .sqrt()
            + source_x;
        Vec3::new(apex_x, self.reference_position.y, apex_z)
    }

    /// The listening position: [`LISTEN_DIST_INTO_TRIANGLE`] meters from
    /// the apex back toward the sources, at listen height on the center
    /// line.
    pub fn listen_position(&self) -> Vec3 {
        let apex = self.equilateral_position();
        let height_drop = self.height_drop_to_apex();
        Vec3::new(
            apex.x - (LISTEN_DIST_INTO_TRIANGLE.powi(2) - height_drop.powi(2)).sqrt(),
            self.reference_position.y,
            self.listen_height,
        )
    }

    /// Distance from either source to the listening position.
    pub fn listen_distance(&self) -> f64 {
        (self.listen_position() - self.left_source_position()).length()
    }

    /// How far `listen_pos` deviates from this triangle's canonical
    /// listening position.
    pub fn deviation(&self, listen_pos: Vec3) -> f64 {
        (listen_pos - self.listen_position()).length()
    }
}
