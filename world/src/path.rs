//! Closed-loop path generation for stage orbits.

use std::f32::consts::TAU;

use deadline_orbit_core::OrbitPath;
use glam::Vec2;

/// Samples a counter-clockwise circle of the provided radius.
///
/// The loop starts at angle zero and `point_count` includes the closing
/// duplicate of the first point. Counts below two are raised to two so the
/// result always describes a loop.
#[must_use]
pub fn generate(radius: f32, point_count: usize) -> OrbitPath {
    let point_count = point_count.max(2);
    let divisions = (point_count - 1) as f32;
    let mut points: Vec<Vec2> = (0..point_count - 1)
        .map(|index| {
            let angle = TAU * index as f32 / divisions;
            Vec2::new(radius * angle.cos(), radius * angle.sin())
        })
        .collect();
    let first = points[0];
    points.push(first);
    OrbitPath::from_points(points)
}
