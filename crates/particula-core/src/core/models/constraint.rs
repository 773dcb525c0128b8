use nalgebra::Point3;

/// A holonomic constraint fixing the distance between two particles.
///
/// The pair is unordered: `(i, j, d)` and `(j, i, d)` describe the same constraint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constraint {
    pub particle1: usize,
    pub particle2: usize,
    /// Target distance in nm. Always finite and positive.
    pub distance: f64,
}

impl Constraint {
    pub fn new(particle1: usize, particle2: usize, distance: f64) -> Self {
        Self {
            particle1,
            particle2,
            distance,
        }
    }

    pub fn contains(&self, particle: usize) -> bool {
        self.particle1 == particle || self.particle2 == particle
    }

    /// Distance between the two constrained particles in the given coordinates.
    pub fn current_distance(&self, positions: &[Point3<f64>]) -> f64 {
        (positions[self.particle1] - positions[self.particle2]).norm()
    }

    /// `|current distance - target| / target` in the given coordinates.
    pub fn relative_error(&self, positions: &[Point3<f64>]) -> f64 {
        (self.current_distance(positions) - self.distance).abs() / self.distance
    }
}
