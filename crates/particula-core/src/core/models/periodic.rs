use nalgebra::Vector3;

/// Periodic box vectors.
///
/// The engine does not wrap coordinates; the box is handed unchanged to every force term, and
/// terms that implement periodic interactions decide how to use it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodicBox {
    pub a: Vector3<f64>,
    pub b: Vector3<f64>,
    pub c: Vector3<f64>,
}

impl PeriodicBox {
    pub fn new(a: Vector3<f64>, b: Vector3<f64>, c: Vector3<f64>) -> Self {
        Self { a, b, c }
    }

    pub fn cubic(edge: f64) -> Self {
        Self::new(
            Vector3::new(edge, 0.0, 0.0),
            Vector3::new(0.0, edge, 0.0),
            Vector3::new(0.0, 0.0, edge),
        )
    }

    pub fn volume(&self) -> f64 {
        self.a.dot(&self.b.cross(&self.c)).abs()
    }
}
