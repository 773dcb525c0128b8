//! SHAKE/RATTLE relaxation of holonomic distance constraints.
//!
//! Constraints are partitioned into clusters, the connected components of the graph whose
//! vertices are particles and whose edges are constraints. Clusters share no particle, so they
//! are relaxed independently (concurrently with the `parallel` feature). Inside a cluster the
//! constraints are corrected one after another in Gauss–Seidel sweeps until every constraint
//! of the cluster is within tolerance.

use crate::core::models::topology::Topology;
use nalgebra::{Point3, Vector3};
use thiserror::Error;
use tracing::{trace, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// A SHAKE correction is refused when the displaced bond is this close to perpendicular to its
/// reference direction, relative to `d²`.
const ILL_CONDITIONED_RATIO: f64 = 1e-12;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConstraintError {
    #[error(
        "Constraint relaxation did not converge after {iterations} iterations (worst relative error {max_error:.3e} on constraint {constraint})"
    )]
    NotConverged {
        iterations: usize,
        max_error: f64,
        constraint: usize,
    },

    #[error("Constraint {constraint} is ill-conditioned: its bond turned perpendicular to the reference direction")]
    IllConditioned { constraint: usize },

    #[error("Expected coordinates for {expected} particles, got {found}")]
    LengthMismatch { expected: usize, found: usize },
}

/// Outcome of a successful projection.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProjectionReport {
    /// Largest number of sweeps any cluster needed.
    pub iterations: usize,
    /// Largest remaining error over all constraints, in the metric of the projection.
    pub max_error: f64,
}

impl ProjectionReport {
    fn merge(self, other: Self) -> Self {
        Self {
            iterations: self.iterations.max(other.iterations),
            max_error: self.max_error.max(other.max_error),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ClusterConstraint {
    /// Index in the topology's constraint list.
    index: usize,
    a: usize,
    b: usize,
    distance: f64,
    distance_sq: f64,
}

#[derive(Debug, Clone, Default)]
struct Cluster {
    /// Global particle indices; position `k` is local index `k`.
    particles: Vec<usize>,
    inverse_masses: Vec<f64>,
    constraints: Vec<ClusterConstraint>,
}

/// Iterative projector onto the constraint manifold of one topology.
#[derive(Debug, Clone, Default)]
pub struct ConstraintSolver {
    num_particles: usize,
    clusters: Vec<Cluster>,
}

impl ConstraintSolver {
    /// Builds the cluster decomposition for `topology`.
    ///
    /// Constraints between two massless particles are skipped: neither endpoint can move, so
    /// there is nothing to enforce.
    pub fn new(topology: &Topology) -> Self {
        let num_particles = topology.num_particles();
        let inverse_masses = topology.inverse_masses();

        let active: Vec<usize> = topology
            .constraints()
            .iter()
            .enumerate()
            .filter(|(_, c)| inverse_masses[c.particle1] + inverse_masses[c.particle2] > 0.0)
            .map(|(index, _)| index)
            .collect();

        let mut components = DisjointSet::new(num_particles);
        for &index in &active {
            let c = &topology.constraints()[index];
            components.union(c.particle1, c.particle2);
        }

        let mut cluster_of_root: Vec<Option<usize>> = vec![None; num_particles];
        let mut local_index: Vec<Option<usize>> = vec![None; num_particles];
        let mut clusters: Vec<Cluster> = Vec::new();

        for &index in &active {
            let c = &topology.constraints()[index];
            let root = components.find(c.particle1);
            let cluster_id = *cluster_of_root[root].get_or_insert_with(|| {
                clusters.push(Cluster::default());
                clusters.len() - 1
            });
            let cluster = &mut clusters[cluster_id];

            let mut local = |particle: usize| {
                *local_index[particle].get_or_insert_with(|| {
                    cluster.particles.push(particle);
                    cluster.inverse_masses.push(inverse_masses[particle]);
                    cluster.particles.len() - 1
                })
            };
            let a = local(c.particle1);
            let b = local(c.particle2);

            cluster.constraints.push(ClusterConstraint {
                index,
                a,
                b,
                distance: c.distance,
                distance_sq: c.distance * c.distance,
            });
        }

        trace!(
            constraints = active.len(),
            clusters = clusters.len(),
            "Built constraint clusters"
        );

        Self {
            num_particles,
            clusters,
        }
    }

    pub fn has_constraints(&self) -> bool {
        !self.clusters.is_empty()
    }

    /// Number of constraints actually enforced, i.e. excluding massless-massless pairs.
    pub fn num_active_constraints(&self) -> usize {
        self.clusters.iter().map(|c| c.constraints.len()).sum()
    }

    pub fn num_clusters(&self) -> usize {
        self.clusters.len()
    }

    /// SHAKE: moves `trial` onto the constraint manifold.
    ///
    /// Corrections are applied along the bond vectors of `reference` (the positions before the
    /// unconstrained update), weighted by inverse mass. Converged when every constraint
    /// satisfies `|r − d| / d ≤ tolerance`. On failure `trial` is left untouched.
    pub fn project_positions(
        &self,
        trial: &mut [Point3<f64>],
        reference: &[Point3<f64>],
        tolerance: f64,
        max_iterations: usize,
    ) -> Result<ProjectionReport, ConstraintError> {
        self.check_len(trial.len())?;
        self.check_len(reference.len())?;
        if !self.has_constraints() {
            return Ok(ProjectionReport::default());
        }

        let shared: &[Point3<f64>] = trial;

        #[cfg(not(feature = "parallel"))]
        let iterator = self.clusters.iter();
        #[cfg(feature = "parallel")]
        let iterator = self.clusters.par_iter();

        let results: Vec<(Vec<Point3<f64>>, ProjectionReport)> = iterator
            .map(|cluster| cluster.shake(shared, reference, tolerance, max_iterations))
            .collect::<Result<Vec<_>, ConstraintError>>()
            .inspect_err(|e| warn!("Position constraint projection failed: {e}"))?;

        let mut report = ProjectionReport::default();
        for (cluster, (local, cluster_report)) in self.clusters.iter().zip(results) {
            for (&particle, position) in cluster.particles.iter().zip(local) {
                trial[particle] = position;
            }
            report = report.merge(cluster_report);
        }
        trace!(
            iterations = report.iterations,
            max_error = report.max_error,
            "Positions constrained"
        );
        Ok(report)
    }

    /// RATTLE: removes the velocity components that would change constrained distances.
    ///
    /// Converged when every constraint satisfies `|r · v_ab| Δt / d² ≤ tolerance`, i.e. the
    /// residual velocity would change the bond length by at most `tolerance` (relative) over
    /// one step of length `step_size`. On failure `velocities` is left untouched.
    pub fn project_velocities(
        &self,
        positions: &[Point3<f64>],
        velocities: &mut [Vector3<f64>],
        tolerance: f64,
        step_size: f64,
        max_iterations: usize,
    ) -> Result<ProjectionReport, ConstraintError> {
        self.check_len(positions.len())?;
        self.check_len(velocities.len())?;
        if !self.has_constraints() {
            return Ok(ProjectionReport::default());
        }

        let shared: &[Vector3<f64>] = velocities;

        #[cfg(not(feature = "parallel"))]
        let iterator = self.clusters.iter();
        #[cfg(feature = "parallel")]
        let iterator = self.clusters.par_iter();

        let results: Vec<(Vec<Vector3<f64>>, ProjectionReport)> = iterator
            .map(|cluster| {
                cluster.rattle(positions, shared, tolerance, step_size, max_iterations)
            })
            .collect::<Result<Vec<_>, ConstraintError>>()
            .inspect_err(|e| warn!("Velocity constraint projection failed: {e}"))?;

        let mut report = ProjectionReport::default();
        for (cluster, (local, cluster_report)) in self.clusters.iter().zip(results) {
            for (&particle, velocity) in cluster.particles.iter().zip(local) {
                velocities[particle] = velocity;
            }
            report = report.merge(cluster_report);
        }
        trace!(
            iterations = report.iterations,
            max_error = report.max_error,
            "Velocities constrained"
        );
        Ok(report)
    }

    fn check_len(&self, found: usize) -> Result<(), ConstraintError> {
        if found == self.num_particles {
            Ok(())
        } else {
            Err(ConstraintError::LengthMismatch {
                expected: self.num_particles,
                found,
            })
        }
    }
}

impl Cluster {
    fn gather<T: Copy>(&self, global: &[T]) -> Vec<T> {
        self.particles.iter().map(|&p| global[p]).collect()
    }

    /// Worst constraint as `(position in self.constraints, error)`.
    fn worst<F>(&self, error: F) -> (usize, f64)
    where
        F: Fn(&ClusterConstraint) -> f64,
    {
        self.constraints
            .iter()
            .map(|c| {
                let e = error(c);
                // NaN coordinates must never look converged.
                if e.is_nan() { f64::INFINITY } else { e }
            })
            .enumerate()
            .fold((0, 0.0), |worst, (k, e)| if e > worst.1 { (k, e) } else { worst })
    }

    fn shake(
        &self,
        trial: &[Point3<f64>],
        reference: &[Point3<f64>],
        tolerance: f64,
        max_iterations: usize,
    ) -> Result<(Vec<Point3<f64>>, ProjectionReport), ConstraintError> {
        let mut x = self.gather(trial);
        let x_ref = self.gather(reference);
        let reference_bonds: Vec<Vector3<f64>> = self
            .constraints
            .iter()
            .map(|c| x_ref[c.a] - x_ref[c.b])
            .collect();

        let mut iterations = 0;
        loop {
            let (worst, max_error) =
                self.worst(|c| ((x[c.a] - x[c.b]).norm() - c.distance).abs() / c.distance);
            if max_error <= tolerance {
                return Ok((
                    x,
                    ProjectionReport {
                        iterations,
                        max_error,
                    },
                ));
            }
            if iterations == max_iterations {
                return Err(ConstraintError::NotConverged {
                    iterations,
                    max_error,
                    constraint: self.constraints[worst].index,
                });
            }

            for (c, s) in self.constraints.iter().zip(&reference_bonds) {
                let r = x[c.a] - x[c.b];
                let r_dot_s = r.dot(s);
                if r_dot_s <= ILL_CONDITIONED_RATIO * c.distance_sq {
                    return Err(ConstraintError::IllConditioned {
                        constraint: c.index,
                    });
                }
                let (wa, wb) = (self.inverse_masses[c.a], self.inverse_masses[c.b]);
                let g = (c.distance_sq - r.norm_squared()) / (2.0 * (wa + wb) * r_dot_s);
                x[c.a] += s * (g * wa);
                x[c.b] -= s * (g * wb);
            }
            iterations += 1;
        }
    }

    fn rattle(
        &self,
        positions: &[Point3<f64>],
        velocities: &[Vector3<f64>],
        tolerance: f64,
        step_size: f64,
        max_iterations: usize,
    ) -> Result<(Vec<Vector3<f64>>, ProjectionReport), ConstraintError> {
        let x = self.gather(positions);
        let mut v = self.gather(velocities);
        let bonds: Vec<Vector3<f64>> = self.constraints.iter().map(|c| x[c.a] - x[c.b]).collect();

        let mut iterations = 0;
        loop {
            let (worst, max_error) = self.worst(|c| {
                ((x[c.a] - x[c.b]).dot(&(v[c.a] - v[c.b])) * step_size / c.distance_sq).abs()
            });
            if max_error <= tolerance {
                return Ok((
                    v,
                    ProjectionReport {
                        iterations,
                        max_error,
                    },
                ));
            }
            if iterations == max_iterations {
                return Err(ConstraintError::NotConverged {
                    iterations,
                    max_error,
                    constraint: self.constraints[worst].index,
                });
            }

            for (c, r) in self.constraints.iter().zip(&bonds) {
                let r_sq = r.norm_squared();
                if r_sq == 0.0 {
                    return Err(ConstraintError::IllConditioned {
                        constraint: c.index,
                    });
                }
                let (wa, wb) = (self.inverse_masses[c.a], self.inverse_masses[c.b]);
                let k = r.dot(&(v[c.a] - v[c.b])) / ((wa + wb) * r_sq);
                v[c.a] -= r * (k * wa);
                v[c.b] += r * (k * wb);
            }
            iterations += 1;
        }
    }
}

/// Union–find over particle indices with path halving and union by size.
#[derive(Debug)]
struct DisjointSet {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (mut ra, mut rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        if self.size[ra] < self.size[rb] {
            std::mem::swap(&mut ra, &mut rb);
        }
        self.parent[rb] = ra;
        self.size[ra] += self.size[rb];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-5;

    fn topology(masses: &[f64], constraints: &[(usize, usize, f64)]) -> Topology {
        let mut topology = Topology::new();
        for &mass in masses {
            topology.add_particle(mass).unwrap();
        }
        for &(i, j, d) in constraints {
            topology.add_constraint(i, j, d).unwrap();
        }
        topology
    }

    fn max_relative_error(topology: &Topology, positions: &[Point3<f64>]) -> f64 {
        topology
            .constraints()
            .iter()
            .map(|c| c.relative_error(positions))
            .fold(0.0, f64::max)
    }

    #[test]
    fn disjoint_set_merges_components() {
        let mut set = DisjointSet::new(5);
        set.union(0, 1);
        set.union(3, 4);
        set.union(1, 4);
        assert_eq!(set.find(0), set.find(3));
        assert_ne!(set.find(0), set.find(2));
    }

    #[test]
    fn clusters_follow_connected_components() {
        let topology = topology(
            &[1.0; 7],
            &[(0, 1, 1.0), (1, 2, 1.0), (4, 5, 1.0), (2, 3, 1.0), (5, 6, 1.0)],
        );
        let solver = ConstraintSolver::new(&topology);
        assert_eq!(solver.num_clusters(), 2);
        assert_eq!(solver.num_active_constraints(), 5);
        assert_eq!(solver.clusters[0].particles, vec![0, 1, 2, 3]);
        assert_eq!(solver.clusters[1].particles, vec![4, 5, 6]);
    }

    #[test]
    fn massless_pairs_are_not_enforced() {
        let topology = topology(&[0.0, 0.0, 1.0], &[(0, 1, 1.5)]);
        let solver = ConstraintSolver::new(&topology);
        assert!(!solver.has_constraints());

        let mut trial = vec![
            Point3::new(-1.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::origin(),
        ];
        let reference = trial.clone();
        let report = solver
            .project_positions(&mut trial, &reference, TOLERANCE, 10)
            .unwrap();
        assert_eq!(report, ProjectionReport::default());
        assert_eq!(trial, reference);
    }

    #[test]
    fn shake_restores_stretched_bond_conserving_center_of_mass() {
        let topology = topology(&[1.0, 3.0], &[(0, 1, 1.0)]);
        let solver = ConstraintSolver::new(&topology);
        let reference = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
        let mut trial = vec![Point3::new(-0.05, 0.01, 0.0), Point3::new(1.05, 0.0, 0.0)];
        let com_before = (trial[0].coords + 3.0 * trial[1].coords) / 4.0;

        let report = solver
            .project_positions(&mut trial, &reference, TOLERANCE, 100)
            .unwrap();

        assert!(report.iterations > 0);
        assert!(max_relative_error(&topology, &trial) <= TOLERANCE);
        let com_after = (trial[0].coords + 3.0 * trial[1].coords) / 4.0;
        assert!((com_after - com_before).norm() < 1e-12);
    }

    #[test]
    fn shake_converges_for_rigid_triangle() {
        let d = 2f64.sqrt();
        let topology = topology(&[1.0, 1.0, 1.0], &[(0, 1, 1.0), (0, 2, 1.0), (1, 2, d)]);
        let solver = ConstraintSolver::new(&topology);
        let reference = vec![
            Point3::origin(),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let mut trial = vec![
            Point3::new(0.01, -0.02, 0.005),
            Point3::new(1.02, 0.01, 0.0),
            Point3::new(-0.01, 0.98, 0.02),
        ];

        solver
            .project_positions(&mut trial, &reference, TOLERANCE, 500)
            .unwrap();

        assert!(max_relative_error(&topology, &trial) <= TOLERANCE);
    }

    #[test]
    fn shake_reports_non_convergence() {
        let topology = topology(&[1.0, 1.0, 1.0], &[(0, 1, 1.0), (1, 2, 1.0)]);
        let solver = ConstraintSolver::new(&topology);
        let reference = vec![
            Point3::origin(),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ];
        let mut trial = vec![
            Point3::new(-0.2, 0.0, 0.0),
            Point3::new(1.0, 0.1, 0.0),
            Point3::new(2.3, 0.0, 0.0),
        ];
        let original = trial.clone();

        let result = solver.project_positions(&mut trial, &reference, 1e-12, 1);

        assert!(matches!(
            result,
            Err(ConstraintError::NotConverged { iterations: 1, .. })
        ));
        assert_eq!(trial, original);
    }

    #[test]
    fn shake_rejects_bond_perpendicular_to_reference() {
        let topology = topology(&[1.0, 1.0], &[(0, 1, 1.0)]);
        let solver = ConstraintSolver::new(&topology);
        let reference = vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)];
        let mut trial = vec![Point3::origin(), Point3::new(0.0, 1.5, 0.0)];

        let result = solver.project_positions(&mut trial, &reference, TOLERANCE, 10);

        assert_eq!(result, Err(ConstraintError::IllConditioned { constraint: 0 }));
    }

    #[test]
    fn rattle_removes_bond_stretching_velocity() {
        let topology = topology(&[2.0, 1.0], &[(0, 1, 1.0)]);
        let solver = ConstraintSolver::new(&topology);
        let positions = vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)];
        let mut velocities = vec![Vector3::new(-1.0, 0.5, 0.0), Vector3::new(2.0, 0.0, 1.0)];
        let momentum_before = 2.0 * velocities[0] + velocities[1];

        solver
            .project_velocities(&positions, &mut velocities, TOLERANCE, 0.001, 100)
            .unwrap();

        let relative = velocities[0] - velocities[1];
        assert!(relative.x.abs() < 1e-10);
        assert_eq!(velocities[0].y, 0.5);
        assert_eq!(velocities[1].z, 1.0);
        let momentum_after = 2.0 * velocities[0] + velocities[1];
        assert!((momentum_after - momentum_before).norm() < 1e-12);
    }

    #[test]
    fn projection_checks_particle_count() {
        let topology = topology(&[1.0, 1.0], &[(0, 1, 1.0)]);
        let solver = ConstraintSolver::new(&topology);
        let mut velocities = vec![Vector3::zeros(); 3];
        let positions = vec![Point3::origin(); 2];
        assert_eq!(
            solver.project_velocities(&positions, &mut velocities, TOLERANCE, 0.001, 10),
            Err(ConstraintError::LengthMismatch {
                expected: 2,
                found: 3
            })
        );
    }
}
