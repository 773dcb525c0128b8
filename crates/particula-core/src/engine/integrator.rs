use super::config::{ConfigError, IntegratorConfig, IntegratorConfigBuilder};
use super::constraints::ConstraintSolver;
use super::error::EngineError;
use super::platform::Platform;
use super::progress::{Progress, ProgressReporter};
use super::state::SimulationState;
use crate::core::forcefield::groups::ForceGroupMask;
use crate::core::forcefield::set::ForceSet;
use crate::core::forcefield::term::{ForceError, ForceEvaluation};
use nalgebra::{Point3, Vector3};
use std::fmt;
use tracing::{instrument, trace};

/// Everything an integrator reads while stepping, borrowed from the owning context.
#[derive(Clone, Copy)]
pub struct Dynamics<'a> {
    pub forces: &'a ForceSet,
    pub platform: &'a dyn Platform,
    pub solver: &'a ConstraintSolver,
    pub inverse_masses: &'a [f64],
}

impl Dynamics<'_> {
    pub fn evaluate(
        &self,
        state: &SimulationState,
        positions: &[Point3<f64>],
        mask: ForceGroupMask,
    ) -> Result<ForceEvaluation, ForceError> {
        self.platform
            .calc_forces_and_energy(self.forces, positions, state.periodic_box(), mask)
    }
}

/// A time-stepping policy.
///
/// Stepping needs exclusive access to the state, so an integrator is either idle or in the
/// middle of exactly one `step` call; it returns to idle on every exit path.
pub trait Integrator: fmt::Debug + Send {
    fn name(&self) -> &str;

    fn config(&self) -> &IntegratorConfig;

    /// Replaces the configuration after validating it.
    fn set_config(&mut self, config: IntegratorConfig) -> Result<(), ConfigError>;

    /// Advances `state` by `steps` steps, reporting each completed one.
    ///
    /// A step that fails leaves `state` exactly as it was after the previous step.
    fn step(
        &mut self,
        state: &mut SimulationState,
        dynamics: &Dynamics<'_>,
        steps: u64,
        reporter: &ProgressReporter,
    ) -> Result<(), EngineError>;
}

/// Velocity Verlet with SHAKE position and RATTLE velocity constraints.
#[derive(Debug, Clone, PartialEq)]
pub struct VerletIntegrator {
    config: IntegratorConfig,
}

impl VerletIntegrator {
    /// An integrator with timestep `step_size` (ps) and default constraint settings.
    pub fn new(step_size: f64) -> Result<Self, ConfigError> {
        Ok(Self {
            config: IntegratorConfig::with_step_size(step_size)?,
        })
    }

    pub fn with_config(config: IntegratorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn step_size(&self) -> f64 {
        self.config.step_size
    }

    pub fn set_step_size(&mut self, step_size: f64) -> Result<(), ConfigError> {
        self.rebuild(|b| b.step_size(step_size))
    }

    pub fn constraint_tolerance(&self) -> f64 {
        self.config.constraint_tolerance
    }

    pub fn set_constraint_tolerance(&mut self, tolerance: f64) -> Result<(), ConfigError> {
        self.rebuild(|b| b.constraint_tolerance(tolerance))
    }

    pub fn integration_groups(&self) -> ForceGroupMask {
        self.config.integration_groups
    }

    pub fn set_integration_groups(&mut self, mask: ForceGroupMask) {
        self.config.integration_groups = mask;
    }

    pub fn max_constraint_iterations(&self) -> usize {
        self.config.max_constraint_iterations
    }

    pub fn set_max_constraint_iterations(&mut self, iterations: usize) -> Result<(), ConfigError> {
        self.rebuild(|b| b.max_constraint_iterations(iterations))
    }

    fn rebuild<F>(&mut self, change: F) -> Result<(), ConfigError>
    where
        F: FnOnce(IntegratorConfigBuilder) -> IntegratorConfigBuilder,
    {
        let builder = IntegratorConfigBuilder::new()
            .step_size(self.config.step_size)
            .constraint_tolerance(self.config.constraint_tolerance)
            .integration_groups(self.config.integration_groups)
            .max_constraint_iterations(self.config.max_constraint_iterations);
        self.config = change(builder).build()?;
        Ok(())
    }
}

impl Integrator for VerletIntegrator {
    fn name(&self) -> &str {
        "VerletIntegrator"
    }

    fn config(&self) -> &IntegratorConfig {
        &self.config
    }

    fn set_config(&mut self, config: IntegratorConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    #[instrument(skip_all, name = "verlet_step", fields(steps = steps))]
    fn step(
        &mut self,
        state: &mut SimulationState,
        dynamics: &Dynamics<'_>,
        steps: u64,
        reporter: &ProgressReporter,
    ) -> Result<(), EngineError> {
        if steps == 0 {
            return Ok(());
        }
        let IntegratorConfig {
            step_size: dt,
            constraint_tolerance: tolerance,
            integration_groups: mask,
            max_constraint_iterations: max_iterations,
        } = self.config;
        let half_dt = 0.5 * dt;
        let w = dynamics.inverse_masses;
        let solver = dynamics.solver;

        let mut forces = dynamics.evaluate(state, &state.positions, mask)?.forces;
        let mut trial_positions: Vec<Point3<f64>> = Vec::with_capacity(state.num_particles());
        let mut trial_velocities: Vec<Vector3<f64>> = Vec::with_capacity(state.num_particles());

        for _ in 0..steps {
            let step = state.step_count + 1;
            let instability = |source| EngineError::NumericalInstability { step, source };

            // Half kick and drift. Massless particles stay exactly at rest.
            trial_velocities.clear();
            trial_velocities.extend(state.velocities.iter().zip(&forces).zip(w).map(
                |((v, f), &wi)| {
                    if wi == 0.0 {
                        Vector3::zeros()
                    } else {
                        v + f * (half_dt * wi)
                    }
                },
            ));
            trial_positions.clear();
            trial_positions.extend(
                state
                    .positions
                    .iter()
                    .zip(&trial_velocities)
                    .map(|(x, v)| x + v * dt),
            );

            if solver.has_constraints() {
                solver
                    .project_positions(&mut trial_positions, &state.positions, tolerance, max_iterations)
                    .map_err(instability)?;
                for ((v, x_new), x_old) in trial_velocities
                    .iter_mut()
                    .zip(&trial_positions)
                    .zip(&state.positions)
                {
                    *v = (x_new - x_old) / dt;
                }
            }

            let next = dynamics.evaluate(state, &trial_positions, mask)?;
            for ((v, f), &wi) in trial_velocities.iter_mut().zip(&next.forces).zip(w) {
                if wi != 0.0 {
                    *v += f * (half_dt * wi);
                }
            }
            if solver.has_constraints() {
                solver
                    .project_velocities(&trial_positions, &mut trial_velocities, tolerance, dt, max_iterations)
                    .map_err(instability)?;
            }

            std::mem::swap(&mut state.positions, &mut trial_positions);
            std::mem::swap(&mut state.velocities, &mut trial_velocities);
            state.time += dt;
            state.step_count = step;
            forces = next.forces;

            trace!(step, energy = next.energy, "Step committed");
            reporter.report(Progress::StepCompleted {
                step,
                time: state.time,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::external::UniformFieldForce;
    use crate::core::models::topology::Topology;
    use crate::engine::platform::ReferencePlatform;

    struct Fixture {
        topology: Topology,
        solver: ConstraintSolver,
        inverse_masses: Vec<f64>,
    }

    impl Fixture {
        fn new(topology: Topology) -> Self {
            Self {
                solver: ConstraintSolver::new(&topology),
                inverse_masses: topology.inverse_masses(),
                topology,
            }
        }

        fn dynamics(&self) -> Dynamics<'_> {
            Dynamics {
                forces: self.topology.forces(),
                platform: &ReferencePlatform,
                solver: &self.solver,
                inverse_masses: &self.inverse_masses,
            }
        }
    }

    #[test]
    fn free_particle_moves_in_a_straight_line() {
        let mut topology = Topology::new();
        topology.add_particle(2.0).unwrap();
        let fixture = Fixture::new(topology);
        let mut state = SimulationState::new(1, None);
        state.velocities[0] = Vector3::new(1.0, -2.0, 0.5);
        let mut integrator = VerletIntegrator::new(0.1).unwrap();

        integrator
            .step(&mut state, &fixture.dynamics(), 10, &ProgressReporter::new())
            .unwrap();

        assert!((state.positions[0] - Point3::new(1.0, -2.0, 0.5)).norm() < 1e-12);
        assert_eq!(state.velocities[0], Vector3::new(1.0, -2.0, 0.5));
        assert_eq!(state.step_count, 10);
        assert!((state.time - 1.0).abs() < 1e-12);
    }

    #[test]
    fn constant_force_gives_exact_uniform_acceleration() {
        let mut topology = Topology::new();
        topology.add_particle(2.0).unwrap();
        let mut field = UniformFieldForce::new(Vector3::new(4.0, 0.0, 0.0));
        field.add_particle(0);
        topology.add_force(field, 0).unwrap();
        let fixture = Fixture::new(topology);
        let mut state = SimulationState::new(1, None);
        let mut integrator = VerletIntegrator::new(0.01).unwrap();

        integrator
            .step(&mut state, &fixture.dynamics(), 100, &ProgressReporter::new())
            .unwrap();

        // a = 2, t = 1
        assert!((state.positions[0].x - 1.0).abs() < 1e-10);
        assert!((state.velocities[0].x - 2.0).abs() < 1e-10);
    }

    #[test]
    fn massless_particle_never_moves() {
        let mut topology = Topology::new();
        topology.add_particle(0.0).unwrap();
        let mut field = UniformFieldForce::new(Vector3::new(1.0, 1.0, 1.0));
        field.add_particle(0);
        topology.add_force(field, 0).unwrap();
        let fixture = Fixture::new(topology);
        let mut state = SimulationState::new(1, None);
        state.positions[0] = Point3::new(0.3, 0.2, 0.1);
        state.velocities[0] = Vector3::new(5.0, 0.0, 0.0);
        let mut integrator = VerletIntegrator::new(0.01).unwrap();

        integrator
            .step(&mut state, &fixture.dynamics(), 5, &ProgressReporter::new())
            .unwrap();

        assert_eq!(state.positions[0], Point3::new(0.3, 0.2, 0.1));
        assert_eq!(state.velocities[0], Vector3::zeros());
    }

    #[test]
    fn failed_step_commits_nothing() {
        let mut topology = Topology::new();
        topology.add_particle(1.0).unwrap();
        topology.add_particle(1.0).unwrap();
        topology.add_constraint(0, 1, 1.0).unwrap();
        let fixture = Fixture::new(topology);
        let mut state = SimulationState::new(2, None);
        state.positions[1] = Point3::new(1.0, 0.0, 0.0);
        state.velocities[1] = Vector3::new(0.0, 50.0, 0.0);
        let before = state.clone();
        let mut integrator = VerletIntegrator::new(0.1).unwrap();
        integrator.set_max_constraint_iterations(1).unwrap();
        integrator.set_constraint_tolerance(1e-12).unwrap();

        let result = integrator.step(&mut state, &fixture.dynamics(), 3, &ProgressReporter::new());

        assert!(matches!(
            result,
            Err(EngineError::NumericalInstability { step: 1, .. })
        ));
        assert_eq!(state, before);
    }

    #[test]
    fn setters_validate_values() {
        let mut integrator = VerletIntegrator::new(0.002).unwrap();
        assert!(integrator.set_step_size(-1.0).is_err());
        assert_eq!(integrator.step_size(), 0.002);
        integrator.set_constraint_tolerance(1e-6).unwrap();
        assert_eq!(integrator.constraint_tolerance(), 1e-6);
        integrator.set_integration_groups(ForceGroupMask::NONE);
        assert!(integrator.integration_groups().is_empty());
        assert!(VerletIntegrator::new(f64::NAN).is_err());
    }
}
