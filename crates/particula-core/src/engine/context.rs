use super::constraints::{ConstraintSolver, ProjectionReport};
use super::error::{ConfigurationError, EngineError};
use super::integrator::{Dynamics, Integrator};
use super::platform::Platform;
use super::progress::{Progress, ProgressReporter};
use super::snapshot::{StateFlags, StateSnapshot};
use super::state::SimulationState;
use super::utils::sampling::{maxwell_boltzmann_velocities, rng_from_seed};
use crate::core::forcefield::groups::ForceGroupMask;
use crate::core::forcefield::term::ForceTerm;
use crate::core::models::periodic::PeriodicBox;
use crate::core::models::topology::Topology;
use nalgebra::{Point3, Vector3};
use tracing::{debug, info, instrument, warn};

/// A topology bound to an integrator and a compute platform, together with the live state.
///
/// The context is the only way to mutate a simulation. It validates the topology once at
/// creation, after which the topology is read-only.
#[derive(Debug)]
pub struct Context {
    topology: Topology,
    integrator: Box<dyn Integrator>,
    platform: Box<dyn Platform>,
    solver: ConstraintSolver,
    inverse_masses: Vec<f64>,
    state: SimulationState,
}

impl Context {
    pub fn new<I, P>(topology: Topology, integrator: I, platform: P) -> Result<Self, EngineError>
    where
        I: Integrator + 'static,
        P: Platform + 'static,
    {
        Self::from_parts(topology, Box::new(integrator), Box::new(platform))
    }

    #[instrument(skip_all, name = "context_create")]
    pub fn from_parts(
        topology: Topology,
        integrator: Box<dyn Integrator>,
        platform: Box<dyn Platform>,
    ) -> Result<Self, EngineError> {
        validate_topology(&topology)?;

        let solver = ConstraintSolver::new(&topology);
        let inverse_masses = topology.inverse_masses();
        let state =
            SimulationState::new(topology.num_particles(), topology.default_periodic_box().copied());

        info!(
            particles = topology.num_particles(),
            constraints = topology.num_constraints(),
            clusters = solver.num_clusters(),
            forces = topology.num_forces(),
            platform = platform.name(),
            integrator = integrator.name(),
            "Context created"
        );

        Ok(Self {
            topology,
            integrator,
            platform,
            solver,
            inverse_masses,
            state,
        })
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn integrator(&self) -> &dyn Integrator {
        self.integrator.as_ref()
    }

    pub fn integrator_mut(&mut self) -> &mut dyn Integrator {
        self.integrator.as_mut()
    }

    pub fn platform_name(&self) -> &'static str {
        self.platform.name()
    }

    pub fn num_particles(&self) -> usize {
        self.topology.num_particles()
    }

    pub fn time(&self) -> f64 {
        self.state.time
    }

    pub fn step_count(&self) -> u64 {
        self.state.step_count
    }

    pub fn set_positions(&mut self, positions: &[Point3<f64>]) -> Result<(), EngineError> {
        self.check_len("positions", positions.len())?;
        self.state.positions.copy_from_slice(positions);
        Ok(())
    }

    /// Sets velocities as given; no constraint projection is applied.
    pub fn set_velocities(&mut self, velocities: &[Vector3<f64>]) -> Result<(), EngineError> {
        self.check_len("velocities", velocities.len())?;
        self.state.velocities.copy_from_slice(velocities);
        Ok(())
    }

    /// Draws velocities from the Maxwell–Boltzmann distribution at `temperature` and removes
    /// their components along constraints.
    ///
    /// With `Some(seed)` the draw is reproducible.
    #[instrument(skip(self), name = "set_velocities_to_temperature")]
    pub fn set_velocities_to_temperature(
        &mut self,
        temperature: f64,
        seed: Option<u64>,
    ) -> Result<(), EngineError> {
        let mut rng = rng_from_seed(seed);
        let mut velocities =
            maxwell_boltzmann_velocities(self.topology.particles(), temperature, &mut rng)?;

        let config = *self.integrator.config();
        self.solver
            .project_velocities(
                &self.state.positions,
                &mut velocities,
                config.constraint_tolerance,
                config.step_size,
                config.max_constraint_iterations,
            )
            .map_err(|source| EngineError::NumericalInstability {
                step: self.state.step_count,
                source,
            })?;

        self.state.velocities = velocities;
        Ok(())
    }

    pub fn set_time(&mut self, time: f64) {
        self.state.time = time;
    }

    pub fn set_step_count(&mut self, step_count: u64) {
        self.state.step_count = step_count;
    }

    pub fn set_periodic_box(&mut self, periodic_box: Option<PeriodicBox>) {
        self.state.periodic_box = periodic_box;
    }

    /// A snapshot with forces and potential energy summed over every force group.
    pub fn get_state(&self, flags: StateFlags) -> Result<StateSnapshot, EngineError> {
        self.get_state_for_groups(flags, ForceGroupMask::ALL)
    }

    /// A snapshot whose forces and potential energy include only the groups in `groups`.
    ///
    /// Forces are evaluated only when `FORCES` or `ENERGY` is requested.
    pub fn get_state_for_groups(
        &self,
        flags: StateFlags,
        groups: ForceGroupMask,
    ) -> Result<StateSnapshot, EngineError> {
        let evaluation = if flags.needs_forces() {
            Some(self.platform.calc_forces_and_energy(
                self.topology.forces(),
                &self.state.positions,
                self.state.periodic_box(),
                groups,
            )?)
        } else {
            None
        };
        let (forces, potential_energy) = match evaluation {
            Some(eval) => (
                flags.contains(StateFlags::FORCES).then_some(eval.forces),
                flags.contains(StateFlags::ENERGY).then_some(eval.energy),
            ),
            None => (None, None),
        };

        Ok(StateSnapshot {
            time: self.state.time,
            step_count: self.state.step_count,
            periodic_box: self.state.periodic_box,
            positions: flags
                .contains(StateFlags::POSITIONS)
                .then(|| self.state.positions.clone()),
            velocities: flags
                .contains(StateFlags::VELOCITIES)
                .then(|| self.state.velocities.clone()),
            forces,
            potential_energy,
            kinetic_energy: flags
                .contains(StateFlags::ENERGY)
                .then(|| self.state.kinetic_energy(self.topology.particles())),
        })
    }

    pub fn step(&mut self, steps: u64) -> Result<(), EngineError> {
        self.step_with_progress(steps, &ProgressReporter::new())
    }

    pub fn step_with_progress(
        &mut self,
        steps: u64,
        reporter: &ProgressReporter,
    ) -> Result<(), EngineError> {
        reporter.report(Progress::StepsStart { total_steps: steps });
        self.advance(steps, reporter)?;
        reporter.report(Progress::StepsFinish);
        Ok(())
    }

    /// Steps without bracketing start/finish events, for callers that report a larger batch.
    pub(crate) fn advance(
        &mut self,
        steps: u64,
        reporter: &ProgressReporter,
    ) -> Result<(), EngineError> {
        debug!(
            steps,
            from_step = self.state.step_count,
            "Advancing simulation"
        );
        let dynamics = Dynamics {
            forces: self.topology.forces(),
            platform: self.platform.as_ref(),
            solver: &self.solver,
            inverse_masses: &self.inverse_masses,
        };
        self.integrator
            .step(&mut self.state, &dynamics, steps, reporter)
            .inspect_err(|e| warn!("Stepping failed: {e}"))
    }

    /// Projects the current positions onto the constraints to the given relative tolerance.
    pub fn apply_constraints(&mut self, tolerance: f64) -> Result<ProjectionReport, EngineError> {
        check_tolerance(tolerance)?;
        let reference = self.state.positions.clone();
        let max_iterations = self.integrator.config().max_constraint_iterations;
        self.solver
            .project_positions(&mut self.state.positions, &reference, tolerance, max_iterations)
            .map_err(|source| EngineError::NumericalInstability {
                step: self.state.step_count,
                source,
            })
    }

    /// Removes the velocity components along constraints to the given tolerance.
    pub fn apply_velocity_constraints(
        &mut self,
        tolerance: f64,
    ) -> Result<ProjectionReport, EngineError> {
        check_tolerance(tolerance)?;
        let config = *self.integrator.config();
        self.solver
            .project_velocities(
                &self.state.positions,
                &mut self.state.velocities,
                tolerance,
                config.step_size,
                config.max_constraint_iterations,
            )
            .map_err(|source| EngineError::NumericalInstability {
                step: self.state.step_count,
                source,
            })
    }

    /// Adds a force term to the bound topology and returns its index.
    ///
    /// The term is validated against the topology first; on failure the context is
    /// unchanged. The simulation state is preserved.
    pub fn add_force<F>(&mut self, term: F, group: u8) -> Result<usize, EngineError>
    where
        F: ForceTerm + 'static,
    {
        let mut topology = self.topology.clone();
        let index = topology.add_force(term, group)?;
        validate_topology(&topology)?;
        self.topology = topology;
        self.reinitialize(true)?;
        Ok(index)
    }

    /// Rebuilds derived data from the topology.
    ///
    /// With `preserve_state` false the state returns to its initial values: particles at the
    /// origin and at rest, time and step count zero, default periodic box.
    pub fn reinitialize(&mut self, preserve_state: bool) -> Result<(), EngineError> {
        validate_topology(&self.topology)?;
        self.solver = ConstraintSolver::new(&self.topology);
        self.inverse_masses = self.topology.inverse_masses();
        if !preserve_state {
            self.state = SimulationState::new(
                self.topology.num_particles(),
                self.topology.default_periodic_box().copied(),
            );
        }
        debug!(preserve_state, "Context reinitialized");
        Ok(())
    }

    /// `3 × (massive particles) − (enforced constraints)`.
    pub fn degrees_of_freedom(&self) -> usize {
        let massive = self
            .topology
            .particles()
            .iter()
            .filter(|p| !p.is_massless())
            .count();
        (3 * massive).saturating_sub(self.solver.num_active_constraints())
    }

    fn check_len(&self, quantity: &'static str, found: usize) -> Result<(), EngineError> {
        let expected = self.topology.num_particles();
        if found == expected {
            Ok(())
        } else {
            Err(EngineError::dimension_mismatch(quantity, expected, found))
        }
    }
}

fn check_tolerance(tolerance: f64) -> Result<(), EngineError> {
    if tolerance.is_finite() && tolerance > 0.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidArgument(format!(
            "constraint tolerance must be finite and positive (got {tolerance})"
        )))
    }
}

/// Rejects constraints between a massless and a massive particle and forces that do not
/// fit the particle count.
fn validate_topology(topology: &Topology) -> Result<(), ConfigurationError> {
    for (index, c) in topology.constraints().iter().enumerate() {
        let massless1 = topology.particles()[c.particle1].is_massless();
        let massless2 = topology.particles()[c.particle2].is_massless();
        if massless1 != massless2 {
            let (massless, massive) = if massless1 {
                (c.particle1, c.particle2)
            } else {
                (c.particle2, c.particle1)
            };
            return Err(ConfigurationError::MasslessConstraint {
                constraint: index,
                massless,
                massive,
            });
        }
    }

    topology
        .forces()
        .validate(topology.num_particles())
        .map_err(|(index, source)| ConfigurationError::InvalidForce {
            index,
            name: topology
                .forces()
                .get(index)
                .map(|e| e.term().name().to_string())
                .unwrap_or_default(),
            source,
        })
}
