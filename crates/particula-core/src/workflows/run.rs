use crate::engine::config::RunConfig;
use crate::engine::context::Context;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::snapshot::StateSnapshot;
use tracing::{info, instrument};

/// Snapshots recorded during a run, in time order. The first frame is the initial state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Trajectory {
    frames: Vec<StateSnapshot>,
}

impl Trajectory {
    pub fn frames(&self) -> &[StateSnapshot] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn last(&self) -> Option<&StateSnapshot> {
        self.frames.last()
    }

    /// Largest deviation of total energy from the first frame, relative to
    /// `max(|E₀|, 1)`. `None` unless every frame carries energies.
    pub fn max_relative_energy_drift(&self) -> Option<f64> {
        let initial = self.frames.first()?.total_energy()?;
        let scale = initial.abs().max(1.0);
        self.frames.iter().try_fold(0.0f64, |worst, frame| {
            Some(worst.max((frame.total_energy()? - initial).abs() / scale))
        })
    }
}

/// Advances `context` by `config.total_steps`, recording a frame every
/// `config.report_interval` steps and after the final step.
#[instrument(skip_all, name = "run_workflow")]
pub fn run(
    context: &mut Context,
    config: &RunConfig,
    reporter: &ProgressReporter,
) -> Result<Trajectory, EngineError> {
    info!(
        total_steps = config.total_steps,
        report_interval = config.report_interval,
        "Starting run"
    );
    let mut frames = vec![context.get_state(config.frame_contents)?];

    reporter.report(Progress::StepsStart {
        total_steps: config.total_steps,
    });
    let mut remaining = config.total_steps;
    while remaining > 0 {
        let chunk = remaining.min(config.report_interval);
        context.advance(chunk, reporter)?;
        frames.push(context.get_state(config.frame_contents)?);
        remaining -= chunk;
    }
    reporter.report(Progress::StepsFinish);

    info!(
        frames = frames.len(),
        time = context.time(),
        "Run finished"
    );
    Ok(Trajectory { frames })
}
