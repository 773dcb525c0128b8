use super::snapshot::StateFlags;
use crate::core::forcefield::groups::ForceGroupMask;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONSTRAINT_TOLERANCE: f64 = 1e-5;
pub const DEFAULT_MAX_CONSTRAINT_ITERATIONS: usize = 500;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidParameter {
        parameter: &'static str,
        reason: String,
    },

    #[error("Failed to read configuration file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML configuration: {source}")]
    Toml {
        #[from]
        source: toml::de::Error,
    },
}

impl ConfigError {
    fn invalid(parameter: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter,
            reason: reason.into(),
        }
    }
}

/// Parameters of a time-stepping integrator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegratorConfig {
    /// Timestep in ps.
    pub step_size: f64,
    /// Largest accepted relative deviation `|r − d| / d` of any constraint.
    pub constraint_tolerance: f64,
    /// Force groups whose forces drive the integration.
    pub integration_groups: ForceGroupMask,
    pub max_constraint_iterations: usize,
}

impl IntegratorConfig {
    /// A configuration with the given timestep and default values for everything else.
    pub fn with_step_size(step_size: f64) -> Result<Self, ConfigError> {
        IntegratorConfigBuilder::new().step_size(step_size).build()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_positive("step_size", self.step_size)?;
        validate_positive("constraint_tolerance", self.constraint_tolerance)?;
        if self.max_constraint_iterations == 0 {
            return Err(ConfigError::invalid(
                "max_constraint_iterations",
                "must be at least 1",
            ));
        }
        Ok(())
    }

    /// Parses the `[integrator]` table of a TOML document.
    ///
    /// ```toml
    /// [integrator]
    /// step-size = 0.002
    /// constraint-tolerance = 1e-5
    /// integration-groups = [0, 2]
    /// max-constraint-iterations = 500
    /// ```
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content)?;
        let table = file
            .integrator
            .ok_or(ConfigError::MissingParameter("integrator"))?;
        table.into_builder()?.build()
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml_str(&content)
    }
}

fn validate_positive(parameter: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            parameter,
            format!("must be finite and positive (got {value})"),
        ))
    }
}

#[derive(Debug, Default)]
pub struct IntegratorConfigBuilder {
    step_size: Option<f64>,
    constraint_tolerance: Option<f64>,
    integration_groups: Option<ForceGroupMask>,
    max_constraint_iterations: Option<usize>,
}

impl IntegratorConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step_size(mut self, step_size: f64) -> Self {
        self.step_size = Some(step_size);
        self
    }
    pub fn constraint_tolerance(mut self, tolerance: f64) -> Self {
        self.constraint_tolerance = Some(tolerance);
        self
    }
    pub fn integration_groups(mut self, mask: ForceGroupMask) -> Self {
        self.integration_groups = Some(mask);
        self
    }
    pub fn max_constraint_iterations(mut self, iterations: usize) -> Self {
        self.max_constraint_iterations = Some(iterations);
        self
    }

    pub fn build(self) -> Result<IntegratorConfig, ConfigError> {
        let config = IntegratorConfig {
            step_size: self
                .step_size
                .ok_or(ConfigError::MissingParameter("step_size"))?,
            constraint_tolerance: self
                .constraint_tolerance
                .unwrap_or(DEFAULT_CONSTRAINT_TOLERANCE),
            integration_groups: self.integration_groups.unwrap_or_default(),
            max_constraint_iterations: self
                .max_constraint_iterations
                .unwrap_or(DEFAULT_MAX_CONSTRAINT_ITERATIONS),
        };
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    integrator: Option<IntegratorTable>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct IntegratorTable {
    step_size: Option<f64>,
    constraint_tolerance: Option<f64>,
    integration_groups: Option<Vec<u8>>,
    max_constraint_iterations: Option<usize>,
}

impl IntegratorTable {
    fn into_builder(self) -> Result<IntegratorConfigBuilder, ConfigError> {
        let mut builder = IntegratorConfigBuilder::new();
        if let Some(step_size) = self.step_size {
            builder = builder.step_size(step_size);
        }
        if let Some(tolerance) = self.constraint_tolerance {
            builder = builder.constraint_tolerance(tolerance);
        }
        if let Some(groups) = self.integration_groups {
            let mask = ForceGroupMask::from_groups(groups.iter().copied()).ok_or_else(|| {
                ConfigError::invalid("integration_groups", "groups must lie in 0..=31")
            })?;
            builder = builder.integration_groups(mask);
        }
        if let Some(iterations) = self.max_constraint_iterations {
            builder = builder.max_constraint_iterations(iterations);
        }
        Ok(builder)
    }
}

/// Parameters of a trajectory run (see [`crate::workflows::run`]).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunConfig {
    pub total_steps: u64,
    /// Steps between recorded frames.
    pub report_interval: u64,
    /// Quantities recorded in every frame.
    pub frame_contents: StateFlags,
}

#[derive(Debug, Default)]
pub struct RunConfigBuilder {
    total_steps: Option<u64>,
    report_interval: Option<u64>,
    frame_contents: Option<StateFlags>,
}

impl RunConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_steps(mut self, steps: u64) -> Self {
        self.total_steps = Some(steps);
        self
    }
    pub fn report_interval(mut self, interval: u64) -> Self {
        self.report_interval = Some(interval);
        self
    }
    pub fn frame_contents(mut self, flags: StateFlags) -> Self {
        self.frame_contents = Some(flags);
        self
    }

    pub fn build(self) -> Result<RunConfig, ConfigError> {
        let total_steps = self
            .total_steps
            .ok_or(ConfigError::MissingParameter("total_steps"))?;
        let report_interval = self
            .report_interval
            .ok_or(ConfigError::MissingParameter("report_interval"))?;
        if report_interval == 0 {
            return Err(ConfigError::invalid("report_interval", "must be at least 1"));
        }
        Ok(RunConfig {
            total_steps,
            report_interval,
            frame_contents: self
                .frame_contents
                .unwrap_or(StateFlags::POSITIONS | StateFlags::ENERGY),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn builder_requires_step_size() {
        let result = IntegratorConfigBuilder::new().build();
        assert!(matches!(
            result,
            Err(ConfigError::MissingParameter("step_size"))
        ));
    }

    #[test]
    fn builder_fills_defaults() {
        let config = IntegratorConfig::with_step_size(0.002).unwrap();
        assert_eq!(config.step_size, 0.002);
        assert_eq!(config.constraint_tolerance, DEFAULT_CONSTRAINT_TOLERANCE);
        assert_eq!(config.integration_groups, ForceGroupMask::ALL);
        assert_eq!(
            config.max_constraint_iterations,
            DEFAULT_MAX_CONSTRAINT_ITERATIONS
        );
    }

    #[test]
    fn builder_rejects_non_positive_values() {
        assert!(matches!(
            IntegratorConfig::with_step_size(0.0),
            Err(ConfigError::InvalidParameter {
                parameter: "step_size",
                ..
            })
        ));
        let result = IntegratorConfigBuilder::new()
            .step_size(0.001)
            .constraint_tolerance(-1e-5)
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidParameter {
                parameter: "constraint_tolerance",
                ..
            })
        ));
        let result = IntegratorConfigBuilder::new()
            .step_size(0.001)
            .max_constraint_iterations(0)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn from_toml_str_reads_integrator_table() {
        let content = r#"
            [integrator]
            step-size = 0.001
            constraint-tolerance = 1e-6
            integration-groups = [1, 3]
            max-constraint-iterations = 200
        "#;
        let config = IntegratorConfig::from_toml_str(content).unwrap();
        assert_eq!(config.step_size, 0.001);
        assert_eq!(config.constraint_tolerance, 1e-6);
        assert_eq!(config.integration_groups.bits(), (1 << 1) | (1 << 3));
        assert_eq!(config.max_constraint_iterations, 200);
    }

    #[test]
    fn from_toml_str_rejects_missing_table_and_bad_groups() {
        assert!(matches!(
            IntegratorConfig::from_toml_str("[other]\nvalue = 1\n"),
            Err(ConfigError::MissingParameter("integrator"))
        ));
        let bad_groups = "[integrator]\nstep-size = 0.001\nintegration-groups = [32]\n";
        assert!(matches!(
            IntegratorConfig::from_toml_str(bad_groups),
            Err(ConfigError::InvalidParameter {
                parameter: "integration_groups",
                ..
            })
        ));
        assert!(matches!(
            IntegratorConfig::from_toml_str("[integrator]\nstep-size = 0.001\ntimestep = 2\n"),
            Err(ConfigError::Toml { .. })
        ));
    }

    #[test]
    fn load_reads_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[integrator]\nstep-size = 0.004").unwrap();
        let config = IntegratorConfig::load(file.path()).unwrap();
        assert_eq!(config.step_size, 0.004);
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        assert!(matches!(
            IntegratorConfig::load(&path),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn run_config_requires_positive_interval() {
        let config = RunConfigBuilder::new()
            .total_steps(100)
            .report_interval(10)
            .build()
            .unwrap();
        assert_eq!(config.frame_contents, StateFlags::POSITIONS | StateFlags::ENERGY);

        let result = RunConfigBuilder::new()
            .total_steps(100)
            .report_interval(0)
            .build();
        assert!(matches!(result, Err(ConfigError::InvalidParameter { .. })));
    }
}
