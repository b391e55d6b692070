use crate::core::math::matrix3::DEFAULT_JACOBI_ITERATIONS;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// Settings that shape how a molecule is simulated, independent of how long it runs.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Upper bound on groups bonded to the central atom.
    pub max_radial_groups: usize,
    /// Jacobi sweeps per SVD in the rotation fit.
    pub jacobi_iterations: usize,
    /// Frames longer than this are clamped before integration.
    pub max_time_step: f64,
    /// Skip candidate permutations whose lower error bound already exceeds the best fit.
    pub prune_permutations: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_radial_groups: 6,
            jacobi_iterations: DEFAULT_JACOBI_ITERATIONS,
            max_time_step: 0.2,
            prune_permutations: true,
        }
    }
}

/// Settings for driving a molecule toward a settled shape.
#[derive(Debug, Clone, PartialEq)]
pub struct RelaxationConfig {
    pub time_step: f64,
    pub max_frames: usize,
    /// Fit error below which a frame counts as settled.
    pub convergence_threshold: f64,
    /// Largest group speed allowed on a settled frame.
    pub speed_threshold: f64,
    /// Consecutive settled frames required before stopping early.
    pub patience_frames: usize,
}

#[derive(Default)]
pub struct SimulationConfigBuilder {
    max_radial_groups: Option<usize>,
    jacobi_iterations: Option<usize>,
    max_time_step: Option<f64>,
    prune_permutations: Option<bool>,
}

impl SimulationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_radial_groups(mut self, count: usize) -> Self {
        self.max_radial_groups = Some(count);
        self
    }
    pub fn jacobi_iterations(mut self, sweeps: usize) -> Self {
        self.jacobi_iterations = Some(sweeps);
        self
    }
    pub fn max_time_step(mut self, dt: f64) -> Self {
        self.max_time_step = Some(dt);
        self
    }
    pub fn prune_permutations(mut self, enabled: bool) -> Self {
        self.prune_permutations = Some(enabled);
        self
    }

    /// Fills unset fields from [`SimulationConfig::default`] and validates the result.
    pub fn build(self) -> Result<SimulationConfig, ConfigError> {
        let defaults = SimulationConfig::default();
        let config = SimulationConfig {
            max_radial_groups: self.max_radial_groups.unwrap_or(defaults.max_radial_groups),
            jacobi_iterations: self.jacobi_iterations.unwrap_or(defaults.jacobi_iterations),
            max_time_step: self.max_time_step.unwrap_or(defaults.max_time_step),
            prune_permutations: self.prune_permutations.unwrap_or(defaults.prune_permutations),
        };

        if !(1..=6).contains(&config.max_radial_groups) {
            return Err(ConfigError::InvalidParameter {
                name: "max_radial_groups",
                reason: format!("{} is outside 1-6", config.max_radial_groups),
            });
        }
        if config.jacobi_iterations == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "jacobi_iterations",
                reason: "at least one sweep is required".to_string(),
            });
        }
        ensure_positive("max_time_step", config.max_time_step)?;
        Ok(config)
    }
}

#[derive(Default)]
pub struct RelaxationConfigBuilder {
    time_step: Option<f64>,
    max_frames: Option<usize>,
    convergence_threshold: Option<f64>,
    speed_threshold: Option<f64>,
    patience_frames: Option<usize>,
}

impl RelaxationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn time_step(mut self, dt: f64) -> Self {
        self.time_step = Some(dt);
        self
    }
    pub fn max_frames(mut self, frames: usize) -> Self {
        self.max_frames = Some(frames);
        self
    }
    pub fn convergence_threshold(mut self, threshold: f64) -> Self {
        self.convergence_threshold = Some(threshold);
        self
    }
    pub fn speed_threshold(mut self, threshold: f64) -> Self {
        self.speed_threshold = Some(threshold);
        self
    }
    pub fn patience_frames(mut self, frames: usize) -> Self {
        self.patience_frames = Some(frames);
        self
    }

    pub fn build(self) -> Result<RelaxationConfig, ConfigError> {
        let time_step = self.time_step.ok_or(ConfigError::MissingParameter("time_step"))?;
        let max_frames = self
            .max_frames
            .ok_or(ConfigError::MissingParameter("max_frames"))?;
        let convergence_threshold = self.convergence_threshold.unwrap_or(1e-3);
        let speed_threshold = self.speed_threshold.unwrap_or(1e-2);
        let patience_frames = self.patience_frames.unwrap_or(10);

        ensure_positive("time_step", time_step)?;
        ensure_positive("convergence_threshold", convergence_threshold)?;
        ensure_positive("speed_threshold", speed_threshold)?;
        if patience_frames == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "patience_frames",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(RelaxationConfig {
            time_step,
            max_frames,
            convergence_threshold,
            speed_threshold,
            patience_frames,
        })
    }
}

fn ensure_positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter {
            name,
            reason: format!("{value} is not a finite positive number"),
        })
    }
}
