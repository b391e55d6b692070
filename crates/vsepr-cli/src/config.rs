use crate::cli::RelaxArgs;
use crate::error::{CliError, Result};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;
use vsepr::engine::config::{
    RelaxationConfig, RelaxationConfigBuilder, SimulationConfig, SimulationConfigBuilder,
};

/// Values used when neither the config file nor the command line sets them.
pub struct DefaultsConfig {
    pub time_step: f64,
    pub max_frames: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            time_step: 0.016,
            max_frames: 2000,
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialSimulationConfig {
    max_radial_groups: Option<usize>,
    jacobi_iterations: Option<usize>,
    max_time_step: Option<f64>,
    prune_permutations: Option<bool>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialRelaxationConfig {
    time_step: Option<f64>,
    max_frames: Option<usize>,
    convergence_threshold: Option<f64>,
    speed_threshold: Option<f64>,
    patience_frames: Option<usize>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialRelaxConfig {
    simulation: Option<PartialSimulationConfig>,
    relaxation: Option<PartialRelaxationConfig>,
}

/// Fully resolved settings for a `relax` run.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub simulation: SimulationConfig,
    pub relaxation: RelaxationConfig,
}

impl PartialRelaxConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Loads the file named by `--config`, or starts empty.
    pub fn for_args(args: &RelaxArgs) -> Result<Self> {
        match &args.config {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Layers `--set` values, then dedicated flags, over the file and the defaults.
    pub fn merge_with_cli(mut self, args: &RelaxArgs) -> Result<AppConfig> {
        self.apply_set_values(&args.set_values)?;
        let defaults = DefaultsConfig::default();

        let sim = self.simulation.take().unwrap_or_default();
        let mut simulation = SimulationConfigBuilder::new();
        if let Some(count) = sim.max_radial_groups {
            simulation = simulation.max_radial_groups(count);
        }
        if let Some(sweeps) = sim.jacobi_iterations {
            simulation = simulation.jacobi_iterations(sweeps);
        }
        if let Some(dt) = sim.max_time_step {
            simulation = simulation.max_time_step(dt);
        }
        let prune = if args.no_prune {
            Some(false)
        } else {
            sim.prune_permutations
        };
        if let Some(prune) = prune {
            simulation = simulation.prune_permutations(prune);
        }

        let relax = self.relaxation.take().unwrap_or_default();
        let mut relaxation = RelaxationConfigBuilder::new()
            .time_step(args.dt.or(relax.time_step).unwrap_or(defaults.time_step))
            .max_frames(args.frames.or(relax.max_frames).unwrap_or(defaults.max_frames));
        if let Some(threshold) = relax.convergence_threshold {
            relaxation = relaxation.convergence_threshold(threshold);
        }
        if let Some(threshold) = relax.speed_threshold {
            relaxation = relaxation.speed_threshold(threshold);
        }
        if let Some(frames) = relax.patience_frames {
            relaxation = relaxation.patience_frames(frames);
        }

        Ok(AppConfig {
            simulation: simulation.build().map_err(|e| CliError::Config(e.to_string()))?,
            relaxation: relaxation.build().map_err(|e| CliError::Config(e.to_string()))?,
        })
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let Some((key, value_str)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };
            let key = key.trim();
            let value_str = value_str.trim();

            match key {
                "simulation.max-radial-groups" => {
                    self.simulation.get_or_insert_with(Default::default).max_radial_groups =
                        Some(parse_value(key, value_str)?);
                }
                "simulation.jacobi-iterations" => {
                    self.simulation.get_or_insert_with(Default::default).jacobi_iterations =
                        Some(parse_value(key, value_str)?);
                }
                "simulation.max-time-step" => {
                    self.simulation.get_or_insert_with(Default::default).max_time_step =
                        Some(parse_value(key, value_str)?);
                }
                "simulation.prune-permutations" => {
                    self.simulation.get_or_insert_with(Default::default).prune_permutations =
                        Some(parse_value(key, value_str)?);
                }
                "relaxation.time-step" => {
                    self.relaxation.get_or_insert_with(Default::default).time_step =
                        Some(parse_value(key, value_str)?);
                }
                "relaxation.max-frames" => {
                    self.relaxation.get_or_insert_with(Default::default).max_frames =
                        Some(parse_value(key, value_str)?);
                }
                "relaxation.convergence-threshold" => {
                    self.relaxation.get_or_insert_with(Default::default).convergence_threshold =
                        Some(parse_value(key, value_str)?);
                }
                "relaxation.speed-threshold" => {
                    self.relaxation.get_or_insert_with(Default::default).speed_threshold =
                        Some(parse_value(key, value_str)?);
                }
                "relaxation.patience-frames" => {
                    self.relaxation.get_or_insert_with(Default::default).patience_frames =
                        Some(parse_value(key, value_str)?);
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}

fn parse_value<T: FromStr>(key: &str, value_str: &str) -> Result<T> {
    value_str.parse().map_err(|_| {
        CliError::Config(format!(
            "Invalid value for {}: {} (expected {})",
            key,
            value_str,
            std::any::type_name::<T>()
        ))
    })
}
