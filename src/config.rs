// Optional TOML configuration, every field falls back to its default
use std::fs;
use std::path::Path;
use log::info;
use serde::Deserialize;
use crate::prelude::*;

pub const DEFAULT_CONFIG_FILE_NAME: &str = "oscillator.toml";

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
	pub solver: SolverSettings,
	pub chart: ChartSettings,
	pub window: WindowSettings
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
	pub method: Method,
	pub absolute_tolerance: Float,
	pub relative_tolerance: Float,
	pub initial_step: Float,
	pub max_steps: u64,
	pub rk4_substeps: usize
}

impl Default for SolverSettings {
	fn default() -> Self {
		let tol = Tolerances::default();
		Self {
			method: Method::Auto,
			absolute_tolerance: tol.absolute,
			relative_tolerance: tol.relative,
			initial_step: 1e-3,
			max_steps: 1_000_000,
			rk4_substeps: 20
		}
	}
}

impl SolverSettings {
	pub fn build_stepper(&self, model: DampedSpringAndMass) -> Stepper<2, DampedSpringAndMass> {
		let mut stepper = Stepper::new(model, Tolerances::new(self.absolute_tolerance, self.relative_tolerance))
			.with_method(self.method);
		stepper.initial_step = self.initial_step;
		stepper.max_steps = self.max_steps;
		stepper.rk4_substeps = self.rk4_substeps;
		stepper
	}
}

/// Size of exported PNG charts, in pixels
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChartSettings {
	pub width: u32,
	pub height: u32
}

impl Default for ChartSettings {
	fn default() -> Self {
		Self {
			width: 900,
			height: 600
		}
	}
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
	pub width: f32,
	pub height: f32
}

impl Default for WindowSettings {
	fn default() -> Self {
		Self {
			width: 900.0,
			height: 720.0
		}
	}
}

impl AppConfig {
	/// `oscillator.toml` in the working directory if there is one, otherwise defaults
	pub fn from_default_sources() -> Result<Self, ConfigError> {
		let config_path = Path::new(DEFAULT_CONFIG_FILE_NAME);
		if config_path.exists() {
			return Self::from_config_file(config_path);
		}
		Ok(Self::default())
	}
	pub fn from_config_file(path: &Path) -> Result<Self, ConfigError> {
		let content = fs::read_to_string(path).map_err(|err| ConfigError::ReadConfigFile {
			path: path.display().to_string(),
			message: err.to_string()
		})?;
		let config = Self::from_toml_str(&content).map_err(|message| ConfigError::ParseConfigFile {
			path: path.display().to_string(),
			message
		})?;
		info!("Loaded config from {}", path.display());
		Ok(config)
	}
	pub fn from_toml_str(content: &str) -> Result<Self, String> {
		let config: Self = toml::from_str(content).map_err(|err| err.to_string())?;
		if config.chart.width == 0 || config.chart.height == 0 {
			return Err("chart width and height must be non-zero".to_string());
		}
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	#[test]
	fn empty_is_default() {
		assert_eq!(AppConfig::from_toml_str("").unwrap(), AppConfig::default());
	}
	#[test]
	fn partial_tables() {
		let config = AppConfig::from_toml_str("
			[solver]
			method = \"rk4\"
			rk4_substeps = 50

			[chart]
			width = 400
		").unwrap();
		assert_eq!(config.solver.method, Method::Rk4);
		assert_eq!(config.solver.rk4_substeps, 50);
		assert_eq!(config.solver.relative_tolerance, 1e-9);
		assert_eq!(config.chart.width, 400);
		assert_eq!(config.chart.height, 600);
		assert_eq!(config.window, WindowSettings::default());
	}
	#[test]
	fn method_names() {
		assert_eq!(SolverSettings::default().method, Method::Auto);
		for (name, method) in [("auto", Method::Auto), ("dormand_prince", Method::DormandPrince), ("rk4", Method::Rk4), ("exponential", Method::Exponential)] {
			let config = AppConfig::from_toml_str(&format!("[solver]\nmethod = \"{}\"", name)).unwrap();
			assert_eq!(config.solver.method, method);
		}
	}
	#[test]
	fn bad_values() {
		assert!(AppConfig::from_toml_str("[solver]\nmethod = \"euler\"").is_err());
		assert!(AppConfig::from_toml_str("[chart]\nwidth = 0").is_err());
		assert!(AppConfig::from_toml_str("solver = 3").is_err());
	}
	#[test]
	fn missing_file() {
		let err = AppConfig::from_config_file(Path::new("/nonexistent/oscillator.toml")).unwrap_err();
		assert!(matches!(err, ConfigError::ReadConfigFile{..}));
	}
	#[test]
	fn stepper_from_settings() {
		let settings = SolverSettings {
			max_steps: 42,
			..Default::default()
		};
		let model = SimulationParameters::new(1.0, 10.0, 0.0).unwrap().model();
		let stepper = settings.build_stepper(model);
		assert_eq!(stepper.max_steps, 42);
		assert_eq!(stepper.method, Method::Auto);
	}
}
