/* Energy viewer for a damped mass on a spring
Reads mass, spring stiffness and damping, integrates the equation of motion over a fixed window and plots kinetic, potential and total energy
*/

pub mod error;
pub mod params;
pub mod spring;
pub mod solver;
pub mod energy;
pub mod simulation;
pub mod config;
pub mod chart;
pub mod gui;

pub type Float = f64;
pub type V2 = nalgebra::Vector2<Float>;

pub mod prelude {
	pub const APP_NAME: &str = "Energy transformations of a mass on a spring";
	pub use crate::{
		Float,
		V2,
		error::{Error, InputError, IntegrationError, ConfigError},
		params::{SimulationParameters, parse_parameters},
		spring::{DampedSpringAndMass, DampingRegime},
		solver::{StaticDifferentiator, LinearDifferentiator, NDimensionalDerivative, Stepper, Tolerances, StepController, Stats, Method},
		energy::{EnergySample, TimeSeries, energy_at},
		simulation::{InitialState, sample_times, run, run_default, INITIAL_STATE, T_START, T_END, NUM_SAMPLES},
		config::{AppConfig, SolverSettings, ChartSettings, WindowSettings},
		chart::{ChartLayout, render_png, save_png}
	};
}
