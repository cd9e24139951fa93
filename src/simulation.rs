// validate -> integrate -> energy, without any UI attached
use log::{debug, info};
use crate::prelude::*;

pub const T_START: Float = 0.0;
pub const T_END: Float = 20.0;
pub const NUM_SAMPLES: usize = 1000;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InitialState {
	pub displacement: Float,// m
	pub velocity: Float// m/s
}

impl InitialState {
	pub fn as_vector(&self) -> V2 {
		V2::new(self.displacement, self.velocity)
	}
}

/// Mass starts displaced by 10 cm and at rest
pub const INITIAL_STATE: InitialState = InitialState {
	displacement: 0.1,
	velocity: 0.0
};

/// `n` equally spaced points from `start` to `end`, both ends included exactly
pub fn sample_times(start: Float, end: Float, n: usize) -> Vec<Float> {
	match n {
		0 => Vec::new(),
		1 => vec![start],
		_ => {
			let step = (end - start) / ((n - 1) as Float);
			let mut out: Vec<Float> = (0..n).map(|i| start + step * (i as Float)).collect();
			out[n - 1] = end;
			out
		}
	}
}

pub fn run(params: &SimulationParameters, solver: &SolverSettings) -> Result<TimeSeries, IntegrationError> {
	let model = params.model();
	info!(
		"Running simulation: m = {} kg, k = {} N/m, b = {} kg/s ({:?}, omega = {:.4} rad/s)",
		params.mass(), params.stiffness(), params.damping(), model.regime(), model.angular_frequency()
	);
	let times = sample_times(T_START, T_END, NUM_SAMPLES);
	let mut stepper = solver.build_stepper(model);
	let method = stepper.resolve_method(T_END - T_START);
	let states = stepper.sample_linear(&INITIAL_STATE.as_vector(), &times)?;
	debug!(
		"{:?}: {} accepted steps, {} rejected steps, {} function evaluations",
		method, stepper.stats.accepted_steps, stepper.stats.rejected_steps, stepper.stats.fn_evals
	);
	let series = TimeSeries::from_states(*params, &times, &states, stepper.stats.clone())?;
	if let Some(last) = series.last() {
		info!("Total energy at t = {} s: {:.6e} J", last.t, last.total);
	}
	// Done
	Ok(series)
}

pub fn run_default(params: &SimulationParameters) -> Result<TimeSeries, IntegrationError> {
	run(params, &SolverSettings::default())
}
