// Kinetic, potential and total mechanical energy of the oscillator over time
use std::fmt::Write;
use crate::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnergySample {
	pub t: Float,
	pub x: Float,
	pub v: Float,
	pub kinetic: Float,
	pub potential: Float,
	pub total: Float
}

/// KE = mv^2/2, PE = kx^2/2
pub fn energy_at(params: &SimulationParameters, t: Float, x: Float, v: Float) -> EnergySample {
	let kinetic = 0.5 * params.mass() * v.powi(2);
	let potential = 0.5 * params.stiffness() * x.powi(2);
	EnergySample {
		t,
		x,
		v,
		kinetic,
		potential,
		total: kinetic + potential
	}
}

/// Result of one run, ordered by time
#[derive(Clone, Debug)]
pub struct TimeSeries {
	pub parameters: SimulationParameters,
	pub samples: Vec<EnergySample>,
	pub stats: Stats
}

impl TimeSeries {
	/// Pairs up sample times with (x, v) states
	pub fn from_states(parameters: SimulationParameters, times: &[Float], states: &[V2], stats: Stats) -> Result<Self, IntegrationError> {
		if times.len() != states.len() {
			return Err(IntegrationError::InvalidInput{message: format!("number of sample times ({}) != number of states ({})", times.len(), states.len())});
		}
		let samples = times.iter()
			.zip(states.iter())
			.map(|(t, state)| energy_at(&parameters, *t, state.x, state.y))
			.collect();
		Ok(Self {
			parameters,
			samples,
			stats
		})
	}
	pub fn len(&self) -> usize {
		self.samples.len()
	}
	pub fn is_empty(&self) -> bool {
		self.samples.is_empty()
	}
	pub fn times(&self) -> Vec<Float> {
		self.samples.iter().map(|s| s.t).collect()
	}
	pub fn kinetic(&self) -> Vec<Float> {
		self.samples.iter().map(|s| s.kinetic).collect()
	}
	pub fn potential(&self) -> Vec<Float> {
		self.samples.iter().map(|s| s.potential).collect()
	}
	pub fn total(&self) -> Vec<Float> {
		self.samples.iter().map(|s| s.total).collect()
	}
	/// Largest of all three energies, used for the chart's Y range
	pub fn peak_energy(&self) -> Float {
		self.samples.iter()
			.map(|s| s.kinetic.max(s.potential).max(s.total))
			.fold(0.0, Float::max)
	}
	pub fn first(&self) -> Option<&EnergySample> {
		self.samples.first()
	}
	pub fn last(&self) -> Option<&EnergySample> {
		self.samples.last()
	}
	/// Header plus one row per sample
	pub fn to_csv(&self) -> String {
		let mut out = String::from("t,x,v,kinetic,potential,total\n");
		for s in &self.samples {
			// Writing to a String can't fail
			let _ = writeln!(out, "{},{},{},{},{},{}", s.t, s.x, s.v, s.kinetic, s.potential, s.total);
		}
		out
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use approx::assert_relative_eq;
	fn params() -> SimulationParameters {
		SimulationParameters::new(2.0, 10.0, 0.5).unwrap()
	}
	#[test]
	fn energy_formulas() {
		let s = energy_at(&params(), 1.0, 0.1, -0.3);
		assert_relative_eq!(s.kinetic, 0.5 * 2.0 * 0.09);
		assert_relative_eq!(s.potential, 0.5 * 10.0 * 0.01);
		assert_relative_eq!(s.total, s.kinetic + s.potential);
		assert_eq!(s.t, 1.0);
	}
	#[test]
	fn series_columns_and_csv() {
		let times = vec![0.0, 0.5];
		let states = vec![V2::new(0.1, 0.0), V2::new(0.0, 0.2)];
		let series = TimeSeries::from_states(params(), &times, &states, Stats::default()).unwrap();
		assert_eq!(series.len(), 2);
		assert_eq!(series.times(), times);
		assert_eq!(series.kinetic()[0], 0.0);
		assert_eq!(series.potential()[1], 0.0);
		assert_relative_eq!(series.peak_energy(), 0.05);
		let csv = series.to_csv();
		let lines: Vec<&str> = csv.lines().collect();
		assert_eq!(lines.len(), 3);
		assert_eq!(lines[0], "t,x,v,kinetic,potential,total");
		assert!(lines[1].starts_with("0,0.1,0,0,"));
	}
	#[test]
	fn mismatched_lengths_are_an_error() {
		let result = TimeSeries::from_states(params(), &[0.0, 0.5, 1.0], &[V2::new(0.1, 0.0)], Stats::default());
		assert!(matches!(result, Err(IntegrationError::InvalidInput{..})));
	}
}
