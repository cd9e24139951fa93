// Validated simulation parameters, built from the three form fields
use crate::prelude::*;

pub const MASS_FIELD: &str = "Mass";
pub const STIFFNESS_FIELD: &str = "Spring stiffness";
pub const DAMPING_FIELD: &str = "Damping coefficient";

/// Mass (kg), spring stiffness k (N/m) and damping coefficient b (kg/s).
/// Only constructed through validation, so m > 0, k > 0 and b >= 0 always hold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationParameters {
	mass: Float,
	stiffness: Float,
	damping: Float
}

impl SimulationParameters {
	pub fn new(mass: Float, stiffness: Float, damping: Float) -> Result<Self, InputError> {
		check_finite(MASS_FIELD, mass)?;
		check_finite(STIFFNESS_FIELD, stiffness)?;
		check_finite(DAMPING_FIELD, damping)?;
		if mass <= 0.0 {
			return Err(InputError::NonPositiveMass);
		}
		if stiffness <= 0.0 {
			return Err(InputError::NonPositiveStiffness);
		}
		if damping < 0.0 {
			return Err(InputError::NegativeDamping);
		}
		// Done
		Ok(Self {
			mass,
			stiffness,
			damping
		})
	}
	pub fn mass(&self) -> Float {
		self.mass
	}
	pub fn stiffness(&self) -> Float {
		self.stiffness
	}
	pub fn damping(&self) -> Float {
		self.damping
	}
	pub fn model(&self) -> DampedSpringAndMass {
		DampedSpringAndMass {
			mass: self.mass,
			k: self.stiffness,
			damping: self.damping
		}
	}
}

fn check_finite(field: &'static str, value: Float) -> Result<(), InputError> {
	match value.is_finite() {
		true => Ok(()),
		false => Err(InputError::NonFinite{field})
	}
}

fn parse_field(field: &'static str, text: &str) -> Result<Float, InputError> {
	let trimmed = text.trim();
	let value: Float = trimmed.parse().map_err(|_| InputError::NotANumber{field, text: trimmed.to_string()})?;
	check_finite(field, value)?;
	Ok(value)
}

/// All three fields are parsed before any range rule is checked.
pub fn parse_parameters(mass: &str, stiffness: &str, damping: &str) -> Result<SimulationParameters, InputError> {
	let m = parse_field(MASS_FIELD, mass)?;
	let k = parse_field(STIFFNESS_FIELD, stiffness)?;
	let b = parse_field(DAMPING_FIELD, damping)?;
	SimulationParameters::new(m, k, b)
}
