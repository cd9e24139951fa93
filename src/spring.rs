// Damped spring-and-mass model
use nalgebra::{Matrix2, Vector2};
use crate::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DampingRegime {
	Undamped,
	Underdamped,
	CriticallyDamped,
	Overdamped
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DampedSpringAndMass {
	pub mass: Float,
	pub k: Float,
	pub damping: Float
}

impl DampedSpringAndMass {
	/// Natural angular frequency sqrt(k/m), rad/s
	pub fn angular_frequency(&self) -> Float {
		(self.k / self.mass).sqrt()
	}
	/// b / (2 * sqrt(k * m)), 1 means critically damped
	pub fn damping_ratio(&self) -> Float {
		self.damping / (2.0 * (self.k * self.mass).sqrt())
	}
	/// Compares (b/2m)^2 with k/m
	pub fn regime(&self) -> DampingRegime {
		if self.damping == 0.0 {
			return DampingRegime::Undamped;
		}
		let decay_sq = (self.damping / (2.0 * self.mass)).powi(2);
		let natural_sq = self.k / self.mass;
		if decay_sq < natural_sq {
			DampingRegime::Underdamped
		}
		else if decay_sq > natural_sq {
			DampingRegime::Overdamped
		}
		else {
			DampingRegime::CriticallyDamped
		}
	}
}

impl StaticDifferentiator<2> for DampedSpringAndMass {
	fn differentiate(&self, _t: Float, state: &Vector2<Float>) -> NDimensionalDerivative<2> {
		// In this case there will be 2 state variables: x and dx
		// Force = -kx - bv
		let force = -self.k * state[0] - self.damping * state[1];
		// Acc = force / mass
		let acc = force / self.mass;
		// Done
		NDimensionalDerivative(Vector2::new(
			state[1],
			acc
		))
	}
}

impl LinearDifferentiator<2> for DampedSpringAndMass {
	fn system_matrix(&self) -> Matrix2<Float> {
		Matrix2::new(
			0.0, 1.0,
			-self.k / self.mass, -self.damping / self.mass
		)
	}
}
