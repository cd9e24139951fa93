// Numerical integration of `StaticDifferentiator` systems
// Dormand-Prince 5(4) with adaptive steps for ordinary systems, the exact matrix exponential step for stiff linear ones
// Classical RK4 is kept for comparison
use nalgebra::{Matrix2, SMatrix, SVector};
use serde::Deserialize;
use crate::prelude::*;

/// Derivative of a state vector with respect to time
#[derive(Clone, Debug, PartialEq)]
pub struct NDimensionalDerivative<const N: usize> (
	pub SVector<Float, N>
);

pub trait StaticDifferentiator<const N: usize> {// N: size of the state vector
	fn differentiate(&self, t: Float, state: &SVector<Float, N>) -> NDimensionalDerivative<N>;
}

/// Time-invariant linear systems, dy/dt = A y
pub trait LinearDifferentiator<const N: usize>: StaticDifferentiator<N> {
	fn system_matrix(&self) -> SMatrix<Float, N, N>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
	/// Dormand-Prince, or the exponential step when the system is too stiff for it
	Auto,
	DormandPrince,
	Rk4,
	/// y(t + dt) = exp(A dt) y(t), linear systems only
	Exponential
}

impl Default for Method {
	fn default() -> Self {
		Method::Auto
	}
}

/// Above this value of (time span) * max|A_ij| an explicit method needs thousands of steps just to stay stable
pub const STIFFNESS_LIMIT: Float = 1e4;

/// Local error is accepted when |err_i| <= absolute + relative * |y_i| for every component
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tolerances {
	pub absolute: Float,
	pub relative: Float
}

impl Tolerances {
	pub fn new(absolute: Float, relative: Float) -> Self {
		Self {
			absolute,
			relative
		}
	}
}

impl Default for Tolerances {
	fn default() -> Self {
		Self::new(1e-12, 1e-9)
	}
}

/// I-controller, h_new = safety * h * error^(-exponent)
#[derive(Clone, Debug)]
pub struct StepController {
	pub safety: Float,
	pub max_factor: Float,
	pub min_factor: Float,
	exponent: Float
}

impl Default for StepController {
	fn default() -> Self {
		Self {
			safety: 0.9,
			max_factor: 5.0,
			min_factor: 0.2,
			exponent: 1.0 / 5.0// 1/(p+1), error estimate is 4th order
		}
	}
}

impl StepController {
	pub fn compute_factor(&self, error: Float) -> Float {
		if error == 0.0 {
			return self.max_factor;
		}
		(self.safety * error.powf(-self.exponent)).clamp(self.min_factor, self.max_factor)
	}
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Stats {
	pub fn_evals: u64,
	pub accepted_steps: u64,
	pub rejected_steps: u64
}

// Dormand-Prince 5(4) tableau
const C: [Float; 7] = [0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0, 1.0];
const A: [[Float; 6]; 7] = [
	[0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
	[1.0 / 5.0, 0.0, 0.0, 0.0, 0.0, 0.0],
	[3.0 / 40.0, 9.0 / 40.0, 0.0, 0.0, 0.0, 0.0],
	[44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0, 0.0, 0.0, 0.0],
	[19372.0 / 6561.0, -25360.0 / 2187.0, 64448.0 / 6561.0, -212.0 / 729.0, 0.0, 0.0],
	[9017.0 / 3168.0, -355.0 / 33.0, 46732.0 / 5247.0, 49.0 / 176.0, -5103.0 / 18656.0, 0.0],
	[35.0 / 384.0, 0.0, 500.0 / 1113.0, 125.0 / 192.0, -2187.0 / 6784.0, 11.0 / 84.0]
];
// 5th order weights (same as the last row of A)
const B: [Float; 7] = [35.0 / 384.0, 0.0, 500.0 / 1113.0, 125.0 / 192.0, -2187.0 / 6784.0, 11.0 / 84.0, 0.0];
// 4th order weights
const B_HAT: [Float; 7] = [5179.0 / 57600.0, 0.0, 7571.0 / 16695.0, 393.0 / 640.0, -92097.0 / 339200.0, 187.0 / 2100.0, 1.0 / 40.0];
const STAGES: usize = 7;

pub struct Stepper<const N: usize, T: StaticDifferentiator<N>> {
	pub differentiator: T,
	pub method: Method,
	tol: Tolerances,
	controller: StepController,
	pub initial_step: Float,
	pub h_min: Float,
	pub max_steps: u64,
	pub rk4_substeps: usize,
	pub stats: Stats
}

impl<const N: usize, T: StaticDifferentiator<N>> Stepper<N, T> {
	pub fn new(differentiator: T, tol: Tolerances) -> Self {
		Self {
			differentiator,
			method: Method::DormandPrince,
			tol,
			controller: StepController::default(),
			initial_step: 1e-3,
			h_min: 1e-12,
			max_steps: 1_000_000,
			rk4_substeps: 20,
			stats: Stats::default()
		}
	}
	pub fn with_method(mut self, method: Method) -> Self {
		self.method = method;
		self
	}
	/// One Dormand-Prince step, returns (5th order solution, normalized error estimate)
	pub fn dormand_prince_step(&mut self, t: Float, y: &SVector<Float, N>, h: Float) -> (SVector<Float, N>, Float) {
		let mut k = [SVector::<Float, N>::zeros(); STAGES];
		k[0] = self.differentiator.differentiate(t, y).0;
		for i in 1..STAGES {
			let mut y_temp = *y;
			for j in 0..i {
				if A[i][j] != 0.0 {
					y_temp += k[j] * (h * A[i][j]);
				}
			}
			k[i] = self.differentiator.differentiate(t + C[i] * h, &y_temp).0;
		}
		self.stats.fn_evals += STAGES as u64;
		// Solution and embedded error
		let mut y_new = *y;
		let mut err_vec = SVector::<Float, N>::zeros();
		for i in 0..STAGES {
			y_new += k[i] * (h * B[i]);
			err_vec += k[i] * (h * (B[i] - B_HAT[i]));
		}
		let mut error: Float = 0.0;
		for n in 0..N {
			let scale = self.tol.absolute + self.tol.relative * y[n].abs().max(y_new[n].abs());
			error = error.max(err_vec[n].abs() / scale);
		}
		// Done
		(y_new, error)
	}
	/// One classical RK4 step
	pub fn rk4_step(&mut self, t: Float, y: &SVector<Float, N>, h: Float) -> SVector<Float, N> {
		let k1 = self.differentiator.differentiate(t, y).0;
		let k2 = self.differentiator.differentiate(t + h / 2.0, &(y + k1 * (h / 2.0))).0;
		let k3 = self.differentiator.differentiate(t + h / 2.0, &(y + k2 * (h / 2.0))).0;
		let k4 = self.differentiator.differentiate(t + h, &(y + k3 * h)).0;
		self.stats.fn_evals += 4;
		self.stats.accepted_steps += 1;
		y + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (h / 6.0)
	}
	/// Integrates from `t` to `t_target` with adaptive steps, the last step is clipped to land exactly on `t_target`.
	/// `h` is the step size to try first, it is updated so it can be carried into the next interval.
	fn advance_adaptive(&mut self, t: Float, y: &SVector<Float, N>, t_target: Float, h: &mut Float, step_count: &mut u64) -> Result<SVector<Float, N>, IntegrationError> {
		let mut t = t;
		let mut y = *y;
		while t < t_target {
			let clipped = t + *h >= t_target;
			let h_try = if clipped {t_target - t} else {*h};
			let (y_new, error) = self.dormand_prince_step(t, &y, h_try);
			let factor = self.controller.compute_factor(error);
			if error <= 1.0 {
				t = if clipped {t_target} else {t + h_try};
				y = y_new;
				if !y.iter().all(|v| v.is_finite()) {
					return Err(IntegrationError::NonFiniteState{t});
				}
				self.stats.accepted_steps += 1;
				// A clipped step says nothing about how large the next one can be
				if !clipped {
					*h = h_try * factor;
				}
			}
			else {
				self.stats.rejected_steps += 1;
				*h = h_try * factor;
				if *h < self.h_min {
					return Err(IntegrationError::StepSizeTooSmall{t, h: *h});
				}
			}
			*step_count += 1;
			if *step_count > self.max_steps {
				return Err(IntegrationError::MaxStepsExceeded);
			}
		}
		Ok(y)
	}
	fn advance_fixed(&mut self, t: Float, y: &SVector<Float, N>, t_target: Float) -> Result<SVector<Float, N>, IntegrationError> {
		let h = (t_target - t) / (self.rk4_substeps as Float);
		let mut y = *y;
		for i in 0..self.rk4_substeps {
			y = self.rk4_step(t + (i as Float) * h, &y, h);
		}
		if !y.iter().all(|v| v.is_finite()) {
			return Err(IntegrationError::NonFiniteState{t: t_target});
		}
		Ok(y)
	}
	fn validate_inputs(&self, y0: &SVector<Float, N>, times: &[Float]) -> Result<(), IntegrationError> {
		if !self.tol.absolute.is_finite() || self.tol.absolute <= 0.0 {
			return Err(IntegrationError::InvalidInput{message: "absolute tolerance must be positive and finite".to_string()});
		}
		if !self.tol.relative.is_finite() || self.tol.relative < 0.0 {
			return Err(IntegrationError::InvalidInput{message: "relative tolerance must be non-negative and finite".to_string()});
		}
		if !self.initial_step.is_finite() || self.initial_step <= 0.0 {
			return Err(IntegrationError::InvalidInput{message: "initial step must be positive and finite".to_string()});
		}
		if self.method == Method::Rk4 && self.rk4_substeps == 0 {
			return Err(IntegrationError::InvalidInput{message: "RK4 needs at least one substep per sample".to_string()});
		}
		for (i, val) in y0.iter().enumerate() {
			if !val.is_finite() {
				return Err(IntegrationError::InvalidInput{message: format!("y0[{}] is not finite", i)});
			}
		}
		for pair in times.windows(2) {
			if !pair[1].is_finite() || pair[1] < pair[0] {
				return Err(IntegrationError::InvalidInput{message: "sample times must be finite and non-decreasing".to_string()});
			}
		}
		if times.first().map_or(false, |t| !t.is_finite()) {
			return Err(IntegrationError::InvalidInput{message: "sample times must be finite and non-decreasing".to_string()});
		}
		Ok(())
	}
	/// Returns the state at every entry of `times`, starting from `y0` at `times[0]`
	/// `Method::Auto` is plain Dormand-Prince here, use `sample_linear` to get the exponential step
	pub fn sample(&mut self, y0: &SVector<Float, N>, times: &[Float]) -> Result<Vec<SVector<Float, N>>, IntegrationError> {
		if self.method == Method::Exponential {
			return Err(IntegrationError::InvalidInput{message: "the exponential step needs a linear system".to_string()});
		}
		self.validate_inputs(y0, times)?;
		self.stats = Stats::default();
		let mut out = Vec::<SVector<Float, N>>::with_capacity(times.len());
		if times.is_empty() {
			return Ok(out);
		}
		let mut y = *y0;
		let mut h = self.initial_step;
		let mut step_count: u64 = 0;
		out.push(y);
		for pair in times.windows(2) {
			y = match self.method {
				Method::Rk4 => self.advance_fixed(pair[0], &y, pair[1])?,
				_ => self.advance_adaptive(pair[0], &y, pair[1], &mut h, &mut step_count)?
			};
			out.push(y);
		}
		// Done
		Ok(out)
	}
}

impl<T: LinearDifferentiator<2>> Stepper<2, T> {
	/// What `Method::Auto` turns into for this system over `span` seconds
	pub fn resolve_method(&self, span: Float) -> Method {
		match self.method {
			Method::Auto => {
				let a = self.differentiator.system_matrix();
				if span.abs() * a.amax() > STIFFNESS_LIMIT {Method::Exponential} else {Method::DormandPrince}
			},
			method => method
		}
	}
	/// Like `sample`, but stiff systems are advanced with y(t + dt) = exp(A dt) y(t), which is exact and stable for any dt
	pub fn sample_linear(&mut self, y0: &SVector<Float, 2>, times: &[Float]) -> Result<Vec<SVector<Float, 2>>, IntegrationError> {
		let span = match (times.first(), times.last()) {
			(Some(first), Some(last)) => last - first,
			_ => 0.0
		};
		let method = self.resolve_method(span);
		if method != Method::Exponential {
			let requested = self.method;
			self.method = method;
			let result = self.sample(y0, times);
			self.method = requested;
			return result;
		}
		self.validate_inputs(y0, times)?;
		self.stats = Stats::default();
		let a = self.differentiator.system_matrix();
		let mut out = Vec::<SVector<Float, 2>>::with_capacity(times.len());
		if times.is_empty() {
			return Ok(out);
		}
		let mut y = *y0;
		// Propagator is only rebuilt when the spacing changes
		let mut cached: Option<(Float, Matrix2<Float>)> = None;
		out.push(y);
		for pair in times.windows(2) {
			let dt = pair[1] - pair[0];
			let propagator = match cached {
				Some((cached_dt, p)) if cached_dt == dt => p,
				_ => {
					let p = (a * dt).exp();
					cached = Some((dt, p));
					p
				}
			};
			y = propagator * y;
			if !y.iter().all(|v| v.is_finite()) {
				return Err(IntegrationError::NonFiniteState{t: pair[1]});
			}
			self.stats.accepted_steps += 1;
			out.push(y);
		}
		// Done
		Ok(out)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use approx::assert_relative_eq;
	use nalgebra::Vector2;

	/// x'' = -omega^2 x
	struct HarmonicOscillator {
		omega: Float
	}

	impl StaticDifferentiator<2> for HarmonicOscillator {
		fn differentiate(&self, _t: Float, state: &Vector2<Float>) -> NDimensionalDerivative<2> {
			NDimensionalDerivative(Vector2::new(state[1], -self.omega * self.omega * state[0]))
		}
	}

	/// x' = x, blows up fast
	struct Exponential;

	impl StaticDifferentiator<1> for Exponential {
		fn differentiate(&self, _t: Float, state: &SVector<Float, 1>) -> NDimensionalDerivative<1> {
			NDimensionalDerivative(*state)
		}
	}

	fn linspace(start: Float, end: Float, n: usize) -> Vec<Float> {
		(0..n).map(|i| start + (end - start) * (i as Float) / ((n - 1) as Float)).collect()
	}

	#[test]
	fn harmonic_oscillator_matches_exact() {
		let mut stepper = Stepper::new(HarmonicOscillator{omega: 1.0}, Tolerances::default());
		let times = linspace(0.0, 2.0 * std::f64::consts::PI, 200);
		let states = stepper.sample(&Vector2::new(1.0, 0.0), &times).unwrap();
		assert_eq!(states.len(), times.len());
		for (t, y) in times.iter().zip(states.iter()) {
			assert!((y[0] - t.cos()).abs() < 1e-7, "x error at t = {}", t);
			assert!((y[1] + t.sin()).abs() < 1e-7, "v error at t = {}", t);
		}
		assert!(stepper.stats.accepted_steps > 0);
		assert!(stepper.stats.fn_evals >= 7 * stepper.stats.accepted_steps);
	}
	#[test]
	fn first_sample_is_initial_state() {
		let mut stepper = Stepper::new(HarmonicOscillator{omega: 3.0}, Tolerances::default());
		let y0 = Vector2::new(0.1, 0.0);
		let states = stepper.sample(&y0, &[0.0, 1.0]).unwrap();
		assert_eq!(states[0], y0);
	}
	#[test]
	fn rk4_agrees_with_dormand_prince() {
		let times = linspace(0.0, 10.0, 500);
		let y0 = Vector2::new(0.1, 0.0);
		let mut adaptive = Stepper::new(HarmonicOscillator{omega: 10.0_f64.sqrt()}, Tolerances::default());
		let mut fixed = Stepper::new(HarmonicOscillator{omega: 10.0_f64.sqrt()}, Tolerances::default()).with_method(Method::Rk4);
		let a = adaptive.sample(&y0, &times).unwrap();
		let b = fixed.sample(&y0, &times).unwrap();
		for (ya, yb) in a.iter().zip(b.iter()) {
			assert_relative_eq!(ya[0], yb[0], epsilon = 1e-8);
			assert_relative_eq!(ya[1], yb[1], epsilon = 1e-8);
		}
		assert_eq!(fixed.stats.accepted_steps, 499 * 20);
		assert_eq!(fixed.stats.rejected_steps, 0);
	}
	#[test]
	fn deterministic() {
		let times = linspace(0.0, 5.0, 50);
		let run = || {
			let mut stepper = Stepper::new(HarmonicOscillator{omega: 2.0}, Tolerances::default());
			stepper.sample(&Vector2::new(1.0, 0.5), &times).unwrap()
		};
		assert_eq!(run(), run());
	}
	#[test]
	fn invalid_inputs() {
		let y0 = Vector2::new(1.0, 0.0);
		let mut stepper = Stepper::new(HarmonicOscillator{omega: 1.0}, Tolerances::new(0.0, 1e-9));
		assert!(matches!(stepper.sample(&y0, &[0.0, 1.0]), Err(IntegrationError::InvalidInput{..})));
		let mut stepper = Stepper::new(HarmonicOscillator{omega: 1.0}, Tolerances::default());
		assert!(matches!(stepper.sample(&y0, &[0.0, 2.0, 1.0]), Err(IntegrationError::InvalidInput{..})));
		assert!(matches!(stepper.sample(&Vector2::new(Float::NAN, 0.0), &[0.0, 1.0]), Err(IntegrationError::InvalidInput{..})));
		assert!(stepper.sample(&y0, &[]).unwrap().is_empty());
	}
	#[test]
	fn max_steps() {
		let mut stepper = Stepper::new(Exponential, Tolerances::default());
		stepper.max_steps = 10;
		let result = stepper.sample(&SVector::<Float, 1>::new(1.0), &[0.0, 50.0]);
		assert_eq!(result, Err(IntegrationError::MaxStepsExceeded));
	}
	/// x'' = -(k/m) x - (b/m) x'
	struct Linear {
		a: Matrix2<Float>
	}

	impl Linear {
		fn spring(m: Float, k: Float, b: Float) -> Self {
			Self{a: Matrix2::new(0.0, 1.0, -k / m, -b / m)}
		}
	}

	impl StaticDifferentiator<2> for Linear {
		fn differentiate(&self, _t: Float, state: &Vector2<Float>) -> NDimensionalDerivative<2> {
			NDimensionalDerivative(self.a * state)
		}
	}

	impl LinearDifferentiator<2> for Linear {
		fn system_matrix(&self) -> Matrix2<Float> {
			self.a
		}
	}

	#[test]
	fn auto_picks_exponential_for_stiff_systems() {
		let stiff = Stepper::new(Linear::spring(0.001, 10.0, 500.0), Tolerances::default()).with_method(Method::Auto);
		assert_eq!(stiff.resolve_method(20.0), Method::Exponential);
		let mild = Stepper::new(Linear::spring(1.0, 10.0, 0.5), Tolerances::default()).with_method(Method::Auto);
		assert_eq!(mild.resolve_method(20.0), Method::DormandPrince);
		// Explicit choices are left alone
		let forced = Stepper::new(Linear::spring(1.0, 10.0, 1e6), Tolerances::default()).with_method(Method::Rk4);
		assert_eq!(forced.resolve_method(20.0), Method::Rk4);
	}
	#[test]
	fn exponential_matches_dormand_prince() {
		let times = linspace(0.0, 10.0, 300);
		let y0 = Vector2::new(0.1, 0.0);
		let mut exact = Stepper::new(Linear::spring(1.0, 10.0, 0.5), Tolerances::default()).with_method(Method::Exponential);
		let mut adaptive = Stepper::new(Linear::spring(1.0, 10.0, 0.5), Tolerances::default());
		let a = exact.sample_linear(&y0, &times).unwrap();
		let b = adaptive.sample_linear(&y0, &times).unwrap();
		assert_eq!(a.len(), times.len());
		assert_eq!(a[0], y0);
		for (ya, yb) in a.iter().zip(b.iter()) {
			assert_relative_eq!(ya[0], yb[0], epsilon = 1e-8);
			assert_relative_eq!(ya[1], yb[1], epsilon = 1e-8);
		}
		assert_eq!(exact.stats.accepted_steps, 299);
		assert_eq!(exact.stats.fn_evals, 0);
	}
	#[test]
	fn stiff_system_finishes_with_exponential_step() {
		let times = linspace(0.0, 20.0, 1000);
		let y0 = Vector2::new(0.1, 0.0);
		// Dormand-Prince gives up on this one
		let mut explicit = Stepper::new(Linear::spring(1.0, 10.0, 1e6), Tolerances::default());
		explicit.max_steps = 100_000;
		assert!(explicit.sample_linear(&y0, &times).is_err());
		let mut auto = Stepper::new(Linear::spring(1.0, 10.0, 1e6), Tolerances::default()).with_method(Method::Auto);
		let states = auto.sample_linear(&y0, &times).unwrap();
		// Slow mode decays like exp(-k t / b)
		assert_relative_eq!(states[999][0], 0.1 * (-10.0 * 20.0 / 1e6_f64).exp(), max_relative = 1e-6);
	}
	#[test]
	fn exponential_needs_linear_sampling() {
		let mut stepper = Stepper::new(HarmonicOscillator{omega: 1.0}, Tolerances::default()).with_method(Method::Exponential);
		assert!(matches!(stepper.sample(&Vector2::new(1.0, 0.0), &[0.0, 1.0]), Err(IntegrationError::InvalidInput{..})));
	}
	#[test]
	fn step_controller_limits() {
		let controller = StepController::default();
		assert_eq!(controller.compute_factor(0.0), 5.0);
		assert_eq!(controller.compute_factor(1e12), 0.2);
		assert_relative_eq!(controller.compute_factor(1.0), 0.9);
	}
}
