// Error types, Display is written out by hand for each of them
use std::fmt;

/// Rejected form input. The message is what gets shown to the user.
#[derive(Debug, Clone, PartialEq)]
pub enum InputError {
	NotANumber {
		field: &'static str,
		text: String
	},
	NonFinite {
		field: &'static str
	},
	NonPositiveMass,
	NonPositiveStiffness,
	NegativeDamping
}

impl fmt::Display for InputError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			InputError::NotANumber{field, text} => write!(f, "{} must be a number, got \"{}\".", field, text),
			InputError::NonFinite{field} => write!(f, "{} must be a finite number.", field),
			InputError::NonPositiveMass => write!(f, "Mass must be a positive number."),
			InputError::NonPositiveStiffness => write!(f, "Spring stiffness must be a positive number."),
			InputError::NegativeDamping => write!(f, "Damping coefficient cannot be negative.")
		}
	}
}

impl std::error::Error for InputError {}

#[derive(Debug, Clone, PartialEq)]
pub enum IntegrationError {
	/// Bad tolerances, times or initial state
	InvalidInput {
		message: String
	},
	/// Step size dropped below the minimum while steps kept getting rejected
	StepSizeTooSmall {
		t: f64,
		h: f64
	},
	MaxStepsExceeded,
	NonFiniteState {
		t: f64
	}
}

impl fmt::Display for IntegrationError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			IntegrationError::InvalidInput{message} => write!(f, "Invalid integrator input: {}", message),
			IntegrationError::StepSizeTooSmall{t, h} => write!(f, "Step size {} too small at t = {}", h, t),
			IntegrationError::MaxStepsExceeded => write!(f, "Maximum number of integration steps exceeded"),
			IntegrationError::NonFiniteState{t} => write!(f, "Non-finite state detected at t = {}", t)
		}
	}
}

impl std::error::Error for IntegrationError {}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
	ReadConfigFile {
		path: String,
		message: String
	},
	ParseConfigFile {
		path: String,
		message: String
	}
}

impl fmt::Display for ConfigError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ConfigError::ReadConfigFile{path, message} => write!(f, "Failed to read config file \"{}\": {}", path, message),
			ConfigError::ParseConfigFile{path, message} => write!(f, "Failed to parse config file \"{}\": {}", path, message)
		}
	}
}

impl std::error::Error for ConfigError {}

/// Everything that can go wrong between reading input and writing a chart
#[derive(Debug)]
pub enum Error {
	InvalidInput(InputError),
	Integration(IntegrationError),
	Config(ConfigError),
	Image(image::ImageError),
	Io(std::io::Error)
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Error::InvalidInput(e) => write!(f, "{}", e),
			Error::Integration(e) => write!(f, "{}", e),
			Error::Config(e) => write!(f, "{}", e),
			Error::Image(e) => write!(f, "Image error: {}", e),
			Error::Io(e) => write!(f, "I/O error: {}", e)
		}
	}
}

impl std::error::Error for Error {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Error::InvalidInput(e) => Some(e),
			Error::Integration(e) => Some(e),
			Error::Config(e) => Some(e),
			Error::Image(e) => Some(e),
			Error::Io(e) => Some(e)
		}
	}
}

impl From<InputError> for Error {
	fn from(e: InputError) -> Self {
		Error::InvalidInput(e)
	}
}

impl From<IntegrationError> for Error {
	fn from(e: IntegrationError) -> Self {
		Error::Integration(e)
	}
}

impl From<ConfigError> for Error {
	fn from(e: ConfigError) -> Self {
		Error::Config(e)
	}
}

impl From<image::ImageError> for Error {
	fn from(e: image::ImageError) -> Self {
		Error::Image(e)
	}
}

impl From<std::io::Error> for Error {
	fn from(e: std::io::Error) -> Self {
		Error::Io(e)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	#[test]
	fn input_messages_are_distinct() {
		let errors = vec![
			InputError::NotANumber{field: "Mass", text: "abc".to_string()},
			InputError::NonFinite{field: "Mass"},
			InputError::NonPositiveMass,
			InputError::NonPositiveStiffness,
			InputError::NegativeDamping
		];
		let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
		for (i, m) in messages.iter().enumerate() {
			assert!(!m.is_empty());
			for other in &messages[i + 1..] {
				assert_ne!(m, other);
			}
		}
	}
	#[test]
	fn wrapped_error_keeps_message() {
		let e: Error = InputError::NegativeDamping.into();
		assert_eq!(e.to_string(), "Damping coefficient cannot be negative.");
		assert!(std::error::Error::source(&e).is_some());
	}
}
