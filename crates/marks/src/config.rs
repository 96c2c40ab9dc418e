use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Default idle delay between breakpoint polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Line numbering used by the host's breakpoint source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineBase {
	/// Host lines are already zero-based.
	#[default]
	Zero,
	/// Host lines start at 1 and are shifted down before publication.
	One,
}

impl LineBase {
	/// Converts a host line into a zero-based mark line.
	///
	/// Returns `None` for line 0 from a one-based host.
	pub const fn to_zero_based(self, line: usize) -> Option<usize> {
		match self {
			Self::Zero => Some(line),
			Self::One => line.checked_sub(1),
		}
	}
}

/// Tuning for one [`crate::MarkEngine`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarkEngineConfig {
	/// Idle delay between the end of one breakpoint poll and the start of the next.
	pub poll_interval_ms: u64,
	pub breakpoint_line_base: LineBase,
}

impl Default for MarkEngineConfig {
	fn default() -> Self {
		Self {
			poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
			breakpoint_line_base: LineBase::Zero,
		}
	}
}

impl MarkEngineConfig {
	/// Parses and validates a TOML configuration table.
	pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(input)?;
		config.validate()?;
		Ok(config)
	}

	/// Sets the poll interval.
	#[must_use]
	pub fn with_poll_interval(mut self, interval: Duration) -> Self {
		self.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
		self
	}

	/// Sets the host breakpoint line numbering.
	#[must_use]
	pub fn with_line_base(mut self, base: LineBase) -> Self {
		self.breakpoint_line_base = base;
		self
	}

	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.poll_interval_ms == 0 {
			return Err(ConfigError::InvalidPollInterval);
		}
		Ok(())
	}

	pub fn poll_interval(&self) -> Duration {
		Duration::from_millis(self.poll_interval_ms)
	}
}
