//! Error types for engine construction, host calls and configuration.

use thiserror::Error;

/// Failure reported by a host collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HostError {
	/// A required host service is not available.
	#[error("host service unavailable: {0}")]
	Unavailable(String),

	/// The host failed while enumerating a collection.
	#[error("host read failed: {0}")]
	Read(String),
}

/// Errors that prevent a [`crate::MarkEngine`] from starting.
///
/// An engine that fails to open has released everything it acquired.
#[derive(Debug, Error)]
pub enum EngineError {
	/// The marker change subscription could not be established.
	#[error("failed to subscribe to marker changes: {0}")]
	Subscribe(#[source] HostError),

	/// No tokio runtime was current and the shared one could not be built.
	#[error("failed to start poller runtime: {0}")]
	Runtime(#[source] std::io::Error),

	/// The supplied configuration failed validation.
	#[error("invalid engine configuration: {0}")]
	Config(#[from] ConfigError),
}

/// Result type for engine construction.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur when loading engine configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error parsing TOML syntax or field types.
	#[error("TOML parse error: {0}")]
	Parse(#[from] toml::de::Error),

	/// The poll interval must be non-zero.
	#[error("invalid poll interval: must be greater than zero")]
	InvalidPollInterval,
}
