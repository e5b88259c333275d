// self
use crate::_prelude::*;

/// Severity attached to a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
	/// Verbose internals.
	Debug,
	/// Normal operation.
	Info,
	/// Something the caller should look at; processing continues.
	Warn,
	/// A failure that was handled locally (e.g. a dropped background refresh).
	Error,
}

/// Injected diagnostics sink used by managers and authenticators.
pub trait Logger
where
	Self: Send + Sync,
{
	/// Emits a message at `level`.
	fn log(&self, level: LogLevel, message: &str);

	/// Emits a debug message.
	fn debug(&self, message: &str) {
		self.log(LogLevel::Debug, message);
	}

	/// Emits an info message.
	fn info(&self, message: &str) {
		self.log(LogLevel::Info, message);
	}

	/// Emits a warning.
	fn warn(&self, message: &str) {
		self.log(LogLevel::Warn, message);
	}

	/// Emits an error message.
	fn error(&self, message: &str) {
		self.log(LogLevel::Error, message);
	}
}

/// Default logger: forwards to `tracing` when the feature is enabled, otherwise drops messages.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;
impl Logger for TracingLogger {
	fn log(&self, level: LogLevel, message: &str) {
		#[cfg(feature = "tracing")]
		match level {
			LogLevel::Debug => tracing::debug!(target: "ibm_cloud_auth", "{message}"),
			LogLevel::Info => tracing::info!(target: "ibm_cloud_auth", "{message}"),
			LogLevel::Warn => tracing::warn!(target: "ibm_cloud_auth", "{message}"),
			LogLevel::Error => tracing::error!(target: "ibm_cloud_auth", "{message}"),
		}

		#[cfg(not(feature = "tracing"))]
		{
			let _ = (level, message);
		}
	}
}

/// Logger that keeps every entry in memory so callers can assert on diagnostics.
#[derive(Debug, Default)]
pub struct RecordingLogger(Mutex<Vec<(LogLevel, String)>>);
impl RecordingLogger {
	/// Returns a snapshot of all recorded entries.
	pub fn entries(&self) -> Vec<(LogLevel, String)> {
		self.0.lock().clone()
	}

	/// Returns recorded messages at exactly `level`.
	pub fn messages(&self, level: LogLevel) -> Vec<String> {
		self.0
			.lock()
			.iter()
			.filter(|(lvl, _)| *lvl == level)
			.map(|(_, message)| message.clone())
			.collect()
	}
}
impl Logger for RecordingLogger {
	fn log(&self, level: LogLevel, message: &str) {
		self.0.lock().push((level, message.to_owned()));
	}
}
