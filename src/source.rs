use std::{future::Future, process::Stdio, time::Duration};

use thiserror::Error;
use tokio::process::Command;

use crate::config::PollConfig;

/// Produces the raw status text for one poll cycle.
pub trait StatusSource {
	fn fetch(&mut self) -> impl Future<Output = Result<String, SourceError>> + Send;
}

#[derive(Error, Debug)]
pub enum SourceError {
	#[error("failed to run {command}: {source}")]
	Spawn { command: String, source: std::io::Error },
	#[error("{command} exited with {status}: {stderr}")]
	Failed { command: String, status: std::process::ExitStatus, stderr: String },
	#[error("{command} printed non UTF-8 output")]
	NotUtf8 { command: String },
	#[error("no status within {0:?}")]
	Timeout(Duration),
}

/// Runs `apcaccess status` (or whatever the poll configuration names) and captures stdout.
#[derive(Debug, Clone)]
pub struct CommandSource {
	command: String,
	args: Vec<String>,
}

impl CommandSource {
	pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
		Self {
			command: command.into(),
			args,
		}
	}
}

impl From<&PollConfig> for CommandSource {
	fn from(poll: &PollConfig) -> Self {
		Self::new(poll.command.clone(), poll.args.clone())
	}
}

impl StatusSource for CommandSource {
	async fn fetch(&mut self) -> Result<String, SourceError> {
		let output = Command::new(&self.command)
			.args(&self.args)
			.stdin(Stdio::null())
			.kill_on_drop(true)
			.output()
			.await
			.map_err(|source| SourceError::Spawn {
				command: self.command.clone(),
				source,
			})?;
		if !output.status.success() {
			return Err(SourceError::Failed {
				command: self.command.clone(),
				status: output.status,
				stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
			});
		}
		String::from_utf8(output.stdout).map_err(|_| SourceError::NotUtf8 {
			command: self.command.clone(),
		})
	}
}

#[cfg(all(test, unix))]
mod tests {
	use super::{CommandSource, SourceError, StatusSource};

	#[tokio::test]
	async fn test_captures_stdout() {
		let mut source = CommandSource::new("printf", vec!["BCHARGE  : 99.0 Percent\\nSTATUS   : ONLINE\\n".into()]);
		assert_eq!(source.fetch().await.unwrap(), "BCHARGE  : 99.0 Percent\nSTATUS   : ONLINE\n");
	}

	#[tokio::test]
	async fn test_missing_command() {
		let mut source = CommandSource::new("/nonexistent/apcaccess", vec!["status".into()]);
		assert!(matches!(source.fetch().await, Err(SourceError::Spawn { .. })));
	}

	#[tokio::test]
	async fn test_failing_command() {
		let mut source = CommandSource::new("sh", vec!["-c".into(), "echo 'Error contacting host localhost port 3551' >&2; exit 1".into()]);
		match source.fetch().await {
			Err(SourceError::Failed { stderr, .. }) => assert_eq!(stderr, "Error contacting host localhost port 3551"),
			other => panic!("unexpected {other:?}"),
		}
	}

	#[tokio::test]
	async fn test_non_utf8_output() {
		let mut source = CommandSource::new("printf", vec!["\\377\\376".into()]);
		assert!(matches!(source.fetch().await, Err(SourceError::NotUtf8 { .. })));
	}
}
