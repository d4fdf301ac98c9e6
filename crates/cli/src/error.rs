use std::path::PathBuf;

use arrivals::{RefreshError, StorageError, TriggerRejection};
use thiserror::Error;

/// Process-level failures of the `arrivals` binary.
#[derive(Debug, Error)]
pub enum AppError {
	#[error("configuration error: {0}")]
	Config(String),

	#[error("failed to bind {addr}: {source}")]
	Bind {
		addr: String,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to prepare {path}: {source}")]
	Directory {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error(transparent)]
	Refresh(#[from] RefreshError),

	#[error(transparent)]
	Rejected(#[from] TriggerRejection),

	#[error(transparent)]
	Storage(#[from] StorageError),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	#[error(transparent)]
	Anyhow(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
