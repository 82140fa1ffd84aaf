//! Failure reasons surfaced by container operations.

use thiserror::Error;

/// Errors returned by scheduled container operations.
#[derive(Debug, Error)]
pub enum ContainerError {
	/// The owning [`ValueContainer`](crate::ValueContainer) was dropped before
	/// the operation could run. Closures passed to the operation were not
	/// invoked.
	#[error("value container is gone")]
	ContainerGone,

	/// A foreign error carried through the container API.
	#[error("unexpected error: {0}")]
	Unexpected(#[from] anyhow::Error),
}

impl ContainerError {
	/// Returns `true` for [`ContainerError::ContainerGone`].
	pub fn is_container_gone(&self) -> bool {
		matches!(self, Self::ContainerGone)
	}
}

/// Result alias for container operations.
pub type Result<T, E = ContainerError> = std::result::Result<T, E>;
