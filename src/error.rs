use thiserror::Error;

/// Failure of a single [`Host`](`crate::host::Host`) primitive.
///
/// These never escape a [`Reconciler`](`crate::Reconciler`) pass.
/// They are logged and the affected fiber falls back to its previous subtree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
	#[error("host node not found: {0}")]
	NotFound(String),
	#[error("{child} is not a child of {parent}")]
	NotAChild { parent: String, child: String },
	#[error("{0} is not an element")]
	NotAnElement(String),
	#[error("JavaScript error: {0}")]
	Js(String),
}

/// Failure reported by a [`ComponentBridge`](`crate::component::ComponentBridge`) call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComponentError {
	#[error("no component registered for stype {0:?}")]
	NotRegistered(String),
	#[error("failed to mount {id:?}: {reason}")]
	Mount { id: String, reason: String },
	#[error("failed to update {id:?}: {reason}")]
	Update { id: String, reason: String },
	#[error("failed to unmount {id:?}: {reason}")]
	Unmount { id: String, reason: String },
}
