//! The narrow interface through which the reconciler drives component instances.
//!
//! Instance bookkeeping and per-instance state belong to the implementor.

use crate::{error::ComponentError, model, vnode::VNode};
use core::cell::{Cell, RefCell};
use serde_json::Value;
use std::{collections::VecDeque, rc::Rc};
use tracing::trace;

/// How a [`VNode::stype`] is handled, resolved once per fiber while the fiber tree is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
	/// Driven through the [`ComponentBridge`] lifecycle.
	Component,
	/// Already expanded by the builder. Rendered as a plain element.
	Template,
	/// Neither. The position is skipped.
	Missing,
}

/// A component instance as seen by its registry.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentInstance<N> {
	pub id: String,
	pub stype: String,
	/// The live host element, if mounted with one.
	pub element: Option<N>,
}

pub trait ComponentBridge<N> {
	fn resolve(&self, stype: &str) -> Registration;

	/// Called the first time an identity is seen. Must return the existing element for an already-mounted identity.
	///
	/// `Ok(None)` leaves host element creation to the reconciler.
	fn mount_component(&mut self, vnode: &VNode, container: &N, cx: &RenderContext<'_>) -> Result<Option<N>, ComponentError>;

	/// Called when a mounted identity is rendered again. The component diffs its props itself.
	fn update_component(&mut self, previous: &VNode, next: &VNode, container: &N, cx: &RenderContext<'_>) -> Result<(), ComponentError>;

	/// Called during stale cleanup, before the host element is removed.
	fn unmount_component(&mut self, vnode: &VNode, cx: &RenderContext<'_>) -> Result<(), ComponentError>;

	fn get_component_instance(&self, id: &str) -> Option<ComponentInstance<N>>;
}

/// No components: every `stype` names a template.
impl<N> ComponentBridge<N> for () {
	fn resolve(&self, _: &str) -> Registration {
		Registration::Template
	}

	fn mount_component(&mut self, _: &VNode, _: &N, _: &RenderContext<'_>) -> Result<Option<N>, ComponentError> {
		Ok(None)
	}

	fn update_component(&mut self, _: &VNode, _: &VNode, _: &N, _: &RenderContext<'_>) -> Result<(), ComponentError> {
		Ok(())
	}

	fn unmount_component(&mut self, _: &VNode, _: &RenderContext<'_>) -> Result<(), ComponentError> {
		Ok(())
	}

	fn get_component_instance(&self, _: &str) -> Option<ComponentInstance<N>> {
		None
	}
}

/// What a component call can see of the current pass.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
	pub model: &'a Value,
	pub runtime: Option<&'a Value>,
	pub updates: &'a UpdateQueue,
}

impl<'a> RenderContext<'a> {
	/// The model data of the node identified by `sid`.
	#[must_use]
	pub fn model_for(&self, sid: &str) -> Option<&'a Value> {
		model::find_by_sid(self.model, sid)
	}
}

/// A re-render requested by a component for its own identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredUpdate {
	pub sid: String,
	/// Whether the request was made while a pass was committing.
	pub during_pass: bool,
}

/// Collects component-triggered update requests so they run as the next pass instead of re-entering the current one.
///
/// Cloning shares the queue.
#[derive(Debug, Clone, Default)]
pub struct UpdateQueue(Rc<QueueState>);

#[derive(Debug, Default)]
struct QueueState {
	requests: RefCell<VecDeque<DeferredUpdate>>,
	in_pass: Cell<bool>,
}

impl UpdateQueue {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Duplicate requests for the same `sid` are merged.
	pub fn request(&self, sid: impl Into<String>) {
		let sid = sid.into();
		let during_pass = self.0.in_pass.get();
		let mut requests = self.0.requests.borrow_mut();
		if requests.iter().any(|request| request.sid == sid) {
			return trace!(sid = sid.as_str(), "Update already queued");
		}
		trace!(sid = sid.as_str(), during_pass, "Queueing update");
		requests.push_back(DeferredUpdate { sid, during_pass });
	}

	#[must_use]
	pub fn in_pass(&self) -> bool {
		self.0.in_pass.get()
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.0.requests.borrow().len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn drain(&self) -> Vec<DeferredUpdate> {
		self.0.requests.borrow_mut().drain(..).collect()
	}

	/// Flags the queue as in-pass until the returned guard is dropped.
	#[must_use]
	pub(crate) fn enter_pass(&self) -> impl Drop + '_ {
		return PassGuard(&self.0.in_pass, self.0.in_pass.replace(true));

		struct PassGuard<'a>(&'a Cell<bool>, bool);
		impl Drop for PassGuard<'_> {
			fn drop(&mut self) {
				self.0.set(self.1);
			}
		}
	}
}
