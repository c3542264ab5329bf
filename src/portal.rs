//! Bookkeeping for subtrees rendered outside of their logical parent.

use crate::{error::HostError, host::Host, vnode::attr_names};
use hashbrown::{HashMap, HashSet};
use tracing::{error, instrument, trace};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalEntry<N> {
	pub target: N,
	/// The wrapper element inserted into `target`.
	pub host: N,
}

/// Tracks portal wrappers by portal id and detaches the ones a pass didn't visit.
#[derive(Debug)]
pub struct PortalManager<N> {
	entries: HashMap<String, PortalEntry<N>>,
	visited: HashSet<String>,
	tag: String,
}

impl<N: Clone + PartialEq + core::fmt::Debug> PortalManager<N> {
	#[must_use]
	pub fn new(tag: impl Into<String>) -> Self {
		Self {
			entries: HashMap::new(),
			visited: HashSet::new(),
			tag: tag.into(),
		}
	}

	pub fn begin_pass(&mut self) {
		self.visited.clear();
	}

	#[must_use]
	pub fn get(&self, id: &str) -> Option<&PortalEntry<N>> {
		self.entries.get(id)
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	#[must_use]
	pub fn is_portal_host(&self, node: &N) -> bool {
		self.entries.values().any(|entry| &entry.host == node)
	}

	/// Keeps the portal `id` alive through the current pass without touching its wrapper.
	pub fn visit(&mut self, id: &str) {
		self.visited.insert(id.to_owned());
	}

	/// Returns the wrapper for `id` inside `target`, creating it on first use and re-attaching it if it was moved.
	#[instrument(skip(self, host))]
	pub fn ensure_host<H: Host<Node = N>>(&mut self, host: &H, id: &str, target: &N) -> Result<N, HostError> {
		self.visit(id);

		if let Some(entry) = self.entries.get_mut(id) {
			if &entry.target != target {
				trace!("Retargeting portal");
				if host.parent_node(&entry.host).as_ref() == Some(&entry.target) {
					host.remove_child(&entry.target, &entry.host)?;
				}
				entry.target = target.clone();
			}
			if host.parent_node(&entry.host).as_ref() != Some(target) {
				trace!("Reattaching portal wrapper");
				host.append_child(target, &entry.host)?;
			}
			return Ok(entry.host.clone());
		}

		trace!("Creating portal wrapper");
		let wrapper = host.create_element(&self.tag)?;
		host.set_attribute(&wrapper, attr_names::PORTAL, id)?;
		host.append_child(target, &wrapper)?;
		self.entries.insert(
			id.to_owned(),
			PortalEntry {
				target: target.clone(),
				host: wrapper.clone(),
			},
		);
		Ok(wrapper)
	}

	/// Detaches and forgets every portal not visited since [`PortalManager::begin_pass`].
	///
	/// Returns the ids of the detached portals.
	#[instrument(skip_all)]
	pub fn finish_pass<H: Host<Node = N>>(&mut self, host: &H) -> Vec<String> {
		let stale: Vec<String> = self.entries.keys().filter(|id| !self.visited.contains(*id)).cloned().collect();
		for id in &stale {
			if let Some(entry) = self.entries.remove(id) {
				trace!(id = id.as_str(), "Detaching portal");
				if host.parent_node(&entry.host).as_ref() == Some(&entry.target) {
					if let Err(error) = host.remove_child(&entry.target, &entry.host) {
						error!(id = id.as_str(), "Failed to detach portal wrapper: {}", error);
					}
				}
			}
		}
		stale
	}
}
