//! Work units pairing each next [`VNode`] with at most one previous counterpart.
//!
//! Fibers live in an arena ([`FiberTree`]) and link to each other through [`FiberId`] indices.
//! `child` and `sibling` describe the tree shape, `return_fiber` is a non-owning back-reference.

use crate::{
	component::Registration,
	temp_set::TempKeySet,
	vnode::{Key, VChild, VNode},
};
use core::ops::{Index, IndexMut};
use hashbrown::HashMap;
use std::{collections::VecDeque, rc::Rc};
use tracing::{instrument, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FiberId(usize);

impl FiberId {
	#[must_use]
	pub fn index(self) -> usize {
		self.0
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FiberKind {
	/// A tagless text leaf, bound to a host text node.
	Text,
	Element,
	Component,
	Portal,
	/// `stype` names nothing known.
	Missing,
}

impl FiberKind {
	fn of(vnode: &VNode, resolve: &dyn Fn(&str) -> Registration) -> Self {
		if vnode.portal.is_some() {
			return Self::Portal;
		}
		if let Some(stype) = vnode.stype() {
			match resolve(stype) {
				Registration::Component => return Self::Component,
				Registration::Missing => return Self::Missing,
				Registration::Template => (),
			}
		}
		if vnode.tag.is_none() {
			Self::Text
		} else {
			Self::Element
		}
	}
}

#[derive(Debug, Clone)]
pub struct Fiber<N> {
	pub vnode: Rc<VNode>,
	/// Matched counterpart in the previous tree.
	pub prev: Option<FiberId>,
	pub kind: FiberKind,
	pub dom_element: Option<N>,
	/// The host container this unit's element belongs under.
	pub parent: Option<N>,
	pub child: Option<FiberId>,
	pub sibling: Option<FiberId>,
	pub return_fiber: Option<FiberId>,
	/// Position in the parent's [`VNode::children`], primitives included.
	pub index: usize,
	/// Children that don't get a fiber, by their position in [`VNode::children`].
	pub primitive_text_children: Vec<(usize, String)>,
	/// The host text nodes placed for `primitive_text_children`, in the same order.
	pub text_hosts: Vec<N>,
	pub portal_id: Option<String>,
}

impl<N> Fiber<N> {
	pub(crate) fn new(vnode: Rc<VNode>, prev: Option<FiberId>, kind: FiberKind, return_fiber: Option<FiberId>, index: usize) -> Self {
		Self {
			vnode,
			prev,
			kind,
			dom_element: None,
			parent: None,
			child: None,
			sibling: None,
			return_fiber,
			index,
			primitive_text_children: vec![],
			text_hosts: vec![],
			portal_id: None,
		}
	}
}

#[derive(Debug, Clone)]
pub struct FiberTree<N> {
	fibers: Vec<Fiber<N>>,
	root: Option<FiberId>,
}

impl<N> Default for FiberTree<N> {
	fn default() -> Self {
		Self { fibers: vec![], root: None }
	}
}

impl<N> Index<FiberId> for FiberTree<N> {
	type Output = Fiber<N>;

	fn index(&self, id: FiberId) -> &Fiber<N> {
		&self.fibers[id.0]
	}
}

impl<N> IndexMut<FiberId> for FiberTree<N> {
	fn index_mut(&mut self, id: FiberId) -> &mut Fiber<N> {
		&mut self.fibers[id.0]
	}
}

impl<N> FiberTree<N> {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn root(&self) -> Option<FiberId> {
		self.root
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.fibers.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.fibers.is_empty()
	}

	#[must_use]
	pub fn get(&self, id: FiberId) -> Option<&Fiber<N>> {
		self.fibers.get(id.0)
	}

	/// Follows `child`, then `sibling` links.
	pub fn children(&self, id: FiberId) -> Children<'_, N> {
		Children {
			tree: self,
			next: self[id].child,
		}
	}

	/// The chain of positions from the root down to `id`, e.g. `"0/2/1"`.
	#[must_use]
	pub fn path(&self, id: FiberId) -> String {
		let mut indices = vec![];
		let mut current = Some(id);
		while let Some(fiber) = current {
			indices.push(self[fiber].index.to_string());
			current = self[fiber].return_fiber;
		}
		indices.reverse();
		indices.join("/")
	}

	pub(crate) fn push(&mut self, fiber: Fiber<N>) -> FiberId {
		self.fibers.push(fiber);
		FiberId(self.fibers.len() - 1)
	}

	pub(crate) fn set_root(&mut self, root: Option<FiberId>) {
		self.root = root;
	}

	/// Links `child` under `parent`, right after `previous` or as the first child.
	pub(crate) fn link_child(&mut self, parent: FiberId, child: FiberId, previous: Option<FiberId>) {
		self[child].return_fiber = Some(parent);
		match previous {
			Some(previous) => {
				self[child].sibling = self[previous].sibling;
				self[previous].sibling = Some(child);
			}
			None => {
				self[child].sibling = self[parent].child;
				self[parent].child = Some(child);
			}
		}
	}

	/// Post-order walk of the subtree at `id`.
	#[must_use]
	pub fn subtree_post_order(&self, id: FiberId) -> Vec<FiberId> {
		let mut order = vec![];
		let mut stack = vec![(id, false)];
		while let Some((fiber, expanded)) = stack.pop() {
			if expanded {
				order.push(fiber);
			} else {
				stack.push((fiber, true));
				let children: Vec<_> = self.children(fiber).collect();
				stack.extend(children.into_iter().rev().map(|child| (child, false)));
			}
		}
		order
	}
}

impl<N: Clone> FiberTree<N> {
	/// Replaces the subtree at `id` with a copy of `source`'s subtree at `source_id`.
	///
	/// Each copied fiber's `prev` points at the `source` fiber it was copied from.
	pub(crate) fn graft(&mut self, id: FiberId, source: &FiberTree<N>, source_id: FiberId) {
		let (return_fiber, sibling, index) = (self[id].return_fiber, self[id].sibling, self[id].index);
		self[id] = Fiber {
			prev: Some(source_id),
			child: None,
			sibling,
			return_fiber,
			index,
			..source[source_id].clone()
		};
		let mut previous = None;
		for source_child in source.children(source_id) {
			let child = self.push(Fiber {
				child: None,
				sibling: None,
				..source[source_child].clone()
			});
			self.link_child(id, child, previous);
			self.graft(child, source, source_child);
			previous = Some(child);
		}
	}
}

pub struct Children<'a, N> {
	tree: &'a FiberTree<N>,
	next: Option<FiberId>,
}

impl<N> Iterator for Children<'_, N> {
	type Item = FiberId;

	fn next(&mut self) -> Option<FiberId> {
		let current = self.next?;
		self.next = self.tree[current].sibling;
		Some(current)
	}
}

/// Pairs next trees with previous ones. Holds scratch space reused across passes.
#[derive(Debug, Default)]
pub struct FiberBuilder {
	sibling_sids: TempKeySet,
}

impl FiberBuilder {
	#[must_use]
	pub fn new() -> Self {
		Self { sibling_sids: TempKeySet::new() }
	}

	/// Capacity of the sibling key scratch set, for diagnostics.
	#[must_use]
	pub fn scratch_capacity(&self) -> usize {
		self.sibling_sids.capacity()
	}

	/// Builds the fiber tree for `root`, matching against `prev` where possible.
	///
	/// `resolve` classifies `stype`s, see [`Registration`].
	#[instrument(skip_all)]
	pub fn build<N>(&mut self, root: Rc<VNode>, prev: Option<&FiberTree<N>>, resolve: &dyn Fn(&str) -> Registration) -> FiberTree<N> {
		let mut tree = FiberTree::new();

		let prev_root = prev.and_then(|prev| {
			let prev_root = prev.root()?;
			let prev_vnode = &prev[prev_root].vnode;
			let compatible = match (root.key(), prev_vnode.key()) {
				(Some(next_key), Some(prev_key)) => next_key == prev_key,
				(None, None) => root.signature() == prev_vnode.signature(),
				_ => false,
			};
			compatible.then_some(prev_root)
		});
		let kind = FiberKind::of(&root, resolve);
		let root_id = tree.push(Fiber::new(root, prev_root, kind, None, 0));
		tree.set_root(Some(root_id));

		let mut stack = vec![root_id];
		while let Some(id) = stack.pop() {
			self.build_children(&mut tree, id, prev, resolve);
			let children: Vec<_> = tree.children(id).collect();
			stack.extend(children.into_iter().rev());
		}

		trace!(fibers = tree.len(), "Built fiber tree");
		tree
	}

	fn build_children<N>(&mut self, tree: &mut FiberTree<N>, id: FiberId, prev: Option<&FiberTree<N>>, resolve: &dyn Fn(&str) -> Registration) {
		let vnode = Rc::clone(&tree[id].vnode);
		if vnode.is_text_leaf() || tree[id].kind == FiberKind::Text {
			return;
		}

		let prev_children: Vec<FiberId> = match (prev, tree[id].prev) {
			(Some(prev), Some(prev_id)) => prev.children(prev_id).collect(),
			_ => vec![],
		};

		let mut keyed: HashMap<Key<'_>, VecDeque<FiberId>> = HashMap::new();
		let mut unkeyed: Vec<Option<FiberId>> = vec![];
		if let Some(prev) = prev {
			for &prev_child in &prev_children {
				match prev[prev_child].vnode.key() {
					Some(key) => keyed.entry(key).or_default().push_back(prev_child),
					None => unkeyed.push(Some(prev_child)),
				}
			}
		}
		let mut unkeyed_cursor = 0;

		let sibling_sids = self.sibling_sids.temp();
		let mut previous = None;
		for (index, child) in vnode.children.iter().enumerate() {
			let child = match child {
				VChild::Text(text) => {
					tree[id].primitive_text_children.push((index, text.clone()));
					continue;
				}
				VChild::Node(child) => child,
			};

			let key = child.key();
			if let Some(Key::Sid(sid)) = key {
				if !sibling_sids.insert(sid.to_owned()) {
					warn!(sid, "Duplicate sibling sid. Matching first-come.");
				}
			}

			let matched = match (key, prev) {
				(Some(key), Some(_)) => keyed.get_mut(&key).and_then(VecDeque::pop_front),
				(None, Some(prev)) => {
					let signature = child.signature();
					let found = unkeyed[unkeyed_cursor..]
						.iter()
						.position(|candidate| candidate.map_or(false, |candidate| prev[candidate].vnode.signature() == signature));
					found.and_then(|offset| {
						let position = unkeyed_cursor + offset;
						unkeyed_cursor = position + 1;
						unkeyed[position].take()
					})
				}
				(_, None) => None,
			};
			if let Some(matched) = matched {
				trace!(index, ?key, prev = matched.index(), "Matched previous fiber");
			}

			let kind = FiberKind::of(child, resolve);
			let child_id = tree.push(Fiber::new(Rc::clone(child), matched, kind, Some(id), index));
			tree.link_child(id, child_id, previous);
			previous = Some(child_id);
		}
	}
}
