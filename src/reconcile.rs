use crate::{
	component::{ComponentBridge, DeferredUpdate, RenderContext, UpdateQueue},
	error::HostError,
	fiber::{Fiber, FiberBuilder, FiberId, FiberKind, FiberTree},
	host::Host,
	load,
	options::Options,
	portal::PortalManager,
	vnode::{attr_names, Key, VNode},
};
use core::fmt::{self, Debug, Formatter};
use serde_json::Value;
use std::rc::Rc;
use tracing::{error, info, info_span, instrument, level_filters::STATIC_MAX_LEVEL, trace, trace_span, warn, Level};

/// Counters of one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
	pub fibers: usize,
	/// Host nodes created, including component-provided ones.
	pub created: usize,
	pub reused: usize,
	/// Stale host children removed.
	pub removed: usize,
	/// Insertions of new or moved host nodes.
	pub placed: usize,
	pub attribute_writes: usize,
	pub text_writes: usize,
	pub portals_detached: usize,
	/// Recovered failures.
	pub errors: usize,
}

/// Text content as it may appear in logs.
struct Content<'a>(&'a str);
impl Debug for Content<'_> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		if cfg!(feature = "dangerous-logging") {
			Debug::fmt(self.0, f)
		} else {
			write!(f, "<{} chars>", self.0.chars().count())
		}
	}
}

/// Incrementally renders [`VNode`] trees into the child nodes of a specific container element.
///
/// Each pass pairs the next tree with the fiber tree committed by the previous pass,
/// reuses every matched host node and only writes what changed.
///
/// # Correct Use
///
/// The reconciler assumes it owns the content it rendered. Foreign nodes inserted into rendered elements are removed as stale.
/// The container itself is only ever touched to insert, replace or remove the root element.
/// On a first pass, only a container child carrying the next root's identity attribute is adopted.
pub struct Reconciler<H: Host, B = ()> {
	host: H,
	container: H::Node,
	bridge: B,
	options: Options,
	builder: FiberBuilder,
	previous: Option<FiberTree<H::Node>>,
	portals: PortalManager<H::Node>,
	updates: UpdateQueue,
	stats: PassStats,
}

impl<H: Host, B> Debug for Reconciler<H, B> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Reconciler")
			.field("container", &self.container)
			.field("options", &self.options)
			.field("previous", &self.previous.as_ref().map(FiberTree::len))
			.field("portals", &self.portals.len())
			.field("stats", &self.stats)
			.finish_non_exhaustive()
	}
}

impl<H: Host> Reconciler<H> {
	/// A reconciler without components: every `stype` is treated as an already-expanded template.
	#[must_use]
	pub fn new(host: H, container: H::Node) -> Self {
		Self::with_bridge(host, container, ())
	}
}

impl<H: Host, B: ComponentBridge<H::Node>> Reconciler<H, B> {
	#[must_use]
	pub fn with_bridge(host: H, container: H::Node, bridge: B) -> Self {
		let options = Options::default();
		Self {
			host,
			container,
			bridge,
			portals: PortalManager::new(options.portal_tag.clone()),
			options,
			builder: FiberBuilder::new(),
			previous: None,
			updates: UpdateQueue::new(),
			stats: PassStats::default(),
		}
	}

	/// Replaces the [`Options`]. The portal wrapper tag only applies to portals created afterwards.
	#[must_use]
	pub fn with_options(mut self, options: Options) -> Self {
		self.portals = PortalManager::new(options.portal_tag.clone());
		self.options = options;
		self
	}

	pub fn host(&self) -> &H {
		&self.host
	}

	pub fn container(&self) -> &H::Node {
		&self.container
	}

	pub fn bridge(&self) -> &B {
		&self.bridge
	}

	pub fn bridge_mut(&mut self) -> &mut B {
		&mut self.bridge
	}

	pub fn options(&self) -> &Options {
		&self.options
	}

	/// The fiber tree committed by the last pass.
	pub fn previous(&self) -> Option<&FiberTree<H::Node>> {
		self.previous.as_ref()
	}

	pub fn portals(&self) -> &PortalManager<H::Node> {
		&self.portals
	}

	/// A handle to the queue through which components request updates. Clones share the queue.
	pub fn update_queue(&self) -> UpdateQueue {
		self.updates.clone()
	}

	/// Update requests that arrived since the last pass started, for the caller to schedule the next pass with.
	pub fn take_deferred_updates(&mut self) -> Vec<DeferredUpdate> {
		self.updates.drain()
	}

	/// The root element rendered by the last pass.
	pub fn root_element(&self) -> Option<&H::Node> {
		let previous = self.previous.as_ref()?;
		previous[previous.root()?].dom_element.as_ref()
	}

	/// [`Reconciler::reconcile_with`] without completion callback.
	pub fn reconcile(&mut self, next: Rc<VNode>, model: &Value, runtime: Option<&Value>) -> PassStats {
		self.reconcile_with(next, model, runtime, |_| ())
	}

	/// Runs one full pass from the last committed tree to `next`.
	///
	/// Nothing happens if the root identity (the root's `sid`, else the model's `"sid"`) is empty.
	/// Otherwise `on_complete` is called once the commit and the portal cleanup are done.
	///
	/// Errors never escape a pass. They are logged and counted in [`PassStats::errors`].
	#[instrument(skip_all)]
	pub fn reconcile_with(&mut self, next: Rc<VNode>, model: &Value, runtime: Option<&Value>, on_complete: impl FnOnce(&PassStats)) -> PassStats {
		let root_identity = next.sid().or_else(|| model.get("sid").and_then(Value::as_str)).unwrap_or_default().to_owned();
		if root_identity.is_empty() {
			warn!("Empty root identity. Skipping pass.");
			return PassStats::default();
		}
		let span = info_span!("Reconciling", root = root_identity.as_str());
		let _enter = span.enter();

		let updates = self.updates.clone();
		let folded = updates.drain();
		if !folded.is_empty() {
			trace!("Folding {} deferred update(s) into this pass.", folded.len());
		}
		let _pass = updates.enter_pass();

		self.stats = PassStats::default();
		self.portals.begin_pass();

		if self.previous.is_none() && self.options.hydrate {
			let (host, portals) = (&self.host, &self.portals);
			let key = next.key();
			self.previous = load::load_fiber_tree(host, &self.container, |node| {
				let adoptable = match key {
					Some(Key::Sid(sid)) => host.get_attribute(node, attr_names::SID).as_deref() == Some(sid),
					Some(Key::Decorator(sid)) => host.get_attribute(node, attr_names::DECORATOR_SID).as_deref() == Some(sid),
					None => false,
				};
				!adoptable || portals.is_portal_host(node) || host.get_attribute(node, attr_names::PORTAL).is_some()
			});
		}
		let previous = self.previous.take();

		let bridge = &self.bridge;
		let mut tree = self.builder.build(next, previous.as_ref(), &|stype| bridge.resolve(stype));
		self.stats.fibers = tree.len();

		let cx = RenderContext {
			model,
			runtime,
			updates: &updates,
		};
		if let Some(root) = tree.root() {
			let container = self.container.clone();
			let element = self.commit(&mut tree, root, previous.as_ref(), &container, &cx, self.options.depth_limit);
			self.settle_root(&tree, root, previous.as_ref(), element.as_ref(), &cx);
		}

		self.stats.portals_detached = self.portals.finish_pass(&self.host).len();
		self.previous = Some(tree);

		info!("Pass stats: {:?}", self.stats);
		info!("Scratch capacity (sibling keys): {}", self.builder.scratch_capacity());
		if STATIC_MAX_LEVEL >= Level::WARN && self.builder.scratch_capacity() >= 1000 {
			warn!(
				"The sibling key scratch capacity is large ({}).\n\
				This may point to very wide unbatched sibling lists.",
				self.builder.scratch_capacity()
			);
		}

		on_complete(&self.stats);
		self.stats
	}

	/// Swaps the root element into the container and retires the previous root.
	fn settle_root(&mut self, tree: &FiberTree<H::Node>, root: FiberId, previous: Option<&FiberTree<H::Node>>, element: Option<&H::Node>, cx: &RenderContext<'_>) {
		if let Some((previous, prev_root)) = previous.and_then(|previous| Some((previous, previous.root()?))) {
			if tree[root].prev != Some(prev_root) {
				self.unmount_subtree(previous, prev_root, cx);
			}
			let prev_fiber = &previous[prev_root];
			if let Some(old) = prev_fiber.dom_element.as_ref().filter(|&old| Some(old) != element) {
				if prev_fiber.kind != FiberKind::Portal && self.host.parent_node(old).as_ref() == Some(&self.container) {
					trace!("Removing previous root element");
					match self.host.remove_child(&self.container, old) {
						Ok(()) => self.stats.removed += 1,
						Err(error) => error!("Failed to remove previous root element: {}", error),
					}
				}
			}
		}

		if let Some(element) = element {
			if tree[root].kind != FiberKind::Portal && self.host.parent_node(element).as_ref() != Some(&self.container) {
				trace!("Attaching root element");
				match self.host.append_child(&self.container, element) {
					Ok(()) => self.stats.placed += 1,
					Err(error) => {
						error!("Failed to attach root element: {}", error);
						self.stats.errors += 1;
					}
				}
			}
		}
	}

	/// Commits the subtree at `id` into `parent` and returns its host node, if any.
	///
	/// Failures are contained here: the fiber falls back to its previous subtree.
	fn commit(&mut self, tree: &mut FiberTree<H::Node>, id: FiberId, previous: Option<&FiberTree<H::Node>>, parent: &H::Node, cx: &RenderContext<'_>, depth: usize) -> Option<H::Node> {
		let span = trace_span!("Committing fiber", index = tree[id].index, kind = ?tree[id].kind, key = ?tree[id].vnode.key());
		let _enter = span.enter();
		tree[id].parent = Some(parent.clone());

		if depth == 0 {
			error!("Depth limit reached. Keeping the previous subtree.");
			self.stats.errors += 1;
			return self.keep_previous(tree, id, previous);
		}

		match self.commit_unit(tree, id, previous, parent, cx, depth) {
			Ok(Some(element)) => Some(element),
			Ok(None) => {
				// The previous host node is about to go away without its children being committed.
				if let Some((previous, prev_id)) = previous.zip(tree[id].prev) {
					for prev_child in previous.children(prev_id) {
						self.unmount_subtree(previous, prev_child, cx);
					}
				}
				None
			}
			Err(error) => {
				error!("Failed to commit fiber: {}. Keeping the previous subtree.", error);
				self.stats.errors += 1;
				self.keep_previous(tree, id, previous)
			}
		}
	}

	fn keep_previous(&mut self, tree: &mut FiberTree<H::Node>, id: FiberId, previous: Option<&FiberTree<H::Node>>) -> Option<H::Node> {
		let (previous, prev_id) = (previous?, tree[id].prev?);
		tree.graft(id, previous, prev_id);
		for grafted in tree.subtree_post_order(id) {
			if let Some(portal_id) = &tree[grafted].portal_id {
				self.portals.visit(portal_id);
			}
		}
		tree[id].dom_element.clone()
	}

	fn commit_unit(
		&mut self,
		tree: &mut FiberTree<H::Node>,
		id: FiberId,
		previous: Option<&FiberTree<H::Node>>,
		parent: &H::Node,
		cx: &RenderContext<'_>,
		depth: usize,
	) -> Result<Option<H::Node>, HostError> {
		let vnode = Rc::clone(&tree[id].vnode);
		let kind = tree[id].kind;
		let prev_fiber = tree[id].prev.zip(previous).map(|(prev_id, previous)| &previous[prev_id]);

		if let Some(prev) = prev_fiber.filter(|prev| prev.kind == FiberKind::Component) {
			if kind != FiberKind::Component || prev.vnode.stype != vnode.stype {
				trace!("Previous component replaced by a different kind");
				self.unmount(&prev.vnode, cx);
			}
		}

		let element = match kind {
			FiberKind::Missing => {
				error!(stype = ?vnode.stype(), "Neither component nor template registered. Skipping.");
				return Ok(None);
			}
			FiberKind::Portal => return self.commit_portal(tree, id, previous, cx, depth),
			FiberKind::Text => {
				let node = self.commit_text(&vnode, prev_fiber)?;
				tree[id].dom_element = Some(node.clone());
				return Ok(Some(node));
			}
			FiberKind::Component => match self.resolve_component(&vnode, prev_fiber, parent, cx)? {
				Some(element) => element,
				None => return Ok(None),
			},
			FiberKind::Element => self.resolve_element(&vnode, prev_fiber)?,
		};
		tree[id].dom_element = Some(element.clone());

		let prev_vnode = prev_fiber.filter(|prev| prev.dom_element.as_ref() == Some(&element)).map(|prev| &*prev.vnode);
		self.update_host(&element, prev_vnode, &vnode)?;
		self.commit_children(tree, id, previous, &element, cx, depth)?;
		Ok(Some(element))
	}

	/// Reuses the matched previous element if its tag agrees, otherwise creates one.
	fn resolve_element(&mut self, vnode: &VNode, prev_fiber: Option<&Fiber<H::Node>>) -> Result<H::Node, HostError> {
		let tag = vnode.tag.as_deref().unwrap_or("div");
		if let Some(element) = prev_fiber.and_then(|prev| prev.dom_element.as_ref()) {
			if self.host.tag_name(element).map_or(false, |existing| existing.eq_ignore_ascii_case(tag)) {
				trace!(tag, "Reusing element");
				self.stats.reused += 1;
				return Ok(element.clone());
			}
		}
		trace!(tag, "Creating element");
		self.stats.created += 1;
		self.host.create_element(tag)
	}

	fn commit_text(&mut self, vnode: &VNode, prev_fiber: Option<&Fiber<H::Node>>) -> Result<H::Node, HostError> {
		let text = vnode.text.as_deref().unwrap_or_default();
		if let Some(prev) = prev_fiber {
			if let Some(node) = prev.dom_element.as_ref().filter(|node| self.host.text_data(node).is_some()) {
				self.stats.reused += 1;
				self.write_text(node, prev.vnode.text.as_deref(), text)?;
				return Ok(node.clone());
			}
		}
		self.stats.created += 1;
		self.host.create_text(text)
	}

	fn write_text(&mut self, node: &H::Node, expected: Option<&str>, text: &str) -> Result<(), HostError> {
		let current = self.host.text_data(node).unwrap_or_default();
		if STATIC_MAX_LEVEL >= Level::WARN {
			if let Some(expected) = expected.filter(|&expected| expected != current) {
				warn!("Unexpected text data: Expected {:?} but found {:?}. Overwriting.", Content(expected), Content(&current));
			}
		}
		if current != text {
			trace!(text = ?Content(text), "Writing text");
			self.host.set_text_data(node, text)?;
			self.stats.text_writes += 1;
		}
		Ok(())
	}

	fn update_host(&mut self, element: &H::Node, prev_vnode: Option<&VNode>, vnode: &VNode) -> Result<(), HostError> {
		let (attributes, style) = vnode.effective_attrs(self.options.identity_attributes);
		let (prev_attributes, prev_style) = prev_vnode.map(|prev| prev.effective_attrs(self.options.identity_attributes)).unwrap_or_default();
		self.stats.attribute_writes += self.host.update_attributes(element, &prev_attributes, &attributes)?;
		self.stats.attribute_writes += self.host.update_styles(element, &prev_style, &style)?;
		Ok(())
	}

	fn resolve_component(&mut self, vnode: &VNode, prev_fiber: Option<&Fiber<H::Node>>, parent: &H::Node, cx: &RenderContext<'_>) -> Result<Option<H::Node>, HostError> {
		let mounted = prev_fiber.filter(|prev| prev.kind == FiberKind::Component && prev.vnode.stype == vnode.stype && prev.dom_element.is_some());
		let mut element = match mounted {
			Some(prev) => match self.bridge.update_component(&prev.vnode, vnode, parent, cx) {
				Ok(()) => {
					self.stats.reused += 1;
					prev.dom_element.clone()
				}
				Err(error) => {
					warn!(sid = ?vnode.sid(), "{}. Remounting.", error);
					self.stats.errors += 1;
					self.unmount(&prev.vnode, cx);
					self.mount(vnode, None, parent, cx)?
				}
			},
			None => self.mount(vnode, prev_fiber, parent, cx)?,
		};

		let live = match (&element, vnode.sid()) {
			(Some(current), Some(sid)) => self.bridge.get_component_instance(sid).and_then(|instance| instance.element).filter(|live| live != current),
			_ => None,
		};
		if let Some(live) = live {
			trace!(sid = ?vnode.sid(), "Resyncing component host element");
			element = Some(live);
		}
		Ok(element)
	}

	/// `adoptable` is offered to components that leave element creation to the reconciler.
	fn mount(&mut self, vnode: &VNode, adoptable: Option<&Fiber<H::Node>>, parent: &H::Node, cx: &RenderContext<'_>) -> Result<Option<H::Node>, HostError> {
		trace!(sid = ?vnode.sid(), stype = ?vnode.stype(), "Mounting component");
		match self.bridge.mount_component(vnode, parent, cx) {
			Ok(Some(element)) => {
				self.stats.created += 1;
				Ok(Some(element))
			}
			Ok(None) => self.resolve_element(vnode, adoptable).map(Some),
			Err(error) => {
				error!(sid = ?vnode.sid(), "{}. Leaving the position empty.", error);
				self.stats.errors += 1;
				Ok(None)
			}
		}
	}

	fn unmount(&mut self, vnode: &VNode, cx: &RenderContext<'_>) {
		trace!(sid = ?vnode.sid(), "Unmounting component");
		if let Err(error) = self.bridge.unmount_component(vnode, cx) {
			error!(sid = ?vnode.sid(), "{}", error);
			self.stats.errors += 1;
		}
	}

	/// Unmounts every mounted component in the previous subtree at `id`, children first.
	fn unmount_subtree(&mut self, previous: &FiberTree<H::Node>, id: FiberId, cx: &RenderContext<'_>) {
		for fiber in previous.subtree_post_order(id) {
			if previous[fiber].kind == FiberKind::Component && previous[fiber].dom_element.is_some() {
				self.unmount(&previous[fiber].vnode, cx);
			}
		}
	}

	fn commit_portal(&mut self, tree: &mut FiberTree<H::Node>, id: FiberId, previous: Option<&FiberTree<H::Node>>, cx: &RenderContext<'_>, depth: usize) -> Result<Option<H::Node>, HostError> {
		let vnode = Rc::clone(&tree[id].vnode);
		let Some(spec) = &vnode.portal else {
			return Ok(None);
		};
		let portal_id = spec.id.clone().filter(|portal_id| !portal_id.is_empty()).unwrap_or_else(|| format!("portal:{}", tree.path(id)));
		tree[id].portal_id = Some(portal_id.clone());

		let Some(target) = self.host.resolve_target(&spec.target) else {
			warn!(target = spec.target.as_str(), portal_id = portal_id.as_str(), "Portal target not found. Skipping.");
			return Ok(None);
		};
		let wrapper = self.portals.ensure_host(&self.host, &portal_id, &target)?;
		tree[id].dom_element = Some(wrapper.clone());
		self.commit_children(tree, id, previous, &wrapper, cx, depth)?;
		Ok(Some(wrapper))
	}

	/// Commits the children of `id` into `element`, then removes stale host children and restores the order.
	fn commit_children(
		&mut self,
		tree: &mut FiberTree<H::Node>,
		id: FiberId,
		previous: Option<&FiberTree<H::Node>>,
		element: &H::Node,
		cx: &RenderContext<'_>,
		depth: usize,
	) -> Result<(), HostError> {
		enum Slot {
			Fiber(FiberId),
			Text { ordinal: usize, text: String },
		}

		let vnode = Rc::clone(&tree[id].vnode);
		let prev_id = tree[id].prev;
		let prev_fiber = prev_id.zip(previous).map(|(prev_id, previous)| &previous[prev_id]);
		let mut desired: Vec<H::Node> = vec![];

		if vnode.is_text_leaf() {
			let text = vnode.text.as_deref().unwrap_or_default();
			let existing = self.host.child_nodes(element).into_iter().find(|child| self.host.text_data(child).is_some());
			let node = match existing {
				Some(node) => {
					let expected = prev_fiber.and_then(|prev| prev.vnode.text.as_deref());
					self.write_text(&node, expected, text)?;
					node
				}
				None => {
					self.stats.created += 1;
					self.host.create_text(text)?
				}
			};
			desired.push(node);
		} else {
			let prev_text_hosts = prev_fiber.map_or(&[][..], |prev| prev.text_hosts.as_slice());

			let mut slots: Vec<(usize, Slot)> = tree.children(id).map(|child| (tree[child].index, Slot::Fiber(child))).collect();
			slots.extend(
				tree[id]
					.primitive_text_children
					.iter()
					.enumerate()
					.map(|(ordinal, (index, text))| (*index, Slot::Text { ordinal, text: text.clone() })),
			);
			slots.sort_by_key(|(index, _)| *index);

			let mut text_hosts = vec![];
			for (_, slot) in slots {
				match slot {
					Slot::Fiber(child) => {
						if let Some(node) = self.commit(tree, child, previous, element, cx, depth - 1) {
							if tree[child].kind != FiberKind::Portal {
								desired.push(node);
							}
						}
					}
					Slot::Text { ordinal, text } => {
						let reusable = prev_text_hosts.get(ordinal).filter(|node| self.host.text_data(node).is_some() && !desired.contains(node)).cloned();
						let node = match reusable {
							Some(node) => {
								let expected = prev_fiber.and_then(|prev| prev.primitive_text_children.get(ordinal)).map(|(_, text)| text.as_str());
								self.write_text(&node, expected, &text)?;
								node
							}
							None => {
								self.stats.created += 1;
								self.host.create_text(&text)?
							}
						};
						text_hosts.push(node.clone());
						desired.push(node);
					}
				}
			}
			tree[id].text_hosts = text_hosts;
		}

		if let (Some(previous), Some(prev_id)) = (previous, prev_id) {
			let claimed: Vec<FiberId> = tree.children(id).filter_map(|child| tree[child].prev).collect();
			for prev_child in previous.children(prev_id) {
				if !claimed.contains(&prev_child) {
					self.unmount_subtree(previous, prev_child, cx);
				}
			}
		}

		self.sync_children(element, &desired)
	}

	/// Removes every child of `parent` not in `desired` (portal wrappers excepted),
	/// then moves the remaining and new ones into `desired` order.
	///
	/// Children along the longest already ordered run are not touched.
	fn sync_children(&mut self, parent: &H::Node, desired: &[H::Node]) -> Result<(), HostError> {
		debug_assert!(
			desired.iter().enumerate().all(|(i, node)| !desired[..i].contains(node)),
			"The same host node was claimed twice among siblings"
		);

		let mut kept = vec![];
		for node in self.host.child_nodes(parent) {
			if desired.contains(&node) {
				kept.push(node);
			} else if self.portals.is_portal_host(&node) {
				trace!("Leaving portal wrapper in place");
			} else {
				trace!("Removing stale child");
				self.host.remove_child(parent, &node)?;
				self.stats.removed += 1;
			}
		}

		let positions: Vec<Option<usize>> = desired.iter().map(|node| kept.iter().position(|kept| kept == node)).collect();
		let stays = longest_ordered_run(&positions);
		let mut reference = None;
		for (node, stays) in desired.iter().zip(stays).rev() {
			if !stays {
				self.host.insert_before(parent, node, reference)?;
				self.stats.placed += 1;
			}
			reference = Some(node);
		}
		Ok(())
	}
}

/// Marks the entries of one longest strictly increasing subsequence of the present `positions`.
fn longest_ordered_run(positions: &[Option<usize>]) -> Vec<bool> {
	// `tails[len]` is the index of the smallest tail of an increasing run of length `len + 1`.
	let mut tails: Vec<usize> = vec![];
	let mut predecessors = vec![None; positions.len()];
	for (i, position) in positions.iter().enumerate() {
		let Some(position) = *position else { continue };
		let len = tails.partition_point(|&tail| positions[tail] < Some(position));
		predecessors[i] = len.checked_sub(1).map(|len| tails[len]);
		if len == tails.len() {
			tails.push(i);
		} else {
			tails[len] = i;
		}
	}

	let mut stays = vec![false; positions.len()];
	let mut next = tails.last().copied();
	while let Some(i) = next {
		stays[i] = true;
		next = predecessors[i];
	}
	stays
}
