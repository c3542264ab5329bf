//! Reads existing host content back into [`VNode`]s, so that a first pass can adopt it.
//!
//! Identity attributes become keys again. Inline styles are not read back,
//! so a first pass rewrites the style properties its [`VNode`]s declare.

use crate::{
	fiber::{Fiber, FiberId, FiberKind, FiberTree},
	host::Host,
	vnode::{attr_names, AttrValue, Attrs, DecoratorCategory, DecoratorIdentity, DecoratorPosition, VChild, VNode},
};
use std::rc::Rc;
use tracing::{instrument, trace};

fn is_identity_attribute(name: &str) -> bool {
	matches!(
		name,
		attr_names::SID | attr_names::STYPE | attr_names::DECORATOR_SID | attr_names::DECORATOR_STYPE | attr_names::DECORATOR_CATEGORY | attr_names::DECORATOR_POSITION
	)
}

#[must_use]
pub fn load_child_nodes<H: Host>(host: &H, node: &H::Node) -> Vec<VChild> {
	host.child_nodes(node)
		.iter()
		.map(|child| match host.text_data(child) {
			Some(text) => VChild::Text(text),
			None => VChild::Node(Rc::new(load_element(host, child))),
		})
		.collect()
}

/// Loads `element` without its children.
#[must_use]
pub fn load_element_shallow<H: Host>(host: &H, element: &H::Node) -> VNode {
	let attribute = |name: &str| host.get_attribute(element, name).filter(|value| !value.is_empty());

	VNode {
		tag: host.tag_name(element),
		attrs: load_attributes(host, element),
		sid: attribute(attr_names::SID),
		stype: attribute(attr_names::STYPE),
		decorator: attribute(attr_names::DECORATOR_SID).map(|sid| DecoratorIdentity {
			sid,
			stype: attribute(attr_names::DECORATOR_STYPE).unwrap_or_default(),
			category: attribute(attr_names::DECORATOR_CATEGORY).and_then(|category| DecoratorCategory::parse(&category)).unwrap_or(DecoratorCategory::Inline),
			position: attribute(attr_names::DECORATOR_POSITION).and_then(|position| DecoratorPosition::parse(&position)).unwrap_or(DecoratorPosition::Inline),
		}),
		..VNode::default()
	}
}

#[must_use]
pub fn load_element<H: Host>(host: &H, element: &H::Node) -> VNode {
	let mut vnode = load_element_shallow(host, element);
	match single_text_child(host, element) {
		Some(text) => vnode.text = Some(text),
		None => vnode.children = load_child_nodes(host, element),
	}
	vnode
}

/// Plain attributes only. Identity attributes and `style` are left out.
#[must_use]
pub fn load_attributes<H: Host>(host: &H, element: &H::Node) -> Attrs {
	host.attribute_names(element)
		.into_iter()
		.filter(|name| name != "style" && !is_identity_attribute(name))
		.filter_map(|name| {
			let value = host.get_attribute(element, &name)?;
			Some((name, AttrValue::Text(value)))
		})
		.collect()
}

fn single_text_child<H: Host>(host: &H, element: &H::Node) -> Option<String> {
	match host.child_nodes(element).as_slice() {
		[only] => host.text_data(only),
		_ => None,
	}
}

/// Builds a previous [`FiberTree`] from the first element child of `container` that `skip` doesn't reject,
/// with every fiber bound to the host node it was loaded from.
#[instrument(skip_all)]
pub fn load_fiber_tree<H: Host>(host: &H, container: &H::Node, skip: impl Fn(&H::Node) -> bool) -> Option<FiberTree<H::Node>> {
	let root = host.child_nodes(container).into_iter().find(|child| host.tag_name(child).is_some() && !skip(child))?;
	let mut tree = FiberTree::new();
	let (root_id, _) = load_fiber(host, &mut tree, &root, 0);
	tree.set_root(Some(root_id));
	trace!(fibers = tree.len(), "Loaded previous fiber tree from host");
	Some(tree)
}

fn load_fiber<H: Host>(host: &H, tree: &mut FiberTree<H::Node>, node: &H::Node, index: usize) -> (FiberId, Rc<VNode>) {
	if let Some(text) = host.text_data(node) {
		let vnode = Rc::new(VNode::text(text));
		let id = tree.push(Fiber::new(Rc::clone(&vnode), None, FiberKind::Text, None, index));
		tree[id].dom_element = Some(node.clone());
		return (id, vnode);
	}

	let mut vnode = load_element_shallow(host, node);
	let id = tree.push(Fiber::new(Rc::new(VNode::default()), None, FiberKind::Element, None, index));
	tree[id].dom_element = Some(node.clone());

	if let Some(text) = single_text_child(host, node) {
		vnode.text = Some(text);
	} else {
		let mut previous = None;
		for (i, child) in host.child_nodes(node).iter().enumerate() {
			if let Some(text) = host.text_data(child) {
				tree[id].primitive_text_children.push((i, text.clone()));
				tree[id].text_hosts.push(child.clone());
				vnode.children.push(VChild::Text(text));
				continue;
			}
			let (child_id, child_vnode) = load_fiber(host, tree, child, i);
			tree.link_child(id, child_id, previous);
			previous = Some(child_id);
			vnode.children.push(VChild::Node(child_vnode));
		}
	}

	let vnode = Rc::new(vnode);
	tree[id].vnode = Rc::clone(&vnode);
	(id, vnode)
}
