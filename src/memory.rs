//! An in-memory [`Host`] document.
//!
//! Useful for rendering outside of a browser and for tests: it counts every mutation,
//! which makes "no-op" passes observable.

use crate::{error::HostError, host::Host};
use core::{
	cell::{Cell, RefCell},
	fmt::{self, Display, Formatter, Write as _},
};
use std::collections::BTreeMap;

/// Handle to a node of a [`MemoryDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl Display for NodeId {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

#[derive(Debug)]
enum Data {
	Element {
		tag: String,
		attributes: BTreeMap<String, String>,
		style: BTreeMap<String, String>,
	},
	Text(String),
}

#[derive(Debug)]
struct NodeData {
	data: Data,
	parent: Option<NodeId>,
	children: Vec<NodeId>,
}

#[derive(Debug, Default)]
pub struct MemoryDocument {
	nodes: RefCell<Vec<NodeData>>,
	mutations: Cell<usize>,
}

impl MemoryDocument {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a detached element without counting a mutation, e.g. for a render container.
	#[must_use]
	pub fn create_root(&self, tag: &str) -> NodeId {
		self.push(Data::Element {
			tag: tag.to_owned(),
			attributes: BTreeMap::new(),
			style: BTreeMap::new(),
		})
	}

	/// The number of mutating [`Host`] calls so far. Node creation is not counted, insertion is.
	#[must_use]
	pub fn mutation_count(&self) -> usize {
		self.mutations.get()
	}

	/// Elements attached below `root` (inclusive) whose attribute `name` equals `value`, in document order.
	#[must_use]
	pub fn query_attribute(&self, root: NodeId, name: &str, value: &str) -> Vec<NodeId> {
		let nodes = self.nodes.borrow();
		let mut found = vec![];
		let mut stack = vec![root];
		while let Some(id) = stack.pop() {
			let node = &nodes[id.0];
			if let Data::Element { attributes, .. } = &node.data {
				if attributes.get(name).map(String::as_str) == Some(value) {
					found.push(id);
				}
			}
			stack.extend(node.children.iter().rev());
		}
		found
	}

	/// Concatenated text of all text nodes below `node`.
	#[must_use]
	pub fn text_content(&self, node: NodeId) -> String {
		let nodes = self.nodes.borrow();
		let mut text = String::new();
		let mut stack = vec![node];
		while let Some(id) = stack.pop() {
			match &nodes[id.0].data {
				Data::Text(data) => text.push_str(data),
				Data::Element { .. } => stack.extend(nodes[id.0].children.iter().rev()),
			}
		}
		text
	}

	/// The inline style property `property` of `element`.
	#[must_use]
	pub fn style(&self, element: NodeId, property: &str) -> Option<String> {
		match &self.nodes.borrow().get(element.0)?.data {
			Data::Element { style, .. } => style.get(property).cloned(),
			Data::Text(_) => None,
		}
	}

	#[must_use]
	pub fn outer_html(&self, node: NodeId) -> String {
		let mut html = String::new();
		self.write_html(&mut html, node);
		html
	}

	#[must_use]
	pub fn inner_html(&self, node: NodeId) -> String {
		let mut html = String::new();
		for child in self.child_nodes(&node) {
			self.write_html(&mut html, child);
		}
		html
	}

	fn write_html(&self, html: &mut String, id: NodeId) {
		let children = {
			let nodes = self.nodes.borrow();
			match &nodes[id.0].data {
				Data::Text(data) => return html.push_str(&escape(data)),
				Data::Element { tag, attributes, style } => {
					html.push('<');
					html.push_str(tag);
					for (name, value) in attributes {
						let _ = write!(html, " {}=\"{}\"", name, escape(value));
					}
					if !style.is_empty() {
						let style = style.iter().map(|(property, value)| format!("{}: {};", property, value)).collect::<Vec<_>>().join(" ");
						let _ = write!(html, " style=\"{}\"", escape(&style));
					}
					html.push('>');
				}
			}
			nodes[id.0].children.clone()
		};
		for child in children {
			self.write_html(html, child);
		}
		if let Some(tag) = self.tag_name(&id) {
			let _ = write!(html, "</{}>", tag);
		}
	}

	fn push(&self, data: Data) -> NodeId {
		let mut nodes = self.nodes.borrow_mut();
		nodes.push(NodeData { data, parent: None, children: vec![] });
		NodeId(nodes.len() - 1)
	}

	fn mutated(&self) {
		self.mutations.set(self.mutations.get() + 1);
	}

	fn check(&self, id: NodeId) -> Result<(), HostError> {
		if id.0 < self.nodes.borrow().len() {
			Ok(())
		} else {
			Err(HostError::NotFound(id.to_string()))
		}
	}

	fn with_element<T>(&self, id: NodeId, f: impl FnOnce(&mut BTreeMap<String, String>, &mut BTreeMap<String, String>) -> T) -> Result<T, HostError> {
		match &mut self.nodes.borrow_mut().get_mut(id.0).ok_or_else(|| HostError::NotFound(id.to_string()))?.data {
			Data::Element { attributes, style, .. } => Ok(f(attributes, style)),
			Data::Text(_) => Err(HostError::NotAnElement(id.to_string())),
		}
	}

	fn detach(nodes: &mut [NodeData], child: NodeId) {
		if let Some(parent) = nodes[child.0].parent.take() {
			nodes[parent.0].children.retain(|&sibling| sibling != child);
		}
	}
}

fn escape(text: &str) -> String {
	text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

impl Host for MemoryDocument {
	type Node = NodeId;

	fn create_element(&self, tag: &str) -> Result<NodeId, HostError> {
		Ok(self.create_root(tag))
	}

	fn create_text(&self, data: &str) -> Result<NodeId, HostError> {
		Ok(self.push(Data::Text(data.to_owned())))
	}

	fn tag_name(&self, node: &NodeId) -> Option<String> {
		match &self.nodes.borrow().get(node.0)?.data {
			Data::Element { tag, .. } => Some(tag.clone()),
			Data::Text(_) => None,
		}
	}

	fn text_data(&self, node: &NodeId) -> Option<String> {
		match &self.nodes.borrow().get(node.0)?.data {
			Data::Text(data) => Some(data.clone()),
			Data::Element { .. } => None,
		}
	}

	fn set_text_data(&self, node: &NodeId, data: &str) -> Result<(), HostError> {
		match &mut self.nodes.borrow_mut().get_mut(node.0).ok_or_else(|| HostError::NotFound(node.to_string()))?.data {
			Data::Text(text) => *text = data.to_owned(),
			Data::Element { .. } => return Err(HostError::NotFound(format!("text node {}", node))),
		}
		self.mutated();
		Ok(())
	}

	fn get_attribute(&self, element: &NodeId, name: &str) -> Option<String> {
		self.with_element(*element, |attributes, _| attributes.get(name).cloned()).ok().flatten()
	}

	fn attribute_names(&self, element: &NodeId) -> Vec<String> {
		self.with_element(*element, |attributes, _| attributes.keys().cloned().collect()).unwrap_or_default()
	}

	fn set_attribute(&self, element: &NodeId, name: &str, value: &str) -> Result<(), HostError> {
		self.with_element(*element, |attributes, _| attributes.insert(name.to_owned(), value.to_owned()))?;
		self.mutated();
		Ok(())
	}

	fn remove_attribute(&self, element: &NodeId, name: &str) -> Result<(), HostError> {
		self.with_element(*element, |attributes, _| attributes.remove(name))?;
		self.mutated();
		Ok(())
	}

	fn set_style(&self, element: &NodeId, property: &str, value: &str) -> Result<(), HostError> {
		self.with_element(*element, |_, style| style.insert(property.to_owned(), value.to_owned()))?;
		self.mutated();
		Ok(())
	}

	fn remove_style(&self, element: &NodeId, property: &str) -> Result<(), HostError> {
		self.with_element(*element, |_, style| style.remove(property))?;
		self.mutated();
		Ok(())
	}

	fn child_nodes(&self, node: &NodeId) -> Vec<NodeId> {
		self.nodes.borrow().get(node.0).map(|node| node.children.clone()).unwrap_or_default()
	}

	fn parent_node(&self, node: &NodeId) -> Option<NodeId> {
		self.nodes.borrow().get(node.0)?.parent
	}

	fn insert_before(&self, parent: &NodeId, child: &NodeId, reference: Option<&NodeId>) -> Result<(), HostError> {
		self.check(*parent)?;
		self.check(*child)?;
		if parent == child || reference == Some(child) {
			return Err(HostError::NotAChild {
				parent: parent.to_string(),
				child: child.to_string(),
			});
		}
		{
			let mut nodes = self.nodes.borrow_mut();
			if let Data::Text(_) = nodes[parent.0].data {
				return Err(HostError::NotAnElement(parent.to_string()));
			}
			if let Some(reference) = reference {
				if nodes.get(reference.0).and_then(|node| node.parent) != Some(*parent) {
					return Err(HostError::NotAChild {
						parent: parent.to_string(),
						child: reference.to_string(),
					});
				}
			}
			Self::detach(&mut nodes, *child);
			let position = match reference {
				Some(reference) => nodes[parent.0].children.iter().position(|sibling| sibling == reference).unwrap_or(nodes[parent.0].children.len()),
				None => nodes[parent.0].children.len(),
			};
			nodes[parent.0].children.insert(position, *child);
			nodes[child.0].parent = Some(*parent);
		}
		self.mutated();
		Ok(())
	}

	fn remove_child(&self, parent: &NodeId, child: &NodeId) -> Result<(), HostError> {
		{
			let mut nodes = self.nodes.borrow_mut();
			if nodes.get(child.0).and_then(|node| node.parent) != Some(*parent) {
				return Err(HostError::NotAChild {
					parent: parent.to_string(),
					child: child.to_string(),
				});
			}
			Self::detach(&mut nodes, *child);
		}
		self.mutated();
		Ok(())
	}

	/// Supports `#id` and bare tag names. The first attached or detached match in creation order wins.
	fn resolve_target(&self, selector: &str) -> Option<NodeId> {
		let nodes = self.nodes.borrow();
		let found = nodes.iter().position(|node| match (&node.data, selector.strip_prefix('#')) {
			(Data::Element { attributes, .. }, Some(id)) => attributes.get("id").map(String::as_str) == Some(id),
			(Data::Element { tag, .. }, None) => tag.eq_ignore_ascii_case(selector),
			(Data::Text(_), _) => false,
		});
		found.map(NodeId)
	}
}
