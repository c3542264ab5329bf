//! The document primitives the reconciler drives.
//!
//! All methods take `&self`, like [`web_sys`](https://docs.rs/web-sys) handles do.
//! Implementations that own their nodes use interior mutability.

use crate::{error::HostError, vnode::StyleMap};
use core::fmt::Debug;
use std::{collections::BTreeMap, rc::Rc};
use tracing::trace;

pub trait Host {
	/// A handle to an element or text node. Equality is node identity.
	type Node: Clone + PartialEq + Debug;

	fn create_element(&self, tag: &str) -> Result<Self::Node, HostError>;
	fn create_text(&self, data: &str) -> Result<Self::Node, HostError>;

	/// [`None`] for text nodes.
	fn tag_name(&self, node: &Self::Node) -> Option<String>;
	/// [`Some`] exactly for text nodes.
	fn text_data(&self, node: &Self::Node) -> Option<String>;
	fn set_text_data(&self, node: &Self::Node, data: &str) -> Result<(), HostError>;

	fn get_attribute(&self, element: &Self::Node, name: &str) -> Option<String>;
	fn attribute_names(&self, element: &Self::Node) -> Vec<String>;
	fn set_attribute(&self, element: &Self::Node, name: &str, value: &str) -> Result<(), HostError>;
	fn remove_attribute(&self, element: &Self::Node, name: &str) -> Result<(), HostError>;

	fn set_style(&self, element: &Self::Node, property: &str, value: &str) -> Result<(), HostError>;
	fn remove_style(&self, element: &Self::Node, property: &str) -> Result<(), HostError>;

	fn child_nodes(&self, node: &Self::Node) -> Vec<Self::Node>;
	fn parent_node(&self, node: &Self::Node) -> Option<Self::Node>;

	/// Moves `child` if it already has a parent. Appends if `reference` is [`None`].
	fn insert_before(&self, parent: &Self::Node, child: &Self::Node, reference: Option<&Self::Node>) -> Result<(), HostError>;
	fn remove_child(&self, parent: &Self::Node, child: &Self::Node) -> Result<(), HostError>;

	/// Resolves a portal target, i.e. `"#id"` or a tag name.
	fn resolve_target(&self, selector: &str) -> Option<Self::Node>;

	fn append_child(&self, parent: &Self::Node, child: &Self::Node) -> Result<(), HostError> {
		self.insert_before(parent, child, None)
	}

	/// Sets changed and removes absent attributes. Returns the number of writes.
	fn update_attributes(&self, element: &Self::Node, previous: &BTreeMap<String, String>, next: &BTreeMap<String, String>) -> Result<usize, HostError> {
		let mut writes = 0;
		for name in previous.keys().filter(|name| !next.contains_key(*name)) {
			trace!(name = name.as_str(), "Removing attribute");
			self.remove_attribute(element, name)?;
			writes += 1;
		}
		for (name, value) in next {
			if previous.get(name) != Some(value) {
				trace!(name = name.as_str(), "Setting attribute");
				self.set_attribute(element, name, value)?;
				writes += 1;
			}
		}
		Ok(writes)
	}

	/// Like [`Host::update_attributes`], for inline style properties.
	fn update_styles(&self, element: &Self::Node, previous: &StyleMap, next: &StyleMap) -> Result<usize, HostError> {
		let mut writes = 0;
		for property in previous.keys().filter(|property| !next.contains_key(*property)) {
			self.remove_style(element, property)?;
			writes += 1;
		}
		for (property, value) in next {
			if previous.get(property) != Some(value) {
				self.set_style(element, property, value)?;
				writes += 1;
			}
		}
		Ok(writes)
	}
}

macro_rules! forward_host {
	($($target:ty),*$(,)?) => {$(
		impl<H: Host + ?Sized> Host for $target {
			type Node = H::Node;

			fn create_element(&self, tag: &str) -> Result<Self::Node, HostError> {
				(**self).create_element(tag)
			}
			fn create_text(&self, data: &str) -> Result<Self::Node, HostError> {
				(**self).create_text(data)
			}
			fn tag_name(&self, node: &Self::Node) -> Option<String> {
				(**self).tag_name(node)
			}
			fn text_data(&self, node: &Self::Node) -> Option<String> {
				(**self).text_data(node)
			}
			fn set_text_data(&self, node: &Self::Node, data: &str) -> Result<(), HostError> {
				(**self).set_text_data(node, data)
			}
			fn get_attribute(&self, element: &Self::Node, name: &str) -> Option<String> {
				(**self).get_attribute(element, name)
			}
			fn attribute_names(&self, element: &Self::Node) -> Vec<String> {
				(**self).attribute_names(element)
			}
			fn set_attribute(&self, element: &Self::Node, name: &str, value: &str) -> Result<(), HostError> {
				(**self).set_attribute(element, name, value)
			}
			fn remove_attribute(&self, element: &Self::Node, name: &str) -> Result<(), HostError> {
				(**self).remove_attribute(element, name)
			}
			fn set_style(&self, element: &Self::Node, property: &str, value: &str) -> Result<(), HostError> {
				(**self).set_style(element, property, value)
			}
			fn remove_style(&self, element: &Self::Node, property: &str) -> Result<(), HostError> {
				(**self).remove_style(element, property)
			}
			fn child_nodes(&self, node: &Self::Node) -> Vec<Self::Node> {
				(**self).child_nodes(node)
			}
			fn parent_node(&self, node: &Self::Node) -> Option<Self::Node> {
				(**self).parent_node(node)
			}
			fn insert_before(&self, parent: &Self::Node, child: &Self::Node, reference: Option<&Self::Node>) -> Result<(), HostError> {
				(**self).insert_before(parent, child, reference)
			}
			fn remove_child(&self, parent: &Self::Node, child: &Self::Node) -> Result<(), HostError> {
				(**self).remove_child(parent, child)
			}
			fn resolve_target(&self, selector: &str) -> Option<Self::Node> {
				(**self).resolve_target(selector)
			}
		}
	)*};
}
forward_host!(&H, Rc<H>);
