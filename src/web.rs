//! [`Host`] implementation over a live browser [`web_sys::Document`].

use crate::{error::HostError, host::Host};
use tracing::error;
use wasm_bindgen::{JsCast, JsValue};

fn js(error: JsValue) -> HostError {
	HostError::Js(format!("{:?}", error))
}

/// Drives a [`web_sys::Document`]. Nodes are [`web_sys::Node`] handles, compared by identity.
#[derive(Debug, Clone)]
pub struct WebHost {
	document: web_sys::Document,
}

impl WebHost {
	#[must_use]
	pub fn new(document: web_sys::Document) -> Self {
		Self { document }
	}

	/// The document of the global `window`, if there is one.
	#[must_use]
	pub fn from_window() -> Option<Self> {
		web_sys::window().and_then(|window| window.document()).map(Self::new)
	}

	#[must_use]
	pub fn document(&self) -> &web_sys::Document {
		&self.document
	}

	fn element<'a>(node: &'a web_sys::Node) -> Result<&'a web_sys::Element, HostError> {
		node.dyn_ref::<web_sys::Element>().ok_or_else(|| HostError::NotAnElement(format!("{:?}", node)))
	}

	fn style(node: &web_sys::Node) -> Result<web_sys::CssStyleDeclaration, HostError> {
		match node.dyn_ref::<web_sys::HtmlElement>() {
			Some(html_element) => Ok(html_element.style()),
			None => Err(HostError::NotAnElement(format!("{:?}", node))),
		}
	}
}

impl Host for WebHost {
	type Node = web_sys::Node;

	fn create_element(&self, tag: &str) -> Result<Self::Node, HostError> {
		self.document.create_element(tag).map(Into::into).map_err(js)
	}

	fn create_text(&self, data: &str) -> Result<Self::Node, HostError> {
		Ok(self.document.create_text_node(data).into())
	}

	fn tag_name(&self, node: &Self::Node) -> Option<String> {
		node.dyn_ref::<web_sys::Element>().map(|element| element.tag_name().to_ascii_lowercase())
	}

	fn text_data(&self, node: &Self::Node) -> Option<String> {
		node.dyn_ref::<web_sys::Text>().map(|text| text.data())
	}

	fn set_text_data(&self, node: &Self::Node, data: &str) -> Result<(), HostError> {
		match node.dyn_ref::<web_sys::Text>() {
			Some(text) => {
				text.set_data(data);
				Ok(())
			}
			None => Err(HostError::Js(format!("Expected `web_sys::Text` but found {:?}", node))),
		}
	}

	fn get_attribute(&self, element: &Self::Node, name: &str) -> Option<String> {
		element.dyn_ref::<web_sys::Element>()?.get_attribute(name)
	}

	fn attribute_names(&self, element: &Self::Node) -> Vec<String> {
		let Some(element) = element.dyn_ref::<web_sys::Element>() else {
			return vec![];
		};
		let attributes = element.attributes();
		(0..attributes.length()).filter_map(|i| attributes.item(i)).map(|attribute| attribute.name()).collect()
	}

	fn set_attribute(&self, element: &Self::Node, name: &str, value: &str) -> Result<(), HostError> {
		Self::element(element)?.set_attribute(name, value).map_err(js)
	}

	fn remove_attribute(&self, element: &Self::Node, name: &str) -> Result<(), HostError> {
		Self::element(element)?.remove_attribute(name).map_err(js)
	}

	fn set_style(&self, element: &Self::Node, property: &str, value: &str) -> Result<(), HostError> {
		Self::style(element)?.set_property(property, value).map_err(js)
	}

	fn remove_style(&self, element: &Self::Node, property: &str) -> Result<(), HostError> {
		Self::style(element)?.remove_property(property).map(drop).map_err(js)
	}

	fn child_nodes(&self, node: &Self::Node) -> Vec<Self::Node> {
		let child_nodes = node.child_nodes();
		(0..child_nodes.length()).filter_map(|i| child_nodes.get(i)).collect()
	}

	fn parent_node(&self, node: &Self::Node) -> Option<Self::Node> {
		node.parent_node()
	}

	fn insert_before(&self, parent: &Self::Node, child: &Self::Node, reference: Option<&Self::Node>) -> Result<(), HostError> {
		parent.insert_before(child, reference).map(drop).map_err(js)
	}

	fn remove_child(&self, parent: &Self::Node, child: &Self::Node) -> Result<(), HostError> {
		if child.parent_node().as_ref() != Some(parent) {
			return Err(HostError::NotAChild {
				parent: format!("{:?}", parent),
				child: format!("{:?}", child),
			});
		}
		parent.remove_child(child).map(drop).map_err(js)
	}

	fn resolve_target(&self, selector: &str) -> Option<Self::Node> {
		match self.document.query_selector(selector) {
			Ok(element) => element.map(Into::into),
			Err(error) => {
				error!(selector, "Invalid portal target selector: {:?}", error);
				None
			}
		}
	}
}
