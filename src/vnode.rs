//! The declarative tree consumed by the [`Reconciler`](`crate::Reconciler`).
//!
//! [`VNode`]s are plain data. They are shared through [`Rc`] so that the fiber tree of one pass
//! can keep referring to them as the *previous* description during the next pass without cloning subtrees.
//!
//! The host binding of a rendered [`VNode`] is not stored on the node itself.
//! It lives on the committed [`Fiber`](`crate::fiber::Fiber`) paired with it, which the next pass reaches through its `prev` link.

use core::fmt::{self, Display, Formatter};
use serde_json::Value;
use std::{collections::BTreeMap, rc::Rc};

/// Inline style properties, by property name.
pub type StyleMap = BTreeMap<String, String>;

/// Attributes by name. Ordered so that attribute writes happen in a deterministic order.
pub type Attrs = BTreeMap<String, AttrValue>;

/// Names of the identity attributes materialized on host elements.
pub mod attr_names {
	pub const SID: &str = "data-sid";
	pub const STYPE: &str = "data-stype";
	pub const DECORATOR_SID: &str = "data-decorator-sid";
	pub const DECORATOR_STYPE: &str = "data-decorator-stype";
	pub const DECORATOR_CATEGORY: &str = "data-decorator-category";
	pub const DECORATOR_POSITION: &str = "data-decorator-position";
	pub const PORTAL: &str = "data-portal";
	pub const MARK: &str = "data-mark";
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
	Text(String),
	/// Present with an empty value if `true`, absent otherwise.
	Flag(bool),
	/// Applied as inline style properties rather than as an attribute.
	Style(StyleMap),
}

impl From<&str> for AttrValue {
	fn from(text: &str) -> Self {
		Self::Text(text.to_owned())
	}
}

impl From<String> for AttrValue {
	fn from(text: String) -> Self {
		Self::Text(text)
	}
}

impl From<bool> for AttrValue {
	fn from(flag: bool) -> Self {
		Self::Flag(flag)
	}
}

impl From<StyleMap> for AttrValue {
	fn from(style: StyleMap) -> Self {
		Self::Style(style)
	}
}

/// One entry of [`VNode::children`].
#[derive(Debug, Clone, PartialEq)]
pub enum VChild {
	Node(Rc<VNode>),
	/// A raw text run interleaved with element children. Doesn't get its own fiber.
	Text(String),
}

impl From<VNode> for VChild {
	fn from(node: VNode) -> Self {
		Self::Node(Rc::new(node))
	}
}

impl From<Rc<VNode>> for VChild {
	fn from(node: Rc<VNode>) -> Self {
		Self::Node(node)
	}
}

impl From<&str> for VChild {
	fn from(text: &str) -> Self {
		Self::Text(text.to_owned())
	}
}

impl From<String> for VChild {
	fn from(text: String) -> Self {
		Self::Text(text)
	}
}

macro_rules! numeric_children {
	($($ty:ty),*$(,)?) => {$(
		impl From<$ty> for VChild {
			fn from(number: $ty) -> Self {
				Self::Text(number.to_string())
			}
		}
	)*};
}
numeric_children!(i32, i64, u32, u64, usize, f32, f64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecoratorCategory {
	/// Splits the target's text.
	Inline,
	/// Rendered as a sibling of the target node.
	Block,
	/// Rendered out of flow, into a layer target.
	Layer,
}

impl DecoratorCategory {
	#[must_use]
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Inline => "inline",
			Self::Block => "block",
			Self::Layer => "layer",
		}
	}

	#[must_use]
	pub fn parse(name: &str) -> Option<Self> {
		Some(match name {
			"inline" => Self::Inline,
			"block" => Self::Block,
			"layer" => Self::Layer,
			_ => return None,
		})
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecoratorPosition {
	Before,
	After,
	Inline,
}

impl DecoratorPosition {
	#[must_use]
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Before => "before",
			Self::After => "after",
			Self::Inline => "inline",
		}
	}

	#[must_use]
	pub fn parse(name: &str) -> Option<Self> {
		Some(match name {
			"before" => Self::Before,
			"after" => Self::After,
			"inline" => Self::Inline,
			_ => return None,
		})
	}
}

/// Identity of a decorator- or mark-injected node, independent of [`VNode::sid`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoratorIdentity {
	pub sid: String,
	pub stype: String,
	pub category: DecoratorCategory,
	pub position: DecoratorPosition,
}

/// Marks a [`VNode`] as rendering its children into a foreign host element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalSpec {
	/// Resolved through [`Host::resolve_target`](`crate::host::Host::resolve_target`).
	pub target: String,
	pub id: Option<String>,
}

/// Declarative description of one rendered position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VNode {
	pub tag: Option<String>,
	pub text: Option<String>,
	pub children: Vec<VChild>,
	pub attrs: Attrs,
	pub sid: Option<String>,
	pub stype: Option<String>,
	pub decorator: Option<DecoratorIdentity>,
	pub portal: Option<PortalSpec>,
	pub model: Option<Value>,
	pub props: Option<Value>,
}

/// Sibling-scoped identity of a [`VNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key<'a> {
	Sid(&'a str),
	Decorator(&'a str),
}

impl Display for Key<'_> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Key::Sid(sid) => write!(f, "sid {:?}", sid),
			Key::Decorator(sid) => write!(f, "decorator sid {:?}", sid),
		}
	}
}

/// What structural matching compares for nodes without a [`Key`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Signature<'a> {
	pub tag: Option<&'a str>,
	pub class: Option<&'a str>,
	pub style: Option<&'a StyleMap>,
	pub portal: Option<&'a str>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
	value.as_deref().filter(|value| !value.is_empty())
}

impl VNode {
	#[must_use]
	pub fn element(tag: impl Into<String>) -> Self {
		Self {
			tag: Some(tag.into()),
			..Self::default()
		}
	}

	/// A tagless text leaf, rendered as a bare text node.
	#[must_use]
	pub fn text(text: impl Into<String>) -> Self {
		Self {
			text: Some(text.into()),
			..Self::default()
		}
	}

	#[must_use]
	pub fn with_sid(mut self, sid: impl Into<String>) -> Self {
		self.sid = Some(sid.into());
		self
	}

	#[must_use]
	pub fn with_stype(mut self, stype: impl Into<String>) -> Self {
		self.stype = Some(stype.into());
		self
	}

	#[must_use]
	pub fn with_text(mut self, text: impl Into<String>) -> Self {
		self.text = Some(text.into());
		self
	}

	#[must_use]
	pub fn with_decorator(mut self, decorator: DecoratorIdentity) -> Self {
		self.decorator = Some(decorator);
		self
	}

	/// Sets [`VNode::model`] and derives [`VNode::props`] from it through [`sanitize_props`](`crate::model::sanitize_props`).
	#[must_use]
	pub fn with_model(mut self, model: Value) -> Self {
		self.props = Some(crate::model::sanitize_props(&model));
		self.model = Some(model);
		self
	}

	#[must_use]
	pub fn attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
		self.attrs.insert(name.into(), value.into());
		self
	}

	#[must_use]
	pub fn class(self, class: impl Into<String>) -> Self {
		self.attr("class", class.into())
	}

	/// Adds one property to the `"style"` style map.
	#[must_use]
	pub fn style(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
		match self.attrs.entry("style".to_owned()).or_insert_with(|| AttrValue::Style(StyleMap::new())) {
			AttrValue::Style(style) => {
				style.insert(property.into(), value.into());
			}
			other => *other = AttrValue::Style(BTreeMap::from([(property.into(), value.into())])),
		}
		self
	}

	#[must_use]
	pub fn child(mut self, child: impl Into<VChild>) -> Self {
		self.children.push(child.into());
		self
	}

	#[must_use]
	pub fn children<C: Into<VChild>>(mut self, children: impl IntoIterator<Item = C>) -> Self {
		self.children.extend(children.into_iter().map(Into::into));
		self
	}

	/// `text` without non-empty `children`. Children take priority if both are present.
	#[must_use]
	pub fn is_text_leaf(&self) -> bool {
		self.text.is_some() && self.children.is_empty()
	}

	/// The sibling-scoped identity of this node. A decorator identity shadows [`VNode::sid`].
	#[must_use]
	pub fn key(&self) -> Option<Key<'_>> {
		if let Some(decorator) = self.decorator.as_ref().filter(|decorator| !decorator.sid.is_empty()) {
			return Some(Key::Decorator(&decorator.sid));
		}
		non_empty(&self.sid).map(Key::Sid)
	}

	#[must_use]
	pub fn sid(&self) -> Option<&str> {
		non_empty(&self.sid)
	}

	#[must_use]
	pub fn stype(&self) -> Option<&str> {
		non_empty(&self.stype)
	}

	#[must_use]
	pub fn signature(&self) -> Signature<'_> {
		Signature {
			tag: self.tag.as_deref(),
			class: match self.attrs.get("class") {
				Some(AttrValue::Text(class)) => Some(class),
				_ => None,
			},
			style: match self.attrs.get("style") {
				Some(AttrValue::Style(style)) => Some(style),
				_ => None,
			},
			portal: self.portal.as_ref().and_then(|portal| portal.id.as_deref()),
		}
	}

	/// Splits [`VNode::attrs`] into plain attributes and the merged style map,
	/// adding the identity attributes if `identity_attributes` is set.
	#[must_use]
	pub fn effective_attrs(&self, identity_attributes: bool) -> (BTreeMap<String, String>, StyleMap) {
		let mut attributes = BTreeMap::new();
		let mut style = StyleMap::new();
		for (name, value) in &self.attrs {
			match value {
				AttrValue::Text(text) => {
					attributes.insert(name.clone(), text.clone());
				}
				AttrValue::Flag(true) => {
					attributes.insert(name.clone(), String::new());
				}
				AttrValue::Flag(false) => (),
				AttrValue::Style(properties) => style.extend(properties.iter().map(|(k, v)| (k.clone(), v.clone()))),
			}
		}

		if identity_attributes {
			if let Some(decorator) = &self.decorator {
				attributes.insert(attr_names::DECORATOR_SID.to_owned(), decorator.sid.clone());
				attributes.insert(attr_names::DECORATOR_STYPE.to_owned(), decorator.stype.clone());
				attributes.insert(attr_names::DECORATOR_CATEGORY.to_owned(), decorator.category.as_str().to_owned());
				attributes.insert(attr_names::DECORATOR_POSITION.to_owned(), decorator.position.as_str().to_owned());
			} else {
				if let Some(sid) = self.sid() {
					attributes.insert(attr_names::SID.to_owned(), sid.to_owned());
				}
				if let Some(stype) = self.stype() {
					attributes.insert(attr_names::STYPE.to_owned(), stype.to_owned());
				}
			}
		}

		(attributes, style)
	}
}

/// Builds a [`VNode`] that renders `content` into the host element resolved from `target`,
/// outside of its logical parent.
///
/// Without an `id`, the portal is keyed by its position in the fiber tree.
#[must_use]
pub fn portal(target: impl Into<String>, content: impl Into<VChild>, id: Option<&str>) -> VNode {
	VNode {
		portal: Some(PortalSpec {
			target: target.into(),
			id: id.map(ToOwned::to_owned),
		}),
		children: vec![content.into()],
		..VNode::default()
	}
}
