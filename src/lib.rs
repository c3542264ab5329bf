#![doc(html_root_url = "https://docs.rs/fiber-dom/0.1.0")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod component;
pub mod error;
pub mod fiber;
pub mod host;
pub mod load;
pub mod memory;
pub mod model;
pub mod options;
pub mod portal;
mod reconcile;
pub mod split;
mod temp_set;
pub mod vnode;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use component::{ComponentBridge, ComponentInstance, DeferredUpdate, Registration, RenderContext, UpdateQueue};
pub use error::{ComponentError, HostError};
pub use host::Host;
pub use memory::{MemoryDocument, NodeId};
pub use options::Options;
pub use reconcile::{PassStats, Reconciler};
pub use vnode::{portal, AttrValue, DecoratorCategory, DecoratorIdentity, DecoratorPosition, VChild, VNode};
