/// Configuration of a [`Reconciler`](`crate::Reconciler`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
	/// Fibers nested deeper than this are not committed. Their previous state is kept instead.
	pub depth_limit: usize,
	/// Whether `data-sid` and the decorator identity attributes are written to host elements.
	///
	/// [`load`](`crate::load`) relies on them to adopt existing markup.
	pub identity_attributes: bool,
	/// Whether the first pass adopts matching elements already present in the container.
	pub hydrate: bool,
	/// Tag of the wrapper elements inserted into portal targets.
	pub portal_tag: String,
}

impl Default for Options {
	fn default() -> Self {
		Self {
			depth_limit: 512,
			identity_attributes: true,
			hydrate: true,
			portal_tag: "div".to_owned(),
		}
	}
}
