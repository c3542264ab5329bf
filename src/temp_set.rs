use hashbrown::HashSet;

/// A reusable scratch set of sibling keys.
///
/// Sibling lists are checked one at a time, so one allocation can serve a whole pass.
#[derive(Debug, Default)]
pub struct TempKeySet(HashSet<String>);
impl TempKeySet {
	#[must_use]
	pub fn new() -> Self {
		Self(HashSet::new())
	}

	/// The set is cleared before each borrow, so no values can leak between sibling lists.
	pub fn temp(&mut self) -> &mut HashSet<String> {
		self.0.clear();
		&mut self.0
	}

	/// Retrieves the set's capacity without clearing it first.
	#[must_use]
	pub fn capacity(&self) -> usize {
		self.0.capacity()
	}
}
