//! Splits literal text into runs under overlapping marks and around decorator insertion points.
//!
//! Offsets count `char`s, end offsets are exclusive: `[0, 16)` of `"yellow background"` is `"yellow backgroun"`.
//! Malformed ranges are clamped into the text rather than rejected.

use crate::vnode::{attr_names, portal, Attrs, DecoratorCategory, DecoratorIdentity, DecoratorPosition, VChild, VNode};
use std::collections::BTreeSet;
use tracing::{trace, warn};

/// A character-range-scoped text styling annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkRange {
	pub kind: String,
	pub start: usize,
	pub end: usize,
	pub attrs: Attrs,
}

impl MarkRange {
	#[must_use]
	pub fn new(kind: impl Into<String>, start: usize, end: usize) -> Self {
		Self {
			kind: kind.into(),
			start,
			end,
			attrs: Attrs::new(),
		}
	}
}

/// A node injected relative to a target's text range.
#[derive(Debug, Clone, PartialEq)]
pub struct Decorator {
	pub sid: String,
	pub stype: String,
	/// `sid` of the decorated node.
	pub target: String,
	pub start: usize,
	pub end: usize,
	pub position: DecoratorPosition,
	pub category: DecoratorCategory,
	pub tag: String,
	pub attrs: Attrs,
	/// Children of `Before`/`After` decorators. `Inline` wrappers contain the runs of their range instead.
	pub content: Vec<VChild>,
}

impl Decorator {
	#[must_use]
	pub fn new(sid: impl Into<String>, stype: impl Into<String>, target: impl Into<String>, category: DecoratorCategory, position: DecoratorPosition) -> Self {
		Self {
			sid: sid.into(),
			stype: stype.into(),
			target: target.into(),
			start: 0,
			end: 0,
			position,
			category,
			tag: match category {
				DecoratorCategory::Inline => "span",
				DecoratorCategory::Block | DecoratorCategory::Layer => "div",
			}
			.to_owned(),
			attrs: Attrs::new(),
			content: vec![],
		}
	}

	#[must_use]
	pub fn range(mut self, start: usize, end: usize) -> Self {
		self.start = start;
		self.end = end;
		self
	}

	#[must_use]
	pub fn content(mut self, content: impl Into<VChild>) -> Self {
		self.content.push(content.into());
		self
	}

	#[must_use]
	pub fn identity(&self) -> DecoratorIdentity {
		DecoratorIdentity {
			sid: self.sid.clone(),
			stype: self.stype.clone(),
			category: self.category,
			position: self.position,
		}
	}

	/// The decorator node with its own content.
	#[must_use]
	pub fn to_vnode(&self) -> VNode {
		self.wrap(self.content.clone())
	}

	fn wrap(&self, children: Vec<VChild>) -> VNode {
		VNode {
			attrs: self.attrs.clone(),
			children,
			..VNode::element(self.tag.clone()).with_decorator(self.identity())
		}
	}
}

/// A slice of text between two consecutive boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
	pub start: usize,
	pub end: usize,
	pub text: String,
	/// Indices into the `marks` the run was split with, active at `start`, in declaration order.
	pub marks: Vec<usize>,
}

fn clamp(start: usize, end: usize, len: usize) -> (usize, usize) {
	let start = start.min(len);
	(start, end.min(len).max(start))
}

/// Slices `text` at every mark boundary and every offset in `cut_points`.
///
/// Concatenating the returned runs always yields `text`. Empty text yields no runs.
#[must_use]
pub fn split_runs(text: &str, marks: &[MarkRange], cut_points: &[usize]) -> Vec<Run> {
	let offsets: Vec<usize> = text.char_indices().map(|(offset, _)| offset).chain(Some(text.len())).collect();
	let len = offsets.len() - 1;
	if len == 0 {
		return vec![];
	}

	let marks: Vec<(usize, usize)> = marks
		.iter()
		.map(|mark| {
			if mark.end < mark.start || mark.end > len {
				warn!(kind = mark.kind.as_str(), start = mark.start, end = mark.end, len, "Clamping malformed mark range");
			}
			clamp(mark.start, mark.end, len)
		})
		.collect();

	let mut boundaries = BTreeSet::from([0, len]);
	boundaries.extend(marks.iter().filter(|(start, end)| start < end).flat_map(|&(start, end)| [start, end]));
	boundaries.extend(cut_points.iter().map(|&cut| cut.min(len)));

	let boundaries: Vec<usize> = boundaries.into_iter().collect();
	boundaries
		.windows(2)
		.map(|window| {
			let (start, end) = (window[0], window[1]);
			Run {
				start,
				end,
				text: text[offsets[start]..offsets[end]].to_owned(),
				marks: marks.iter().enumerate().filter(|(_, &(mark_start, mark_end))| mark_start <= start && start < mark_end).map(|(i, _)| i).collect(),
			}
		})
		.collect()
}

/// Wraps `run` in one `span` per active mark, the first declared mark outermost.
fn wrap_marks(run: &Run, marks: &[MarkRange]) -> VChild {
	let mut wrapped: Option<VNode> = None;
	for &i in run.marks.iter().rev() {
		let mark = &marks[i];
		let wrapper = VNode {
			attrs: mark.attrs.clone(),
			..VNode::element("span")
		}
		.class(format!("mark-{}", mark.kind))
		.attr(attr_names::MARK, mark.kind.as_str());
		wrapped = Some(match wrapped {
			None => wrapper.with_text(run.text.clone()),
			Some(inner) => wrapper.child(inner),
		});
	}
	match wrapped {
		Some(wrapped) => wrapped.into(),
		None => VChild::Text(run.text.clone()),
	}
}

/// Splits `text` under `marks` and places the inline-category `decorators` around and over the runs.
///
/// - `Before` decorators go right before the run starting at their `start`,
/// - `After` decorators right after the run ending at their `end`. At a shared boundary, `After`s come first.
/// - `Inline`-position decorators wrap the runs of their range. If these overlap, the first declared one wins.
///
/// Block and layer decorators are ignored here, see [`place_block_decorators`].
#[must_use]
pub fn split_text(text: &str, marks: &[MarkRange], decorators: &[Decorator]) -> Vec<VChild> {
	let len = text.chars().count();
	let decorators: Vec<(&Decorator, usize, usize)> = decorators
		.iter()
		.filter(|decorator| decorator.category == DecoratorCategory::Inline)
		.map(|decorator| {
			let (start, end) = clamp(decorator.start, decorator.end, len);
			(decorator, start, end)
		})
		.collect();

	let mut wrappers: Vec<(&Decorator, usize, usize)> = vec![];
	for &(decorator, start, end) in decorators.iter().filter(|(decorator, ..)| decorator.position == DecoratorPosition::Inline) {
		if start == end {
			warn!(sid = decorator.sid.as_str(), "Dropping empty inline decorator range");
		} else if let Some((earlier, ..)) = wrappers.iter().find(|&&(_, s, e)| start < e && s < end) {
			warn!(sid = decorator.sid.as_str(), earlier = earlier.sid.as_str(), "Dropping overlapping inline decorator");
		} else {
			wrappers.push((decorator, start, end));
		}
	}

	let cut_points: Vec<usize> = decorators
		.iter()
		.flat_map(|&(decorator, start, end)| match decorator.position {
			DecoratorPosition::Before => vec![start],
			DecoratorPosition::After => vec![end],
			DecoratorPosition::Inline => vec![],
		})
		.chain(wrappers.iter().flat_map(|&(_, start, end)| [start, end]))
		.collect();

	let emit_at = |boundary: usize, sink: &mut Vec<VChild>| {
		for &(decorator, ..) in decorators.iter().filter(|&&(decorator, _, end)| decorator.position == DecoratorPosition::After && end == boundary) {
			sink.push(decorator.to_vnode().into());
		}
		for &(decorator, ..) in decorators.iter().filter(|&&(decorator, start, _)| decorator.position == DecoratorPosition::Before && start == boundary) {
			sink.push(decorator.to_vnode().into());
		}
	};

	let runs = split_runs(text, marks, &cut_points);
	trace!(runs = runs.len(), decorators = decorators.len(), "Split text");

	let mut out = vec![];
	let mut open: Option<(&Decorator, usize, Vec<VChild>)> = None;
	for run in &runs {
		if let Some((decorator, end, children)) = open.take() {
			if end <= run.start {
				out.push(decorator.wrap(children).into());
			} else {
				open = Some((decorator, end, children));
			}
		}

		match &mut open {
			Some((.., children)) => emit_at(run.start, children),
			None => emit_at(run.start, &mut out),
		}

		if open.is_none() {
			if let Some(&(decorator, _, end)) = wrappers.iter().find(|&&(_, start, end)| start <= run.start && run.start < end) {
				open = Some((decorator, end, vec![]));
			}
		}

		let node = wrap_marks(run, marks);
		match &mut open {
			Some((.., children)) => children.push(node),
			None => out.push(node),
		}
	}
	if let Some((decorator, _, children)) = open {
		out.push(decorator.wrap(children).into());
	}
	emit_at(len, &mut out);
	out
}

/// [`split_text`] with only the decorators that target `target_sid`.
#[must_use]
pub fn split_text_for(target_sid: &str, text: &str, marks: &[MarkRange], decorators: &[Decorator]) -> Vec<VChild> {
	let decorators: Vec<Decorator> = decorators.iter().filter(|decorator| decorator.target == target_sid).cloned().collect();
	split_text(text, marks, &decorators)
}

/// Places the block and layer decorators targeting `target_sid` around `node`.
///
/// Block decorators become siblings before or after `node` (`Inline` position counts as `After`).
/// Layer decorators become portals into `layer_target`, keyed `"layer:{sid}"`.
#[must_use]
pub fn place_block_decorators(target_sid: &str, node: impl Into<VChild>, decorators: &[Decorator], layer_target: &str) -> Vec<VChild> {
	let targeting = || decorators.iter().filter(move |decorator| decorator.target == target_sid);

	let mut placed: Vec<VChild> = targeting()
		.filter(|decorator| decorator.category == DecoratorCategory::Block && decorator.position == DecoratorPosition::Before)
		.map(|decorator| decorator.to_vnode().into())
		.collect();
	placed.push(node.into());
	placed.extend(
		targeting()
			.filter(|decorator| decorator.category == DecoratorCategory::Block && decorator.position != DecoratorPosition::Before)
			.map(|decorator| decorator.to_vnode().into()),
	);
	placed.extend(
		targeting()
			.filter(|decorator| decorator.category == DecoratorCategory::Layer)
			.map(|decorator| portal(layer_target, decorator.to_vnode(), Some(format!("layer:{}", decorator.sid).as_str())).into()),
	);
	placed
}
