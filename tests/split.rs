use fiber_dom::{
	split::{place_block_decorators, split_runs, split_text, split_text_for, Decorator, MarkRange, Run},
	DecoratorCategory, DecoratorPosition, VChild, VNode,
};

fn node(child: &VChild) -> &VNode {
	match child {
		VChild::Node(node) => node,
		VChild::Text(text) => panic!("expected a node but found text {:?}", text),
	}
}

fn text(child: &VChild) -> &str {
	match child {
		VChild::Text(text) => text,
		VChild::Node(node) => panic!("expected text but found {:?}", node),
	}
}

fn decorator_sid(child: &VChild) -> &str {
	&node(child).decorator.as_ref().expect("decorator identity").sid
}

#[test]
fn end_offsets_are_exclusive() {
	let runs = split_runs("yellow background", &[MarkRange::new("bold", 0, 16)], &[]);
	assert_eq!(
		runs,
		[
			Run {
				start: 0,
				end: 16,
				text: "yellow backgroun".to_owned(),
				marks: vec![0],
			},
			Run {
				start: 16,
				end: 17,
				text: "d".to_owned(),
				marks: vec![],
			},
		]
	);
}

#[test]
fn full_range_mark_is_one_run() {
	let runs = split_runs("yellow background", &[MarkRange::new("bold", 0, 17)], &[]);
	assert_eq!(runs.len(), 1);
	assert_eq!(runs[0].text, "yellow background");
	assert_eq!(runs[0].marks, [0]);
}

#[test]
fn empty_text_has_no_runs() {
	assert!(split_runs("", &[MarkRange::new("bold", 0, 3)], &[1]).is_empty());
}

#[test]
fn malformed_ranges_are_clamped() {
	let runs = split_runs("hello world", &[MarkRange::new("past-end", 6, 100), MarkRange::new("reversed", 8, 3)], &[]);
	let texts: Vec<&str> = runs.iter().map(|run| run.text.as_str()).collect();
	assert_eq!(texts, ["hello ", "world"]);
	assert_eq!(runs[1].marks, [0]);
}

#[test]
fn offsets_count_chars() {
	let runs = split_runs("héllo", &[MarkRange::new("accent", 1, 2)], &[]);
	let texts: Vec<&str> = runs.iter().map(|run| run.text.as_str()).collect();
	assert_eq!(texts, ["h", "é", "llo"]);
	assert_eq!(runs[1].marks, [0]);
}

#[test]
fn overlapping_marks_nest_in_declaration_order() {
	let children = split_text("hello", &[MarkRange::new("bold", 0, 5), MarkRange::new("italic", 0, 3)], &[]);
	assert_eq!(children.len(), 2);

	let outer = node(&children[0]);
	assert_eq!(outer.signature().class, Some("mark-bold"));
	let inner = node(&outer.children[0]);
	assert_eq!(inner.signature().class, Some("mark-italic"));
	assert_eq!(inner.text.as_deref(), Some("hel"));

	let rest = node(&children[1]);
	assert_eq!(rest.signature().class, Some("mark-bold"));
	assert_eq!(rest.text.as_deref(), Some("lo"));
}

#[test]
fn after_decorators_precede_before_decorators_at_a_boundary() {
	let decorators = [
		Decorator::new("b", "chip", "p", DecoratorCategory::Inline, DecoratorPosition::Before).range(5, 5),
		Decorator::new("a", "chip", "p", DecoratorCategory::Inline, DecoratorPosition::After).range(0, 5),
	];
	let children = split_text("hello world", &[], &decorators);
	assert_eq!(children.len(), 4);
	assert_eq!(text(&children[0]), "hello");
	assert_eq!(decorator_sid(&children[1]), "a");
	assert_eq!(decorator_sid(&children[2]), "b");
	assert_eq!(text(&children[3]), " world");
}

#[test]
fn empty_text_still_places_decorators() {
	let decorators = [
		Decorator::new("before", "chip", "p", DecoratorCategory::Inline, DecoratorPosition::Before),
		Decorator::new("after", "chip", "p", DecoratorCategory::Inline, DecoratorPosition::After),
	];
	let children = split_text("", &[], &decorators);
	assert_eq!(children.iter().map(decorator_sid).collect::<Vec<_>>(), ["after", "before"]);
}

#[test]
fn first_inline_decorator_wins_an_overlap() {
	let decorators = [
		Decorator::new("first", "highlight", "p", DecoratorCategory::Inline, DecoratorPosition::Inline).range(0, 5),
		Decorator::new("second", "highlight", "p", DecoratorCategory::Inline, DecoratorPosition::Inline).range(3, 8),
	];
	let children = split_text("hello world", &[], &decorators);
	assert_eq!(children.len(), 2);
	assert_eq!(decorator_sid(&children[0]), "first");
	assert_eq!(text(&node(&children[0]).children[0]), "hello");
	assert_eq!(text(&children[1]), " world");
}

#[test]
fn decorators_for_other_targets_are_ignored() {
	let decorators = [
		Decorator::new("mine", "chip", "p-1", DecoratorCategory::Inline, DecoratorPosition::Before),
		Decorator::new("theirs", "chip", "p-2", DecoratorCategory::Inline, DecoratorPosition::Before),
	];
	let children = split_text_for("p-1", "text", &[], &decorators);
	assert_eq!(children.len(), 2);
	assert_eq!(decorator_sid(&children[0]), "mine");
}

#[test]
fn block_and_layer_decorators_are_placed_around_the_target() {
	let decorators = [
		Decorator::new("below", "note", "p-1", DecoratorCategory::Block, DecoratorPosition::After),
		Decorator::new("above", "note", "p-1", DecoratorCategory::Block, DecoratorPosition::Before),
		Decorator::new("overlay", "cursor", "p-1", DecoratorCategory::Layer, DecoratorPosition::Inline),
		Decorator::new("inline", "chip", "p-1", DecoratorCategory::Inline, DecoratorPosition::Before),
		Decorator::new("elsewhere", "note", "p-2", DecoratorCategory::Block, DecoratorPosition::Before),
	];
	let placed = place_block_decorators("p-1", VNode::element("p").with_sid("p-1"), &decorators, "#layers");

	assert_eq!(placed.len(), 4);
	assert_eq!(decorator_sid(&placed[0]), "above");
	assert_eq!(node(&placed[1]).sid(), Some("p-1"));
	assert_eq!(decorator_sid(&placed[2]), "below");
	assert_eq!(node(&placed[2]).tag.as_deref(), Some("div"));

	let layer = node(&placed[3]);
	let portal = layer.portal.as_ref().expect("layer portal");
	assert_eq!(portal.target, "#layers");
	assert_eq!(portal.id.as_deref(), Some("layer:overlay"));
	assert_eq!(decorator_sid(&layer.children[0]), "overlay");
}
