use fiber_dom::{
	split::{split_text_for, Decorator, MarkRange},
	DecoratorCategory, DecoratorPosition, MemoryDocument, NodeId, Reconciler, VNode,
};
use serde_json::{json, Value};
use std::rc::Rc;

const TEXT: &str = "yellow background";

fn model() -> Value {
	json!({ "sid": "doc" })
}

fn paragraph(text: &str, marks: &[MarkRange], decorators: &[Decorator]) -> Rc<VNode> {
	Rc::new(VNode::element("div").with_sid("doc").child(VNode::element("p").with_sid("p-1").children(split_text_for("p-1", text, marks, decorators))))
}

fn chip(sid: &str, position: DecoratorPosition, at: usize) -> Decorator {
	Decorator::new(sid, "chip", "p-1", DecoratorCategory::Inline, position).range(at, at).content("*")
}

fn highlight(start: usize, end: usize) -> Decorator {
	Decorator::new("d-highlight", "highlight", "p-1", DecoratorCategory::Inline, DecoratorPosition::Inline).range(start, end)
}

fn p(document: &MemoryDocument, container: NodeId) -> NodeId {
	document.query_attribute(container, "data-sid", "p-1")[0]
}

#[test]
fn moving_a_chip_replaces_it() {
	let document = MemoryDocument::new();
	let container = document.create_root("main");
	let mut reconciler = Reconciler::new(&document, container);

	reconciler.reconcile(paragraph(TEXT, &[], &[chip("chip-before", DecoratorPosition::Before, 0)]), &model(), None);
	assert_eq!(document.query_attribute(container, "data-decorator-sid", "chip-before").len(), 1);
	assert_eq!(document.text_content(p(&document, container)), "*yellow background");

	let stats = reconciler.reconcile(paragraph(TEXT, &[], &[chip("chip-after", DecoratorPosition::After, 17)]), &model(), None);
	assert!(document.query_attribute(container, "data-decorator-sid", "chip-before").is_empty());
	assert_eq!(document.query_attribute(container, "data-decorator-sid", "chip-after").len(), 1);
	assert_eq!(document.text_content(p(&document, container)), "yellow background*");
	assert_eq!(stats.removed, 1);
}

#[test]
fn repeated_decorator_sids_render_once_each() {
	let document = MemoryDocument::new();
	let container = document.create_root("main");
	let mut reconciler = Reconciler::new(&document, container);
	let decorators = [highlight(0, 3), highlight(4, 7), highlight(8, 13)];

	reconciler.reconcile(paragraph("one two three", &[], &decorators), &model(), None);
	let highlights = document.query_attribute(container, "data-decorator-sid", "d-highlight");
	assert_eq!(highlights.len(), 3);
	assert_eq!(highlights.iter().map(|&node| document.text_content(node)).collect::<Vec<_>>(), ["one", "two", "three"]);

	let mutations = document.mutation_count();
	reconciler.reconcile(paragraph("one two three", &[], &decorators), &model(), None);
	assert_eq!(document.mutation_count(), mutations);
	assert_eq!(document.query_attribute(container, "data-decorator-sid", "d-highlight"), highlights);
}

#[test]
fn decorator_identity_is_materialized() {
	let document = MemoryDocument::new();
	let container = document.create_root("main");
	let mut reconciler = Reconciler::new(&document, container);

	reconciler.reconcile(paragraph("one two", &[], &[highlight(0, 3)]), &model(), None);
	assert_eq!(
		document.inner_html(p(&document, container)),
		concat!(
			r#"<span data-decorator-category="inline" data-decorator-position="inline" data-decorator-sid="d-highlight" data-decorator-stype="highlight">"#,
			"one</span> two",
		)
	);
}

#[test]
fn marks_split_the_text() {
	let document = MemoryDocument::new();
	let container = document.create_root("main");
	let mut reconciler = Reconciler::new(&document, container);

	reconciler.reconcile(paragraph(TEXT, &[MarkRange::new("bold", 0, 16)], &[]), &model(), None);
	let paragraph_node = p(&document, container);
	assert_eq!(document.inner_html(paragraph_node), r#"<span class="mark-bold" data-mark="bold">yellow backgroun</span>d"#);
	let bold = document.query_attribute(container, "data-mark", "bold")[0];

	reconciler.reconcile(paragraph(TEXT, &[MarkRange::new("bold", 0, 17)], &[]), &model(), None);
	assert_eq!(document.inner_html(paragraph_node), r#"<span class="mark-bold" data-mark="bold">yellow background</span>"#);
	assert_eq!(document.query_attribute(container, "data-mark", "bold"), [bold]);
}

#[test]
fn inline_decorators_and_marks_combine() {
	let document = MemoryDocument::new();
	let container = document.create_root("main");
	let mut reconciler = Reconciler::new(&document, container);

	reconciler.reconcile(
		paragraph("one two", &[MarkRange::new("em", 2, 5)], &[highlight(0, 3), chip("c", DecoratorPosition::After, 7)]),
		&model(),
		None,
	);
	assert_eq!(document.text_content(container), "one two*");
	let highlight = document.query_attribute(container, "data-decorator-sid", "d-highlight")[0];
	assert_eq!(document.inner_html(highlight), r#"on<span class="mark-em" data-mark="em">e</span>"#);
}
