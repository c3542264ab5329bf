use fiber_dom::{
	fiber::{FiberBuilder, FiberId, FiberKind, FiberTree},
	portal, DecoratorCategory, DecoratorIdentity, DecoratorPosition, Registration, VChild, VNode,
};
use std::rc::Rc;

fn resolve(stype: &str) -> Registration {
	match stype {
		"counter" => Registration::Component,
		"missing" => Registration::Missing,
		_ => Registration::Template,
	}
}

fn build(builder: &mut FiberBuilder, root: VNode, prev: Option<&FiberTree<()>>) -> FiberTree<()> {
	builder.build(Rc::new(root), prev, &resolve)
}

fn root(children: impl IntoIterator<Item = VChild>) -> VNode {
	VNode::element("div").with_sid("root").children(children)
}

fn keyed(sid: &str) -> VChild {
	VNode::element("p").with_sid(sid).into()
}

fn children(tree: &FiberTree<()>, id: FiberId) -> Vec<FiberId> {
	tree.children(id).collect()
}

fn top(tree: &FiberTree<()>) -> Vec<FiberId> {
	children(tree, tree.root().expect("root"))
}

fn decorated(sid: &str, decorator_sid: &str) -> VChild {
	VNode::element("span")
		.with_sid(sid)
		.with_decorator(DecoratorIdentity {
			sid: decorator_sid.to_owned(),
			stype: "chip".to_owned(),
			category: DecoratorCategory::Inline,
			position: DecoratorPosition::Before,
		})
		.into()
}

#[test]
fn keyed_match_survives_reorder() {
	let mut builder = FiberBuilder::new();
	let prev = build(&mut builder, root([keyed("a"), keyed("b")]), None);
	let next = build(&mut builder, root([keyed("b"), keyed("a")]), Some(&prev));

	let (prev_children, next_children) = (top(&prev), top(&next));
	assert_eq!(next[next.root().unwrap()].prev, prev.root());
	assert_eq!(next[next_children[0]].prev, Some(prev_children[1]));
	assert_eq!(next[next_children[1]].prev, Some(prev_children[0]));
	assert_eq!(next[next_children[1]].index, 1);
}

#[test]
fn decorator_identity_shadows_sid() {
	let mut builder = FiberBuilder::new();
	let prev = build(&mut builder, root([decorated("x", "d1")]), None);

	let next = build(&mut builder, root([decorated("x", "d2")]), Some(&prev));
	assert_eq!(next[top(&next)[0]].prev, None);

	let next = build(&mut builder, root([keyed("x")]), Some(&prev));
	assert_eq!(next[top(&next)[0]].prev, None);

	let next = build(&mut builder, root([decorated("y", "d1")]), Some(&prev));
	assert_eq!(next[top(&next)[0]].prev, Some(top(&prev)[0]));
}

#[test]
fn matching_is_scoped_to_the_parent() {
	let mut builder = FiberBuilder::new();
	let section = |sid: &str, inner: Option<VChild>| -> VChild { VNode::element("section").with_sid(sid).children(inner).into() };

	let prev = build(&mut builder, root([section("a", Some(keyed("x"))), section("b", None)]), None);
	let next = build(&mut builder, root([section("a", None), section("b", Some(keyed("x")))]), Some(&prev));

	let b = top(&next)[1];
	assert_eq!(next[b].prev, Some(top(&prev)[1]));
	assert_eq!(next[children(&next, b)[0]].prev, None);
}

#[test]
fn unkeyed_matching_scans_forward() {
	let mut builder = FiberBuilder::new();
	let p = |class: &str| -> VChild { VNode::element("p").class(class).into() };

	let prev = build(&mut builder, root([p("x"), VNode::element("span").into(), p("y")]), None);
	let next = build(&mut builder, root([p("y"), p("x")]), Some(&prev));

	let (prev_children, next_children) = (top(&prev), top(&next));
	assert_eq!(next[next_children[0]].prev, Some(prev_children[2]));
	assert_eq!(next[next_children[1]].prev, None);
}

#[test]
fn keyed_and_unkeyed_nodes_never_match() {
	let mut builder = FiberBuilder::new();
	let prev = build(&mut builder, root([VNode::element("p").into()]), None);
	let next = build(&mut builder, root([keyed("a")]), Some(&prev));
	assert_eq!(next[top(&next)[0]].prev, None);

	let prev = build(&mut builder, root([keyed("a")]), None);
	let next = build(&mut builder, root([VNode::element("p").into()]), Some(&prev));
	assert_eq!(next[top(&next)[0]].prev, None);
}

#[test]
fn duplicate_keys_claim_distinct_fibers() {
	let mut builder = FiberBuilder::new();
	let prev = build(&mut builder, root([keyed("dup"), keyed("dup"), keyed("dup")]), None);
	let next = build(&mut builder, root([keyed("dup"), keyed("dup")]), Some(&prev));

	let claimed: Vec<_> = top(&next).into_iter().map(|id| next[id].prev).collect();
	assert_eq!(claimed, top(&prev)[..2].iter().copied().map(Some).collect::<Vec<_>>());
}

#[test]
fn primitive_children_get_no_fiber() {
	let mut builder = FiberBuilder::new();
	let tree = build(&mut builder, root(["a".into(), keyed("p"), VChild::from(2)]), None);

	let root_id = tree.root().unwrap();
	assert_eq!(tree[root_id].primitive_text_children, [(0, "a".to_owned()), (2, "2".to_owned())]);
	let only = top(&tree);
	assert_eq!(only.len(), 1);
	assert_eq!(tree[only[0]].index, 1);
	assert_eq!(tree[only[0]].return_fiber, Some(root_id));
}

#[test]
fn text_leaves_have_no_children() {
	let mut builder = FiberBuilder::new();
	let tree = build(&mut builder, VNode::element("p").with_sid("root").with_text("leaf"), None);
	assert_eq!(tree.len(), 1);
	assert!(top(&tree).is_empty());
}

#[test]
fn kinds_are_resolved_while_building() {
	let mut builder = FiberBuilder::new();
	let tree = build(
		&mut builder,
		root([
			VNode::text("bare").into(),
			VNode::element("p").into(),
			VNode::element("output").with_stype("counter").into(),
			VNode::element("div").with_stype("missing").into(),
			VNode::element("div").with_stype("template").into(),
			portal("#overlay", "floating", Some("p1")).into(),
		]),
		None,
	);

	let kinds: Vec<FiberKind> = top(&tree).into_iter().map(|id| tree[id].kind).collect();
	assert_eq!(
		kinds,
		[
			FiberKind::Text,
			FiberKind::Element,
			FiberKind::Component,
			FiberKind::Missing,
			FiberKind::Element,
			FiberKind::Portal
		]
	);
}

#[test]
fn incompatible_roots_start_over() {
	let mut builder = FiberBuilder::new();
	let prev = build(&mut builder, root([keyed("a")]), None);
	let next = build(&mut builder, VNode::element("div").with_sid("other").child(keyed("a")), Some(&prev));

	assert_eq!(next[next.root().unwrap()].prev, None);
	assert_eq!(next[top(&next)[0]].prev, None);
}

#[test]
fn paths_follow_positions() {
	let mut builder = FiberBuilder::new();
	let tree = build(&mut builder, root(["text".into(), VNode::element("section").child(keyed("deep")).into()]), None);

	let section = top(&tree)[0];
	let deep = children(&tree, section)[0];
	assert_eq!(tree.path(deep), "0/1/0");
	assert_eq!(tree.subtree_post_order(tree.root().unwrap()), [deep, section, tree.root().unwrap()]);
}
