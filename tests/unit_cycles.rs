#![allow(missing_docs)]

use buildafile::baf::{BlockModel, ErrorKind, Model, SetterCtx, Value, ValueMap, build};

fn map(entries: Vec<(&str, Value)>) -> Value {
	let mut out = ValueMap::new();
	for (key, value) in entries {
		out.insert(key, value);
	}
	Value::Map(out)
}

#[test]
fn mutual_size_setters_are_a_cycle() {
	let schema = BlockModel::builder("Loop")
		.field("a", Model::u8())
		.field("b", Model::u8())
		.on_build("a", |ctx: &SetterCtx<'_>| Ok(ctx.sibling("b")?.size()?.into()))
		.on_build("b", |ctx: &SetterCtx<'_>| Ok(ctx.sibling("a")?.size()?.into()))
		.finish();

	let err = build(&schema, map(vec![]), ".").expect_err("cycle detected");
	match &err.kind {
		ErrorKind::CyclicDependency { residual } => {
			assert_eq!(residual.as_slice(), ["a (pending on b)", "b (pending on a)"]);
		}
		other => panic!("unexpected error kind: {other:?}"),
	}
}

#[test]
fn forced_dependency_cycle_is_detected() {
	let schema = BlockModel::builder("Loop")
		.field("a", Model::u8())
		.field("b", Model::u8())
		.on_build("a", |ctx: &SetterCtx<'_>| {
			ctx.force_dependency("b")?;
			Ok(0_u64.into())
		})
		.on_build("b", |ctx: &SetterCtx<'_>| {
			ctx.force_dependency("a")?;
			Ok(0_u64.into())
		})
		.finish();

	let err = build(&schema, map(vec![]), ".").expect_err("cycle detected");
	assert!(matches!(err.kind, ErrorKind::CyclicDependency { .. }));
}

#[test]
fn long_dependency_chains_terminate() {
	// d waits on c, c waits on b, b waits on the concrete field a.
	let schema = BlockModel::builder("Chain")
		.field("d", Model::u8())
		.field("c", Model::u8())
		.field("b", Model::u8())
		.field("a", Model::bytes())
		.on_build("d", |ctx: &SetterCtx<'_>| Ok(ctx.sibling("c")?.int_value()?.into()))
		.on_build("c", |ctx: &SetterCtx<'_>| Ok(ctx.sibling("b")?.int_value()?.into()))
		.on_build("b", |ctx: &SetterCtx<'_>| Ok(ctx.sibling("a")?.size()?.into()))
		.finish();

	let datum = build(&schema, map(vec![("a", Value::Bytes(vec![0; 3]))]), ".").expect("chain resolves");
	assert_eq!(datum.get_bytes(), [0x03, 0x03, 0x03, 0x00, 0x00, 0x00]);
}

#[test]
fn cousin_lookup_through_the_root() {
	let header = BlockModel::builder("Header")
		.field("body_size", Model::u16())
		.on_build("body_size", |ctx: &SetterCtx<'_>| {
			let body = ctx
				.root()
				.child("body")
				.ok_or_else(|| buildafile::baf::SetterAbort::fail("no body field"))?;
			Ok(body.size()?.into())
		})
		.finish();
	let body = BlockModel::builder("Body").field("payload", Model::bytes()).finish();

	let schema = BlockModel::builder("Top")
		.field("header", header)
		.field("body", body)
		.finish();

	let input = map(vec![
		("header", map(vec![])),
		("body", map(vec![("payload", Value::Bytes(vec![0xab; 5]))])),
	]);
	let datum = build(&schema, input, ".").expect("cousin resolves");
	assert_eq!(datum.get_bytes(), [0x05, 0x00, 0xab, 0xab, 0xab, 0xab, 0xab]);
}
