use std::fmt::Write;

use crate::baf::datum::{Arena, Datum, DatumId};
use crate::baf::model::Model;

/// Render a built datum tree, one line per datum:
/// `<hex_offset> (<hex_size>) <name>: <typename>`, indented two spaces
/// per depth. Runs of scalar array elements collapse into a single
/// `<hex_offset> ...` line.
pub fn visualize(datum: &Datum) -> String {
	let mut out = String::new();
	let root = datum.root;
	match datum.arena.node(root).model {
		Model::Block(_) | Model::Array(_) => render_children(&datum.arena, root, 0, &mut out),
		_ => render_line(&datum.arena, root, 0, &mut out),
	}
	out
}

fn render_children(arena: &Arena, id: DatumId, depth: usize, out: &mut String) {
	let children = &arena.node(id).children;
	let mut in_scalar_run = false;
	for &child in children {
		if matches!(arena.node(child).model, Model::Scalar(_)) && matches!(arena.node(id).model, Model::Array(_)) {
			if !in_scalar_run {
				let pad = "  ".repeat(depth);
				let offset = arena.offset_of(child).unwrap_or(0);
				let _ = writeln!(out, "{pad}{offset:#x} ...");
				in_scalar_run = true;
			}
			continue;
		}
		in_scalar_run = false;
		render(arena, child, depth, out);
	}
}

fn render(arena: &Arena, id: DatumId, depth: usize, out: &mut String) {
	let node = arena.node(id);

	// Absent optionals occupy no bytes and are not drawn.
	if matches!(node.model, Model::Optional(_)) && node.children.is_empty() {
		return;
	}

	render_line(arena, id, depth, out);
	if matches!(node.model, Model::Block(_) | Model::Array(_)) {
		render_children(arena, id, depth + 1, out);
	}
}

fn render_line(arena: &Arena, id: DatumId, depth: usize, out: &mut String) {
	let node = arena.node(id);
	let pad = "  ".repeat(depth);
	let offset = arena.offset_of(id).unwrap_or(0);
	let size = node.size.unwrap_or(0);
	let _ = writeln!(out, "{pad}{offset:#x} ({size:#x}) {}: {}", node.label, node.model.type_name());
}

#[cfg(test)]
mod tests {
	use crate::baf::build::build;
	use crate::baf::model::{BlockModel, Model};
	use crate::baf::value::{Value, ValueMap};

	#[test]
	fn tree_lines_carry_offsets_and_sizes() {
		let inner = BlockModel::builder("Inner").field("x", Model::u16()).finish();
		let schema = BlockModel::builder("Outer")
			.field("tag", Model::u8())
			.field("inner", inner)
			.field("tail", Model::bytes())
			.finish();

		let mut inner_map = ValueMap::new();
		inner_map.insert("x", Value::Int(7));
		let mut map = ValueMap::new();
		map.insert("tag", Value::Int(1));
		map.insert("inner", Value::Map(inner_map));
		map.insert("tail", Value::Bytes(vec![0xaa, 0xbb]));

		let datum = build(&schema, Value::Map(map), ".").expect("build succeeds");
		let text = datum.visualize();
		let lines: Vec<&str> = text.lines().collect();

		assert_eq!(lines[0], "0x0 (0x1) tag: U8");
		assert_eq!(lines[1], "0x1 (0x2) inner: Inner");
		assert_eq!(lines[2], "  0x1 (0x2) x: U16");
		assert_eq!(lines[3], "0x3 (0x2) tail: Bytes");
	}

	#[test]
	fn scalar_array_runs_collapse() {
		let schema = BlockModel::builder("Top")
			.field("head", Model::u8())
			.field("values", Model::array(Model::u16()))
			.finish();

		let mut map = ValueMap::new();
		map.insert("head", Value::Int(0));
		map.insert("values", Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]));

		let datum = build(&schema, Value::Map(map), ".").expect("build succeeds");
		let text = datum.visualize();
		let lines: Vec<&str> = text.lines().collect();

		assert_eq!(lines[0], "0x0 (0x1) head: U8");
		assert_eq!(lines[1], "0x1 (0x6) values: Array[U16]");
		assert_eq!(lines[2], "  0x1 ...");
		assert_eq!(lines.len(), 3);
	}

	#[test]
	fn absent_optional_is_not_drawn() {
		let schema = BlockModel::builder("Top")
			.field("x", Model::u8())
			.field("y", Model::optional(Model::u16()))
			.finish();

		let mut map = ValueMap::new();
		map.insert("x", Value::Int(1));

		let datum = build(&schema, Value::Map(map), ".").expect("build succeeds");
		let text = datum.visualize();
		assert_eq!(text.lines().count(), 1);
		assert!(text.contains("x: U8"));
	}
}
