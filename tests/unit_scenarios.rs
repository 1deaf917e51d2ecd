#![allow(missing_docs)]

use buildafile::baf::{BlockModel, Model, SetterCtx, Value, ValueMap, build};

fn level_header() -> Model {
	BlockModel::builder("LevelHeader")
		.field("world_num", Model::u8())
		.field("level_num", Model::u8())
		.field("setting", Model::u8())
		.field("bgm_id", Model::u8())
		.field("name_length", Model::u8())
		.field("name", Model::bytes())
		.on_build("name_length", |ctx: &SetterCtx<'_>| Ok(ctx.sibling("name")?.size()?.into()))
		.finish()
}

fn level_data() -> Model {
	BlockModel::builder("LevelData")
		.field("width", Model::u16())
		.field("height", Model::u16())
		.field("spawn_x", Model::u16())
		.field("spawn_y", Model::u16())
		.finish()
}

fn header_input() -> Value {
	let mut map = ValueMap::new();
	map.insert("world_num", Value::Int(2));
	map.insert("level_num", Value::Int(1));
	map.insert("setting", Value::Int(0));
	map.insert("bgm_id", Value::Int(7));
	map.insert("name", Value::Str("Example Level".to_owned()));
	Value::Map(map)
}

#[test]
fn flat_scalar_block() {
	let schema = BlockModel::builder("LevelHeader")
		.field("world_num", Model::u8())
		.field("level_num", Model::u8())
		.field("setting", Model::u8())
		.field("bgm_id", Model::u8())
		.finish();

	let mut map = ValueMap::new();
	map.insert("world_num", Value::Int(2));
	map.insert("level_num", Value::Int(1));
	map.insert("setting", Value::Int(0));
	map.insert("bgm_id", Value::Int(7));

	let datum = build(&schema, Value::Map(map), ".").expect("build succeeds");
	assert_eq!(datum.get_bytes(), [0x02, 0x01, 0x00, 0x07]);
}

#[test]
fn length_prefixed_variable_string() {
	let datum = build(&level_header(), header_input(), ".").expect("build succeeds");

	let mut expected = vec![0x02, 0x01, 0x00, 0x07, 0x0d];
	expected.extend_from_slice(b"Example Level");
	assert_eq!(datum.get_bytes(), expected);
	assert_eq!(datum.size(), datum.get_bytes().len());
}

#[test]
fn forward_offset_reference_across_blocks() {
	let schema = BlockModel::builder("Level")
		.field_default("version", Model::bytes(), Value::Bytes(b"LV01".to_vec()))
		.field("data_offset", Model::u16())
		.field("header", level_header())
		.field("data", level_data())
		.on_build("data_offset", |ctx: &SetterCtx<'_>| Ok(ctx.sibling("data")?.offset()?.into()))
		.finish();

	let mut data_map = ValueMap::new();
	data_map.insert("width", Value::Int(1024));
	data_map.insert("height", Value::Int(400));
	data_map.insert("spawn_x", Value::Int(16));
	data_map.insert("spawn_y", Value::Int(16));

	let mut map = ValueMap::new();
	map.insert("header", header_input());
	map.insert("data", Value::Map(data_map));

	let datum = build(&schema, Value::Map(map), ".").expect("build succeeds");
	let expected: Vec<u8> = vec![
		0x4c, 0x56, 0x30, 0x31, // version "LV01"
		0x18, 0x00, // data offset resolved after the header settled
		0x02, 0x01, 0x00, 0x07, 0x0d, 0x45, 0x78, 0x61, 0x6d, 0x70, 0x6c, 0x65, 0x20, 0x4c, 0x65, 0x76, 0x65,
		0x6c, // header
		0x00, 0x04, 0x90, 0x01, 0x10, 0x00, 0x10, 0x00, // data
	];
	assert_eq!(datum.get_bytes(), expected);
}

#[test]
fn block_bytes_are_children_concatenated_in_declaration_order() {
	let datum = build(&level_header(), header_input(), ".").expect("build succeeds");
	let bytes = datum.get_bytes();

	// name_length sits at offset 4, name directly after it.
	assert_eq!(bytes[4], 13);
	assert_eq!(&bytes[5..], b"Example Level");
}
