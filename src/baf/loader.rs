use std::fs;
use std::path::{Path, PathBuf};

use crate::baf::build::build;
use crate::baf::datum::Datum;
use crate::baf::error::{ErrorKind, Result};
use crate::baf::model::Model;
use crate::baf::value::Value;

/// Parse a TOML file and build it against `model`. The file's parent
/// directory becomes the build root path.
pub fn build_toml(model: &Model, path: impl AsRef<Path>) -> Result<Datum> {
	let path = path.as_ref();
	let text = fs::read_to_string(path)?;
	let table: toml::Table = toml::from_str(&text).map_err(|err| ErrorKind::Parse { message: err.to_string() })?;
	build(model, from_toml(toml::Value::Table(table)), root_dir(path))
}

/// Parse a JSON file and build it against `model`. The file's parent
/// directory becomes the build root path.
pub fn build_json(model: &Model, path: impl AsRef<Path>) -> Result<Datum> {
	let path = path.as_ref();
	let text = fs::read_to_string(path)?;
	let parsed: serde_json::Value =
		serde_json::from_str(&text).map_err(|err| ErrorKind::Parse { message: err.to_string() })?;
	build(model, from_json(parsed), root_dir(path))
}

fn root_dir(path: &Path) -> PathBuf {
	match path.parent() {
		Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
		_ => PathBuf::from("."),
	}
}

fn from_toml(value: toml::Value) -> Value {
	match value {
		toml::Value::String(text) => Value::Str(text),
		toml::Value::Integer(int) => Value::Int(i128::from(int)),
		toml::Value::Float(float) => Value::Float(float),
		toml::Value::Boolean(flag) => Value::Int(i128::from(flag)),
		toml::Value::Datetime(datetime) => Value::Str(datetime.to_string()),
		toml::Value::Array(items) => Value::List(items.into_iter().map(from_toml).collect()),
		toml::Value::Table(table) => Value::Map(table.into_iter().map(|(key, item)| (key, from_toml(item))).collect()),
	}
}

fn from_json(value: serde_json::Value) -> Value {
	match value {
		serde_json::Value::Null => Value::Null,
		serde_json::Value::Bool(flag) => Value::Int(i128::from(flag)),
		serde_json::Value::Number(number) => {
			if let Some(int) = number.as_i64() {
				Value::Int(i128::from(int))
			} else if let Some(int) = number.as_u64() {
				Value::Int(i128::from(int))
			} else {
				Value::Float(number.as_f64().unwrap_or(0.0))
			}
		}
		serde_json::Value::String(text) => Value::Str(text),
		serde_json::Value::Array(items) => Value::List(items.into_iter().map(from_json).collect()),
		serde_json::Value::Object(object) => {
			Value::Map(object.into_iter().map(|(key, item)| (key, from_json(item))).collect())
		}
	}
}
