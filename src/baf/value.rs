/// Tagged representation of loaded source data.
///
/// Integer width is unbounded here; narrowing to a codec's range happens
/// when a scalar datum builds.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
	Null,
	Int(i128),
	Float(f64),
	Str(String),
	Bytes(Vec<u8>),
	List(Vec<Value>),
	Map(ValueMap),
}

impl Value {
	/// Short name of the variant, used in type-mismatch messages.
	pub fn kind_name(&self) -> &'static str {
		match self {
			Value::Null => "null",
			Value::Int(_) => "int",
			Value::Float(_) => "float",
			Value::Str(_) => "str",
			Value::Bytes(_) => "bytes",
			Value::List(_) => "list",
			Value::Map(_) => "map",
		}
	}
}

impl From<i128> for Value {
	fn from(value: i128) -> Self {
		Value::Int(value)
	}
}

impl From<i64> for Value {
	fn from(value: i64) -> Self {
		Value::Int(i128::from(value))
	}
}

impl From<u64> for Value {
	fn from(value: u64) -> Self {
		Value::Int(i128::from(value))
	}
}

impl From<usize> for Value {
	fn from(value: usize) -> Self {
		Value::Int(value as i128)
	}
}

impl From<&str> for Value {
	fn from(value: &str) -> Self {
		Value::Str(value.to_owned())
	}
}

impl From<String> for Value {
	fn from(value: String) -> Self {
		Value::Str(value)
	}
}

impl From<Vec<u8>> for Value {
	fn from(value: Vec<u8>) -> Self {
		Value::Bytes(value)
	}
}

impl From<&[u8]> for Value {
	fn from(value: &[u8]) -> Self {
		Value::Bytes(value.to_vec())
	}
}

impl From<ValueMap> for Value {
	fn from(value: ValueMap) -> Self {
		Value::Map(value)
	}
}

/// String-keyed mapping that preserves insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueMap {
	entries: Vec<(Box<str>, Value)>,
}

impl ValueMap {
	pub fn new() -> Self {
		Self::default()
	}

	/// Insert a key, replacing an existing entry in place so the original
	/// position is kept.
	pub fn insert(&mut self, key: impl Into<Box<str>>, value: Value) {
		let key = key.into();
		if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
			slot.1 = value;
			return;
		}
		self.entries.push((key, value));
	}

	pub fn get(&self, key: &str) -> Option<&Value> {
		self.entries.iter().find(|(k, _)| k.as_ref() == key).map(|(_, v)| v)
	}

	pub fn contains(&self, key: &str) -> bool {
		self.get(key).is_some()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
		self.entries.iter().map(|(k, v)| (k.as_ref(), v))
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

impl<K: Into<Box<str>>> FromIterator<(K, Value)> for ValueMap {
	fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
		let mut map = ValueMap::new();
		for (key, value) in iter {
			map.insert(key, value);
		}
		map
	}
}
