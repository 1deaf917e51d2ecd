use std::sync::Arc;

use crate::baf::build::{SetterCtx, SetterResult};
use crate::baf::error::Result;
use crate::baf::scalar::ScalarKind;
use crate::baf::value::Value;

/// User setter: computes one field's input at build time.
pub(crate) type SetterFn = Arc<dyn for<'a> Fn(&SetterCtx<'a>) -> SetterResult + Send + Sync>;

/// User preprocess hook: transforms a field's input before its build.
pub(crate) type PreprocessFn = Arc<dyn Fn(Value) -> Result<Value> + Send + Sync>;

/// Reusable, immutable schema node. Composite variants share their inner
/// declarations, so cloning a model is cheap and a single model may be
/// instantiated many times.
#[derive(Clone)]
pub enum Model {
	/// Fixed-width integer field.
	Scalar(ScalarKind),
	/// Raw byte blob, optionally constrained to a fixed length.
	Bytes(BytesModel),
	/// External file contents, read verbatim at build time.
	File,
	/// Ordered sequence of elements sharing one element model.
	Array(Arc<ArrayModel>),
	/// Field that may be absent, building to zero bytes.
	Optional(Arc<Model>),
	/// Zero padding up to the next multiple of a modulus.
	Align(usize),
	/// Ordered named grouping of child fields.
	Block(Arc<BlockModel>),
}

/// Declaration details for a [`Model::Bytes`] field.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesModel {
	/// Exact payload length, if the schema fixes one.
	pub size: Option<usize>,
}

/// Declaration details for a [`Model::Array`] field.
#[derive(Clone)]
pub struct ArrayModel {
	/// Element model. `None` means every entry must resolve its own model
	/// through a setter.
	pub elem: Option<Model>,
	/// Exact element count, if the schema fixes one.
	pub count: Option<usize>,
}

impl Model {
	pub fn u8() -> Self {
		Model::Scalar(ScalarKind::U8)
	}

	pub fn s8() -> Self {
		Model::Scalar(ScalarKind::S8)
	}

	pub fn u16() -> Self {
		Model::Scalar(ScalarKind::U16)
	}

	pub fn s16() -> Self {
		Model::Scalar(ScalarKind::S16)
	}

	pub fn u32() -> Self {
		Model::Scalar(ScalarKind::U32)
	}

	pub fn s32() -> Self {
		Model::Scalar(ScalarKind::S32)
	}

	pub fn u64() -> Self {
		Model::Scalar(ScalarKind::U64)
	}

	pub fn s64() -> Self {
		Model::Scalar(ScalarKind::S64)
	}

	/// Variable-length byte blob.
	pub fn bytes() -> Self {
		Model::Bytes(BytesModel { size: None })
	}

	/// Byte blob whose payload must be exactly `size` bytes.
	pub fn bytes_sized(size: usize) -> Self {
		Model::Bytes(BytesModel { size: Some(size) })
	}

	pub fn file() -> Self {
		Model::File
	}

	/// Array of any length with a shared element model.
	pub fn array(elem: Model) -> Self {
		Model::Array(Arc::new(ArrayModel {
			elem: Some(elem),
			count: None,
		}))
	}

	/// Array whose input must contain exactly `count` elements.
	pub fn array_sized(elem: Model, count: usize) -> Self {
		Model::Array(Arc::new(ArrayModel {
			elem: Some(elem),
			count: Some(count),
		}))
	}

	/// Array with no declared element model; every entry must arrive as a
	/// `(model, value)` pair from a setter.
	pub fn array_dynamic() -> Self {
		Model::Array(Arc::new(ArrayModel { elem: None, count: None }))
	}

	pub fn optional(inner: Model) -> Self {
		Model::Optional(Arc::new(inner))
	}

	/// Padding to the next multiple of `multiple` bytes. A modulus of 1
	/// always emits zero bytes. The modulus must be at least 1; the
	/// scheduler re-checks it, since `Model::Align` can be constructed
	/// directly.
	pub fn align(multiple: usize) -> Self {
		assert!(multiple >= 1, "align modulus must be at least 1");
		Model::Align(multiple)
	}

	/// Display name used in breadcrumbs and the tree printer.
	pub fn type_name(&self) -> String {
		match self {
			Model::Scalar(kind) => kind.name().to_owned(),
			Model::Bytes(_) => "Bytes".to_owned(),
			Model::File => "File".to_owned(),
			Model::Array(array) => match &array.elem {
				Some(elem) => format!("Array[{}]", elem.type_name()),
				None => "Array".to_owned(),
			},
			Model::Optional(inner) => format!("Optional[{}]", inner.type_name()),
			Model::Align(_) => "Align".to_owned(),
			Model::Block(block) => block.type_name.to_string(),
		}
	}

	/// Size known before any datum builds, when the declaration allows it.
	pub fn static_size(&self) -> Option<usize> {
		match self {
			Model::Scalar(kind) => Some(kind.width()),
			Model::Bytes(bytes) => bytes.size,
			Model::Align(1) => Some(0),
			Model::Array(array) => match (array.count, &array.elem) {
				(Some(0), _) => Some(0),
				(Some(count), Some(elem)) => elem.static_size().map(|size| size * count),
				_ => None,
			},
			Model::Block(block) => block.fields.iter().map(|field| field.model.static_size()).sum(),
			Model::File | Model::Optional(_) | Model::Align(_) => None,
		}
	}

	/// Whether `concrete` may stand in for this model in a polymorphic
	/// slot. The declared model acts purely as a variant bound.
	pub(crate) fn admits(&self, concrete: &Model) -> bool {
		std::mem::discriminant(self) == std::mem::discriminant(concrete)
	}
}

/// One declared field of a block model.
#[derive(Clone)]
pub(crate) struct FieldDecl {
	pub name: Box<str>,
	pub model: Model,
	pub default: Option<Value>,
	pub setter: Option<SetterFn>,
	pub preprocess: Option<PreprocessFn>,
}

/// Ordered named grouping of child fields. Declaration order is the
/// canonical order used by offsets, bytes, and the tree printer.
pub struct BlockModel {
	pub(crate) type_name: Box<str>,
	pub(crate) fields: Vec<FieldDecl>,
}

impl BlockModel {
	/// Start declaring a block with the given type name.
	pub fn builder(type_name: &str) -> BlockBuilder {
		BlockBuilder {
			type_name: type_name.into(),
			fields: Vec::new(),
		}
	}
}

/// Declarative constructor for [`BlockModel`]. Fields keep their
/// declaration order; setters and preprocess hooks attach by name.
///
/// Attaching to an undeclared field name panics, as does redeclaring a
/// field: both are schema-definition bugs, surfaced at construction.
pub struct BlockBuilder {
	type_name: Box<str>,
	fields: Vec<FieldDecl>,
}

impl BlockBuilder {
	pub fn field(self, name: &str, model: Model) -> Self {
		self.declare(name, model, None)
	}

	/// Declare a field with a fallback value used when the input mapping
	/// has no entry and no setter is registered.
	pub fn field_default(self, name: &str, model: Model, default: Value) -> Self {
		self.declare(name, model, Some(default))
	}

	/// Register a setter for a declared field. The scheduler calls it
	/// instead of reading the field from the input mapping.
	pub fn on_build<F>(mut self, name: &str, setter: F) -> Self
	where
		F: for<'a> Fn(&SetterCtx<'a>) -> SetterResult + Send + Sync + 'static,
	{
		let field = self.field_mut(name);
		field.setter = Some(Arc::new(setter));
		self
	}

	/// Register a preprocess hook for a declared field, applied to its
	/// input before the build.
	pub fn preprocess_with<F>(mut self, name: &str, preprocess: F) -> Self
	where
		F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
	{
		let field = self.field_mut(name);
		field.preprocess = Some(Arc::new(preprocess));
		self
	}

	/// Finish the declaration, producing a shareable block model.
	pub fn finish(self) -> Model {
		Model::Block(Arc::new(BlockModel {
			type_name: self.type_name,
			fields: self.fields,
		}))
	}

	fn declare(mut self, name: &str, model: Model, default: Option<Value>) -> Self {
		assert!(
			!self.fields.iter().any(|field| field.name.as_ref() == name),
			"field {name} declared twice on {}",
			self.type_name
		);
		self.fields.push(FieldDecl {
			name: name.into(),
			model,
			default,
			setter: None,
			preprocess: None,
		});
		self
	}

	fn field_mut(&mut self, name: &str) -> &mut FieldDecl {
		let type_name = self.type_name.clone();
		self.fields
			.iter_mut()
			.find(|field| field.name.as_ref() == name)
			.unwrap_or_else(|| panic!("no declared field named {name} on {type_name}"))
	}
}

#[cfg(test)]
mod tests {
	use super::{BlockModel, Model};
	use crate::baf::value::Value;

	#[test]
	fn static_sizes() {
		assert_eq!(Model::u8().static_size(), Some(1));
		assert_eq!(Model::u64().static_size(), Some(8));
		assert_eq!(Model::bytes().static_size(), None);
		assert_eq!(Model::bytes_sized(4).static_size(), Some(4));
		assert_eq!(Model::file().static_size(), None);
		assert_eq!(Model::align(1).static_size(), Some(0));
		assert_eq!(Model::align(4).static_size(), None);
		assert_eq!(Model::array_sized(Model::u16(), 3).static_size(), Some(6));
		assert_eq!(Model::array_sized(Model::bytes(), 3).static_size(), None);
		assert_eq!(Model::array(Model::u16()).static_size(), None);
		assert_eq!(Model::optional(Model::u8()).static_size(), None);
	}

	#[test]
	fn block_static_size_requires_all_static_fields() {
		let fixed = BlockModel::builder("Fixed")
			.field("a", Model::u8())
			.field("b", Model::u16())
			.finish();
		assert_eq!(fixed.static_size(), Some(3));

		let open = BlockModel::builder("Open")
			.field("a", Model::u8())
			.field("b", Model::bytes())
			.finish();
		assert_eq!(open.static_size(), None);
	}

	#[test]
	fn type_names() {
		assert_eq!(Model::u16().type_name(), "U16");
		assert_eq!(Model::array(Model::u8()).type_name(), "Array[U8]");
		assert_eq!(Model::optional(Model::u16()).type_name(), "Optional[U16]");
		let block = BlockModel::builder("LevelHeader").field("x", Model::u8()).finish();
		assert_eq!(block.type_name(), "LevelHeader");
	}

	#[test]
	fn polymorphic_bound_is_the_variant() {
		let base = BlockModel::builder("Base").finish();
		let concrete = BlockModel::builder("Concrete").field("x", Model::u8()).finish();
		assert!(base.admits(&concrete));
		assert!(!base.admits(&Model::u8()));
	}

	#[test]
	#[should_panic(expected = "no declared field named missing")]
	fn setter_on_unknown_field_panics() {
		let _ = BlockModel::builder("B")
			.field("a", Model::u8())
			.on_build("missing", |_ctx| Ok(Value::Int(0).into()));
	}
}
