use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::baf::datum::{Arena, BuildState, Datum, DatumId, DatumRef, Input, Pending};
use crate::baf::error::{BafError, ErrorKind, Result};
use crate::baf::model::{BlockModel, BytesModel, FieldDecl, Model};
use crate::baf::scalar::{ByteOrder, ScalarKind};
use crate::baf::value::{Value, ValueMap};

/// Build-global configuration.
#[derive(Debug, Clone)]
pub struct BuildOptions {
	/// Byte order applied to every scalar encoding.
	pub byte_order: ByteOrder,
	/// Base directory for relative File paths, exposed to setters.
	pub root_path: PathBuf,
}

impl Default for BuildOptions {
	fn default() -> Self {
		Self {
			byte_order: ByteOrder::default(),
			root_path: PathBuf::from("."),
		}
	}
}

/// Build a datum tree from a loaded value tree, resolving setter
/// dependencies pass by pass until every field is complete.
pub fn build(model: &Model, input: Value, root_path: impl Into<PathBuf>) -> Result<Datum> {
	build_with(
		model,
		input,
		BuildOptions {
			root_path: root_path.into(),
			..BuildOptions::default()
		},
	)
}

/// [`build`] with explicit options (byte-order override).
pub fn build_with(model: &Model, input: Value, options: BuildOptions) -> Result<Datum> {
	let mut builder = Builder {
		arena: Arena::new(),
		options,
		completed: 0,
		pending: 0,
	};

	let label = model.type_name().into_boxed_str();
	let root = builder.arena.instantiate(model, None, label);
	let node = builder.arena.node_mut(root);
	node.input = Some(Input::Value(input));
	node.input_derived = true;

	let mut passes = 0_u32;
	loop {
		passes += 1;
		builder.pass(root)?;
		debug!(passes, completed = builder.completed, pending = builder.pending, "build pass finished");
		if builder.pending == 0 {
			break;
		}
		if builder.completed == 0 {
			return Err(ErrorKind::CyclicDependency {
				residual: builder.residual(root),
			}
			.into());
		}
	}

	Ok(Datum {
		arena: builder.arena,
		root,
	})
}

/// Value returned by a user setter.
pub enum SetterValue {
	/// Concrete input value, built by the field's declared model.
	Value(Value),
	/// No value; allowed only for Optional fields.
	Absent,
	/// Already-built datum, grafted into the declared slot as-is.
	Datum(Datum),
	/// Resolve the slot to `model`, then build it with the value. The
	/// declared model acts as a variant bound.
	Typed(Model, Value),
	/// Array elements, each optionally carrying its own model.
	Entries(Vec<ArrayEntry>),
}

impl From<Value> for SetterValue {
	fn from(value: Value) -> Self {
		SetterValue::Value(value)
	}
}

impl From<usize> for SetterValue {
	fn from(value: usize) -> Self {
		SetterValue::Value(Value::Int(value as i128))
	}
}

impl From<i128> for SetterValue {
	fn from(value: i128) -> Self {
		SetterValue::Value(Value::Int(value))
	}
}

impl From<i64> for SetterValue {
	fn from(value: i64) -> Self {
		SetterValue::Value(Value::Int(i128::from(value)))
	}
}

impl From<u64> for SetterValue {
	fn from(value: u64) -> Self {
		SetterValue::Value(Value::Int(i128::from(value)))
	}
}

impl From<&str> for SetterValue {
	fn from(value: &str) -> Self {
		SetterValue::Value(Value::Str(value.to_owned()))
	}
}

impl From<Vec<u8>> for SetterValue {
	fn from(value: Vec<u8>) -> Self {
		SetterValue::Value(Value::Bytes(value))
	}
}

/// One array element handed to an Array field by a setter.
pub enum ArrayEntry {
	/// Built with the declared element model.
	Value(Value),
	/// Built with its own concrete model.
	Typed(Model, Value),
	/// Pre-built subtree inserted as-is.
	Datum(Datum),
}

/// Why a setter did not produce a value: suspended on an unresolved
/// datum, or failed outright. [`Pending`] converts into this, so
/// `ctx.sibling("x")?.size()?` defers the field with `?` alone.
#[derive(Debug)]
pub enum SetterAbort {
	/// Suspend this field until the given datum resolves.
	Pending(Pending),
	/// Abort the build with the given cause.
	Fail(Box<dyn std::error::Error + Send + Sync>),
}

impl SetterAbort {
	pub fn fail(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
		SetterAbort::Fail(cause.into())
	}
}

impl From<Pending> for SetterAbort {
	fn from(pending: Pending) -> Self {
		SetterAbort::Pending(pending)
	}
}

impl From<BafError> for SetterAbort {
	fn from(err: BafError) -> Self {
		SetterAbort::Fail(Box::new(err))
	}
}

impl From<ErrorKind> for SetterAbort {
	fn from(kind: ErrorKind) -> Self {
		SetterAbort::Fail(Box::new(BafError::new(kind)))
	}
}

/// Result type every setter returns.
pub type SetterResult = std::result::Result<SetterValue, SetterAbort>;

/// Build context handed to a setter: the owning block's input mapping
/// plus read-only access to the datum tree.
pub struct SetterCtx<'a> {
	arena: &'a Arena,
	block: DatumId,
	input: &'a ValueMap,
	root_path: &'a Path,
}

impl<'a> SetterCtx<'a> {
	/// The owning block's full input mapping.
	pub fn input(&self) -> &ValueMap {
		self.input
	}

	/// Base directory of the current build.
	pub fn root_path(&self) -> &Path {
		self.root_path
	}

	/// Look up a sibling datum of the field being set. Unknown names are
	/// a schema error and abort the build.
	pub fn sibling(&self, name: &str) -> std::result::Result<DatumRef<'a>, SetterAbort> {
		let node = self.arena.node(self.block);
		node.children
			.iter()
			.copied()
			.find(|&child| self.arena.node(child).label.as_ref() == name)
			.map(|id| DatumRef { arena: self.arena, id })
			.ok_or_else(|| {
				SetterAbort::from(ErrorKind::Validation {
					message: format!("no field named {name}"),
				})
			})
	}

	/// The root datum, for navigating to cousins via [`DatumRef::child`].
	pub fn root(&self) -> DatumRef<'a> {
		let mut id = self.block;
		while let Some(parent) = self.arena.node(id).parent {
			id = parent;
		}
		DatumRef { arena: self.arena, id }
	}

	/// Defer this field until the named sibling is complete, before any
	/// other setter work happens.
	pub fn force_dependency(&self, name: &str) -> std::result::Result<(), SetterAbort> {
		let datum = self.sibling(name)?;
		if datum.is_complete() {
			Ok(())
		} else {
			Err(SetterAbort::Pending(Pending(datum.id)))
		}
	}
}

enum Derive {
	Ready,
	Deferred(DatumId),
	/// The slot was filled by a grafted pre-built datum.
	Grafted,
}

struct Builder {
	arena: Arena,
	options: BuildOptions,
	/// Datums that completed during the current pass.
	completed: usize,
	/// Datums still pending at the end of the current pass.
	pending: usize,
}

impl Builder {
	fn pass(&mut self, root: DatumId) -> Result<()> {
		self.completed = 0;
		self.pending = 0;
		self.attempt(root)
	}

	fn attempt(&mut self, id: DatumId) -> Result<()> {
		if self.arena.node(id).state == BuildState::Complete {
			return Ok(());
		}
		let model = self.arena.node(id).model.clone();
		match model {
			Model::Scalar(kind) => self.attempt_scalar(id, kind),
			Model::Bytes(decl) => self.attempt_bytes(id, decl),
			Model::File => self.attempt_file(id),
			Model::Align(multiple) => self.attempt_align(id, multiple),
			Model::Optional(inner) => self.attempt_optional(id, &inner),
			Model::Array(array) => {
				let elem = array.elem.clone();
				let count = array.count;
				self.attempt_array(id, elem, count)
			}
			Model::Block(block) => self.attempt_block(id, block),
		}
	}

	fn attempt_scalar(&mut self, id: DatumId, kind: ScalarKind) -> Result<()> {
		let value = match self.input_value(id) {
			Value::Int(value) => *value,
			other => {
				return Err(ErrorKind::TypeMismatch {
					expected: "int",
					got: other.kind_name().to_owned(),
				}
				.into());
			}
		};
		let bytes = kind.encode(value, self.options.byte_order).map_err(BafError::new)?;
		self.arena.node_mut(id).int_value = Some(value);
		self.complete_leaf(id, bytes);
		Ok(())
	}

	fn attempt_bytes(&mut self, id: DatumId, decl: BytesModel) -> Result<()> {
		let payload = match self.input_value(id) {
			Value::Bytes(bytes) => bytes.clone(),
			Value::Str(text) => text.clone().into_bytes(),
			other => {
				return Err(ErrorKind::TypeMismatch {
					expected: "bytes or str",
					got: other.kind_name().to_owned(),
				}
				.into());
			}
		};
		if let Some(size) = decl.size {
			if payload.len() != size {
				return Err(ErrorKind::Validation {
					message: format!("expected {size} bytes but data is {} bytes", payload.len()),
				}
				.into());
			}
		}
		self.complete_leaf(id, payload);
		Ok(())
	}

	fn attempt_file(&mut self, id: DatumId) -> Result<()> {
		let mut path = match self.input_value(id) {
			Value::Str(text) => PathBuf::from(text),
			other => {
				return Err(ErrorKind::TypeMismatch {
					expected: "str",
					got: other.kind_name().to_owned(),
				}
				.into());
			}
		};
		if path.is_relative() {
			path = self.options.root_path.join(path);
		}
		if !path.exists() {
			return Err(ErrorKind::FileNotFound { path }.into());
		}
		let bytes = std::fs::read(&path)?;
		debug!(path = %path.display(), size = bytes.len(), "file payload read");
		self.complete_leaf(id, bytes);
		Ok(())
	}

	fn attempt_align(&mut self, id: DatumId, multiple: usize) -> Result<()> {
		// The public Align variant can be built around Model::align.
		assert!(multiple >= 1, "align modulus must be at least 1");
		if multiple == 1 {
			self.complete_leaf(id, Vec::new());
			return Ok(());
		}
		match self.arena.offset_of(id) {
			Err(Pending(on)) => {
				self.defer(id, on);
				Ok(())
			}
			Ok(offset) => {
				let pad = (multiple - offset % multiple) % multiple;
				self.complete_leaf(id, vec![0; pad]);
				Ok(())
			}
		}
	}

	fn attempt_optional(&mut self, id: DatumId, inner: &Model) -> Result<()> {
		if !self.arena.node(id).expanded {
			let absent = matches!(self.arena.node(id).input, Some(Input::Absent) | Some(Input::Value(Value::Null)));
			if absent {
				self.complete_leaf(id, Vec::new());
				return Ok(());
			}
			let Some(Input::Value(value)) = self.arena.node_mut(id).input.take() else {
				unreachable!("optional attempted without input")
			};
			let label = inner.type_name().into_boxed_str();
			let child = self.arena.instantiate(inner, Some(id), label);
			let child_node = self.arena.node_mut(child);
			child_node.input = Some(Input::Value(value));
			child_node.input_derived = true;
			let node = self.arena.node_mut(id);
			node.children.push(child);
			node.expanded = true;
		}

		let child = self.arena.node(id).children[0];
		self.attempt(child)?;
		if self.arena.node(child).state == BuildState::Complete {
			self.complete_container(id);
		}
		Ok(())
	}

	fn attempt_array(&mut self, id: DatumId, elem: Option<Model>, count: Option<usize>) -> Result<()> {
		if !self.arena.node(id).expanded {
			self.expand_array(id, &elem, count)?;
		}

		let children = self.arena.node(id).children.clone();
		for (index, child) in children.iter().copied().enumerate() {
			if self.arena.node(child).state == BuildState::Complete {
				continue;
			}
			if let Err(err) = self.attempt(child) {
				return Err(err.trace(self.element_segment(&elem, child, index)));
			}
		}

		let all_complete = self
			.arena
			.node(id)
			.children
			.iter()
			.all(|&child| self.arena.node(child).state == BuildState::Complete);
		if all_complete {
			self.complete_container(id);
		}
		Ok(())
	}

	fn expand_array(&mut self, id: DatumId, elem: &Option<Model>, count: Option<usize>) -> Result<()> {
		let entries: Vec<ArrayEntry> = match self.arena.node_mut(id).input.take() {
			Some(Input::Value(Value::List(items))) => items.into_iter().map(ArrayEntry::Value).collect(),
			Some(Input::Entries(entries)) => entries,
			Some(Input::Value(other)) => {
				return Err(ErrorKind::TypeMismatch {
					expected: "list",
					got: other.kind_name().to_owned(),
				}
				.into());
			}
			_ => unreachable!("array attempted without input"),
		};

		if let Some(count) = count {
			if entries.len() != count {
				return Err(ErrorKind::ArrayLengthMismatch {
					expected: count,
					got: entries.len(),
				}
				.into());
			}
		}

		for (index, entry) in entries.into_iter().enumerate() {
			let label: Box<str> = format!("[{index}]").into();
			let child = match entry {
				ArrayEntry::Value(value) => {
					let Some(model) = elem else {
						return Err(ErrorKind::Validation {
							message: "array declares no element model; entries must carry one".to_owned(),
						}
						.trace_element(elem, None, index));
					};
					let child = self.arena.instantiate(model, Some(id), label);
					let node = self.arena.node_mut(child);
					node.input = Some(Input::Value(value));
					node.input_derived = true;
					child
				}
				ArrayEntry::Typed(model, value) => {
					if let Some(declared) = elem {
						if !declared.admits(&model) {
							return Err(ErrorKind::TypeMismatch {
								expected: variant_name(declared),
								got: model.type_name(),
							}
							.trace_element(elem, Some(&model), index));
						}
					}
					let child = self.arena.instantiate(&model, Some(id), label);
					let node = self.arena.node_mut(child);
					node.input = Some(Input::Value(value));
					node.input_derived = true;
					child
				}
				ArrayEntry::Datum(tree) => {
					self.completed += 1;
					self.arena.graft(tree, id, label)
				}
			};
			self.arena.node_mut(id).children.push(child);
		}

		self.arena.node_mut(id).expanded = true;
		Ok(())
	}

	fn element_segment(&self, elem: &Option<Model>, child: DatumId, index: usize) -> String {
		let elem_name = match elem {
			Some(model) => model.type_name(),
			None => self.arena.node(child).model.type_name(),
		};
		format!("Array[{elem_name}] -> (element {index})")
	}

	fn attempt_block(&mut self, id: DatumId, block: Arc<BlockModel>) -> Result<()> {
		match &self.arena.node(id).input {
			Some(Input::Value(Value::Map(_))) => {}
			Some(Input::Value(other)) => {
				return Err(ErrorKind::TypeMismatch {
					expected: "map",
					got: other.kind_name().to_owned(),
				}
				.into());
			}
			_ => unreachable!("block attempted without input"),
		}

		for (index, field) in block.fields.iter().enumerate() {
			let child = self.arena.node(id).children[index];
			if self.arena.node(child).state == BuildState::Complete {
				continue;
			}

			if let Err(err) = self.step_field(id, field, index) {
				let child = self.arena.node(id).children[index];
				let segment = format!(
					"{} -> {}: {}",
					block.type_name,
					field.name,
					self.arena.node(child).model.type_name()
				);
				return Err(err.trace(segment));
			}
		}

		let all_complete = self
			.arena
			.node(id)
			.children
			.iter()
			.all(|&child| self.arena.node(child).state == BuildState::Complete);
		if all_complete {
			self.complete_container(id);
		}
		Ok(())
	}

	/// Derive one field's input if needed, then attempt its build.
	fn step_field(&mut self, block_id: DatumId, field: &FieldDecl, index: usize) -> Result<()> {
		let mut child = self.arena.node(block_id).children[index];
		if !self.arena.node(child).input_derived {
			match self.derive_input(block_id, field, child)? {
				Derive::Ready => {}
				Derive::Deferred(on) => {
					self.defer(child, on);
					return Ok(());
				}
				Derive::Grafted => return Ok(()),
			}
			child = self.arena.node(block_id).children[index];
		}
		self.attempt(child)
	}

	/// Resolve a field's input: setter, then input mapping, then declared
	/// default; Optional falls back to absent, anything else is missing.
	fn derive_input(&mut self, block_id: DatumId, field: &FieldDecl, child: DatumId) -> Result<Derive> {
		if let Some(setter) = field.setter.clone() {
			let outcome = {
				let ctx = SetterCtx {
					arena: &self.arena,
					block: block_id,
					input: self.block_input(block_id),
					root_path: &self.options.root_path,
				};
				setter(&ctx)
			};
			let value = match outcome {
				Ok(value) => value,
				Err(SetterAbort::Pending(Pending(on))) => {
					trace!(field = %field.name, "setter deferred");
					return Ok(Derive::Deferred(on));
				}
				Err(SetterAbort::Fail(cause)) => {
					return Err(match cause.downcast::<BafError>() {
						Ok(err) => *err,
						Err(cause) => ErrorKind::Setter { source: cause }.into(),
					});
				}
			};
			return self.accept_setter_value(block_id, field, child, value);
		}

		if let Some(value) = self.block_input(block_id).get(&field.name).cloned() {
			self.set_child_value(field, child, value)?;
			return Ok(Derive::Ready);
		}

		if let Some(default) = field.default.clone() {
			self.set_child_value(field, child, default)?;
			return Ok(Derive::Ready);
		}

		if matches!(field.model, Model::Optional(_)) {
			let node = self.arena.node_mut(child);
			node.input = Some(Input::Absent);
			node.input_derived = true;
			return Ok(Derive::Ready);
		}

		Err(ErrorKind::MissingField {
			field: field.name.to_string(),
		}
		.into())
	}

	fn accept_setter_value(&mut self, block_id: DatumId, field: &FieldDecl, child: DatumId, value: SetterValue) -> Result<Derive> {
		match value {
			SetterValue::Value(value) => {
				self.set_child_value(field, child, value)?;
				Ok(Derive::Ready)
			}
			SetterValue::Absent => {
				if !matches!(field.model, Model::Optional(_)) {
					return Err(ErrorKind::Validation {
						message: format!("setter returned no value for non-optional field {}", field.name),
					}
					.into());
				}
				let node = self.arena.node_mut(child);
				node.input = Some(Input::Absent);
				node.input_derived = true;
				Ok(Derive::Ready)
			}
			SetterValue::Typed(model, value) => {
				if !field.model.admits(&model) {
					return Err(ErrorKind::TypeMismatch {
						expected: variant_name(&field.model),
						got: model.type_name(),
					}
					.into());
				}
				self.arena.reshape(child, &model);
				self.set_child_value(field, child, value)?;
				Ok(Derive::Ready)
			}
			SetterValue::Datum(tree) => {
				let grafted = self.arena.graft(tree, block_id, field.name.clone());
				let index = self
					.arena
					.node(block_id)
					.children
					.iter()
					.position(|&slot| slot == child)
					.unwrap_or_else(|| unreachable!("field slot missing from block children"));
				self.arena.node_mut(block_id).children[index] = grafted;
				self.completed += 1;
				Ok(Derive::Grafted)
			}
			SetterValue::Entries(entries) => {
				if !matches!(field.model, Model::Array(_)) {
					return Err(ErrorKind::Validation {
						message: format!("setter returned array entries for non-array field {}", field.name),
					}
					.into());
				}
				let node = self.arena.node_mut(child);
				node.input = Some(Input::Entries(entries));
				node.input_derived = true;
				Ok(Derive::Ready)
			}
		}
	}

	fn set_child_value(&mut self, field: &FieldDecl, child: DatumId, value: Value) -> Result<()> {
		let value = match &field.preprocess {
			Some(preprocess) => preprocess(value)?,
			None => value,
		};
		let node = self.arena.node_mut(child);
		node.input = Some(Input::Value(value));
		node.input_derived = true;
		Ok(())
	}

	fn block_input(&self, id: DatumId) -> &ValueMap {
		match &self.arena.node(id).input {
			Some(Input::Value(Value::Map(map))) => map,
			_ => unreachable!("block input is not a mapping"),
		}
	}

	fn input_value(&self, id: DatumId) -> &Value {
		match &self.arena.node(id).input {
			Some(Input::Value(value)) => value,
			_ => unreachable!("datum attempted without input"),
		}
	}

	fn complete_leaf(&mut self, id: DatumId, bytes: Vec<u8>) {
		let node = self.arena.node_mut(id);
		node.size = Some(bytes.len());
		node.bytes = Some(bytes);
		node.state = BuildState::Complete;
		node.pending_on = None;
		self.completed += 1;
	}

	fn complete_container(&mut self, id: DatumId) {
		let size = self
			.arena
			.node(id)
			.children
			.iter()
			.map(|&child| self.arena.node(child).size.unwrap_or(0))
			.sum();
		let node = self.arena.node_mut(id);
		node.size = Some(size);
		node.state = BuildState::Complete;
		node.pending_on = None;
		self.completed += 1;
	}

	fn defer(&mut self, id: DatumId, on: DatumId) {
		let node = self.arena.node_mut(id);
		node.state = BuildState::Pending;
		node.pending_on = Some(on);
		self.pending += 1;
		trace!(datum = %self.arena.node(id).label, target = %self.arena.node(on).label, "datum deferred");
	}

	fn residual(&self, root: DatumId) -> Vec<String> {
		let mut out = Vec::new();
		self.collect_residual(root, &mut out);
		out
	}

	fn collect_residual(&self, id: DatumId, out: &mut Vec<String>) {
		let node = self.arena.node(id);
		if node.state == BuildState::Pending {
			out.push(match node.pending_on {
				Some(on) => format!("{} (pending on {})", node.label, self.arena.node(on).label),
				None => node.label.to_string(),
			});
		}
		for &child in &node.children {
			self.collect_residual(child, out);
		}
	}
}

fn variant_name(model: &Model) -> &'static str {
	match model {
		Model::Scalar(_) => "scalar",
		Model::Bytes(_) => "bytes",
		Model::File => "file",
		Model::Array(_) => "array",
		Model::Optional(_) => "optional",
		Model::Align(_) => "align",
		Model::Block(_) => "block",
	}
}

impl ErrorKind {
	fn trace_element(self, elem: &Option<Model>, concrete: Option<&Model>, index: usize) -> BafError {
		let elem_name = match (elem, concrete) {
			(Some(model), _) => model.type_name(),
			(None, Some(model)) => model.type_name(),
			(None, None) => "?".to_owned(),
		};
		BafError::new(self).trace(format!("Array[{elem_name}] -> (element {index})"))
	}
}
