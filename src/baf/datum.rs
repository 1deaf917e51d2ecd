use crate::baf::build::ArrayEntry;
use crate::baf::model::Model;
use crate::baf::value::Value;

/// Index of a datum inside its build arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DatumId(pub(crate) u32);

/// Marker for a size or offset query blocked on a datum that has not
/// resolved yet. The scheduler treats it as a deferral signal.
#[derive(Debug, Clone, Copy)]
pub struct Pending(pub DatumId);

/// Result of a query that may be blocked on an unresolved datum.
pub type Resolve<T> = std::result::Result<T, Pending>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BuildState {
	Unstarted,
	Pending,
	Complete,
}

/// Input derived for a datum, awaiting its build.
pub(crate) enum Input {
	Value(Value),
	/// Array elements handed over by a setter, possibly carrying their
	/// own models or pre-built subtrees.
	Entries(Vec<ArrayEntry>),
	/// Optional resolved to no payload.
	Absent,
}

/// Per-build instance of a model.
pub(crate) struct DatumNode {
	pub model: Model,
	pub parent: Option<DatumId>,
	/// Field name, `[k]` for array elements, or the type name for roots.
	pub label: Box<str>,
	pub state: BuildState,
	/// Child datums in canonical (declaration) order.
	pub children: Vec<DatumId>,
	/// Leaf payload once built; containers concatenate children instead.
	pub bytes: Option<Vec<u8>>,
	/// Cached at completion; before that, only the model's static size
	/// answers queries.
	pub size: Option<usize>,
	pub input: Option<Input>,
	/// Latched once the input is derived, so setters run at most once
	/// after they stop deferring.
	pub input_derived: bool,
	/// Built scalar value, readable from setters.
	pub int_value: Option<i128>,
	/// What this datum deferred on in the current pass.
	pub pending_on: Option<DatumId>,
	/// Container children have been instantiated.
	pub expanded: bool,
}

/// Owner of every datum in one build. Parent and child links are ids,
/// never owning pointers.
pub(crate) struct Arena {
	nodes: Vec<DatumNode>,
}

impl Arena {
	pub fn new() -> Self {
		Self { nodes: Vec::new() }
	}

	pub fn node(&self, id: DatumId) -> &DatumNode {
		&self.nodes[id.0 as usize]
	}

	pub fn node_mut(&mut self, id: DatumId) -> &mut DatumNode {
		&mut self.nodes[id.0 as usize]
	}

	/// Produce a datum for `model`. Block children are pre-instantiated
	/// recursively so sibling offset queries work before they build.
	pub fn instantiate(&mut self, model: &Model, parent: Option<DatumId>, label: Box<str>) -> DatumId {
		let id = DatumId(self.nodes.len() as u32);
		self.nodes.push(DatumNode {
			model: model.clone(),
			parent,
			label,
			state: BuildState::Unstarted,
			children: Vec::new(),
			bytes: None,
			size: None,
			input: None,
			// Align takes no input.
			input_derived: matches!(model, Model::Align(_)),
			int_value: None,
			pending_on: None,
			expanded: false,
		});

		if let Model::Block(block) = model {
			let fields: Vec<(Box<str>, Model)> = block
				.fields
				.iter()
				.map(|field| (field.name.clone(), field.model.clone()))
				.collect();
			for (name, field_model) in fields {
				let child = self.instantiate(&field_model, Some(id), name);
				self.node_mut(id).children.push(child);
			}
			self.node_mut(id).expanded = true;
		}

		id
	}

	/// Swap the model of a not-yet-built datum slot, re-instantiating
	/// block children for the concrete model.
	pub fn reshape(&mut self, id: DatumId, model: &Model) {
		self.node_mut(id).children.clear();
		self.node_mut(id).model = model.clone();
		if let Model::Block(block) = model {
			let fields: Vec<(Box<str>, Model)> = block
				.fields
				.iter()
				.map(|field| (field.name.clone(), field.model.clone()))
				.collect();
			for (name, field_model) in fields {
				let child = self.instantiate(&field_model, Some(id), name);
				self.node_mut(id).children.push(child);
			}
			self.node_mut(id).expanded = true;
		}
	}

	/// Size of a datum: the built length once complete, else the model's
	/// static size, else blocked on the datum itself.
	pub fn size_of(&self, id: DatumId) -> Resolve<usize> {
		let node = self.node(id);
		if let Some(size) = node.size {
			return Ok(size);
		}
		node.model.static_size().ok_or(Pending(id))
	}

	/// Offset of a datum relative to the root: the parent's offset plus
	/// the sizes of all preceding siblings in declaration order.
	pub fn offset_of(&self, id: DatumId) -> Resolve<usize> {
		let Some(parent) = self.node(id).parent else {
			return Ok(0);
		};

		let mut offset = self.offset_of(parent)?;
		for &sibling in &self.node(parent).children {
			if sibling == id {
				return Ok(offset);
			}
			offset += self.size_of(sibling)?;
		}
		unreachable!("datum is not among its parent's children")
	}

	/// Serialized bytes of a complete datum: leaf payload, or children
	/// concatenated in declaration order.
	pub fn bytes_of(&self, id: DatumId) -> Vec<u8> {
		let node = self.node(id);
		if let Some(bytes) = &node.bytes {
			return bytes.clone();
		}
		let mut out = Vec::with_capacity(node.size.unwrap_or(0));
		for &child in &node.children {
			out.extend_from_slice(&self.bytes_of(child));
		}
		out
	}

	/// Move every node of a finished out-of-band build into this arena,
	/// re-parenting its root under `parent`. Offsets are never cached, so
	/// they recompute lazily against the new position.
	pub fn graft(&mut self, tree: Datum, parent: DatumId, label: Box<str>) -> DatumId {
		let base = self.nodes.len() as u32;
		let remap = |id: DatumId| DatumId(id.0 + base);

		for mut node in tree.arena.nodes {
			node.parent = node.parent.map(remap);
			node.pending_on = node.pending_on.map(remap);
			for child in &mut node.children {
				*child = remap(*child);
			}
			self.nodes.push(node);
		}

		let root = remap(tree.root);
		let root_node = self.node_mut(root);
		root_node.parent = Some(parent);
		root_node.label = label;
		root
	}
}

/// A fully built datum tree, as returned by [`build`](crate::baf::build).
pub struct Datum {
	pub(crate) arena: Arena,
	pub(crate) root: DatumId,
}

impl std::fmt::Debug for Datum {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Datum").field("size", &self.size()).finish()
	}
}

impl Datum {
	/// Final output: the root datum's serialized bytes.
	pub fn get_bytes(&self) -> Vec<u8> {
		self.arena.bytes_of(self.root)
	}

	/// Total size of the output in bytes.
	pub fn size(&self) -> usize {
		self.arena.node(self.root).size.unwrap_or(0)
	}

	/// Render the datum tree with offsets and sizes.
	pub fn visualize(&self) -> String {
		crate::baf::visualize::visualize(self)
	}
}

/// Read-only view of one datum during a build, handed to setters for
/// size and offset queries.
#[derive(Clone, Copy)]
pub struct DatumRef<'a> {
	pub(crate) arena: &'a Arena,
	pub(crate) id: DatumId,
}

impl<'a> DatumRef<'a> {
	pub fn is_complete(&self) -> bool {
		self.arena.node(self.id).state == BuildState::Complete
	}

	/// Size in bytes once this datum is complete. Setters observe a
	/// binary snapshot: a sibling is either complete (stable) or pending,
	/// so an unbuilt datum defers even when its model is statically
	/// sized.
	pub fn size(&self) -> Resolve<usize> {
		if self.is_complete() {
			self.arena.size_of(self.id)
		} else {
			Err(Pending(self.id))
		}
	}

	/// Offset relative to the root datum, or [`Pending`] if any
	/// preceding sibling is unresolved.
	pub fn offset(&self) -> Resolve<usize> {
		self.arena.offset_of(self.id)
	}

	/// Built integer value of a scalar datum; [`Pending`] until the
	/// scalar completes (and forever for non-scalars).
	pub fn int_value(&self) -> Resolve<i128> {
		self.arena.node(self.id).int_value.ok_or(Pending(self.id))
	}

	/// Navigate to a named child of a block datum.
	pub fn child(&self, name: &str) -> Option<DatumRef<'a>> {
		let node = self.arena.node(self.id);
		node.children
			.iter()
			.copied()
			.find(|&child| self.arena.node(child).label.as_ref() == name)
			.map(|id| DatumRef { arena: self.arena, id })
	}
}
