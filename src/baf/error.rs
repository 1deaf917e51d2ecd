use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Crate-local result type.
pub type Result<T> = std::result::Result<T, BafError>;

/// Error kinds produced while loading input and building a datum tree.
#[derive(Debug, Error)]
pub enum ErrorKind {
	/// Source file was malformed (loader).
	#[error("parse error: {message}")]
	Parse {
		/// Parser diagnostic text.
		message: String,
	},
	/// Required field had no input value, no setter result, and no default.
	#[error("no value, setter, or default for field {field}")]
	MissingField {
		/// Declared field name.
		field: String,
	},
	/// Value variant incompatible with the target datatype.
	#[error("type mismatch: expected {expected}, got {got}")]
	TypeMismatch {
		/// Accepted value kind(s).
		expected: &'static str,
		/// Actual value kind received.
		got: String,
	},
	/// Integer does not fit the target codec width.
	#[error("value {value} outside {codec} range {min}..={max}")]
	OutOfRange {
		/// Offending input value.
		value: i128,
		/// Codec name.
		codec: &'static str,
		/// Inclusive lower bound.
		min: i128,
		/// Inclusive upper bound.
		max: i128,
	},
	/// User preprocess or schema-level validation rejected the input.
	#[error("validation: {message}")]
	Validation {
		/// Rejection reason.
		message: String,
	},
	/// Fixed-count array received the wrong number of elements.
	#[error("expected {expected} array elements, received {got}")]
	ArrayLengthMismatch {
		/// Declared element count.
		expected: usize,
		/// Received element count.
		got: usize,
	},
	/// Scheduler completed a full pass without progress while work remained.
	#[error("could not resolve dependencies; still pending: {}", .residual.join(", "))]
	CyclicDependency {
		/// Pending fields and the datums they wait on.
		residual: Vec<String>,
	},
	/// File datatype path does not exist.
	#[error("file does not exist: {}", .path.display())]
	FileNotFound {
		/// Resolved path that was checked.
		path: PathBuf,
	},
	/// Filesystem or stream IO failure.
	#[error("io: {0}")]
	Io(#[from] std::io::Error),
	/// A user setter failed; the original cause is preserved.
	#[error("setter failed: {source}")]
	Setter {
		/// Underlying setter failure.
		source: Box<dyn std::error::Error + Send + Sync>,
	},
}

/// Build failure: an error kind plus the structural path through the
/// datum tree to the field that raised it, outermost hop first.
#[derive(Debug)]
pub struct BafError {
	/// What went wrong.
	pub kind: ErrorKind,
	/// Breadcrumb trail of `parent -> field` hops, outermost first.
	pub trail: Vec<String>,
}

impl BafError {
	pub fn new(kind: ErrorKind) -> Self {
		Self { kind, trail: Vec::new() }
	}

	/// Prepend one breadcrumb segment while unwinding.
	pub(crate) fn trace(mut self, segment: String) -> Self {
		self.trail.insert(0, segment);
		self
	}
}

impl fmt::Display for BafError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.kind)?;
		for segment in &self.trail {
			write!(f, "\n  in {segment}")?;
		}
		Ok(())
	}
}

impl std::error::Error for BafError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		std::error::Error::source(&self.kind)
	}
}

impl From<ErrorKind> for BafError {
	fn from(kind: ErrorKind) -> Self {
		BafError::new(kind)
	}
}

impl From<std::io::Error> for BafError {
	fn from(err: std::io::Error) -> Self {
		BafError::new(ErrorKind::Io(err))
	}
}
