mod build;
mod datum;
mod error;
mod loader;
mod model;
mod scalar;
mod value;
mod visualize;

/// Build entry points, options, and the setter interface.
pub use build::{ArrayEntry, BuildOptions, SetterAbort, SetterCtx, SetterResult, SetterValue, build, build_with};
/// Datum tree handle, non-owning references, and resolution markers.
pub use datum::{Datum, DatumId, DatumRef, Pending, Resolve};
/// Error and result aliases.
pub use error::{BafError, ErrorKind, Result};
/// TOML and JSON front-end loaders.
pub use loader::{build_json, build_toml};
/// Schema model types and the block builder.
pub use model::{BlockBuilder, BlockModel, Model};
/// Fixed-width integer codecs and byte-order configuration.
pub use scalar::{ByteOrder, ScalarKind};
/// Tagged input value tree.
pub use value::{Value, ValueMap};
/// Datum tree pretty-printer.
pub use visualize::visualize;
