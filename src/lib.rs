//! Public library API for compiling structured source data into
//! byte-exact binary files.

/// Schema models, datum trees, the build scheduler, loaders, and the
/// tree visualizer.
pub mod baf;
