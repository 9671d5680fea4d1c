//! hypercube provides N-dimensional arrays of primitive values with
//! interchangeable storage backends and zero-copy views.
//!
//! # Cubes and storage
//!
//! Every cube implements the [Hypercube] trait, which addresses elements
//! either by a coordinate per axis or by a flat position in row-major order,
//! and moves runs of elements in bulk with
//! [`to_flattened`](Hypercube::to_flattened) and
//! [`from_flattened`](Hypercube::from_flattened). The element type is one of
//! the [Element] types: `f64`, `f32`, `i64`, `i32` or `bool`.
//!
//! The storage backends are:
//!
//! | Backend | Storage |
//! | ------- | ------- |
//! | [ArrayCube] | Dense, in memory |
//! | [SparseCube] | Hash map of the elements which differ from a null value |
//! | [RaggedCube] | Nested `Vec`s supplied by the caller, which may be ragged |
//! | [BitSetCube] | Packed bits, for `bool` elements |
//! | [MappedCube] | Memory-mapped file, compatible with `numpy.memmap` (`mmap` feature) |
//!
//! # Views
//!
//! A [Cube] is a shared handle to a cube of any kind. Its view-producing
//! methods, such as [`slice`](Cube::slice), [`roll`](Cube::roll),
//! [`transpose`](Cube::transpose), [`mask`](Cube::mask) and
//! [`cast`](Cube::cast), return new cubes which read and write through to the
//! original storage without copying:
//!
//! ```
//! use hypercube::{ArrayCube, Cube, Hypercube};
//!
//! let data = (0..6).map(|x| x as f64).collect();
//! let cube = Cube::new(ArrayCube::from_vec(&[2, 3], data).unwrap());
//!
//! let rolled = cube.roll(&[1, 0]).unwrap();
//! assert_eq!(hypercube::ops::to_vec(&rolled).unwrap(), [3., 4., 5., 0., 1., 2.]);
//!
//! let transposed = cube.transpose();
//! transposed.set(&[2, 1], -1.).unwrap();
//! assert_eq!(cube.get(&[1, 2]).unwrap(), -1.);
//! ```
//!
//! Views which undo each other collapse, so `cube.transpose().transpose()`
//! returns a handle to `cube` itself.
//!
//! # Diagnostics
//!
//! Setting the `HYPERCUBE_TRACE` environment variable to `1` logs view
//! construction and bulk transfers to stderr.
//!
//! # Serialization
//!
//! Dense cubes can be serialized and deserialized using
//! [serde](https://serde.rs) if the `serde` feature is enabled. Any [Cube]
//! can be serialized, producing the same representation as a dense cube with
//! its elements:
//!
//! ```json
//! {
//!   "shape": [2, 2],
//!   "data": [0.5, 1.0, 1.5, 2.0]
//! }
//! ```
//!
//! JSON has no representation for NaN, which `serde_json` writes as `null`.
//! Such documents are rejected when deserialized, so floating-point cubes
//! containing NaN, including new [ArrayCube]s which are NaN-filled, only
//! round-trip through formats which can represent it.

pub mod accessor;
mod bit_set;
mod cast;
mod cube;
mod dimension;
mod element;
pub mod env;
pub mod errors;
pub mod index;
pub mod layout;
pub mod ops;
pub mod storage;
mod view;

#[cfg(feature = "serde")]
mod impl_serialize;

// Re-exports for convenience.
pub use accessor::{Accessor, IntoAccessors, SliceRange};
pub use bit_set::BitSet;
pub use cast::CastCube;
pub use cube::{Cube, Hypercube};
pub use dimension::Dimension;
pub use element::{CastFrom, Element};
pub use errors::HypercubeError;
#[cfg(feature = "mmap")]
pub use storage::MappedCube;
pub use storage::{ArrayCube, BitSetCube, Nested, RaggedCube, SparseCube, SparseOptions};
pub use view::{SlicedAxis, Transform, View};
