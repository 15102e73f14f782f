//! Utility types and functions for NIF.
//!
//! This module contains fundamental types used throughout the library:
//! - [`Endian`] / [`ByteReader`] - Runtime byte order and bounds-checked reads
//! - [`AttributeDataType`] - Vertex attribute element types
//! - [`Error`] / [`Result`] - Error handling
//! - Math type re-exports from glam

mod endian;
mod error;
mod math;
mod pod;

pub use endian::*;
pub use error::*;
pub use math::*;
pub use pod::*;
