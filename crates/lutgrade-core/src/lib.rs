//! # lutgrade-core
//!
//! Canonical 3D LUT data structures and codecs for the lutgrade engine.
//!
//! This crate covers the build-time half of the grading pipeline: parsing
//! a text-based `.cube` LUT into a canonical grid, repacking that grid
//! into a 2D RGBA8 texture a GPU can sample, and serializing the packed
//! form into the compact `.clut` binary container.
//!
//! # Types
//!
//! - [`Lut3d`] - canonical NxNxN grid, red axis varying fastest
//! - [`PackedLut`] - GPU-ready 2D texture (`width = N*N`, `height = N`)
//!
//! # Formats
//!
//! - `.cube` - line-oriented text format ([`cube`] module)
//! - `.clut` - little-endian binary container ([`clut`] module)
//!
//! # Usage
//!
//! ```rust
//! use lutgrade_core::{cube, clut, pack, Lut3d};
//!
//! let lut = Lut3d::identity(8);
//! let packed = pack(&lut);
//! let bytes = clut::encode(&packed);
//! let back = clut::decode(&bytes).unwrap();
//! assert_eq!(back.size, 8);
//! ```
//!
//! # Dependencies
//!
//! - [`thiserror`] - error handling
//!
//! # Used By
//!
//! - `lutgrade-render` - samples the packed texture
//! - `lutgrade-cache` - decodes fetched `.clut` assets

#![warn(missing_docs)]

mod error;
mod lut3d;
mod packed;
pub mod clut;
pub mod cube;

pub use error::{CoreError, CoreResult};
pub use lut3d::Lut3d;
pub use packed::{pack, PackedLut};
