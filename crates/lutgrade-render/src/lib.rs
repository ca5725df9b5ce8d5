//! LUT sampling engine for the lutgrade pipeline.
//!
//! Applies a packed 3D LUT ([`lutgrade_core::PackedLut`]) to an RGBA8
//! image. The packed texture stores blue slices side by side in a 2D
//! layout, so a full trilinear lookup decomposes into two bilinear taps
//! (red/green) plus one manual lerp (blue) — the same trick the layout
//! was designed for on 2D-only GPU pipelines.
//!
//! # Architecture
//!
//! ```text
//! Sampler
//!   ├── CPU path (rayon, always available, bit-reproducible)
//!   └── GPU path (wgpu compute shader, `wgpu` feature)
//! ```
//!
//! Both paths implement the identical per-pixel algorithm; the CPU path
//! is the reference the tests pin.

pub mod image;
pub mod sampler;

#[cfg(feature = "wgpu")]
mod gpu;
#[cfg(feature = "wgpu")]
mod shaders;

pub use image::Rgba8Image;
pub use sampler::{Backend, Sampler, DEFAULT_MAX_TEXTURE_SIZE};

use thiserror::Error;

/// Render pipeline errors.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Image buffer does not match its declared dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// No suitable GPU adapter found.
    #[error("no suitable GPU adapter found")]
    NoAdapter,

    /// GPU device creation failed.
    #[error("failed to create device: {0}")]
    DeviceCreation(String),

    /// Requested backend is not compiled in or not available.
    #[error("backend not available: {0}")]
    BackendNotAvailable(String),

    /// A GPU dispatch or readback failed.
    #[error("render operation failed: {0}")]
    OperationFailed(String),
}

/// Result type for render operations.
pub type RenderResult<T> = Result<T, RenderError>;
