//! matrix-compute: a minimal GPU compute-dispatch pipeline for dense matrix
//! multiplication.
//!
//! Two `f32` matrices are serialized with a two-element size header, uploaded
//! as read-only storage buffers, multiplied by a single WGSL compute dispatch
//! (one invocation per output cell), copied into a host-mappable staging
//! buffer, and decoded back into a [`Matrix`].
//!
//! # Features
//!
//! - Header-framed row-major matrix serialization (`[rows, cols, values...]`).
//! - Validated buffer, binding-layout, and dispatch descriptors instead of
//!   free-form device configuration.
//! - A full error taxonomy (`Result`, never a device panic) covering shape
//!   checks, device acquisition, allocation, compilation, dispatch, and
//!   readback.
//!
//! # Modules
//!
//! - [`matrix`] — The dense matrix container and its device wire layout.
//! - [`descriptor`] — Validated buffer/binding/dispatch configuration.
//! - [`gpu`] — Device + queue acquisition and WGSL source validation.
//! - [`pipeline`] — The compute pipeline itself: upload, dispatch, readback.
//! - [`manifest`] — Sample-registration metadata, decoupled from the core.
//! - [`error`] — The pipeline error taxonomy.
//!
//! # Example
//!
//! ```rust,no_run
//! use matrix_compute::{matmul_shared, Matrix};
//!
//! let a = Matrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]);
//! let b = Matrix::identity(2);
//! let c = matmul_shared(&a, &b)?;
//! assert_eq!(c.data(), a.data());
//! # Ok::<(), matrix_compute::PipelineError>(())
//! ```

pub mod descriptor;
pub mod error;
pub mod gpu;
pub mod manifest;
pub mod matrix;
pub mod pipeline;

pub use error::PipelineError;
pub use gpu::GpuContext;
pub use matrix::Matrix;
pub use pipeline::{matmul, matmul_shared};
