//! Error taxonomy for the matrix compute pipeline.
//!
//! Every failure mode is returned as a [`PipelineError`] variant; nothing in
//! this crate surfaces device faults as panics. Caller errors (shape
//! mismatches) are rejected before any device work, so the harness can tell
//! its own mistakes apart from environment and runtime faults.

/// All the ways a pipeline run can fail.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// The inner dimensions of the two operands disagree. Rejected before any
    /// device resource is touched.
    ShapeMismatch {
        /// Column count of the left operand.
        a_cols: usize,
        /// Row count of the right operand.
        b_rows: usize,
    },
    /// No compute-capable adapter or device could be obtained.
    DeviceUnavailable(String),
    /// A device buffer could not be created at the requested size.
    AllocationFailed {
        /// Debug label of the buffer that failed.
        label: &'static str,
        /// Requested size in bytes.
        size: u64,
    },
    /// The kernel failed static validation or did not build against the
    /// device's shading backend.
    CompileFailed(String),
    /// The device reported a fault while executing the submitted commands, or
    /// the dispatch grid exceeds what the device supports.
    DispatchFailed(String),
    /// Mapping the staging buffer for host reads failed, or its contents did
    /// not decode as a matrix.
    ReadbackFailed(String),
}

impl core::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ShapeMismatch { a_cols, b_rows } => {
                write!(f, "shape mismatch: A has {a_cols} columns but B has {b_rows} rows")
            }
            Self::DeviceUnavailable(msg) => write!(f, "no compute device available: {msg}"),
            Self::AllocationFailed { label, size } => {
                write!(f, "failed to allocate buffer `{label}` ({size} bytes)")
            }
            Self::CompileFailed(msg) => write!(f, "kernel failed to compile: {msg}"),
            Self::DispatchFailed(msg) => write!(f, "compute dispatch failed: {msg}"),
            Self::ReadbackFailed(msg) => write!(f, "result readback failed: {msg}"),
        }
    }
}

impl core::error::Error for PipelineError {}

impl From<wgpu::RequestAdapterError> for PipelineError {
    fn from(e: wgpu::RequestAdapterError) -> Self {
        Self::DeviceUnavailable(e.to_string())
    }
}

impl From<wgpu::RequestDeviceError> for PipelineError {
    fn from(e: wgpu::RequestDeviceError) -> Self {
        Self::DeviceUnavailable(e.to_string())
    }
}

impl From<wgpu::PollError> for PipelineError {
    fn from(e: wgpu::PollError) -> Self {
        Self::DispatchFailed(e.to_string())
    }
}

impl From<wgpu::BufferAsyncError> for PipelineError {
    fn from(e: wgpu::BufferAsyncError) -> Self {
        Self::ReadbackFailed(e.to_string())
    }
}
