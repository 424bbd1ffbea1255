//! GPU context acquisition and WGSL source handling.
//!
//! Wraps wgpu's asynchronous adapter/device negotiation behind a blocking
//! constructor (`pollster::block_on`) and validates kernel source with
//! `briny` before it ever reaches the shading backend. A process-wide
//! context is available through [`GpuContext::shared`] for callers that do
//! not manage their own device handle.

use crate::error::PipelineError;
use briny::prelude::*;

/// Holds the wgpu device and queue used for executing compute pipelines.
///
/// One context can serve any number of pipeline runs; each run creates and
/// tears down its own buffers, so the context itself carries no per-run
/// state.
pub struct GpuContext {
    /// The actual GPU device.
    pub device: wgpu::Device,
    /// The submission queue for that device.
    pub queue: wgpu::Queue,
}

impl GpuContext {
    /// Initializes a new GPU context, selecting the default adapter and
    /// creating a device + queue.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DeviceUnavailable`] if no compute-capable
    /// adapter exists or device acquisition fails.
    ///
    /// # Internals
    ///
    /// - Uses `pollster::block_on` to synchronously wait for async wgpu calls
    /// - Selects the default adapter with default options
    /// - Enables default limits and features for broad compatibility
    pub fn new() -> Result<Self, PipelineError> {
        let instance = wgpu::Instance::default();
        let adapter =
            pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default()))?;
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("matrix-compute"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::default(),
        }))?;

        Ok(Self { device, queue })
    }

    /// A process-wide context, initialized on first use.
    ///
    /// # Errors
    ///
    /// Returns the [`PipelineError::DeviceUnavailable`] produced by the first
    /// (and only) initialization attempt.
    pub fn shared() -> Result<&'static Self, PipelineError> {
        lazy_static::lazy_static! {
            static ref SHARED: Result<GpuContext, PipelineError> = GpuContext::new();
        }
        SHARED.as_ref().map_err(Clone::clone)
    }
}

/// Wrapper for WGSL source code so it can be validated before compilation.
pub struct WgslSource<'a>(pub &'a str);

impl Validate for WgslSource<'_> {
    fn validate(&self) -> Result<(), ValidationError> {
        let src = self.0;

        // Basic sanity checks
        if src.len() > 65536 {
            return Err(ValidationError);
        }

        if !src.contains("fn main") {
            return Err(ValidationError);
        }

        // Disallow source inclusion
        if src.contains("import") || src.contains("#include") {
            return Err(ValidationError);
        }

        Ok(())
    }
}

/// Validates WGSL source and builds a labeled shader module from it.
///
/// Compilation faults against the shading backend are reported through the
/// device's error scopes, not here; this function only rejects source that
/// fails the static checks.
///
/// # Errors
///
/// Returns [`PipelineError::CompileFailed`] if the source fails validation.
pub fn load_shader(
    device: &wgpu::Device,
    label: &'static str,
    source: &str,
) -> Result<wgpu::ShaderModule, PipelineError> {
    WgslSource(source)
        .validate()
        .map_err(|_| PipelineError::CompileFailed(format!("`{label}` rejected by static checks")))?;

    Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    }))
}
