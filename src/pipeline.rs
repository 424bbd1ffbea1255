//! The matrix compute pipeline: upload, dispatch, readback.
//!
//! One call to [`matmul`] performs a single linear pass over the device:
//! three storage buffers (A, B, result) plus one staging buffer are created,
//! the kernel is compiled, one compute pass with an m x n workgroup grid is
//! dispatched, the result buffer is copied into the staging buffer, and the
//! caller blocks on exactly one host-visible mapping before the staging bytes
//! are decoded as `[rows, cols, values...]`.
//!
//! Every resource is dropped when the call returns; nothing persists between
//! invocations except the [`GpuContext`] the caller supplies.

use crate::descriptor::{BindingLayout, BufferSpec, DispatchGrid};
use crate::error::PipelineError;
use crate::gpu::{load_shader, GpuContext};
use crate::matrix::{Matrix, HEADER_ELEMS};
use briny07::raw::cast::slice_from_bytes;
use std::sync::mpsc;

pub(crate) const MATMUL: &str = include_str!("shaders/matmul.wgsl");

/// Multiplies `a` (m x k) by `b` (k x n) with one GPU compute dispatch,
/// returning the m x n product.
///
/// Accumulation runs over `t = 0..k` ascending in `f32`, so two runs with
/// identical inputs on the same backend produce bit-identical output.
///
/// # Errors
///
/// - [`PipelineError::ShapeMismatch`] if `a.cols() != b.rows()`, before any
///   device resource is created
/// - [`PipelineError::AllocationFailed`] if a buffer cannot be created at the
///   requested size
/// - [`PipelineError::CompileFailed`] if the kernel fails validation or does
///   not build against the device's shading backend
/// - [`PipelineError::DispatchFailed`] for execution faults or a grid the
///   device cannot cover in one dispatch
/// - [`PipelineError::ReadbackFailed`] if mapping or decoding the staging
///   buffer fails
pub fn matmul(ctx: &GpuContext, a: &Matrix, b: &Matrix) -> Result<Matrix, PipelineError> {
    let (m, n) = a.product_shape(b)?;
    pollster::block_on(run_matmul_pass(ctx, a, b, m, n))
}

/// [`matmul`] on the process-wide shared context.
///
/// # Errors
///
/// [`PipelineError::ShapeMismatch`] before any context is acquired,
/// [`PipelineError::DeviceUnavailable`] if no context could be initialized,
/// otherwise as [`matmul`].
pub fn matmul_shared(a: &Matrix, b: &Matrix) -> Result<Matrix, PipelineError> {
    a.product_shape(b)?;
    matmul(GpuContext::shared()?, a, b)
}

async fn run_matmul_pass(
    ctx: &GpuContext,
    a: &Matrix,
    b: &Matrix,
    m: usize,
    n: usize,
) -> Result<Matrix, PipelineError> {
    let device = &ctx.device;
    let queue = &ctx.queue;
    let limits = device.limits();

    let grid = DispatchGrid::for_output(m, n)?;
    grid.validate(&limits)?;

    // === Buffers ===
    let a_flat = a.encode();
    let b_flat = b.encode();
    let result_len = HEADER_ELEMS + m * n;

    let a_spec = BufferSpec::storage_input("A", a_flat.len());
    let b_spec = BufferSpec::storage_input("B", b_flat.len());
    let c_spec = BufferSpec::storage_output("result", result_len);
    let staging_spec = BufferSpec::staging("staging", result_len);
    for spec in [&a_spec, &b_spec, &c_spec, &staging_spec] {
        spec.validate(&limits)?;
    }

    let a_buffer = create_checked(device, &a_spec, Some(&a_flat)).await?;
    let b_buffer = create_checked(device, &b_spec, Some(&b_flat)).await?;
    let c_buffer = create_checked(device, &c_spec, None).await?;
    let staging = create_checked(device, &staging_spec, None).await?;

    // === Kernel ===
    let layout = BindingLayout::for_matmul();
    layout.validate()?;

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = match load_shader(device, "matmul", MATMUL) {
        Ok(module) => module,
        Err(e) => {
            let _ = device.pop_error_scope().await;
            return Err(e);
        }
    };
    let bind_group_layout = layout.to_wgpu(device, "matmul_bgl");
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("matmul_pipeline_layout"),
        bind_group_layouts: &[&bind_group_layout],
        push_constant_ranges: &[],
    });
    let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some("matmul_pipeline"),
        layout: Some(&pipeline_layout),
        module: &module,
        entry_point: Some("main"),
        cache: None,
        compilation_options: wgpu::PipelineCompilationOptions::default(),
    });
    if let Some(e) = device.pop_error_scope().await {
        return Err(PipelineError::CompileFailed(e.to_string()));
    }

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("matmul_bind_group"),
        layout: &bind_group_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: a_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: b_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: c_buffer.as_entire_binding(),
            },
        ],
    });

    // === Dispatch ===
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("matmul_encoder"),
    });

    {
        let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("matmul_pass"),
            timestamp_writes: None,
        });
        compute_pass.set_pipeline(&pipeline);
        compute_pass.set_bind_group(0, &bind_group, &[]);
        compute_pass.dispatch_workgroups(grid.x, grid.y, 1);
    }

    encoder.copy_buffer_to_buffer(&c_buffer, 0, &staging, 0, c_spec.size);

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    queue.submit(Some(encoder.finish()));
    if let Some(e) = device.pop_error_scope().await {
        return Err(PipelineError::DispatchFailed(e.to_string()));
    }

    // === Readback ===
    let buffer_slice = staging.slice(..);
    let (tx, rx) = mpsc::channel();
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device.poll(wgpu::PollType::Wait)?;
    match rx.recv() {
        Ok(mapped) => mapped?,
        Err(_) => {
            return Err(PipelineError::ReadbackFailed(
                "map callback dropped without reporting a result".into(),
            ));
        }
    }

    let data = buffer_slice.get_mapped_range();
    let flat = slice_from_bytes::<f32>(&data)
        .map_err(|_| PipelineError::ReadbackFailed("staging bytes are not valid f32s".into()))?;
    let out = Matrix::decode(flat).ok_or_else(|| {
        PipelineError::ReadbackFailed("staging buffer does not decode as a matrix".into())
    })?;
    drop(data);
    staging.unmap();

    if out.rows() != m || out.cols() != n {
        return Err(PipelineError::ReadbackFailed(format!(
            "kernel reported shape {}x{}, expected {m}x{n}",
            out.rows(),
            out.cols()
        )));
    }

    Ok(out)
}

/// Creates a buffer under an out-of-memory error scope so allocation faults
/// come back as errors instead of uncaptured device panics.
async fn create_checked(
    device: &wgpu::Device,
    spec: &BufferSpec,
    contents: Option<&[f32]>,
) -> Result<wgpu::Buffer, PipelineError> {
    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    let buffer = match contents {
        Some(data) => spec.create_init(device, data),
        None => spec.create(device),
    };
    match device.pop_error_scope().await {
        None => Ok(buffer),
        Some(_) => Err(PipelineError::AllocationFailed {
            label: spec.label,
            size: spec.size,
        }),
    }
}
