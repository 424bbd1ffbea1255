//! Validated device-resource descriptors.
//!
//! The deeply nested descriptor literals wgpu expects are assembled here from
//! small structs that are validated once, up front: buffer capability sets
//! ([`BufferSpec`]), the ordered binding layout the kernel declares
//! ([`BindingLayout`]), and the workgroup grid ([`DispatchGrid`]).

use crate::error::PipelineError;
use wgpu::util::DeviceExt;

/// Minimum bytes the kernel's `Matrix` struct can be bound to (a `vec2<f32>`
/// header plus one array element, padded to struct alignment). Buffer sizes
/// are rounded up to a multiple of this so even a 1x1 matrix binds.
pub const MIN_BINDING_BYTES: u64 = 16;

/// Byte size for `len` `f32` elements, rounded up to the minimum binding
/// size.
fn rounded_size(len: usize) -> u64 {
    ((len * size_of::<f32>()) as u64).next_multiple_of(MIN_BINDING_BYTES)
}

/// How a compute-stage binding may access its buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferAccess {
    /// Read-only storage.
    ReadOnly,
    /// Read-write storage.
    ReadWrite,
}

/// An ordered sequence of `(slot, access)` pairs describing which buffers a
/// compute program may touch and how.
///
/// Order and access mode must match the kernel's declared bindings exactly,
/// by position, or the device rejects the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingLayout {
    entries: Vec<(u32, BufferAccess)>,
}

impl BindingLayout {
    /// The layout the matmul kernel declares: read-only A, read-only B,
    /// read-write result.
    #[must_use]
    pub fn for_matmul() -> Self {
        Self {
            entries: vec![
                (0, BufferAccess::ReadOnly),
                (1, BufferAccess::ReadOnly),
                (2, BufferAccess::ReadWrite),
            ],
        }
    }

    /// Number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the layout declares no bindings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Checks that the layout is non-empty with strictly ascending slots.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::CompileFailed`], since a malformed layout is
    /// exactly what the device would reject at pipeline creation.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.entries.is_empty() {
            return Err(PipelineError::CompileFailed(
                "binding layout declares no slots".into(),
            ));
        }
        for pair in self.entries.windows(2) {
            if pair[1].0 <= pair[0].0 {
                return Err(PipelineError::CompileFailed(format!(
                    "binding slots must be strictly ascending (slot {} follows slot {})",
                    pair[1].0, pair[0].0
                )));
            }
        }
        Ok(())
    }

    /// Lowers the layout to a `wgpu::BindGroupLayout` with compute-stage
    /// visibility.
    #[must_use]
    pub fn to_wgpu(&self, device: &wgpu::Device, label: &'static str) -> wgpu::BindGroupLayout {
        let entries: Vec<wgpu::BindGroupLayoutEntry> = self
            .entries
            .iter()
            .map(|&(binding, access)| wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage {
                        read_only: access == BufferAccess::ReadOnly,
                    },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            })
            .collect();

        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(label),
            entries: &entries,
        })
    }
}

/// A buffer to be created on the device: debug label, byte size, and the
/// capability set it is tagged with.
#[derive(Debug, Clone, Copy)]
pub struct BufferSpec {
    /// Debug label, also used in allocation diagnostics.
    pub label: &'static str,
    /// Size in bytes.
    pub size: u64,
    /// Capability bit set.
    pub usage: wgpu::BufferUsages,
}

impl BufferSpec {
    /// A read-only storage buffer holding at least `len` `f32` elements.
    #[must_use]
    pub fn storage_input(label: &'static str, len: usize) -> Self {
        Self {
            label,
            size: rounded_size(len),
            usage: wgpu::BufferUsages::STORAGE,
        }
    }

    /// A compute-writable storage buffer of at least `len` `f32` elements,
    /// usable as a copy source.
    #[must_use]
    pub fn storage_output(label: &'static str, len: usize) -> Self {
        Self {
            label,
            size: rounded_size(len),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
        }
    }

    /// A host-mappable staging buffer of at least `len` `f32` elements,
    /// usable as a copy destination.
    #[must_use]
    pub fn staging(label: &'static str, len: usize) -> Self {
        Self {
            label,
            size: rounded_size(len),
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        }
    }

    /// Checks the requested size against the device limits before the device
    /// gets a chance to fault on it.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::AllocationFailed`] for zero-sized or
    /// over-limit requests.
    pub fn validate(&self, limits: &wgpu::Limits) -> Result<(), PipelineError> {
        let failed = PipelineError::AllocationFailed {
            label: self.label,
            size: self.size,
        };
        if self.size == 0 || self.size > limits.max_buffer_size {
            return Err(failed);
        }
        if self.usage.contains(wgpu::BufferUsages::STORAGE)
            && self.size > u64::from(limits.max_storage_buffer_binding_size)
        {
            return Err(failed);
        }
        Ok(())
    }

    /// Creates the buffer, unmapped and zero-initialized.
    #[must_use]
    pub fn create(&self, device: &wgpu::Device) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(self.label),
            size: self.size,
            usage: self.usage,
            mapped_at_creation: false,
        })
    }

    /// Creates the buffer initialized with `contents`, zero-padded up to the
    /// declared size.
    ///
    /// # Panics
    ///
    /// Panics if `contents` exceeds the declared size.
    #[must_use]
    pub fn create_init(&self, device: &wgpu::Device, contents: &[f32]) -> wgpu::Buffer {
        let byte_len = (contents.len() * size_of::<f32>()) as u64;
        assert!(
            byte_len <= self.size,
            "buffer `{}` contents exceed its declared size",
            self.label
        );
        if byte_len == self.size {
            return device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(self.label),
                contents: briny07::raw::cast::slice_to_bytes(contents),
                usage: self.usage,
            });
        }
        let mut padded = contents.to_vec();
        padded.resize(self.size as usize / size_of::<f32>(), 0.0);
        device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(self.label),
            contents: briny07::raw::cast::slice_to_bytes(&padded),
            usage: self.usage,
        })
    }
}

/// The workgroup grid for one dispatch: `x = rows(A)`, `y = cols(B)`, one
/// invocation per output cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchGrid {
    /// Workgroup count along x (output rows).
    pub x: u32,
    /// Workgroup count along y (output columns).
    pub y: u32,
}

impl DispatchGrid {
    /// The grid covering an `m`x`n` output.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DispatchFailed`] if either dimension does not
    /// fit in `u32`.
    pub fn for_output(m: usize, n: usize) -> Result<Self, PipelineError> {
        let x = u32::try_from(m)
            .map_err(|_| PipelineError::DispatchFailed(format!("{m} rows exceed u32")))?;
        let y = u32::try_from(n)
            .map_err(|_| PipelineError::DispatchFailed(format!("{n} columns exceed u32")))?;
        Ok(Self { x, y })
    }

    /// Checks the grid against the device's per-dimension workgroup limit.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DispatchFailed`] if the output does not fit
    /// in a single dispatch.
    pub fn validate(&self, limits: &wgpu::Limits) -> Result<(), PipelineError> {
        let max = limits.max_compute_workgroups_per_dimension;
        if self.x > max || self.y > max {
            return Err(PipelineError::DispatchFailed(format!(
                "workgroup grid {}x{} exceeds device limit of {max} per dimension",
                self.x, self.y
            )));
        }
        Ok(())
    }
}
