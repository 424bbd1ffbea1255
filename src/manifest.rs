//! Sample-registration metadata.
//!
//! The browser/UI harness that shows this sample wants a name, a description,
//! and the source listings it should display. None of that belongs in the
//! pipeline, so it lives here as plain data the harness can consume however
//! it likes.

use crate::pipeline::MATMUL;

/// One displayable source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceListing {
    /// Display name of the listing.
    pub name: &'static str,
    /// Full source text.
    pub contents: &'static str,
    /// Whether the harness may offer the listing for editing.
    pub editable: bool,
}

/// Registration metadata for one sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleManifest {
    /// Human-readable sample name.
    pub name: &'static str,
    /// Short description shown alongside the sample.
    pub description: &'static str,
    /// Source listings the harness should display.
    pub sources: Vec<SourceListing>,
}

/// The manifest for the matrix-multiply sample.
#[must_use]
pub fn matmul_manifest() -> SampleManifest {
    SampleManifest {
        name: "Matrix Multiply",
        description: "Multiplies two small dense matrices with a single GPU \
            compute dispatch and reads the product back to the host.",
        sources: vec![SourceListing {
            name: "matmul.wgsl",
            contents: MATMUL,
            editable: true,
        }],
    }
}
