//! XAY static-mesh binary export.
//!
//! This crate converts an in-memory static-mesh snapshot into the compact,
//! versioned XAY binary document one fixed external consumer expects. It is
//! not a general mesh-interchange format: the magic, version, axis
//! convention, and UV origin are the consumer's, and the per-vertex
//! transforms (0.01 unit scale, Y mirror, V flip, normal re-normalization)
//! are always on for this document version.
//!
//! Mesh loading from source asset formats, output naming policy beyond a
//! simple directory sink, and any CLI or GUI driving the export live
//! outside this crate.
//!
//! # Components
//!
//! - [`serialize_lod`] walks one LOD and writes the binary document:
//!   header, section/material table, vertex block, index block, extra UV
//!   blocks, and the optional vertex color block.
//! - [`export_static_mesh`] validates the snapshot (at least one LOD,
//!   LOD 0 has sections), acquires streams from an [`ExportSink`], runs
//!   the serializer for LOD 0, and optionally writes a human-readable
//!   property dump. Validation and stream failures are non-fatal and skip
//!   only the affected artifact.
//!
//! # Example
//!
//! ```no_run
//! use mesh_xay::{export_static_mesh, DirectorySink, StaticMesh};
//!
//! let mesh: StaticMesh = /* decoded elsewhere */ StaticMesh::default();
//! let mut sink = DirectorySink::new("out");
//! let outcome = export_static_mesh(&mesh, &mut sink);
//! println!("{outcome:?}");
//! ```
//!
//! # Quality Standards
//!
//! - Zero clippy/doc warnings
//! - Zero `unwrap`/`expect` in library code

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod error;
mod export;
mod serialize;
mod types;

pub use error::{ExportError, ExportResult};
pub use export::{export_static_mesh, DirectorySink, ExportOutcome, ExportSink, SkipReason};
pub use serialize::{serialize_lod, DOCUMENT_VERSION, MAGIC, POSITION_SCALE};
pub use types::{
    MaterialRef, MeshProperty, MeshSection, PackedNormal, SectionMaterial, StaticMesh,
    StaticMeshLod, StaticMeshVertex, VertexColor,
};

// Re-export the math types snapshots are built from.
pub use nalgebra::{Point3, Vector3};
