//! Export driver: precondition checks, stream acquisition, property dump.
//!
//! The driver validates a mesh snapshot, obtains output streams from an
//! [`ExportSink`], and runs the serializer for LOD 0. Precondition failures
//! and stream-acquisition failures are non-fatal: they are reported through
//! `tracing` and skip only the affected artifact, never a sibling artifact
//! or other meshes in a caller's batch.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::serialize::serialize_lod;
use crate::types::StaticMesh;

/// Why an export was skipped before any artifact was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The mesh has no LOD levels at all.
    NoLods,
    /// The exported LOD has no sections.
    NoSections {
        /// Index of the LOD that was missing sections.
        lod: usize,
    },
}

/// What one export call produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportOutcome {
    /// A precondition failed; nothing was written.
    Skipped(SkipReason),
    /// The export ran; the flags record which artifacts were written.
    Exported {
        /// The binary document was written.
        binary_written: bool,
        /// The property dump was written.
        properties_written: bool,
    },
}

/// Stream factory the driver acquires output streams from.
///
/// Implementations map a mesh name to writable streams; returning an error
/// skips that artifact only. Each stream is scoped to one artifact and is
/// dropped (and thereby released) on every exit path.
pub trait ExportSink {
    /// Writer type produced by this sink.
    type Writer: Write;

    /// Open the binary document stream for a mesh.
    ///
    /// # Errors
    ///
    /// Returns the environment's I/O error when the stream cannot be
    /// created; the driver reports it and skips the binary artifact.
    fn open_binary(&mut self, mesh_name: &str) -> io::Result<Self::Writer>;

    /// Open the text property-dump stream for a mesh.
    ///
    /// # Errors
    ///
    /// Returns the environment's I/O error when the stream cannot be
    /// created; the driver reports it and skips the property dump.
    fn open_text(&mut self, mesh_name: &str) -> io::Result<Self::Writer>;
}

/// Sink writing `<name>.xay` and `<name>.props.txt` under one directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// Create a sink rooted at the given directory.
    ///
    /// The directory must already exist; creation policy stays with the
    /// caller.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ExportSink for DirectorySink {
    type Writer = BufWriter<File>;

    fn open_binary(&mut self, mesh_name: &str) -> io::Result<Self::Writer> {
        let path = self.dir.join(format!("{mesh_name}.xay"));
        Ok(BufWriter::new(File::create(path)?))
    }

    fn open_text(&mut self, mesh_name: &str) -> io::Result<Self::Writer> {
        let path = self.dir.join(format!("{mesh_name}.props.txt"));
        Ok(BufWriter::new(File::create(path)?))
    }
}

/// Export one static mesh: the binary document for LOD 0 plus, when the
/// mesh reports properties, a human-readable property dump.
///
/// Preconditions are checked before any write. A mesh with no LODs, or
/// whose LOD 0 has no sections, is skipped with a warning naming the mesh
/// and the missing element. Stream-acquisition and write failures skip the
/// affected artifact but still attempt the sibling.
///
/// # Example
///
/// ```no_run
/// use mesh_xay::{export_static_mesh, DirectorySink, StaticMesh};
///
/// let mesh = StaticMesh::default();
/// let mut sink = DirectorySink::new("out");
/// let outcome = export_static_mesh(&mesh, &mut sink);
/// println!("{outcome:?}");
/// ```
pub fn export_static_mesh<S: ExportSink>(mesh: &StaticMesh, sink: &mut S) -> ExportOutcome {
    if mesh.lods.is_empty() {
        warn!(mesh = %mesh.name, lods = 0, "mesh has no LODs, skipping export");
        return ExportOutcome::Skipped(SkipReason::NoLods);
    }

    let lod = &mesh.lods[0];
    if lod.sections.is_empty() {
        warn!(mesh = %mesh.name, lod = 0, "LOD has no sections, skipping export");
        return ExportOutcome::Skipped(SkipReason::NoSections { lod: 0 });
    }

    // Binary document. The stream lives for this block only, so it is
    // released even when serialization fails partway.
    let binary_written = match sink.open_binary(&mesh.name) {
        Ok(mut writer) => match serialize_lod(lod, &mut writer) {
            Ok(()) => true,
            Err(e) => {
                warn!(mesh = %mesh.name, error = %e, "failed to serialize XAY document");
                false
            }
        },
        Err(e) => {
            warn!(mesh = %mesh.name, error = %e, "failed to open binary output stream");
            false
        }
    };

    // Property dump, independent of the binary artifact.
    let properties_written = if mesh.properties.is_empty() {
        false
    } else {
        match sink.open_text(&mesh.name) {
            Ok(mut writer) => match write_properties(mesh, &mut writer) {
                Ok(()) => true,
                Err(e) => {
                    warn!(mesh = %mesh.name, error = %e, "failed to write property dump");
                    false
                }
            },
            Err(e) => {
                warn!(mesh = %mesh.name, error = %e, "failed to open text output stream");
                false
            }
        }
    };

    debug!(
        mesh = %mesh.name,
        binary_written,
        properties_written,
        "export finished"
    );

    ExportOutcome::Exported {
        binary_written,
        properties_written,
    }
}

/// Write the `name = value` property dump.
fn write_properties<W: Write>(mesh: &StaticMesh, writer: &mut W) -> io::Result<()> {
    for property in &mesh.properties {
        writeln!(writer, "{} = {}", property.name, property.value)?;
    }
    Ok(())
}
