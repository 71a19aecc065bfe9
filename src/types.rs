//! Static-mesh snapshot types consumed by the exporter.
//!
//! These types describe one read-only mesh snapshot: LOD levels, vertices
//! with packed normals and UVs, triangulated sections, and optional
//! per-vertex colors. The exporter never mutates a snapshot; callers build
//! one from whatever source format they decode and hand it in by reference.

use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A quantized unit normal packed into four bytes.
///
/// Each of the first three bytes stores one component biased into `0..=255`;
/// a byte `b` decodes as `b / 127.5 - 1.0`. The fourth byte is padding and
/// is ignored on decode. Decoded vectors are only approximately unit length,
/// so consumers re-normalize after decoding.
///
/// # Example
///
/// ```
/// use mesh_xay::PackedNormal;
/// use nalgebra::Vector3;
///
/// let packed = PackedNormal::pack(Vector3::new(0.0, 0.0, 1.0));
/// let decoded = packed.decode();
/// assert!((decoded.z - 1.0).abs() < 1e-2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PackedNormal(pub u32);

impl PackedNormal {
    /// Decode the packed bytes into an (approximately unit) vector.
    #[must_use]
    pub fn decode(self) -> Vector3<f32> {
        let [x, y, z, _] = self.0.to_le_bytes();
        Vector3::new(Self::unbias(x), Self::unbias(y), Self::unbias(z))
    }

    /// Pack a unit vector into the biased-byte representation.
    ///
    /// Components outside `[-1, 1]` are clamped.
    #[must_use]
    pub fn pack(normal: Vector3<f32>) -> Self {
        Self(u32::from_le_bytes([
            Self::bias(normal.x),
            Self::bias(normal.y),
            Self::bias(normal.z),
            0,
        ]))
    }

    fn unbias(b: u8) -> f32 {
        f32::from(b) / 127.5 - 1.0
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    // Clamped to [0, 255] before the cast.
    fn bias(c: f32) -> u8 {
        ((c + 1.0) * 127.5).round().clamp(0.0, 255.0) as u8
    }
}

/// RGBA color with 8-bit components.
///
/// The exporter writes the four bytes verbatim in field order, so this is
/// both the in-memory and the on-wire representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VertexColor {
    /// Red component.
    pub r: u8,
    /// Green component.
    pub g: u8,
    /// Blue component.
    pub b: u8,
    /// Alpha component.
    pub a: u8,
}

impl VertexColor {
    /// Create a color from RGBA components.
    #[inline]
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// The raw 4-byte record written to the vertex color block.
    #[inline]
    #[must_use]
    pub const fn to_bytes(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// One vertex of a LOD: position in source units, packed normal, primary UV.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StaticMeshVertex {
    /// Position in source units (scaled during export).
    pub position: Point3<f32>,
    /// Quantized normal (decoded and re-normalized during export).
    pub normal: PackedNormal,
    /// Primary UV channel, `[u, v]` with source origin convention.
    pub uv: [f32; 2],
}

impl StaticMeshVertex {
    /// Create a vertex from its parts.
    #[inline]
    #[must_use]
    pub const fn new(position: Point3<f32>, normal: PackedNormal, uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// A named material reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MaterialRef {
    /// Material name, used verbatim in the section table.
    pub name: String,
}

impl MaterialRef {
    /// Create a material reference with the given name.
    #[inline]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// The material name a section resolves to in the section table.
///
/// Absent materials are a first-class case, not an ad-hoc null check: a
/// section without a material reference gets a deterministic placeholder
/// synthesized from its zero-based index, so every section table entry has
/// a non-empty name unique within one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionMaterial {
    /// Verbatim name of the referenced material.
    Named(String),
    /// Synthesized `dummy_material_<index>` placeholder.
    Placeholder(String),
}

impl SectionMaterial {
    /// The name as written to the section table.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Named(name) | Self::Placeholder(name) => name,
        }
    }
}

/// A contiguous triangle run within a LOD's index buffer.
///
/// Sections are ordered and together partition the index buffer with no
/// gaps or overlaps. That invariant is the caller's responsibility; the
/// serializer does not validate it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MeshSection {
    /// Offset of this section's first index in the shared index buffer.
    pub first_index: u32,
    /// Number of triangles in this section.
    pub face_count: u32,
    /// Material reference, if the section has one.
    pub material: Option<MaterialRef>,
}

impl MeshSection {
    /// Create a section covering `face_count` triangles starting at
    /// `first_index`.
    #[inline]
    #[must_use]
    pub const fn new(first_index: u32, face_count: u32, material: Option<MaterialRef>) -> Self {
        Self {
            first_index,
            face_count,
            material,
        }
    }

    /// Resolve the name this section contributes to the section table.
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_xay::{MeshSection, SectionMaterial};
    ///
    /// let section = MeshSection::new(0, 4, None);
    /// assert_eq!(section.resolve_material(2).as_str(), "dummy_material_2");
    /// ```
    #[must_use]
    pub fn resolve_material(&self, section_index: usize) -> SectionMaterial {
        match &self.material {
            Some(material) => SectionMaterial::Named(material.name.clone()),
            None => SectionMaterial::Placeholder(format!("dummy_material_{section_index}")),
        }
    }
}

/// One level of detail of a static mesh.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StaticMeshLod {
    /// Vertex data in original order.
    pub vertices: Vec<StaticMeshVertex>,
    /// Flat index buffer shared by all sections, three indices per triangle.
    pub indices: Vec<u32>,
    /// Ordered sections partitioning the index buffer.
    pub sections: Vec<MeshSection>,
    /// Extra UV channels beyond the primary one (channels 2..N), each of
    /// vertex length, in ascending channel order.
    pub extra_uvs: Vec<Vec<[f32; 2]>>,
    /// Per-vertex colors, present for the whole LOD or not at all.
    pub vertex_colors: Option<Vec<VertexColor>>,
}

impl StaticMeshLod {
    /// Total UV channel count including the primary channel.
    #[inline]
    #[must_use]
    pub fn uv_channel_count(&self) -> usize {
        1 + self.extra_uvs.len()
    }

    /// Total triangle count across all sections.
    #[must_use]
    pub fn total_face_count(&self) -> u32 {
        self.sections.iter().map(|s| s.face_count).sum()
    }
}

/// A property exposed by the mesh's type description.
///
/// Properties drive the optional human-readable dump written next to the
/// binary document; they carry no meaning for the binary format itself.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MeshProperty {
    /// Property name.
    pub name: String,
    /// Property value, already rendered as text.
    pub value: String,
}

impl MeshProperty {
    /// Create a property from a name and a rendered value.
    #[inline]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A static mesh snapshot: a name, ordered LOD levels, and the properties
/// reported by the mesh's type description.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StaticMesh {
    /// Mesh name, used for output naming and diagnostics.
    pub name: String,
    /// LOD levels, highest detail first. Only LOD 0 is exported.
    pub lods: Vec<StaticMeshLod>,
    /// Reflected properties; when non-empty a text dump is written.
    pub properties: Vec<MeshProperty>,
}
