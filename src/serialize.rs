//! XAY binary document writer.
//!
//! One document encodes one LOD. All multi-byte fields are little-endian.
//!
//! # Document Layout
//!
//! ```text
//! UINT8[4]      – Magic: 'X', 'A', 'Y', sub-version byte (0x02)
//! UINT8         – Document version (0x01)
//! UINT8[3]      – Reserved, zero-filled
//! UINT32        – Vertex count
//! UINT32        – Face (triangle) count across all sections
//! UINT8         – UV channel count (including the primary channel)
//! UINT8         – Has-vertex-colors flag (0/1)
//! UINT16        – Section count
//! foreach section
//!     STRING    – Material name (INT32 length incl. NUL, bytes, NUL)
//!     UINT32    – Cumulative face-end index (running face total)
//! end
//! foreach vertex
//!     REAL32[8] – pos.x, n.x, pos.y, n.y, pos.z, n.z, uv.u, uv.v
//! end
//! foreach triangle (grouped by section, in section order)
//!     IDX[3]    – Vertex indices; UINT16 if vertex count <= 65536,
//!                 UINT32 otherwise, uniform for the whole document
//! end
//! foreach extra UV channel (channels 2..N, ascending)
//!     REAL32[2] per vertex – (u, v)
//! end
//! UINT8[4] per vertex – Raw color record, only if the flag is set
//! ```
//!
//! # Transforms
//!
//! Four transforms are applied while encoding, unconditionally for this
//! document version:
//!
//! - positions are scaled by 0.01 (source units to target units)
//! - packed normals are decoded and re-normalized to unit length
//! - every UV's V is flipped (`v' = 1 - v`), primary and extra channels
//! - position Y and normal Y are negated (handedness mirror)

use std::io::Write;

use tracing::debug;

use crate::error::{ExportError, ExportResult};
use crate::types::StaticMeshLod;

/// Magic tag: format family plus the sub-version byte.
pub const MAGIC: [u8; 4] = [b'X', b'A', b'Y', 0x02];

/// Document version byte.
pub const DOCUMENT_VERSION: u8 = 0x01;

/// Fixed scale converting source units to target units.
pub const POSITION_SCALE: f32 = 0.01;

/// Reserved header bytes.
const RESERVED: [u8; 3] = [0; 3];

/// Highest vertex count still addressable with 16-bit indices.
const U16_INDEX_LIMIT: usize = 65536;

/// Index width, chosen once before the index block and applied uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndexWidth {
    /// 16-bit indices, used when the vertex count fits.
    U16,
    /// 32-bit indices.
    U32,
}

impl IndexWidth {
    fn for_vertex_count(vertex_count: usize) -> Self {
        if vertex_count <= U16_INDEX_LIMIT {
            Self::U16
        } else {
            Self::U32
        }
    }

    fn write_index<W: Write>(self, writer: &mut W, index: u32) -> ExportResult<()> {
        match self {
            Self::U16 => {
                #[allow(clippy::cast_possible_truncation)]
                // Width was chosen from the vertex count, so the index fits.
                writer.write_all(&(index as u16).to_le_bytes())?;
            }
            Self::U32 => writer.write_all(&index.to_le_bytes())?,
        }
        Ok(())
    }
}

/// Serialize one LOD as a complete XAY document.
///
/// Writes header, section table, vertex block, index block, extra UV
/// blocks, and the optional vertex color block, in that order. The only
/// failure modes are the writer's own I/O faults and a section count that
/// does not fit the header's 16-bit field.
///
/// The LOD snapshot must be internally consistent (sections partition the
/// index buffer, extra UV channels and colors match the vertex count);
/// that is the caller's contract and is not validated here.
///
/// # Errors
///
/// Returns an error if the writer fails or the LOD has more than 65535
/// sections.
pub fn serialize_lod<W: Write>(lod: &StaticMeshLod, writer: &mut W) -> ExportResult<()> {
    let vertex_count = lod.vertices.len();
    let section_count = u16::try_from(lod.sections.len()).map_err(|_| {
        ExportError::SectionCountOverflow {
            count: lod.sections.len(),
        }
    })?;

    // Section table bookkeeping: running face total and resolved names.
    let mut face_end_indices = Vec::with_capacity(lod.sections.len());
    let mut material_names = Vec::with_capacity(lod.sections.len());
    let mut face_count: u32 = 0;
    for (i, section) in lod.sections.iter().enumerate() {
        face_count += section.face_count;
        face_end_indices.push(face_count);
        material_names.push(section.resolve_material(i));
    }

    #[allow(clippy::cast_possible_truncation)]
    // The format caps UV channels at 255.
    let uv_channel_count = lod.uv_channel_count() as u8;
    let has_vertex_colors = u8::from(lod.vertex_colors.is_some());

    writer.write_all(&MAGIC)?;
    writer.write_all(&[DOCUMENT_VERSION])?;
    writer.write_all(&RESERVED)?;
    #[allow(clippy::cast_possible_truncation)]
    // Vertex indices are u32, so vertex counts > 4B are unsupported.
    writer.write_all(&(vertex_count as u32).to_le_bytes())?;
    writer.write_all(&face_count.to_le_bytes())?;
    writer.write_all(&[uv_channel_count, has_vertex_colors])?;
    writer.write_all(&section_count.to_le_bytes())?;

    for (name, face_end) in material_names.iter().zip(&face_end_indices) {
        write_string(writer, name.as_str())?;
        writer.write_all(&face_end.to_le_bytes())?;
    }

    // Vertex block: fixed interleaving, one x-pair, y-pair, z-pair, UV-pair
    // per vertex. The grouping is a wire contract, not a layout choice.
    for vertex in &lod.vertices {
        let mut position = vertex.position.coords * POSITION_SCALE;
        let mut normal = vertex.normal.decode().normalize();
        position.y = -position.y;
        normal.y = -normal.y;
        let v_flipped = 1.0 - vertex.uv[1];

        for value in [
            position.x,
            normal.x,
            position.y,
            normal.y,
            position.z,
            normal.z,
            vertex.uv[0],
            v_flipped,
        ] {
            writer.write_all(&value.to_le_bytes())?;
        }
    }

    // Index block: triangles grouped by section, in section order.
    let width = IndexWidth::for_vertex_count(vertex_count);
    for section in &lod.sections {
        for face in 0..section.face_count {
            let first = section.first_index + face * 3;
            for offset in 0..3 {
                width.write_index(writer, lod.indices[(first + offset) as usize])?;
            }
        }
    }

    // Extra UV blocks, one per channel beyond the primary, ascending.
    for channel in &lod.extra_uvs {
        for &[u, v] in channel {
            writer.write_all(&u.to_le_bytes())?;
            writer.write_all(&(1.0 - v).to_le_bytes())?;
        }
    }

    // Vertex color block, raw records, no padding.
    if let Some(colors) = &lod.vertex_colors {
        for color in colors {
            writer.write_all(&color.to_bytes())?;
        }
    }

    debug!(
        vertices = vertex_count,
        faces = face_count,
        sections = lod.sections.len(),
        uv_channels = lod.uv_channel_count(),
        "Serialized XAY document"
    );

    Ok(())
}

/// Write the consumer's length-prefixed string: an i32 length counting the
/// terminating NUL, the raw bytes, then the NUL.
fn write_string<W: Write>(writer: &mut W, value: &str) -> ExportResult<()> {
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    // Material names are short; lengths near i32::MAX do not occur.
    let length = (value.len() + 1) as i32;
    writer.write_all(&length.to_le_bytes())?;
    writer.write_all(value.as_bytes())?;
    writer.write_all(&[0])?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::types::{MaterialRef, MeshSection, PackedNormal, StaticMeshVertex, VertexColor};
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Vector3};

    fn vertex(x: f32, y: f32, z: f32) -> StaticMeshVertex {
        StaticMeshVertex::new(
            Point3::new(x, y, z),
            PackedNormal::pack(Vector3::z()),
            [0.25, 0.75],
        )
    }

    fn single_triangle_lod() -> StaticMeshLod {
        StaticMeshLod {
            vertices: vec![
                vertex(0.0, 0.0, 0.0),
                vertex(100.0, 0.0, 0.0),
                vertex(0.0, 100.0, 0.0),
            ],
            indices: vec![0, 1, 2],
            sections: vec![MeshSection::new(0, 1, None)],
            extra_uvs: Vec::new(),
            vertex_colors: None,
        }
    }

    fn serialize_to_vec(lod: &StaticMeshLod) -> Vec<u8> {
        let mut buffer = Vec::new();
        serialize_lod(lod, &mut buffer).unwrap();
        buffer
    }

    fn read_u16(bytes: &[u8], offset: usize) -> u16 {
        u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
    }

    fn read_u32(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ])
    }

    fn read_f32(bytes: &[u8], offset: usize) -> f32 {
        f32::from_le_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ])
    }

    #[test]
    fn header_layout_single_triangle() {
        let bytes = serialize_to_vec(&single_triangle_lod());

        assert_eq!(&bytes[0..4], &[b'X', b'A', b'Y', 0x02]);
        assert_eq!(bytes[4], 0x01);
        assert_eq!(&bytes[5..8], &[0, 0, 0]);
        assert_eq!(read_u32(&bytes, 8), 3); // vertex count
        assert_eq!(read_u32(&bytes, 12), 1); // face count
        assert_eq!(bytes[16], 1); // UV channel count
        assert_eq!(bytes[17], 0); // has vertex colors
        assert_eq!(read_u16(&bytes, 18), 1); // section count
    }

    #[test]
    fn section_table_placeholder_name_and_face_end() {
        let bytes = serialize_to_vec(&single_triangle_lod());

        // Section table starts right after the 20-byte header.
        let name = "dummy_material_0";
        assert_eq!(read_u32(&bytes, 20) as usize, name.len() + 1);
        assert_eq!(&bytes[24..24 + name.len()], name.as_bytes());
        assert_eq!(bytes[24 + name.len()], 0); // NUL terminator
        assert_eq!(read_u32(&bytes, 24 + name.len() + 1), 1); // face end
    }

    #[test]
    fn document_ends_after_index_block_when_no_tails() {
        let bytes = serialize_to_vec(&single_triangle_lod());

        let name_entry = 4 + "dummy_material_0".len() + 1 + 4;
        let expected = 20 + name_entry + 3 * 32 + 3 * 2;
        assert_eq!(bytes.len(), expected);

        // One triangle record with 2-byte indices at the very end.
        let index_block = bytes.len() - 6;
        assert_eq!(read_u16(&bytes, index_block), 0);
        assert_eq!(read_u16(&bytes, index_block + 2), 1);
        assert_eq!(read_u16(&bytes, index_block + 4), 2);
    }

    #[test]
    fn vertex_block_interleaving_and_transforms() {
        let lod = StaticMeshLod {
            vertices: vec![StaticMeshVertex::new(
                Point3::new(100.0, 200.0, 300.0),
                PackedNormal::pack(Vector3::y()),
                [0.25, 0.75],
            )],
            indices: vec![0, 0, 0],
            sections: vec![MeshSection::new(0, 1, None)],
            extra_uvs: Vec::new(),
            vertex_colors: None,
        };
        let bytes = serialize_to_vec(&lod);

        let entry = 4 + "dummy_material_0".len() + 1 + 4;
        let base = 20 + entry;

        // pos.x, n.x, pos.y, n.y, pos.z, n.z, u, v
        assert_relative_eq!(read_f32(&bytes, base), 1.0, epsilon = 1e-6);
        assert_relative_eq!(read_f32(&bytes, base + 4), 0.0, epsilon = 1e-2);
        assert_relative_eq!(read_f32(&bytes, base + 8), -2.0, epsilon = 1e-6);
        assert_relative_eq!(read_f32(&bytes, base + 12), -1.0, epsilon = 1e-2);
        assert_relative_eq!(read_f32(&bytes, base + 16), 3.0, epsilon = 1e-6);
        assert_relative_eq!(read_f32(&bytes, base + 20), 0.0, epsilon = 1e-2);
        assert_relative_eq!(read_f32(&bytes, base + 24), 0.25, epsilon = 1e-6);
        assert_relative_eq!(read_f32(&bytes, base + 28), 0.25, epsilon = 1e-6);
    }

    #[test]
    fn encoded_normals_are_unit_length() {
        let lod = StaticMeshLod {
            vertices: vec![StaticMeshVertex::new(
                Point3::origin(),
                PackedNormal::pack(Vector3::new(0.3, 0.5, 0.9)),
                [0.0, 0.0],
            )],
            indices: vec![0, 0, 0],
            sections: vec![MeshSection::new(0, 1, None)],
            extra_uvs: Vec::new(),
            vertex_colors: None,
        };
        let bytes = serialize_to_vec(&lod);

        let base = 20 + 4 + "dummy_material_0".len() + 1 + 4;
        let nx = read_f32(&bytes, base + 4);
        let ny = read_f32(&bytes, base + 12);
        let nz = read_f32(&bytes, base + 20);
        let length = (nx * nx + ny * ny + nz * nz).sqrt();
        assert!((length - 1.0).abs() <= 1e-5, "normal length {length}");
    }

    #[test]
    fn named_materials_written_verbatim() {
        let mut lod = single_triangle_lod();
        lod.sections[0].material = Some(MaterialRef::new("M_Rock"));
        let bytes = serialize_to_vec(&lod);

        assert_eq!(read_u32(&bytes, 20) as usize, "M_Rock".len() + 1);
        assert_eq!(&bytes[24..30], b"M_Rock");
        assert_eq!(bytes[30], 0);
    }

    #[test]
    fn cumulative_face_ends_run_across_sections() {
        let mut vertices = Vec::new();
        for i in 0..9 {
            #[allow(clippy::cast_precision_loss)]
            vertices.push(vertex(i as f32, 0.0, 0.0));
        }
        let lod = StaticMeshLod {
            vertices,
            indices: (0..9).collect(),
            sections: vec![MeshSection::new(0, 2, None), MeshSection::new(6, 1, None)],
            extra_uvs: Vec::new(),
            vertex_colors: None,
        };
        let bytes = serialize_to_vec(&lod);

        assert_eq!(read_u32(&bytes, 12), 3); // header face count

        let mut offset = 20;
        let first_len = read_u32(&bytes, offset) as usize;
        assert_eq!(read_u32(&bytes, offset + 4 + first_len), 2);
        offset += 4 + first_len + 4;
        let second_len = read_u32(&bytes, offset) as usize;
        assert_eq!(read_u32(&bytes, offset + 4 + second_len), 3);
    }

    #[test]
    fn sections_produce_distinct_placeholders() {
        let lod = StaticMeshLod {
            vertices: vec![vertex(0.0, 0.0, 0.0); 6],
            indices: (0..6).collect(),
            sections: vec![MeshSection::new(0, 1, None), MeshSection::new(3, 1, None)],
            extra_uvs: Vec::new(),
            vertex_colors: None,
        };
        let bytes = serialize_to_vec(&lod);

        let first_len = read_u32(&bytes, 20) as usize;
        let first = &bytes[24..24 + first_len - 1];
        let second_offset = 24 + first_len + 4;
        let second_len = read_u32(&bytes, second_offset) as usize;
        let second = &bytes[second_offset + 4..second_offset + 4 + second_len - 1];
        assert_eq!(first, b"dummy_material_0");
        assert_eq!(second, b"dummy_material_1");
        assert_ne!(first, second);
    }

    #[test]
    fn index_width_boundary() {
        assert_eq!(IndexWidth::for_vertex_count(3), IndexWidth::U16);
        assert_eq!(IndexWidth::for_vertex_count(65536), IndexWidth::U16);
        assert_eq!(IndexWidth::for_vertex_count(65537), IndexWidth::U32);
    }

    #[test]
    fn wide_mesh_uses_u32_indices() {
        let vertex_count = U16_INDEX_LIMIT + 1;
        let lod = StaticMeshLod {
            vertices: vec![vertex(0.0, 0.0, 0.0); vertex_count],
            indices: vec![0, 1, 65536],
            sections: vec![MeshSection::new(0, 1, None)],
            extra_uvs: Vec::new(),
            vertex_colors: None,
        };
        let bytes = serialize_to_vec(&lod);

        // One triangle record of three u32 indices at the very end.
        let index_block = bytes.len() - 12;
        assert_eq!(read_u32(&bytes, index_block), 0);
        assert_eq!(read_u32(&bytes, index_block + 4), 1);
        assert_eq!(read_u32(&bytes, index_block + 8), 65536);
    }

    #[test]
    fn triangles_grouped_by_section_order() {
        let lod = StaticMeshLod {
            vertices: vec![vertex(0.0, 0.0, 0.0); 6],
            indices: vec![3, 4, 5, 0, 1, 2],
            sections: vec![MeshSection::new(3, 1, None), MeshSection::new(0, 1, None)],
            extra_uvs: Vec::new(),
            vertex_colors: None,
        };
        let bytes = serialize_to_vec(&lod);

        // Section order, not index-buffer order: first record comes from
        // the section starting at index 3.
        let index_block = bytes.len() - 12;
        assert_eq!(read_u16(&bytes, index_block), 0);
        assert_eq!(read_u16(&bytes, index_block + 2), 1);
        assert_eq!(read_u16(&bytes, index_block + 4), 2);
        assert_eq!(read_u16(&bytes, index_block + 6), 3);
        assert_eq!(read_u16(&bytes, index_block + 8), 4);
        assert_eq!(read_u16(&bytes, index_block + 10), 5);
    }

    #[test]
    fn extra_uv_channels_flip_v() {
        let mut lod = single_triangle_lod();
        lod.extra_uvs = vec![
            vec![[0.1, 0.2], [0.3, 0.4], [0.5, 0.6]],
            vec![[0.0, 1.0], [1.0, 0.0], [0.5, 0.5]],
        ];
        let bytes = serialize_to_vec(&lod);

        assert_eq!(bytes[16], 3); // UV channel count

        // Two extra channels of 3 (u, v) pairs each trail the index block.
        let extra_block = bytes.len() - 2 * 3 * 8;
        assert_relative_eq!(read_f32(&bytes, extra_block), 0.1, epsilon = 1e-6);
        assert_relative_eq!(read_f32(&bytes, extra_block + 4), 0.8, epsilon = 1e-6);
        assert_relative_eq!(read_f32(&bytes, extra_block + 8), 0.3, epsilon = 1e-6);
        assert_relative_eq!(read_f32(&bytes, extra_block + 12), 0.6, epsilon = 1e-6);

        let second_channel = extra_block + 3 * 8;
        assert_relative_eq!(read_f32(&bytes, second_channel), 0.0, epsilon = 1e-6);
        assert_relative_eq!(read_f32(&bytes, second_channel + 4), 0.0, epsilon = 1e-6);
        assert_relative_eq!(read_f32(&bytes, second_channel + 8), 1.0, epsilon = 1e-6);
        assert_relative_eq!(read_f32(&bytes, second_channel + 12), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn uv_flip_twice_restores_source() {
        let source = 0.3_f32;
        let flipped = 1.0 - source;
        assert_eq!(1.0 - flipped, source);
    }

    #[test]
    fn vertex_color_block_written_raw() {
        let mut lod = single_triangle_lod();
        lod.vertex_colors = Some(vec![
            VertexColor::new(255, 0, 0, 255),
            VertexColor::new(0, 255, 0, 128),
            VertexColor::new(0, 0, 255, 0),
        ]);
        let bytes = serialize_to_vec(&lod);

        assert_eq!(bytes[17], 1); // has vertex colors
        let color_block = bytes.len() - 12;
        assert_eq!(&bytes[color_block..color_block + 4], &[255, 0, 0, 255]);
        assert_eq!(&bytes[color_block + 4..color_block + 8], &[0, 255, 0, 128]);
        assert_eq!(&bytes[color_block + 8..], &[0, 0, 255, 0]);
    }

    #[test]
    fn section_count_overflow_is_an_error() {
        let lod = StaticMeshLod {
            vertices: vec![vertex(0.0, 0.0, 0.0)],
            indices: Vec::new(),
            sections: vec![MeshSection::new(0, 0, None); 65536],
            extra_uvs: Vec::new(),
            vertex_colors: None,
        };
        let mut buffer = Vec::new();
        let result = serialize_lod(&lod, &mut buffer);
        assert!(matches!(
            result,
            Err(ExportError::SectionCountOverflow { count: 65536 })
        ));
        assert!(buffer.is_empty());
    }
}
