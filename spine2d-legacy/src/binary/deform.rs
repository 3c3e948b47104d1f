//! Sparse FFD (free-form deformation) keys decoded against a baseline mesh.

use super::DecodeContext;
use super::input::BinaryInput;
use crate::{AttachmentData, Error};

/// Skinned meshes carry no flat vertex array; their deform length is derived
/// from the UV count the way legacy exports size it.
const SKINNED_UV_VERTEX_FACTOR: usize = 9;

#[derive(Copy, Clone, Debug)]
pub(crate) struct DeformBaseline<'d> {
    /// `None` when the target attachment could not be resolved.
    vertex_count: Option<usize>,
    /// Blended into every frame; only meshes have one.
    setup: Option<&'d [f32]>,
}

impl<'d> DeformBaseline<'d> {
    pub(crate) fn for_attachment(attachment: Option<&'d AttachmentData>) -> Self {
        let Some(attachment) = attachment else {
            return Self {
                vertex_count: None,
                setup: None,
            };
        };
        match attachment {
            AttachmentData::Mesh(mesh) => Self {
                vertex_count: Some(mesh.vertices.len()),
                setup: Some(mesh.vertices.as_slice()),
            },
            AttachmentData::SkinnedMesh(mesh) => Self {
                vertex_count: Some(mesh.uvs.len() * SKINNED_UV_VERTEX_FACTOR),
                setup: None,
            },
            AttachmentData::BoundingBox(bbox) => Self {
                vertex_count: Some(bbox.vertices.len()),
                setup: None,
            },
            AttachmentData::Region(_) => Self {
                vertex_count: Some(0),
                setup: None,
            },
        }
    }
}

/// Reads `count` then, when non-zero, `start` and `count` scaled deltas, and
/// returns the frame's full vertex array.
pub(crate) fn read_deform_vertices(
    input: &mut BinaryInput<'_>,
    ctx: &DecodeContext,
    baseline: &DeformBaseline<'_>,
) -> Result<Vec<f32>, Error> {
    let count = input.read_count()?;
    let (start, start_offset) = if count == 0 {
        (0, input.offset())
    } else {
        let start_offset = input.offset();
        let start = input.read_varint()?;
        let start = usize::try_from(start).map_err(|_| Error::IndexOutOfRange {
            kind: "deform vertex",
            index: start,
            len: baseline.vertex_count.unwrap_or(0),
            offset: start_offset,
        })?;
        (start, start_offset)
    };

    // Without a target there is no length to align `start` against, so the
    // deltas are consumed and the frame carries no vertices.
    let Some(vertex_count) = baseline.vertex_count else {
        for _ in 0..count {
            input.read_f32_be()?;
        }
        return Ok(Vec::new());
    };

    let mut vertices = vec![0.0f32; vertex_count];
    if count != 0 {
        let end = start
            .checked_add(count)
            .filter(|end| *end <= vertex_count)
            .ok_or(Error::IndexOutOfRange {
                kind: "deform vertex",
                index: start.saturating_add(count) as i64 - 1,
                len: vertex_count,
                offset: start_offset,
            })?;
        for v in &mut vertices[start..end] {
            *v = input.read_f32_be()? * ctx.scale;
        }
    }

    if let Some(setup) = baseline.setup {
        let multiplier = ctx.deform_compat_multiplier;
        for (v, s) in vertices.iter_mut().zip(setup) {
            *v += *s * multiplier;
        }
    }
    Ok(vertices)
}
