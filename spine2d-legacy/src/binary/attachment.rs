use super::DecodeContext;
use super::input::BinaryInput;
use crate::{
    AttachmentData, AttachmentType, BoundingBoxAttachmentData, Error, MeshAttachmentData,
    RegionAttachmentData,
};

/// Reads one skin entry. `key` is the slot-supplied attachment key; it names
/// the attachment when the wire carries no override.
pub(crate) fn read_attachment(
    input: &mut BinaryInput<'_>,
    ctx: &DecodeContext,
    key: &str,
) -> Result<AttachmentData, Error> {
    let name = input.read_string()?.unwrap_or_else(|| key.to_string());
    let selector_offset = input.offset();
    let selector = input.read_varint()?;
    let ty = AttachmentType::from_binary_kind(selector).ok_or(Error::UnknownVariant {
        kind: "attachment type",
        value: selector,
        offset: selector_offset,
    })?;

    let scale = ctx.scale;
    match ty {
        AttachmentType::Region => {
            let path = input.read_string()?.unwrap_or_else(|| name.clone());
            let x = input.read_f32_be()? * scale;
            let y = input.read_f32_be()? * scale;
            let scale_x = input.read_f32_be()?;
            let scale_y = input.read_f32_be()?;
            let rotation = input.read_f32_be()?;
            let width = input.read_f32_be()? * scale;
            let height = input.read_f32_be()? * scale;
            let color = input.read_color()?;
            Ok(AttachmentData::Region(RegionAttachmentData {
                name,
                path,
                x,
                y,
                scale_x,
                scale_y,
                rotation,
                width,
                height,
                color,
            }))
        }
        AttachmentType::BoundingBox => {
            let vertices = input.read_float_array(scale)?;
            Ok(AttachmentData::BoundingBox(BoundingBoxAttachmentData {
                name,
                vertices,
            }))
        }
        AttachmentType::Mesh => Ok(AttachmentData::Mesh(read_mesh(input, ctx, name, false)?)),
        AttachmentType::SkinnedMesh => Ok(AttachmentData::SkinnedMesh(read_mesh(
            input, ctx, name, true,
        )?)),
    }
}

fn read_mesh(
    input: &mut BinaryInput<'_>,
    ctx: &DecodeContext,
    name: String,
    weighted: bool,
) -> Result<MeshAttachmentData, Error> {
    let path = input.read_string()?.unwrap_or_else(|| name.clone());
    let uvs = input.read_float_array(1.0)?;
    let triangles = input.read_short_array()?;
    // Weighted streams interleave bone indices and weights with positions.
    let vertices = input.read_float_array(if weighted { 1.0 } else { ctx.scale })?;
    let color = input.read_color()?;
    let hull = input.read_int()?;

    let (edges, width, height) = if ctx.nonessential {
        let edges = input.read_int_array()?;
        let width = input.read_f32_be()? * ctx.scale;
        let height = input.read_f32_be()? * ctx.scale;
        (Some(edges), Some(width), Some(height))
    } else {
        (None, None, None)
    };

    Ok(MeshAttachmentData {
        name,
        path,
        uvs,
        triangles,
        vertices,
        color,
        hull,
        edges,
        width,
        height,
    })
}
