//! Legacy Spine 2.x `.skel` (binary) loader.
//!
//! Decoding is a single forward pass over an in-memory byte slice. Sections are
//! read in wire order; every index in the stream must point at an entity that
//! an earlier section (or an earlier entry of the same section) declared.

mod attachment;
mod deform;
mod input;
#[cfg(test)]
pub(crate) mod test_support;
mod timeline;

use self::attachment::read_attachment;
use self::input::BinaryInput;
use self::timeline::read_animation;
use crate::{
    BlendMode, BoneData, DEFAULT_SKIN_NAME, DecodeOptions, Error, EventData, IkConstraintData,
    Section, SkeletonDocument, SkeletonInfo, SkinData, SlotData,
};
use std::collections::HashMap;
use std::io::Read;

/// Per-decode settings threaded through every section reader.
#[derive(Copy, Clone, Debug)]
pub(crate) struct DecodeContext {
    pub(crate) scale: f32,
    pub(crate) deform_compat_multiplier: f32,
    /// Header flag: cosmetic fields (bone colors, mesh edges/size) are present.
    pub(crate) nonessential: bool,
}

/// Entities decoded so far, for resolving later index references.
#[derive(Debug, Default)]
pub(crate) struct ModelTables {
    pub(crate) bones: Vec<BoneData>,
    pub(crate) ik: Vec<IkConstraintData>,
    pub(crate) slots: Vec<SlotData>,
    /// Default skin first when present; deform timelines index into this order.
    pub(crate) skins: Vec<SkinData>,
    pub(crate) events: Vec<EventData>,
}

impl SkeletonDocument {
    pub fn from_skel_bytes(bytes: &[u8]) -> Result<Self, Error> {
        Self::from_skel_bytes_with_options(bytes, &DecodeOptions::default())
    }

    pub fn from_skel_bytes_with_options(
        bytes: &[u8],
        options: &DecodeOptions,
    ) -> Result<Self, Error> {
        let mut input = BinaryInput::new(bytes);

        log::trace!("skel header at offset {}", input.offset());
        let (skeleton, nonessential) =
            read_header(&mut input).map_err(|e| e.in_section(Section::Header, 0))?;
        let ctx = DecodeContext {
            scale: options.effective_scale(),
            deform_compat_multiplier: options.deform_compat_multiplier,
            nonessential,
        };

        let mut tables = ModelTables::default();

        log::trace!("skel bones at offset {}", input.offset());
        tables.bones = read_section(&mut input, Section::Bones, |input, declared| {
            read_bone(input, &ctx, declared)
        })?;

        log::trace!("skel ik constraints at offset {}", input.offset());
        tables.ik = read_section(&mut input, Section::IkConstraints, |input, _| {
            read_ik_constraint(input, &tables.bones)
        })?;

        log::trace!("skel slots at offset {}", input.offset());
        tables.slots = read_section(&mut input, Section::Slots, |input, _| {
            read_slot(input, &tables.bones)
        })?;

        log::trace!("skel skins at offset {}", input.offset());
        tables.skins = read_skins(&mut input, &ctx, &tables.slots)?;

        log::trace!("skel events at offset {}", input.offset());
        tables.events = read_section(&mut input, Section::Events, |input, _| read_event(input))?;

        log::trace!("skel animations at offset {}", input.offset());
        let animations = read_section(&mut input, Section::Animations, |input, _| {
            let name = input.read_string()?.unwrap_or_default();
            let start = input.offset();
            let animation = read_animation(input, &ctx, &tables, &name)?;
            log::trace!(
                "animation {name:?}: bytes {start}..{} duration={}",
                input.offset(),
                animation.duration
            );
            Ok(animation)
        })?;

        let mut animation_index = HashMap::with_capacity(animations.len());
        for (i, anim) in animations.iter().enumerate() {
            animation_index.entry(anim.name.clone()).or_insert(i);
        }

        log::debug!(
            "decoded skel {:?}: bones={} ik={} slots={} skins={} events={} animations={} trailing_bytes={}",
            skeleton.version.as_deref().unwrap_or(""),
            tables.bones.len(),
            tables.ik.len(),
            tables.slots.len(),
            tables.skins.len(),
            tables.events.len(),
            animations.len(),
            input.remaining()
        );

        let ModelTables {
            bones,
            ik,
            slots,
            skins,
            events,
        } = tables;
        Ok(SkeletonDocument {
            skeleton,
            bones,
            ik,
            slots,
            skins,
            events,
            animations,
            animation_index,
        })
    }

    /// Reads `reader` to the end, then decodes the buffered bytes.
    pub fn from_reader<R: Read>(mut reader: R, options: &DecodeOptions) -> Result<Self, Error> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_skel_bytes_with_options(&bytes, options)
    }
}

/// Reads a count, then that many entries. Failures are tagged with the
/// section and the entry ordinal. `read_entry` sees the entries decoded so far.
fn read_section<'a, T>(
    input: &mut BinaryInput<'a>,
    section: Section,
    mut read_entry: impl FnMut(&mut BinaryInput<'a>, &[T]) -> Result<T, Error>,
) -> Result<Vec<T>, Error> {
    let count = input.read_count().map_err(|e| e.in_section(section, 0))?;
    let mut entries = Vec::with_capacity(count.min(input.remaining()));
    for index in 0..count {
        let entry = read_entry(input, &entries).map_err(|e| e.in_section(section, index))?;
        entries.push(entry);
    }
    Ok(entries)
}

fn read_header(input: &mut BinaryInput<'_>) -> Result<(SkeletonInfo, bool), Error> {
    let hash = input.read_string()?;
    let version = input.read_string()?;
    let width = input.read_f32_be()?;
    let height = input.read_f32_be()?;
    let nonessential = input.read_bool()?;
    let images = if nonessential {
        input.read_string()?
    } else {
        None
    };
    Ok((
        SkeletonInfo {
            hash,
            version,
            width,
            height,
            images,
        },
        nonessential,
    ))
}

fn read_bone(
    input: &mut BinaryInput<'_>,
    ctx: &DecodeContext,
    declared: &[BoneData],
) -> Result<BoneData, Error> {
    let name = input.read_string()?.unwrap_or_default();

    // 0 is a root; otherwise `parent - 1` must name an earlier bone.
    let parent_offset = input.offset();
    let parent_index = input.read_varint()?;
    let parent = if parent_index == 0 {
        None
    } else {
        let index = parent_index - 1;
        let parent = usize::try_from(index)
            .ok()
            .and_then(|i| declared.get(i))
            .ok_or(Error::IndexOutOfRange {
                kind: "bone parent",
                index,
                len: declared.len(),
                offset: parent_offset,
            })?;
        Some(parent.name.clone())
    };

    let x = input.read_f32_be()? * ctx.scale;
    let y = input.read_f32_be()? * ctx.scale;
    let scale_x = input.read_f32_be()?;
    let scale_y = input.read_f32_be()?;
    let rotation = input.read_f32_be()?;
    let length = input.read_f32_be()? * ctx.scale;
    let flip_x = input.read_bool()?;
    let flip_y = input.read_bool()?;
    let inherit_scale = input.read_bool()?;
    let inherit_rotation = input.read_bool()?;
    let color = if ctx.nonessential {
        Some(input.read_color()?)
    } else {
        None
    };

    Ok(BoneData {
        name,
        parent,
        x,
        y,
        scale_x,
        scale_y,
        rotation,
        length,
        flip_x,
        flip_y,
        inherit_scale,
        inherit_rotation,
        color,
    })
}

fn read_ik_constraint(
    input: &mut BinaryInput<'_>,
    bones: &[BoneData],
) -> Result<IkConstraintData, Error> {
    let name = input.read_string()?.unwrap_or_default();
    let bone_count = input.read_count()?;
    let mut chain = Vec::with_capacity(bone_count.min(bones.len()));
    for _ in 0..bone_count {
        let index = input.read_index("bone", bones.len())?;
        chain.push(bones[index].name.clone());
    }
    let target = input.read_index("bone", bones.len())?;
    let mix = input.read_f32_be()?;
    let bend_positive = input.read_bool()?;
    Ok(IkConstraintData {
        name,
        bones: chain,
        target: bones[target].name.clone(),
        mix,
        bend_positive,
    })
}

fn read_slot(input: &mut BinaryInput<'_>, bones: &[BoneData]) -> Result<SlotData, Error> {
    let name = input.read_string()?.unwrap_or_default();
    let bone = input.read_index("bone", bones.len())?;
    let color = input.read_color()?;
    let attachment = input.read_string()?;
    let blend_offset = input.offset();
    let blend_kind = input.read_varint()?;
    let blend = BlendMode::from_binary_kind(blend_kind).ok_or(Error::UnknownVariant {
        kind: "blend mode",
        value: blend_kind,
        offset: blend_offset,
    })?;
    Ok(SlotData {
        name,
        bone: bones[bone].name.clone(),
        color,
        attachment,
        blend,
    })
}

/// Default skin (absent when its slot count is 0), then the named skins.
fn read_skins(
    input: &mut BinaryInput<'_>,
    ctx: &DecodeContext,
    slots: &[SlotData],
) -> Result<Vec<SkinData>, Error> {
    let mut skins = Vec::new();

    let default_slot_count = input
        .read_count()
        .map_err(|e| e.in_section(Section::Skins, 0))?;
    if default_slot_count > 0 {
        let skin = read_skin_body(
            input,
            ctx,
            slots,
            DEFAULT_SKIN_NAME.to_string(),
            default_slot_count,
        )
        .map_err(|e| e.in_section(Section::Skins, 0))?;
        skins.push(skin);
    }

    let named_count = input
        .read_count()
        .map_err(|e| e.in_section(Section::Skins, skins.len()))?;
    for _ in 0..named_count {
        let index = skins.len();
        let skin = read_named_skin(input, ctx, slots)
            .map_err(|e| e.in_section(Section::Skins, index))?;
        skins.push(skin);
    }
    Ok(skins)
}

fn read_named_skin(
    input: &mut BinaryInput<'_>,
    ctx: &DecodeContext,
    slots: &[SlotData],
) -> Result<SkinData, Error> {
    let name = input.read_string()?.unwrap_or_default();
    let slot_count = input.read_count()?;
    read_skin_body(input, ctx, slots, name, slot_count)
}

fn read_skin_body(
    input: &mut BinaryInput<'_>,
    ctx: &DecodeContext,
    slots: &[SlotData],
    name: String,
    slot_count: usize,
) -> Result<SkinData, Error> {
    let mut skin = SkinData::new(name);
    for _ in 0..slot_count {
        let slot_index = input.read_index("slot", slots.len())?;
        let slot_name = slots[slot_index].name.as_str();
        skin.attachments.entry(slot_name.to_string()).or_default();
        for _ in 0..input.read_count()? {
            let key = input.read_string()?.unwrap_or_default();
            let attachment = read_attachment(input, ctx, &key)?;
            skin.insert(slot_name, key, attachment);
        }
    }
    Ok(skin)
}

fn read_event(input: &mut BinaryInput<'_>) -> Result<EventData, Error> {
    let name = input.read_string()?.unwrap_or_default();
    let int_value = input.read_int()?;
    let float_value = input.read_f32_be()?;
    let string = input.read_string()?;
    Ok(EventData {
        name,
        int_value,
        float_value,
        string,
    })
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::{BinaryInput, DecodeContext, read_bone, read_event, read_section};
    use crate::{BoneData, Error, Section};

    fn ctx(nonessential: bool) -> DecodeContext {
        DecodeContext {
            scale: 2.0,
            deform_compat_multiplier: 0.1,
            nonessential,
        }
    }

    fn push_bone(out: &mut Vec<u8>, name: &str, parent: u32, nonessential: bool) {
        push_string(out, Some(name));
        push_varint(out, parent);
        for v in [1.0, 2.0, 1.0, 1.0, 45.0, 10.0] {
            push_f32_be(out, v);
        }
        for flag in [false, true, true, false] {
            push_bool(out, flag);
        }
        if nonessential {
            push_color(out, [0x9b, 0x9b, 0x9b, 0xff]);
        }
    }

    fn read_bones(bytes: &[u8], ctx: &DecodeContext) -> Result<Vec<BoneData>, Error> {
        let mut input = BinaryInput::new(bytes);
        read_section(&mut input, Section::Bones, |input, declared| {
            read_bone(input, ctx, declared)
        })
    }

    #[test]
    fn bone_fields_scale_and_nonessential_color() {
        for nonessential in [false, true] {
            let mut bytes = Vec::new();
            push_varint(&mut bytes, 1);
            push_bone(&mut bytes, "root", 0, nonessential);
            let bones = read_bones(&bytes, &ctx(nonessential)).unwrap();
            let root = &bones[0];
            assert_eq!(root.parent, None);
            assert_eq!((root.x, root.y, root.length), (2.0, 4.0, 20.0));
            assert_eq!(root.rotation, 45.0);
            assert!(!root.flip_x && root.flip_y);
            assert!(root.inherit_scale && !root.inherit_rotation);
            assert_eq!(
                root.color.map(|c| c.to_hex()),
                nonessential.then(|| "9b9b9bff".to_string())
            );
        }
    }

    #[test]
    fn bone_parent_is_one_based_into_earlier_bones() {
        let mut bytes = Vec::new();
        push_varint(&mut bytes, 3);
        push_bone(&mut bytes, "root", 0, false);
        push_bone(&mut bytes, "hip", 1, false);
        push_bone(&mut bytes, "knee", 2, false);
        let bones = read_bones(&bytes, &ctx(false)).unwrap();
        assert_eq!(bones[1].parent.as_deref(), Some("root"));
        assert_eq!(bones[2].parent.as_deref(), Some("hip"));
    }

    #[test]
    fn bone_parent_must_already_exist() {
        let mut bytes = Vec::new();
        push_varint(&mut bytes, 2);
        push_bone(&mut bytes, "root", 0, false);
        // Refers to itself.
        push_bone(&mut bytes, "loop", 2, false);
        let err = read_bones(&bytes, &ctx(false)).unwrap_err();
        assert_eq!(err.section(), Some((Section::Bones, 1)));
        assert!(
            matches!(
                err.root(),
                Error::IndexOutOfRange { kind: "bone parent", index: 1, len: 1, .. }
            ),
            "{err:?}"
        );
    }

    #[test]
    fn event_definition_payload() {
        let mut bytes = Vec::new();
        push_string(&mut bytes, Some("footstep"));
        push_int(&mut bytes, -2);
        push_f32_be(&mut bytes, 0.5);
        push_string(&mut bytes, Some(""));
        let mut input = BinaryInput::new(&bytes);
        let event = read_event(&mut input).unwrap();
        assert_eq!(input.remaining(), 0);
        assert_eq!(event.name, "footstep");
        assert_eq!(event.int_value, -2);
        assert_eq!(event.float_value, 0.5);
        assert_eq!(event.string.as_deref(), Some(""));
    }
}
