use super::deform::{DeformBaseline, read_deform_vertices};
use super::input::BinaryInput;
use super::{DecodeContext, ModelTables};
use crate::{
    Animation, AttachmentFrame, BoneTimelineType, BoneTimelines, ColorFrame, Curve,
    DeformFrame, DeformTimelines, DrawOrderFrame, DrawOrderOffset, Error, Event, FlipFrame,
    IkFrame, RotateFrame, SlotTimelineType, SlotTimelines, Vec2Frame,
};
use std::collections::HashMap;

const CURVE_LINEAR: u8 = 0;
const CURVE_STEPPED: u8 = 1;
const CURVE_BEZIER: u8 = 2;

trait Keyframe {
    fn time(&self) -> f32;
}

trait CurvedKeyframe: Keyframe {
    fn set_curve(&mut self, curve: Curve);
}

macro_rules! impl_keyframe {
    ($($ty:ty),* $(,)?) => {
        $(impl Keyframe for $ty {
            fn time(&self) -> f32 {
                self.time
            }
        })*
    };
}

macro_rules! impl_curved_keyframe {
    ($($ty:ty),* $(,)?) => {
        $(impl CurvedKeyframe for $ty {
            fn set_curve(&mut self, curve: Curve) {
                self.curve = curve;
            }
        })*
    };
}

impl_keyframe!(
    AttachmentFrame,
    ColorFrame,
    RotateFrame,
    Vec2Frame,
    FlipFrame,
    IkFrame,
    DeformFrame,
    DrawOrderFrame,
    Event,
);
impl_curved_keyframe!(ColorFrame, RotateFrame, Vec2Frame, IkFrame, DeformFrame);

#[derive(Default)]
struct DurationTracker(f32);

impl DurationTracker {
    fn observe<T: Keyframe>(&mut self, frames: &[T]) {
        if let Some(last) = frames.last() {
            self.0 = self.0.max(last.time());
        }
    }
}

fn read_curve(input: &mut BinaryInput<'_>) -> Result<Curve, Error> {
    let offset = input.offset();
    match input.read_u8()? {
        CURVE_LINEAR => Ok(Curve::Linear),
        CURVE_STEPPED => Ok(Curve::Stepped),
        CURVE_BEZIER => {
            let cx1 = input.read_f32_be()?;
            let cy1 = input.read_f32_be()?;
            let cx2 = input.read_f32_be()?;
            let cy2 = input.read_f32_be()?;
            Ok(Curve::Bezier { cx1, cy1, cx2, cy2 })
        }
        other => Err(Error::UnknownVariant {
            kind: "curve type",
            value: other.into(),
            offset,
        }),
    }
}

fn read_frames<'a, T>(
    input: &mut BinaryInput<'a>,
    frame_count: usize,
    mut read_frame: impl FnMut(&mut BinaryInput<'a>) -> Result<T, Error>,
) -> Result<Vec<T>, Error> {
    let mut frames = Vec::with_capacity(frame_count.min(input.remaining()));
    for _ in 0..frame_count {
        frames.push(read_frame(input)?);
    }
    Ok(frames)
}

/// Like [`read_frames`], with a curve after every frame but the last.
fn read_curve_frames<'a, T: CurvedKeyframe>(
    input: &mut BinaryInput<'a>,
    frame_count: usize,
    mut read_frame: impl FnMut(&mut BinaryInput<'a>) -> Result<T, Error>,
) -> Result<Vec<T>, Error> {
    let mut frames = Vec::with_capacity(frame_count.min(input.remaining()));
    for frame in 0..frame_count {
        let mut value = read_frame(input)?;
        if frame + 1 < frame_count {
            value.set_curve(read_curve(input)?);
        }
        frames.push(value);
    }
    Ok(frames)
}

pub(crate) fn read_animation(
    input: &mut BinaryInput<'_>,
    ctx: &DecodeContext,
    tables: &ModelTables,
    name: &str,
) -> Result<Animation, Error> {
    let mut duration = DurationTracker::default();

    let slots = read_slot_timelines(input, tables, &mut duration)?;
    let bones = read_bone_timelines(input, ctx, tables, &mut duration)?;
    let ik = read_ik_timelines(input, tables, &mut duration)?;
    let ffd = read_deform_timelines(input, ctx, tables, name, &mut duration)?;
    let draw_order = read_draw_order_timeline(input, tables, &mut duration)?;
    let events = read_event_timeline(input, tables, &mut duration)?;

    Ok(Animation {
        name: name.to_string(),
        duration: duration.0,
        slots,
        bones,
        ik,
        ffd,
        draw_order,
        events,
    })
}

fn read_slot_timelines(
    input: &mut BinaryInput<'_>,
    tables: &ModelTables,
    duration: &mut DurationTracker,
) -> Result<HashMap<String, SlotTimelines>, Error> {
    let group_count = input.read_count()?;
    let mut out = HashMap::with_capacity(group_count.min(tables.slots.len()));
    for _ in 0..group_count {
        let slot_index = input.read_index("slot", tables.slots.len())?;
        let mut timelines = SlotTimelines::default();
        for _ in 0..input.read_count()? {
            let type_offset = input.offset();
            let raw = input.read_u8()?;
            let ty = SlotTimelineType::from_binary_kind(raw).ok_or(Error::UnknownVariant {
                kind: "slot timeline type",
                value: raw.into(),
                offset: type_offset,
            })?;
            let frame_count = input.read_count()?;
            match ty {
                SlotTimelineType::Attachment => {
                    let frames = read_frames(input, frame_count, |input| {
                        let time = input.read_f32_be()?;
                        let name = input.read_string()?;
                        Ok(AttachmentFrame { time, name })
                    })?;
                    duration.observe(&frames);
                    timelines.attachment = Some(frames);
                }
                SlotTimelineType::Color => {
                    let frames = read_curve_frames(input, frame_count, |input| {
                        let time = input.read_f32_be()?;
                        let color = input.read_color()?;
                        Ok(ColorFrame {
                            time,
                            color,
                            curve: Curve::Linear,
                        })
                    })?;
                    duration.observe(&frames);
                    timelines.color = Some(frames);
                }
            }
        }
        out.insert(tables.slots[slot_index].name.clone(), timelines);
    }
    Ok(out)
}

fn read_bone_timelines(
    input: &mut BinaryInput<'_>,
    ctx: &DecodeContext,
    tables: &ModelTables,
    duration: &mut DurationTracker,
) -> Result<HashMap<String, BoneTimelines>, Error> {
    let group_count = input.read_count()?;
    let mut out = HashMap::with_capacity(group_count.min(tables.bones.len()));
    for _ in 0..group_count {
        let bone_index = input.read_index("bone", tables.bones.len())?;
        let mut timelines = BoneTimelines::default();
        for _ in 0..input.read_count()? {
            let type_offset = input.offset();
            let raw = input.read_u8()?;
            let ty = BoneTimelineType::from_binary_kind(raw).ok_or(Error::UnknownVariant {
                kind: "bone timeline type",
                value: raw.into(),
                offset: type_offset,
            })?;
            let frame_count = input.read_count()?;
            match ty {
                BoneTimelineType::Rotate => {
                    let frames = read_curve_frames(input, frame_count, |input| {
                        let time = input.read_f32_be()?;
                        let angle = input.read_f32_be()?;
                        Ok(RotateFrame {
                            time,
                            angle,
                            curve: Curve::Linear,
                        })
                    })?;
                    duration.observe(&frames);
                    timelines.rotate = Some(frames);
                }
                BoneTimelineType::Translate | BoneTimelineType::Scale => {
                    let value_scale = if ty == BoneTimelineType::Translate {
                        ctx.scale
                    } else {
                        1.0
                    };
                    let frames = read_curve_frames(input, frame_count, |input| {
                        let time = input.read_f32_be()?;
                        let x = input.read_f32_be()? * value_scale;
                        let y = input.read_f32_be()? * value_scale;
                        Ok(Vec2Frame {
                            time,
                            x,
                            y,
                            curve: Curve::Linear,
                        })
                    })?;
                    duration.observe(&frames);
                    if ty == BoneTimelineType::Translate {
                        timelines.translate = Some(frames);
                    } else {
                        timelines.scale = Some(frames);
                    }
                }
                BoneTimelineType::FlipX | BoneTimelineType::FlipY => {
                    let frames = read_frames(input, frame_count, |input| {
                        let time = input.read_f32_be()?;
                        let flip = input.read_bool()?;
                        Ok(FlipFrame { time, flip })
                    })?;
                    duration.observe(&frames);
                    if ty == BoneTimelineType::FlipX {
                        timelines.flip_x = Some(frames);
                    } else {
                        timelines.flip_y = Some(frames);
                    }
                }
            }
        }
        out.insert(tables.bones[bone_index].name.clone(), timelines);
    }
    Ok(out)
}

fn read_ik_timelines(
    input: &mut BinaryInput<'_>,
    tables: &ModelTables,
    duration: &mut DurationTracker,
) -> Result<HashMap<String, Vec<IkFrame>>, Error> {
    let group_count = input.read_count()?;
    let mut out = HashMap::with_capacity(group_count.min(tables.ik.len()));
    for _ in 0..group_count {
        let ik_index = input.read_index("ik constraint", tables.ik.len())?;
        let frame_count = input.read_count()?;
        let frames = read_curve_frames(input, frame_count, |input| {
            let time = input.read_f32_be()?;
            let mix = input.read_f32_be()?;
            let bend_positive = input.read_bool()?;
            Ok(IkFrame {
                time,
                mix,
                bend_positive,
                curve: Curve::Linear,
            })
        })?;
        duration.observe(&frames);
        out.insert(tables.ik[ik_index].name.clone(), frames);
    }
    Ok(out)
}

fn read_deform_timelines(
    input: &mut BinaryInput<'_>,
    ctx: &DecodeContext,
    tables: &ModelTables,
    animation: &str,
    duration: &mut DurationTracker,
) -> Result<DeformTimelines, Error> {
    let mut out = DeformTimelines::new();
    for _ in 0..input.read_count()? {
        let skin_index = input.read_index("skin", tables.skins.len())?;
        let skin = &tables.skins[skin_index];
        let skin_map = out.entry(skin.name.clone()).or_default();
        for _ in 0..input.read_count()? {
            let slot_index = input.read_index("slot", tables.slots.len())?;
            let slot_name = tables.slots[slot_index].name.as_str();
            let slot_map = skin_map.entry(slot_name.to_string()).or_default();
            for _ in 0..input.read_count()? {
                let attachment_name = input.read_string()?.unwrap_or_default();
                let frame_count = input.read_count()?;
                let attachment = skin.find_attachment(slot_name, &attachment_name);
                if attachment.is_none() {
                    log::warn!(
                        "deform attachment not found, keys decode without vertices: animation={animation:?} skin={:?} slot={slot_name:?} attachment={attachment_name:?}",
                        skin.name
                    );
                }
                let baseline = DeformBaseline::for_attachment(attachment);
                let frames = read_curve_frames(input, frame_count, |input| {
                    let time = input.read_f32_be()?;
                    let vertices = read_deform_vertices(input, ctx, &baseline)?;
                    Ok(DeformFrame {
                        time,
                        vertices,
                        curve: Curve::Linear,
                    })
                })?;
                duration.observe(&frames);
                slot_map.insert(attachment_name, frames);
            }
        }
    }
    Ok(out)
}

fn read_draw_order_timeline(
    input: &mut BinaryInput<'_>,
    tables: &ModelTables,
    duration: &mut DurationTracker,
) -> Result<Option<Vec<DrawOrderFrame>>, Error> {
    let frame_count = input.read_count()?;
    if frame_count == 0 {
        return Ok(None);
    }
    let frames = read_frames(input, frame_count, |input| {
        let offset_count = input.read_count()?;
        let mut offsets = Vec::with_capacity(offset_count.min(tables.slots.len()));
        for _ in 0..offset_count {
            let slot_index = input.read_index("slot", tables.slots.len())?;
            let offset = input.read_int()?;
            offsets.push(DrawOrderOffset {
                slot: tables.slots[slot_index].name.clone(),
                offset,
            });
        }
        // Time trails the offsets in this section.
        let time = input.read_f32_be()?;
        Ok(DrawOrderFrame { time, offsets })
    })?;
    duration.observe(&frames);
    Ok(Some(frames))
}

fn read_event_timeline(
    input: &mut BinaryInput<'_>,
    tables: &ModelTables,
    duration: &mut DurationTracker,
) -> Result<Option<Vec<Event>>, Error> {
    let event_count = input.read_count()?;
    if event_count == 0 {
        return Ok(None);
    }
    let events = read_frames(input, event_count, |input| {
        let time = input.read_f32_be()?;
        let event_index = input.read_index("event", tables.events.len())?;
        let int_value = input.read_int()?;
        let float_value = input.read_f32_be()?;
        let string = if input.read_bool()? {
            input.read_string()?.unwrap_or_default()
        } else {
            String::new()
        };
        Ok(Event {
            time,
            name: tables.events[event_index].name.clone(),
            int_value,
            float_value,
            string,
        })
    })?;
    duration.observe(&events);
    Ok(Some(events))
}
