use std::collections::HashMap;
use std::fmt;

/// Key under which the unnamed default skin is stored.
pub const DEFAULT_SKIN_NAME: &str = "default";

/// RGBA color as stored on the wire (one byte per channel).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Color(pub [u8; 4]);

impl Color {
    pub const WHITE: Color = Color([0xff; 4]);

    pub fn r(self) -> u8 {
        self.0[0]
    }

    pub fn g(self) -> u8 {
        self.0[1]
    }

    pub fn b(self) -> u8 {
        self.0[2]
    }

    pub fn a(self) -> u8 {
        self.0[3]
    }

    /// 8-char lowercase hex, channel order preserved (`rrggbbaa`).
    pub fn to_hex(self) -> String {
        self.to_string()
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.0;
        write!(f, "{r:02x}{g:02x}{b:02x}{a:02x}")
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SkeletonInfo {
    pub hash: Option<String>,
    #[cfg_attr(feature = "serde", serde(rename = "spine"))]
    pub version: Option<String>,
    pub width: f32,
    pub height: f32,
    #[cfg_attr(
        feature = "serde",
        serde(skip_serializing_if = "Option::is_none")
    )]
    pub images: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct BoneData {
    pub name: String,
    /// Name of an earlier bone; `None` for roots.
    pub parent: Option<String>,
    pub x: f32,
    pub y: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub rotation: f32,
    pub length: f32,
    pub flip_x: bool,
    pub flip_y: bool,
    pub inherit_scale: bool,
    pub inherit_rotation: bool,
    #[cfg_attr(
        feature = "serde",
        serde(skip_serializing_if = "Option::is_none")
    )]
    pub color: Option<Color>,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct IkConstraintData {
    pub name: String,
    pub bones: Vec<String>,
    pub target: String,
    pub mix: f32,
    pub bend_positive: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum BlendMode {
    #[default]
    Normal,
    Additive,
    Multiply,
    Screen,
}

impl BlendMode {
    pub(crate) fn from_binary_kind(kind: i64) -> Option<Self> {
        match kind {
            0 => Some(Self::Normal),
            1 => Some(Self::Additive),
            2 => Some(Self::Multiply),
            3 => Some(Self::Screen),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SlotData {
    pub name: String,
    pub bone: String,
    pub color: Color,
    pub attachment: Option<String>,
    pub blend: BlendMode,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AttachmentType {
    Region,
    BoundingBox,
    Mesh,
    SkinnedMesh,
}

impl AttachmentType {
    pub(crate) fn from_binary_kind(kind: i64) -> Option<Self> {
        match kind {
            0 => Some(Self::Region),
            1 => Some(Self::BoundingBox),
            2 => Some(Self::Mesh),
            3 => Some(Self::SkinnedMesh),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct RegionAttachmentData {
    pub name: String,
    pub path: String,
    pub x: f32,
    pub y: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub rotation: f32,
    pub width: f32,
    pub height: f32,
    pub color: Color,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BoundingBoxAttachmentData {
    pub name: String,
    pub vertices: Vec<f32>,
}

/// Shared shape of `mesh` and `skinnedmesh` attachments.
///
/// For skinned meshes `vertices` is the raw weighted-vertex stream
/// (`boneCount, [boneIndex, x, y, weight]...` per vertex); it is not grouped here.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MeshAttachmentData {
    pub name: String,
    pub path: String,
    pub uvs: Vec<f32>,
    pub triangles: Vec<u16>,
    pub vertices: Vec<f32>,
    pub color: Color,
    pub hull: i64,
    #[cfg_attr(
        feature = "serde",
        serde(skip_serializing_if = "Option::is_none")
    )]
    pub edges: Option<Vec<i64>>,
    #[cfg_attr(
        feature = "serde",
        serde(skip_serializing_if = "Option::is_none")
    )]
    pub width: Option<f32>,
    #[cfg_attr(
        feature = "serde",
        serde(skip_serializing_if = "Option::is_none")
    )]
    pub height: Option<f32>,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "lowercase"))]
pub enum AttachmentData {
    Region(RegionAttachmentData),
    BoundingBox(BoundingBoxAttachmentData),
    Mesh(MeshAttachmentData),
    SkinnedMesh(MeshAttachmentData),
}

impl AttachmentData {
    pub fn name(&self) -> &str {
        match self {
            AttachmentData::Region(a) => a.name.as_str(),
            AttachmentData::BoundingBox(a) => a.name.as_str(),
            AttachmentData::Mesh(a) | AttachmentData::SkinnedMesh(a) => a.name.as_str(),
        }
    }

    pub fn kind(&self) -> AttachmentType {
        match self {
            AttachmentData::Region(_) => AttachmentType::Region,
            AttachmentData::BoundingBox(_) => AttachmentType::BoundingBox,
            AttachmentData::Mesh(_) => AttachmentType::Mesh,
            AttachmentData::SkinnedMesh(_) => AttachmentType::SkinnedMesh,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SkinData {
    #[cfg_attr(feature = "serde", serde(skip))]
    pub name: String,
    /// slot name -> attachment key -> attachment
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub attachments: HashMap<String, HashMap<String, AttachmentData>>,
    /// slot name -> attachment keys in the order they were declared
    #[cfg_attr(feature = "serde", serde(skip))]
    pub key_order: HashMap<String, Vec<String>>,
}

impl SkinData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds or replaces an entry. A replaced key keeps its original position.
    pub fn insert(&mut self, slot_name: &str, key: String, attachment: AttachmentData) {
        let slot_map = self.attachments.entry(slot_name.to_string()).or_default();
        if slot_map.insert(key.clone(), attachment).is_none() {
            self.key_order
                .entry(slot_name.to_string())
                .or_default()
                .push(key);
        }
    }

    pub fn attachment(&self, slot_name: &str, key: &str) -> Option<&AttachmentData> {
        self.attachments
            .get(slot_name)
            .and_then(|slot_map| slot_map.get(key))
    }

    /// Looks up a deform target: the entry keyed `name` if there is one,
    /// otherwise the last-declared entry whose resolved name is `name`.
    pub fn find_attachment(&self, slot_name: &str, name: &str) -> Option<&AttachmentData> {
        let slot_map = self.attachments.get(slot_name)?;
        if let Some(att) = slot_map.get(name) {
            return Some(att);
        }
        self.key_order
            .get(slot_name)?
            .iter()
            .rev()
            .filter_map(|key| slot_map.get(key))
            .find(|att| att.name() == name)
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct EventData {
    #[cfg_attr(feature = "serde", serde(skip))]
    pub name: String,
    #[cfg_attr(feature = "serde", serde(rename = "int"))]
    pub int_value: i64,
    #[cfg_attr(feature = "serde", serde(rename = "float"))]
    pub float_value: f32,
    pub string: Option<String>,
}

/// Interpolation toward the next frame of a timeline.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
pub enum Curve {
    #[default]
    Linear,
    Stepped,
    Bezier {
        cx1: f32,
        cy1: f32,
        cx2: f32,
        cy2: f32,
    },
}

impl Curve {
    pub fn is_linear(&self) -> bool {
        matches!(self, Curve::Linear)
    }
}

/// Timeline type byte inside a slot group.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SlotTimelineType {
    Attachment,
    Color,
}

impl SlotTimelineType {
    pub(crate) fn from_binary_kind(kind: u8) -> Option<Self> {
        match kind {
            3 => Some(Self::Attachment),
            4 => Some(Self::Color),
            _ => None,
        }
    }
}

/// Timeline type byte inside a bone group.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BoneTimelineType {
    Scale,
    Rotate,
    Translate,
    FlipX,
    FlipY,
}

impl BoneTimelineType {
    pub(crate) fn from_binary_kind(kind: u8) -> Option<Self> {
        match kind {
            0 => Some(Self::Scale),
            1 => Some(Self::Rotate),
            2 => Some(Self::Translate),
            5 => Some(Self::FlipX),
            6 => Some(Self::FlipY),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AttachmentFrame {
    pub time: f32,
    pub name: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ColorFrame {
    pub time: f32,
    pub color: Color,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Curve::is_linear"))]
    pub curve: Curve,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RotateFrame {
    pub time: f32,
    pub angle: f32,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Curve::is_linear"))]
    pub curve: Curve,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Vec2Frame {
    pub time: f32,
    pub x: f32,
    pub y: f32,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Curve::is_linear"))]
    pub curve: Curve,
}

/// Serialized as `{time, x}` or `{time, y}` depending on the owning timeline.
#[derive(Clone, Debug, PartialEq)]
pub struct FlipFrame {
    pub time: f32,
    pub flip: bool,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct IkFrame {
    pub time: f32,
    pub mix: f32,
    pub bend_positive: bool,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Curve::is_linear"))]
    pub curve: Curve,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DeformFrame {
    pub time: f32,
    pub vertices: Vec<f32>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Curve::is_linear"))]
    pub curve: Curve,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DrawOrderOffset {
    pub slot: String,
    pub offset: i64,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DrawOrderFrame {
    pub time: f32,
    pub offsets: Vec<DrawOrderOffset>,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Event {
    pub time: f32,
    pub name: String,
    #[cfg_attr(feature = "serde", serde(rename = "int"))]
    pub int_value: i64,
    #[cfg_attr(feature = "serde", serde(rename = "float"))]
    pub float_value: f32,
    pub string: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SlotTimelines {
    #[cfg_attr(
        feature = "serde",
        serde(skip_serializing_if = "Option::is_none")
    )]
    pub attachment: Option<Vec<AttachmentFrame>>,
    #[cfg_attr(
        feature = "serde",
        serde(skip_serializing_if = "Option::is_none")
    )]
    pub color: Option<Vec<ColorFrame>>,
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct BoneTimelines {
    #[cfg_attr(
        feature = "serde",
        serde(skip_serializing_if = "Option::is_none")
    )]
    pub rotate: Option<Vec<RotateFrame>>,
    #[cfg_attr(
        feature = "serde",
        serde(skip_serializing_if = "Option::is_none")
    )]
    pub translate: Option<Vec<Vec2Frame>>,
    #[cfg_attr(
        feature = "serde",
        serde(skip_serializing_if = "Option::is_none")
    )]
    pub scale: Option<Vec<Vec2Frame>>,
    #[cfg_attr(
        feature = "serde",
        serde(
            skip_serializing_if = "Option::is_none",
            serialize_with = "serde_flip::x"
        )
    )]
    pub flip_x: Option<Vec<FlipFrame>>,
    #[cfg_attr(
        feature = "serde",
        serde(
            skip_serializing_if = "Option::is_none",
            serialize_with = "serde_flip::y"
        )
    )]
    pub flip_y: Option<Vec<FlipFrame>>,
}

/// skin name -> slot name -> attachment name -> frames
pub type DeformTimelines = HashMap<String, HashMap<String, HashMap<String, Vec<DeformFrame>>>>;

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Animation {
    #[cfg_attr(feature = "serde", serde(skip))]
    pub name: String,
    /// Latest last-frame time over every timeline present.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub duration: f32,
    pub slots: HashMap<String, SlotTimelines>,
    pub bones: HashMap<String, BoneTimelines>,
    pub ik: HashMap<String, Vec<IkFrame>>,
    pub ffd: DeformTimelines,
    #[cfg_attr(
        feature = "serde",
        serde(skip_serializing_if = "Option::is_none")
    )]
    pub draw_order: Option<Vec<DrawOrderFrame>>,
    #[cfg_attr(
        feature = "serde",
        serde(skip_serializing_if = "Option::is_none")
    )]
    pub events: Option<Vec<Event>>,
}

/// Decoded skeleton asset. Cross references are by name; every referenced
/// entity was declared earlier in the stream.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SkeletonDocument {
    pub skeleton: SkeletonInfo,
    pub bones: Vec<BoneData>,
    pub ik: Vec<IkConstraintData>,
    pub slots: Vec<SlotData>,
    /// Declaration order: the default skin (if present) first.
    #[cfg_attr(feature = "serde", serde(serialize_with = "serde_named::serialize"))]
    pub skins: Vec<SkinData>,
    #[cfg_attr(feature = "serde", serde(serialize_with = "serde_named::serialize"))]
    pub events: Vec<EventData>,
    #[cfg_attr(feature = "serde", serde(serialize_with = "serde_named::serialize"))]
    pub animations: Vec<Animation>,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub animation_index: HashMap<String, usize>,
}

impl SkeletonDocument {
    pub fn bone(&self, name: &str) -> Option<&BoneData> {
        self.bones.iter().find(|b| b.name == name)
    }

    pub fn slot(&self, name: &str) -> Option<&SlotData> {
        self.slots.iter().find(|s| s.name == name)
    }

    pub fn ik_constraint(&self, name: &str) -> Option<&IkConstraintData> {
        self.ik.iter().find(|c| c.name == name)
    }

    pub fn skin(&self, name: &str) -> Option<&SkinData> {
        self.skins.iter().find(|s| s.name == name)
    }

    pub fn default_skin(&self) -> Option<&SkinData> {
        self.skin(DEFAULT_SKIN_NAME)
    }

    pub fn event(&self, name: &str) -> Option<&EventData> {
        self.events.iter().find(|e| e.name == name)
    }

    pub fn animation(&self, name: &str) -> Option<(usize, &Animation)> {
        let index = *self.animation_index.get(name)?;
        Some((index, &self.animations[index]))
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Color {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Curve {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match *self {
            Curve::Linear => serializer.serialize_none(),
            Curve::Stepped => serializer.serialize_str("stepped"),
            Curve::Bezier { cx1, cy1, cx2, cy2 } => {
                serde::Serialize::serialize(&[cx1, cy1, cx2, cy2], serializer)
            }
        }
    }
}

#[cfg(feature = "serde")]
mod serde_named {
    use serde::ser::{Serialize, SerializeMap, Serializer};

    pub(super) trait Named {
        fn key(&self) -> &str;
    }

    impl Named for super::SkinData {
        fn key(&self) -> &str {
            &self.name
        }
    }

    impl Named for super::EventData {
        fn key(&self) -> &str {
            &self.name
        }
    }

    impl Named for super::Animation {
        fn key(&self) -> &str {
            &self.name
        }
    }

    /// Renders a declaration-ordered list as a name-keyed map.
    pub(super) fn serialize<S, T>(items: &[T], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize + Named,
    {
        let mut map = serializer.serialize_map(Some(items.len()))?;
        for item in items {
            map.serialize_entry(item.key(), item)?;
        }
        map.end()
    }
}

#[cfg(feature = "serde")]
mod serde_flip {
    use super::FlipFrame;
    use serde::ser::{Serialize, SerializeMap, Serializer};

    struct Keyed<'a> {
        frame: &'a FlipFrame,
        key: &'static str,
    }

    impl Serialize for Keyed<'_> {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut map = serializer.serialize_map(Some(2))?;
            map.serialize_entry("time", &self.frame.time)?;
            map.serialize_entry(self.key, &self.frame.flip)?;
            map.end()
        }
    }

    fn keyed<S: Serializer>(
        frames: &Option<Vec<FlipFrame>>,
        key: &'static str,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match frames {
            Some(frames) => {
                serializer.collect_seq(frames.iter().map(|frame| Keyed { frame, key }))
            }
            None => serializer.serialize_none(),
        }
    }

    pub(super) fn x<S: Serializer>(
        frames: &Option<Vec<FlipFrame>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        keyed(frames, "x", serializer)
    }

    pub(super) fn y<S: Serializer>(
        frames: &Option<Vec<FlipFrame>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        keyed(frames, "y", serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mesh(name: &str, vertex_count: usize) -> AttachmentData {
        AttachmentData::Mesh(MeshAttachmentData {
            name: name.to_string(),
            path: name.to_string(),
            uvs: Vec::new(),
            triangles: Vec::new(),
            vertices: vec![1.0; vertex_count],
            color: Color::WHITE,
            hull: 0,
            edges: None,
            width: None,
            height: None,
        })
    }

    #[test]
    fn color_hex_preserves_rgba_byte_order() {
        let c = Color([0x12, 0xab, 0x00, 0xff]);
        assert_eq!(c.to_hex(), "12ab00ff");
        assert_eq!(c.r(), 0x12);
        assert_eq!(c.a(), 0xff);
    }

    #[test]
    fn find_attachment_prefers_key_then_last_declared_name() {
        let mut skin = SkinData::new(DEFAULT_SKIN_NAME);
        skin.insert("body", "a".to_string(), mesh("b", 2));
        skin.insert("body", "c".to_string(), mesh("a", 4));

        assert!(skin.attachment("body", "c").is_some());
        // A key match wins even though its resolved name differs.
        assert_eq!(skin.find_attachment("body", "a").map(|a| a.name()), Some("b"));
        assert_eq!(skin.find_attachment("body", "b").map(|a| a.name()), Some("b"));
        assert!(skin.find_attachment("body", "missing").is_none());
        assert!(skin.find_attachment("other", "a").is_none());
    }

    #[test]
    fn find_attachment_by_name_is_deterministic() {
        let mut skin = SkinData::new(DEFAULT_SKIN_NAME);
        skin.insert("body", "k1".to_string(), mesh("dup", 2));
        skin.insert("body", "k2".to_string(), mesh("dup", 6));
        skin.insert("body", "k3".to_string(), mesh("dup", 8));
        // Re-declaring a key replaces it in place.
        skin.insert("body", "k1".to_string(), mesh("dup", 10));
        assert_eq!(skin.key_order["body"], ["k1", "k2", "k3"]);

        for _ in 0..64 {
            let Some(AttachmentData::Mesh(found)) = skin.find_attachment("body", "dup") else {
                panic!("expected mesh");
            };
            assert_eq!(found.vertices.len(), 8);
        }
    }
}
