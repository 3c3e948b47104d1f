/// Multiplier applied to baseline mesh vertices when blending deform frames.
///
/// Legacy exports store deform keys relative to a tenth of the setup pose.
pub const DEFAULT_DEFORM_COMPAT_MULTIPLIER: f32 = 0.1;

/// Caller-supplied decode configuration.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DecodeOptions {
    /// Applied to position/size-bearing floats (bone and attachment offsets,
    /// lengths, mesh vertices, translate keys, deform deltas).
    pub scale: f32,
    pub deform_compat_multiplier: f32,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            deform_compat_multiplier: DEFAULT_DEFORM_COMPAT_MULTIPLIER,
        }
    }
}

impl DecodeOptions {
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_deform_compat_multiplier(mut self, multiplier: f32) -> Self {
        self.deform_compat_multiplier = multiplier;
        self
    }

    pub(crate) fn effective_scale(&self) -> f32 {
        if self.scale.is_finite() {
            self.scale
        } else {
            1.0
        }
    }
}
