//! Distance attenuation and stereo panning.
//!
//! The pan law is deliberately simple: the emitter's direction in listener space is
//! normalized and its lateral (x) component is used as the pan value. It is linear in
//! that component, not constant-power.

use crate::error::{Result, SoundDriverError};
use crate::math::{Pose, Vec3};

/// Distance attenuation curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum AttenuationModel {
    /// Constant gain regardless of distance
    None = 0,
    /// `min / (min + rolloff * (d - min))`
    #[default]
    InverseDistance = 1,
    /// `1 - rolloff * (d - min) / (max - min)`
    Linear = 2,
    /// `(d / min) ^ -rolloff`
    ExponentialDistance = 3,
}

impl TryFrom<u8> for AttenuationModel {
    type Error = SoundDriverError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::InverseDistance),
            2 => Ok(Self::Linear),
            3 => Ok(Self::ExponentialDistance),
            other => Err(SoundDriverError::InvalidAttenuation(format!(
                "Unknown attenuation model {}",
                other
            ))),
        }
    }
}

/// Validated attenuation settings of a 3D emitter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attenuation {
    model: AttenuationModel,
    min_distance: f32,
    max_distance: f32,
    rolloff: f32,
}

impl Attenuation {
    /// Requires `0 < min_distance <= max_distance` and a non-negative rolloff, all finite.
    pub fn new(
        model: AttenuationModel,
        min_distance: f32,
        max_distance: f32,
        rolloff: f32,
    ) -> Result<Self> {
        if !min_distance.is_finite() || min_distance <= 0.0 {
            return Err(SoundDriverError::InvalidAttenuation(format!(
                "min distance must be positive, got {}",
                min_distance
            )));
        }
        if !max_distance.is_finite() || max_distance < min_distance {
            return Err(SoundDriverError::InvalidAttenuation(format!(
                "max distance {} is below min distance {}",
                max_distance, min_distance
            )));
        }
        if !rolloff.is_finite() || rolloff < 0.0 {
            return Err(SoundDriverError::InvalidAttenuation(format!(
                "rolloff must be non-negative, got {}",
                rolloff
            )));
        }

        Ok(Self {
            model,
            min_distance,
            max_distance,
            rolloff,
        })
    }

    /// No attenuation at any distance.
    pub fn none() -> Self {
        Self {
            model: AttenuationModel::None,
            min_distance: 1.0,
            max_distance: 1.0,
            rolloff: 0.0,
        }
    }

    pub fn model(&self) -> AttenuationModel {
        self.model
    }

    pub fn min_distance(&self) -> f32 {
        self.min_distance
    }

    pub fn max_distance(&self) -> f32 {
        self.max_distance
    }

    pub fn rolloff(&self) -> f32 {
        self.rolloff
    }

    /// Gain factor at `distance`, after clamping it to `[min, max]`.
    ///
    /// Not clamped above 1.
    pub fn factor(&self, distance: f32) -> f32 {
        let min = self.min_distance;
        let max = self.max_distance;
        let d = distance.clamp(min, max);

        match self.model {
            AttenuationModel::None => 1.0,
            AttenuationModel::InverseDistance => min / (min + self.rolloff * (d - min)),
            AttenuationModel::Linear => {
                let range = max - min;
                if range > 0.0 {
                    1.0 - self.rolloff * (d - min) / range
                } else {
                    1.0
                }
            }
            AttenuationModel::ExponentialDistance => (d / min).powf(-self.rolloff),
        }
    }
}

impl Default for Attenuation {
    fn default() -> Self {
        Self::none()
    }
}

/// Gain and pan of an emitter as heard by the listener.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialParams {
    pub gain: f32,
    /// -1 is hard left, 1 hard right
    pub pan: f32,
}

/// Computes the attenuated gain and pan of a 3D emitter.
pub fn spatialize(
    position: Vec3,
    attenuation: &Attenuation,
    listener: &Pose,
    volume: f32,
) -> SpatialParams {
    let gain = volume * attenuation.factor(listener.distance_to(position));

    // Coincident emitter and listener have no direction; keep it centered.
    let pan = listener.to_local(position).normalize_or_zero().x;

    SpatialParams { gain, pan }
}
