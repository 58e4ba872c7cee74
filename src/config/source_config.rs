use crate::math::Vec3;
use crate::spatial::Attenuation;

/// How an emitter's gain and pan are derived
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SourceConfig {
    /// Plays with its stored volume and a constant pan
    NonSpatial {
        /// -1 is hard left, 1 hard right
        pan: f32,
    },
    /// Attenuated and panned relative to the listener every tick
    Spatial {
        /// 3D position of the emitter
        position: Vec3,
        attenuation: Attenuation,
    },
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::NonSpatial { pan: 0.0 }
    }
}

impl SourceConfig {
    /// Create a non-spatial source configuration with the given pan
    pub fn non_spatial(pan: f32) -> Self {
        Self::NonSpatial { pan }
    }

    /// Create a spatial source configuration
    pub fn spatial(position: Vec3, attenuation: Attenuation) -> Self {
        Self::Spatial {
            position,
            attenuation,
        }
    }

    /// Returns true if this is a spatial source
    pub fn is_spatial(&self) -> bool {
        matches!(self, Self::Spatial { .. })
    }

    /// Returns the position if this is a spatial source
    pub fn position(&self) -> Option<Vec3> {
        match self {
            Self::Spatial { position, .. } => Some(*position),
            Self::NonSpatial { .. } => None,
        }
    }
}
