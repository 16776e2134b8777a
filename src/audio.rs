//! Spatial audio.
//!
//! The mixer drives a [`Spatializer`] from its rendering thread: it sets the
//! listener pose once per frame, calls [`Spatializer::apply`] for every
//! playing source and finally [`Spatializer::tail`] for the shared reverb.
//! Sources and the audio device are collaborators the spatializer queries
//! through [`SpatialSource`] and [`AudioHost`].

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::AcousticsResult;

pub mod effects;
pub mod ffi;
pub mod handle;
pub mod phonon;

pub use phonon::PhononSpatializer;

pub const FORWARD: Vec3 = Vec3::new(0.0, 0.0, -1.0);
pub const UP: Vec3 = Vec3::Y;
pub const RIGHT: Vec3 = Vec3::X;

/// Per-source processing stages that can be switched on and off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    Absorption,
    Attenuation,
    Directivity,
    Occlusion,
    Reverb,
    Transmission,
}

/// Source state the spatializer reads on every `apply`.
pub trait SpatialSource {
    /// Slot index, stable for the lifetime of the source.
    fn index(&self) -> usize;
    fn pose(&self) -> (Vec3, Quat);
    fn is_effect_enabled(&self, effect: Effect) -> bool;
    /// Dipole weight and power.
    fn directivity(&self) -> (f32, f32);
    /// Occlusion radius; zero selects single-ray occlusion.
    fn radius(&self) -> f32;
}

/// Device-level settings owned by the audio module.
pub trait AudioHost {
    fn sample_rate(&self) -> u32;
    /// Air absorption coefficients for the low, mid and high bands.
    fn absorption(&self) -> [f32; 3];
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListenerPose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Default for ListenerPose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
        }
    }
}

impl ListenerPose {
    pub fn forward(&self) -> Vec3 {
        self.orientation * FORWARD
    }

    pub fn up(&self) -> Vec3 {
        self.orientation * UP
    }
}

/// Surface presets for scene geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioMaterial {
    #[default]
    Generic,
    Brick,
    Carpet,
    Ceramic,
    Concrete,
    Glass,
    Gravel,
    Metal,
    Plaster,
    Rock,
    Wood,
}

/// Acoustic response of a surface in the 400 Hz, 2.5 kHz and 15 kHz bands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialProperties {
    pub absorption: [f32; 3],
    pub scattering: f32,
    pub transmission: [f32; 3],
}

const fn material(absorption: [f32; 3], transmission: [f32; 3]) -> MaterialProperties {
    MaterialProperties {
        absorption,
        scattering: 0.05,
        transmission,
    }
}

/// Indexed by `AudioMaterial as usize`.
pub const MATERIALS: [MaterialProperties; AudioMaterial::COUNT] = [
    material([0.10, 0.20, 0.30], [0.100, 0.050, 0.030]),
    material([0.03, 0.04, 0.07], [0.015, 0.015, 0.015]),
    material([0.24, 0.69, 0.73], [0.020, 0.005, 0.003]),
    material([0.01, 0.02, 0.02], [0.060, 0.044, 0.011]),
    material([0.05, 0.07, 0.08], [0.015, 0.002, 0.001]),
    material([0.06, 0.03, 0.02], [0.060, 0.044, 0.011]),
    material([0.60, 0.70, 0.80], [0.031, 0.012, 0.008]),
    material([0.20, 0.07, 0.06], [0.200, 0.025, 0.010]),
    material([0.12, 0.06, 0.04], [0.056, 0.056, 0.004]),
    material([0.13, 0.20, 0.24], [0.015, 0.002, 0.001]),
    material([0.11, 0.07, 0.06], [0.070, 0.014, 0.005]),
];

impl AudioMaterial {
    pub const COUNT: usize = 11;

    pub const ALL: [AudioMaterial; Self::COUNT] = [
        AudioMaterial::Generic,
        AudioMaterial::Brick,
        AudioMaterial::Carpet,
        AudioMaterial::Ceramic,
        AudioMaterial::Concrete,
        AudioMaterial::Glass,
        AudioMaterial::Gravel,
        AudioMaterial::Metal,
        AudioMaterial::Plaster,
        AudioMaterial::Rock,
        AudioMaterial::Wood,
    ];

    pub fn properties(self) -> &'static MaterialProperties {
        &MATERIALS[self as usize]
    }

    pub fn name(self) -> &'static str {
        match self {
            AudioMaterial::Generic => "generic",
            AudioMaterial::Brick => "brick",
            AudioMaterial::Carpet => "carpet",
            AudioMaterial::Ceramic => "ceramic",
            AudioMaterial::Concrete => "concrete",
            AudioMaterial::Glass => "glass",
            AudioMaterial::Gravel => "gravel",
            AudioMaterial::Metal => "metal",
            AudioMaterial::Plaster => "plaster",
            AudioMaterial::Rock => "rock",
            AudioMaterial::Wood => "wood",
        }
    }
}

/// Mixer-facing contract of a spatialization engine.
///
/// All methods are called from the audio rendering thread only.
pub trait Spatializer {
    fn name(&self) -> &'static str;

    /// Brings the engine up. On error nothing stays allocated.
    fn init(&mut self) -> AcousticsResult<()>;

    /// Releases everything `init` created. Safe on an uninitialized engine.
    fn destroy(&mut self);

    /// Renders `frames` mono samples from `input` into interleaved stereo
    /// `output` and returns the number of frames written, which is always
    /// `frames`.
    fn apply(
        &mut self,
        source: &dyn SpatialSource,
        input: &[f32],
        output: &mut [f32],
        frames: usize,
        reason: u32,
    ) -> usize;

    /// Renders the shared reverb tail into interleaved stereo `output`.
    ///
    /// Returns 0 when there is nothing to render. `scratch` is the mixer's
    /// buffer; engines with their own scratch space may ignore it.
    fn tail(&mut self, scratch: &mut [f32], output: &mut [f32], frames: usize) -> usize;

    fn set_listener_pose(&mut self, position: Vec3, orientation: Quat);

    /// Replaces the scene geometry. `vertices` holds xyz triples and
    /// `indices` holds one triple per triangle.
    fn set_geometry(
        &mut self,
        vertices: &[f32],
        indices: &[u32],
        material: AudioMaterial,
    ) -> AcousticsResult<()>;

    fn source_create(&mut self, source: &dyn SpatialSource) -> AcousticsResult<()>;

    fn source_destroy(&mut self, source: &dyn SpatialSource);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn material_table_matches_presets() {
        assert_eq!(MATERIALS.len(), AudioMaterial::ALL.len());
        for (index, material) in AudioMaterial::ALL.iter().enumerate() {
            assert_eq!(*material as usize, index);
        }
        let carpet = AudioMaterial::Carpet.properties();
        assert_eq!(carpet.absorption, [0.24, 0.69, 0.73]);
        assert_eq!(AudioMaterial::Metal.properties().transmission[0], 0.200);
        assert!(MATERIALS.iter().all(|m| m.scattering == 0.05));
    }

    #[test]
    fn listener_axes_follow_orientation() {
        let pose = ListenerPose {
            position: Vec3::ZERO,
            orientation: Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
        };
        let forward = pose.forward();
        assert!((forward - Vec3::NEG_X).length() < 1e-5);
        assert!((pose.up() - Vec3::Y).length() < 1e-5);
        assert_eq!(ListenerPose::default().forward(), FORWARD);
    }

    #[test]
    fn material_names_are_lowercase() {
        assert_eq!(AudioMaterial::default().name(), "generic");
        assert_eq!(AudioMaterial::Wood.name(), "wood");
    }
}
