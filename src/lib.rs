//! Native core of the Lodestar VR runtime.
//!
//! Two subsystems live here: the [`platform`] layer, one backend per target
//! behind the [`Platform`] trait, and the [`audio`] spatializer, which binds
//! the phonon acoustics library at runtime. Both are driven from a single
//! thread each and report events and failures to an embedding application
//! that owns them.

pub mod audio;
pub mod config;
pub mod error;
pub mod input;
pub mod platform;

pub use audio::{AudioHost, AudioMaterial, Effect, PhononSpatializer, SpatialSource, Spatializer};
pub use config::SpatializerConfig;
pub use error::{AcousticsError, PlatformError};
pub use input::{ButtonAction, InputState, Key, MouseButton, MouseMode, Permission};
pub use platform::{HeadlessBackend, Platform, WindowConfig};
