//! Runtime configuration for the acoustics engine.

use std::env;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::audio::ffi::library_name;

pub const LIBRARY_ENV: &str = "LODESTAR_PHONON_LIBRARY";
pub const FRAME_SIZE_ENV: &str = "LODESTAR_AUDIO_FRAME_SIZE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatializerConfig {
    /// Path or file name handed to the dynamic loader.
    pub library: String,
    /// Frames per engine call; longer requests are processed in chunks.
    pub frame_size: usize,
    /// Number of source slots, and so the largest valid source index + 1.
    pub max_sources: usize,
    /// Rays cast for volumetric occlusion.
    pub occlusion_samples: u32,
}

impl Default for SpatializerConfig {
    fn default() -> Self {
        Self {
            library: library_name().to_string(),
            frame_size: 1024,
            max_sources: 64,
            occlusion_samples: 32,
        }
    }
}

impl SpatializerConfig {
    /// Defaults with `LODESTAR_PHONON_LIBRARY` and `LODESTAR_AUDIO_FRAME_SIZE`
    /// applied.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|name| env::var(name).ok())
    }

    fn with_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(library) = var(LIBRARY_ENV).filter(|value| !value.is_empty()) {
            self.library = library;
        }
        if let Some(value) = var(FRAME_SIZE_ENV) {
            match value.trim().parse::<usize>() {
                Ok(size) if size > 0 => self.frame_size = size,
                _ => warn!("ignoring {FRAME_SIZE_ENV}={value}: expected a positive integer"),
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_engine_limits() {
        let config = SpatializerConfig::default();
        assert_eq!(config.frame_size, 1024);
        assert_eq!(config.max_sources, 64);
        assert_eq!(config.occlusion_samples, 32);
        assert_eq!(config.library, library_name());
    }

    #[test]
    fn overrides_replace_library_and_frame_size() {
        let config = SpatializerConfig::default().with_overrides(|name| match name {
            LIBRARY_ENV => Some("/opt/phonon/libphonon.so".into()),
            FRAME_SIZE_ENV => Some("256".into()),
            _ => None,
        });
        assert_eq!(config.library, "/opt/phonon/libphonon.so");
        assert_eq!(config.frame_size, 256);
    }

    #[test]
    fn invalid_frame_size_is_ignored() {
        let config = SpatializerConfig::default()
            .with_overrides(|name| (name == FRAME_SIZE_ENV).then(|| "zero".to_string()));
        assert_eq!(config.frame_size, 1024);
        let config = SpatializerConfig::default()
            .with_overrides(|name| (name == FRAME_SIZE_ENV).then(|| "0".to_string()));
        assert_eq!(config.frame_size, 1024);
    }
}
