//! C ABI of the phonon acoustics library and its resolved entry points.

#![allow(non_camel_case_types)]

use std::ffi::c_void;
use std::ptr;

use libloading::Library;
use log::debug;

use crate::error::{AcousticsError, AcousticsResult};

pub type IPLhandle = *mut c_void;
pub type IPLerror = i32;
pub type IPLbool = i32;

pub const IPL_STATUS_SUCCESS: IPLerror = 0;
pub const IPL_STATUS_FAILURE: IPLerror = 1;
pub const IPL_STATUS_OUTOFMEMORY: IPLerror = 2;
pub const IPL_FALSE: IPLbool = 0;
pub const IPL_TRUE: IPLbool = 1;

/// Version word passed to `iplContextCreate` (4.0.0).
pub const STEAMAUDIO_VERSION: u32 = 4 << 16;

pub const IPL_HRTFTYPE_DEFAULT: i32 = 0;
pub const IPL_SCENETYPE_DEFAULT: i32 = 0;
pub const IPL_AIRABSORPTION_EXPONENTIAL: i32 = 1;
pub const IPL_HRTFINTERPOLATION_NEAREST: i32 = 0;
pub const IPL_SIMTYPE_REALTIME: i32 = 0;
pub const IPL_CONVOLUTIONTYPE_PHONON: i32 = 0;

pub const IPL_CHANNELLAYOUTTYPE_SPEAKERS: i32 = 0;
pub const IPL_CHANNELLAYOUTTYPE_AMBISONICS: i32 = 1;
pub const IPL_CHANNELLAYOUT_MONO: i32 = 0;
pub const IPL_CHANNELLAYOUT_STEREO: i32 = 1;
pub const IPL_AMBISONICSORDERING_ACN: i32 = 1;
pub const IPL_AMBISONICSNORMALIZATION_N3D: i32 = 2;
pub const IPL_CHANNELORDER_INTERLEAVED: i32 = 0;
pub const IPL_CHANNELORDER_DEINTERLEAVED: i32 = 1;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IPLVector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl From<glam::Vec3> for IPLVector3 {
    fn from(v: glam::Vec3) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct IPLContextSettings {
    pub version: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct IPLAudioSettings {
    pub sampling_rate: i32,
    pub frame_size: i32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct IPLHRTFSettings {
    pub kind: i32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct IPLSceneSettings {
    pub kind: i32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct IPLRenderingSettings {
    pub sampling_rate: i32,
    pub frame_size: i32,
    pub convolution_type: i32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct IPLSimulationSettings {
    pub scene_type: i32,
    pub max_occlusion_samples: i32,
    pub num_rays: i32,
    pub num_diffuse_samples: i32,
    pub num_bounces: i32,
    pub num_threads: i32,
    pub ir_duration: f32,
    pub ambisonics_order: i32,
    pub max_convolution_sources: i32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IPLMaterial {
    pub absorption: [f32; 3],
    pub scattering: f32,
    pub transmission: [f32; 3],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IPLTriangle {
    pub indices: [i32; 3],
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct IPLStaticMeshSettings {
    pub num_vertices: i32,
    pub num_triangles: i32,
    pub num_materials: i32,
    pub vertices: *const IPLVector3,
    pub triangles: *const IPLTriangle,
    pub material_indices: *const i32,
    pub materials: *const IPLMaterial,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IPLAudioFormat {
    pub channel_layout_type: i32,
    pub channel_layout: i32,
    pub ambisonics_order: i32,
    pub ambisonics_ordering: i32,
    pub ambisonics_normalization: i32,
    pub channel_order: i32,
}

impl IPLAudioFormat {
    pub const MONO: Self = Self::speakers(IPL_CHANNELLAYOUT_MONO);
    pub const STEREO: Self = Self::speakers(IPL_CHANNELLAYOUT_STEREO);
    /// First order, ACN/N3D, one buffer per channel.
    pub const AMBISONIC: Self = Self {
        channel_layout_type: IPL_CHANNELLAYOUTTYPE_AMBISONICS,
        channel_layout: 0,
        ambisonics_order: 1,
        ambisonics_ordering: IPL_AMBISONICSORDERING_ACN,
        ambisonics_normalization: IPL_AMBISONICSNORMALIZATION_N3D,
        channel_order: IPL_CHANNELORDER_DEINTERLEAVED,
    };

    const fn speakers(layout: i32) -> Self {
        Self {
            channel_layout_type: IPL_CHANNELLAYOUTTYPE_SPEAKERS,
            channel_layout: layout,
            ambisonics_order: 0,
            ambisonics_ordering: 0,
            ambisonics_normalization: 0,
            channel_order: IPL_CHANNELORDER_INTERLEAVED,
        }
    }

    pub fn channels(&self) -> usize {
        if self.channel_layout_type == IPL_CHANNELLAYOUTTYPE_AMBISONICS {
            let order = self.ambisonics_order.max(0) as usize + 1;
            order * order
        } else if self.channel_layout == IPL_CHANNELLAYOUT_STEREO {
            2
        } else {
            1
        }
    }
}

/// Audio handed to the engine. Interleaved formats use `interleaved`,
/// deinterleaved formats point `deinterleaved` at one pointer per channel.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct IPLAudioBuffer {
    pub format: IPLAudioFormat,
    pub num_samples: i32,
    pub interleaved: *mut f32,
    pub deinterleaved: *mut *mut f32,
}

impl IPLAudioBuffer {
    pub fn interleaved(format: IPLAudioFormat, frames: usize, data: *mut f32) -> Self {
        Self {
            format,
            num_samples: frames as i32,
            interleaved: data,
            deinterleaved: ptr::null_mut(),
        }
    }

    pub fn deinterleaved(format: IPLAudioFormat, frames: usize, channels: *mut *mut f32) -> Self {
        Self {
            format,
            num_samples: frames as i32,
            interleaved: ptr::null_mut(),
            deinterleaved: channels,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct IPLDirectivity {
    pub dipole_weight: f32,
    pub dipole_power: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct IPLAirAbsorptionModel {
    pub kind: i32,
    pub coefficients: [f32; 3],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct IPLSource {
    pub position: IPLVector3,
    pub ahead: IPLVector3,
    pub up: IPLVector3,
    pub right: IPLVector3,
    pub directivity: IPLDirectivity,
    pub air_absorption: IPLAirAbsorptionModel,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IPLDirectOcclusionMode {
    None = 0,
    NoTransmission = 1,
    TransmissionByVolume = 2,
    TransmissionByFrequency = 3,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IPLDirectOcclusionMethod {
    Raycast = 0,
    Volumetric = 1,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct IPLDirectSoundPath {
    pub direction: IPLVector3,
    pub distance_attenuation: f32,
    pub air_absorption: [f32; 3],
    pub propagation_delay: f32,
    pub occlusion_factor: f32,
    pub transmission_factor: [f32; 3],
    pub directivity_factor: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct IPLDirectSoundEffectOptions {
    pub apply_distance_attenuation: IPLbool,
    pub apply_air_absorption: IPLbool,
    pub apply_directivity: IPLbool,
    pub occlusion_mode: IPLDirectOcclusionMode,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct IPLBakedDataIdentifier {
    pub identifier: i32,
    pub kind: i32,
}

/// Releases the object behind a handle and nulls the handle.
pub type ReleaseFn = unsafe extern "C" fn(*mut IPLhandle);

/// File name the dynamic loader searches for.
pub const fn library_name() -> &'static str {
    if cfg!(windows) {
        "phonon.dll"
    } else if cfg!(target_os = "macos") {
        "libphonon.dylib"
    } else {
        "libphonon.so"
    }
}

macro_rules! phonon_api {
    ($($field:ident = $symbol:literal: fn($($arg:ty),*) $(-> $ret:ty)?;)*) => {
        /// Entry points resolved from the acoustics library.
        ///
        /// The library handle is kept alongside the pointers so they stay
        /// valid for as long as the table lives.
        pub struct PhononApi {
            $(pub $field: unsafe extern "C" fn($($arg),*) $(-> $ret)?,)*
            _library: Option<Library>,
        }

        /// Every symbol `PhononApi` needs, in field order.
        pub const SYMBOLS: &[&str] = &[$($symbol),*];

        impl PhononApi {
            /// # Safety
            ///
            /// `table` must hold one pointer per entry of [`SYMBOLS`], in
            /// order, each pointing at a function with the declared
            /// signature.
            unsafe fn from_table(table: &[*const c_void], library: Option<Library>) -> Option<Self> {
                let mut slots = table.iter().copied();
                Some(Self {
                    $($field: std::mem::transmute::<*const c_void, unsafe extern "C" fn($($arg),*) $(-> $ret)?>(slots.next()?),)*
                    _library: library,
                })
            }
        }
    };
}

phonon_api! {
    context_create = "iplContextCreate": fn(*const IPLContextSettings, *mut IPLhandle) -> IPLerror;
    context_release = "iplContextRelease": fn(*mut IPLhandle);
    hrtf_create = "iplHRTFCreate": fn(IPLhandle, *const IPLAudioSettings, *const IPLHRTFSettings, *mut IPLhandle) -> IPLerror;
    hrtf_release = "iplHRTFRelease": fn(*mut IPLhandle);
    scene_create = "iplSceneCreate": fn(IPLhandle, *const IPLSceneSettings, *mut IPLhandle) -> IPLerror;
    scene_release = "iplSceneRelease": fn(*mut IPLhandle);
    scene_commit = "iplSceneCommit": fn(IPLhandle);
    static_mesh_create = "iplStaticMeshCreate": fn(IPLhandle, *const IPLStaticMeshSettings, *mut IPLhandle) -> IPLerror;
    static_mesh_release = "iplStaticMeshRelease": fn(*mut IPLhandle);
    static_mesh_add = "iplStaticMeshAdd": fn(IPLhandle, IPLhandle);
    static_mesh_remove = "iplStaticMeshRemove": fn(IPLhandle, IPLhandle);
    create_environment = "iplCreateEnvironment": fn(IPLhandle, *const IPLSimulationSettings, IPLhandle, *mut IPLhandle) -> IPLerror;
    destroy_environment = "iplDestroyEnvironment": fn(*mut IPLhandle);
    create_environmental_renderer = "iplCreateEnvironmentalRenderer": fn(IPLhandle, IPLhandle, IPLRenderingSettings, IPLAudioFormat, *mut IPLhandle) -> IPLerror;
    destroy_environmental_renderer = "iplDestroyEnvironmentalRenderer": fn(*mut IPLhandle);
    create_binaural_renderer = "iplCreateBinauralRenderer": fn(IPLhandle, IPLRenderingSettings, IPLhandle, *mut IPLhandle) -> IPLerror;
    destroy_binaural_renderer = "iplDestroyBinauralRenderer": fn(*mut IPLhandle);
    create_binaural_effect = "iplCreateBinauralEffect": fn(IPLhandle, IPLAudioFormat, IPLAudioFormat, *mut IPLhandle) -> IPLerror;
    flush_binaural_effect = "iplFlushBinauralEffect": fn(IPLhandle);
    destroy_binaural_effect = "iplDestroyBinauralEffect": fn(*mut IPLhandle);
    create_direct_sound_effect = "iplCreateDirectSoundEffect": fn(IPLAudioFormat, IPLAudioFormat, IPLRenderingSettings, *mut IPLhandle) -> IPLerror;
    flush_direct_sound_effect = "iplFlushDirectSoundEffect": fn(IPLhandle);
    destroy_direct_sound_effect = "iplDestroyDirectSoundEffect": fn(*mut IPLhandle);
    create_convolution_effect = "iplCreateConvolutionEffect": fn(IPLhandle, IPLBakedDataIdentifier, i32, IPLAudioFormat, IPLAudioFormat, *mut IPLhandle) -> IPLerror;
    flush_convolution_effect = "iplFlushConvolutionEffect": fn(IPLhandle);
    destroy_convolution_effect = "iplDestroyConvolutionEffect": fn(*mut IPLhandle);
    create_ambisonics_binaural_effect = "iplCreateAmbisonicsBinauralEffect": fn(IPLhandle, IPLAudioFormat, IPLAudioFormat, *mut IPLhandle) -> IPLerror;
    destroy_ambisonics_binaural_effect = "iplDestroyAmbisonicsBinauralEffect": fn(*mut IPLhandle);
    get_direct_sound_path = "iplGetDirectSoundPath": fn(IPLhandle, IPLVector3, IPLVector3, IPLVector3, IPLSource, f32, i32, IPLDirectOcclusionMode, IPLDirectOcclusionMethod) -> IPLDirectSoundPath;
    apply_direct_sound_effect = "iplApplyDirectSoundEffect": fn(IPLhandle, IPLAudioBuffer, IPLDirectSoundPath, IPLDirectSoundEffectOptions, IPLAudioBuffer);
    apply_binaural_effect = "iplApplyBinauralEffect": fn(IPLhandle, IPLhandle, IPLAudioBuffer, IPLVector3, i32, f32, IPLAudioBuffer);
    set_dry_audio_for_convolution_effect = "iplSetDryAudioForConvolutionEffect": fn(IPLhandle, IPLSource, IPLAudioBuffer);
    get_mixed_environmental_audio = "iplGetMixedEnvironmentalAudio": fn(IPLhandle, IPLVector3, IPLVector3, IPLVector3, IPLAudioBuffer);
    apply_ambisonics_binaural_effect = "iplApplyAmbisonicsBinauralEffect": fn(IPLhandle, IPLhandle, IPLAudioBuffer, IPLAudioBuffer);
}

impl PhononApi {
    /// Opens the library at `path` and resolves every entry point.
    pub fn load(path: &str) -> AcousticsResult<Self> {
        // SAFETY: loading runs the library's initializers; phonon has none
        // that depend on process state.
        let library = unsafe { Library::new(path) }.map_err(|err| AcousticsError::LibraryLoad {
            path: path.to_string(),
            reason: err.to_string(),
        })?;
        let table = resolve(|symbol| {
            let mut name = Vec::with_capacity(symbol.len() + 1);
            name.extend_from_slice(symbol.as_bytes());
            name.push(0);
            // SAFETY: the pointer is only reinterpreted as the signature
            // declared for this symbol.
            unsafe { library.get::<*const c_void>(&name) }
                .ok()
                .map(|symbol| *symbol)
                .filter(|pointer| !pointer.is_null())
        })?;
        debug!("resolved {} phonon symbols from {path}", table.len());
        // SAFETY: `resolve` returned one pointer per symbol, in order.
        unsafe { Self::from_table(&table, Some(library)) }
            .ok_or(AcousticsError::MissingSymbol(SYMBOLS[SYMBOLS.len() - 1]))
    }

    /// Builds the table from an arbitrary symbol lookup.
    ///
    /// # Safety
    ///
    /// Every pointer `lookup` returns must be a function with the signature
    /// declared for that symbol, valid for the lifetime of the table.
    pub unsafe fn from_lookup(
        lookup: impl FnMut(&'static str) -> Option<*const c_void>,
    ) -> AcousticsResult<Self> {
        let table = resolve(lookup)?;
        Self::from_table(&table, None).ok_or(AcousticsError::MissingSymbol(SYMBOLS[SYMBOLS.len() - 1]))
    }
}

fn resolve(
    mut lookup: impl FnMut(&'static str) -> Option<*const c_void>,
) -> AcousticsResult<Vec<*const c_void>> {
    let mut table = Vec::with_capacity(SYMBOLS.len());
    for &symbol in SYMBOLS {
        table.push(lookup(symbol).ok_or(AcousticsError::MissingSymbol(symbol))?);
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn symbols_are_unique() {
        let unique: HashSet<_> = SYMBOLS.iter().collect();
        assert_eq!(unique.len(), SYMBOLS.len());
        assert!(SYMBOLS.iter().all(|symbol| symbol.starts_with("ipl")));
    }

    #[test]
    fn first_missing_symbol_is_reported() {
        let err = resolve(|symbol| {
            (symbol != "iplSceneCommit").then_some(ptr::null::<c_void>().wrapping_add(1))
        })
        .unwrap_err();
        assert!(matches!(err, AcousticsError::MissingSymbol("iplSceneCommit")));
    }

    #[test]
    fn missing_library_fails_to_load() {
        let err = PhononApi::load("/nonexistent/libphonon.so").err().unwrap();
        assert!(matches!(err, AcousticsError::LibraryLoad { .. }));
    }

    #[test]
    fn format_channel_counts() {
        assert_eq!(IPLAudioFormat::MONO.channels(), 1);
        assert_eq!(IPLAudioFormat::STEREO.channels(), 2);
        assert_eq!(IPLAudioFormat::AMBISONIC.channels(), 4);
    }

    #[test]
    fn library_name_matches_host() {
        let name = library_name();
        assert!(name.contains("phonon"));
    }
}
