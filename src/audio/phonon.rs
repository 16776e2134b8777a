//! Spatializer backed by the phonon acoustics library.
//!
//! The library is optional: it is loaded when the spatializer is
//! initialized, and a missing library or symbol is an ordinary `init` error.
//! Every engine object lives in an [`EngineHandle`], so a failed `init` or a
//! `destroy` releases exactly what was created, dependents first.

use std::ptr;
use std::sync::Arc;

use glam::{Quat, Vec3};
use log::{debug, info, trace};

use super::effects::{EffectKind, SourceEffectTable};
use super::ffi::{
    IPLAirAbsorptionModel, IPLAudioBuffer, IPLAudioFormat, IPLAudioSettings,
    IPLBakedDataIdentifier, IPLContextSettings, IPLDirectOcclusionMethod,
    IPLDirectOcclusionMode, IPLDirectSoundEffectOptions, IPLDirectivity, IPLHRTFSettings,
    IPLMaterial, IPLRenderingSettings, IPLSceneSettings, IPLSimulationSettings, IPLSource,
    IPLStaticMeshSettings, IPLTriangle, IPLVector3, PhononApi, IPL_AIRABSORPTION_EXPONENTIAL,
    IPL_CONVOLUTIONTYPE_PHONON, IPL_FALSE, IPL_HRTFINTERPOLATION_NEAREST, IPL_HRTFTYPE_DEFAULT,
    IPL_SCENETYPE_DEFAULT, IPL_SIMTYPE_REALTIME, IPL_TRUE, STEAMAUDIO_VERSION,
};
use super::handle::EngineHandle;
use super::{
    AudioHost, AudioMaterial, Effect, ListenerPose, SpatialSource, Spatializer, FORWARD, MATERIALS,
    RIGHT, UP,
};
use crate::config::SpatializerConfig;
use crate::error::{AcousticsError, AcousticsResult};

const AMBISONIC_CHANNELS: usize = 4;
const SIMULATION_THREADS: i32 = 1;
const SIMULATION_RAYS: i32 = 4096;
const SIMULATION_BOUNCES: i32 = 4;
const DIFFUSE_SAMPLES: i32 = 1024;
const MAX_REVERB_SECONDS: f32 = 1.0;

/// Opens the acoustics library and resolves its entry points.
pub type Loader = fn(&str) -> AcousticsResult<PhononApi>;

pub struct PhononSpatializer {
    config: SpatializerConfig,
    host: Arc<dyn AudioHost + Send + Sync>,
    loader: Loader,
    listener: ListenerPose,
    session: Option<Session>,
}

/// Everything that exists between `init` and `destroy`.
///
/// Fields drop in declaration order, which puts every object before the
/// objects it was created from.
struct Session {
    scratch: Vec<f32>,
    effects: SourceEffectTable,
    mesh: Option<EngineHandle>,
    ambisonics_binaural: EngineHandle,
    environmental_renderer: EngineHandle,
    environment: EngineHandle,
    binaural_renderer: EngineHandle,
    scene: EngineHandle,
    _hrtf: EngineHandle,
    _context: EngineHandle,
    rendering: IPLRenderingSettings,
    frame_size: usize,
    occlusion_samples: i32,
    api: Arc<PhononApi>,
}

impl PhononSpatializer {
    pub fn new(config: SpatializerConfig, host: Arc<dyn AudioHost + Send + Sync>) -> Self {
        Self::with_loader(config, host, PhononApi::load)
    }

    pub fn with_loader(
        config: SpatializerConfig,
        host: Arc<dyn AudioHost + Send + Sync>,
        loader: Loader,
    ) -> Self {
        Self {
            config,
            host,
            loader,
            listener: ListenerPose::default(),
            session: None,
        }
    }

    pub fn config(&self) -> &SpatializerConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.session.is_some()
    }

    pub fn has_geometry(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.mesh.is_some())
    }

    pub fn listener_pose(&self) -> ListenerPose {
        self.listener
    }
}

impl Session {
    fn create(
        api: PhononApi,
        config: &SpatializerConfig,
        sample_rate: u32,
    ) -> AcousticsResult<Self> {
        let api = Arc::new(api);
        let frame_size = config.frame_size.max(1);
        let audio = IPLAudioSettings {
            sampling_rate: sample_rate as i32,
            frame_size: frame_size as i32,
        };
        let rendering = IPLRenderingSettings {
            sampling_rate: audio.sampling_rate,
            frame_size: audio.frame_size,
            convolution_type: IPL_CONVOLUTIONTYPE_PHONON,
        };

        let context_settings = IPLContextSettings {
            version: STEAMAUDIO_VERSION,
        };
        // SAFETY (all constructors below): arguments are live handles owned by
        // this function and settings structs that outlive the call.
        let context = EngineHandle::create(&api, "iplContextCreate", api.context_release, |out| unsafe {
            (api.context_create)(&context_settings, out)
        })?;

        let hrtf_settings = IPLHRTFSettings {
            kind: IPL_HRTFTYPE_DEFAULT,
        };
        let hrtf = EngineHandle::create(&api, "iplHRTFCreate", api.hrtf_release, |out| unsafe {
            (api.hrtf_create)(context.raw(), &audio, &hrtf_settings, out)
        })?;

        let scene_settings = IPLSceneSettings {
            kind: IPL_SCENETYPE_DEFAULT,
        };
        let scene = EngineHandle::create(&api, "iplSceneCreate", api.scene_release, |out| unsafe {
            (api.scene_create)(context.raw(), &scene_settings, out)
        })?;

        let binaural_renderer = EngineHandle::create(
            &api,
            "iplCreateBinauralRenderer",
            api.destroy_binaural_renderer,
            |out| unsafe { (api.create_binaural_renderer)(context.raw(), rendering, hrtf.raw(), out) },
        )?;

        let simulation = IPLSimulationSettings {
            scene_type: IPL_SCENETYPE_DEFAULT,
            max_occlusion_samples: config.occlusion_samples as i32,
            num_rays: SIMULATION_RAYS,
            num_diffuse_samples: DIFFUSE_SAMPLES,
            num_bounces: SIMULATION_BOUNCES,
            num_threads: SIMULATION_THREADS,
            ir_duration: MAX_REVERB_SECONDS,
            ambisonics_order: IPLAudioFormat::AMBISONIC.ambisonics_order,
            max_convolution_sources: config.max_sources as i32,
        };
        let environment = EngineHandle::create(
            &api,
            "iplCreateEnvironment",
            api.destroy_environment,
            |out| unsafe { (api.create_environment)(context.raw(), &simulation, scene.raw(), out) },
        )?;

        let environmental_renderer = EngineHandle::create(
            &api,
            "iplCreateEnvironmentalRenderer",
            api.destroy_environmental_renderer,
            |out| unsafe {
                (api.create_environmental_renderer)(
                    context.raw(),
                    environment.raw(),
                    rendering,
                    IPLAudioFormat::AMBISONIC,
                    out,
                )
            },
        )?;

        let ambisonics_binaural = EngineHandle::create(
            &api,
            "iplCreateAmbisonicsBinauralEffect",
            api.destroy_ambisonics_binaural_effect,
            |out| unsafe {
                (api.create_ambisonics_binaural_effect)(
                    binaural_renderer.raw(),
                    IPLAudioFormat::AMBISONIC,
                    IPLAudioFormat::STEREO,
                    out,
                )
            },
        )?;

        let mut scratch = Vec::new();
        scratch
            .try_reserve_exact(frame_size * AMBISONIC_CHANNELS)
            .map_err(|_| AcousticsError::Allocation("scratch buffer"))?;
        scratch.resize(frame_size * AMBISONIC_CHANNELS, 0.0);

        Ok(Self {
            scratch,
            effects: SourceEffectTable::new(config.max_sources),
            mesh: None,
            ambisonics_binaural,
            environmental_renderer,
            environment,
            binaural_renderer,
            scene,
            _hrtf: hrtf,
            _context: context,
            rendering,
            frame_size,
            occlusion_samples: config.occlusion_samples as i32,
            api,
        })
    }
}

fn create_effect(
    api: &Arc<PhononApi>,
    binaural_renderer: &EngineHandle,
    environmental_renderer: &EngineHandle,
    rendering: IPLRenderingSettings,
    kind: EffectKind,
) -> AcousticsResult<EngineHandle> {
    // SAFETY: the renderers are live for the lifetime of the session.
    match kind {
        EffectKind::Binaural => EngineHandle::create(
            api,
            "iplCreateBinauralEffect",
            api.destroy_binaural_effect,
            |out| unsafe {
                (api.create_binaural_effect)(
                    binaural_renderer.raw(),
                    IPLAudioFormat::MONO,
                    IPLAudioFormat::STEREO,
                    out,
                )
            },
        ),
        EffectKind::Direct => EngineHandle::create(
            api,
            "iplCreateDirectSoundEffect",
            api.destroy_direct_sound_effect,
            |out| unsafe {
                (api.create_direct_sound_effect)(
                    IPLAudioFormat::MONO,
                    IPLAudioFormat::MONO,
                    rendering,
                    out,
                )
            },
        ),
        EffectKind::Convolution => EngineHandle::create(
            api,
            "iplCreateConvolutionEffect",
            api.destroy_convolution_effect,
            |out| unsafe {
                (api.create_convolution_effect)(
                    environmental_renderer.raw(),
                    IPLBakedDataIdentifier::default(),
                    IPL_SIMTYPE_REALTIME,
                    IPLAudioFormat::MONO,
                    IPLAudioFormat::AMBISONIC,
                    out,
                )
            },
        ),
    }
}

/// Direct path parameters for one source, derived fresh on every `apply`.
struct DirectPath {
    source: IPLSource,
    radius: f32,
    rays: i32,
    mode: IPLDirectOcclusionMode,
    method: IPLDirectOcclusionMethod,
    options: IPLDirectSoundEffectOptions,
    reverb: bool,
}

fn ipl_bool(value: bool) -> i32 {
    if value {
        IPL_TRUE
    } else {
        IPL_FALSE
    }
}

fn direct_path(
    source: &dyn SpatialSource,
    absorption: [f32; 3],
    has_mesh: bool,
    occlusion_samples: i32,
) -> DirectPath {
    let (position, orientation): (Vec3, Quat) = source.pose();
    let (weight, power) = source.directivity();

    let ipl_source = IPLSource {
        position: position.into(),
        ahead: (orientation * FORWARD).into(),
        up: (orientation * UP).into(),
        right: (orientation * RIGHT).into(),
        directivity: IPLDirectivity {
            dipole_weight: weight,
            dipole_power: power,
        },
        air_absorption: IPLAirAbsorptionModel {
            kind: IPL_AIRABSORPTION_EXPONENTIAL,
            coefficients: absorption,
        },
    };

    let mut mode = IPLDirectOcclusionMode::None;
    let mut method = IPLDirectOcclusionMethod::Raycast;
    let mut radius = 0.0;
    let mut rays = 0;
    if has_mesh && source.is_effect_enabled(Effect::Occlusion) {
        mode = if source.is_effect_enabled(Effect::Transmission) {
            IPLDirectOcclusionMode::TransmissionByFrequency
        } else {
            IPLDirectOcclusionMode::NoTransmission
        };
        radius = source.radius();
        if radius > 0.0 {
            method = IPLDirectOcclusionMethod::Volumetric;
            rays = occlusion_samples;
        }
    }

    DirectPath {
        source: ipl_source,
        radius,
        rays,
        mode,
        method,
        options: IPLDirectSoundEffectOptions {
            apply_distance_attenuation: ipl_bool(source.is_effect_enabled(Effect::Attenuation)),
            apply_air_absorption: ipl_bool(source.is_effect_enabled(Effect::Absorption)),
            apply_directivity: ipl_bool(weight > 0.0 && power > 0.0),
            occlusion_mode: mode,
        },
        reverb: has_mesh && source.is_effect_enabled(Effect::Reverb),
    }
}

fn validate_geometry(vertices: &[f32], indices: &[u32]) -> AcousticsResult<(usize, usize)> {
    if vertices.len() % 3 != 0 {
        return Err(AcousticsError::InvalidGeometry(format!(
            "{} vertex components is not a whole number of xyz triples",
            vertices.len()
        )));
    }
    if indices.is_empty() || indices.len() % 3 != 0 {
        return Err(AcousticsError::InvalidGeometry(format!(
            "{} indices do not form whole triangles",
            indices.len()
        )));
    }
    let vertex_count = vertices.len() / 3;
    if vertex_count > i32::MAX as usize || indices.len() / 3 > i32::MAX as usize {
        return Err(AcousticsError::InvalidGeometry("mesh is too large".into()));
    }
    if let Some(index) = indices.iter().find(|&&index| index as usize >= vertex_count) {
        return Err(AcousticsError::InvalidGeometry(format!(
            "index {index} is out of range for {vertex_count} vertices"
        )));
    }
    Ok((vertex_count, indices.len() / 3))
}

fn try_collect<T>(
    len: usize,
    what: &'static str,
    items: impl Iterator<Item = T>,
) -> AcousticsResult<Vec<T>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| AcousticsError::Allocation(what))?;
    buffer.extend(items);
    Ok(buffer)
}

fn silence(output: &mut [f32], frames: usize) {
    let len = (frames * 2).min(output.len());
    output[..len].fill(0.0);
}

impl Spatializer for PhononSpatializer {
    fn name(&self) -> &'static str {
        "phonon"
    }

    fn init(&mut self) -> AcousticsResult<()> {
        if self.session.is_some() {
            return Ok(());
        }
        let api = (self.loader)(&self.config.library)?;
        let session = Session::create(api, &self.config, self.host.sample_rate())?;
        info!(
            "phonon spatializer ready ({} Hz, {} frames, {} sources)",
            self.host.sample_rate(),
            session.frame_size,
            session.effects.capacity()
        );
        self.session = Some(session);
        Ok(())
    }

    fn destroy(&mut self) {
        if let Some(session) = self.session.take() {
            debug!(
                "releasing phonon session ({} source slots in use)",
                session.effects.live_count()
            );
        }
        self.listener = ListenerPose::default();
    }

    fn apply(
        &mut self,
        source: &dyn SpatialSource,
        input: &[f32],
        output: &mut [f32],
        frames: usize,
        _reason: u32,
    ) -> usize {
        let Some(session) = self.session.as_mut() else {
            silence(output, frames);
            return frames;
        };
        let index = source.index();
        let (Some(binaural), Some(direct)) = session
            .effects
            .get(index)
            .map_or((None, None), |slot| (slot.binaural.as_ref(), slot.direct.as_ref()))
        else {
            trace!("source {index} has no effects, rendering silence");
            silence(output, frames);
            return frames;
        };

        let available = frames.min(input.len()).min(output.len() / 2);
        if available < frames {
            trace!("source {index}: buffers hold {available} of {frames} frames");
            silence(output, frames);
        }

        let api = &session.api;
        let listener = IPLVector3::from(self.listener.position);
        let forward = IPLVector3::from(self.listener.forward());
        let up = IPLVector3::from(self.listener.up());
        let path = direct_path(
            source,
            self.host.absorption(),
            session.mesh.is_some(),
            session.occlusion_samples,
        );

        // SAFETY: the environment lives as long as the session.
        let sound_path = unsafe {
            (api.get_direct_sound_path)(
                session.environment.raw(),
                listener,
                forward,
                up,
                path.source,
                path.radius,
                path.rays,
                path.mode,
                path.method,
            )
        };

        let convolution = if path.reverb {
            session
                .effects
                .get(index)
                .and_then(|slot| slot.convolution.as_ref())
                .map(EngineHandle::raw)
        } else {
            None
        };

        let mut offset = 0;
        while offset < available {
            let count = (available - offset).min(session.frame_size);
            let dry = IPLAudioBuffer::interleaved(
                IPLAudioFormat::MONO,
                count,
                input[offset..].as_ptr().cast_mut(),
            );
            let wet = IPLAudioBuffer::interleaved(
                IPLAudioFormat::MONO,
                count,
                session.scratch.as_mut_ptr(),
            );
            let out = IPLAudioBuffer::interleaved(
                IPLAudioFormat::STEREO,
                count,
                output[offset * 2..].as_mut_ptr(),
            );
            // SAFETY: `dry` covers `count` samples of `input`, `wet` stays
            // within the scratch buffer (count <= frame_size) and `out`
            // covers `2 * count` samples of `output`. The engine only reads
            // from `dry`.
            unsafe {
                (api.apply_direct_sound_effect)(direct.raw(), dry, sound_path, path.options, wet);
                (api.apply_binaural_effect)(
                    binaural.raw(),
                    session.binaural_renderer.raw(),
                    wet,
                    sound_path.direction,
                    IPL_HRTFINTERPOLATION_NEAREST,
                    1.0,
                    out,
                );
                if let Some(convolution) = convolution {
                    (api.set_dry_audio_for_convolution_effect)(convolution, path.source, dry);
                }
            }
            offset += count;
        }
        frames
    }

    fn tail(&mut self, _scratch: &mut [f32], output: &mut [f32], frames: usize) -> usize {
        let Some(session) = self.session.as_mut() else {
            return 0;
        };
        if session.mesh.is_none() {
            return 0;
        }

        let api = &session.api;
        let listener = IPLVector3::from(self.listener.position);
        let forward = IPLVector3::from(self.listener.forward());
        let up = IPLVector3::from(self.listener.up());
        let available = frames.min(output.len() / 2);
        if available < frames {
            silence(output, frames);
        }

        let mut offset = 0;
        while offset < available {
            let count = (available - offset).min(session.frame_size);
            let spans = &mut session.scratch[..count * AMBISONIC_CHANNELS];
            spans.fill(0.0);
            let mut channels = [ptr::null_mut::<f32>(); AMBISONIC_CHANNELS];
            for (channel, span) in channels.iter_mut().zip(spans.chunks_exact_mut(count)) {
                *channel = span.as_mut_ptr();
            }
            let ambisonic =
                IPLAudioBuffer::deinterleaved(IPLAudioFormat::AMBISONIC, count, channels.as_mut_ptr());
            let out = IPLAudioBuffer::interleaved(
                IPLAudioFormat::STEREO,
                count,
                output[offset * 2..].as_mut_ptr(),
            );
            // SAFETY: each channel pointer addresses `count` floats of the
            // scratch buffer, `channels` outlives both calls, and `out`
            // covers `2 * count` samples of `output`.
            unsafe {
                (api.get_mixed_environmental_audio)(
                    session.environmental_renderer.raw(),
                    listener,
                    forward,
                    up,
                    ambisonic,
                );
                (api.apply_ambisonics_binaural_effect)(
                    session.ambisonics_binaural.raw(),
                    session.binaural_renderer.raw(),
                    ambisonic,
                    out,
                );
            }
            offset += count;
        }
        frames
    }

    fn set_listener_pose(&mut self, position: Vec3, orientation: Quat) {
        self.listener = ListenerPose {
            position,
            orientation,
        };
    }

    fn set_geometry(
        &mut self,
        vertices: &[f32],
        indices: &[u32],
        material: AudioMaterial,
    ) -> AcousticsResult<()> {
        let session = self.session.as_mut().ok_or(AcousticsError::NotInitialized)?;
        let (vertex_count, triangle_count) = validate_geometry(vertices, indices)?;

        let points = try_collect(
            vertex_count,
            "mesh vertices",
            vertices.chunks_exact(3).map(|v| IPLVector3 {
                x: v[0],
                y: v[1],
                z: v[2],
            }),
        )?;
        let triangles = try_collect(
            triangle_count,
            "mesh triangles",
            indices.chunks_exact(3).map(|t| IPLTriangle {
                indices: [t[0] as i32, t[1] as i32, t[2] as i32],
            }),
        )?;
        let material_indices = try_collect(
            triangle_count,
            "material indices",
            std::iter::repeat(material as i32).take(triangle_count),
        )?;
        let materials = MATERIALS.map(|m| IPLMaterial {
            absorption: m.absorption,
            scattering: m.scattering,
            transmission: m.transmission,
        });

        let settings = IPLStaticMeshSettings {
            num_vertices: vertex_count as i32,
            num_triangles: triangle_count as i32,
            num_materials: materials.len() as i32,
            vertices: points.as_ptr(),
            triangles: triangles.as_ptr(),
            material_indices: material_indices.as_ptr(),
            materials: materials.as_ptr(),
        };

        let api = Arc::clone(&session.api);
        let scene = session.scene.raw();
        // SAFETY: `settings` points into buffers that outlive the call.
        let mesh = EngineHandle::create(
            &api,
            "iplStaticMeshCreate",
            api.static_mesh_release,
            |out| unsafe { (api.static_mesh_create)(scene, &settings, out) },
        )?;

        // SAFETY: both meshes belong to `scene`; the old one is released only
        // after it has been removed and the scene recommitted.
        unsafe {
            (api.static_mesh_add)(mesh.raw(), scene);
            (api.scene_commit)(scene);
            if let Some(previous) = session.mesh.take() {
                (api.static_mesh_remove)(previous.raw(), scene);
                (api.scene_commit)(scene);
            }
        }
        session.mesh = Some(mesh);
        debug!(
            "scene geometry replaced: {vertex_count} vertices, {triangle_count} triangles, {}",
            material.name()
        );
        Ok(())
    }

    fn source_create(&mut self, source: &dyn SpatialSource) -> AcousticsResult<()> {
        let session = self.session.as_mut().ok_or(AcousticsError::NotInitialized)?;
        let Session {
            effects,
            api,
            binaural_renderer,
            environmental_renderer,
            rendering,
            ..
        } = session;
        effects
            .ensure(source.index(), |kind| {
                create_effect(api, binaural_renderer, environmental_renderer, *rendering, kind)
            })
            .map(|_| ())
    }

    fn source_destroy(&mut self, source: &dyn SpatialSource) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let index = source.index();
        let Some(slot) = session.effects.get(index) else {
            return;
        };
        let api = &session.api;
        // SAFETY: flushing only resets the effects' internal history.
        unsafe {
            if let Some(effect) = &slot.binaural {
                (api.flush_binaural_effect)(effect.raw());
            }
            if let Some(effect) = &slot.direct {
                (api.flush_direct_sound_effect)(effect.raw());
            }
            if let Some(effect) = &slot.convolution {
                (api.flush_convolution_effect)(effect.raw());
            }
        }
        trace!("flushed effects of source {index}");
    }
}

impl Drop for PhononSpatializer {
    fn drop(&mut self) {
        self.destroy();
    }
}
