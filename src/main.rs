#[cfg(not(any(target_os = "android", target_arch = "wasm32")))]
use std::{cell::Cell, env, rc::Rc, sync::Arc};

#[cfg(not(any(target_os = "android", target_arch = "wasm32")))]
use anyhow::{anyhow, Context, Result};
#[cfg(not(any(target_os = "android", target_arch = "wasm32")))]
use log::{debug, info};

#[cfg(not(any(target_os = "android", target_arch = "wasm32")))]
use lodestar_runtime::{
    audio::{AudioHost, PhononSpatializer, Spatializer},
    platform::{self, HeadlessBackend, Platform, WindowConfig},
    ButtonAction, SpatializerConfig,
};

#[cfg(not(any(target_os = "android", target_arch = "wasm32")))]
fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

#[cfg(any(target_os = "android", target_arch = "wasm32"))]
fn main() {}

#[cfg(not(any(target_os = "android", target_arch = "wasm32")))]
const USAGE: &str = "Usage: lodestar [--headless] [--probe-audio] [--frames N] [--title T]";

#[cfg(not(any(target_os = "android", target_arch = "wasm32")))]
#[derive(Debug)]
struct CliOptions {
    headless: bool,
    probe_audio: bool,
    frames: Option<u64>,
    title: Option<String>,
}

#[cfg(not(any(target_os = "android", target_arch = "wasm32")))]
impl CliOptions {
    fn parse() -> Result<Self> {
        let mut options = Self {
            headless: false,
            probe_audio: false,
            frames: None,
            title: None,
        };
        let mut args = env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--headless" => options.headless = true,
                "--probe-audio" => options.probe_audio = true,
                "--frames" => {
                    let value = args.next().ok_or_else(|| anyhow!("--frames needs a value. {USAGE}"))?;
                    options.frames = Some(
                        value
                            .parse()
                            .with_context(|| format!("invalid frame count {value}"))?,
                    );
                }
                "--title" => {
                    options.title =
                        Some(args.next().ok_or_else(|| anyhow!("--title needs a value. {USAGE}"))?);
                }
                "--help" | "-h" => return Err(anyhow!(USAGE)),
                other => return Err(anyhow!("Unknown argument: {other}. {USAGE}")),
            }
        }
        Ok(options)
    }
}

/// Fixed device settings for the audio probe.
#[cfg(not(any(target_os = "android", target_arch = "wasm32")))]
struct ProbeHost;

#[cfg(not(any(target_os = "android", target_arch = "wasm32")))]
impl AudioHost for ProbeHost {
    fn sample_rate(&self) -> u32 {
        48_000
    }

    fn absorption(&self) -> [f32; 3] {
        [0.0002, 0.0017, 0.0182]
    }
}

#[cfg(not(any(target_os = "android", target_arch = "wasm32")))]
fn run() -> Result<()> {
    let options = CliOptions::parse()?;
    let mut config = WindowConfig::default();
    if let Some(title) = &options.title {
        config.title = title.clone();
    }

    let mut platform = open_platform(&options, &config)?;
    let quit = Rc::new(Cell::new(false));
    register_callbacks(platform.as_mut(), &quit);

    // Nothing ever asks a headless window to close.
    let limit = options
        .frames
        .or_else(|| (platform.name() == "Headless").then_some(1));
    let mut frames = 0;
    while !quit.get() && limit.map_or(true, |limit| frames < limit) {
        platform.poll_events();
        frames += 1;
    }
    debug!("ran {frames} frame(s) in {:.3}s", platform.time());

    print_summary(platform.as_ref(), frames);
    if options.probe_audio {
        probe_audio();
    }

    platform.destroy();
    Ok(())
}

#[cfg(not(any(target_os = "android", target_arch = "wasm32")))]
fn open_platform(options: &CliOptions, config: &WindowConfig) -> Result<Box<dyn Platform>> {
    if !options.headless {
        let mut platform = platform::current_backend();
        platform
            .init()
            .with_context(|| format!("failed to initialize the {} platform", platform.name()))?;
        match platform.open_window(config) {
            Ok(()) => return Ok(platform),
            Err(err) => {
                eprintln!("{err}. Falling back to --headless mode (set DISPLAY to open a window).");
                platform.destroy();
            }
        }
    }

    let mut platform: Box<dyn Platform> = Box::new(HeadlessBackend::new());
    platform.init().context("failed to initialize the headless platform")?;
    platform
        .open_window(config)
        .context("failed to open the headless window")?;
    Ok(platform)
}

#[cfg(not(any(target_os = "android", target_arch = "wasm32")))]
fn register_callbacks(platform: &mut dyn Platform, quit: &Rc<Cell<bool>>) {
    let flag = Rc::clone(quit);
    platform.on_quit(Some(Box::new(move || flag.set(true))));
    platform.on_resize(Some(Box::new(|width, height| {
        info!("window resized to {width}x{height}");
    })));
    platform.on_key(Some(Box::new(|action, key, scancode, repeat| {
        if action == ButtonAction::Pressed && !repeat {
            debug!("key {} pressed (scancode {scancode})", key.name());
        }
    })));
    platform.on_focus(Some(Box::new(|focused| debug!("focus changed: {focused}"))));
}

#[cfg(not(any(target_os = "android", target_arch = "wasm32")))]
fn print_summary(platform: &dyn Platform, frames: u64) {
    println!("Platform: {}", platform.name());
    if platform.window_is_open() {
        let (width, height) = platform.window_size();
        let (fb_width, fb_height) = platform.window_framebuffer_size();
        println!(
            "Window: {width}x{height} (framebuffer {fb_width}x{fb_height}, density {:.2})",
            platform.window_pixel_density()
        );
        if let Some(config) = platform.window_config() {
            println!("Title: {}", config.title);
        }
    } else {
        println!("Window: none");
    }
    println!("Frames: {frames}");
    println!("Cores: {}", platform.core_count());
    if let Some(dir) = platform.data_directory() {
        println!("Data directory: {}", dir.display());
    }
    if let Some(bundle) = platform.bundle_path() {
        println!("Bundle: {}", bundle.path.display());
    }
}

#[cfg(not(any(target_os = "android", target_arch = "wasm32")))]
fn probe_audio() {
    let config = SpatializerConfig::from_env();
    let library = config.library.clone();
    let mut spatializer = PhononSpatializer::new(config, Arc::new(ProbeHost));
    match spatializer.init() {
        Ok(()) => {
            println!("Spatializer: {} ready ({library})", spatializer.name());
            spatializer.destroy();
        }
        Err(err) => println!("Spatializer: unavailable ({err})"),
    }
}
