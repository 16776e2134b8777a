//! Operating-system abstraction used by the runtime.
//!
//! Each target has one backend implementing [`Platform`]. The embedding
//! application owns the backend value, polls it once per frame and receives
//! normalized events through the callbacks it registered. Backends are driven
//! from a single thread and do no internal locking.

use std::env;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use directories::BaseDirs;
use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::error::PlatformResult;
use crate::input::{Key, MouseButton, MouseMode, Permission};

pub mod callbacks;
pub mod headless;
pub mod vm;

#[cfg(target_os = "android")]
pub mod android;
#[cfg(not(any(target_os = "android", target_arch = "wasm32")))]
pub mod desktop;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use callbacks::{
    Callbacks, Dispatcher, FocusCallback, KeyCallback, MouseButtonCallback, MouseMoveCallback,
    PermissionCallback, QuitCallback, ResizeCallback, TextCallback, VisibleCallback,
    WheelCallback,
};
pub use headless::HeadlessBackend;

/// RGBA8 image used as the window icon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowIcon {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Parameters for [`Platform::open_window`].
///
/// A width or height of zero means "use the current display mode".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
    pub resizable: bool,
    /// Multisample count requested for the default framebuffer.
    pub msaa: u32,
    /// Request a debug graphics context.
    pub debug: bool,
    /// Swap interval; 0 disables vsync.
    pub vsync: u32,
    pub title: String,
    pub icon: Option<WindowIcon>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 600,
            fullscreen: false,
            resizable: false,
            msaa: 0,
            debug: false,
            vsync: 1,
            title: "Lodestar".to_string(),
            icon: None,
        }
    }
}

/// Location of the application bundle.
///
/// `root` is the directory inside the bundle that holds the application's
/// files, when the bundle is an archive (an APK, for instance).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundlePath {
    pub path: PathBuf,
    pub root: Option<String>,
}

/// The backend contract.
///
/// Fallible setup calls return `Err` and leave the backend as it was. Queries
/// never fail; they answer with zero, `false` or `None` when the resource they
/// describe does not exist.
pub trait Platform {
    /// Human-readable name of the host ("Linux", "Android", "Web", ...).
    fn name(&self) -> &'static str;

    /// One-time setup. Call once, before anything else.
    fn init(&mut self) -> PlatformResult<()>;

    /// Tears the backend down. Registered callbacks are dropped.
    fn destroy(&mut self);

    /// Drains pending OS events, invoking callbacks synchronously.
    fn poll_events(&mut self);

    /// Applies `update` to the callback registry.
    fn update_callbacks(&mut self, update: Box<dyn FnOnce(&mut Callbacks) + '_>);

    fn on_quit(&mut self, callback: Option<QuitCallback>) {
        self.update_callbacks(Box::new(move |callbacks| callbacks.quit = callback));
    }

    fn on_visible(&mut self, callback: Option<VisibleCallback>) {
        self.update_callbacks(Box::new(move |callbacks| callbacks.visible = callback));
    }

    fn on_focus(&mut self, callback: Option<FocusCallback>) {
        self.update_callbacks(Box::new(move |callbacks| callbacks.focus = callback));
    }

    fn on_resize(&mut self, callback: Option<ResizeCallback>) {
        self.update_callbacks(Box::new(move |callbacks| callbacks.resize = callback));
    }

    fn on_key(&mut self, callback: Option<KeyCallback>) {
        self.update_callbacks(Box::new(move |callbacks| callbacks.key = callback));
    }

    fn on_text(&mut self, callback: Option<TextCallback>) {
        self.update_callbacks(Box::new(move |callbacks| callbacks.text = callback));
    }

    fn on_mouse_button(&mut self, callback: Option<MouseButtonCallback>) {
        self.update_callbacks(Box::new(move |callbacks| callbacks.mouse_button = callback));
    }

    fn on_mouse_move(&mut self, callback: Option<MouseMoveCallback>) {
        self.update_callbacks(Box::new(move |callbacks| callbacks.mouse_move = callback));
    }

    fn on_mousewheel_move(&mut self, callback: Option<WheelCallback>) {
        self.update_callbacks(Box::new(move |callbacks| callbacks.mouse_wheel = callback));
    }

    fn on_permission(&mut self, callback: Option<PermissionCallback>) {
        self.update_callbacks(Box::new(move |callbacks| callbacks.permission = callback));
    }

    /// Opens the window. Succeeds immediately when one is already open.
    fn open_window(&mut self, config: &WindowConfig) -> PlatformResult<()>;

    /// Configuration the open window was created with.
    fn window_config(&self) -> Option<&WindowConfig>;

    fn window_is_open(&self) -> bool;
    fn window_is_visible(&self) -> bool;
    fn window_is_focused(&self) -> bool;

    /// Logical window size, `(0, 0)` without a window.
    fn window_size(&self) -> (u32, u32);

    /// Drawable size in physical pixels, `(0, 0)` without a window.
    fn window_framebuffer_size(&self) -> (u32, u32) {
        let (width, height) = self.window_size();
        let density = self.window_pixel_density();
        (
            (width as f32 * density).round() as u32,
            (height as f32 * density).round() as u32,
        )
    }

    /// Physical pixels per logical pixel, 0 without a window.
    fn window_pixel_density(&self) -> f32;

    fn mouse_position(&self) -> DVec2;
    fn set_mouse_mode(&mut self, mode: MouseMode);
    fn is_mouse_down(&self, button: MouseButton) -> bool;
    fn is_key_down(&self, key: Key) -> bool;

    /// Asks the OS for `permission`. The answer arrives through the
    /// permission callback; backends without a permission model stay silent.
    fn request_permission(&mut self, _permission: Permission) {}

    fn clipboard_text(&mut self) -> Option<String> {
        None
    }

    fn set_clipboard_text(&mut self, _text: &str) {}

    /// Attaches the calling thread to the host's managed runtime, if any.
    fn thread_attach(&self) {}

    fn thread_detach(&self) {}

    fn core_count(&self) -> u32 {
        num_cpus::get() as u32
    }

    /// Seconds since the backend was constructed.
    fn time(&self) -> f64;

    fn sleep(&self, seconds: f64) {
        if seconds > 0.0 {
            thread::sleep(Duration::from_secs_f64(seconds));
        }
    }

    fn home_directory(&self) -> Option<PathBuf> {
        BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
    }

    /// Per-user directory for application data.
    fn data_directory(&self) -> Option<PathBuf> {
        BaseDirs::new().map(|dirs| dirs.data_dir().to_path_buf())
    }

    fn working_directory(&self) -> Option<PathBuf> {
        env::current_dir().ok()
    }

    fn executable_path(&self) -> Option<PathBuf> {
        env::current_exe().ok()
    }

    fn bundle_path(&self) -> Option<BundlePath> {
        self.executable_path()
            .map(|path| BundlePath { path, root: None })
    }
}

/// Operating system name reported by the desktop and headless backends.
pub fn host_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "Windows"
    } else if cfg!(target_os = "macos") {
        "macOS"
    } else if cfg!(target_os = "linux") {
        "Linux"
    } else if cfg!(target_os = "android") {
        "Android"
    } else if cfg!(target_arch = "wasm32") {
        "Web"
    } else {
        "Unknown"
    }
}

/// Seconds from `start_ms` to `now_ms` on a millisecond clock, never negative.
#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
pub(crate) fn elapsed_seconds(start_ms: f64, now_ms: f64) -> f64 {
    ((now_ms - start_ms) / 1000.0).max(0.0)
}

/// Backend for the current target that needs no external handle.
///
/// Android backends are built from the activity handle instead; see
/// `android::AndroidBackend::new`.
#[cfg(not(any(target_os = "android", target_arch = "wasm32")))]
pub fn current_backend() -> Box<dyn Platform> {
    Box::new(desktop::DesktopBackend::new())
}

#[cfg(target_arch = "wasm32")]
pub fn current_backend() -> Box<dyn Platform> {
    Box::new(web::WebBackend::new(web::DEFAULT_CANVAS_ID))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_window_is_a_vsynced_fixed_size_window() {
        let config = WindowConfig::default();
        assert_eq!((config.width, config.height), (1080, 600));
        assert!(!config.fullscreen);
        assert!(!config.resizable);
        assert_eq!(config.vsync, 1);
        assert!(config.icon.is_none());
    }

    #[test]
    fn elapsed_time_counts_from_the_start_stamp() {
        assert_eq!(elapsed_seconds(12_500.0, 12_500.0), 0.0);
        assert_eq!(elapsed_seconds(12_500.0, 14_000.0), 1.5);
        assert_eq!(elapsed_seconds(12_500.0, 12_000.0), 0.0);
    }

    #[test]
    fn host_name_is_known() {
        assert_ne!(host_name(), "Unknown");
    }
}
