//! Android backend on top of `android-activity` (NativeActivity).
//!
//! Rendering goes through the XR runtime, so `open_window` only records the
//! configuration; the window queries describe the activity's native window.

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use android_activity::input::{InputEvent, KeyAction, KeyEvent, KeyMapChar};
use android_activity::{AndroidApp, AndroidAppWaker, InputStatus, MainEvent, PollEvent};
use glam::DVec2;
use jni::objects::{JObject, JString};
use jni::sys::{jboolean, jint, JNI_FALSE};
use jni::{JNIEnv, JavaVM};
use log::{debug, info, trace, warn};

use super::{BundlePath, Callbacks, Dispatcher, Platform, WindowConfig};
use crate::error::{PlatformError, PlatformResult};
use crate::input::{android::KEYS, ButtonAction, Key, MouseButton, MouseMode, Permission};

/// Permission results posted by the Java activity, drained on the next poll.
///
/// Java reaches us through an exported symbol, so this queue is the one piece
/// of process-wide state in the backend.
static PERMISSION_EVENTS: Mutex<Vec<(Permission, bool)>> = Mutex::new(Vec::new());
static WAKER: Mutex<Option<AndroidAppWaker>> = Mutex::new(None);

/// Directory inside the APK that holds the application's files.
const BUNDLE_ROOT: &str = "/assets";

pub struct AndroidBackend {
    app: AndroidApp,
    dispatcher: Dispatcher,
    config: Option<WindowConfig>,
    resumed: bool,
    focused: bool,
    destroyed: bool,
    started: Instant,
}

impl AndroidBackend {
    pub fn new(app: AndroidApp) -> Self {
        Self {
            app,
            dispatcher: Dispatcher::new(),
            config: None,
            resumed: false,
            focused: false,
            destroyed: false,
            started: Instant::now(),
        }
    }

    fn java_vm(&self) -> PlatformResult<JavaVM> {
        // SAFETY: android-activity hands out the process's JavaVM pointer.
        unsafe { JavaVM::from_raw(self.app.vm_as_ptr().cast()) }
            .map_err(|err| PlatformError::Jni(err.to_string()))
    }

    /// Runs `call` with a JNI environment and the activity object.
    fn with_activity<T>(
        &self,
        call: impl FnOnce(&mut JNIEnv, &JObject) -> jni::errors::Result<T>,
    ) -> PlatformResult<T> {
        let vm = self.java_vm()?;
        let mut env = vm
            .attach_current_thread()
            .map_err(|err| PlatformError::Jni(err.to_string()))?;
        // SAFETY: the activity is a global reference that outlives the backend.
        let activity = unsafe { JObject::from_raw(self.app.activity_as_ptr().cast()) };
        let result = call(&mut env, &activity);
        if env.exception_check().unwrap_or(false) {
            let _ = env.exception_clear();
        }
        result.map_err(|err| PlatformError::Jni(err.to_string()))
    }

    fn has_window(&self) -> bool {
        self.app.native_window().is_some()
    }

    fn handle_main_event(&mut self, event: MainEvent<'_>) {
        match event {
            MainEvent::InitWindow { .. } => {
                debug!("native window created");
                self.dispatcher.visible(self.resumed);
            }
            MainEvent::TerminateWindow { .. } => self.dispatcher.visible(false),
            MainEvent::WindowResized { .. } => {
                if let Some(window) = self.app.native_window() {
                    let (width, height) = (window.width().max(0), window.height().max(0));
                    self.dispatcher.resize(width as u32, height as u32);
                }
            }
            MainEvent::GainedFocus => {
                self.focused = true;
                self.dispatcher.focus(true);
            }
            MainEvent::LostFocus => {
                self.focused = false;
                self.dispatcher.focus(false);
            }
            MainEvent::Resume { .. } => self.resumed = true,
            MainEvent::Pause => self.resumed = false,
            MainEvent::Destroy => {
                info!("activity destroyed");
                self.destroyed = true;
                self.dispatcher.quit();
            }
            _ => {}
        }
    }

    fn handle_key(&mut self, event: &KeyEvent) -> InputStatus {
        let action = match event.action() {
            KeyAction::Down => ButtonAction::Pressed,
            KeyAction::Up => ButtonAction::Released,
            _ => return InputStatus::Unhandled,
        };
        let code = u32::from(event.key_code());
        let Some(key) = KEYS.to_key(code) else {
            trace!(target: "platform::android", "dropping unmapped key {code}");
            return InputStatus::Unhandled;
        };
        let scancode = event.scan_code().max(0) as u32;
        let repeat = event.repeat_count() > 0;
        self.dispatcher.key(action, key, scancode, repeat);

        if action == ButtonAction::Pressed {
            let character = self
                .app
                .device_key_character_map(event.device_id())
                .ok()
                .and_then(|map| map.get(event.key_code(), event.meta_state()).ok());
            if let Some(KeyMapChar::Unicode(character)) = character {
                self.dispatcher.text(character);
            }
        }
        InputStatus::Handled
    }

    fn drain_input(&mut self) {
        let app = self.app.clone();
        let mut events = match app.input_events_iter() {
            Ok(events) => events,
            Err(err) => {
                warn!("failed to read input events: {err}");
                return;
            }
        };
        while events.next(|event| match event {
            InputEvent::KeyEvent(key) => self.handle_key(key),
            _ => InputStatus::Unhandled,
        }) {}
    }

    fn drain_permissions(&mut self) {
        let pending = match PERMISSION_EVENTS.lock() {
            Ok(mut events) => std::mem::take(&mut *events),
            Err(_) => return,
        };
        for (permission, granted) in pending {
            self.dispatcher.permission(permission, granted);
        }
    }
}

impl Platform for AndroidBackend {
    fn name(&self) -> &'static str {
        "Android"
    }

    fn init(&mut self) -> PlatformResult<()> {
        android_logger::init_once(
            android_logger::Config::default()
                .with_max_level(log::LevelFilter::Debug)
                .with_tag("Lodestar"),
        );
        if let Ok(mut waker) = WAKER.lock() {
            *waker = Some(self.app.create_waker());
        }
        info!("android platform initialized");
        Ok(())
    }

    fn destroy(&mut self) {
        // A quit the OS started ends with MainEvent::Destroy. A quit the app
        // started leaves the activity resumed, so ask it to finish and wait
        // for the OS to confirm.
        if self.resumed && !self.destroyed {
            self.dispatcher.callbacks_mut().clear();
            match self.with_activity(|env, activity| {
                env.call_method(activity, "finish", "()V", &[]).map(|_| ())
            }) {
                Ok(()) => {
                    while !self.destroyed {
                        self.poll_events();
                    }
                }
                Err(err) => warn!("failed to finish activity: {err}"),
            }
        }
        self.dispatcher.callbacks_mut().clear();
        self.config = None;
        if let Ok(mut waker) = WAKER.lock() {
            *waker = None;
        }
    }

    fn poll_events(&mut self) {
        if self.destroyed {
            return;
        }
        // Block while backgrounded instead of spinning.
        let timeout = if self.has_window() && self.resumed {
            Some(Duration::ZERO)
        } else {
            None
        };
        let app = self.app.clone();
        app.poll_events(timeout, |event| {
            if let PollEvent::Main(event) = event {
                self.handle_main_event(event);
            }
        });
        self.drain_input();
        self.drain_permissions();
    }

    fn update_callbacks(&mut self, update: Box<dyn FnOnce(&mut Callbacks) + '_>) {
        update(self.dispatcher.callbacks_mut());
    }

    fn open_window(&mut self, config: &WindowConfig) -> PlatformResult<()> {
        if self.config.is_none() {
            self.config = Some(config.clone());
        }
        Ok(())
    }

    fn window_config(&self) -> Option<&WindowConfig> {
        self.config.as_ref()
    }

    fn window_is_open(&self) -> bool {
        self.has_window()
    }

    fn window_is_visible(&self) -> bool {
        self.has_window() && self.resumed
    }

    fn window_is_focused(&self) -> bool {
        self.has_window() && self.focused
    }

    fn window_size(&self) -> (u32, u32) {
        self.app.native_window().map_or((0, 0), |window| {
            (window.width().max(0) as u32, window.height().max(0) as u32)
        })
    }

    fn window_framebuffer_size(&self) -> (u32, u32) {
        self.window_size()
    }

    fn window_pixel_density(&self) -> f32 {
        if !self.has_window() {
            return 0.0;
        }
        self.app
            .config()
            .density()
            .map_or(1.0, |dpi| dpi as f32 / 160.0)
    }

    fn mouse_position(&self) -> DVec2 {
        self.dispatcher.input().mouse_position()
    }

    fn set_mouse_mode(&mut self, mode: MouseMode) {
        self.dispatcher.set_mouse_mode(mode);
    }

    fn is_mouse_down(&self, button: MouseButton) -> bool {
        self.dispatcher.input().is_mouse_button_down(button)
    }

    fn is_key_down(&self, key: Key) -> bool {
        self.dispatcher.input().is_key_down(key)
    }

    fn request_permission(&mut self, permission: Permission) {
        match permission {
            Permission::AudioCapture => {
                let requested = self.with_activity(|env, activity| {
                    let class = env.get_object_class(activity)?;
                    env.get_method_id(&class, "requestAudioCapturePermission", "()V")?;
                    env.call_method(activity, "requestAudioCapturePermission", "()V", &[])
                        .map(|_| ())
                });
                if let Err(err) = requested {
                    warn!("cannot request {}: {err}", permission.name());
                    self.dispatcher.permission(permission, false);
                }
            }
        }
    }

    fn thread_attach(&self) {
        let attached = self.java_vm().and_then(|vm| {
            vm.attach_current_thread_permanently()
                .map(|_| ())
                .map_err(|err| PlatformError::Jni(err.to_string()))
        });
        if let Err(err) = attached {
            warn!("failed to attach thread: {err}");
        }
    }

    fn thread_detach(&self) {
        match self.java_vm() {
            // SAFETY: callers detach only threads they attached and hold no local refs.
            Ok(vm) => unsafe { vm.detach_current_thread() },
            Err(err) => warn!("failed to detach thread: {err}"),
        }
    }

    fn time(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    fn home_directory(&self) -> Option<PathBuf> {
        None
    }

    fn data_directory(&self) -> Option<PathBuf> {
        self.app.external_data_path()
    }

    fn bundle_path(&self) -> Option<BundlePath> {
        let path = self.with_activity(|env, activity| {
            let path = env
                .call_method(activity, "getPackageCodePath", "()Ljava/lang/String;", &[])?
                .l()?;
            let path = JString::from(path);
            let path: String = env.get_string(&path)?.into();
            Ok(path)
        });
        match path {
            Ok(path) => Some(BundlePath {
                path: PathBuf::from(path),
                root: Some(BUNDLE_ROOT.to_string()),
            }),
            Err(err) => {
                warn!("failed to query package path: {err}");
                None
            }
        }
    }
}

/// Called by `org.lodestar.app.Activity` when a permission request resolves.
#[no_mangle]
pub extern "system" fn Java_org_lodestar_app_Activity_nativePermissionEvent(
    _env: JNIEnv,
    _activity: JObject,
    permission: jint,
    granted: jboolean,
) {
    let permission = match permission {
        0 => Permission::AudioCapture,
        other => {
            warn!("ignoring unknown permission {other}");
            return;
        }
    };
    if let Ok(mut events) = PERMISSION_EVENTS.lock() {
        events.push((permission, granted != JNI_FALSE));
    }
    if let Ok(waker) = WAKER.lock() {
        if let Some(waker) = waker.as_ref() {
            waker.wake();
        }
    }
}
