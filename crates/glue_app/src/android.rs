//! Host adapters for `NativeActivity`.

use std::ffi::CString;
use std::sync::Arc;

use glue_core::assets::{Asset, AssetSource};
use glue_core::chrome::{ChromeFlags, ChromeHost};
use glue_core::error::ChromeError;
use glue_core::lifecycle::HostConfiguration;
use glue_core::provision::{EnvRegistry, FontPathRegistry, FontPaths};
use glue_core::{AppContext, LifecycleState};
use jni::objects::{JObject, JValue};
use jni::{JNIEnv, JavaVM};
use ndk::asset::AssetManager;
use tracing::{error, warn};

pub use android_activity::AndroidApp;

use crate::bootstrap::{self, Host};

pub struct AndroidAssets {
    manager: AssetManager,
}

impl AndroidAssets {
    pub fn new(manager: AssetManager) -> Self {
        Self { manager }
    }
}

impl AssetSource for AndroidAssets {
    fn open(&self, path: &str) -> Option<Asset<'_>> {
        let name = CString::new(path).ok()?;
        let asset = self.manager.open(&name)?;
        let length = asset.length();
        Some(Asset::new(path, length, asset))
    }

    fn list_dir(&self, dir: &str) -> Vec<String> {
        let Ok(name) = CString::new(dir) else {
            return Vec::new();
        };
        match self.manager.open_dir(&name) {
            Some(entries) => entries
                .map(|entry| entry.to_string_lossy().into_owned())
                .collect(),
            None => Vec::new(),
        }
    }
}

/// Hides the navigation and status bars through the activity's decor view.
pub struct JniChromeHost {
    app: AndroidApp,
}

impl JniChromeHost {
    pub fn new(app: AndroidApp) -> Self {
        Self { app }
    }

    fn apply(env: &mut JNIEnv<'_>, activity: &JObject<'_>) -> Result<(), ChromeError> {
        let window = env
            .call_method(activity, "getWindow", "()Landroid/view/Window;", &[])
            .and_then(|value| value.l())
            .map_err(|err| resolve_error("getWindow", err))?;
        let decor_view = env
            .call_method(&window, "getDecorView", "()Landroid/view/View;", &[])
            .and_then(|value| value.l())
            .map_err(|err| resolve_error("getDecorView", err))?;

        let known = ChromeFlags::ANDROID;
        let flags = ChromeFlags {
            fullscreen: static_flag(env, "SYSTEM_UI_FLAG_FULLSCREEN", known.fullscreen),
            hide_navigation: static_flag(
                env,
                "SYSTEM_UI_FLAG_HIDE_NAVIGATION",
                known.hide_navigation,
            ),
            immersive_sticky: static_flag(
                env,
                "SYSTEM_UI_FLAG_IMMERSIVE_STICKY",
                known.immersive_sticky,
            ),
        };

        env.call_method(
            &decor_view,
            "setSystemUiVisibility",
            "(I)V",
            &[JValue::Int(flags.combined())],
        )
        .map_err(|err| ChromeError::Call {
            name: "setSystemUiVisibility".into(),
            reason: err.to_string(),
        })?;
        Ok(())
    }
}

impl ChromeHost for JniChromeHost {
    fn hide_system_chrome(&self) -> Result<(), ChromeError> {
        // SAFETY: both pointers come from the live `ANativeActivity`.
        let vm = unsafe { JavaVM::from_raw(self.app.vm_as_ptr().cast()) }
            .map_err(|err| ChromeError::HostUnavailable(err.to_string()))?;
        let activity = unsafe { JObject::from_raw(self.app.activity_as_ptr().cast()) };

        // The guard detaches the thread when dropped, whichever way we leave.
        let mut env = vm
            .attach_current_thread()
            .map_err(|err| ChromeError::HostUnavailable(err.to_string()))?;

        let result = Self::apply(&mut env, &activity);
        if result.is_err() && env.exception_check().unwrap_or(false) {
            let _ = env.exception_describe();
            let _ = env.exception_clear();
        }
        result
    }
}

/// Reads a `View` flag, falling back to the published value when the field
/// cannot be resolved.
fn static_flag(env: &mut JNIEnv<'_>, name: &str, fallback: i32) -> i32 {
    match env
        .get_static_field("android/view/View", name, "I")
        .and_then(|value| value.i())
    {
        Ok(flag) => flag,
        Err(err) => {
            if env.exception_check().unwrap_or(false) {
                let _ = env.exception_clear();
            }
            warn!(flag = name, %err, fallback, "using built-in chrome flag");
            fallback
        }
    }
}

fn resolve_error(name: &str, err: jni::errors::Error) -> ChromeError {
    ChromeError::Resolve {
        name: name.to_string(),
        reason: err.to_string(),
    }
}

#[cfg(feature = "fontconfig-path-init")]
extern "C" {
    fn FcConfigPathInit(path: *const std::os::raw::c_char, file: *const std::os::raw::c_char);
}

/// Exports the font paths and, with `fontconfig-path-init`, hands them to
/// fontconfig directly.
pub struct FontconfigRegistry;

impl FontPathRegistry for FontconfigRegistry {
    fn register(&self, paths: &FontPaths) {
        EnvRegistry.register(paths);

        #[cfg(feature = "fontconfig-path-init")]
        {
            use std::os::unix::ffi::OsStrExt;

            let dir = CString::new(paths.dir.as_os_str().as_bytes());
            let file = CString::new(paths.file.as_os_str().as_bytes());
            match (dir, file) {
                // SAFETY: both strings outlive the call; fontconfig copies them.
                (Ok(dir), Ok(file)) => unsafe { FcConfigPathInit(dir.as_ptr(), file.as_ptr()) },
                _ => warn!(dir = %paths.dir.display(), "font path contains a NUL byte"),
            }
        }
    }
}

struct ActivityConfiguration(#[allow(dead_code)] android_activity::ConfigurationRef);

impl HostConfiguration for ActivityConfiguration {}

/// Bootstraps the process and runs `entry`, then exits with its status.
pub fn main<F>(app: AndroidApp, entry: F) -> !
where
    F: FnOnce(&AppContext) -> i32,
{
    tracing_subscriber::fmt::init();

    let Some(writable_root) = app.internal_data_path() else {
        error!("activity has no internal data path");
        std::process::exit(1);
    };

    let config = bootstrap::load_config().unwrap_or_else(|err| {
        warn!(%err, "falling back to default bootstrap config");
        Default::default()
    });

    let assets = AndroidAssets::new(app.asset_manager());
    let chrome = JniChromeHost::new(app.clone());
    let lifecycle = Arc::new(
        LifecycleState::new().with_config(Box::new(ActivityConfiguration(app.config()))),
    );

    let status = bootstrap::launch(
        Host {
            assets: &assets,
            chrome: &chrome,
            registry: Box::new(FontconfigRegistry),
            writable_root,
            lifecycle,
        },
        config,
        entry,
    );

    // The application cannot restart inside the same process, so leave now.
    std::process::exit(status)
}
