pub mod bootstrap;

#[cfg(target_os = "android")]
pub mod android;

/// Exports `android_main` for a portable `fn(&AppContext) -> i32` entry
/// point. Expands to nothing on other targets.
///
/// ```ignore
/// fn app_main(ctx: &glue_core::AppContext) -> i32 { 0 }
/// glue_app::entrypoint!(app_main);
/// ```
#[macro_export]
macro_rules! entrypoint {
    ($main:path) => {
        #[cfg(target_os = "android")]
        #[doc(hidden)]
        #[no_mangle]
        pub fn android_main(app: $crate::android::AndroidApp) {
            $crate::android::main(app, $main)
        }
    };
}
