use tracing::{error, info};

use crate::error::ChromeError;

/// Host capability to hide the system navigation and status bars.
pub trait ChromeHost {
    fn hide_system_chrome(&self) -> Result<(), ChromeError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChromeFlags {
    pub fullscreen: i32,
    pub hide_navigation: i32,
    pub immersive_sticky: i32,
}

impl ChromeFlags {
    /// Values published by `android.view.View` since API 19.
    pub const ANDROID: ChromeFlags = ChromeFlags {
        fullscreen: 0x0000_0004,
        hide_navigation: 0x0000_0002,
        immersive_sticky: 0x0000_1000,
    };

    pub fn combined(&self) -> i32 {
        self.fullscreen | self.hide_navigation | self.immersive_sticky
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessChrome;

impl ChromeHost for HeadlessChrome {
    fn hide_system_chrome(&self) -> Result<(), ChromeError> {
        Ok(())
    }
}

/// Runs the one-shot chrome call. A failure is logged and otherwise ignored.
pub fn configure_chrome<H: ChromeHost + ?Sized>(host: &H) -> bool {
    match host.hide_system_chrome() {
        Ok(()) => {
            info!("system chrome hidden");
            true
        }
        Err(err) => {
            error!(%err, "unable to hide system chrome");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct CountingHost {
        calls: Cell<usize>,
        fail: bool,
    }

    impl ChromeHost for CountingHost {
        fn hide_system_chrome(&self) -> Result<(), ChromeError> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                Err(ChromeError::Resolve {
                    name: "getDecorView".into(),
                    reason: "NoSuchMethodError".into(),
                })
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn android_flags_combine_bitwise() {
        assert_eq!(ChromeFlags::ANDROID.combined(), 0x1006);
    }

    #[test]
    fn failure_is_reported_not_raised() {
        let host = CountingHost {
            calls: Cell::new(0),
            fail: true,
        };
        assert!(!configure_chrome(&host));
        assert_eq!(host.calls.get(), 1);
    }

    #[test]
    fn headless_host_succeeds() {
        assert!(configure_chrome(&HeadlessChrome));
    }
}
