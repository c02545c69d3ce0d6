use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use windows::Win32::Foundation::{HANDLE, HWND, LPARAM, WPARAM};
use windows::Win32::System::Registry::{
    HKEY, HKEY_CURRENT_USER, KEY_NOTIFY, KEY_READ, REG_DWORD, REG_NOTIFY_CHANGE_LAST_SET,
    REG_VALUE_TYPE, RegCloseKey, RegNotifyChangeKeyValue, RegOpenKeyExW, RegQueryValueExW,
};
use windows::Win32::UI::Accessibility::{HCF_HIGHCONTRASTON, HIGHCONTRASTW, HIGHCONTRASTW_FLAGS};
use windows::Win32::UI::WindowsAndMessaging::{
    GetSystemMetrics, PostMessageW, SM_CXSMICON, SPI_GETHIGHCONTRAST,
    SYSTEM_PARAMETERS_INFO_UPDATE_FLAGS, SystemParametersInfoW,
};
use windows::core::w;

use crate::ranking::{DisplayContext, HighContrast, Theme};
use crate::resolver::DisplayProbe;

pub fn small_icon_size() -> u32 {
    let cx = unsafe { GetSystemMetrics(SM_CXSMICON) };
    if cx > 0 { cx as u32 } else { 16 }
}

pub fn high_contrast() -> HighContrast {
    unsafe {
        let mut hc = HIGHCONTRASTW {
            cbSize: std::mem::size_of::<HIGHCONTRASTW>() as u32,
            ..Default::default()
        };
        if SystemParametersInfoW(
            SPI_GETHIGHCONTRAST,
            hc.cbSize,
            Some(&mut hc as *mut _ as *mut _),
            SYSTEM_PARAMETERS_INFO_UPDATE_FLAGS(0),
        )
        .is_err()
        {
            return HighContrast::Off;
        }
        let on = (hc.dwFlags & HCF_HIGHCONTRASTON) != HIGHCONTRASTW_FLAGS(0);
        let scheme = if hc.lpszDefaultScheme.is_null() {
            String::new()
        } else {
            hc.lpszDefaultScheme.to_string().unwrap_or_default()
        };
        HighContrast::from_scheme(on, &scheme)
    }
}

struct PersonalizeKey(HKEY);

impl PersonalizeKey {
    fn open() -> Option<Self> {
        let mut hkey = HKEY::default();
        let status = unsafe {
            RegOpenKeyExW(
                HKEY_CURRENT_USER,
                w!("Software\\Microsoft\\Windows\\CurrentVersion\\Themes\\Personalize"),
                0,
                KEY_READ | KEY_NOTIFY,
                &mut hkey,
            )
        };
        status.is_ok().then_some(Self(hkey))
    }

    fn apps_use_light_theme(&self) -> Option<u32> {
        let mut ty = REG_VALUE_TYPE(0);
        let mut value = 0u32;
        let mut cb = std::mem::size_of::<u32>() as u32;
        let status = unsafe {
            RegQueryValueExW(
                self.0,
                w!("AppsUseLightTheme"),
                None,
                Some(&mut ty),
                Some(&mut value as *mut u32 as *mut u8),
                Some(&mut cb),
            )
        };
        (status.is_ok() && ty == REG_DWORD).then_some(value)
    }

    /// Blocks until a value under the key changes.
    fn wait_for_change(&self) -> bool {
        unsafe {
            RegNotifyChangeKeyValue(self.0, false, REG_NOTIFY_CHANGE_LAST_SET, HANDLE::default(), false)
        }
        .is_ok()
    }
}

impl Drop for PersonalizeKey {
    fn drop(&mut self) {
        unsafe {
            let _ = RegCloseKey(self.0);
        }
    }
}

pub fn current_theme() -> Theme {
    let value = PersonalizeKey::open().and_then(|k| k.apps_use_light_theme());
    Theme::from_apps_use_light_theme(value)
}

/// Live display conditions. The theme is cached in a flag that
/// [`SystemDisplay::watch_theme`] keeps current.
#[derive(Clone)]
pub struct SystemDisplay {
    dark: Arc<AtomicBool>,
}

impl SystemDisplay {
    pub fn new() -> Self {
        let dark = current_theme() == Theme::Dark;
        Self {
            dark: Arc::new(AtomicBool::new(dark)),
        }
    }

    pub fn theme(&self) -> Theme {
        if self.dark.load(Ordering::Relaxed) { Theme::Dark } else { Theme::Light }
    }

    /// Watches the personalization key on a detached thread and posts `msg`
    /// to `hwnd` whenever the apps theme flips.
    pub fn watch_theme(&self, hwnd: HWND, msg: u32) {
        let dark = Arc::clone(&self.dark);
        let hwnd_raw = hwnd.0 as usize;
        let spawned = std::thread::Builder::new()
            .name("theme-watch".into())
            .spawn(move || {
                let Some(key) = PersonalizeKey::open() else {
                    tracing::warn!("theme watcher: personalization key unavailable");
                    return;
                };
                while key.wait_for_change() {
                    let now = Theme::from_apps_use_light_theme(key.apps_use_light_theme()) == Theme::Dark;
                    if dark.swap(now, Ordering::Relaxed) != now {
                        tracing::info!(dark = now, "apps theme changed");
                        unsafe {
                            let _ = PostMessageW(
                                HWND(hwnd_raw as *mut std::ffi::c_void),
                                msg,
                                WPARAM(0),
                                LPARAM(0),
                            );
                        }
                    }
                }
                tracing::warn!("theme watcher stopped");
            });
        if let Err(e) = spawned {
            tracing::warn!(error=%e, "theme watcher thread failed to start");
        }
    }
}

impl Default for SystemDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayProbe for SystemDisplay {
    fn snapshot(&self) -> DisplayContext {
        DisplayContext {
            icon_size: small_icon_size(),
            contrast: high_contrast(),
            theme: self.theme(),
        }
    }
}
