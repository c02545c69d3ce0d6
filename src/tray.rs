use anyhow::{Result, anyhow};
use std::mem::size_of;
use windows::Win32::Foundation::HWND;
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::Shell::ExtractIconW;
use windows::Win32::UI::Shell::{
    NIF_ICON, NIF_INFO, NIF_MESSAGE, NIF_SHOWTIP, NIF_TIP, NIIF_ERROR, NIM_ADD,
    NIM_DELETE, NIM_MODIFY, NIM_SETVERSION, NOTIFYICON_VERSION_4, NOTIFYICONDATAW,
    NOTIFY_ICON_INFOTIP_FLAGS, Shell_NotifyIconW,
};
use windows::Win32::UI::WindowsAndMessaging::*;
use windows::core::PCWSTR;

pub const TRAY_UID: u32 = 1;
pub const TRAY_MSG: u32 = WM_APP + 1;

#[derive(Clone)]
pub struct Tray {
    pub nid: NOTIFYICONDATAW,
}

fn copy_wide(dst: &mut [u16], s: &str) {
    let w: Vec<u16> = s.encode_utf16().chain(std::iter::once(0)).collect();
    let n = w.len().min(dst.len());
    dst[..n].copy_from_slice(&w[..n]);
    if let Some(last) = dst.last_mut() {
        *last = 0;
    }
}

impl Tray {
    fn load_app_icon() -> HICON {
        unsafe {
            let hinst = GetModuleHandleW(None).unwrap_or_default();
            if let Ok(exe) = std::env::current_exe() {
                let wpath: Vec<u16> = exe
                    .display()
                    .to_string()
                    .encode_utf16()
                    .chain(std::iter::once(0))
                    .collect();
                let icon = ExtractIconW(hinst, PCWSTR(wpath.as_ptr()), 0);
                if !icon.0.is_null() && icon.0 as usize > 1 {
                    return icon;
                }
            }
            LoadIconW(None, IDI_APPLICATION).unwrap_or_default()
        }
    }

    pub fn new(hwnd: HWND, tip: &str) -> Result<Self> {
        let mut tray = Self {
            nid: unsafe { std::mem::zeroed() },
        };
        tray.nid.cbSize = size_of::<NOTIFYICONDATAW>() as u32;
        tray.nid.hWnd = hwnd;
        tray.nid.uID = TRAY_UID;
        tray.nid.uCallbackMessage = TRAY_MSG;
        tray.nid.hIcon = Self::load_app_icon();
        copy_wide(&mut tray.nid.szTip, tip);
        tray.add()?;
        Ok(tray)
    }

    fn add(&mut self) -> Result<()> {
        self.nid.uFlags = NIF_MESSAGE | NIF_TIP | NIF_ICON | NIF_SHOWTIP;
        unsafe {
            if !Shell_NotifyIconW(NIM_ADD, &self.nid).as_bool() {
                return Err(anyhow!("Shell_NotifyIconW(NIM_ADD) failed"));
            }
            // version 4 delivers the mouse message in LOWORD(lParam)
            self.nid.Anonymous.uVersion = NOTIFYICON_VERSION_4;
            let _ = Shell_NotifyIconW(NIM_SETVERSION, &self.nid);
        }
        Ok(())
    }

    /// Called after Explorer restarts (`TaskbarCreated`).
    pub fn re_add(&mut self) {
        if let Err(e) = self.add() {
            tracing::warn!(error=%e, "tray: re-add failed");
        }
    }

    pub fn set_tip(&mut self, tip: &str) {
        copy_wide(&mut self.nid.szTip, tip);
        self.nid.uFlags = NIF_TIP | NIF_SHOWTIP;
        unsafe {
            let _ = Shell_NotifyIconW(NIM_MODIFY, &self.nid);
        }
    }

    pub fn remove_icon(&mut self) {
        unsafe {
            let _ = Shell_NotifyIconW(NIM_DELETE, &self.nid);
        }
    }

    fn balloon(&mut self, title: &str, text: &str, flags: NOTIFY_ICON_INFOTIP_FLAGS) {
        let mut nid = self.nid;
        nid.uFlags = NIF_INFO;
        copy_wide(&mut nid.szInfoTitle, title);
        copy_wide(&mut nid.szInfo, text);
        nid.dwInfoFlags = flags;
        unsafe {
            if !Shell_NotifyIconW(NIM_MODIFY, &nid).as_bool() {
                // the icon may be gone after an Explorer restart
                self.re_add();
                let _ = Shell_NotifyIconW(NIM_MODIFY, &nid);
            }
        }
    }

    pub fn show_error(&mut self, title: &str, text: &str) {
        tracing::debug!(title=%title, text=%text, "tray: error balloon");
        self.balloon(title, text, NIIF_ERROR);
    }
}
