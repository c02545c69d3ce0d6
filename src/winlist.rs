use windows::Win32::Foundation::{BOOL, HWND, LPARAM};
use windows::Win32::System::Com::{CLSCTX_INPROC_SERVER, CoCreateInstance};
use windows::Win32::UI::Shell::{IVirtualDesktopManager, VirtualDesktopManager};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GA_ROOTOWNER, GWL_EXSTYLE, GetAncestor, GetForegroundWindow, GetWindowLongW,
    GetWindowTextLengthW, GetWindowTextW, HWND_NOTOPMOST, HWND_TOPMOST, IsWindow,
    IsWindowVisible, RealGetWindowClassW, SWP_NOACTIVATE, SWP_NOMOVE, SWP_NOSIZE, SetWindowPos,
};

use crate::core::{self, ToggleFailure, WindowId, WindowTraits};

pub fn hwnd_of(id: WindowId) -> HWND {
    HWND(id.0 as *mut std::ffi::c_void)
}

pub fn id_of(hwnd: HWND) -> WindowId {
    WindowId(hwnd.0 as usize)
}

/// Filters windows by virtual desktop. Created once on the UI thread.
#[derive(Clone)]
pub struct Desktops {
    vdm: Option<IVirtualDesktopManager>,
}

impl Desktops {
    pub fn new() -> Self {
        let vdm = unsafe { CoCreateInstance(&VirtualDesktopManager, None, CLSCTX_INPROC_SERVER) };
        if let Err(e) = &vdm {
            tracing::warn!(error=%e, "virtual desktop manager unavailable; listing all desktops");
        }
        Self { vdm: vdm.ok() }
    }

    pub fn is_on_current(&self, hwnd: HWND) -> bool {
        match &self.vdm {
            Some(vdm) => unsafe { vdm.IsWindowOnCurrentVirtualDesktop(hwnd) }
                .map(|b| b.as_bool())
                .unwrap_or(false),
            None => true,
        }
    }
}

impl Default for Desktops {
    fn default() -> Self {
        Self::new()
    }
}

fn ex_style(hwnd: HWND) -> u32 {
    unsafe { GetWindowLongW(hwnd, GWL_EXSTYLE) as u32 }
}

fn class_name(hwnd: HWND) -> String {
    let mut buf = [0u16; 256];
    let n = unsafe { RealGetWindowClassW(hwnd, &mut buf) } as usize;
    String::from_utf16_lossy(&buf[..n.min(buf.len())])
}

pub fn window_title(hwnd: HWND) -> String {
    let mut buf = [0u16; 512];
    let n = unsafe { GetWindowTextW(hwnd, &mut buf) }.max(0) as usize;
    String::from_utf16_lossy(&buf[..n.min(buf.len())])
}

pub fn traits(hwnd: HWND) -> WindowTraits {
    unsafe {
        WindowTraits {
            visible: IsWindowVisible(hwnd).as_bool(),
            ex_style: ex_style(hwnd),
            has_owner: GetAncestor(hwnd, GA_ROOTOWNER) != hwnd,
            title_len: GetWindowTextLengthW(hwnd).max(0) as usize,
            class_name: class_name(hwnd),
        }
    }
}

pub fn is_listed(hwnd: HWND, desktops: &Desktops) -> bool {
    core::is_app_window(&traits(hwnd)) && desktops.is_on_current(hwnd)
}

unsafe extern "system" fn collect(hwnd: HWND, l: LPARAM) -> BOOL {
    let out = &mut *(l.0 as *mut Vec<HWND>);
    out.push(hwnd);
    BOOL(1)
}

/// Top-level application windows on the current desktop, in z-order.
pub fn app_windows(desktops: &Desktops) -> Vec<HWND> {
    let mut all: Vec<HWND> = Vec::new();
    unsafe {
        if let Err(e) = EnumWindows(Some(collect), LPARAM(&mut all as *mut Vec<HWND> as isize)) {
            tracing::warn!(error=%e, "EnumWindows failed");
        }
    }
    all.retain(|&h| is_listed(h, desktops));
    all
}

pub fn is_alive(id: WindowId) -> bool {
    unsafe { IsWindow(hwnd_of(id)).as_bool() }
}

pub fn is_topmost(hwnd: HWND) -> bool {
    core::is_topmost_style(ex_style(hwnd))
}

/// Flips the always-on-top state; returns the new state.
pub fn toggle_topmost(hwnd: HWND) -> Result<bool, ToggleFailure> {
    let pin = !is_topmost(hwnd);
    let after = if pin { HWND_TOPMOST } else { HWND_NOTOPMOST };
    unsafe { SetWindowPos(hwnd, after, 0, 0, 0, 0, SWP_NOMOVE | SWP_NOSIZE | SWP_NOACTIVATE) }
        .map(|_| pin)
        .map_err(|e| ToggleFailure::from_win32(core::win32_code(e.code().0)))
}

/// Foreground window walked up to its root owner, if it is a listed window.
pub fn foreground_root(desktops: &Desktops) -> Option<HWND> {
    unsafe {
        let fg = GetForegroundWindow();
        if fg.0.is_null() {
            return None;
        }
        let root = GetAncestor(fg, GA_ROOTOWNER);
        let root = if root.0.is_null() { fg } else { root };
        is_listed(root, desktops).then_some(root)
    }
}
